//! Configuration validation.
//!
//! Validates all config fields before a backtest runs.

use crate::domain::error::GridtraderError;
use crate::domain::strategy::Market;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), GridtraderError> {
    validate_commission(config)?;
    validate_risk_free_rate(config)?;
    validate_trading_days(config)?;
    validate_data_path(config)?;
    validate_code(config)?;
    validate_dates(config)?;
    Ok(())
}

pub fn validate_grid_config(config: &dyn ConfigPort) -> Result<(), GridtraderError> {
    let market = validate_market(config)?;
    validate_grid_spec(config)?;
    validate_trade_quantity(config, market)?;
    validate_price_band(config)?;
    validate_capital(config)?;
    validate_grid_count(config)?;
    Ok(())
}

fn validate_commission(config: &dyn ConfigPort) -> Result<(), GridtraderError> {
    let rate = config.get_double("backtest", "commission_rate", 0.0);
    if rate < 0.0 {
        return Err(GridtraderError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "commission_rate".to_string(),
            reason: "commission_rate must be non-negative".to_string(),
        });
    }
    let min = config.get_double("backtest", "min_commission", 0.0);
    if min < 0.0 {
        return Err(GridtraderError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "min_commission".to_string(),
            reason: "min_commission must be non-negative".to_string(),
        });
    }
    Ok(())
}

fn validate_risk_free_rate(config: &dyn ConfigPort) -> Result<(), GridtraderError> {
    let value = config.get_double("backtest", "risk_free_rate", 0.0);
    if value < 0.0 || value >= 1.0 {
        return Err(GridtraderError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "risk_free_rate".to_string(),
            reason: "risk_free_rate must be between 0 and 1".to_string(),
        });
    }
    Ok(())
}

fn validate_trading_days(config: &dyn ConfigPort) -> Result<(), GridtraderError> {
    let value = config.get_int("backtest", "trading_days_per_year", 244);
    if value < 1 {
        return Err(GridtraderError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "trading_days_per_year".to_string(),
            reason: "trading_days_per_year must be at least 1".to_string(),
        });
    }
    Ok(())
}

fn validate_data_path(config: &dyn ConfigPort) -> Result<(), GridtraderError> {
    match config.get_string("backtest", "data_path") {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(GridtraderError::ConfigMissing {
            section: "backtest".to_string(),
            key: "data_path".to_string(),
        }),
    }
}

fn validate_code(config: &dyn ConfigPort) -> Result<(), GridtraderError> {
    match config.get_string("backtest", "code") {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(GridtraderError::ConfigMissing {
            section: "backtest".to_string(),
            key: "code".to_string(),
        }),
    }
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), GridtraderError> {
    let start_str = config.get_string("backtest", "start_date");
    let end_str = config.get_string("backtest", "end_date");

    let start_date = parse_date(start_str.as_deref(), "start_date")?;
    let end_date = parse_date(end_str.as_deref(), "end_date")?;

    if start_date >= end_date {
        return Err(GridtraderError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "start_date".to_string(),
            reason: "start_date must be before end_date".to_string(),
        });
    }
    Ok(())
}

fn parse_date(value: Option<&str>, field: &str) -> Result<NaiveDate, GridtraderError> {
    match value {
        None => Err(GridtraderError::ConfigMissing {
            section: "backtest".to_string(),
            key: field.to_string(),
        }),
        Some(s) => {
            NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| GridtraderError::ConfigInvalid {
                section: "backtest".to_string(),
                key: field.to_string(),
                reason: format!("invalid {} format, expected YYYY-MM-DD", field),
            })
        }
    }
}

fn validate_market(config: &dyn ConfigPort) -> Result<Market, GridtraderError> {
    let value = config.get_string("grid", "market");
    match value.as_deref().and_then(Market::from_code) {
        Some(market) => Ok(market),
        None if value.is_none() => Err(GridtraderError::ConfigMissing {
            section: "grid".to_string(),
            key: "market".to_string(),
        }),
        None => Err(GridtraderError::ConfigInvalid {
            section: "grid".to_string(),
            key: "market".to_string(),
            reason: "market must be one of cn, hk, us".to_string(),
        }),
    }
}

fn validate_grid_spec(config: &dyn ConfigPort) -> Result<(), GridtraderError> {
    let grid_type = config.get_string("grid", "type");
    match grid_type.as_deref().map(str::trim) {
        Some("arithmetic") => {
            let step = config.get_double("grid", "step_size", 0.0);
            if step <= 0.0 {
                return Err(GridtraderError::ConfigInvalid {
                    section: "grid".to_string(),
                    key: "step_size".to_string(),
                    reason: "step_size must be positive".to_string(),
                });
            }
            Ok(())
        }
        Some("geometric") => {
            let ratio = config.get_double("grid", "step_ratio", 0.0);
            if ratio <= 0.0 || ratio >= 1.0 {
                return Err(GridtraderError::ConfigInvalid {
                    section: "grid".to_string(),
                    key: "step_ratio".to_string(),
                    reason: "step_ratio must be between 0 and 1".to_string(),
                });
            }
            Ok(())
        }
        Some(_) => Err(GridtraderError::ConfigInvalid {
            section: "grid".to_string(),
            key: "type".to_string(),
            reason: "type must be arithmetic or geometric".to_string(),
        }),
        None => Err(GridtraderError::ConfigMissing {
            section: "grid".to_string(),
            key: "type".to_string(),
        }),
    }
}

fn validate_trade_quantity(config: &dyn ConfigPort, market: Market) -> Result<(), GridtraderError> {
    let quantity = config.get_int("grid", "single_trade_quantity", 0);
    if quantity < 1 {
        return Err(GridtraderError::ConfigInvalid {
            section: "grid".to_string(),
            key: "single_trade_quantity".to_string(),
            reason: "single_trade_quantity must be positive".to_string(),
        });
    }
    if quantity % market.lot_size() != 0 {
        return Err(GridtraderError::ConfigInvalid {
            section: "grid".to_string(),
            key: "single_trade_quantity".to_string(),
            reason: format!(
                "single_trade_quantity must be a multiple of the lot size ({})",
                market.lot_size()
            ),
        });
    }
    Ok(())
}

fn validate_price_band(config: &dyn ConfigPort) -> Result<(), GridtraderError> {
    let lower = config.get_double("grid", "price_lower", 0.0);
    let upper = config.get_double("grid", "price_upper", 0.0);
    if lower <= 0.0 {
        return Err(GridtraderError::ConfigInvalid {
            section: "grid".to_string(),
            key: "price_lower".to_string(),
            reason: "price_lower must be positive".to_string(),
        });
    }
    if upper <= lower {
        return Err(GridtraderError::ConfigInvalid {
            section: "grid".to_string(),
            key: "price_upper".to_string(),
            reason: "price_upper must be greater than price_lower".to_string(),
        });
    }

    let base = config.get_double("grid", "base_price", 0.0);
    if base < lower || base > upper {
        return Err(GridtraderError::ConfigInvalid {
            section: "grid".to_string(),
            key: "base_price".to_string(),
            reason: "base_price must lie within [price_lower, price_upper]".to_string(),
        });
    }
    Ok(())
}

fn validate_capital(config: &dyn ConfigPort) -> Result<(), GridtraderError> {
    let base = config.get_double("grid", "base_position_amount", 0.0);
    if base < 0.0 {
        return Err(GridtraderError::ConfigInvalid {
            section: "grid".to_string(),
            key: "base_position_amount".to_string(),
            reason: "base_position_amount must be non-negative".to_string(),
        });
    }
    let trading = config.get_double("grid", "grid_trading_amount", 0.0);
    if trading < 0.0 {
        return Err(GridtraderError::ConfigInvalid {
            section: "grid".to_string(),
            key: "grid_trading_amount".to_string(),
            reason: "grid_trading_amount must be non-negative".to_string(),
        });
    }
    if base + trading <= 0.0 {
        return Err(GridtraderError::ConfigInvalid {
            section: "grid".to_string(),
            key: "grid_trading_amount".to_string(),
            reason: "total capital (base_position_amount + grid_trading_amount) must be positive"
                .to_string(),
        });
    }
    Ok(())
}

fn validate_grid_count(config: &dyn ConfigPort) -> Result<(), GridtraderError> {
    let value = config.get_int("grid", "grid_count", 0);
    if value < 1 {
        return Err(GridtraderError::ConfigInvalid {
            section: "grid".to_string(),
            key: "grid_count".to_string(),
            reason: "grid_count must be at least 1".to_string(),
        });
    }
    Ok(())
}
