#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use gridtrader::domain::engine::BacktestConfig;
use gridtrader::domain::error::GridtraderError;
use gridtrader::domain::grid::GridSpec;
pub use gridtrader::domain::kbar::KBar;
use gridtrader::domain::strategy::{GridStrategy, Market};
use gridtrader::ports::data_port::DataPort;
use std::collections::HashMap;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<KBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, code: &str, bars: Vec<KBar>) -> Self {
        self.data.insert(code.to_string(), bars);
        self
    }

    pub fn with_error(mut self, code: &str, reason: &str) -> Self {
        self.errors.insert(code.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_kbars(
        &self,
        code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<KBar>, GridtraderError> {
        if let Some(reason) = self.errors.get(code) {
            return Err(GridtraderError::Data {
                reason: reason.clone(),
            });
        }
        let mut bars = self.data.get(code).cloned().unwrap_or_default();
        bars.retain(|b| {
            let date = b.time.date();
            date >= start_date && date <= end_date
        });
        Ok(bars)
    }

    fn get_data_range(
        &self,
        code: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, GridtraderError> {
        if let Some(reason) = self.errors.get(code) {
            return Err(GridtraderError::Data {
                reason: reason.clone(),
            });
        }
        match self.data.get(code) {
            Some(bars) if !bars.is_empty() => {
                let min = bars.iter().map(|b| b.time.date()).min().unwrap();
                let max = bars.iter().map(|b| b.time.date()).max().unwrap();
                Ok(Some((min, max, bars.len())))
            }
            _ => Ok(None),
        }
    }
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn datetime(date_str: &str) -> NaiveDateTime {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap()
}

pub fn make_bar(date_str: &str, open: f64, high: f64, low: f64, close: f64) -> KBar {
    KBar {
        time: datetime(date_str),
        open,
        high,
        low,
        close,
        volume: 100_000,
    }
}

/// A bar where all four prices are equal, so the OHLC-average fill is the
/// price itself.
pub fn flat_bar(date_str: &str, price: f64) -> KBar {
    make_bar(date_str, price, price, price, price)
}

pub fn sample_strategy() -> GridStrategy {
    GridStrategy {
        grid: GridSpec::Arithmetic { step: 0.03 },
        single_trade_quantity: 1_000,
        market: Market::Cn,
        base_price: 3.50,
        price_lower: 3.00,
        price_upper: 4.00,
        base_position_amount: 50_000.0,
        grid_trading_amount: 50_000.0,
        grid_count: 20,
    }
}

pub fn sample_config() -> BacktestConfig {
    BacktestConfig {
        commission_rate: 0.0002,
        min_commission: 5.0,
        risk_free_rate: 0.03,
        trading_days_per_year: 244,
    }
}
