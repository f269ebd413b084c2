//! Backtest engine: orchestrates one run over an ordered K-line series.

use crate::domain::error::GridtraderError;
use crate::domain::fees::FeeCalculator;
use crate::domain::kbar::KBar;
use crate::domain::state::{BacktestState, EquityPoint, TradeRecord};
use crate::domain::strategy::GridStrategy;
use crate::domain::trading::{TradeOutcome, TradingLogic};

#[derive(Debug, Clone)]
pub struct BacktestConfig {
    pub commission_rate: f64,
    pub min_commission: f64,
    pub risk_free_rate: f64,
    pub trading_days_per_year: u32,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            commission_rate: 0.0002,
            min_commission: 5.0,
            risk_free_rate: 0.03,
            trading_days_per_year: 244,
        }
    }
}

/// Output of one run: ordered trade log, equity curve and the final state.
#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub trade_records: Vec<TradeRecord>,
    pub equity_curve: Vec<EquityPoint>,
    pub final_state: BacktestState,
}

pub struct BacktestEngine {
    strategy: GridStrategy,
    logic: TradingLogic,
}

impl BacktestEngine {
    pub fn new(strategy: GridStrategy, config: &BacktestConfig) -> Self {
        let fees = FeeCalculator::new(config.commission_rate, config.min_commission);
        let logic = TradingLogic::new(&strategy, fees);
        Self { strategy, logic }
    }

    /// Run the simulation: bootstrap the base position on bar 0, then scan
    /// every bar in order: mark to market, record an equity point, and let
    /// the trading logic act. Bars must be ascending by time.
    pub fn run(&self, kline_data: &[KBar]) -> Result<BacktestResult, GridtraderError> {
        let first_bar = kline_data.first().ok_or(GridtraderError::EmptyKline)?;

        let total_capital = self.strategy.total_capital();
        let (mut state, bootstrap_trade) = self.logic.execute_initial_position(
            first_bar,
            self.strategy.base_position_amount,
            total_capital,
            self.strategy.base_price,
            self.strategy.price_lower,
            self.strategy.price_upper,
        );

        let mut trade_records = Vec::new();
        let mut equity_curve = Vec::with_capacity(kline_data.len());
        if let Some(trade) = bootstrap_trade {
            trade_records.push(trade);
        }

        for bar in kline_data {
            state.mark_to_market(bar.close);
            equity_curve.push(EquityPoint {
                time: bar.time,
                total_asset: state.total_asset,
                price: bar.close,
            });

            if let TradeOutcome::Executed(record) = self.logic.check_and_execute(&mut state, bar) {
                trade_records.push(record);
            }
        }

        Ok(BacktestResult {
            trade_records,
            equity_curve,
            final_state: state,
        })
    }
}
