//! Backtest run state, trade records and equity tracking.

use chrono::NaiveDateTime;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum TradeSide {
    Buy,
    Sell,
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeSide::Buy => write!(f, "BUY"),
            TradeSide::Sell => write!(f, "SELL"),
        }
    }
}

/// One executed trade. Immutable once created; appended to the run's trade log.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TradeRecord {
    pub time: NaiveDateTime,
    pub side: TradeSide,
    pub price: f64,
    pub quantity: i64,
    pub commission: f64,
    /// Realized profit, average-cost approximation. `None` for buys.
    pub profit: Option<f64>,
    /// Position after the trade.
    pub position: i64,
    /// Cash after the trade.
    pub cash: f64,
}

/// Mutable state of one backtest run. Exclusively owned by the engine;
/// mutated in place on every trade and every bar's mark-to-market.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct BacktestState {
    pub cash: f64,
    pub position: i64,
    /// Reference price the active grid is anchored to.
    pub base_price: f64,
    pub buy_price: f64,
    pub sell_price: f64,
    pub total_asset: f64,
    pub peak_asset: f64,
    pub price_lower: f64,
    pub price_upper: f64,
}

impl BacktestState {
    /// Revalue the position at `close` and advance the running peak.
    pub fn mark_to_market(&mut self, close: f64) {
        self.total_asset = self.cash + self.position as f64 * close;
        self.peak_asset = self.peak_asset.max(self.total_asset);
    }
}

/// One equity-curve sample: total asset and reference price at a bar's time.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct EquityPoint {
    pub time: NaiveDateTime,
    pub total_asset: f64,
    pub price: f64,
}
