//! Grid strategy configuration.

use crate::domain::grid::GridSpec;

/// Market whose board-lot rule constrains trade quantities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Market {
    Cn,
    Hk,
    Us,
}

impl Market {
    /// Minimum tradeable lot: 100 shares on board-lot markets, 1 otherwise.
    pub fn lot_size(&self) -> i64 {
        match self {
            Market::Cn | Market::Hk => 100,
            Market::Us => 1,
        }
    }

    pub fn from_code(code: &str) -> Option<Market> {
        match code.to_lowercase().as_str() {
            "cn" => Some(Market::Cn),
            "hk" => Some(Market::Hk),
            "us" => Some(Market::Us),
            _ => None,
        }
    }
}

/// A fully-resolved grid strategy, as produced by an upstream optimizer:
/// spacing rule, price band, anchor price and fund allocation.
#[derive(Debug, Clone)]
pub struct GridStrategy {
    pub grid: GridSpec,
    pub single_trade_quantity: i64,
    pub market: Market,
    /// Anchor the active grid is centered on; not necessarily the first fill price.
    pub base_price: f64,
    pub price_lower: f64,
    pub price_upper: f64,
    pub base_position_amount: f64,
    pub grid_trading_amount: f64,
    /// Number of grid levels in the band, denominator of the trigger rate.
    pub grid_count: usize,
}

impl GridStrategy {
    pub fn total_capital(&self) -> f64 {
        self.base_position_amount + self.grid_trading_amount
    }
}
