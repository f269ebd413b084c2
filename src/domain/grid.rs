//! Grid price derivation and deviation multipliers.

/// Round a price to 4 decimal places, the grid's quote precision.
pub fn round_price(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Grid spacing rule: a fixed price step or a fixed ratio per level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GridSpec {
    Arithmetic { step: f64 },
    Geometric { ratio: f64 },
}

impl GridSpec {
    /// (buy, sell) trigger levels one grid step away from `base_price`.
    pub fn grid_prices(&self, base_price: f64) -> (f64, f64) {
        match *self {
            GridSpec::Arithmetic { step } => (
                round_price(base_price - step),
                round_price(base_price + step),
            ),
            GridSpec::Geometric { ratio } => (
                round_price(base_price * (1.0 - ratio)),
                round_price(base_price * (1.0 + ratio)),
            ),
        }
    }

    /// Whole extra grid levels between a trigger price and the bar extreme
    /// that crossed it. A fill at `deviation` levels past the trigger trades
    /// `1 + deviation` times the single-trade quantity.
    pub fn deviation(&self, trigger: f64, extreme: f64) -> i64 {
        match *self {
            GridSpec::Arithmetic { step } => ((trigger - extreme).abs() / step).floor() as i64,
            GridSpec::Geometric { ratio } => {
                if trigger > 0.0 && extreme > 0.0 {
                    ((trigger / extreme).ln().abs() / (1.0 + ratio).ln()).floor() as i64
                } else {
                    0
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic_grid_prices() {
        let grid = GridSpec::Arithmetic { step: 0.1 };
        let (buy, sell) = grid.grid_prices(10.0);
        assert!((buy - 9.9).abs() < f64::EPSILON);
        assert!((sell - 10.1).abs() < f64::EPSILON);
    }

    #[test]
    fn geometric_grid_prices() {
        let grid = GridSpec::Geometric { ratio: 0.01 };
        let (buy, sell) = grid.grid_prices(10.0);
        assert!((buy - 9.9).abs() < f64::EPSILON);
        assert!((sell - 10.1).abs() < f64::EPSILON);
    }

    #[test]
    fn grid_prices_round_to_four_decimals() {
        let grid = GridSpec::Geometric { ratio: 0.0123 };
        let (buy, sell) = grid.grid_prices(3.3333);
        assert!((buy - 3.2923).abs() < f64::EPSILON);
        assert!((sell - 3.3743).abs() < f64::EPSILON);
    }

    #[test]
    fn buy_below_base_below_sell() {
        for grid in [
            GridSpec::Arithmetic { step: 0.05 },
            GridSpec::Geometric { ratio: 0.02 },
        ] {
            let (buy, sell) = grid.grid_prices(7.5);
            assert!(buy < 7.5);
            assert!(sell > 7.5);
        }
    }

    #[test]
    fn arithmetic_deviation_counts_whole_steps() {
        let grid = GridSpec::Arithmetic { step: 0.1 };
        assert_eq!(grid.deviation(9.9, 9.9), 0);
        assert_eq!(grid.deviation(9.9, 9.85), 0);
        assert_eq!(grid.deviation(9.9, 9.79), 1);
        assert_eq!(grid.deviation(9.9, 9.55), 3);
    }

    #[test]
    fn arithmetic_deviation_is_symmetric() {
        let grid = GridSpec::Arithmetic { step: 0.1 };
        // Sell side: bar high past the sell trigger.
        assert_eq!(grid.deviation(10.1, 10.35), 2);
        assert_eq!(grid.deviation(10.35, 10.1), 2);
    }

    #[test]
    fn geometric_deviation_counts_log_steps() {
        let grid = GridSpec::Geometric { ratio: 0.01 };
        assert_eq!(grid.deviation(9.9, 9.9), 0);
        // Between one and two ratio steps down.
        assert_eq!(grid.deviation(9.9, 9.9 / 1.015), 1);
        // Between three and four steps.
        assert_eq!(grid.deviation(9.9, 9.9 / 1.035), 3);
    }

    #[test]
    fn geometric_deviation_guards_non_positive_prices() {
        let grid = GridSpec::Geometric { ratio: 0.01 };
        assert_eq!(grid.deviation(0.0, 9.9), 0);
        assert_eq!(grid.deviation(9.9, 0.0), 0);
        assert_eq!(grid.deviation(-1.0, 9.9), 0);
    }
}
