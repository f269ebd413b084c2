//! Grid trading state machine: initial position bootstrap, per-bar trigger
//! checks with multi-level deviation fills, and buy/sell state mutation.

use chrono::NaiveDateTime;

use crate::domain::fees::FeeCalculator;
use crate::domain::grid::GridSpec;
use crate::domain::kbar::KBar;
use crate::domain::state::{BacktestState, TradeRecord, TradeSide};
use crate::domain::strategy::GridStrategy;

/// Why a bar produced no trade. These are valid strategy states, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Close outside the grid band; the grid is suspended.
    OutOfBand,
    /// Neither trigger level was touched.
    NoTrigger,
    InsufficientCash,
    InsufficientPosition,
}

/// Outcome of evaluating one bar.
#[derive(Debug, Clone, PartialEq)]
pub enum TradeOutcome {
    Executed(TradeRecord),
    Skipped(SkipReason),
}

pub struct TradingLogic {
    grid: GridSpec,
    single_quantity: i64,
    lot_size: i64,
    fees: FeeCalculator,
}

impl TradingLogic {
    pub fn new(strategy: &GridStrategy, fees: FeeCalculator) -> Self {
        Self {
            grid: strategy.grid,
            single_quantity: strategy.single_trade_quantity,
            lot_size: strategy.market.lot_size(),
            fees,
        }
    }

    /// Bootstrap the run's state from the first bar: buy the base position at
    /// the bar's OHLC average, floored to a whole number of lots. Falls back
    /// to an all-cash zero position when the allocation cannot fill one lot or
    /// the cost (commission included) exceeds total capital.
    ///
    /// The grid stays anchored at the strategy's base price, not the fill.
    pub fn execute_initial_position(
        &self,
        first_bar: &KBar,
        base_position_amount: f64,
        total_capital: f64,
        strategy_base_price: f64,
        price_lower: f64,
        price_upper: f64,
    ) -> (BacktestState, Option<TradeRecord>) {
        let fill_price = first_bar.ohlc_average();

        let shares = if fill_price > 0.0 {
            let theoretical = (base_position_amount / fill_price).floor() as i64;
            (theoretical / self.lot_size) * self.lot_size
        } else {
            0
        };

        if shares < self.lot_size {
            return (
                self.zero_position(total_capital, strategy_base_price, price_lower, price_upper),
                None,
            );
        }

        let cost = self.fees.calculate_buy_cost(fill_price, shares);
        if cost > total_capital {
            return (
                self.zero_position(total_capital, strategy_base_price, price_lower, price_upper),
                None,
            );
        }

        let cash = total_capital - cost;
        let (buy_price, sell_price) = self.grid.grid_prices(strategy_base_price);
        let total_asset = cash + shares as f64 * fill_price;

        let state = BacktestState {
            cash,
            position: shares,
            base_price: strategy_base_price,
            buy_price,
            sell_price,
            total_asset,
            peak_asset: total_asset,
            price_lower,
            price_upper,
        };

        let record = TradeRecord {
            time: first_bar.time,
            side: TradeSide::Buy,
            price: fill_price,
            quantity: shares,
            commission: cost - fill_price * shares as f64,
            profit: None,
            position: shares,
            cash,
        };

        (state, Some(record))
    }

    fn zero_position(
        &self,
        total_capital: f64,
        strategy_base_price: f64,
        price_lower: f64,
        price_upper: f64,
    ) -> BacktestState {
        let (buy_price, sell_price) = self.grid.grid_prices(strategy_base_price);
        BacktestState {
            cash: total_capital,
            position: 0,
            base_price: strategy_base_price,
            buy_price,
            sell_price,
            total_asset: total_capital,
            peak_asset: total_capital,
            price_lower,
            price_upper,
        }
    }

    /// Evaluate one bar against the active grid. At most one trade per bar,
    /// buy before sell; trades fill at the bar's OHLC average with quantity
    /// multiplied by `1 + deviation` levels crossed.
    pub fn check_and_execute(&self, state: &mut BacktestState, bar: &KBar) -> TradeOutcome {
        if bar.close < state.price_lower || bar.close > state.price_upper {
            return TradeOutcome::Skipped(SkipReason::OutOfBand);
        }

        let (next_buy, next_sell) = self.grid.grid_prices(state.base_price);

        if bar.low <= next_buy {
            let deviation = self.grid.deviation(next_buy, bar.low);
            let quantity = self.single_quantity * (1 + deviation);
            let price = bar.ohlc_average();

            let required = self.fees.calculate_buy_cost(price, quantity);
            if state.cash >= required {
                TradeOutcome::Executed(self.execute_buy(state, bar.time, price, quantity))
            } else {
                TradeOutcome::Skipped(SkipReason::InsufficientCash)
            }
        } else if bar.high >= next_sell {
            let deviation = self.grid.deviation(bar.high, next_sell);
            let quantity = self.single_quantity * (1 + deviation);
            let price = bar.ohlc_average();

            if state.position >= quantity {
                TradeOutcome::Executed(self.execute_sell(state, bar.time, price, quantity))
            } else {
                TradeOutcome::Skipped(SkipReason::InsufficientPosition)
            }
        } else {
            TradeOutcome::Skipped(SkipReason::NoTrigger)
        }
    }

    fn execute_buy(
        &self,
        state: &mut BacktestState,
        time: NaiveDateTime,
        price: f64,
        quantity: i64,
    ) -> TradeRecord {
        let cost = self.fees.calculate_buy_cost(price, quantity);
        let commission = cost - price * quantity as f64;

        state.cash -= cost;
        state.position += quantity;
        self.reanchor(state, price);

        TradeRecord {
            time,
            side: TradeSide::Buy,
            price,
            quantity,
            commission,
            profit: None,
            position: state.position,
            cash: state.cash,
        }
    }

    fn execute_sell(
        &self,
        state: &mut BacktestState,
        time: NaiveDateTime,
        price: f64,
        quantity: i64,
    ) -> TradeRecord {
        let income = self.fees.calculate_sell_income(price, quantity);
        let commission = price * quantity as f64 - income;

        // Average-cost approximation of the realized profit, taken from the
        // state before the sell. The FIFO-matched figure lives in metrics.
        let avg_cost = if state.position > 0 {
            (state.total_asset - state.cash) / state.position as f64
        } else {
            price
        };
        let profit = (price - avg_cost) * quantity as f64 - commission;

        state.cash += income;
        state.position -= quantity;
        self.reanchor(state, price);

        TradeRecord {
            time,
            side: TradeSide::Sell,
            price,
            quantity,
            commission,
            profit: Some(profit),
            position: state.position,
            cash: state.cash,
        }
    }

    /// Every fill becomes the new grid anchor; trigger levels and asset
    /// tracking follow.
    fn reanchor(&self, state: &mut BacktestState, price: f64) {
        state.base_price = price;
        let (buy_price, sell_price) = self.grid.grid_prices(price);
        state.buy_price = buy_price;
        state.sell_price = sell_price;
        state.total_asset = state.cash + state.position as f64 * price;
        state.peak_asset = state.peak_asset.max(state.total_asset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::strategy::Market;
    use chrono::NaiveDate;

    fn bar(open: f64, high: f64, low: f64, close: f64) -> KBar {
        KBar {
            time: NaiveDate::from_ymd_opt(2024, 1, 2)
                .unwrap()
                .and_hms_opt(9, 30, 0)
                .unwrap(),
            open,
            high,
            low,
            close,
            volume: 1_000_000,
        }
    }

    fn strategy(market: Market) -> GridStrategy {
        GridStrategy {
            grid: GridSpec::Arithmetic { step: 0.1 },
            single_trade_quantity: 100,
            market,
            base_price: 10.0,
            price_lower: 9.0,
            price_upper: 11.0,
            base_position_amount: 30_000.0,
            grid_trading_amount: 70_000.0,
            grid_count: 20,
        }
    }

    fn logic(market: Market) -> TradingLogic {
        TradingLogic::new(&strategy(market), FeeCalculator::new(0.0002, 5.0))
    }

    fn bootstrapped_state(logic: &TradingLogic) -> BacktestState {
        let (state, trade) = logic.execute_initial_position(
            &bar(9.8, 10.2, 9.6, 10.0),
            30_000.0,
            100_000.0,
            10.0,
            9.0,
            11.0,
        );
        assert!(trade.is_some());
        state
    }

    #[test]
    fn initial_position_fills_at_ohlc_average() {
        let logic = logic(Market::Cn);
        let (state, trade) = logic.execute_initial_position(
            &bar(9.8, 10.2, 9.6, 10.0),
            30_000.0,
            100_000.0,
            10.0,
            9.0,
            11.0,
        );

        // fill = 9.9; 30000 / 9.9 = 3030.3 -> 3000 shares (whole lots)
        let trade = trade.unwrap();
        assert_eq!(state.position, 3_000);
        assert_eq!(trade.quantity, 3_000);
        assert!((trade.price - 9.9).abs() < 1e-12);
        assert_eq!(trade.side, TradeSide::Buy);
        assert!(trade.profit.is_none());

        let cost = 3_000.0 * 9.9 + (3_000.0 * 9.9 * 0.0002_f64).max(5.0);
        assert!((state.cash - (100_000.0 - cost)).abs() < 1e-9);
    }

    #[test]
    fn initial_position_anchors_at_strategy_price() {
        let logic = logic(Market::Cn);
        // Bar well below the anchor; fill and anchor must differ.
        let (state, trade) = logic.execute_initial_position(
            &bar(9.0, 9.5, 8.8, 9.2),
            30_000.0,
            100_000.0,
            10.0,
            9.0,
            11.0,
        );

        let fill = (9.0 + 9.5 + 8.8 + 9.2) / 4.0;
        assert!((state.base_price - 10.0).abs() < f64::EPSILON);
        assert!((trade.unwrap().price - fill).abs() < 1e-12);
        assert!((state.buy_price - 9.9).abs() < f64::EPSILON);
        assert!((state.sell_price - 10.1).abs() < f64::EPSILON);
    }

    #[test]
    fn initial_position_commission() {
        let logic = logic(Market::Cn);
        let (state, trade) = logic.execute_initial_position(
            &bar(10.0, 10.0, 10.0, 10.0),
            30_000.0,
            100_000.0,
            10.0,
            9.0,
            11.0,
        );

        let trade = trade.unwrap();
        let expected_commission = (3_000.0 * 10.0 * 0.0002_f64).max(5.0);
        assert!((trade.commission - expected_commission).abs() < 1e-9);
        assert!((state.cash - (100_000.0 - 30_000.0 - expected_commission)).abs() < 1e-9);
    }

    #[test]
    fn initial_position_below_one_lot_falls_back_to_cash() {
        let logic = logic(Market::Cn);
        let (state, trade) = logic.execute_initial_position(
            &bar(10.0, 10.0, 10.0, 10.0),
            50.0,
            100_000.0,
            10.0,
            9.0,
            11.0,
        );

        assert!(trade.is_none());
        assert_eq!(state.position, 0);
        assert!((state.cash - 100_000.0).abs() < f64::EPSILON);
        assert!((state.base_price - 10.0).abs() < f64::EPSILON);
        assert!((state.peak_asset - 100_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn initial_position_cost_above_capital_falls_back_to_cash() {
        let logic = logic(Market::Cn);
        // 10000 shares cost 100_000 + commission, just over total capital.
        let (state, trade) = logic.execute_initial_position(
            &bar(10.0, 10.0, 10.0, 10.0),
            100_000.0,
            100_000.0,
            10.0,
            9.0,
            11.0,
        );

        assert!(trade.is_none());
        assert_eq!(state.position, 0);
        assert!((state.cash - 100_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn us_market_fills_single_shares() {
        let logic = logic(Market::Us);
        let (state, trade) = logic.execute_initial_position(
            &bar(100.0, 100.0, 100.0, 100.0),
            150.0,
            10_000.0,
            100.0,
            90.0,
            110.0,
        );

        assert_eq!(state.position, 1);
        assert_eq!(trade.unwrap().quantity, 1);
    }

    #[test]
    fn position_is_whole_lots() {
        let logic = logic(Market::Cn);
        let state = bootstrapped_state(&logic);
        assert_eq!(state.position % 100, 0);
    }

    #[test]
    fn buy_triggers_at_low_crossing() {
        let logic = logic(Market::Cn);
        let mut state = bootstrapped_state(&logic);

        // low 9.85 <= buy trigger 9.9; zero extra deviation
        let bar = bar(9.92, 9.95, 9.85, 9.9);
        let outcome = logic.check_and_execute(&mut state, &bar);

        match outcome {
            TradeOutcome::Executed(record) => {
                assert_eq!(record.side, TradeSide::Buy);
                assert_eq!(record.quantity, 100);
                assert!((record.price - bar.ohlc_average()).abs() < 1e-12);
                assert_eq!(state.position, 3_100);
                // grid reanchored to the fill price
                assert!((state.base_price - bar.ohlc_average()).abs() < 1e-12);
            }
            other => panic!("expected buy, got {other:?}"),
        }
    }

    #[test]
    fn deep_drop_buys_multiple_levels() {
        let logic = logic(Market::Cn);
        let mut state = bootstrapped_state(&logic);

        // low 9.65: floor(|9.9 - 9.65| / 0.1) = 2 extra levels -> 300 shares
        let outcome = logic.check_and_execute(&mut state, &bar(9.8, 9.85, 9.65, 9.7));
        match outcome {
            TradeOutcome::Executed(record) => assert_eq!(record.quantity, 300),
            other => panic!("expected buy, got {other:?}"),
        }
    }

    #[test]
    fn sell_triggers_at_high_crossing() {
        let logic = logic(Market::Cn);
        let mut state = bootstrapped_state(&logic);

        let bar = bar(10.08, 10.15, 10.05, 10.1);
        let outcome = logic.check_and_execute(&mut state, &bar);

        match outcome {
            TradeOutcome::Executed(record) => {
                assert_eq!(record.side, TradeSide::Sell);
                assert_eq!(record.quantity, 100);
                assert!(record.profit.is_some());
                assert_eq!(state.position, 2_900);
            }
            other => panic!("expected sell, got {other:?}"),
        }
    }

    #[test]
    fn buy_takes_priority_over_sell() {
        let logic = logic(Market::Cn);
        let mut state = bootstrapped_state(&logic);

        // Wide bar touching both triggers; buy wins.
        let outcome = logic.check_and_execute(&mut state, &bar(10.0, 10.2, 9.85, 10.0));
        match outcome {
            TradeOutcome::Executed(record) => assert_eq!(record.side, TradeSide::Buy),
            other => panic!("expected buy, got {other:?}"),
        }
    }

    #[test]
    fn close_outside_band_suspends_grid() {
        let logic = logic(Market::Cn);
        let mut state = bootstrapped_state(&logic);

        let outcome = logic.check_and_execute(&mut state, &bar(8.9, 9.0, 8.7, 8.8));
        assert_eq!(outcome, TradeOutcome::Skipped(SkipReason::OutOfBand));
        assert_eq!(state.position, 3_000);
    }

    #[test]
    fn quiet_bar_is_no_trigger() {
        let logic = logic(Market::Cn);
        let mut state = bootstrapped_state(&logic);

        let outcome = logic.check_and_execute(&mut state, &bar(10.0, 10.05, 9.95, 10.0));
        assert_eq!(outcome, TradeOutcome::Skipped(SkipReason::NoTrigger));
    }

    #[test]
    fn buy_without_cash_is_skipped() {
        let logic = logic(Market::Cn);
        let mut state = bootstrapped_state(&logic);
        state.cash = 10.0;

        let outcome = logic.check_and_execute(&mut state, &bar(9.92, 9.95, 9.85, 9.9));
        assert_eq!(outcome, TradeOutcome::Skipped(SkipReason::InsufficientCash));
        assert_eq!(state.position, 3_000);
    }

    #[test]
    fn sell_without_position_is_skipped() {
        let logic = logic(Market::Cn);
        let mut state = bootstrapped_state(&logic);
        state.position = 0;

        let outcome = logic.check_and_execute(&mut state, &bar(10.08, 10.15, 10.05, 10.1));
        assert_eq!(
            outcome,
            TradeOutcome::Skipped(SkipReason::InsufficientPosition)
        );
    }

    #[test]
    fn sell_profit_uses_average_cost() {
        let logic = logic(Market::Cn);
        let mut state = bootstrapped_state(&logic);
        state.mark_to_market(10.0);

        let avg_cost = (state.total_asset - state.cash) / state.position as f64;
        let bar = bar(10.08, 10.15, 10.05, 10.1);
        let price = bar.ohlc_average();

        let outcome = logic.check_and_execute(&mut state, &bar);
        match outcome {
            TradeOutcome::Executed(record) => {
                let expected = (price - avg_cost) * 100.0 - record.commission;
                assert!((record.profit.unwrap() - expected).abs() < 1e-9);
            }
            other => panic!("expected sell, got {other:?}"),
        }
    }

    #[test]
    fn buy_updates_cash_and_levels() {
        let logic = logic(Market::Cn);
        let mut state = bootstrapped_state(&logic);
        let cash_before = state.cash;

        let bar = bar(9.92, 9.95, 9.85, 9.9);
        let price = bar.ohlc_average();
        logic.check_and_execute(&mut state, &bar);

        let cost = price * 100.0 + (price * 100.0 * 0.0002_f64).max(5.0);
        assert!((state.cash - (cash_before - cost)).abs() < 1e-9);
        assert!(state.buy_price < state.base_price);
        assert!(state.sell_price > state.base_price);
    }
}
