//! Commission model: rate on notional with a minimum-fee floor.

#[derive(Debug, Clone)]
pub struct FeeCalculator {
    commission_rate: f64,
    min_commission: f64,
}

impl FeeCalculator {
    pub fn new(commission_rate: f64, min_commission: f64) -> Self {
        Self {
            commission_rate,
            min_commission,
        }
    }

    /// Commission for a trade notional: `max(amount * rate, min_commission)`.
    pub fn calculate(&self, amount: f64) -> f64 {
        (amount * self.commission_rate).max(self.min_commission)
    }

    /// Total cash outlay for a buy, commission included.
    pub fn calculate_buy_cost(&self, price: f64, quantity: i64) -> f64 {
        let amount = price * quantity as f64;
        amount + self.calculate(amount)
    }

    /// Net cash received for a sell, commission deducted.
    pub fn calculate_sell_income(&self, price: f64, quantity: i64) -> f64 {
        let amount = price * quantity as f64;
        amount - self.calculate(amount)
    }
}
