//! K-line bar representation.

use chrono::NaiveDateTime;

/// One price bar per fixed sampling interval (e.g. 5 minutes), ascending by time.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct KBar {
    pub time: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl KBar {
    /// (open + high + low + close) / 4, the fill price used for grid trades.
    pub fn ohlc_average(&self) -> f64 {
        (self.open + self.high + self.low + self.close) / 4.0
    }

    /// low <= {open, close} <= high, volume >= 0
    pub fn is_well_formed(&self) -> bool {
        self.low <= self.open
            && self.low <= self.close
            && self.open <= self.high
            && self.close <= self.high
            && self.volume >= 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_bar() -> KBar {
        KBar {
            time: NaiveDate::from_ymd_opt(2024, 1, 2)
                .unwrap()
                .and_hms_opt(9, 30, 0)
                .unwrap(),
            open: 9.8,
            high: 10.2,
            low: 9.6,
            close: 10.0,
            volume: 1_000_000,
        }
    }

    #[test]
    fn ohlc_average() {
        let bar = sample_bar();
        // (9.8 + 10.2 + 9.6 + 10.0) / 4 = 9.9
        assert!((bar.ohlc_average() - 9.9).abs() < 1e-12);
    }

    #[test]
    fn well_formed_bar() {
        assert!(sample_bar().is_well_formed());
    }

    #[test]
    fn low_above_close_is_malformed() {
        let mut bar = sample_bar();
        bar.low = 10.1;
        assert!(!bar.is_well_formed());
    }

    #[test]
    fn negative_volume_is_malformed() {
        let mut bar = sample_bar();
        bar.volume = -1;
        assert!(!bar.is_well_formed());
    }
}
