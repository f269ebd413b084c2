//! Performance metrics and benchmark comparison.

use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::domain::state::{EquityPoint, TradeRecord, TradeSide};

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PerformanceMetrics {
    // Return metrics
    pub total_return: f64,
    pub annualized_return: f64,
    pub absolute_profit: f64,

    // Risk metrics
    /// Largest peak-to-trough loss, reported as a negative fraction.
    pub max_drawdown: f64,
    /// `None` when volatility is zero.
    pub sharpe_ratio: Option<f64>,
    pub volatility: f64,

    // Trade metrics
    pub total_trades: usize,
    pub buy_trades: usize,
    pub sell_trades: usize,
    /// Fraction of FIFO-paired round trips with positive net profit.
    pub win_rate: f64,
    /// `None` when there are no profitable or no losing trades.
    pub profit_loss_ratio: Option<f64>,
    pub grid_trigger_rate: f64,
    pub capital_utilization_rate: f64,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct BenchmarkComparison {
    pub hold_return: f64,
    pub excess_return: f64,
    pub excess_return_rate: f64,
}

/// An open buy lot awaiting FIFO pairing against later sells.
struct BuyLot {
    price: f64,
    remaining: i64,
    original_quantity: i64,
    commission: f64,
}

pub struct MetricsCalculator {
    trading_days_per_year: f64,
    risk_free_rate: f64,
}

impl MetricsCalculator {
    pub fn new(trading_days_per_year: u32, risk_free_rate: f64) -> Self {
        Self {
            trading_days_per_year: trading_days_per_year as f64,
            risk_free_rate,
        }
    }

    /// Compute the full report from one run's output. `closes` is the bar
    /// close series the benchmark holds, `grid_count` the number of grid
    /// levels in the strategy's band.
    pub fn calculate_all(
        &self,
        initial_capital: f64,
        final_capital: f64,
        equity_curve: &[EquityPoint],
        trade_records: &[TradeRecord],
        closes: &[f64],
        grid_count: usize,
    ) -> (PerformanceMetrics, BenchmarkComparison) {
        let total_return = (final_capital - initial_capital) / initial_capital;
        let trading_days = Self::trading_days(equity_curve);
        let annualized_return = self.annualized_return(total_return, trading_days);

        let max_drawdown = Self::max_drawdown(equity_curve);
        let step_returns = Self::step_returns(equity_curve);
        let volatility = self.volatility(&step_returns);
        let sharpe_ratio = self.sharpe_ratio(annualized_return, volatility);

        let buy_trades = trade_records
            .iter()
            .filter(|t| t.side == TradeSide::Buy)
            .count();
        let sell_trades = trade_records.len() - buy_trades;

        let metrics = PerformanceMetrics {
            total_return,
            annualized_return,
            absolute_profit: final_capital - initial_capital,
            max_drawdown,
            sharpe_ratio,
            volatility,
            total_trades: trade_records.len(),
            buy_trades,
            sell_trades,
            win_rate: Self::paired_win_rate(trade_records),
            profit_loss_ratio: Self::profit_loss_ratio(trade_records),
            grid_trigger_rate: Self::grid_trigger_rate(trade_records, grid_count),
            capital_utilization_rate: Self::capital_utilization(
                trade_records,
                equity_curve,
                initial_capital,
            ),
        };

        (metrics, Self::benchmark(closes, total_return))
    }

    /// Distinct calendar dates covered by the equity curve.
    fn trading_days(equity_curve: &[EquityPoint]) -> usize {
        equity_curve
            .iter()
            .map(|p| p.time.date())
            .collect::<BTreeSet<NaiveDate>>()
            .len()
    }

    fn annualized_return(&self, total_return: f64, trading_days: usize) -> f64 {
        if trading_days == 0 {
            return 0.0;
        }
        total_return * (self.trading_days_per_year / trading_days as f64)
    }

    /// Running-peak drawdown, returned as a negative fraction (0 for an
    /// empty or non-decreasing curve).
    fn max_drawdown(equity_curve: &[EquityPoint]) -> f64 {
        let Some(first) = equity_curve.first() else {
            return 0.0;
        };

        let mut peak = first.total_asset;
        let mut max_dd = 0.0_f64;
        for point in equity_curve {
            peak = peak.max(point.total_asset);
            let drawdown = if peak > 0.0 {
                (peak - point.total_asset) / peak
            } else {
                0.0
            };
            max_dd = max_dd.max(drawdown);
        }

        -max_dd
    }

    /// Percentage change between consecutive equity samples (not resampled
    /// to calendar days).
    fn step_returns(equity_curve: &[EquityPoint]) -> Vec<f64> {
        equity_curve
            .windows(2)
            .filter(|w| w[0].total_asset > 0.0)
            .map(|w| (w[1].total_asset - w[0].total_asset) / w[0].total_asset)
            .collect()
    }

    /// Annualized sample standard deviation of step returns.
    fn volatility(&self, returns: &[f64]) -> f64 {
        if returns.len() < 2 {
            return 0.0;
        }
        let n = returns.len() as f64;
        let mean = returns.iter().sum::<f64>() / n;
        let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
        variance.sqrt() * self.trading_days_per_year.sqrt()
    }

    fn sharpe_ratio(&self, annualized_return: f64, volatility: f64) -> Option<f64> {
        if volatility == 0.0 {
            return None;
        }
        Some((annualized_return - self.risk_free_rate) / volatility)
    }

    /// FIFO-paired win rate: sells consume the oldest open buy lots, splitting
    /// lots as needed; each (possibly partial) pairing is a round trip whose
    /// net profit includes both commissions apportioned by quantity fraction.
    fn paired_win_rate(trade_records: &[TradeRecord]) -> f64 {
        let mut sorted: Vec<&TradeRecord> = trade_records.iter().collect();
        sorted.sort_by_key(|t| t.time);

        let mut buy_queue: VecDeque<BuyLot> = VecDeque::new();
        let mut profitable = 0usize;
        let mut total = 0usize;

        for trade in sorted {
            match trade.side {
                TradeSide::Buy => buy_queue.push_back(BuyLot {
                    price: trade.price,
                    remaining: trade.quantity,
                    original_quantity: trade.quantity,
                    commission: trade.commission,
                }),
                TradeSide::Sell => {
                    let mut unsold = trade.quantity;
                    while unsold > 0 {
                        let Some(lot) = buy_queue.front_mut() else {
                            break;
                        };
                        let paired = unsold.min(lot.remaining);

                        let buy_cost = lot.price * paired as f64;
                        let sell_revenue = trade.price * paired as f64;
                        let buy_fee =
                            lot.commission * paired as f64 / lot.original_quantity as f64;
                        let sell_fee =
                            trade.commission * paired as f64 / trade.quantity as f64;

                        let net_profit = sell_revenue - buy_cost - buy_fee - sell_fee;
                        if net_profit > 0.0 {
                            profitable += 1;
                        }
                        total += 1;

                        lot.remaining -= paired;
                        unsold -= paired;
                        if lot.remaining == 0 {
                            buy_queue.pop_front();
                        }
                    }
                }
            }
        }

        if total == 0 {
            return 0.0;
        }
        profitable as f64 / total as f64
    }

    /// Average profitable sell profit over average losing sell loss, from the
    /// per-trade average-cost profit field.
    fn profit_loss_ratio(trade_records: &[TradeRecord]) -> Option<f64> {
        let profits: Vec<f64> = trade_records
            .iter()
            .filter_map(|t| t.profit)
            .filter(|p| *p > 0.0)
            .collect();
        let losses: Vec<f64> = trade_records
            .iter()
            .filter_map(|t| t.profit)
            .filter(|p| *p < 0.0)
            .map(f64::abs)
            .collect();

        if profits.is_empty() || losses.is_empty() {
            return None;
        }

        let avg_profit = profits.iter().sum::<f64>() / profits.len() as f64;
        let avg_loss = losses.iter().sum::<f64>() / losses.len() as f64;
        if avg_loss > 0.0 {
            Some(avg_profit / avg_loss)
        } else {
            None
        }
    }

    /// Distinct fill prices over the number of grid levels.
    fn grid_trigger_rate(trade_records: &[TradeRecord], grid_count: usize) -> f64 {
        if grid_count == 0 {
            return 0.0;
        }
        let mut prices: Vec<f64> = trade_records.iter().map(|t| t.price).collect();
        prices.sort_by(f64::total_cmp);
        prices.dedup();
        prices.len() as f64 / grid_count as f64
    }

    /// Time-weighted capital utilization: one minus the time-weighted average
    /// cash balance over initial capital, clamped to [0, 1]. The cash timeline
    /// is piecewise constant, one piece per calendar date with a trade (the
    /// last balance of that date), starting from initial capital.
    fn capital_utilization(
        trade_records: &[TradeRecord],
        equity_curve: &[EquityPoint],
        initial_capital: f64,
    ) -> f64 {
        if initial_capital <= 0.0 || trade_records.is_empty() {
            return 0.0;
        }

        // Without a time reference, fall back to a simple mean of cash samples.
        let (Some(first), Some(last)) = (equity_curve.first(), equity_curve.last()) else {
            let mut sum = initial_capital;
            for trade in trade_records {
                sum += trade.cash;
            }
            let avg_cash = sum / (trade_records.len() + 1) as f64;
            return (1.0 - avg_cash / initial_capital).clamp(0.0, 1.0);
        };

        let start_date = first.time.date();
        let end_date = last.time.date();

        let mut sorted: Vec<&TradeRecord> = trade_records.iter().collect();
        sorted.sort_by_key(|t| t.time);

        // Last cash balance recorded per calendar date.
        let mut daily_cash: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for trade in sorted {
            daily_cash.insert(trade.time.date(), trade.cash);
        }

        let mut timeline: Vec<(NaiveDate, f64)> = vec![(start_date, initial_capital)];
        for (date, cash) in daily_cash {
            if date == start_date {
                timeline[0].1 = cash;
            } else {
                timeline.push((date, cash));
            }
        }

        let avg_cash = if timeline.len() == 1 {
            timeline[0].1
        } else {
            let total_days = (end_date - start_date).num_days() + 1;
            if total_days <= 0 {
                timeline.iter().map(|(_, c)| c).sum::<f64>() / timeline.len() as f64
            } else {
                let mut weighted = 0.0;
                for (i, &(date, cash)) in timeline.iter().enumerate() {
                    // The final piece extends through the end date inclusive.
                    let period_end = match timeline.get(i + 1) {
                        Some(&(next_date, _)) => next_date,
                        None => end_date + chrono::Days::new(1),
                    };
                    let duration = (period_end - date).num_days();
                    if duration > 0 {
                        weighted += cash * duration as f64 / total_days as f64;
                    }
                }
                weighted
            }
        };

        (1.0 - avg_cash / initial_capital).clamp(0.0, 1.0)
    }

    /// Buy-and-hold benchmark over the close series.
    fn benchmark(closes: &[f64], total_return: f64) -> BenchmarkComparison {
        if closes.len() < 2 {
            return BenchmarkComparison {
                hold_return: 0.0,
                excess_return: 0.0,
                excess_return_rate: 0.0,
            };
        }

        let hold_return = (closes[closes.len() - 1] - closes[0]) / closes[0];
        let excess_return = total_return - hold_return;
        let excess_return_rate = if hold_return != 0.0 {
            excess_return / hold_return
        } else {
            0.0
        };

        BenchmarkComparison {
            hold_return,
            excess_return,
            excess_return_rate,
        }
    }
}
