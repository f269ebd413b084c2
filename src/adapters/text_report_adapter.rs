//! Plain-text report adapter implementing ReportPort.
//!
//! Writes a performance summary plus the trade table, and can dump the raw
//! trade log as CSV for downstream analysis.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::domain::error::GridtraderError;
use crate::domain::grid::GridSpec;
use crate::domain::state::TradeRecord;
use crate::ports::report_port::{ReportContext, ReportPort};

pub struct TextReportAdapter;

impl TextReportAdapter {
    pub fn new() -> Self {
        Self
    }

    fn render(context: &ReportContext) -> String {
        let metrics = context.metrics;
        let benchmark = context.benchmark;
        let strategy = context.strategy;
        let final_capital = context.result.final_state.total_asset;

        let mut out = String::new();
        let _ = writeln!(out, "=== Grid Backtest Report ===");
        let _ = writeln!(out);
        match strategy.grid {
            GridSpec::Arithmetic { step } => {
                let _ = writeln!(out, "Grid type:            arithmetic (step {:.4})", step);
            }
            GridSpec::Geometric { ratio } => {
                let _ = writeln!(out, "Grid type:            geometric (ratio {:.4})", ratio);
            }
        }
        let _ = writeln!(out, "Base price:           {:.4}", strategy.base_price);
        let _ = writeln!(
            out,
            "Price band:           [{:.4}, {:.4}]",
            strategy.price_lower, strategy.price_upper
        );
        let _ = writeln!(out, "Grid count:           {}", strategy.grid_count);
        let _ = writeln!(out);
        let _ = writeln!(out, "Initial capital:      {:.2}", context.initial_capital);
        let _ = writeln!(out, "Final capital:        {:.2}", final_capital);
        let _ = writeln!(out, "Absolute profit:      {:.2}", metrics.absolute_profit);
        let _ = writeln!(
            out,
            "Total return:         {:.2}%",
            metrics.total_return * 100.0
        );
        let _ = writeln!(
            out,
            "Annualized return:    {:.2}%",
            metrics.annualized_return * 100.0
        );
        let _ = writeln!(
            out,
            "Max drawdown:         {:.2}%",
            metrics.max_drawdown * 100.0
        );
        let _ = writeln!(
            out,
            "Volatility:           {:.2}%",
            metrics.volatility * 100.0
        );
        match metrics.sharpe_ratio {
            Some(s) => {
                let _ = writeln!(out, "Sharpe ratio:         {:.2}", s);
            }
            None => {
                let _ = writeln!(out, "Sharpe ratio:         n/a");
            }
        }
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "Trades:               {} ({} buys, {} sells)",
            metrics.total_trades, metrics.buy_trades, metrics.sell_trades
        );
        let _ = writeln!(out, "Win rate:             {:.2}%", metrics.win_rate * 100.0);
        match metrics.profit_loss_ratio {
            Some(r) => {
                let _ = writeln!(out, "Profit/loss ratio:    {:.2}", r);
            }
            None => {
                let _ = writeln!(out, "Profit/loss ratio:    n/a");
            }
        }
        let _ = writeln!(
            out,
            "Grid trigger rate:    {:.2}%",
            metrics.grid_trigger_rate * 100.0
        );
        let _ = writeln!(
            out,
            "Capital utilization:  {:.2}%",
            metrics.capital_utilization_rate * 100.0
        );
        let _ = writeln!(out);
        let _ = writeln!(out, "--- Benchmark (buy and hold) ---");
        let _ = writeln!(
            out,
            "Hold return:          {:.2}%",
            benchmark.hold_return * 100.0
        );
        let _ = writeln!(
            out,
            "Excess return:        {:.2}%",
            benchmark.excess_return * 100.0
        );
        let _ = writeln!(
            out,
            "Excess return rate:   {:.2}%",
            benchmark.excess_return_rate * 100.0
        );
        let _ = writeln!(out);
        let _ = writeln!(out, "--- Trades ---");
        let _ = writeln!(
            out,
            "{:<20} {:<5} {:>10} {:>8} {:>10} {:>12} {:>8} {:>12}",
            "time", "side", "price", "qty", "commission", "profit", "position", "cash"
        );
        for trade in &context.result.trade_records {
            let profit = trade
                .profit
                .map(|p| format!("{:.2}", p))
                .unwrap_or_else(|| "-".to_string());
            let _ = writeln!(
                out,
                "{:<20} {:<5} {:>10.4} {:>8} {:>10.2} {:>12} {:>8} {:>12.2}",
                trade.time.format("%Y-%m-%d %H:%M:%S"),
                trade.side,
                trade.price,
                trade.quantity,
                trade.commission,
                profit,
                trade.position,
                trade.cash
            );
        }
        out
    }

    /// Dump the raw trade records as a CSV file.
    pub fn write_trade_log<P: AsRef<Path>>(
        trades: &[TradeRecord],
        path: P,
    ) -> Result<(), GridtraderError> {
        let mut wtr = csv::Writer::from_path(path.as_ref()).map_err(|e| GridtraderError::Data {
            reason: format!("failed to create {}: {}", path.as_ref().display(), e),
        })?;

        wtr.write_record([
            "time",
            "side",
            "price",
            "quantity",
            "commission",
            "profit",
            "position",
            "cash",
        ])
        .map_err(|e| GridtraderError::Data {
            reason: format!("CSV write error: {}", e),
        })?;

        for trade in trades {
            let profit = trade.profit.map(|p| p.to_string()).unwrap_or_default();
            wtr.write_record([
                trade.time.format("%Y-%m-%d %H:%M:%S").to_string(),
                trade.side.to_string(),
                trade.price.to_string(),
                trade.quantity.to_string(),
                trade.commission.to_string(),
                profit,
                trade.position.to_string(),
                trade.cash.to_string(),
            ])
            .map_err(|e| GridtraderError::Data {
                reason: format!("CSV write error: {}", e),
            })?;
        }

        wtr.flush()?;
        Ok(())
    }
}

impl Default for TextReportAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportPort for TextReportAdapter {
    fn write(&self, context: &ReportContext, output_path: &str) -> Result<(), GridtraderError> {
        let report = Self::render(context);
        fs::write(output_path, report)?;
        Ok(())
    }
}
