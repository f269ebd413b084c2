//! Report generation port trait.

use crate::domain::engine::BacktestResult;
use crate::domain::error::GridtraderError;
use crate::domain::metrics::{BenchmarkComparison, PerformanceMetrics};
use crate::domain::strategy::GridStrategy;

/// Everything a report renderer needs from one finished run.
pub struct ReportContext<'a> {
    pub strategy: &'a GridStrategy,
    pub result: &'a BacktestResult,
    pub metrics: &'a PerformanceMetrics,
    pub benchmark: &'a BenchmarkComparison,
    pub initial_capital: f64,
}

/// Port for writing backtest reports.
pub trait ReportPort {
    fn write(&self, context: &ReportContext, output_path: &str) -> Result<(), GridtraderError>;
}
