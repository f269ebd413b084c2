//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::text_report_adapter::TextReportAdapter;
use crate::domain::config_validation::{validate_backtest_config, validate_grid_config};
use crate::domain::engine::{BacktestConfig, BacktestEngine};
use crate::domain::error::GridtraderError;
use crate::domain::grid::GridSpec;
use crate::domain::metrics::MetricsCalculator;
use crate::domain::strategy::{GridStrategy, Market};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::{ReportContext, ReportPort};

#[derive(Parser, Debug)]
#[command(name = "gridtrader", about = "Grid trading strategy backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        trade_log: Option<PathBuf>,
        #[arg(long)]
        code: Option<String>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show data range for a code
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        code: Option<String>,
    },
}

/// Everything needed to locate the K-bar series for one run.
#[derive(Debug)]
pub struct DataSpec {
    pub data_path: PathBuf,
    pub code: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            output,
            trade_log,
            code,
        } => run_backtest(&config, output.as_ref(), trade_log.as_ref(), code.as_deref()),
        Command::Validate { config } => run_validate(&config),
        Command::Info { config, code } => run_info(&config, code.as_deref()),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = GridtraderError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn run_backtest(
    config_path: &PathBuf,
    output_path: Option<&PathBuf>,
    trade_log_path: Option<&PathBuf>,
    code_override: Option<&str>,
) -> ExitCode {
    // Stage 1: Load and validate config
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    if let Err(e) = validate_backtest_config(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }
    if let Err(e) = validate_grid_config(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    // Stage 2: Build strategy and run parameters
    let strategy = match build_grid_strategy(&adapter) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    let bt_config = build_backtest_config(&adapter);
    let data_spec = match build_data_spec(&adapter, code_override) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    // Stage 3: Fetch K-bar data
    eprintln!(
        "Fetching {} from {} ({} to {})",
        data_spec.code,
        data_spec.data_path.display(),
        data_spec.start_date,
        data_spec.end_date,
    );
    let data_port = CsvAdapter::new(data_spec.data_path.clone());
    let kline_data = match data_port.fetch_kbars(
        &data_spec.code,
        data_spec.start_date,
        data_spec.end_date,
    ) {
        Ok(bars) => bars,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    eprintln!("  Loaded {} bars", kline_data.len());

    // Stage 4: Run the backtest
    let engine = BacktestEngine::new(strategy.clone(), &bt_config);
    let result = match engine.run(&kline_data) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    // Stage 5: Compute metrics and benchmark
    let initial_capital = strategy.total_capital();
    let closes: Vec<f64> = kline_data.iter().map(|b| b.close).collect();
    let calculator = MetricsCalculator::new(bt_config.trading_days_per_year, bt_config.risk_free_rate);
    let (metrics, benchmark) = calculator.calculate_all(
        initial_capital,
        result.final_state.total_asset,
        &result.equity_curve,
        &result.trade_records,
        &closes,
        strategy.grid_count,
    );

    // Stage 6: Console summary
    eprintln!("\n=== Backtest Results ===");
    eprintln!("Total Return:     {:.2}%", metrics.total_return * 100.0);
    eprintln!("Annualized:       {:.2}%", metrics.annualized_return * 100.0);
    eprintln!("Absolute Profit:  {:.2}", metrics.absolute_profit);
    eprintln!("Max Drawdown:     {:.2}%", metrics.max_drawdown * 100.0);
    match metrics.sharpe_ratio {
        Some(s) => eprintln!("Sharpe Ratio:     {:.2}", s),
        None => eprintln!("Sharpe Ratio:     n/a"),
    }
    eprintln!(
        "Trades:           {} ({} buys, {} sells)",
        metrics.total_trades, metrics.buy_trades, metrics.sell_trades
    );
    eprintln!("Win Rate:         {:.1}%", metrics.win_rate * 100.0);
    eprintln!("Trigger Rate:     {:.1}%", metrics.grid_trigger_rate * 100.0);
    eprintln!(
        "Utilization:      {:.1}%",
        metrics.capital_utilization_rate * 100.0
    );
    eprintln!("Hold Return:      {:.2}%", benchmark.hold_return * 100.0);
    eprintln!("Excess Return:    {:.2}%", benchmark.excess_return * 100.0);

    // Stage 7: Write reports
    if let Some(path) = trade_log_path {
        if let Err(e) = TextReportAdapter::write_trade_log(&result.trade_records, path) {
            eprintln!("error: {e}");
            return (&e).into();
        }
        eprintln!("\nTrade log written to: {}", path.display());
    }

    let output = output_path
        .cloned()
        .unwrap_or_else(|| PathBuf::from("report.txt"));
    let report_adapter = TextReportAdapter::new();
    let ctx = ReportContext {
        strategy: &strategy,
        result: &result,
        metrics: &metrics,
        benchmark: &benchmark,
        initial_capital,
    };
    match report_adapter.write(&ctx, &output.display().to_string()) {
        Ok(()) => {
            eprintln!("\nReport written to: {}", output.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    if let Err(e) = validate_backtest_config(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }
    if let Err(e) = validate_grid_config(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    match build_grid_strategy(&adapter) {
        Ok(strategy) => {
            eprintln!("\nGrid strategy:");
            match strategy.grid {
                GridSpec::Arithmetic { step } => {
                    eprintln!("  type:       arithmetic, step {step}")
                }
                GridSpec::Geometric { ratio } => {
                    eprintln!("  type:       geometric, ratio {ratio}")
                }
            }
            eprintln!("  base price: {}", strategy.base_price);
            eprintln!(
                "  band:       [{}, {}]",
                strategy.price_lower, strategy.price_upper
            );
            eprintln!("  quantity:   {} per grid", strategy.single_trade_quantity);
            eprintln!("  capital:    {:.2}", strategy.total_capital());
            eprintln!("\nConfiguration is valid.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn run_info(config_path: &PathBuf, code_override: Option<&str>) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let data_path = match adapter.get_string("backtest", "data_path") {
        Some(p) => PathBuf::from(p),
        None => {
            eprintln!("error: data_path is required in [backtest]");
            return ExitCode::from(2);
        }
    };
    let code = match code_override
        .map(str::to_string)
        .or_else(|| adapter.get_string("backtest", "code"))
    {
        Some(c) => c,
        None => {
            eprintln!("error: code is required (use --code or set in config)");
            return ExitCode::from(2);
        }
    };

    let data_port = CsvAdapter::new(data_path);
    match data_port.get_data_range(&code) {
        Ok(Some((min_date, max_date, count))) => {
            println!("{}: {} bars, {} to {}", code, count, min_date, max_date);
            ExitCode::SUCCESS
        }
        Ok(None) => {
            eprintln!("{}: no data found", code);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn build_backtest_config(adapter: &dyn ConfigPort) -> BacktestConfig {
    BacktestConfig {
        commission_rate: adapter.get_double("backtest", "commission_rate", 0.0002),
        min_commission: adapter.get_double("backtest", "min_commission", 5.0),
        risk_free_rate: adapter.get_double("backtest", "risk_free_rate", 0.03),
        trading_days_per_year: adapter.get_int("backtest", "trading_days_per_year", 244) as u32,
    }
}

pub fn build_grid_strategy(adapter: &dyn ConfigPort) -> Result<GridStrategy, GridtraderError> {
    let grid_type = adapter
        .get_string("grid", "type")
        .ok_or_else(|| GridtraderError::ConfigMissing {
            section: "grid".into(),
            key: "type".into(),
        })?;
    let grid = match grid_type.trim() {
        "arithmetic" => GridSpec::Arithmetic {
            step: adapter.get_double("grid", "step_size", 0.0),
        },
        "geometric" => GridSpec::Geometric {
            ratio: adapter.get_double("grid", "step_ratio", 0.0),
        },
        other => {
            return Err(GridtraderError::ConfigInvalid {
                section: "grid".into(),
                key: "type".into(),
                reason: format!("unknown grid type {:?}", other),
            });
        }
    };

    let market = adapter
        .get_string("grid", "market")
        .as_deref()
        .and_then(Market::from_code)
        .ok_or_else(|| GridtraderError::ConfigInvalid {
            section: "grid".into(),
            key: "market".into(),
            reason: "market must be one of cn, hk, us".into(),
        })?;

    Ok(GridStrategy {
        grid,
        single_trade_quantity: adapter.get_int("grid", "single_trade_quantity", 0),
        market,
        base_price: adapter.get_double("grid", "base_price", 0.0),
        price_lower: adapter.get_double("grid", "price_lower", 0.0),
        price_upper: adapter.get_double("grid", "price_upper", 0.0),
        base_position_amount: adapter.get_double("grid", "base_position_amount", 0.0),
        grid_trading_amount: adapter.get_double("grid", "grid_trading_amount", 0.0),
        grid_count: adapter.get_int("grid", "grid_count", 0) as usize,
    })
}

pub fn build_data_spec(
    adapter: &dyn ConfigPort,
    code_override: Option<&str>,
) -> Result<DataSpec, GridtraderError> {
    let data_path = adapter
        .get_string("backtest", "data_path")
        .ok_or_else(|| GridtraderError::ConfigMissing {
            section: "backtest".into(),
            key: "data_path".into(),
        })?;
    let code = match code_override {
        Some(c) => c.to_string(),
        None => adapter.get_string("backtest", "code").ok_or_else(|| {
            GridtraderError::ConfigMissing {
                section: "backtest".into(),
                key: "code".into(),
            }
        })?,
    };

    let start_date = parse_config_date(adapter, "start_date")?;
    let end_date = parse_config_date(adapter, "end_date")?;

    Ok(DataSpec {
        data_path: PathBuf::from(data_path),
        code,
        start_date,
        end_date,
    })
}

fn parse_config_date(adapter: &dyn ConfigPort, key: &str) -> Result<NaiveDate, GridtraderError> {
    let value = adapter.get_string("backtest", key).ok_or_else(|| {
        GridtraderError::ConfigMissing {
            section: "backtest".into(),
            key: key.into(),
        }
    })?;
    NaiveDate::parse_from_str(&value, "%Y-%m-%d").map_err(|_| GridtraderError::ConfigInvalid {
        section: "backtest".into(),
        key: key.into(),
        reason: "invalid date format (expected YYYY-MM-DD)".into(),
    })
}
