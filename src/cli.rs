//! CLI definition and dispatch.

use clap::{ArgAction, Parser, Subcommand};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{Level, error, info, warn};

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::ast::Program;
use crate::domain::backtest::run_backtest;
use crate::domain::config_validation::{
    POSITION_SECTION_PREFIX, validate_run_config, validate_strategy_source,
};
use crate::domain::error::QuantflowError;
use crate::domain::execution::{execute, parse_dsl};
use crate::domain::lexer::tokenize;
use crate::domain::parser::parse_tokens;
use crate::domain::position::{Position, Side};
use crate::domain::strategy::{DEFAULT_ORDER_QUANTITY, SignalGenerator};
use crate::domain::universe::{Universe, load_universe, parse_symbols};
use crate::domain::value::{Value, Variables};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "quantflow", about = "Strategy DSL parser, evaluator and backtester")]
pub struct Cli {
    /// Log verbosity: -v info, -vv debug, -vvv trace
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Parse strategy source and print the AST, errors and warnings as JSON
    Check {
        #[arg(short, long, conflicts_with = "code", required_unless_present = "code")]
        file: Option<PathBuf>,
        #[arg(long)]
        code: Option<String>,
    },
    /// Evaluate the strategy once at the latest candle of each symbol
    Eval {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        strategy: Option<PathBuf>,
        #[arg(long)]
        symbol: Option<String>,
    },
    /// Evaluate the strategy at every candle of each symbol
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        strategy: Option<PathBuf>,
        #[arg(long)]
        symbol: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Generate buy/sell signals across the configured symbols
    Signals {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        strategy: Option<PathBuf>,
    },
    /// List symbols available in the data directory
    ListSymbols {
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// Install the stderr log subscriber. Warnings are always shown.
pub fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Check { file, code } => return run_check(file.as_ref(), code),
        Command::Eval {
            config,
            strategy,
            symbol,
        } => run_eval(&config, strategy.as_ref(), symbol.as_deref()),
        Command::Backtest {
            config,
            strategy,
            symbol,
            output,
            dry_run,
        } => {
            if dry_run {
                run_dry_run(&config, strategy.as_ref(), symbol.as_deref())
            } else {
                run_backtest_command(&config, strategy.as_ref(), symbol.as_deref(), output.as_ref())
            }
        }
        Command::Signals { config, strategy } => run_signals(&config, strategy.as_ref()),
        Command::ListSymbols { config } => run_list_symbols(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, QuantflowError> {
    FileConfigAdapter::from_file(path).map_err(|e| QuantflowError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// Everything a run needs, resolved from config and command-line overrides.
pub struct RunSetup {
    pub name: String,
    pub program: Program,
    pub symbols: Vec<String>,
    pub data_dir: PathBuf,
    pub variables: Variables,
    pub order_quantity: f64,
    pub config: FileConfigAdapter,
    config_dir: PathBuf,
}

impl RunSetup {
    pub fn load(
        config_path: &Path,
        strategy_path: Option<&PathBuf>,
        symbol_override: Option<&str>,
    ) -> Result<Self, QuantflowError> {
        info!(path = %config_path.display(), "loading config");
        let config = load_config(config_path)?;
        validate_run_config(&config)?;
        if strategy_path.is_none() {
            validate_strategy_source(&config)?;
        }

        let config_dir = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let source = read_strategy_source(&config, &config_dir, strategy_path)?;
        let program = parse_strategy(&source)?;

        let symbols = match symbol_override {
            Some(s) => vec![s.trim().to_uppercase()],
            None => resolve_symbols(&config)?,
        };
        let data_dir = config
            .get_string("data", "directory")
            .map(|d| resolve_path(&config_dir, &d))
            .unwrap_or_default();

        Ok(Self {
            name: config
                .get_string("strategy", "name")
                .unwrap_or_else(|| "Unnamed".to_string()),
            program,
            symbols,
            data_dir,
            variables: build_variables(&config),
            order_quantity: config.get_double("strategy", "order_quantity", DEFAULT_ORDER_QUANTITY),
            config,
            config_dir,
        })
    }

    pub fn data_port(&self) -> CsvAdapter {
        CsvAdapter::new(self.data_dir.clone())
    }

    pub fn load_universe(&self) -> Result<Universe, QuantflowError> {
        load_universe(&self.data_port(), &self.symbols)
    }
}

fn resolve_path(base: &Path, raw: &str) -> PathBuf {
    let path = PathBuf::from(raw.trim());
    if path.is_absolute() {
        path
    } else {
        base.join(path)
    }
}

fn read_strategy_source(
    config: &dyn ConfigPort,
    config_dir: &Path,
    strategy_path: Option<&PathBuf>,
) -> Result<String, QuantflowError> {
    if let Some(path) = strategy_path {
        info!(path = %path.display(), "loading strategy");
        return Ok(fs::read_to_string(path)?);
    }
    if let Some(file) = config
        .get_string("strategy", "file")
        .filter(|f| !f.trim().is_empty())
    {
        let path = resolve_path(config_dir, &file);
        info!(path = %path.display(), "loading strategy");
        return Ok(fs::read_to_string(path)?);
    }
    Ok(config.get_string("strategy", "code").unwrap_or_default())
}

/// Parse strategy source, printing the offending line on failure.
pub fn parse_strategy(source: &str) -> Result<Program, QuantflowError> {
    let tokens = tokenize(source).map_err(|e| {
        eprintln!("{}", e.display_with_context(source));
        QuantflowError::from(e)
    })?;
    match parse_tokens(tokens) {
        Ok(parsed) => Ok(parsed.program),
        Err(e) => {
            eprintln!("{}", e.display_with_context(source));
            Err(e.into())
        }
    }
}

pub fn resolve_symbols(config: &dyn ConfigPort) -> Result<Vec<String>, QuantflowError> {
    let raw = config
        .get_string("data", "symbols")
        .ok_or_else(|| QuantflowError::ConfigMissing {
            section: "data".into(),
            key: "symbols".into(),
        })?;
    parse_symbols(&raw).map_err(|e| QuantflowError::ConfigInvalid {
        section: "data".into(),
        key: "symbols".into(),
        reason: e.to_string(),
    })
}

pub fn build_variables(config: &dyn ConfigPort) -> Variables {
    config
        .entries("variables")
        .into_iter()
        .map(|(name, raw)| (name, Value::from_config_str(&raw)))
        .collect()
}

pub fn build_positions(config: &dyn ConfigPort) -> HashMap<String, Position> {
    let mut positions = HashMap::new();
    for section in config.sections() {
        let Some(symbol) = section.strip_prefix(POSITION_SECTION_PREFIX) else {
            continue;
        };
        let symbol = symbol.trim().to_uppercase();
        let side = config
            .get_string(&section, "side")
            .and_then(|s| Side::parse(&s))
            .unwrap_or(Side::Long);
        positions.insert(
            symbol.clone(),
            Position {
                symbol,
                size: config.get_double(&section, "size", 0.0),
                side,
                entry_price: config.get_double(&section, "entry_price", 0.0),
            },
        );
    }
    positions
}

fn print_json<T: Serialize>(value: &T) -> Result<(), QuantflowError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run_check(file: Option<&PathBuf>, code: Option<String>) -> ExitCode {
    let source = match (file, code) {
        (Some(path), _) => match fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) => {
                let err = QuantflowError::Io(e);
                error!("failed to read {}: {err}", path.display());
                return (&err).into();
            }
        },
        (None, Some(code)) => code,
        (None, None) => String::new(),
    };

    let outcome = parse_dsl(&source);
    if let Err(e) = print_json(&outcome) {
        error!("{e}");
        return (&e).into();
    }

    if outcome.is_ok() {
        ExitCode::SUCCESS
    } else {
        for message in &outcome.errors {
            error!("{message}");
        }
        ExitCode::from(4)
    }
}

fn run_eval(
    config_path: &Path,
    strategy_path: Option<&PathBuf>,
    symbol: Option<&str>,
) -> Result<(), QuantflowError> {
    let setup = RunSetup::load(config_path, strategy_path, symbol)?;
    let universe = setup.load_universe()?;
    info!(strategy = %setup.name, symbols = universe.count(), "evaluating");

    let mut results = BTreeMap::new();
    for symbol in universe.symbols() {
        let series = &universe.series[symbol];
        let value = execute(&setup.program, series, setup.variables.clone())?;
        info!(symbol, %value, "evaluated");
        results.insert(symbol.to_string(), value);
    }
    print_json(&results)
}

#[derive(Serialize)]
struct BacktestSummary {
    results: Vec<Option<Value>>,
    skipped: usize,
    cancelled: bool,
    variables: BTreeMap<String, Value>,
}

fn run_backtest_command(
    config_path: &Path,
    strategy_path: Option<&PathBuf>,
    symbol: Option<&str>,
    output: Option<&PathBuf>,
) -> Result<(), QuantflowError> {
    let setup = RunSetup::load(config_path, strategy_path, symbol)?;
    let universe = setup.load_universe()?;
    info!(strategy = %setup.name, symbols = universe.count(), "running backtest");

    let output = output.cloned().or_else(|| {
        setup
            .config
            .get_string("backtest", "output")
            .map(|o| resolve_path(&setup.config_dir, &o))
    });
    let symbols = universe.symbols();
    let reporter = CsvReportAdapter::new();

    let mut summaries = BTreeMap::new();
    for symbol in &symbols {
        let run = run_backtest(&setup.program, &universe.series[*symbol], setup.variables.clone(), None);

        if let Some(path) = &output {
            let path = report_path(path, symbol, symbols.len());
            reporter.write_backtest(symbol, &run, &path.display().to_string())?;
        }

        summaries.insert(
            symbol.to_string(),
            BacktestSummary {
                results: run.values(),
                skipped: run.skipped_count(),
                cancelled: run.cancelled,
                variables: run.variables.into_iter().collect(),
            },
        );
    }

    if output.is_none() {
        print_json(&summaries)?;
    }
    Ok(())
}

/// With several symbols each gets its own report: `out.csv` becomes `out_BTCUSDT.csv`.
fn report_path(path: &Path, symbol: &str, symbol_count: usize) -> PathBuf {
    if symbol_count <= 1 {
        return path.to_path_buf();
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "report".to_string());
    let file_name = match path.extension() {
        Some(ext) => format!("{stem}_{symbol}.{}", ext.to_string_lossy()),
        None => format!("{stem}_{symbol}"),
    };
    path.with_file_name(file_name)
}

fn run_dry_run(
    config_path: &Path,
    strategy_path: Option<&PathBuf>,
    symbol: Option<&str>,
) -> Result<(), QuantflowError> {
    let setup = RunSetup::load(config_path, strategy_path, symbol)?;
    eprintln!("Strategy: {}", setup.name);
    eprintln!("  statements: {}", setup.program.statements().len());
    eprintln!("  buy/sell rules: {}", if setup.program.has_rules() { "yes" } else { "no" });
    eprintln!("Data directory: {}", setup.data_dir.display());
    eprintln!("Symbols: {}", setup.symbols.join(", "));
    if !setup.variables.is_empty() {
        let mut names: Vec<&String> = setup.variables.keys().collect();
        names.sort();
        eprintln!("Variables: {}", names.iter().map(|n| n.as_str()).collect::<Vec<_>>().join(", "));
    }
    eprintln!("\nDry run complete: configuration is valid");
    Ok(())
}

fn run_signals(config_path: &Path, strategy_path: Option<&PathBuf>) -> Result<(), QuantflowError> {
    let setup = RunSetup::load(config_path, strategy_path, None)?;
    let universe = setup.load_universe()?;
    let positions = build_positions(&setup.config);
    for symbol in positions.keys() {
        if !universe.series.contains_key(symbol) {
            warn!(symbol = %symbol, "position configured for a symbol without data");
        }
    }

    let generator = SignalGenerator::new(setup.order_quantity, setup.variables.clone());
    let signals = generator.generate(&setup.program, &universe.series, &positions);
    info!(strategy = %setup.name, signals = signals.len(), "signals generated");
    print_json(&signals)
}

fn run_list_symbols(config_path: &Path) -> Result<(), QuantflowError> {
    let config = load_config(config_path)?;
    let directory = config
        .get_string("data", "directory")
        .filter(|d| !d.trim().is_empty())
        .ok_or_else(|| QuantflowError::ConfigMissing {
            section: "data".into(),
            key: "directory".into(),
        })?;
    let config_dir = config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let adapter = CsvAdapter::new(resolve_path(&config_dir, &directory));

    let symbols = adapter.list_symbols()?;
    if symbols.is_empty() {
        eprintln!("No symbols found in {directory}");
    } else {
        for symbol in &symbols {
            println!("{symbol}");
        }
        eprintln!("{} symbols found", symbols.len());
    }
    Ok(())
}
