use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgGroup, Parser, ValueEnum};
use log::LevelFilter;
use simple_logger::SimpleLogger;

use record_file_sort::config::Config;
use record_file_sort::progress::LogProgress;
use record_file_sort::sort::Sort;

/// Generate a file of numbered records or sort it with bounded memory.
#[derive(Parser, Debug)]
#[command(name = "record-file-sort", version)]
#[command(group(ArgGroup::new("mode").required(true).args(["generate", "sort"])))]
struct Args {
    /// Generate a file with test data to be sorted in the operative directory. The directory is
    /// cleared first.
    #[arg(short, long)]
    generate: bool,

    /// Sort the test data file, generating it first if it does not exist. The result is placed in
    /// the operative directory.
    #[arg(short, long)]
    sort: bool,

    /// JSON settings file
    #[arg(short, long, default_value = "appsettings.json")]
    config: PathBuf,

    #[arg(short, long, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

fn load_config(path: &Path) -> Result<Config, anyhow::Error> {
    if path.exists() {
        Config::from_file(path)
    } else {
        log::warn!("Settings file {} not found, using defaults", path.display());
        Ok(Config::default())
    }
}

fn run(args: &Args) -> Result<(), anyhow::Error> {
    let config = load_config(&args.config)?;
    config.validate()?;
    let mut sort = Sort::new(config);
    sort.with_progress(Box::new(LogProgress::new()));

    if args.generate {
        let path = sort.generate()?;
        log::info!("Generated {}", path.display());
    } else if args.sort {
        let path = sort.sort()?;
        log::info!("Sorted into {}", path.display());
    }
    Ok(())
}

fn main() {
    let args = Args::parse();
    if let Err(e) = SimpleLogger::new().with_level(args.log_level.into()).init() {
        eprintln!("logger initialization error: {}", e);
        process::exit(1);
    }

    if let Err(e) = run(&args) {
        log::error!("{:#}", e);
        process::exit(1);
    }
}
