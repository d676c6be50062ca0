/// Version injected at compile time via SCW_VERSION env var (set by CI/CD),
/// or "dev" for local builds.
pub const VERSION: &str = match option_env!("SCW_VERSION") {
    Some(v) => v,
    None => "dev",
};

use anyhow::Result;
use clap::{Parser, ValueEnum};
use scw::api::ScalewayClient;
use scw::commands::{self, Command};
use scw::config::Config;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};

/// Command-line client for Scaleway
#[derive(Parser, Debug)]
#[command(name = "scw", version = VERSION, about, long_about = None)]
struct Args {
    /// Override the API endpoint
    #[arg(long, global = true)]
    api_endpoint: Option<String>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let tracing_level = level.to_tracing_level()?;

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Warning: cannot open log file {:?}: {}", log_path, e);
            return None;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    // RUST_LOG may refine the level chosen on the command line
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(tracing_level).into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("scw {} started with log level: {:?}", VERSION, level);
    tracing::info!("Log file: {:?}", log_path);

    Some(guard)
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("scw").join("scw.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".scw").join("scw.log");
    }
    PathBuf::from("scw.log")
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level);

    let mut config = Config::load();
    if let Some(endpoint) = args.api_endpoint {
        config.api_endpoint = Some(endpoint);
    }

    let endpoint = config.effective_endpoint()?;
    let token = config.effective_token()?;
    let organization = if args.command.needs_organization() {
        config.effective_organization()?
    } else {
        config.organization.clone().unwrap_or_default()
    };

    tracing::info!("Using endpoint: {}", endpoint);

    let mut client = ScalewayClient::new(&endpoint, &organization, &token, config.cache_store())?;

    let result = commands::run(&mut client, args.command).await;

    // The command's output is already delivered; a save failure only warns
    if let Err(e) = client.sync() {
        tracing::warn!("Failed to save cache: {}", e);
        eprintln!("Warning: {}", e);
    }

    result
}
