use anyhow::Result;
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};

mod app;
mod config;
mod dispatcher;
mod host;
mod ui;
mod utils;

use app::App;
use config::{Config, ConfigSource, HostKind, LoggingConfig};
use host::{HostCommands, HostEvent};

#[derive(Parser)]
#[command(name = "broker-console")]
#[command(about = "A terminal control surface for producing, consuming and listing broker topics")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Kafka broker address
    #[arg(short, long)]
    broker: Option<String>,

    /// Host command processor to drive
    #[arg(long, value_enum)]
    host: Option<HostKind>,
}

/// Splits a log file path into the directory the appender writes to and the
/// file name inside it.
fn log_target(path: &str) -> Result<(&Path, &str)> {
    let path = Path::new(path);
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow::anyhow!("Invalid log file path: {:?}", path))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    Ok((dir, file_name))
}

// The terminal UI owns stdout, so log lines go to the configured file through
// a background writer. The guard flushes it on drop and must outlive the app.
fn init_logging(config: &LoggingConfig, debug: bool) -> Result<Option<WorkerGuard>> {
    let log_level = if debug {
        Level::DEBUG
    } else {
        config.level.parse().unwrap_or(Level::INFO)
    };

    let builder = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_ansi(false);

    match &config.file {
        Some(path) => {
            let (dir, file_name) = log_target(path)?;
            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::NEVER)
                .filename_prefix(file_name)
                .build(dir)?;
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            builder.with_writer(non_blocking).init();
            Ok(Some(guard))
        }
        None => {
            builder.with_writer(std::io::sink).init();
            Ok(None)
        }
    }
}

fn create_host(
    config: &Config,
    events: mpsc::UnboundedSender<HostEvent>,
) -> Result<Arc<dyn HostCommands>> {
    match config.host {
        HostKind::Memory => Ok(Arc::new(host::memory::MemoryBroker::new(&config.kafka, events))),
        #[cfg(feature = "kafka")]
        HostKind::Kafka => Ok(Arc::new(host::kafka::KafkaHost::new(&config.kafka, events)?)),
        #[cfg(not(feature = "kafka"))]
        HostKind::Kafka => {
            drop(events);
            Err(utils::ConsoleError::Config(
                "this build has no Kafka support; rebuild with `--features kafka`".to_string(),
            )
            .into())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (mut config, source) = Config::load(&cli.config)?;

    // Command line wins over the file
    if let Some(broker) = cli.broker {
        config.set_default_broker(broker);
    }
    if let Some(host) = cli.host {
        config.host = host;
    }
    config.validate()?;

    let _log_guard = init_logging(&config.logging, cli.debug)?;
    match source {
        ConfigSource::File => info!("Loaded configuration from {}", cli.config),
        ConfigSource::CreatedDefault => warn!(
            "Configuration file not found at {}, created default config",
            cli.config
        ),
    }
    info!("Starting broker console with {:?} host", config.host);

    let (host_tx, host_rx) = mpsc::unbounded_channel();
    let host = create_host(&config, host_tx)?;

    let mut app = App::new(config, host, host_rx);
    app.run().await?;

    info!("Broker console shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_target_defaults_to_working_directory() {
        let (dir, file_name) = log_target("broker-console.log").unwrap();
        assert_eq!(dir, Path::new("."));
        assert_eq!(file_name, "broker-console.log");
    }

    #[test]
    fn log_target_keeps_parent_directory() {
        let (dir, file_name) = log_target("logs/console.log").unwrap();
        assert_eq!(dir, Path::new("logs"));
        assert_eq!(file_name, "console.log");
    }

    #[test]
    fn log_target_rejects_path_without_file_name() {
        assert!(log_target("logs/..").is_err());
        assert!(log_target("").is_err());
    }
}
