//! Command-line application: logging setup, one run and its rendered output

use anyhow::{Context, Result};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use vaultshelf_core::TransferConfig;
use vaultshelf_transfer::{BookStackClient, RunMode, TransferOrchestrator};

/// How the report is printed on stdout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "human" | "text" => Ok(OutputFormat::Human),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!(
                "Invalid output format '{}': expected human or json",
                other
            )),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputFormat::Human => "human",
            OutputFormat::Json => "json",
        })
    }
}

/// How log lines are written to stderr
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!(
                "Invalid log format '{}': expected text or json",
                other
            )),
        }
    }
}

/// Install the stderr subscriber. `RUST_LOG` wins over `verbose`.
pub fn init_logging(verbose: bool, format: LogFormat) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    }
    .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))
}

/// What the user asked for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub config: PathBuf,
    pub mode: RunMode,
    /// Only check the connection, then stop
    pub test_connection: bool,
    pub output: OutputFormat,
}

/// Text for stdout and the process exit code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub exit_code: u8,
    pub output: String,
}

/// Load the configuration and perform the requested action.
///
/// Exit code 1 means the connection check failed or the run stopped on a
/// fatal condition; per-item failures still exit 0 and are listed in the
/// report.
pub async fn execute(invocation: &Invocation) -> Result<Outcome> {
    let config = TransferConfig::load(&invocation.config).with_context(|| {
        format!(
            "Loading configuration from {}",
            invocation.config.display()
        )
    })?;

    if invocation.test_connection {
        config.validate_remote().context("Invalid remote settings")?;
    } else {
        config.validate().context("Invalid configuration")?;
    }

    let url = config.remote.url.clone();
    let client = BookStackClient::new(&config.remote)?;
    let mut orchestrator = TransferOrchestrator::new(config, Arc::new(client));

    if invocation.test_connection {
        log::info!("Testing connection to {}", url);
        return Ok(match orchestrator.test_connection().await {
            Ok(()) => Outcome {
                exit_code: 0,
                output: format!("Connection to {} succeeded\n", url),
            },
            Err(e) => Outcome {
                exit_code: 1,
                output: format!("Connection to {} failed: {}\n", url, e),
            },
        });
    }

    let report = orchestrator.run(invocation.mode).await?;
    let output = match invocation.output {
        OutputFormat::Human => report.render_text(),
        OutputFormat::Json => format!("{}\n", report.to_json()?),
    };

    Ok(Outcome {
        exit_code: if report.is_fatal() { 1 } else { 0 },
        output,
    })
}
