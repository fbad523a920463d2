//! vaultshelf CLI

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use vaultshelf::{Invocation, LogFormat, OutputFormat, RunMode, execute, init_logging};

/// Transfer an Obsidian vault into BookStack
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (JSON, YAML or TOML)
    #[arg(env = "VAULTSHELF_CONFIG")]
    config: PathBuf,

    /// Plan and resolve everything without creating content
    #[arg(long, action = clap::ArgAction::SetTrue)]
    dry_run: bool,

    /// Only check the connection and credentials
    #[arg(long, action = clap::ArgAction::SetTrue, conflicts_with = "dry_run")]
    test_connection: bool,

    /// Report format on stdout (human, json)
    #[arg(long, default_value = "human")]
    output_format: OutputFormat,

    /// Log format on stderr (text, json)
    #[arg(long, default_value = "text")]
    log_format: LogFormat,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, action = clap::ArgAction::SetTrue)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = init_logging(args.verbose, args.log_format) {
        eprintln!("{:#}", e);
        return ExitCode::FAILURE;
    }
    log::debug!("vaultshelf v{}", env!("CARGO_PKG_VERSION"));

    let invocation = Invocation {
        config: args.config,
        mode: if args.dry_run {
            RunMode::DryRun
        } else {
            RunMode::Live
        },
        test_connection: args.test_connection,
        output: args.output_format,
    };

    match execute(&invocation).await {
        Ok(outcome) => {
            print!("{}", outcome.output);
            ExitCode::from(outcome.exit_code)
        }
        Err(e) => {
            log::error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
