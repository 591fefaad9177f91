//! opman - operator gate inspector
//!
//! Loads a gate configuration and answers who may submit to the protected
//! resource at a given height.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use opman_core::Address;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod commands;

use commands::OutputFormat;

/// opman - operator gate inspector
#[derive(Parser, Debug)]
#[command(name = "opman")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to gate configuration file
    #[arg(short, long, default_value = "opman.toml", global = true)]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Validate the configuration and print a summary
    Validate,

    /// Show the operator resolved at a height
    Operator {
        /// Block height
        #[arg(long)]
        height: u64,
    },

    /// Check whether an address may submit at a height (exit 0 yes, 1 no)
    Check {
        /// Caller address (0x-prefixed, 20 bytes)
        address: Address,

        /// Block height
        #[arg(long)]
        height: u64,
    },

    /// Print the round-robin rotation for a height range
    Schedule {
        /// First height
        #[arg(long, default_value = "0")]
        from: u64,

        /// Last height (inclusive)
        #[arg(long)]
        to: u64,
    },
}

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so JSON on stdout stays parseable.
    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let format = cli.format;
    let exit_code = match cli.command {
        Commands::Validate => commands::validate::run(&cli.config, format),
        Commands::Operator { height } => {
            commands::operator::run_operator(&cli.config, height, format)
        },
        Commands::Check { address, height } => {
            commands::operator::run_check(&cli.config, address, height, format)
        },
        Commands::Schedule { from, to } => commands::schedule::run(&cli.config, from, to, format),
    };
    std::process::exit(i32::from(exit_code));
}
