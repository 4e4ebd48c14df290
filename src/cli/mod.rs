//! CLI argument parsing
//!
//! Defines command-line interface using clap.

use clap::{Parser, Subcommand};

/// Concurrent and repeated test execution on named worker pools
#[derive(Parser, Debug)]
#[command(name = "concurrent-runner")]
#[command(version)]
#[command(about = "Run test suites concurrently and repeatedly to expose races")]
#[command(long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (overrides the standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a built-in suite
    Run(RunArgs),

    /// List built-in suites and their units
    List(ListArgs),

    /// Run test methods on a remote test endpoint
    Remote(RemoteArgs),

    /// Manage configuration
    Config(ConfigArgs),
}

/// Arguments for run command
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Suite to run (multithreaded, repeated, missing-sync, parameterized)
    pub suite: String,

    /// Worker threads, overriding the suite's concurrency directive
    #[arg(short, long)]
    pub threads: Option<u32>,

    /// Number of rounds
    #[arg(short, long)]
    pub rounds: Option<u32>,

    /// Sleep per loop step inside the demo methods, in milliseconds
    #[arg(long, default_value = "500")]
    pub step_ms: u64,

    /// Output format (table, json, json-pretty, csv, summary)
    #[arg(short, long)]
    pub format: Option<String>,

    /// Save results to file
    #[arg(short, long)]
    pub output: Option<String>,
}

/// Arguments for list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Show every unit of each suite
    #[arg(short, long)]
    pub detailed: bool,
}

/// Arguments for remote command
#[derive(Parser, Debug)]
pub struct RemoteArgs {
    /// Test endpoint URL
    #[arg(short, long)]
    pub endpoint: Option<String>,

    /// Remote test class name
    #[arg(long)]
    pub class: String,

    /// Method to run (repeatable)
    #[arg(short, long = "method", required = true)]
    pub methods: Vec<String>,

    /// Request timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Output format (table, json, json-pretty, csv, summary)
    #[arg(short, long)]
    pub format: Option<String>,
}

/// Arguments for config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Write an example configuration file
    Init {
        /// Output path
        #[arg(short, long, default_value = "./concurrent-runner.yaml")]
        output: String,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show the effective configuration
    Show {
        /// Output format (yaml, json)
        #[arg(short, long, default_value = "yaml")]
        format: String,
    },

    /// Show environment variables
    Env,
}
