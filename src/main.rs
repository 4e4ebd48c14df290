//! concurrent-runner - concurrent and repeated test execution
//!
//! Runs test suites on named worker pools, repeats units on demand, and
//! aggregates several rounds so races that only fail occasionally show up.
//!
//! ## Features
//!
//! - One worker pool per test class, threads named `<Class>-<pool>-thread-<n>`
//! - Class and method level repeat directives
//! - Parameterized suites sharing a single pool across parameter sets
//! - Remote execution against an HTTP test endpoint
//! - Multiple output formats (Table, JSON, CSV)
//!
//! ## Usage
//!
//! ```bash
//! # Run a suite with its own concurrency directive
//! concurrent-runner run multithreaded
//!
//! # Expose the lost-update race
//! concurrent-runner run missing-sync --threads 5 --rounds 20
//!
//! # List suites and their units
//! concurrent-runner list --detailed
//!
//! # Run methods remotely
//! concurrent-runner remote --endpoint http://localhost:8080/app/testrunner \
//!     --class AuthorTest -m findAuthors
//! ```

use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

mod cli;

use cli::Args;
use concurrent_runner::config::{self, AppConfig, ConfigFile, EnvConfig};
use concurrent_runner::executor::{RoundRunner, RoundStop};
use concurrent_runner::output::{write_results_to_file, OutputFormat, ResultFormatter};
use concurrent_runner::remote::{HttpDispatcher, RemoteClassRunner};
use concurrent_runner::runner::run_suite;
use concurrent_runner::suites::{Suite, SuiteOptions};
use concurrent_runner::utils::{init_logger, LogLevel};

fn main() -> Result<()> {
    let args = Args::parse();
    let env = EnvConfig::load();
    let config = load_config(&args, &env)?;

    let level = if args.verbose {
        LogLevel::Debug
    } else {
        config.log_level()
    };
    init_logger(level);

    let success = match args.command {
        cli::Command::Run(run_args) => run(run_args, config)?,
        cli::Command::List(list_args) => {
            list_suites(list_args)?;
            true
        }
        cli::Command::Remote(remote_args) => run_remote(remote_args, config)?,
        cli::Command::Config(config_args) => {
            manage_config(config_args, &config, &env)?;
            true
        }
    };

    if !success {
        std::process::exit(1);
    }
    Ok(())
}

/// Defaults, then the config file, then the environment
fn load_config(args: &Args, env: &EnvConfig) -> Result<AppConfig> {
    let explicit = args.config.clone().or_else(|| env.config_file.clone());
    let mut config = match explicit {
        Some(path) => AppConfig::load(&path)
            .with_context(|| format!("Failed to load configuration from {path}"))?,
        None => ConfigFile::load_default()?.app,
    };
    config.apply_env(env);
    Ok(config)
}

fn parse_format(flag: Option<&str>, config: &AppConfig) -> Result<OutputFormat> {
    match flag {
        Some(name) => OutputFormat::from_str(name)
            .ok_or_else(|| anyhow::anyhow!("Unknown output format: {name}")),
        None => Ok(config.output_format()),
    }
}

/// Forward Ctrl-C to the running rounds
fn watch_ctrl_c(stop: RoundStop) {
    thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(e) => {
                warn!("Ctrl-C handling unavailable: {}", e);
                return;
            }
        };

        runtime.block_on(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling outstanding units");
                stop.stop();
            }
        });
    });
}

fn run(args: cli::RunArgs, mut config: AppConfig) -> Result<bool> {
    let suite = Suite::from_str(&args.suite).ok_or_else(|| {
        anyhow::anyhow!(
            "Unknown suite: {}. Run `concurrent-runner list` to see available suites",
            args.suite
        )
    })?;

    if let Some(threads) = args.threads {
        config.default_threads = Some(threads);
    }
    if let Some(rounds) = args.rounds {
        config.rounds = rounds;
    }
    config.validate()?;

    let format = parse_format(args.format.as_deref(), &config)?;
    let formatter = ResultFormatter::new(format);
    let options = SuiteOptions::default()
        .with_threads(config.default_threads)
        .with_step(Duration::from_millis(args.step_ms));

    info!("Running {} ({} round(s))", suite, config.rounds);

    let round_runner = RoundRunner::new(config.rounds);
    watch_ctrl_c(round_runner.stop_handle());
    let summaries = round_runner.run(|_| suite.build(&options))?;

    println!("{}", formatter.format_rounds(&summaries));
    if summaries.len() > 1 {
        let aggregate = RoundRunner::aggregate_results(&summaries);
        println!("{}", formatter.format_aggregate(&aggregate, suite.name()));
    }

    if let Some(output) = &args.output {
        write_results_to_file(output, &summaries, format)?;
        println!("✓ Results saved to {output}");
    }

    Ok(!summaries.is_empty() && summaries.iter().all(|s| s.is_successful()))
}

fn list_suites(args: cli::ListArgs) -> Result<()> {
    println!("\nBuilt-in Suites\n");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    for suite in Suite::all() {
        println!("  {:15} {}", suite.name(), suite.description());
        if args.detailed {
            let runner = suite.build(&SuiteOptions::default())?;
            for child in runner.children() {
                println!("      - {child}");
            }
            println!();
        }
    }

    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
    Ok(())
}

fn run_remote(args: cli::RemoteArgs, mut config: AppConfig) -> Result<bool> {
    if let Some(endpoint) = args.endpoint {
        config.remote.endpoint = Some(endpoint);
    }
    if let Some(timeout) = args.timeout {
        config.remote.timeout_secs = timeout;
    }
    config.validate()?;

    let endpoint = config.remote.endpoint.clone().ok_or_else(|| {
        anyhow::anyhow!(
            "No remote endpoint. Pass --endpoint or set {}_ENDPOINT",
            config::ENV_PREFIX
        )
    })?;

    let dispatcher = HttpDispatcher::with_timeout(&endpoint, config.remote.timeout_secs)?;
    info!("Dispatching {} to {}", args.class, dispatcher.endpoint());

    let runner = RemoteClassRunner::for_methods(args.class, args.methods, Arc::new(dispatcher));
    let summary = run_suite(&runner, 1)?;

    let formatter = ResultFormatter::new(parse_format(args.format.as_deref(), &config)?);
    println!("{}", formatter.format_summary(&summary));

    Ok(summary.is_successful())
}

fn manage_config(args: cli::ConfigArgs, config: &AppConfig, env: &EnvConfig) -> Result<()> {
    match args.action {
        cli::ConfigAction::Init { output, force } => {
            let path = Path::new(&output);
            if path.exists() && !force {
                anyhow::bail!(
                    "Configuration file already exists: {output}. Use --force to overwrite."
                );
            }

            ConfigFile::example().save(path)?;
            println!("✓ Configuration file created: {output}");
        }

        cli::ConfigAction::Show { format } => {
            let effective = ConfigFile {
                app: config.clone(),
                ..ConfigFile::default()
            };
            let output = if format == "json" {
                serde_json::to_string_pretty(&effective)?
            } else {
                serde_yaml::to_string(&effective)?
            };
            match ConfigFile::find() {
                Some(path) => println!("# Loaded from {}", path.display()),
                None => println!("# No configuration file found, using defaults"),
            }
            println!("{output}");
        }

        cli::ConfigAction::Env => {
            config::print_env_help();
            println!();
            env.print_summary();
        }
    }

    Ok(())
}
