//! CLI for inspecting and exercising ROE retry policies.

mod commands;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use roe_core::config::{self, RetryConfig, RoeConfig};
use roe_core::retry::RetryPolicy;

use commands::{run_classify, run_config, run_schedule, run_simulate, Scripted};

/// Top-level CLI for ROE.
#[derive(Debug, Parser)]
#[command(name = "roe")]
#[command(about = "ROE: retry-with-backoff executor for flaky upstream APIs", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

/// Per-invocation overrides of the configured `[retry]` section.
#[derive(Debug, Clone, Default, PartialEq, Args)]
pub struct PolicyArgs {
    /// Total attempts, including the first.
    #[arg(long, value_name = "N")]
    pub max_attempts: Option<u32>,
    /// Delay before the second attempt, in seconds.
    #[arg(long, value_name = "SECS")]
    pub min_delay: Option<f64>,
    /// Ceiling on any backoff delay, in seconds.
    #[arg(long, value_name = "SECS")]
    pub max_delay: Option<f64>,
    /// Fraction of each delay that may be shaved off at random.
    #[arg(long, value_name = "FRACTION")]
    pub jitter: Option<f64>,
}

impl PolicyArgs {
    /// Overlay the flags that were given onto `base`.
    pub fn apply(&self, base: RetryConfig) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_attempts.unwrap_or(base.max_attempts),
            min_delay_secs: self.min_delay.unwrap_or(base.min_delay_secs),
            max_delay_secs: self.max_delay.unwrap_or(base.max_delay_secs),
            jitter: self.jitter.unwrap_or(base.jitter),
        }
    }

    pub fn resolve(&self, cfg: &RoeConfig) -> Result<RetryPolicy> {
        let merged = self.apply(cfg.retry.clone().unwrap_or_default());
        merged.to_policy().context("invalid retry policy")
    }
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Print the delay before each retry of the effective policy.
    Schedule {
        #[command(flatten)]
        policy: PolicyArgs,
    },

    /// Classify HTTP status codes and show the message a user would see.
    Classify {
        /// Status codes, e.g. 404 429 503.
        #[arg(required = true, value_name = "STATUS")]
        statuses: Vec<u16>,
    },

    /// Show the config file location and the effective policy.
    Config,

    /// Run the executor against a scripted upstream.
    Simulate {
        /// Outcome of each attempt: a status code, ok, empty, timeout, reset or refused.
        /// The last outcome repeats once the script runs out.
        #[arg(required = true, value_name = "OUTCOME")]
        outcomes: Vec<Scripted>,

        #[command(flatten)]
        policy: PolicyArgs,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Schedule { policy } => run_schedule(&policy.resolve(&cfg)?),
            CliCommand::Classify { statuses } => run_classify(&statuses),
            CliCommand::Config => run_config(&cfg)?,
            CliCommand::Simulate { outcomes, policy } => {
                let attempt_timeout = cfg.attempt_timeout().context("invalid attempt_timeout_secs")?;
                run_simulate(&policy.resolve(&cfg)?, attempt_timeout, &outcomes).await?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
