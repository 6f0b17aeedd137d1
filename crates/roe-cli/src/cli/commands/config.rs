//! `roe config` – show where the config lives and what it resolves to.

use anyhow::{Context, Result};
use roe_core::config::{self, RoeConfig};

pub fn run_config(cfg: &RoeConfig) -> Result<()> {
    let path = config::config_path()?;
    let policy = cfg.retry_policy().context("invalid [retry] section")?;

    println!("config file:     {}", path.display());
    println!(
        "retry section:   {}",
        if cfg.retry.is_some() { "configured" } else { "defaults" }
    );
    println!("max attempts:    {}", policy.max_attempts());
    println!("min delay:       {:.3}s", policy.min_delay().as_secs_f64());
    println!("max delay:       {:.3}s", policy.max_delay().as_secs_f64());
    println!("jitter:          {}", policy.jitter());
    println!("attempt timeout: {}s", cfg.attempt_timeout_secs);
    Ok(())
}
