//! Tracing setup. The terminal belongs to the TUI, so log lines go to a file
//! in the data directory instead of stdout.

use std::env;
use std::fs::{self, OpenOptions};

use anyhow::{Context, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;

/// Filter used when neither the config nor `RUST_LOG` names one.
const DEFAULT_DIRECTIVE: &str = "info";

pub fn init_logging(config: &AppConfig) -> Result<()> {
    let filter = build_filter(
        config.log_level.as_deref(),
        env::var(EnvFilter::DEFAULT_ENV).ok(),
    )?;

    if let Some(parent) = config.log_file.parent() {
        fs::create_dir_all(parent).context("failed to create log directory")?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_file)
        .context("failed to open log file")?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file)
                .with_ansi(false),
        )
        .try_init()
        .context("failed to install tracing subscriber")
}

/// Pick the filter directive: an explicit `--log-level`/config value wins,
/// then `RUST_LOG`, then `info`. A malformed directive is an error.
fn build_filter(configured: Option<&str>, from_env: Option<String>) -> Result<EnvFilter> {
    match (configured, from_env) {
        (Some(directive), _) => EnvFilter::try_new(directive)
            .with_context(|| format!("invalid log level directive '{directive}'")),
        (None, Some(directive)) => EnvFilter::try_new(&directive)
            .with_context(|| format!("invalid {} directive '{directive}'", EnvFilter::DEFAULT_ENV)),
        (None, None) => Ok(EnvFilter::new(DEFAULT_DIRECTIVE)),
    }
}
