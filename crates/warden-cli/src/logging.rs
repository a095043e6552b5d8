// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use std::io::IsTerminal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

pub const LOG_ENV: &str = "WARDEN_LOG";

/// Installs the global subscriber. Events go to stderr so the shell on
/// stdout stays readable.
pub fn init(config_level: &str) -> Result<()> {
    let filter = build_filter(std::env::var(LOG_ENV).ok().as_deref(), config_level)?;
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(true)
        .without_time()
        .compact();

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()
        .map_err(|error| anyhow!("install log subscriber: {error}"))
}

// An unparseable WARDEN_LOG falls back to the configured level.
fn build_filter(env_directives: Option<&str>, config_level: &str) -> Result<EnvFilter> {
    if let Some(directives) = env_directives
        && let Ok(filter) = EnvFilter::try_new(directives)
    {
        return Ok(filter);
    }
    EnvFilter::try_new(config_level).map_err(|error| {
        anyhow!(
            "invalid [logging].level {config_level:?}: {error}; use e.g. \"warn\" or \"warden_api=debug\""
        )
    })
}

#[cfg(test)]
mod tests {
    use super::build_filter;
    use anyhow::Result;

    #[test]
    fn env_directives_win_over_config() -> Result<()> {
        let filter = build_filter(Some("warden_api=debug"), "warn")?;
        assert_eq!(filter.to_string(), "warden_api=debug");
        Ok(())
    }

    #[test]
    fn broken_env_directives_fall_back() -> Result<()> {
        let filter = build_filter(Some("warden_api=loud"), "info")?;
        assert_eq!(filter.to_string(), "info");
        Ok(())
    }

    #[test]
    fn bad_config_level_is_reported() {
        let error = build_filter(None, "warden_api=loud").expect_err("invalid level");
        assert!(error.to_string().contains("[logging].level"));
    }
}
