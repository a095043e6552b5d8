// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use warden_api::DEFAULT_SECRET_HEADER;
use warden_app::{DEFAULT_ONLINE_MINUTES, DEFAULT_PAGE_LIMIT};

const CONFIG_VERSION: i64 = 1;
const APP_NAME: &str = "warden";
pub const DEFAULT_BASE_URL: &str = "https://adventuremaze.onrender.com";
const DEFAULT_TIMEOUT: &str = "10s";
const DEFAULT_LIVE_INTERVAL: &str = "5s";
const DEFAULT_OVERVIEW_INTERVAL: &str = "60s";
const DEFAULT_WINDOW_DAYS: u32 = 14;
const MAX_WINDOW_DAYS: u32 = 365;
const DEFAULT_LOG_LEVEL: &str = "warn";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub api: Api,
    #[serde(default)]
    pub paging: Paging,
    #[serde(default)]
    pub polling: Polling,
    #[serde(default)]
    pub charts: Charts,
    #[serde(default)]
    pub logging: Logging,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            api: Api::default(),
            paging: Paging::default(),
            polling: Polling::default(),
            charts: Charts::default(),
            logging: Logging::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Api {
    pub base_url: Option<String>,
    pub secret_header: Option<String>,
    pub timeout: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Paging {
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Polling {
    pub live_interval: Option<String>,
    pub overview_interval: Option<String>,
    pub online_minutes: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Charts {
    pub window_days: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Logging {
    pub level: Option<String>,
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("WARDEN_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set WARDEN_CONFIG_PATH to the config file")
        })?;
        Ok(config_root.join(APP_NAME).join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} is not versioned. Add `version = 1` and keep values under [api], [paging], [polling], [charts], and [logging]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(base_url) = &self.api.base_url {
            let trimmed = base_url.trim();
            if trimmed.is_empty() {
                bail!("api.base_url in {} must not be empty", path.display());
            }
            if !trimmed.starts_with("http://") && !trimmed.starts_with("https://") {
                bail!(
                    "api.base_url in {} must start with http:// or https://, got {}",
                    path.display(),
                    trimmed
                );
            }
        }

        if let Some(header) = &self.api.secret_header
            && header.trim().is_empty()
        {
            bail!("api.secret_header in {} must not be empty", path.display());
        }

        let durations = [
            ("api.timeout", &self.api.timeout),
            ("polling.live_interval", &self.polling.live_interval),
            ("polling.overview_interval", &self.polling.overview_interval),
        ];
        for (key, value) in durations {
            if let Some(raw) = value {
                let parsed = parse_duration(raw)
                    .with_context(|| format!("{key} in {}", path.display()))?;
                if parsed.is_zero() {
                    bail!("{key} in {} must be positive, got {raw}", path.display());
                }
            }
        }

        if self.paging.limit == Some(0) {
            bail!("paging.limit in {} must be positive, got 0", path.display());
        }

        if self.polling.online_minutes == Some(0) {
            bail!(
                "polling.online_minutes in {} must be positive, got 0",
                path.display()
            );
        }

        if let Some(days) = self.charts.window_days
            && !(1..=MAX_WINDOW_DAYS).contains(&days)
        {
            bail!(
                "charts.window_days in {} must be between 1 and {MAX_WINDOW_DAYS}, got {days}",
                path.display()
            );
        }

        Ok(())
    }

    pub fn base_url(&self) -> &str {
        self.api
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim()
            .trim_end_matches('/')
    }

    pub fn secret_header(&self) -> &str {
        self.api
            .secret_header
            .as_deref()
            .unwrap_or(DEFAULT_SECRET_HEADER)
            .trim()
    }

    pub fn timeout(&self) -> Result<Duration> {
        parse_duration(self.api.timeout.as_deref().unwrap_or(DEFAULT_TIMEOUT))
    }

    pub fn page_limit(&self) -> u64 {
        self.paging.limit.unwrap_or(DEFAULT_PAGE_LIMIT)
    }

    pub fn live_interval(&self) -> Result<Duration> {
        parse_duration(
            self.polling
                .live_interval
                .as_deref()
                .unwrap_or(DEFAULT_LIVE_INTERVAL),
        )
    }

    pub fn overview_interval(&self) -> Result<Duration> {
        parse_duration(
            self.polling
                .overview_interval
                .as_deref()
                .unwrap_or(DEFAULT_OVERVIEW_INTERVAL),
        )
    }

    pub fn online_minutes(&self) -> u32 {
        self.polling.online_minutes.unwrap_or(DEFAULT_ONLINE_MINUTES)
    }

    pub fn window_days(&self) -> u32 {
        self.charts.window_days.unwrap_or(DEFAULT_WINDOW_DAYS)
    }

    pub fn log_level(&self) -> &str {
        self.logging.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    /// Replaces the configured base URL, as `--base-url` does.
    pub fn override_base_url(&mut self, base_url: &str) -> Result<()> {
        self.api.base_url = Some(base_url.to_owned());
        self.validate(Path::new("--base-url"))
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# warden config\n# Place this file at: {}\n\nversion = 1\n\n[api]\nbase_url = \"{}\"\nsecret_header = \"{}\"\ntimeout = \"{}\"\n\n[paging]\nlimit = {}\n\n[polling]\nlive_interval = \"{}\"\noverview_interval = \"{}\"\nonline_minutes = {}\n\n[charts]\nwindow_days = {}\n\n[logging]\n# Overridden by WARDEN_LOG, e.g. WARDEN_LOG=warden_api=debug\nlevel = \"{}\"\n",
            path.display(),
            DEFAULT_BASE_URL,
            DEFAULT_SECRET_HEADER,
            DEFAULT_TIMEOUT,
            DEFAULT_PAGE_LIMIT,
            DEFAULT_LIVE_INTERVAL,
            DEFAULT_OVERVIEW_INTERVAL,
            DEFAULT_ONLINE_MINUTES,
            DEFAULT_WINDOW_DAYS,
            DEFAULT_LOG_LEVEL,
        )
    }
}

fn parse_duration(raw: &str) -> Result<Duration> {
    let raw = raw.trim();
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid duration {raw:?}"))?;
        return Ok(Duration::from_secs(mins * 60));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 500ms or 5s)")
}

#[cfg(test)]
mod tests {
    use super::{Config, DEFAULT_BASE_URL, parse_duration};
    use anyhow::Result;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};
    use std::time::Duration;

    fn write_config(content: &str) -> Result<(tempfile::TempDir, PathBuf)> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        std::fs::write(&path, content)?;
        Ok((temp, path))
    }

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        match ENV_LOCK.get_or_init(|| Mutex::new(())).lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    #[test]
    fn missing_config_uses_defaults() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let config = Config::load(&temp.path().join("missing.toml"))?;
        assert_eq!(config.version, 1);
        assert_eq!(config.base_url(), DEFAULT_BASE_URL);
        assert_eq!(config.secret_header(), "x-admin-secret");
        assert_eq!(config.timeout()?, Duration::from_secs(10));
        assert_eq!(config.page_limit(), 25);
        assert_eq!(config.live_interval()?, Duration::from_secs(5));
        assert_eq!(config.overview_interval()?, Duration::from_secs(60));
        assert_eq!(config.online_minutes(), 5);
        assert_eq!(config.window_days(), 14);
        assert_eq!(config.log_level(), "warn");
        Ok(())
    }

    #[test]
    fn unversioned_config_is_rejected_with_actionable_message() -> Result<()> {
        let (_temp, path) = write_config("[api]\nbase_url = \"https://admin.example\"\n")?;
        let error = Config::load(&path).expect_err("unversioned config should fail");
        let message = error.to_string();
        assert!(message.contains("version = 1"));
        assert!(message.contains("[api]"));
        Ok(())
    }

    #[test]
    fn unsupported_config_version_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 2\n")?;
        let error = Config::load(&path).expect_err("v2 config should fail");
        assert!(error.to_string().contains("unsupported config version 2"));
        Ok(())
    }

    #[test]
    fn malformed_config_returns_parse_error() -> Result<()> {
        let (_temp, path) = write_config("{{not toml")?;
        let error = Config::load(&path).expect_err("malformed config should fail");
        assert!(error.to_string().contains("parse TOML config"));
        Ok(())
    }

    #[test]
    fn v1_config_parses() -> Result<()> {
        let (_temp, path) = write_config(
            "version = 1\n[api]\nbase_url = \"http://localhost:8080/\"\nsecret_header = \"x-ops-key\"\ntimeout = \"2s\"\n[paging]\nlimit = 50\n[polling]\nlive_interval = \"750ms\"\nonline_minutes = 15\n[charts]\nwindow_days = 30\n[logging]\nlevel = \"debug\"\n",
        )?;

        let config = Config::load(&path)?;
        assert_eq!(config.base_url(), "http://localhost:8080");
        assert_eq!(config.secret_header(), "x-ops-key");
        assert_eq!(config.timeout()?, Duration::from_secs(2));
        assert_eq!(config.page_limit(), 50);
        assert_eq!(config.live_interval()?, Duration::from_millis(750));
        assert_eq!(config.overview_interval()?, Duration::from_secs(60));
        assert_eq!(config.online_minutes(), 15);
        assert_eq!(config.window_days(), 30);
        assert_eq!(config.log_level(), "debug");
        Ok(())
    }

    #[test]
    fn base_url_must_be_http() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[api]\nbase_url = \"ftp://files\"\n")?;
        let error = Config::load(&path).expect_err("ftp base url should fail");
        assert!(error.to_string().contains("http:// or https://"));

        let (_temp, path) = write_config("version = 1\n[api]\nbase_url = \"  \"\n")?;
        let error = Config::load(&path).expect_err("blank base url should fail");
        assert!(error.to_string().contains("must not be empty"));
        Ok(())
    }

    #[test]
    fn zero_limits_and_intervals_are_rejected() -> Result<()> {
        for body in [
            "version = 1\n[paging]\nlimit = 0\n",
            "version = 1\n[polling]\nlive_interval = \"0s\"\n",
            "version = 1\n[polling]\nonline_minutes = 0\n",
            "version = 1\n[api]\ntimeout = \"0ms\"\n",
        ] {
            let (_temp, path) = write_config(body)?;
            let error = Config::load(&path).expect_err("zero value should fail");
            assert!(
                error.to_string().contains("must be positive"),
                "unexpected message for {body:?}: {error}"
            );
        }
        Ok(())
    }

    #[test]
    fn window_days_is_bounded() -> Result<()> {
        for days in [0, 366] {
            let (_temp, path) =
                write_config(&format!("version = 1\n[charts]\nwindow_days = {days}\n"))?;
            let error = Config::load(&path).expect_err("out of range window should fail");
            assert!(error.to_string().contains("between 1 and 365"));
        }
        Ok(())
    }

    #[test]
    fn bad_duration_names_the_key() -> Result<()> {
        let (_temp, path) =
            write_config("version = 1\n[polling]\noverview_interval = \"soon\"\n")?;
        let error = Config::load(&path).expect_err("bad duration should fail");
        let message = format!("{error:#}");
        assert!(message.contains("polling.overview_interval"));
        assert!(message.contains("invalid duration"));
        Ok(())
    }

    #[test]
    fn durations_parse_ms_seconds_and_minutes() -> Result<()> {
        assert_eq!(parse_duration("500ms")?, Duration::from_millis(500));
        assert_eq!(parse_duration("5s")?, Duration::from_secs(5));
        assert_eq!(parse_duration("2m")?, Duration::from_secs(120));
        assert!(parse_duration("5h").is_err());
        Ok(())
    }

    #[test]
    fn base_url_override_is_validated() -> Result<()> {
        let mut config = Config::default();
        config.override_base_url("http://127.0.0.1:9000/")?;
        assert_eq!(config.base_url(), "http://127.0.0.1:9000");
        assert!(config.override_base_url("localhost:9000").is_err());
        Ok(())
    }

    #[test]
    fn default_path_honors_env_override() -> Result<()> {
        let _guard = env_lock();
        let temp = tempfile::tempdir()?;
        let override_path = temp.path().join("custom-config.toml");
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var("WARDEN_CONFIG_PATH", &override_path);
        }
        let resolved = Config::default_path()?;
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var("WARDEN_CONFIG_PATH");
        }
        assert_eq!(resolved, override_path);
        Ok(())
    }

    #[test]
    fn default_path_uses_config_toml_suffix_when_no_env_override() -> Result<()> {
        let _guard = env_lock();
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::remove_var("WARDEN_CONFIG_PATH");
        }
        let path = Config::default_path()?;
        assert!(path.ends_with("warden/config.toml"));
        Ok(())
    }

    #[test]
    fn example_config_round_trips_through_load() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        std::fs::write(&path, Config::example_config(&path))?;
        let config = Config::load(&path)?;
        assert_eq!(config.base_url(), DEFAULT_BASE_URL);
        assert_eq!(config.window_days(), 14);
        Ok(())
    }
}
