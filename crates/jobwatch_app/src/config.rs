//! Dashboard configuration, read from a RON file.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use jobwatch_core::PagingMode;
use jobwatch_engine::GatewaySettings;
use jobwatch_logging::LogDestination;
use log::LevelFilter;
use serde::Deserialize;

const LOG_FILENAME: &str = "jobwatch.log";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum Paging {
    #[default]
    Client,
    Server,
}

impl From<Paging> for PagingMode {
    fn from(paging: Paging) -> Self {
        match paging {
            Paging::Client => PagingMode::Client,
            Paging::Server => PagingMode::Server,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum LogOutput {
    #[default]
    Terminal,
    File,
    Both,
}

impl From<LogOutput> for LogDestination {
    fn from(output: LogOutput) -> Self {
        match output {
            LogOutput::Terminal => LogDestination::Terminal,
            LogOutput::File => LogDestination::File,
            LogOutput::Both => LogDestination::Both,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Dashboard root; endpoint paths are resolved against it.
    pub base_url: String,
    /// Anti-forgery token sent with every request.
    pub csrf_token: String,
    /// JSON document with `jobs`, `jobtypes` and `terms`.
    pub bootstrap_path: Option<PathBuf>,
    pub paging: Paging,
    /// Initial fragment, used when no view was persisted yet.
    pub fragment: Option<String>,
    pub state_dir: PathBuf,
    pub log: LogOutput,
    pub log_level: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub render_interval_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/".to_string(),
            csrf_token: String::new(),
            bootstrap_path: None,
            paging: Paging::default(),
            fragment: None,
            state_dir: PathBuf::from("."),
            log: LogOutput::default(),
            log_level: "info".to_string(),
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
            render_interval_ms: 250,
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        Ok(ron::from_str(text)?)
    }

    pub fn level(&self) -> LevelFilter {
        LevelFilter::from_str(&self.log_level).unwrap_or(LevelFilter::Info)
    }

    pub fn log_path(&self) -> PathBuf {
        self.state_dir.join(LOG_FILENAME)
    }

    pub fn gateway_settings(&self) -> GatewaySettings {
        GatewaySettings {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            ..GatewaySettings::default()
        }
    }

    pub fn render_interval(&self) -> Duration {
        Duration::from_millis(self.render_interval_ms.max(10))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_falls_back_to_defaults() {
        let config = AppConfig::parse(
            r#"(
                base_url: "https://analytics.example.edu/admin/",
                csrf_token: "abc",
                paging: Server,
                log: Both,
            )"#,
        )
        .unwrap();
        assert_eq!(config.base_url, "https://analytics.example.edu/admin/");
        assert_eq!(config.paging, Paging::Server);
        assert_eq!(config.log, LogOutput::Both);
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.fragment, None);
    }

    #[test]
    fn unknown_level_means_info() {
        let config = AppConfig {
            log_level: "chatty".to_string(),
            ..AppConfig::default()
        };
        assert_eq!(config.level(), LevelFilter::Info);
    }

    #[test]
    fn timeouts_feed_gateway_settings() {
        let config = AppConfig {
            request_timeout_secs: 5,
            ..AppConfig::default()
        };
        let settings = config.gateway_settings();
        assert_eq!(settings.request_timeout, Duration::from_secs(5));
        assert_eq!(settings.jobs_path, "api/filterjobs/");
    }

    #[test]
    fn malformed_config_is_an_error() {
        assert!(AppConfig::parse("(base_url: )").is_err());
    }
}
