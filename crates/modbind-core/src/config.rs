//! Binder configuration
//!
//! Layers, lowest first: built-in defaults, a TOML file, `MODBIND_*`
//! environment variables, then command line flags applied by the caller
//! through the `with_*` builders.

use crate::error::BindError;
use modbind_oslc::ServerSettings;
use modbind_structure::WireForm;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// File read when no explicit config path is given
pub const DEFAULT_CONFIG_FILE: &str = "modbind.toml";
/// Overrides `server.host`
pub const HOST_ENV: &str = "MODBIND_HOST";
/// Overrides `structure.wire_form`
pub const FORMAT_ENV: &str = "MODBIND_FORMAT";

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BinderConfig {
    pub server: ServerSettings,
    pub structure: StructureSettings,
    /// `tracing_subscriber::EnvFilter` directive
    pub log_filter: String,
}

impl BinderConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With server host
    #[inline]
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.server.host = host.into();
        self
    }

    /// With structure wire form
    #[inline]
    #[must_use]
    pub fn with_wire_form(mut self, form: WireForm) -> Self {
        self.structure.wire_form = form;
        self
    }

    /// With log filter directive
    #[inline]
    #[must_use]
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }

    /// Parse a TOML document; absent keys keep their defaults
    pub fn from_toml_str(text: &str) -> Result<Self, BindError> {
        toml::from_str(text).map_err(|e| BindError::config(e.to_string()))
    }

    /// Load from `path`, or from `modbind.toml` in the working directory when
    /// it exists, or fall back to defaults
    pub fn load(path: Option<&Path>) -> Result<Self, BindError> {
        let path = match path {
            Some(path) => path,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => Path::new(DEFAULT_CONFIG_FILE),
            None => return Ok(Self::default()),
        };
        debug!(path = %path.display(), "loading configuration");
        let text = std::fs::read_to_string(path)
            .map_err(|e| BindError::config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Apply `MODBIND_HOST` and `MODBIND_FORMAT` from the process environment
    pub fn apply_env(self) -> Result<Self, BindError> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply environment overrides read through `lookup`
    pub fn apply_env_from(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, BindError> {
        if let Some(host) = lookup(HOST_ENV).filter(|h| !h.trim().is_empty()) {
            self.server.host = host;
        }
        if let Some(form) = lookup(FORMAT_ENV) {
            self.structure.wire_form = form
                .parse()
                .map_err(|e| BindError::config(format!("{FORMAT_ENV}: {e}")))?;
        }
        Ok(self)
    }

    /// Reject settings no run could succeed with
    pub fn validate(&self) -> Result<(), BindError> {
        if self.server.host.trim().is_empty() {
            return Err(BindError::config(
                "server host is not set (use --host, MODBIND_HOST or server.host)",
            ));
        }
        self.structure.validate()
    }
}

impl Default for BinderConfig {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            structure: StructureSettings::default(),
            log_filter: "info".to_owned(),
        }
    }
}

/// Structure update settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructureSettings {
    /// Wire form used to read and write the structure
    pub wire_form: WireForm,
    /// Fixed interval between job polls
    pub poll_interval_ms: u64,
    /// Upper bound on waiting for an accepted update to apply
    pub job_timeout_secs: u64,
    /// Pause between job completion and the confirming read
    pub settle_delay_ms: u64,
}

impl StructureSettings {
    #[inline]
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    #[inline]
    #[must_use]
    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_secs)
    }

    #[inline]
    #[must_use]
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// With poll interval
    #[inline]
    #[must_use]
    pub fn with_poll_interval_ms(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// With job timeout
    #[inline]
    #[must_use]
    pub fn with_job_timeout_secs(mut self, secs: u64) -> Self {
        self.job_timeout_secs = secs;
        self
    }

    /// With settle delay
    #[inline]
    #[must_use]
    pub fn with_settle_delay_ms(mut self, ms: u64) -> Self {
        self.settle_delay_ms = ms;
        self
    }

    pub fn validate(&self) -> Result<(), BindError> {
        if self.poll_interval_ms == 0 {
            return Err(BindError::config("structure.poll_interval_ms must be positive"));
        }
        if self.job_timeout() < self.poll_interval() {
            return Err(BindError::config(
                "structure.job_timeout_secs is shorter than one poll interval",
            ));
        }
        Ok(())
    }
}

impl Default for StructureSettings {
    fn default() -> Self {
        Self {
            wire_form: WireForm::Markup,
            poll_interval_ms: 1000,
            job_timeout_secs: 300,
            settle_delay_ms: 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn defaults() {
        let config = BinderConfig::default();
        assert_eq!(config.server.jts_context, "jts");
        assert_eq!(config.server.rm_context, "rm");
        assert_eq!(config.structure.wire_form, WireForm::Markup);
        assert_eq!(config.structure.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.structure.job_timeout_secs, 300);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = BinderConfig::from_toml_str(
            r#"
            log_filter = "modbind=debug"

            [server]
            host = "https://rm.example.com:9443"

            [structure]
            wire_form = "flat-list"
            poll_interval_ms = 250
            "#,
        )
        .unwrap();
        assert_eq!(config.server.host, "https://rm.example.com:9443");
        assert_eq!(config.server.rm_context, "rm");
        assert_eq!(config.structure.wire_form, WireForm::FlatList);
        assert_eq!(config.structure.poll_interval_ms, 250);
        assert_eq!(config.structure.job_timeout_secs, 300);
        assert_eq!(config.log_filter, "modbind=debug");
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nhost = \"https://dng\"\nverify_tls = true").unwrap();
        let config = BinderConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.server.host, "https://dng");
        assert!(config.server.verify_tls);
    }

    #[test]
    fn missing_file_is_config_error() {
        let result = BinderConfig::load(Some(Path::new("/nonexistent/modbind.toml")));
        assert!(matches!(result, Err(BindError::Config(_))));
    }

    #[test]
    fn env_overrides() {
        let config = BinderConfig::default()
            .with_host("https://file")
            .apply_env_from(|key| match key {
                HOST_ENV => Some("https://env".to_owned()),
                FORMAT_ENV => Some("json".to_owned()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.server.host, "https://env");
        assert_eq!(config.structure.wire_form, WireForm::FlatList);

        let bad = BinderConfig::default().apply_env_from(|key| {
            (key == FORMAT_ENV).then(|| "yaml".to_owned())
        });
        assert!(matches!(bad, Err(BindError::Config(_))));
    }

    #[test]
    fn validation() {
        assert!(BinderConfig::default().validate().is_err());
        assert!(BinderConfig::default().with_host("https://h").validate().is_ok());

        let mut config = BinderConfig::default().with_host("https://h");
        config.structure = config.structure.with_poll_interval_ms(0);
        assert!(config.validate().is_err());

        config.structure = StructureSettings::default()
            .with_poll_interval_ms(5000)
            .with_job_timeout_secs(2);
        assert!(config.validate().is_err());
    }
}
