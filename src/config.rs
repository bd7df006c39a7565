/// Administration settings
///
/// Priority: environment (`POSTGRUST_ADMIN_*`) > config file > defaults.
/// The file is the explicit path when given, otherwise the first of
/// `/etc/postgrust-admin/postgrust-admin.toml` and `./postgrust-admin.toml`
/// that exists.
use config::{Config, Environment, File};
use log::{debug, LevelFilter};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::AdminError;
use crate::version::ServerVersion;

pub const CONFIG_PATHS: [&str; 2] = [
    "/etc/postgrust-admin/postgrust-admin.toml",
    "./postgrust-admin.toml",
];

pub const ENV_PREFIX: &str = "POSTGRUST_ADMIN";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Server version to target; detected from the server when absent
    #[serde(default)]
    pub server_version: Option<String>,
    #[serde(default = "default_schema")]
    pub schema: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_schema() -> String {
    "public".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            server_version: None,
            schema: default_schema(),
            log_level: default_log_level(),
        }
    }
}

impl AdminConfig {
    /// Load from the standard locations and the environment
    pub fn load() -> Result<Self, AdminError> {
        let file = CONFIG_PATHS.iter().map(Path::new).find(|p| p.exists());
        Self::build(file, ENV_PREFIX)
    }

    /// Load from an explicit file (which must exist) and the environment
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AdminError> {
        Self::build(Some(path.as_ref()), ENV_PREFIX)
    }

    fn build(file: Option<&Path>, env_prefix: &str) -> Result<Self, AdminError> {
        let mut builder = Config::builder();
        if let Some(path) = file {
            debug!("loading config from {}", path.display());
            builder = builder.add_source(File::from(path));
        }
        builder = builder.add_source(Environment::with_prefix(env_prefix));

        Ok(builder.build()?.try_deserialize::<Self>()?)
    }

    /// Configured server version, if any
    pub fn server_version(&self) -> Result<Option<ServerVersion>, AdminError> {
        self.server_version
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .map(str::parse)
            .transpose()
    }

    /// `log_level` as a filter; unknown names fall back to `info`
    #[must_use]
    pub fn level_filter(&self) -> LevelFilter {
        self.log_level.parse().unwrap_or(LevelFilter::Info)
    }

    /// Install `env_logger` with the configured level
    ///
    /// `RUST_LOG` still overrides per-module filters. Returns false when a
    /// logger was already installed.
    pub fn init_logging(&self) -> bool {
        env_logger::Builder::new()
            .filter_level(self.level_filter())
            .parse_default_env()
            .try_init()
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn toml_file(contents: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_without_sources() {
        let config = AdminConfig::build(None, "POSTGRUST_ADMIN_TEST_UNSET").unwrap();
        assert_eq!(config, AdminConfig::default());
        assert_eq!(config.server_version().unwrap(), None);
    }

    #[test]
    fn test_file_values() {
        let file = toml_file("server_version = \"9.6.24\"\nschema = \"billing\"\nlog_level = \"debug\"\n");
        let config = AdminConfig::build(Some(file.path()), "POSTGRUST_ADMIN_TEST_UNSET").unwrap();
        assert_eq!(config.schema, "billing");
        assert_eq!(config.level_filter(), LevelFilter::Debug);
        assert_eq!(config.server_version().unwrap(), Some(ServerVersion::new(9, 6)));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let file = toml_file("server_version = \"14.2\"\n");
        let config = AdminConfig::from_file(file.path()).unwrap();
        assert_eq!(config.server_version().unwrap(), Some(ServerVersion::new(14, 2)));
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_environment_overrides_file() {
        let file = toml_file("schema = \"billing\"\n");
        // SAFETY: the variable name is unique to this test
        unsafe { std::env::set_var("POSTGRUST_ADMIN_TEST_ENV_SCHEMA", "audit") };
        let config = AdminConfig::build(Some(file.path()), "POSTGRUST_ADMIN_TEST_ENV").unwrap();
        unsafe { std::env::remove_var("POSTGRUST_ADMIN_TEST_ENV_SCHEMA") };
        assert_eq!(config.schema, "audit");
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = AdminConfig::from_file(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, AdminError::Config(_)));
        assert_eq!(err.code(), -11);
    }

    #[test]
    fn test_bad_version_is_rejected() {
        let config = AdminConfig {
            server_version: Some("nine".to_string()),
            ..AdminConfig::default()
        };
        assert!(matches!(config.server_version(), Err(AdminError::UnsupportedVersion(_))));
    }

    #[test]
    fn test_unknown_level_falls_back_to_info() {
        let config = AdminConfig {
            log_level: "chatty".to_string(),
            ..AdminConfig::default()
        };
        assert_eq!(config.level_filter(), LevelFilter::Info);
    }
}
