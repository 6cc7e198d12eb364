//! Server configuration.
//!
//! Layered with `figment`: built-in defaults, then the optional YAML file
//! given with `--config`, then `PERMISSION_*` environment variables (`__`
//! separates nested keys, e.g. `PERMISSION_LOGGING__FORMAT=json`).

use std::path::Path;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};
use static_datastore_plugin::StaticDatastorePluginConfig;

/// Prefix of configuration environment variables.
pub const ENV_PREFIX: &str = "PERMISSION_";

/// Root configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// Requests running longer are answered with 504.
    pub request_timeout_secs: u64,
    pub datastore: DatastoreConfig,
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_owned(),
            port: 9005,
            request_timeout_secs: 30,
            datastore: DatastoreConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads the layered configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or a value has the wrong
    /// type or an unknown key.
    pub fn load(file: Option<&Path>) -> Result<Self, Box<figment::Error>> {
        Self::figment(file).extract().map_err(Box::new)
    }

    fn figment(file: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(file) = file {
            figment = figment.merge(Yaml::file_exact(file));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }
}

/// Where decisions read their data from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DatastoreConfig {
    /// Fixture data held in memory.
    Static(StaticDatastorePluginConfig),
}

impl Default for DatastoreConfig {
    fn default() -> Self {
        Self::Static(StaticDatastorePluginConfig::default())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging configuration. `RUST_LOG` takes precedence over `level`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: LogFormat::Text,
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::io::Write;
    use std::path::PathBuf;

    use figment::Jail;

    use super::*;

    fn yaml_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_without_file() {
        Jail::expect_with(|_| {
            assert_eq!(AppConfig::load(None).unwrap(), AppConfig::default());
            Ok(())
        });
    }

    #[test]
    fn file_overrides_defaults() {
        let file = yaml_file(
            r"
port: 9100
datastore:
  kind: static
  fixture: ./fixtures/demo.yaml
logging:
  format: json
",
        );

        Jail::expect_with(|_| {
            let cfg = AppConfig::load(Some(file.path())).unwrap();
            assert_eq!(cfg.port, 9100);
            assert_eq!(cfg.host, "0.0.0.0");
            assert_eq!(cfg.logging.format, LogFormat::Json);
            assert_eq!(cfg.logging.level, "info");
            let DatastoreConfig::Static(datastore) = cfg.datastore;
            assert_eq!(datastore.fixture, Some(PathBuf::from("./fixtures/demo.yaml")));
            Ok(())
        });
    }

    #[test]
    fn environment_overrides_file() {
        let file = yaml_file("port: 9100\nhost: 127.0.0.1\n");

        Jail::expect_with(|jail| {
            jail.set_env("PERMISSION_PORT", "9200");
            jail.set_env("PERMISSION_LOGGING__LEVEL", "debug");

            let cfg = AppConfig::load(Some(file.path())).unwrap();
            assert_eq!(cfg.port, 9200);
            assert_eq!(cfg.host, "127.0.0.1");
            assert_eq!(cfg.logging.level, "debug");
            Ok(())
        });
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let file = yaml_file("prot: 9100\n");
        Jail::expect_with(|_| {
            assert!(AppConfig::load(Some(file.path())).is_err());
            Ok(())
        });
    }

    #[test]
    fn missing_file_is_an_error() {
        Jail::expect_with(|_| {
            assert!(AppConfig::load(Some(Path::new("/nonexistent/permission.yaml"))).is_err());
            Ok(())
        });
    }
}
