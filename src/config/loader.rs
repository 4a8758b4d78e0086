//! Section store backed by a TOML file

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use toml::{Table, Value};

/// Section holding the monitored table entries (`[monitor.<name>]`)
pub const MONITOR_SECTION: &str = "monitor";

/// Section holding job-wide options
pub const JOB_SECTION: &str = "job";

/// Parsed configuration file, addressable by section name
#[derive(Clone)]
pub struct ConfigStore {
    path: PathBuf,
    root: Table,
}

// Values stay out of Debug output; sections hold credentials
impl std::fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigStore")
            .field("path", &self.path)
            .field("sections", &self.root.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ConfigStore {
    /// Read and parse a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(path, &content)
    }

    /// Parse configuration text; `path` is only used in error messages
    pub fn parse(path: impl Into<PathBuf>, content: &str) -> Result<Self, ConfigError> {
        let path = path.into();
        let root = content
            .parse::<Table>()
            .map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        Ok(Self { path, root })
    }

    /// Path the store was loaded from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up a section by name. Dotted names address nested sections,
    /// so `monitor.orders` is the `[monitor.orders]` table.
    pub fn load_section(&self, section: &str) -> Result<&Table, ConfigError> {
        let mut current = &self.root;
        for part in section.split('.') {
            current = match current.get(part) {
                Some(Value::Table(table)) => table,
                _ => return Err(self.not_found(section)),
            };
        }
        Ok(current)
    }

    /// Whether a section exists
    pub fn has_section(&self, section: &str) -> bool {
        self.load_section(section).is_ok()
    }

    /// Deserialize a section into a typed config struct
    pub fn section<T: DeserializeOwned>(&self, section: &str) -> Result<T, ConfigError> {
        let table = self.load_section(section)?;
        Value::Table(table.clone())
            .try_into()
            .map_err(|source| ConfigError::InvalidSection {
                section: section.to_string(),
                source,
            })
    }

    /// Fail with [`ConfigError::MissingKey`] naming the first absent key
    pub fn require_keys(&self, section: &str, keys: &[&str]) -> Result<(), ConfigError> {
        let table = self.load_section(section)?;
        match keys.iter().find(|key| !table.contains_key(**key)) {
            Some(key) => Err(ConfigError::MissingKey {
                section: section.to_string(),
                key: key.to_string(),
                path: self.path.display().to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Names of the monitored table entries, in check order.
    ///
    /// An explicit `tables` list under `[job]` wins; otherwise every
    /// `[monitor.<name>]` section is returned in file order.
    pub fn monitor_names(&self) -> Result<Vec<String>, ConfigError> {
        if let Ok(job) = self.load_section(JOB_SECTION) {
            if let Some(tables) = job.get("tables") {
                return tables
                    .as_array()
                    .and_then(|items| {
                        items
                            .iter()
                            .map(|item| item.as_str().map(String::from))
                            .collect::<Option<Vec<_>>>()
                    })
                    .ok_or_else(|| ConfigError::InvalidValue {
                        section: JOB_SECTION.to_string(),
                        key: "tables".to_string(),
                        message: "expected a list of section names".to_string(),
                    });
            }
        }

        let names = match self.root.get(MONITOR_SECTION) {
            Some(Value::Table(monitors)) => monitors
                .iter()
                .filter(|(_, value)| value.is_table())
                .map(|(name, _)| name.clone())
                .collect(),
            _ => Vec::new(),
        };
        Ok(names)
    }

    fn not_found(&self, section: &str) -> ConfigError {
        ConfigError::SectionNotFound {
            section: section.to_string(),
            path: self.path.display().to_string(),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Section {section} not found in the {path} file")]
    SectionNotFound { section: String, path: String },

    #[error("Key {key} is required in section {section} of the {path} file")]
    MissingKey {
        section: String,
        key: String,
        path: String,
    },

    #[error("Invalid section {section}: {source}")]
    InvalidSection {
        section: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid value for {section}.{key}: {message}")]
    InvalidValue {
        section: String,
        key: String,
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
[warehouse]
host = "warehouse.internal"
port = 5439

[monitor.orders]
table = "orders"
database = "sales"

[monitor.events]
table = "events"
database = "tracking"
"#;

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let store = ConfigStore::load(file.path()).unwrap();
        assert_eq!(store.path(), file.path());
        assert!(store.has_section("warehouse"));
    }

    #[test]
    fn test_missing_file() {
        let err = ConfigStore::load("/nonexistent/lagwatch.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_load_section() {
        let store = ConfigStore::parse("test.toml", SAMPLE).unwrap();

        let warehouse = store.load_section("warehouse").unwrap();
        assert_eq!(
            warehouse.get("host").and_then(|v| v.as_str()),
            Some("warehouse.internal")
        );

        let orders = store.load_section("monitor.orders").unwrap();
        assert_eq!(orders.get("database").and_then(|v| v.as_str()), Some("sales"));
    }

    #[test]
    fn test_section_not_found() {
        let store = ConfigStore::parse("test.toml", SAMPLE).unwrap();

        let err = store.load_section("email").unwrap_err();
        match err {
            ConfigError::SectionNotFound { section, path } => {
                assert_eq!(section, "email");
                assert_eq!(path, "test.toml");
            }
            other => panic!("unexpected error: {other}"),
        }

        // A scalar key is not a section
        assert!(store.load_section("warehouse.host").is_err());
    }

    #[test]
    fn test_typed_section() {
        #[derive(Deserialize)]
        struct Warehouse {
            host: String,
            port: u16,
        }

        let store = ConfigStore::parse("test.toml", SAMPLE).unwrap();
        let warehouse: Warehouse = store.section("warehouse").unwrap();
        assert_eq!(warehouse.host, "warehouse.internal");
        assert_eq!(warehouse.port, 5439);
    }

    #[test]
    fn test_invalid_section() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Strict {
            missing_key: String,
        }

        let store = ConfigStore::parse("test.toml", SAMPLE).unwrap();
        let err = store.section::<Strict>("warehouse").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSection { .. }));
    }

    #[test]
    fn test_require_keys() {
        let store = ConfigStore::parse("test.toml", SAMPLE).unwrap();
        assert!(store.require_keys("warehouse", &["host", "port"]).is_ok());

        match store.require_keys("warehouse", &["host", "dbname"]).unwrap_err() {
            ConfigError::MissingKey { section, key, .. } => {
                assert_eq!(section, "warehouse");
                assert_eq!(key, "dbname");
            }
            other => panic!("unexpected error: {other}"),
        }

        assert!(matches!(
            store.require_keys("email", &["smtp_host"]).unwrap_err(),
            ConfigError::SectionNotFound { .. }
        ));
    }

    #[test]
    fn test_monitor_names_in_file_order() {
        let store = ConfigStore::parse("test.toml", SAMPLE).unwrap();
        assert_eq!(store.monitor_names().unwrap(), vec!["orders", "events"]);
    }

    #[test]
    fn test_monitor_names_from_job_list() {
        let content = format!("{}\n[job]\ntables = [\"events\", \"missing\"]\n", SAMPLE);
        let store = ConfigStore::parse("test.toml", &content).unwrap();
        assert_eq!(store.monitor_names().unwrap(), vec!["events", "missing"]);
    }

    #[test]
    fn test_monitor_names_rejects_non_strings() {
        let store = ConfigStore::parse("test.toml", "[job]\ntables = [1, 2]\n").unwrap();
        assert!(matches!(
            store.monitor_names().unwrap_err(),
            ConfigError::InvalidValue { .. }
        ));
    }

    #[test]
    fn test_parse_error() {
        let err = ConfigStore::parse("bad.toml", "[warehouse\nhost =").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
