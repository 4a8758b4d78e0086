//! Typed configuration sections

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::loader::{ConfigError, ConfigStore, JOB_SECTION, MONITOR_SECTION};
use crate::alerts::message::{
    Thresholds, CRITICAL_THRESHOLD_MINUTES, STANDARD_THRESHOLD_MINUTES,
};

/// Configuration path used when `LAGWATCH_CONFIG` is not set
pub const DEFAULT_CONFIG_PATH: &str = "/etc/lagwatch/lagwatch.toml";

/// Column holding the row creation time in replicated tables
pub const DEFAULT_TIMESTAMP_COLUMN: &str = "dateCreated";

pub const WAREHOUSE_SECTION: &str = "warehouse";
pub const EMAIL_SECTION: &str = "email";
pub const CHAT_SECTION: &str = "chat";

/// Keys a section cannot be loaded without
const WAREHOUSE_REQUIRED_KEYS: &[&str] = &["host", "dbname", "user", "password"];
const EMAIL_REQUIRED_KEYS: &[&str] = &["smtp_host", "smtp_username", "smtp_password", "recipient"];

const REDACTED: &str = "<redacted>";

/// TLS negotiation with the warehouse, as in libpq's `sslmode`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SslMode {
    /// Plaintext only
    Disable,
    /// TLS when the server supports it, plaintext otherwise
    #[default]
    Prefer,
    /// TLS or fail
    Require,
}

/// Warehouse connection parameters
#[derive(Clone, Serialize, Deserialize)]
pub struct WarehouseConfig {
    pub host: String,
    #[serde(default = "default_warehouse_port")]
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: String,
    #[serde(default)]
    pub sslmode: SslMode,
}

fn default_warehouse_port() -> u16 {
    5439
}

impl std::fmt::Debug for WarehouseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WarehouseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("dbname", &self.dbname)
            .field("user", &self.user)
            .field("password", &REDACTED)
            .field("sslmode", &self.sslmode)
            .finish()
    }
}

/// SMTP settings for email alerts
#[derive(Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    /// Recipient of every alert
    pub recipient: String,
    /// Recipient of critical alerts (defaults to `recipient`)
    #[serde(default)]
    pub critical_recipient: Option<String>,
    /// Sender address (defaults to `smtp_username`)
    #[serde(default)]
    pub from_address: Option<String>,
}

fn default_smtp_port() -> u16 {
    465
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_username", &self.smtp_username)
            .field("smtp_password", &REDACTED)
            .field("recipient", &self.recipient)
            .field("critical_recipient", &self.critical_recipient)
            .field("from_address", &self.from_address)
            .finish()
    }
}

impl SmtpConfig {
    pub fn sender(&self) -> &str {
        self.from_address.as_deref().unwrap_or(&self.smtp_username)
    }

    pub fn critical_recipient(&self) -> &str {
        self.critical_recipient.as_deref().unwrap_or(&self.recipient)
    }
}

/// Chat webhook settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(alias = "slack_webhook_url")]
    pub webhook_url: String,
}

/// Job-wide options, all optional
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    /// Explicit check order; resolved through [`ConfigStore::monitor_names`]
    #[serde(default)]
    pub tables: Option<Vec<String>>,
    #[serde(default = "default_standard_threshold")]
    pub standard_threshold_minutes: i64,
    #[serde(default = "default_critical_threshold")]
    pub critical_threshold_minutes: i64,
    #[serde(default = "default_timestamp_column")]
    pub timestamp_column: String,
}

fn default_standard_threshold() -> i64 {
    STANDARD_THRESHOLD_MINUTES
}

fn default_critical_threshold() -> i64 {
    CRITICAL_THRESHOLD_MINUTES
}

fn default_timestamp_column() -> String {
    DEFAULT_TIMESTAMP_COLUMN.to_string()
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            tables: None,
            standard_threshold_minutes: STANDARD_THRESHOLD_MINUTES,
            critical_threshold_minutes: CRITICAL_THRESHOLD_MINUTES,
            timestamp_column: default_timestamp_column(),
        }
    }
}

impl JobConfig {
    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            standard_minutes: self.standard_threshold_minutes,
            critical_minutes: self.critical_threshold_minutes,
        }
    }
}

/// A replicated table whose lag is checked
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoredTable {
    /// Section key (`orders` for `[monitor.orders]`)
    #[serde(skip)]
    pub name: String,
    pub table: String,
    pub database: String,
    /// Source host the table is replicated from
    pub host: String,
    #[serde(default)]
    pub replication_task: Option<String>,
    /// Overrides the job-wide timestamp column
    #[serde(default)]
    pub timestamp_column: Option<String>,
}

impl MonitoredTable {
    /// `database.table`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.database, self.table)
    }
}

/// Everything a run needs, loaded once at startup
#[derive(Debug, Clone)]
pub struct Settings {
    pub warehouse: WarehouseConfig,
    pub email: SmtpConfig,
    pub chat: ChatConfig,
    pub job: JobConfig,
    store: ConfigStore,
}

impl Settings {
    /// Load settings from a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_store(ConfigStore::load(path)?)
    }

    /// Build settings from an already parsed store
    pub fn from_store(store: ConfigStore) -> Result<Self, ConfigError> {
        let job = if store.has_section(JOB_SECTION) {
            store.section(JOB_SECTION)?
        } else {
            JobConfig::default()
        };

        if job.standard_threshold_minutes > job.critical_threshold_minutes {
            return Err(ConfigError::InvalidValue {
                section: JOB_SECTION.to_string(),
                key: "critical_threshold_minutes".to_string(),
                message: format!(
                    "must not be below standard_threshold_minutes ({})",
                    job.standard_threshold_minutes
                ),
            });
        }

        store.require_keys(WAREHOUSE_SECTION, WAREHOUSE_REQUIRED_KEYS)?;
        store.require_keys(EMAIL_SECTION, EMAIL_REQUIRED_KEYS)?;

        Ok(Self {
            warehouse: store.section(WAREHOUSE_SECTION)?,
            email: store.section(EMAIL_SECTION)?,
            chat: store.section(CHAT_SECTION)?,
            job,
            store,
        })
    }

    /// Config path from `LAGWATCH_CONFIG`, falling back to the fixed default
    pub fn path_from_env() -> String {
        std::env::var("LAGWATCH_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    /// Monitored entry names in check order
    pub fn monitor_names(&self) -> Result<Vec<String>, ConfigError> {
        self.store.monitor_names()
    }

    /// Resolve one `[monitor.<name>]` section
    pub fn monitored_table(&self, name: &str) -> Result<MonitoredTable, ConfigError> {
        let mut entry: MonitoredTable = self.store.section(&format!("{MONITOR_SECTION}.{name}"))?;
        entry.name = name.to_string();
        Ok(entry)
    }

    /// Timestamp column used in the lag query for `entry`
    pub fn timestamp_column<'a>(&'a self, entry: &'a MonitoredTable) -> &'a str {
        entry
            .timestamp_column
            .as_deref()
            .unwrap_or(&self.job.timestamp_column)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const FULL_CONFIG: &str = r#"
[warehouse]
host = "redshift.internal"
port = 5439
dbname = "lake"
user = "monitor"
password = "secret"

[monitor.orders]
table = "orders"
database = "sales"
host = "sales-db-1"
replication_task = "dms-orders"

[monitor.events]
table = "events"
database = "tracking"
host = "tracking-db-1"

[email]
smtp_host = "smtp.example.com"
smtp_port = 465
smtp_username = "alerts@example.com"
smtp_password = "hunter2"
recipient = "oncall@example.com"

[chat]
webhook_url = "https://hooks.example.com/T000/B000"
"#;

    fn settings(content: &str) -> Settings {
        Settings::from_store(ConfigStore::parse("test.toml", content).unwrap()).unwrap()
    }

    #[test]
    fn test_load_full_config() {
        let settings = settings(FULL_CONFIG);

        assert_eq!(settings.warehouse.host, "redshift.internal");
        assert_eq!(settings.warehouse.dbname, "lake");
        assert_eq!(settings.email.smtp_port, 465);
        assert_eq!(settings.chat.webhook_url, "https://hooks.example.com/T000/B000");
        assert_eq!(settings.job.thresholds(), Thresholds::default());
        assert_eq!(settings.job.timestamp_column, "dateCreated");
        assert_eq!(settings.monitor_names().unwrap(), vec!["orders", "events"]);
    }

    #[test]
    fn test_monitored_table() {
        let settings = settings(FULL_CONFIG);

        let orders = settings.monitored_table("orders").unwrap();
        assert_eq!(orders.name, "orders");
        assert_eq!(orders.qualified_name(), "sales.orders");
        assert_eq!(orders.replication_task.as_deref(), Some("dms-orders"));

        let events = settings.monitored_table("events").unwrap();
        assert_eq!(events.replication_task, None);
        assert_eq!(settings.timestamp_column(&events), "dateCreated");

        assert!(matches!(
            settings.monitored_table("missing").unwrap_err(),
            ConfigError::SectionNotFound { .. }
        ));
    }

    #[test]
    fn test_sender_and_critical_recipient_defaults() {
        let settings = settings(FULL_CONFIG);
        assert_eq!(settings.email.sender(), "alerts@example.com");
        assert_eq!(settings.email.critical_recipient(), "oncall@example.com");
    }

    #[test]
    fn test_slack_webhook_alias() {
        let content = FULL_CONFIG.replace("webhook_url", "slack_webhook_url");
        let settings = settings(&content);
        assert_eq!(settings.chat.webhook_url, "https://hooks.example.com/T000/B000");
    }

    #[test]
    fn test_job_overrides() {
        let content = format!(
            "{}\n[job]\nstandard_threshold_minutes = 30\ncritical_threshold_minutes = 120\ntimestamp_column = \"updated_at\"\n",
            FULL_CONFIG
        );
        let settings = settings(&content);
        assert_eq!(
            settings.job.thresholds(),
            Thresholds {
                standard_minutes: 30,
                critical_minutes: 120,
            }
        );

        let orders = settings.monitored_table("orders").unwrap();
        assert_eq!(settings.timestamp_column(&orders), "updated_at");
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let content = format!(
            "{}\n[job]\nstandard_threshold_minutes = 300\n",
            FULL_CONFIG
        );
        let store = ConfigStore::parse("test.toml", &content).unwrap();
        assert!(matches!(
            Settings::from_store(store).unwrap_err(),
            ConfigError::InvalidValue { .. }
        ));
    }

    #[test]
    fn test_missing_required_section() {
        let content = FULL_CONFIG.replace("[chat]", "[slack]");
        let store = ConfigStore::parse("test.toml", &content).unwrap();
        match Settings::from_store(store).unwrap_err() {
            ConfigError::SectionNotFound { section, .. } => assert_eq!(section, "chat"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_recipient_names_the_key() {
        let content = FULL_CONFIG.replace("recipient = \"oncall@example.com\"\n", "");
        let store = ConfigStore::parse("test.toml", &content).unwrap();
        match Settings::from_store(store).unwrap_err() {
            ConfigError::MissingKey { section, key, .. } => {
                assert_eq!(section, "email");
                assert_eq!(key, "recipient");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_debug_redacts_passwords() {
        let settings = settings(FULL_CONFIG);
        let rendered = format!("{:?}", settings);

        assert!(rendered.contains("redshift.internal"));
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("secret"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn test_sslmode_default_and_override() {
        assert_eq!(settings(FULL_CONFIG).warehouse.sslmode, SslMode::Prefer);

        let content = FULL_CONFIG.replace(
            "password = \"secret\"",
            "password = \"secret\"\nsslmode = \"require\"",
        );
        assert_eq!(settings(&content).warehouse.sslmode, SslMode::Require);

        let content = FULL_CONFIG.replace(
            "password = \"secret\"",
            "password = \"secret\"\nsslmode = \"verify-full\"",
        );
        let store = ConfigStore::parse("test.toml", &content).unwrap();
        assert!(matches!(
            Settings::from_store(store).unwrap_err(),
            ConfigError::InvalidSection { .. }
        ));
    }
}
