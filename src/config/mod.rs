//! Configuration loading
//!
//! The configuration file is parsed once into a [`ConfigStore`] of named
//! sections. [`Settings`] is the typed view every other component receives.

pub mod loader;
pub mod settings;

pub use loader::{ConfigError, ConfigStore};
pub use settings::{
    ChatConfig, JobConfig, MonitoredTable, Settings, SmtpConfig, SslMode, WarehouseConfig,
    DEFAULT_CONFIG_PATH,
};
