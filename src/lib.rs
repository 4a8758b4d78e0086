//! Lagwatch: Warehouse Replication Lag Monitor
//!
//! A scheduled job that measures how far each replicated table in a Redshift
//! warehouse trails its source, and raises email and chat alerts when the lag
//! crosses a threshold.
//!
//! # Features
//!
//! - **One Query Per Table**: `DATEDIFF(minute, MAX(<created>), GETDATE())`
//! - **Two Alert Tiers**: standard above 15 minutes, critical above 240
//! - **Email + Chat**: SMTPS delivery and a JSON chat webhook
//! - **Isolated Failures**: a failed notification never stops the run
//!
//! # Example
//!
//! ```no_run
//! use lagwatch::alerts::{AlertNotifier, LagChecker};
//! use lagwatch::config::Settings;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = Settings::load("/etc/lagwatch/lagwatch.toml")?;
//! let notifier = AlertNotifier::from_settings(&settings);
//!
//! let report = LagChecker::new(&settings, &notifier).run().await;
//! println!("Checked {} tables", report.tables_checked);
//! # Ok(())
//! # }
//! ```

pub mod alerts;
pub mod config;
pub mod job;
pub mod warehouse;

// Re-export commonly used types
pub use alerts::{AlertMessage, LagChecker, Notifier, RunReport, Severity};
pub use config::{ConfigError, Settings};
pub use job::run_job;
pub use warehouse::{Warehouse, WarehouseError};
