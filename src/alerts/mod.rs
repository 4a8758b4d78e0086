//! Replication lag alerting
//!
//! Measures lag per monitored table, turns measurements over the configured
//! thresholds into alert messages, and delivers them by email and chat.

pub mod checker;
pub mod message;
pub mod notifier;

pub use checker::{CheckError, LagChecker, RunReport};
pub use message::{AlertMessage, LagMeasurement, Severity, Thresholds};
pub use notifier::{AlertNotifier, Notifier, NotifierError};
