//! Lag measurements and the alert messages they produce

use serde::{Deserialize, Serialize};

use crate::config::MonitoredTable;

/// Lag above this many minutes raises a standard alert
pub const STANDARD_THRESHOLD_MINUTES: i64 = 15;

/// Lag above this many minutes additionally raises a critical alert
pub const CRITICAL_THRESHOLD_MINUTES: i64 = 240;

/// Rendered in place of a missing replication task
pub const NO_REPLICATION_TASK: &str = "none";

/// Alert cutoffs in minutes. Both comparisons are strict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds {
    pub standard_minutes: i64,
    pub critical_minutes: i64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            standard_minutes: STANDARD_THRESHOLD_MINUTES,
            critical_minutes: CRITICAL_THRESHOLD_MINUTES,
        }
    }
}

/// Alert tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Standard,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Standard => write!(f, "standard"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// Lag of one monitored table, as measured by a single query
#[derive(Debug, Clone, Copy)]
pub struct LagMeasurement<'a> {
    pub entry: &'a MonitoredTable,
    pub lag_minutes: i64,
}

impl<'a> LagMeasurement<'a> {
    pub fn new(entry: &'a MonitoredTable, lag_minutes: i64) -> Self {
        Self { entry, lag_minutes }
    }

    /// Alerts this measurement raises: none, a standard one, or a standard
    /// one followed by a critical one.
    pub fn alerts(&self, thresholds: &Thresholds) -> Vec<AlertMessage> {
        let mut alerts = Vec::new();
        if self.lag_minutes > thresholds.standard_minutes {
            alerts.push(AlertMessage::new(Severity::Standard, self));
            if self.lag_minutes > thresholds.critical_minutes {
                alerts.push(AlertMessage::new(Severity::Critical, self));
            }
        }
        alerts
    }
}

/// Alert ready for dispatch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertMessage {
    pub severity: Severity,
    pub subject: String,
    pub body: String,
}

impl AlertMessage {
    pub fn new(severity: Severity, measurement: &LagMeasurement<'_>) -> Self {
        let entry = measurement.entry;
        let qualified = entry.qualified_name();

        let subject = match severity {
            Severity::Standard => format!("Redshift Lag Alert: {}", qualified),
            Severity::Critical => format!("Critical Lag Alert: {}", qualified),
        };

        let body = format!(
            "Redshift has a lag of {} minutes for {}.\n\n\
             DETAILS:\n\
             Source Host: {}\n\
             Source Database: {}\n\
             Source Table: {}\n\
             Replication Task: {}",
            measurement.lag_minutes,
            qualified,
            entry.host,
            entry.database,
            entry.table,
            entry
                .replication_task
                .as_deref()
                .unwrap_or(NO_REPLICATION_TASK),
        );

        Self {
            severity,
            subject,
            body,
        }
    }
}
