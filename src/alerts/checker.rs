//! Replication lag checker

use super::message::{AlertMessage, LagMeasurement, Severity};
use super::notifier::Notifier;
use crate::config::{ConfigError, Settings};
use crate::warehouse::{RedshiftWarehouse, Warehouse, WarehouseError};

/// Outcome of one checker run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub tables_checked: usize,
    pub alerts_raised: usize,
    pub emails_sent: usize,
    pub emails_failed: usize,
    pub chat_sent: usize,
    pub chat_failed: usize,
    /// Set when a config or warehouse error stopped the run early
    pub aborted: bool,
}

/// Checks every monitored table once over a single warehouse connection
pub struct LagChecker<'a> {
    settings: &'a Settings,
    notifier: &'a dyn Notifier,
}

impl<'a> LagChecker<'a> {
    pub fn new(settings: &'a Settings, notifier: &'a dyn Notifier) -> Self {
        Self { settings, notifier }
    }

    /// Connect to the configured warehouse and check all tables
    pub async fn run(&self) -> RunReport {
        match RedshiftWarehouse::connect(&self.settings.warehouse).await {
            Ok(mut warehouse) => self.run_with(&mut warehouse).await,
            Err(e) => {
                tracing::error!(error = %e, "Fetching lag from warehouse failed");
                RunReport {
                    aborted: true,
                    ..RunReport::default()
                }
            }
        }
    }

    /// Check all tables over an open connection, then close it.
    ///
    /// The first config or warehouse error ends the run; tables after it are
    /// not checked. Notification failures never end the run.
    pub async fn run_with<W>(&self, warehouse: &mut W) -> RunReport
    where
        W: Warehouse + ?Sized,
    {
        let mut report = RunReport::default();

        if let Err(e) = self.check_tables(warehouse, &mut report).await {
            tracing::error!(error = %e, "Fetching lag from warehouse failed");
            report.aborted = true;
        }

        warehouse.close().await;
        report
    }

    async fn check_tables<W>(
        &self,
        warehouse: &mut W,
        report: &mut RunReport,
    ) -> Result<(), CheckError>
    where
        W: Warehouse + ?Sized,
    {
        let thresholds = self.settings.job.thresholds();

        for name in self.settings.monitor_names()? {
            let entry = self.settings.monitored_table(&name)?;
            let lag_minutes = warehouse
                .lag_minutes(&entry, self.settings.timestamp_column(&entry))
                .await?;
            report.tables_checked += 1;

            let measurement = LagMeasurement::new(&entry, lag_minutes);
            let alerts = measurement.alerts(&thresholds);

            if alerts.is_empty() {
                tracing::info!(
                    table = %entry.qualified_name(),
                    lag_minutes,
                    "Replication lag is within acceptable limits for {}",
                    entry.qualified_name()
                );
                continue;
            }

            tracing::warn!(
                table = %entry.qualified_name(),
                lag_minutes,
                alerts = alerts.len(),
                "Replication lag over threshold"
            );

            for alert in &alerts {
                self.dispatch(alert, report).await;
            }
        }

        Ok(())
    }

    /// Send one alert by email, then chat. Failures are logged per channel.
    async fn dispatch(&self, alert: &AlertMessage, report: &mut RunReport) {
        report.alerts_raised += 1;

        let recipient = match alert.severity {
            Severity::Standard => self.settings.email.recipient.as_str(),
            Severity::Critical => self.settings.email.critical_recipient(),
        };

        match self
            .notifier
            .send_email(&alert.subject, &alert.body, recipient)
            .await
        {
            Ok(()) => report.emails_sent += 1,
            Err(e) => {
                report.emails_failed += 1;
                tracing::error!(
                    severity = %alert.severity,
                    recipient = %recipient,
                    error = %e,
                    "Failed to send email alert"
                );
            }
        }

        match self.notifier.send_chat_alert(&alert.body).await {
            Ok(()) => report.chat_sent += 1,
            Err(e) => {
                report.chat_failed += 1;
                tracing::error!(
                    severity = %alert.severity,
                    error = %e,
                    "Failed to send chat alert"
                );
            }
        }
    }
}

/// Errors that abort a run
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Warehouse(#[from] WarehouseError),
}
