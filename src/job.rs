//! One monitoring run, bracketed by start and end timestamps

use std::path::Path;

use crate::alerts::{AlertNotifier, LagChecker, RunReport};
use crate::config::Settings;

const TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

fn now() -> String {
    chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Load settings from `config_path` and check every monitored table once.
///
/// Errors are logged, never returned: the process exits cleanly whatever
/// happened during the run. Returns `None` when the settings could not be
/// loaded.
pub async fn run_job(config_path: impl AsRef<Path>) -> Option<RunReport> {
    let config_path = config_path.as_ref();
    tracing::info!(started_at = %now(), "Starting job");

    let report = match Settings::load(config_path) {
        Ok(settings) => {
            let notifier = AlertNotifier::from_settings(&settings);
            let report = LagChecker::new(&settings, &notifier).run().await;
            tracing::info!(
                tables_checked = report.tables_checked,
                alerts_raised = report.alerts_raised,
                emails_sent = report.emails_sent,
                emails_failed = report.emails_failed,
                chat_sent = report.chat_sent,
                chat_failed = report.chat_failed,
                aborted = report.aborted,
                "Lag check complete"
            );
            Some(report)
        }
        Err(e) => {
            tracing::error!(
                path = %config_path.display(),
                error = %e,
                "Failed to load configuration"
            );
            None
        }
    };

    tracing::info!(finished_at = %now(), "Job finished");
    report
}
