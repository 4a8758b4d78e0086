//! Redshift client speaking the PostgreSQL wire protocol

use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_postgres::{Client, SimpleQueryMessage};
use tokio_postgres_rustls::MakeRustlsConnect;

use crate::config::{MonitoredTable, SslMode, WarehouseConfig};

/// A warehouse connection able to measure replication lag
#[async_trait]
pub trait Warehouse: Send {
    /// Minutes between the newest row in `entry` and the current time
    async fn lag_minutes(
        &mut self,
        entry: &MonitoredTable,
        timestamp_column: &str,
    ) -> Result<i64, WarehouseError>;

    /// Release the connection. Called exactly once at the end of a run.
    async fn close(&mut self);
}

/// Lag query for one table.
///
/// Names are interpolated as written in the configuration file, which is
/// trusted input.
pub fn lag_query(entry: &MonitoredTable, timestamp_column: &str) -> String {
    format!(
        "SELECT DATEDIFF(minute, MAX({}), GETDATE()) FROM {}.{}",
        timestamp_column, entry.database, entry.table
    )
}

/// Connection to a Redshift cluster
pub struct RedshiftWarehouse {
    client: Option<Client>,
    connection: Option<JoinHandle<()>>,
}

impl RedshiftWarehouse {
    /// Open a connection using the `[warehouse]` settings
    pub async fn connect(config: &WarehouseConfig) -> Result<Self, WarehouseError> {
        let mut pg_config = tokio_postgres::Config::new();
        pg_config
            .host(&config.host)
            .port(config.port)
            .dbname(&config.dbname)
            .user(&config.user)
            .password(&config.password)
            .ssl_mode(pg_ssl_mode(config.sslmode));

        let (client, connection) = pg_config
            .connect(tls_connector()?)
            .await
            .map_err(|e| WarehouseError::Connect(e.to_string()))?;

        let connection = tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(error = %e, "Warehouse connection error");
            }
        });

        tracing::debug!(host = %config.host, port = config.port, "Connected to warehouse");

        Ok(Self {
            client: Some(client),
            connection: Some(connection),
        })
    }
}

#[async_trait]
impl Warehouse for RedshiftWarehouse {
    async fn lag_minutes(
        &mut self,
        entry: &MonitoredTable,
        timestamp_column: &str,
    ) -> Result<i64, WarehouseError> {
        let client = self.client.as_ref().ok_or(WarehouseError::Closed)?;
        let sql = lag_query(entry, timestamp_column);
        tracing::debug!(sql = %sql, "Running lag query");

        let messages = client.simple_query(&sql).await.map_err(|e| WarehouseError::Query {
            table: entry.qualified_name(),
            message: e.to_string(),
        })?;

        let row = messages
            .iter()
            .find_map(|message| match message {
                SimpleQueryMessage::Row(row) => Some(row),
                _ => None,
            })
            .ok_or_else(|| WarehouseError::MalformedResult {
                table: entry.qualified_name(),
                message: "query returned no rows".to_string(),
            })?;

        let value = row.try_get(0).map_err(|e| WarehouseError::MalformedResult {
            table: entry.qualified_name(),
            message: e.to_string(),
        })?;

        parse_lag(entry, value)
    }

    async fn close(&mut self) {
        // Dropping the client ends the connection task
        drop(self.client.take());
        if let Some(connection) = self.connection.take() {
            if let Err(e) = connection.await {
                tracing::warn!(error = %e, "Warehouse connection task failed");
            }
        }
        tracing::debug!("Warehouse connection closed");
    }
}

fn pg_ssl_mode(mode: SslMode) -> tokio_postgres::config::SslMode {
    match mode {
        SslMode::Disable => tokio_postgres::config::SslMode::Disable,
        SslMode::Prefer => tokio_postgres::config::SslMode::Prefer,
        SslMode::Require => tokio_postgres::config::SslMode::Require,
    }
}

/// Rustls connector trusting the webpki root set
fn tls_connector() -> Result<MakeRustlsConnect, WarehouseError> {
    let mut roots = rustls::RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let config = rustls::ClientConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()
    .map_err(|e| WarehouseError::Tls(e.to_string()))?
    .with_root_certificates(roots)
    .with_no_client_auth();

    Ok(MakeRustlsConnect::new(config))
}

/// Interpret the text value of the lag column
fn parse_lag(entry: &MonitoredTable, value: Option<&str>) -> Result<i64, WarehouseError> {
    let value = value.ok_or_else(|| WarehouseError::NullLag {
        table: entry.qualified_name(),
    })?;

    value
        .trim()
        .parse::<i64>()
        .map_err(|e| WarehouseError::MalformedResult {
            table: entry.qualified_name(),
            message: format!("{:?} is not an integer: {}", value, e),
        })
}

/// Warehouse errors
#[derive(Debug, thiserror::Error)]
pub enum WarehouseError {
    #[error("Connection error: {0}")]
    Connect(String),

    #[error("TLS setup error: {0}")]
    Tls(String),

    #[error("Query on {table} failed: {message}")]
    Query { table: String, message: String },

    #[error("Lag for {table} is NULL (table has no rows?)")]
    NullLag { table: String },

    #[error("Malformed lag result for {table}: {message}")]
    MalformedResult { table: String, message: String },

    #[error("Connection already closed")]
    Closed,
}
