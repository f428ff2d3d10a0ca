use thiserror::Error;

/// Errors surfaced by connection and store construction.
///
/// Only startup-time failures cross this boundary. Reconnect and probe
/// failures inside the background monitor are logged and retried on the
/// next tick; rollback and commit failures inside the transaction
/// coordinator are logged and absorbed.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("failed to open database connection: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("database liveness probe failed: {0}")]
    Verify(#[source] sqlx::Error),

    #[error("replica support is enabled but no replica DSN is configured")]
    MissingReplicaDsn,

    #[error("primary DSN is empty")]
    MissingPrimaryDsn,
}
