use sqlx::PgPool;
use tracing::info;

use crate::config::DbSettings;
use crate::connection::{ManagedDb, Role};
use crate::error::DbError;

/// Registry of managed connections, one per database role.
///
/// Constructed once at startup and passed by reference to consumers; there
/// is no ambient global handle. Construction fails fast when any configured
/// role cannot be connected — whether that aborts the process is the
/// embedding application's policy.
pub struct Store {
    primary: ManagedDb,
    replica: Option<ManagedDb>,
}

impl Store {
    /// Connect every configured role and start its monitor.
    ///
    /// When `enable_replica` is set, a reachable replica is part of the
    /// readiness contract: its initial connect failure fails the whole
    /// construction.
    pub async fn connect(settings: DbSettings) -> Result<Self, DbError> {
        settings.validate()?;
        settings.log_settings();

        let primary =
            ManagedDb::connect_and_monitor(Role::Primary, &settings.primary_dsn, &settings).await?;

        let replica = if settings.enable_replica {
            // validate() guarantees the DSN is present here.
            let dsn = settings.replica_dsn.as_deref().ok_or(DbError::MissingReplicaDsn)?;
            Some(ManagedDb::connect_and_monitor(Role::Replica, dsn, &settings).await?)
        } else {
            None
        };

        info!(replica = replica.is_some(), "database store ready");
        Ok(Self { primary, replica })
    }

    /// Pool handle of the read-write primary.
    pub fn primary(&self) -> PgPool {
        self.primary.handle()
    }

    /// Pool handle for reads. Falls back to the primary when no replica is
    /// configured, so callers always get a usable handle.
    pub fn replica(&self) -> PgPool {
        match &self.replica {
            Some(replica) => replica.handle(),
            None => self.primary.handle(),
        }
    }

    pub fn has_replica(&self) -> bool {
        self.replica.is_some()
    }

    /// Stop all monitors and close all pools.
    pub async fn close(&self) {
        self.primary.close().await;
        if let Some(replica) = &self.replica {
            replica.close().await;
        }
    }
}
