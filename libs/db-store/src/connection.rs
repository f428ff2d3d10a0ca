use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use sqlx::postgres::{PgPool, PgPoolOptions};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::DbSettings;
use crate::error::DbError;

/// Database role a managed connection serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Primary,
    Replica,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Primary => "primary",
            Role::Replica => "replica",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One pooled connection for one database role, kept alive by a background
/// monitor.
///
/// The monitor probes the installed pool on a fixed interval. When a probe
/// fails it opens a fresh pool and swaps it in; when the reconnect fails too,
/// it logs and leaves the old handle in place until a later tick succeeds.
/// There is no backoff and no retry cap.
///
/// The installed handle is read concurrently by statement layers while the
/// monitor may replace it, so the exchange happens behind a lock. Callers
/// obtain the handle through [`ManagedDb::handle`] per use rather than
/// caching it.
///
/// Dropping the `ManagedDb` (or calling [`ManagedDb::stop`]) makes the
/// monitor exit at its next scheduling point and release its timer.
pub struct ManagedDb {
    role: Role,
    pool: Arc<RwLock<PgPool>>,
    shutdown: watch::Sender<()>,
    monitor: Mutex<Option<JoinHandle<()>>>,
}

impl ManagedDb {
    /// Connect once and start the background monitor.
    ///
    /// The initial connect is a hard precondition: on failure the error is
    /// returned and no monitor task is spawned. Failures on later monitor
    /// ticks are logged and retried indefinitely instead.
    pub async fn connect_and_monitor(
        role: Role,
        dsn: &str,
        settings: &DbSettings,
    ) -> Result<Self, DbError> {
        let pool = open_pool(role, dsn, settings).await?;
        let pool = Arc::new(RwLock::new(pool));

        let (shutdown, shutdown_rx) = watch::channel(());
        let handle = tokio::spawn(monitor(
            role,
            dsn.to_owned(),
            settings.clone(),
            Arc::clone(&pool),
            shutdown_rx,
        ));

        Ok(Self {
            role,
            pool,
            shutdown,
            monitor: Mutex::new(Some(handle)),
        })
    }

    /// The currently-installed pool handle.
    ///
    /// Cheap to clone; clones keep pointing at the same pool even after the
    /// monitor swaps in a replacement, so re-fetch per use.
    pub fn handle(&self) -> PgPool {
        self.pool.read().clone()
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Signal the monitor to stop and wait for it to exit.
    pub async fn stop(&self) {
        let _ = self.shutdown.send(());
        let handle = self.monitor.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    /// Stop the monitor and close the installed pool.
    pub async fn close(&self) {
        self.stop().await;
        let pool = self.handle();
        pool.close().await;
    }
}

/// Open a pool with the configured limits and verify it with a liveness
/// probe under the connect timeout.
async fn open_pool(role: Role, dsn: &str, settings: &DbSettings) -> Result<PgPool, DbError> {
    debug!(role = %role, "opening database pool");

    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(settings.idle_timeout_secs))
        .max_lifetime(Duration::from_secs(settings.max_lifetime_secs))
        .test_before_acquire(true)
        .connect(dsn)
        .await
        .map_err(DbError::Connect)?;

    match tokio::time::timeout(
        Duration::from_secs(settings.connect_timeout_secs),
        sqlx::query("SELECT 1").execute(&pool),
    )
    .await
    {
        Ok(Ok(_)) => {
            info!(role = %role, "database pool connected and verified");
            Ok(pool)
        }
        Ok(Err(e)) => {
            warn!(role = %role, error = %e, "database liveness probe failed");
            Err(DbError::Verify(e))
        }
        Err(_) => {
            warn!(
                role = %role,
                timeout_secs = settings.connect_timeout_secs,
                "database liveness probe timed out"
            );
            Err(DbError::Verify(sqlx::Error::Io(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "database liveness probe timed out",
            ))))
        }
    }
}

async fn monitor(
    role: Role,
    dsn: String,
    settings: DbSettings,
    pool: Arc<RwLock<PgPool>>,
    mut shutdown: watch::Receiver<()>,
) {
    let period = settings.retry_interval();
    // First tick one full period after spawn; the pool was verified just
    // before the monitor started.
    let mut timer = interval_at(Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

    debug!(role = %role, period_secs = period.as_secs(), "database monitor started");

    loop {
        tokio::select! {
            // Also fires when the ManagedDb is dropped and the sender goes away.
            _ = shutdown.changed() => {
                info!(role = %role, "database monitor stopped");
                break;
            }
            _ = timer.tick() => {
                if let Err(e) = check_and_reconnect(role, &dsn, &settings, &pool).await {
                    warn!(role = %role, error = %e, "database reconnect failed");
                }
            }
        }
    }
}

/// Probe the installed pool; on failure, open a fresh one and swap it in.
async fn check_and_reconnect(
    role: Role,
    dsn: &str,
    settings: &DbSettings,
    pool: &Arc<RwLock<PgPool>>,
) -> Result<(), DbError> {
    let current = pool.read().clone();
    match sqlx::query("SELECT 1").execute(&current).await {
        Ok(_) => Ok(()),
        Err(probe_err) => {
            warn!(role = %role, error = %probe_err, "liveness probe failed, reconnecting");
            let fresh = open_pool(role, dsn, settings).await?;
            let old = std::mem::replace(&mut *pool.write(), fresh);
            old.close().await;
            info!(role = %role, "database pool replaced after reconnect");
            Ok(())
        }
    }
}
