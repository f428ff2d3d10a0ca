use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use sqlx::{PgPool, Postgres, Transaction};
use tokio::sync::{Mutex, MutexGuard};
use tracing::warn;

use crate::context::Context;

/// Transaction isolation level requested by the outermost
/// [`with_transaction_at`] call. Nested calls join the running transaction
/// and cannot override it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IsolationLevel {
    ReadCommitted,
    #[default]
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    /// SQL applied as the first statement of a fresh transaction.
    fn set_statement(self) -> &'static str {
        match self {
            IsolationLevel::ReadCommitted => "SET TRANSACTION ISOLATION LEVEL READ COMMITTED",
            IsolationLevel::RepeatableRead => "SET TRANSACTION ISOLATION LEVEL REPEATABLE READ",
            IsolationLevel::Serializable => "SET TRANSACTION ISOLATION LEVEL SERIALIZABLE",
        }
    }
}

/// Opaque reference to the in-flight transaction of one call chain.
///
/// Cloneable so it can ride in a [`Context`]; every clone points at the same
/// underlying transaction. The transaction itself is not safe for concurrent
/// use, so access is serialized through an async mutex — the owning chain is
/// expected to use it strictly sequentially, never fanned out.
///
/// Statement layers reach the transaction like this:
///
/// ```no_run
/// # use db_store::{current_transaction, Context};
/// # async fn example(ctx: &Context) -> Result<(), sqlx::Error> {
/// if let Some(handle) = current_transaction(ctx) {
///     let mut guard = handle.lock().await;
///     if let Some(tx) = guard.as_mut() {
///         sqlx::query("UPDATE accounts SET balance = balance - $1")
///             .bind(10_i64)
///             .execute(&mut **tx)
///             .await?;
///     }
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct TxHandle {
    inner: Arc<Mutex<Option<Transaction<'static, Postgres>>>>,
}

impl TxHandle {
    fn new(tx: Transaction<'static, Postgres>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(tx))),
        }
    }

    /// Lock the underlying transaction for sequential statement execution.
    ///
    /// The slot is `None` once the coordinator has finished the chain and
    /// taken the transaction for commit or rollback.
    pub async fn lock(&self) -> MutexGuard<'_, Option<Transaction<'static, Postgres>>> {
        self.inner.lock().await
    }

    /// Returns `true` when both handles refer to the same transaction.
    pub fn same_transaction(&self, other: &TxHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    async fn take(&self) -> Option<Transaction<'static, Postgres>> {
        self.inner.lock().await.take()
    }
}

/// The transaction handle carried by `ctx`, if the current call chain is
/// inside a [`with_transaction`] boundary.
pub fn current_transaction(ctx: &Context) -> Option<TxHandle> {
    ctx.value::<TxHandle>().cloned()
}

/// Run `work` inside a transaction at the default isolation level
/// ([`IsolationLevel::RepeatableRead`]).
///
/// See [`with_transaction_at`] for the full semantics.
pub async fn with_transaction<T, E, F, Fut>(ctx: &Context, pool: &PgPool, work: F) -> Result<T, E>
where
    E: From<sqlx::Error>,
    F: FnOnce(Context) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    with_transaction_at(ctx, pool, IsolationLevel::default(), work).await
}

/// Run `work` inside exactly one transaction per logical call chain.
///
/// When `ctx` already carries a transaction, `work` joins it: no begin, no
/// commit, no rollback — the nearest enclosing call owns the boundary, and
/// its isolation level stays in effect. Otherwise a transaction is begun on
/// `pool` at `isolation`, attached to a derived context, and:
///
/// - `work` returns `Err(e)`: the transaction is rolled back and exactly `e`
///   is returned. A rollback failure is logged, never surfaced.
/// - `work` panics: the transaction is rolled back best-effort and the
///   original panic payload is re-raised unchanged.
/// - `work` returns `Ok(v)`: the transaction is committed. **A commit
///   failure is logged but not surfaced** — callers cannot distinguish a
///   clean commit from a failed one through the return value. Known risk,
///   kept for compatibility with existing callers.
pub async fn with_transaction_at<T, E, F, Fut>(
    ctx: &Context,
    pool: &PgPool,
    isolation: IsolationLevel,
    work: F,
) -> Result<T, E>
where
    E: From<sqlx::Error>,
    F: FnOnce(Context) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    // Joined case: pure pass-through, zero state transitions.
    if current_transaction(ctx).is_some() {
        return work(ctx.clone()).await;
    }

    let mut tx = pool.begin().await.map_err(E::from)?;

    // sqlx exposes no begin-time isolation option; setting it as the first
    // statement of the transaction is equivalent. A failure here counts as a
    // begin failure: work never ran, nothing to preserve.
    if let Err(e) = sqlx::query(isolation.set_statement()).execute(&mut *tx).await {
        rollback_logged(tx, "failed rollback on isolation setup").await;
        return Err(E::from(e));
    }

    let handle = TxHandle::new(tx);
    let derived = ctx.with_value(handle.clone());

    match AssertUnwindSafe(work(derived)).catch_unwind().await {
        Err(panic_payload) => {
            if let Some(tx) = handle.take().await {
                rollback_logged(tx, "failed rollback when panic").await;
            }
            std::panic::resume_unwind(panic_payload);
        }
        Ok(Err(err)) => {
            if let Some(tx) = handle.take().await {
                rollback_logged(tx, "failed rollback on error").await;
            }
            Err(err)
        }
        Ok(Ok(value)) => {
            if let Some(tx) = handle.take().await {
                if let Err(e) = tx.commit().await {
                    warn!(error = %e, "failed to commit transaction");
                }
            }
            Ok(value)
        }
    }
}

async fn rollback_logged(tx: Transaction<'static, Postgres>, msg: &str) {
    if let Err(e) = tx.rollback().await {
        warn!(error = %e, "{msg}");
    }
}
