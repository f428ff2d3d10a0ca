//! Resilient database access for services sharing one PostgreSQL cluster.
//!
//! Two pieces, the second built on the first:
//!
//! - [`ManagedDb`] / [`Store`]: pooled connections per database role
//!   (primary, optional replica) that are verified at startup and kept
//!   alive by a background monitor which reconnects on a fixed interval.
//! - [`with_transaction`]: runs a unit of work inside exactly one
//!   transaction per logical call chain. Nested invocations join the
//!   transaction already carried by the [`Context`] instead of opening
//!   their own.
//!
//! ```no_run
//! use db_store::{Context, DbSettings, Store, with_transaction};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Store::connect(DbSettings::from_env()?).await?;
//!
//! with_transaction(&Context::new(), &store.primary(), |ctx| async move {
//!     // statements issued through `current_transaction(&ctx)` here share
//!     // one transaction with every nested `with_transaction` call
//!     Ok::<_, sqlx::Error>(())
//! })
//! .await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod connection;
mod context;
mod error;
mod store;
mod transaction;

pub use config::DbSettings;
pub use connection::{ManagedDb, Role};
pub use context::Context;
pub use error::DbError;
pub use store::Store;
pub use transaction::{
    current_transaction, with_transaction, with_transaction_at, IsolationLevel, TxHandle,
};
