use std::time::Duration;

use db_store::{DbError, DbSettings, ManagedDb, Role, Store};

fn unreachable_settings() -> DbSettings {
    DbSettings {
        // Port 1 is never a PostgreSQL listener; the connect fails fast.
        primary_dsn: "postgres://postgres@127.0.0.1:1/postgres".into(),
        acquire_timeout_secs: 2,
        connect_timeout_secs: 2,
        ..DbSettings::default()
    }
}

#[tokio::test]
async fn connect_and_monitor_fails_fast_on_unreachable_dsn() {
    let settings = unreachable_settings();
    let result = tokio::time::timeout(
        Duration::from_secs(15),
        ManagedDb::connect_and_monitor(Role::Primary, &settings.primary_dsn, &settings),
    )
    .await
    .expect("initial connect must not hang");

    // Initial failure is returned to the caller; no monitor task exists to
    // retry it in the background.
    assert!(matches!(result, Err(DbError::Connect(_) | DbError::Verify(_))));
}

#[tokio::test]
async fn store_construction_fails_fast_on_unreachable_primary() {
    let result = tokio::time::timeout(
        Duration::from_secs(15),
        Store::connect(unreachable_settings()),
    )
    .await
    .expect("store construction must not hang");

    assert!(result.is_err());
}

#[tokio::test]
async fn store_construction_rejects_replica_without_dsn() {
    let settings = DbSettings {
        primary_dsn: "postgres://postgres@127.0.0.1:1/postgres".into(),
        enable_replica: true,
        ..DbSettings::default()
    };

    // Validation fails before any connection attempt.
    assert!(matches!(
        Store::connect(settings).await,
        Err(DbError::MissingReplicaDsn)
    ));
}
