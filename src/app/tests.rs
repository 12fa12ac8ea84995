//! Listener loop tests

use super::cli::Args;
use super::startup::run;
use crate::backend::BackendRegistry;
use crate::config::CoordinatorConfig;
use clap::Parser;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::timeout;

#[tokio::test]
async fn test_run_processes_seeded_messages_then_closes() {
    let config = CoordinatorConfig::new("mock", 1000, 4);
    let registry = BackendRegistry::with_builtin();
    let args = Args::try_parse_from(["ddq", "-s", "one", "-s", "two", "-n", "2"])
        .expect("Should parse");
    let (_tx, rx) = broadcast::channel(1);

    let processed = timeout(Duration::from_secs(5), run(&config, &registry, &args, rx))
        .await
        .expect("Listener should finish")
        .expect("Listener should succeed");

    assert_eq!(processed, 2);
}

#[tokio::test]
async fn test_run_stops_on_shutdown() {
    let config = CoordinatorConfig::new("mock", 1000, 4);
    let registry = BackendRegistry::with_builtin();
    let args = Args::try_parse_from(["ddq"]).expect("Should parse");
    let (tx, rx) = broadcast::channel(1);
    tx.send(()).expect("Should signal shutdown");

    let processed = timeout(Duration::from_secs(5), run(&config, &registry, &args, rx))
        .await
        .expect("Listener should finish")
        .expect("Listener should succeed");

    assert_eq!(processed, 0);
}

#[tokio::test]
async fn test_run_rejects_unknown_backend() {
    let config = CoordinatorConfig::new("mysql", 1000, 4);
    let registry = BackendRegistry::with_builtin();
    let args = Args::try_parse_from(["ddq"]).expect("Should parse");
    let (_tx, rx) = broadcast::channel(1);

    let result = run(&config, &registry, &args, rx).await;

    assert!(result.is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_shutdown_with_queued_deliveries_still_closes() {
    let config = CoordinatorConfig::new("mock", 1000, 4);
    let registry = BackendRegistry::with_builtin();
    let args = Args::try_parse_from(["ddq", "-s", "one", "-s", "two", "-s", "three"])
        .expect("Should parse");

    for _ in 0..20 {
        let (tx, rx) = broadcast::channel(1);
        tx.send(()).expect("Should signal shutdown");

        timeout(Duration::from_secs(2), run(&config, &registry, &args, rx))
            .await
            .expect("Listener should close with deliveries still queued")
            .expect("Listener should succeed");
    }
}
