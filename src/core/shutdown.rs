//! Signal handling for the listener binary
//!
//! The first SIGINT, SIGTERM or SIGHUP is broadcast to the running loop so
//! it can close the coordinator gracefully. A second one exits at once.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::broadcast;

/// Exit code used when a second signal interrupts a graceful close
const FORCED_EXIT_CODE: i32 = 130;

/// Run `run` with a receiver that fires on the first termination signal
pub async fn with_shutdown<F, Fut, T>(run: F) -> T
where
    F: FnOnce(broadcast::Receiver<()>) -> Fut,
    Fut: Future<Output = T>,
{
    let (tx, rx) = broadcast::channel(1);
    spawn_signal_listeners(tx);
    run(rx).await
}

/// Broadcast a received signal. Returns true when an earlier signal was
/// already seen.
fn signal_received(tx: &broadcast::Sender<()>, seen: &AtomicUsize) -> bool {
    let previous = seen.fetch_add(1, Ordering::AcqRel);
    if tx.send(()).is_err() {
        log::debug!("Shutdown signal received with no listener");
    }
    previous > 0
}

#[cfg(unix)]
fn spawn_signal_listeners(tx: broadcast::Sender<()>) {
    use std::sync::Arc;
    use tokio::signal::unix::{signal, SignalKind};

    // Writing to a closed pipe should end the process, not panic in println
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_DFL);
    }

    let seen = Arc::new(AtomicUsize::new(0));
    for kind in [
        SignalKind::interrupt(),
        SignalKind::terminate(),
        SignalKind::hangup(),
    ] {
        let tx = tx.clone();
        let seen = Arc::clone(&seen);
        tokio::spawn(async move {
            let mut stream = match signal(kind) {
                Ok(stream) => stream,
                Err(e) => {
                    log::warn!("Could not install signal handler: {}", e);
                    return;
                }
            };
            while stream.recv().await.is_some() {
                if signal_received(&tx, &seen) {
                    log::warn!("Second shutdown signal received; exiting without draining");
                    std::process::exit(FORCED_EXIT_CODE);
                }
                log::info!("Shutdown signal received");
            }
        });
    }
}

#[cfg(not(unix))]
fn spawn_signal_listeners(tx: broadcast::Sender<()>) {
    tokio::spawn(async move {
        let seen = AtomicUsize::new(0);
        while tokio::signal::ctrl_c().await.is_ok() {
            if signal_received(&tx, &seen) {
                std::process::exit(FORCED_EXIT_CODE);
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{timeout, Duration};

    #[tokio::test]
    async fn test_first_signal_is_broadcast() {
        let (tx, mut rx) = broadcast::channel(1);
        let seen = AtomicUsize::new(0);

        assert!(!signal_received(&tx, &seen));

        let received = timeout(Duration::from_millis(100), rx.recv()).await;
        assert!(received.is_ok(), "Should receive shutdown signal");
    }

    #[test]
    fn test_second_signal_is_reported() {
        let (tx, _rx) = broadcast::channel(4);
        let seen = AtomicUsize::new(0);

        assert!(!signal_received(&tx, &seen));
        assert!(signal_received(&tx, &seen));
    }

    #[test]
    fn test_signal_without_listener_is_counted() {
        let (tx, rx) = broadcast::channel::<()>(1);
        drop(rx);
        let seen = AtomicUsize::new(0);

        assert!(!signal_received(&tx, &seen));
        assert_eq!(seen.load(Ordering::Acquire), 1);
    }

    #[tokio::test]
    async fn test_with_shutdown_returns_result() {
        let result = with_shutdown(|mut shutdown| async move {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_millis(50)) => 42,
                _ = shutdown.recv() => -1,
            }
        })
        .await;

        assert_eq!(result, 42);
    }
}
