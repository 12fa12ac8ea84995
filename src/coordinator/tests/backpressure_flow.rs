//! Backpressure tests: listening stops at the processing limit and
//! resumes below it

use super::helpers::{eventually, harness, harness_with};
use crate::backend::mock::MockCall;
use std::sync::Arc;

#[tokio::test]
async fn test_two_claims_stop_listening_and_one_ack_resumes() {
    let mut h = harness(2);
    h.open_and_listen().await;

    let first = h.backend.emit_message("one");
    let _second = h.backend.emit_message("two");
    let d1 = h.next_delivery().await;
    let _d2 = h.next_delivery().await;

    assert_eq!(h.backend.call_count(MockCall::StopListening), 1);
    assert!(!h.backend.is_listening());
    assert!(h.status().paused_by_limits);

    d1.ack().await;

    assert_eq!(first.remove_count(), 1);
    assert_eq!(h.status().messages_in_transit, 1);
    assert!(!h.status().paused_by_limits);
    assert_eq!(h.backend.call_count(MockCall::StartListening), 2);
    assert!(h.backend.is_listening());
}

#[tokio::test]
async fn test_claims_over_limit_are_requeued() {
    let mut h = harness(3);
    h.open_and_listen().await;

    let mut deliveries = Vec::new();
    for n in 0..3 {
        h.backend.emit_message(&format!("message-{}", n));
        deliveries.push(h.next_delivery().await);
    }
    assert!(!h.backend.is_listening());

    let extra = h.backend.emit_message("extra");
    eventually(|| extra.requeue_count() == 1).await;

    h.assert_no_event();
    assert_eq!(extra.heartbeat_count(), 0);
    assert_eq!(h.status().messages_in_transit, 3);

    deliveries.pop().expect("Should have a delivery").ack().await;

    // Resuming redelivers the requeued message
    let redelivered = h.next_delivery().await;
    assert_eq!(redelivered.message(), "extra");
    redelivered.ack().await;
    for delivery in deliveries {
        delivery.ack().await;
    }
    assert_eq!(h.status().messages_in_transit, 0);
}

#[tokio::test]
async fn test_user_pause_outlasts_limits_pause() {
    let mut h = harness(1);
    h.open_and_listen().await;

    h.backend.emit_message("only");
    let delivery = h.next_delivery().await;
    assert!(h.status().paused_by_limits);

    h.coordinator
        .pause_listening()
        .await
        .expect("Should pause");
    delivery.ack().await;

    let status = h.status();
    assert!(!status.paused_by_limits);
    assert!(status.paused_by_user);
    assert!(!h.backend.is_listening());
    assert_eq!(h.backend.call_count(MockCall::StartListening), 1);

    h.coordinator
        .resume_listening()
        .await
        .expect("Should resume");
    assert!(h.backend.is_listening());
    assert_eq!(h.backend.call_count(MockCall::StartListening), 2);
}

#[tokio::test]
async fn test_resume_does_not_override_limits_pause() {
    let mut h = harness(1);
    h.open_and_listen().await;

    h.backend.emit_message("only");
    let delivery = h.next_delivery().await;

    h.coordinator.pause_listening().await.expect("Should pause");
    h.coordinator
        .resume_listening()
        .await
        .expect("Should resume");

    assert!(h.status().paused_by_limits);
    assert!(!h.status().paused_by_user);
    assert!(!h.backend.is_listening());

    delivery.ack().await;
    assert!(h.backend.is_listening());
}

#[tokio::test(start_paused = true)]
async fn test_send_in_progress_counts_toward_limit() {
    let h = harness_with(1, "operationDelayMs = 50\nnoLoopback = true");
    h.open_and_listen().await;

    let sender = tokio::spawn({
        let coordinator = Arc::clone(&h.coordinator);
        async move { coordinator.send_message("payload", None).await }
    });
    eventually(|| h.status().messages_in_transit == 1).await;

    assert!(h.status().paused_by_limits);
    assert!(!h.backend.is_listening());
    let claimed = h.backend.emit_message("claimed during send");
    eventually(|| claimed.requeue_count() == 1).await;

    sender
        .await
        .expect("Send task should not panic")
        .expect("Should send");

    assert_eq!(h.status().messages_in_transit, 0);
    assert!(h.backend.is_listening());
    assert_eq!(
        h.backend.sent_messages(),
        vec![("payload".to_string(), None)]
    );
}
