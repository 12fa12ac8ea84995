//! Test Helper Functions

use crate::backend::mock::MockBackend;
use crate::backend::{Backend, BackendRegistry};
use crate::config::CoordinatorConfig;
use crate::coordinator::{
    Coordinator, CoordinatorError, CoordinatorEvent, CoordinatorStatus, Delivery, EventReceiver,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::timeout;

pub const HEARTBEAT_MS: u64 = 1000;

pub struct Harness {
    pub coordinator: Arc<Coordinator>,
    pub events: EventReceiver,
    pub backend: Arc<MockBackend>,
}

/// Coordinator over a mock backend the test can reach directly
pub fn harness_with(max_processing_messages: usize, backend_config: &str) -> Harness {
    let slot: Arc<Mutex<Option<Arc<MockBackend>>>> = Arc::default();
    let captured = Arc::clone(&slot);

    let mut registry = BackendRegistry::new();
    registry
        .register("mock", move |config, events| {
            let backend = Arc::new(MockBackend::from_config(config, events)?);
            *captured.lock().unwrap() = Some(Arc::clone(&backend));
            let backend: Arc<dyn Backend> = backend;
            Ok(backend)
        })
        .expect("Should register mock backend");

    let backend_config: toml::Table =
        toml::from_str(backend_config).expect("Should parse backend config");
    let config = CoordinatorConfig::new("mock", HEARTBEAT_MS, max_processing_messages)
        .with_backend_config(backend_config);

    let (coordinator, events) =
        Coordinator::new(&config, &registry).expect("Should create coordinator");
    let backend = slot
        .lock()
        .unwrap()
        .take()
        .expect("Factory should have built the backend");

    Harness {
        coordinator,
        events,
        backend,
    }
}

pub fn harness(max_processing_messages: usize) -> Harness {
    harness_with(max_processing_messages, "")
}

impl Harness {
    pub async fn open_and_listen(&self) {
        self.coordinator.open().await.expect("Should open");
        self.coordinator
            .listen_start()
            .await
            .expect("Should start listening");
    }

    pub fn status(&self) -> CoordinatorStatus {
        self.coordinator.status().expect("Should read status")
    }

    pub async fn next_event(&mut self) -> CoordinatorEvent {
        timeout(Duration::from_secs(5), self.events.recv())
            .await
            .expect("Should receive an event in time")
            .expect("Event channel should be open")
    }

    pub async fn next_delivery(&mut self) -> Delivery {
        match self.next_event().await {
            CoordinatorEvent::Data(delivery) => delivery,
            CoordinatorEvent::Error(e) => panic!("Expected a delivery, got error: {}", e),
        }
    }

    pub async fn next_error(&mut self) -> CoordinatorError {
        match self.next_event().await {
            CoordinatorEvent::Error(e) => e,
            CoordinatorEvent::Data(delivery) => {
                panic!("Expected an error, got delivery: {}", delivery.message())
            }
        }
    }

    pub fn assert_no_event(&mut self) {
        if let Ok(event) = self.events.try_recv() {
            panic!("Expected no event, got {:?}", event);
        }
    }
}

/// Wait until `condition` holds, yielding to the relay between checks
pub async fn eventually(condition: impl Fn() -> bool) {
    timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("Condition should become true");
}
