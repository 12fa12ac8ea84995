//! Common test utilities and helpers
//!
//! Builds a coordinator over the mock backend through the public registry
//! API and keeps a handle on the backend for inspection.

use ddq::backend::mock::MockBackend;
use ddq::backend::{Backend, BackendRegistry};
use ddq::config::CoordinatorConfig;
use ddq::coordinator::{Coordinator, CoordinatorEvent, Delivery, EventReceiver};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::timeout;

pub struct Queue {
    pub coordinator: Arc<Coordinator>,
    pub events: EventReceiver,
    pub backend: Arc<MockBackend>,
}

pub fn queue(config: &CoordinatorConfig) -> Queue {
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

    let (coordinator, events) =
        Coordinator::new(config, &registry).expect("Should create coordinator");
    let backend = slot
        .lock()
        .unwrap()
        .take()
        .expect("Factory should have built the backend");

    Queue {
        coordinator,
        events,
        backend,
    }
}

impl Queue {
    pub async fn open_and_listen(&self) {
        self.coordinator.open().await.expect("Should open");
        self.coordinator
            .listen_start()
            .await
            .expect("Should start listening");
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
}

pub async fn eventually(condition: impl Fn() -> bool) {
    timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("Condition should become true");
}
