//! In-memory mock backend
//!
//! Behaves like a tiny queue: sent messages are delivered back as claimed
//! messages while the backend is listening, and requeued messages wait for
//! the next delivery round. Every call is counted and each operation can be
//! made to fail, either from `backendConfig` or at runtime.
//!
//! Recognised `backendConfig` keys (all optional): the booleans
//! `connectFail`, `closeFail`, `sendFail`, `startListeningFail`,
//! `stopListeningFail` and `noLoopback`, and the integer `operationDelayMs`
//! which slows down connect, disconnect and send. Unknown keys are ignored.

use crate::backend::error::{BackendError, BackendResult};
use crate::backend::events::BackendEvents;
use crate::backend::traits::{Backend, WrappedMessage};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

/// Failure switches and delivery behaviour of the mock backend
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MockSettings {
    pub connect_fail: bool,
    pub close_fail: bool,
    pub send_fail: bool,
    pub start_listening_fail: bool,
    pub stop_listening_fail: bool,
    /// Record sent messages without delivering them back
    pub no_loopback: bool,
    /// Latency of connect, disconnect and send
    pub operation_delay_ms: u64,
}

/// Backend operations counted by the mock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockCall {
    Connect,
    Disconnect,
    StartListening,
    StopListening,
    SendMessage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingMessage {
    payload: String,
    topic: Option<String>,
}

type PendingQueue = Mutex<VecDeque<PendingMessage>>;

// The mock has no invariant a panicking test could break halfway
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct MockBackend {
    events: BackendEvents,
    settings: Mutex<MockSettings>,
    calls: Mutex<HashMap<MockCall, usize>>,
    connected: AtomicBool,
    listening: AtomicBool,
    pending: Arc<PendingQueue>,
    sent: Mutex<Vec<(String, Option<String>)>>,
    delivered: Mutex<Vec<Arc<MockMessage>>>,
    next_id: AtomicU64,
}

impl std::fmt::Debug for MockBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockBackend")
            .field("settings", &*lock(&self.settings))
            .field("connected", &self.is_connected())
            .field("listening", &self.is_listening())
            .field("pending", &self.pending_count())
            .finish()
    }
}

impl MockBackend {
    pub fn new(settings: MockSettings, events: BackendEvents) -> Self {
        Self {
            events,
            settings: Mutex::new(settings),
            calls: Mutex::new(HashMap::new()),
            connected: AtomicBool::new(false),
            listening: AtomicBool::new(false),
            pending: Arc::new(Mutex::new(VecDeque::new())),
            sent: Mutex::new(Vec::new()),
            delivered: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Build from the opaque `backendConfig` table
    pub fn from_config(config: &toml::Table, events: BackendEvents) -> BackendResult<Self> {
        let settings: MockSettings = toml::Value::Table(config.clone())
            .try_into()
            .map_err(|e| BackendError::Configuration {
                message: e.to_string(),
            })?;
        Ok(Self::new(settings, events))
    }

    /// Change failure switches at runtime
    pub fn update_settings(&self, update: impl FnOnce(&mut MockSettings)) {
        update(&mut lock(&self.settings));
    }

    pub fn call_count(&self, call: MockCall) -> usize {
        lock(&self.calls).get(&call).copied().unwrap_or(0)
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Acquire)
    }

    /// Messages waiting for delivery (sent or requeued, not yet claimed)
    pub fn pending_count(&self) -> usize {
        lock(&self.pending).len()
    }

    /// Every `(message, topic)` accepted by `send_message`
    pub fn sent_messages(&self) -> Vec<(String, Option<String>)> {
        lock(&self.sent).clone()
    }

    /// Every message emitted as claimed, in emission order
    pub fn delivered(&self) -> Vec<Arc<MockMessage>> {
        lock(&self.delivered).clone()
    }

    /// Claim and emit a message directly, regardless of listening state
    pub fn emit_message(&self, payload: &str) -> Arc<MockMessage> {
        self.deliver(PendingMessage {
            payload: payload.to_string(),
            topic: None,
        })
    }

    /// Emit a backend-side failure
    pub fn emit_error(&self, error: BackendError) {
        if !self.events.error(error) {
            log::debug!("Mock backend error dropped: no receiver");
        }
    }

    fn record(&self, call: MockCall) {
        *lock(&self.calls).entry(call).or_insert(0) += 1;
    }

    fn settings(&self) -> MockSettings {
        lock(&self.settings).clone()
    }

    fn deliver(&self, pending: PendingMessage) -> Arc<MockMessage> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let message = Arc::new(MockMessage {
            id,
            payload: pending.payload,
            topic: pending.topic,
            requeue_target: Arc::downgrade(&self.pending),
            heartbeat_fail: AtomicBool::new(false),
            remove_fail: AtomicBool::new(false),
            requeue_fail: AtomicBool::new(false),
            heartbeats: AtomicUsize::new(0),
            removes: AtomicUsize::new(0),
            requeues: AtomicUsize::new(0),
        });

        lock(&self.delivered).push(Arc::clone(&message));
        if !self.events.data(message.clone()) {
            log::debug!("Mock message {} dropped: no receiver", id);
        }
        message
    }

    // Requeued messages are only redelivered by the next send or start,
    // never from inside requeue itself.
    fn flush(&self) {
        while self.is_listening() {
            let next = lock(&self.pending).pop_front();
            match next {
                Some(pending) => {
                    self.deliver(pending);
                }
                None => break,
            }
        }
    }

    async fn simulate_latency(&self) {
        let delay = self.settings().operation_delay_ms;
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
    }

    fn ensure_connected(&self) -> BackendResult<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(BackendError::NotConnected)
        }
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn connect(&self) -> BackendResult<()> {
        self.record(MockCall::Connect);
        self.simulate_latency().await;
        if self.settings().connect_fail {
            return Err(BackendError::Connection {
                message: "Could not connect to mock backend".to_string(),
            });
        }
        self.connected.store(true, Ordering::Release);
        Ok(())
    }

    async fn disconnect(&self) -> BackendResult<()> {
        self.record(MockCall::Disconnect);
        self.simulate_latency().await;
        if self.settings().close_fail {
            return Err(BackendError::operation("disconnect", "close failure requested"));
        }
        self.listening.store(false, Ordering::Release);
        self.connected.store(false, Ordering::Release);
        Ok(())
    }

    async fn start_listening(&self) -> BackendResult<()> {
        self.record(MockCall::StartListening);
        if self.settings().start_listening_fail {
            return Err(BackendError::operation(
                "start_listening",
                "start failure requested",
            ));
        }
        self.ensure_connected()?;
        self.listening.store(true, Ordering::Release);
        self.flush();
        Ok(())
    }

    async fn stop_listening(&self) -> BackendResult<()> {
        self.record(MockCall::StopListening);
        if self.settings().stop_listening_fail {
            return Err(BackendError::operation(
                "stop_listening",
                "stop failure requested",
            ));
        }
        self.listening.store(false, Ordering::Release);
        Ok(())
    }

    async fn send_message(&self, message: String, topic: Option<String>) -> BackendResult<()> {
        self.record(MockCall::SendMessage);
        self.simulate_latency().await;
        let settings = self.settings();
        if settings.send_fail {
            return Err(BackendError::operation("send_message", "send failure requested"));
        }
        self.ensure_connected()?;

        lock(&self.sent).push((message.clone(), topic.clone()));
        if !settings.no_loopback {
            lock(&self.pending).push_back(PendingMessage {
                payload: message,
                topic,
            });
            self.flush();
        }
        Ok(())
    }
}

/// Wrapped message produced by `MockBackend`
#[derive(Debug)]
pub struct MockMessage {
    id: u64,
    payload: String,
    topic: Option<String>,
    requeue_target: Weak<PendingQueue>,
    heartbeat_fail: AtomicBool,
    remove_fail: AtomicBool,
    requeue_fail: AtomicBool,
    heartbeats: AtomicUsize,
    removes: AtomicUsize,
    requeues: AtomicUsize,
}

impl MockMessage {
    /// A message not attached to any backend; requeue only counts
    pub fn detached(payload: &str) -> Arc<Self> {
        Arc::new(Self {
            id: 0,
            payload: payload.to_string(),
            topic: None,
            requeue_target: Weak::new(),
            heartbeat_fail: AtomicBool::new(false),
            remove_fail: AtomicBool::new(false),
            requeue_fail: AtomicBool::new(false),
            heartbeats: AtomicUsize::new(0),
            removes: AtomicUsize::new(0),
            requeues: AtomicUsize::new(0),
        })
    }

    /// Emission order within its backend; detached messages use 0
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn heartbeat_count(&self) -> usize {
        self.heartbeats.load(Ordering::SeqCst)
    }

    pub fn remove_count(&self) -> usize {
        self.removes.load(Ordering::SeqCst)
    }

    pub fn requeue_count(&self) -> usize {
        self.requeues.load(Ordering::SeqCst)
    }

    pub fn set_heartbeat_fail(&self, fail: bool) {
        self.heartbeat_fail.store(fail, Ordering::SeqCst);
    }

    pub fn set_remove_fail(&self, fail: bool) {
        self.remove_fail.store(fail, Ordering::SeqCst);
    }

    pub fn set_requeue_fail(&self, fail: bool) {
        self.requeue_fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl WrappedMessage for MockMessage {
    fn message(&self) -> &str {
        &self.payload
    }

    fn topic(&self) -> Option<&str> {
        self.topic.as_deref()
    }

    async fn heartbeat(&self) -> BackendResult<()> {
        self.heartbeats.fetch_add(1, Ordering::SeqCst);
        if self.heartbeat_fail.load(Ordering::SeqCst) {
            return Err(BackendError::operation("heartbeat", "Could not do heartbeat."));
        }
        Ok(())
    }

    async fn remove(&self) -> BackendResult<()> {
        self.removes.fetch_add(1, Ordering::SeqCst);
        if self.remove_fail.load(Ordering::SeqCst) {
            return Err(BackendError::operation("remove", "remove failure requested"));
        }
        Ok(())
    }

    async fn requeue(&self) -> BackendResult<()> {
        self.requeues.fetch_add(1, Ordering::SeqCst);
        if self.requeue_fail.load(Ordering::SeqCst) {
            return Err(BackendError::operation("requeue", "requeue failure requested"));
        }
        if let Some(pending) = self.requeue_target.upgrade() {
            lock(&pending).push_back(PendingMessage {
                payload: self.payload.clone(),
                topic: self.topic.clone(),
            });
        }
        Ok(())
    }
}
