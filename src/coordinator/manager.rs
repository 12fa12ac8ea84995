//! Queue Coordinator
//!
//! Owns the connection and listening lifecycles, admits claimed messages
//! from the backend, and keeps backend polling in line with the pause flags.
//!
//! Backend polling is never toggled directly. Every trigger runs
//! [`Coordinator::sync_polling`], which compares whether the backend should
//! be polling with what it was last told and issues at most one
//! `start_listening`/`stop_listening` call. Reconciliations are serialized
//! by an async mutex; the state mutex is never held across an await.

use super::envelope::{Completion, Delivery};
use super::error::{CoordinatorError, CoordinatorResult};
use super::event::{EventReceiver, EventSender};
use super::heartbeat::HeartbeatHandle;
use super::state::{ConnectionState, CoordinatorState, ListeningState};
use crate::backend::{
    Backend, BackendEvent, BackendEventReceiver, BackendEvents, BackendRegistry, WrappedMessage,
};
use crate::config::CoordinatorConfig;
use crate::core::sync::lock_named;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Point-in-time view of the coordinator state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorStatus {
    pub connection: ConnectionState,
    pub listening: ListeningState,
    pub paused_by_user: bool,
    pub paused_by_limits: bool,
    pub messages_in_transit: usize,
    pub max_processing_messages: usize,
    pub backend_polling: bool,
}

impl CoordinatorStatus {
    pub fn is_busy(&self) -> bool {
        self.connection.is_busy()
    }
}

pub struct Coordinator {
    backend: Arc<dyn Backend>,
    backend_name: String,
    heartbeat_delay: Duration,
    state: Mutex<CoordinatorState>,
    polling: tokio::sync::Mutex<()>,
    events: EventSender,
    backend_rx: Mutex<Option<BackendEventReceiver>>,
    relay: Mutex<Option<JoinHandle<()>>>,
    self_ref: Weak<Coordinator>,
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("backend", &self.backend_name)
            .field("heartbeat_delay", &self.heartbeat_delay)
            .finish()
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        let relay = match self.relay.get_mut() {
            Ok(relay) => relay.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(relay) = relay {
            relay.abort();
        }
    }
}

impl Coordinator {
    /// Validate the configuration and build the configured backend
    ///
    /// The returned receiver yields every admitted message and every error
    /// that no caller is waiting on.
    pub fn new(
        config: &CoordinatorConfig,
        registry: &BackendRegistry,
    ) -> CoordinatorResult<(Arc<Self>, EventReceiver)> {
        config.validate()?;

        let (backend_events, backend_rx) = BackendEvents::channel();
        let backend = registry.create(&config.backend, &config.backend_config, backend_events)?;
        let (events, receiver) = EventSender::channel();

        let coordinator = Arc::new_cyclic(|self_ref| Self {
            backend,
            backend_name: config.backend.clone(),
            heartbeat_delay: config.heartbeat_delay(),
            state: Mutex::new(CoordinatorState::new(config.max_processing_messages)),
            polling: tokio::sync::Mutex::new(()),
            events,
            backend_rx: Mutex::new(Some(backend_rx)),
            relay: Mutex::new(None),
            self_ref: self_ref.clone(),
        });

        log::debug!(
            "Coordinator created (backend: {}, heartbeat: {:?}, max processing: {})",
            config.backend,
            config.heartbeat_delay(),
            config.max_processing_messages
        );

        Ok((coordinator, receiver))
    }

    pub fn backend_name(&self) -> &str {
        &self.backend_name
    }

    pub fn status(&self) -> CoordinatorResult<CoordinatorStatus> {
        let state = self.state()?;
        Ok(CoordinatorStatus {
            connection: state.connection,
            listening: state.listening,
            paused_by_user: state.paused_by_user,
            paused_by_limits: state.backpressure.is_paused(),
            messages_in_transit: state.backpressure.in_transit(),
            max_processing_messages: state.backpressure.max_processing_messages(),
            backend_polling: state.backend_polling,
        })
    }

    /// Connect the backend
    pub async fn open(&self) -> CoordinatorResult<()> {
        {
            let mut state = self.state()?;
            if state.connection != ConnectionState::Closed {
                return Err(CoordinatorError::CouldNotOpen);
            }
            state.connection = ConnectionState::Opening;
        }
        log::trace!("Coordinator opening");

        if let Err(e) = self.ensure_relay() {
            self.state()?.connection = ConnectionState::Closed;
            return Err(e);
        }

        match self.backend.connect().await {
            Ok(()) => {
                self.state()?.connection = ConnectionState::Open;
                log::trace!("Coordinator open");
                Ok(())
            }
            Err(e) => {
                self.state()?.connection = ConnectionState::Closed;
                log::debug!("Backend connect failed: {}", e);
                Err(e.into())
            }
        }
    }

    /// Stop admitting messages, wait for in-flight work, then disconnect
    ///
    /// In-flight messages are never aborted; this resolves once the last of
    /// them (and any send in progress) has completed and the backend has
    /// been disconnected.
    pub async fn close(&self) -> CoordinatorResult<()> {
        let waiter = {
            let mut state = self.state()?;
            if state.connection != ConnectionState::Open {
                return Err(CoordinatorError::CouldNotClose);
            }
            state.connection = ConnectionState::Closing;
            if state.is_drained() {
                None
            } else {
                let (tx, rx) = oneshot::channel();
                state.close_waiter = Some(tx);
                Some(rx)
            }
        };
        log::trace!("Coordinator closing");

        self.sync_polling_or_emit().await;

        match waiter {
            None => self.finish_close().await,
            Some(rx) => {
                log::debug!("Close deferred until in-flight messages complete");
                rx.await.map_err(|_| CoordinatorError::CloseAbandoned)?
            }
        }
    }

    /// Close the connection for good, reporting a failure as an `Error`
    /// event instead of returning it
    pub async fn destroy(&self) {
        if let Err(e) = self.close().await {
            log::debug!("Destroy could not close: {}", e);
            self.emit_error(CoordinatorError::CouldNotCloseConnection {
                source: Box::new(e),
            });
        }
    }

    /// Begin admitting messages
    pub async fn listen_start(&self) -> CoordinatorResult<()> {
        {
            let mut state = self.state()?;
            if state.connection != ConnectionState::Open
                || state.listening != ListeningState::NotListening
            {
                return Err(CoordinatorError::CouldNotStartListening);
            }
            state.listening = ListeningState::Listening;
        }
        log::trace!("Coordinator listening");

        if let Err(e) = self.sync_polling().await {
            let mut state = self.state()?;
            if state.listening == ListeningState::Listening {
                state.listening = ListeningState::NotListening;
            }
            return Err(e);
        }
        Ok(())
    }

    /// Stop admitting messages; in-flight messages are unaffected
    pub async fn listen_stop(&self) -> CoordinatorResult<()> {
        {
            let mut state = self.state()?;
            if state.connection != ConnectionState::Open
                || state.listening != ListeningState::Listening
            {
                return Err(CoordinatorError::CouldNotStopListening);
            }
            state.listening = ListeningState::StoppingListening;
        }

        let result = self.sync_polling().await;

        let mut state = self.state()?;
        if state.listening == ListeningState::StoppingListening {
            state.listening = if result.is_ok() {
                ListeningState::NotListening
            } else {
                ListeningState::Listening
            };
        }
        log::trace!("Coordinator listening state: {:?}", state.listening);
        result
    }

    /// Pause consumption until `resume_listening`
    pub async fn pause_listening(&self) -> CoordinatorResult<()> {
        self.state()?.paused_by_user = true;
        log::debug!("Listening paused by user");
        self.sync_polling().await
    }

    /// Lift the user pause; a limits pause still holds until messages drain
    pub async fn resume_listening(&self) -> CoordinatorResult<()> {
        self.state()?.paused_by_user = false;
        log::debug!("Listening resumed by user");
        self.sync_polling().await
    }

    /// Store a new message through the backend
    ///
    /// A send occupies an in-flight slot until the backend returns, so it
    /// counts against the limit and a pending close waits for it.
    pub async fn send_message(&self, message: &str, topic: Option<&str>) -> CoordinatorResult<()> {
        {
            let mut state = self.state()?;
            if state.connection != ConnectionState::Open {
                return Err(CoordinatorError::CouldNotSendMessage);
            }
            state.backpressure.claim();
        }
        self.sync_polling_or_emit().await;

        let result = self
            .backend
            .send_message(message.to_string(), topic.map(str::to_string))
            .await;

        let waiter = {
            let mut state = self.state()?;
            state.backpressure.release();
            state.take_close_waiter_if_drained()
        };
        self.sync_polling_or_emit().await;
        if let Some(waiter) = waiter {
            self.run_deferred_close(waiter).await;
        }

        result.map_err(Into::into)
    }

    pub(crate) fn emit_error(&self, error: CoordinatorError) {
        self.events.error(error);
    }

    /// First completion of a claimed message
    pub(crate) async fn complete(&self, message: Arc<dyn WrappedMessage>, success: bool) {
        match self.state() {
            Ok(mut state) => {
                state.backpressure.release();
                state.settling += 1;
            }
            Err(e) => {
                self.emit_error(e);
                return;
            }
        }

        self.sync_polling_or_emit().await;

        let result = if success {
            message.remove().await
        } else {
            message.requeue().await
        };
        if let Err(e) = result {
            log::warn!("Could not settle message: {}", e);
            self.emit_error(e.into());
        }

        let waiter = match self.state() {
            Ok(mut state) => {
                state.settling = state.settling.saturating_sub(1);
                state.take_close_waiter_if_drained()
            }
            Err(e) => {
                self.emit_error(e);
                return;
            }
        };
        if let Some(waiter) = waiter {
            self.run_deferred_close(waiter).await;
        }
    }

    async fn run_deferred_close(&self, waiter: oneshot::Sender<CoordinatorResult<()>>) {
        log::debug!("In-flight messages drained, running deferred close");
        let result = self.finish_close().await;
        if let Err(Err(e)) = waiter.send(result) {
            self.emit_error(e);
        }
    }

    async fn finish_close(&self) -> CoordinatorResult<()> {
        self.sync_polling_or_emit().await;

        match self.backend.disconnect().await {
            Ok(()) => {
                self.state()?.reset_closed();
                log::trace!("Coordinator closed");
                Ok(())
            }
            Err(e) => {
                self.state()?.connection = ConnectionState::Open;
                log::debug!("Backend disconnect failed: {}", e);
                self.sync_polling_or_emit().await;
                Err(e.into())
            }
        }
    }

    /// Bring backend polling in line with the current state
    pub(crate) async fn sync_polling(&self) -> CoordinatorResult<()> {
        let _serialized = self.polling.lock().await;

        let (wanted, polling) = {
            let state = self.state()?;
            (state.is_accepting(), state.backend_polling)
        };
        if wanted == polling {
            return Ok(());
        }

        let result = if wanted {
            self.backend.start_listening().await
        } else {
            self.backend.stop_listening().await
        };
        result?;

        self.state()?.backend_polling = wanted;
        log::trace!("Backend polling: {}", wanted);
        Ok(())
    }

    async fn sync_polling_or_emit(&self) {
        if let Err(e) = self.sync_polling().await {
            log::warn!("Could not update backend listening: {}", e);
            self.emit_error(e);
        }
    }

    fn state(&self) -> CoordinatorResult<MutexGuard<'_, CoordinatorState>> {
        lock_named(&self.state, "coordinator state")
    }

    /// Start the backend event relay; runs once per coordinator
    fn ensure_relay(&self) -> CoordinatorResult<()> {
        let receiver = lock_named(&self.backend_rx, "backend receiver")?.take();

        if let Some(receiver) = receiver {
            let task = tokio::spawn(relay_backend_events(self.self_ref.clone(), receiver));
            *lock_named(&self.relay, "event relay")? = Some(task);
        }
        Ok(())
    }

    async fn handle_backend_event(&self, event: BackendEvent) {
        match event {
            BackendEvent::Data(message) => self.admit(message).await,
            BackendEvent::Error(e) => {
                log::debug!("Backend error relayed: {}", e);
                self.emit_error(CoordinatorError::Backend(e));
            }
        }
    }

    async fn admit(&self, message: Arc<dyn WrappedMessage>) {
        // The heartbeat runs before the message counts as in flight. Its
        // first beat is a full delay away, so a rejected message never sees it.
        let errors = self.events.clone();
        let heartbeat = HeartbeatHandle::start(Arc::clone(&message), self.heartbeat_delay, move |e| {
            errors.error(CoordinatorError::Heartbeat(e));
        });

        let admitted = match self.state() {
            Ok(mut state) => {
                if state.is_accepting() {
                    if state.backpressure.claim() {
                        log::debug!(
                            "Processing limit of {} reached",
                            state.backpressure.max_processing_messages()
                        );
                    }
                    true
                } else {
                    false
                }
            }
            Err(e) => {
                self.emit_error(e);
                false
            }
        };

        if !admitted {
            heartbeat.stop();
            log::debug!("Not accepting messages, requeueing");
            if let Err(e) = message.requeue().await {
                self.emit_error(e.into());
            }
            return;
        }

        let completion = Completion::new(message, heartbeat, self.self_ref.clone());

        self.sync_polling_or_emit().await;

        if let Err(delivery) = self.events.data(Delivery::new(completion)) {
            log::warn!("No receiver for delivered message, requeueing");
            delivery
                .done(Err("event receiver dropped"))
                .await;
        }
    }
}

async fn relay_backend_events(coordinator: Weak<Coordinator>, mut receiver: BackendEventReceiver) {
    while let Some(event) = receiver.recv().await {
        let Some(coordinator) = coordinator.upgrade() else {
            break;
        };
        coordinator.handle_backend_event(event).await;
    }
    log::trace!("Backend event relay stopped");
}
