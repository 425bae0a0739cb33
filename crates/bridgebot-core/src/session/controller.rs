//! Session lifecycle controller.
//!
//! Each session gets one event-loop task. The loop drives the pairing
//! handshake, applies transport state changes (reclaiming on adverse ones),
//! and routes inbound messages to per-peer worker tasks. A worker drains
//! its bounded queue one message at a time, so dispatches for the same
//! (session, peer) never interleave while different peers run in parallel.
//!
//! Closing a session cancels its token; the event loop and workers stop,
//! and a dispatch already in flight finishes on its own.

use std::sync::Arc;
use std::time::Duration;

use bridgebot_types::config::SessionsConfig;
use bridgebot_types::error::{SessionError, TransportError};
use bridgebot_types::session::{PairingArtifact, SessionSummary, TransportState};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::transport::{BoxConnection, BoxTransport, TransportEvent};

use super::dispatch::{DispatchOutcome, Dispatcher};
use super::handle::{PeerQueue, Session};
use super::registry::SessionRegistry;

/// One queued inbound message for a peer worker.
pub(crate) struct PeerWork {
    text: String,
    done: Option<oneshot::Sender<DispatchOutcome>>,
}

#[cfg(test)]
impl PeerWork {
    pub(crate) fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            done: None,
        }
    }

    pub(crate) fn text(&self) -> &str {
        &self.text
    }
}

/// Channel capacities and worker timing used by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerSettings {
    /// Capacity of each session's transport event channel.
    pub event_buffer: usize,
    /// Capacity of each peer's pending-message queue.
    pub peer_queue: usize,
    /// How long a peer worker waits for work before retiring.
    pub peer_idle: Duration,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            event_buffer: 256,
            peer_queue: 32,
            peer_idle: Duration::from_secs(300),
        }
    }
}

impl From<&SessionsConfig> for ControllerSettings {
    fn from(config: &SessionsConfig) -> Self {
        Self {
            event_buffer: config.event_buffer.max(1),
            peer_queue: config.peer_queue.max(1),
            peer_idle: Duration::from_secs(config.peer_idle_secs.max(1)),
        }
    }
}

struct ControllerInner {
    registry: SessionRegistry,
    transport: BoxTransport,
    dispatcher: Dispatcher,
    settings: ControllerSettings,
}

/// Drives every session's state machine. Cheap to clone.
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<ControllerInner>,
}

impl SessionController {
    pub fn new(
        registry: SessionRegistry,
        transport: BoxTransport,
        dispatcher: Dispatcher,
        settings: ControllerSettings,
    ) -> Self {
        Self {
            inner: Arc::new(ControllerInner {
                registry,
                transport,
                dispatcher,
                settings,
            }),
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.inner.registry
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.inner.dispatcher
    }

    pub fn transport_name(&self) -> &str {
        self.inner.transport.name()
    }

    /// Register `id` and start pairing in the background.
    ///
    /// The session is visible in the registry before pairing begins.
    /// Idempotent: for an existing id the session is returned as-is and no
    /// second handshake is started.
    pub fn start_session(&self, id: &str) -> (Arc<Session>, bool) {
        let (session, created) = self.inner.registry.create(id);
        if created {
            let controller = self.clone();
            let task_session = session.clone();
            tokio::spawn(async move {
                controller.run_session(task_session).await;
            });
        }
        (session, created)
    }

    pub fn get_session(&self, id: &str) -> Result<Arc<Session>, SessionError> {
        self.inner.registry.get(id)
    }

    pub async fn list_sessions(&self) -> Vec<SessionSummary> {
        self.inner.registry.list_all().await
    }

    pub async fn pairing_artifact(&self, id: &str) -> Result<PairingArtifact, SessionError> {
        self.get_session(id)?.pairing_artifact().await
    }

    /// Send `text` to `peer` through session `id`.
    pub async fn deliver(&self, id: &str, peer: &str, text: &str) -> Result<(), SessionError> {
        self.get_session(id)?.deliver(peer, text).await
    }

    /// Close and remove session `id`.
    pub async fn close_session(&self, id: &str) -> Result<(), SessionError> {
        if self.inner.registry.remove(id).await {
            Ok(())
        } else {
            Err(SessionError::NotFound(id.to_string()))
        }
    }

    /// Close every session. Used on process shutdown.
    pub async fn shutdown(&self) {
        let ids = self.inner.registry.ids();
        info!(sessions = ids.len(), "closing all sessions");
        for id in ids {
            self.inner.registry.remove(&id).await;
        }
    }

    /// Queue a message from `peer` and wait until it has been handled.
    ///
    /// This is the same path transport messages take; the peer's ordering
    /// guarantee covers both. Dispatch failures are absorbed into the
    /// outcome, so only lookup and shutdown errors are returned, plus
    /// [`SessionError::QueueFull`] when the peer already has a full backlog.
    pub async fn on_inbound_message(
        &self,
        session_id: &str,
        peer: &str,
        text: &str,
    ) -> Result<DispatchOutcome, SessionError> {
        let session = self.get_session(session_id)?;
        if text.trim().is_empty() {
            trace!(session_id, peer, "discarding blank message");
            return Ok(DispatchOutcome::Discarded);
        }

        let (done, outcome) = oneshot::channel();
        self.enqueue(
            &session,
            peer,
            PeerWork {
                text: text.to_string(),
                done: Some(done),
            },
        )?;
        outcome
            .await
            .map_err(|_| SessionError::Closed(session_id.to_string()))
    }

    fn enqueue(&self, session: &Arc<Session>, peer: &str, work: PeerWork) -> Result<(), SessionError> {
        session.try_enqueue(peer, work, |generation| {
            self.spawn_peer_worker(session, peer, generation)
        })
    }

    fn spawn_peer_worker(&self, session: &Arc<Session>, peer: &str, generation: u64) -> PeerQueue {
        let (tx, mut rx) = mpsc::channel::<PeerWork>(self.inner.settings.peer_queue);
        let retire = CancellationToken::new();
        let retire_requested = retire.clone();
        let idle = self.inner.settings.peer_idle;
        let dispatcher = self.inner.dispatcher.clone();
        let session = session.clone();
        let peer = peer.to_string();

        tokio::spawn(async move {
            debug!(session_id = session.id(), peer = %peer, generation, "peer worker started");
            loop {
                tokio::select! {
                    biased;
                    _ = session.cancellation().cancelled() => break,
                    work = rx.recv() => {
                        let Some(work) = work else { break };
                        let outcome = dispatcher.dispatch(&session, &peer, &work.text).await;
                        if let Some(done) = work.done {
                            let _ = done.send(outcome);
                        }
                    }
                    _ = retire_requested.cancelled() => {
                        if session.retire_peer_queue(&peer, generation) {
                            break;
                        }
                    }
                    _ = tokio::time::sleep(idle) => {
                        if session.retire_peer_queue(&peer, generation) {
                            trace!(session_id = session.id(), peer = %peer, "peer worker idle");
                            break;
                        }
                    }
                }
            }
            session.forget_peer_queue(&peer, generation);
            debug!(session_id = session.id(), peer = %peer, generation, "peer worker stopped");
        });

        PeerQueue::new(generation, tx, retire)
    }

    /// Event loop for one session: pairing, then transport events until close.
    async fn run_session(self, session: Arc<Session>) {
        let (events_tx, mut events) = mpsc::channel(self.inner.settings.event_buffer);
        let cancel = session.cancellation().clone();

        info!(
            session_id = session.id(),
            transport = self.inner.transport.name(),
            "pairing started"
        );
        let mut open = self.inner.transport.open(session.id(), events_tx);
        let mut pairing = true;
        let mut events_open = true;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                result = &mut open, if pairing => {
                    pairing = false;
                    if !self.on_open(&session, result).await {
                        break;
                    }
                }
                event = events.recv(), if events_open => match event {
                    Some(event) => self.on_event(&session, event).await,
                    None => {
                        debug!(session_id = session.id(), "transport event stream ended");
                        events_open = false;
                        if !pairing {
                            break;
                        }
                    }
                },
            }
        }

        debug!(session_id = session.id(), "session event loop stopped");
    }

    /// Handle the end of the handshake. Returns whether to keep running.
    async fn on_open(&self, session: &Session, result: Result<BoxConnection, TransportError>) -> bool {
        match result {
            Ok(connection) => match session.mark_connected(Arc::new(connection)).await {
                Ok(()) => {
                    info!(session_id = session.id(), "session connected");
                    true
                }
                Err(connection) => {
                    debug!(session_id = session.id(), "session closed during pairing, dropping connection");
                    if let Err(e) = connection.close().await {
                        warn!(session_id = session.id(), error = %e, "error closing connection");
                    }
                    false
                }
            },
            Err(e) => {
                if session.mark_error(e.to_string()).await {
                    error!(session_id = session.id(), error = %e, "session setup failed");
                }
                false
            }
        }
    }

    async fn on_event(&self, session: &Arc<Session>, event: TransportEvent) {
        match event {
            TransportEvent::PairingArtifact(artifact) => {
                if session.record_pairing_artifact(artifact).await {
                    info!(session_id = session.id(), "pairing artifact ready");
                }
            }
            TransportEvent::StateChange(raw) => {
                let state = TransportState::parse(&raw);
                debug!(session_id = session.id(), transport_state = %state, "transport state changed");
                let Some(connection) = session.apply_transport_state(&state).await else {
                    return;
                };
                warn!(session_id = session.id(), transport_state = %state, "adverse transport state, reclaiming");
                match connection.reclaim().await {
                    Ok(()) => info!(session_id = session.id(), "reclaim requested"),
                    Err(e) => warn!(session_id = session.id(), error = %e, "reclaim failed"),
                }
            }
            TransportEvent::Message { peer, text } => {
                if text.trim().is_empty() {
                    trace!(session_id = session.id(), peer = %peer, "discarding blank message");
                    return;
                }
                let work = PeerWork { text, done: None };
                match self.enqueue(session, &peer, work) {
                    Ok(()) => {}
                    Err(SessionError::QueueFull { .. }) => {
                        warn!(session_id = session.id(), peer = %peer, "peer queue full, dropping message");
                    }
                    Err(e) => {
                        debug!(session_id = session.id(), peer = %peer, error = %e, "inbound message dropped");
                    }
                }
            }
        }
    }
}
