//! A single transport session and its state machine.
//!
//! ```text
//! initializing -> qr_ready -> connected <-> conflict | unpaired | unlaunched
//!       |            |
//!       +------------+--> error
//! any -> closed
//! ```
//!
//! The connection handle is present exactly while the status holds a
//! connection (`connected` or one of the adverse states). Status guards are
//! never held across transport calls; the handle is cloned out first.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bridgebot_types::chat::ChatMessage;
use bridgebot_types::error::SessionError;
use bridgebot_types::session::{PairingArtifact, SessionStatus, SessionSummary, TransportState};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::RwLock;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::chat::buffer::{ConversationBuffer, HistoryLimits};
use crate::transport::BoxConnection;

use super::controller::PeerWork;

/// Sending side of one peer worker's queue.
///
/// The map entry owns the only sender, so removing the entry ends the
/// worker once its queue is drained.
pub(crate) struct PeerQueue {
    generation: u64,
    sender: mpsc::Sender<PeerWork>,
    retire: CancellationToken,
}

impl PeerQueue {
    pub(crate) fn new(generation: u64, sender: mpsc::Sender<PeerWork>, retire: CancellationToken) -> Self {
        Self {
            generation,
            sender,
            retire,
        }
    }

    fn is_drained(&self) -> bool {
        self.sender.capacity() == self.sender.max_capacity()
    }
}

struct SessionState {
    status: SessionStatus,
    pairing_artifact: Option<PairingArtifact>,
    connection: Option<Arc<BoxConnection>>,
    last_error: Option<String>,
    transport_state: Option<String>,
}

/// One transport connection plus its pairing and conversation state.
pub struct Session {
    id: String,
    created_at: DateTime<Utc>,
    limits: HistoryLimits,
    state: RwLock<SessionState>,
    conversations: DashMap<String, ConversationBuffer>,
    peer_queues: DashMap<String, PeerQueue>,
    next_worker: AtomicU64,
    cancellation: CancellationToken,
}

impl Session {
    /// Create a session in `initializing`.
    pub fn new(id: impl Into<String>, limits: HistoryLimits) -> Self {
        Self {
            id: id.into(),
            created_at: Utc::now(),
            limits,
            state: RwLock::new(SessionState {
                status: SessionStatus::Initializing,
                pairing_artifact: None,
                connection: None,
                last_error: None,
                transport_state: None,
            }),
            conversations: DashMap::new(),
            peer_queues: DashMap::new(),
            next_worker: AtomicU64::new(0),
            cancellation: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Cancelled when the session closes.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn is_closed(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Current status and the diagnostic recorded on entering `error`.
    pub async fn status(&self) -> (SessionStatus, Option<String>) {
        let state = self.state.read().await;
        (state.status, state.last_error.clone())
    }

    /// The pairing artifact, available only while in `qr_ready`.
    pub async fn pairing_artifact(&self) -> Result<PairingArtifact, SessionError> {
        let state = self.state.read().await;
        match (&state.pairing_artifact, state.status) {
            (Some(artifact), SessionStatus::QrReady) => Ok(artifact.clone()),
            _ => Err(SessionError::NotAvailable(self.id.clone())),
        }
    }

    /// Whether the session currently owns a connection handle.
    pub async fn has_connection(&self) -> bool {
        self.state.read().await.connection.is_some()
    }

    /// Send `text` to `peer` over the connection.
    ///
    /// Requires `connected`. A transport failure is logged and returned as
    /// [`SessionError::Delivery`]; it never changes the session status.
    pub async fn deliver(&self, peer: &str, text: &str) -> Result<(), SessionError> {
        let connection = {
            let state = self.state.read().await;
            match (&state.connection, state.status) {
                (Some(connection), SessionStatus::Connected) => connection.clone(),
                (_, status) => {
                    return Err(SessionError::NotConnected {
                        id: self.id.clone(),
                        status,
                    });
                }
            }
        };

        connection.send(peer, text).await.map_err(|e| {
            warn!(session_id = %self.id, peer, error = %e, "failed to deliver message");
            SessionError::Delivery(e.to_string())
        })?;
        debug!(session_id = %self.id, peer, "message delivered");
        Ok(())
    }

    /// Point-in-time summary for status collaborators.
    pub async fn summary(&self) -> SessionSummary {
        let state = self.state.read().await;
        SessionSummary {
            session_id: self.id.clone(),
            status: state.status,
            has_qr_code: state.pairing_artifact.is_some(),
            error: state.last_error.clone(),
            connected_chats: self.conversations.len(),
            transport_state: state.transport_state.clone(),
            created_at: self.created_at,
        }
    }

    // --- Conversations ---

    /// Copy of the history exchanged with `peer`, if a conversation exists.
    pub fn history(&self, peer: &str) -> Option<Vec<ChatMessage>> {
        self.conversations.get(peer).map(|b| b.history().to_vec())
    }

    /// Number of peers with a live conversation buffer.
    pub fn conversation_count(&self) -> usize {
        self.conversations.len()
    }

    /// Append the user entry for `peer`, creating the buffer on first contact.
    ///
    /// Returns the updated history, or `None` once the session is closed.
    pub(crate) fn begin_turn(&self, peer: &str, text: &str) -> Option<Vec<ChatMessage>> {
        if self.is_closed() {
            return None;
        }
        let history = {
            let mut buffer = self
                .conversations
                .entry(peer.to_string())
                .or_insert_with(|| ConversationBuffer::new(self.limits));
            buffer.begin_turn(text);
            buffer.history().to_vec()
        };
        // close() may have cleared the map between the check and the insert.
        if self.is_closed() {
            self.conversations.remove(peer);
            return None;
        }
        Some(history)
    }

    /// Append the assistant entry for `peer` and apply truncation.
    ///
    /// Returns the number of completed turns, or `None` if the buffer was
    /// released in the meantime.
    pub(crate) fn finish_turn(&self, peer: &str, reply: &str) -> Option<u64> {
        let mut buffer = self.conversations.get_mut(peer)?;
        buffer.finish_turn(reply);
        Some(buffer.turns())
    }

    /// Drop the conversation with `peer` unless it progressed past `turns`.
    ///
    /// A released peer's worker is told to retire once its queue drains.
    pub(crate) fn release_conversation(&self, peer: &str, turns: u64) -> bool {
        let released = self
            .conversations
            .remove_if(peer, |_, buffer| buffer.turns() == turns)
            .is_some();
        if released {
            if let Some(queue) = self.peer_queues.get(peer) {
                queue.retire.cancel();
            }
            info!(session_id = %self.id, peer, "conversation released");
        }
        released
    }

    /// Hand `work` to the worker for `peer` without waiting, starting one
    /// with `spawn_worker` on first use.
    ///
    /// The send happens under the map entry, so it cannot race with
    /// [`Session::retire_peer_queue`] removing that entry.
    pub(crate) fn try_enqueue(
        &self,
        peer: &str,
        work: PeerWork,
        spawn_worker: impl FnOnce(u64) -> PeerQueue,
    ) -> Result<(), SessionError> {
        if self.is_closed() {
            return Err(SessionError::Closed(self.id.clone()));
        }
        let queue = self
            .peer_queues
            .entry(peer.to_string())
            .or_insert_with(|| spawn_worker(self.next_worker.fetch_add(1, Ordering::Relaxed)));
        queue.sender.try_send(work).map_err(|e| match e {
            TrySendError::Full(_) => SessionError::QueueFull {
                id: self.id.clone(),
                peer: peer.to_string(),
            },
            TrySendError::Closed(_) => SessionError::Closed(self.id.clone()),
        })
    }

    /// Remove the queue of worker `generation` if nothing is pending in it.
    ///
    /// Returns whether the worker may stop: either its entry was removed
    /// here, or it no longer owns the entry for `peer`.
    pub(crate) fn retire_peer_queue(&self, peer: &str, generation: u64) -> bool {
        let removed = self
            .peer_queues
            .remove_if(peer, |_, queue| queue.generation == generation && queue.is_drained())
            .is_some();
        removed
            || !self
                .peer_queues
                .get(peer)
                .is_some_and(|queue| queue.generation == generation)
    }

    /// Remove the queue of worker `generation`, pending or not.
    pub(crate) fn forget_peer_queue(&self, peer: &str, generation: u64) {
        self.peer_queues
            .remove_if(peer, |_, queue| queue.generation == generation);
    }

    #[cfg(test)]
    pub(crate) fn peer_worker_count(&self) -> usize {
        self.peer_queues.len()
    }

    // --- Transitions driven by the lifecycle controller ---

    /// `initializing`/`qr_ready` -> `qr_ready` with a fresh artifact.
    pub(crate) async fn record_pairing_artifact(&self, artifact: PairingArtifact) -> bool {
        let mut state = self.state.write().await;
        if !state.status.is_pairing() {
            debug!(session_id = %self.id, status = %state.status, "ignoring late pairing artifact");
            return false;
        }
        state.pairing_artifact = Some(artifact);
        state.status = SessionStatus::QrReady;
        true
    }

    /// `initializing`/`qr_ready` -> `connected`, taking ownership of the handle.
    ///
    /// If the session left the pairing states meanwhile (closed while the
    /// handshake was pending), the handle is handed back for disposal.
    pub(crate) async fn mark_connected(
        &self,
        connection: Arc<BoxConnection>,
    ) -> Result<(), Arc<BoxConnection>> {
        let mut state = self.state.write().await;
        if !state.status.is_pairing() {
            return Err(connection);
        }
        state.connection = Some(connection);
        state.pairing_artifact = None;
        state.status = SessionStatus::Connected;
        Ok(())
    }

    /// `initializing`/`qr_ready` -> `error`. No automatic retry.
    pub(crate) async fn mark_error(&self, message: String) -> bool {
        let mut state = self.state.write().await;
        if !state.status.is_pairing() {
            return false;
        }
        state.status = SessionStatus::Error;
        state.pairing_artifact = None;
        state.last_error = Some(message);
        true
    }

    /// Apply a transport-reported state.
    ///
    /// The raw state is always recorded. Known states move a session that
    /// holds its connection; entering an adverse state returns the handle
    /// so the caller can reclaim it.
    pub(crate) async fn apply_transport_state(
        &self,
        transport_state: &TransportState,
    ) -> Option<Arc<BoxConnection>> {
        let mut state = self.state.write().await;
        state.transport_state = Some(transport_state.as_str().to_string());

        let target = transport_state.target_status()?;
        if !state.status.holds_connection() {
            debug!(
                session_id = %self.id,
                status = %state.status,
                transport_state = %transport_state,
                "transport state ignored outside a connection"
            );
            return None;
        }

        if state.status != target {
            info!(session_id = %self.id, from = %state.status, to = %target, "session status changed");
            state.status = target;
        }

        if target.is_adverse() {
            state.connection.clone()
        } else {
            None
        }
    }

    /// Close the session: release and close the handle, clear conversations.
    ///
    /// Idempotent. Close errors from the transport are logged, not returned.
    pub async fn close(&self) {
        let connection = {
            let mut state = self.state.write().await;
            if state.status == SessionStatus::Closed {
                return;
            }
            state.status = SessionStatus::Closed;
            state.pairing_artifact = None;
            state.connection.take()
        };
        self.cancellation.cancel();

        if let Some(connection) = connection {
            if let Err(e) = connection.close().await {
                warn!(session_id = %self.id, error = %e, "error closing connection");
            }
        }

        self.peer_queues.clear();
        self.conversations.clear();
        info!(session_id = %self.id, "session closed");
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("conversations", &self.conversations.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}
