//! In-process loopback transport.
//!
//! Stands in for a real chat network during development and tests. Each
//! opened session gets a "line": the transport emits a pairing artifact,
//! waits until the line is paired (immediately with `auto_pair`), records
//! outbound messages in an outbox, and lets callers inject inbound
//! messages and raw state changes as if the network had sent them.
//!
//! The outbox keeps the latest [`OUTBOX_LIMIT`] messages. A line goes away
//! when its connection closes or its handshake is abandoned.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bridgebot_core::transport::{BoxConnection, Connection, Transport, TransportEvent};
use bridgebot_types::error::TransportError;
use bridgebot_types::session::PairingArtifact;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

/// Outbound messages kept per line; older ones are discarded first.
pub const OUTBOX_LIMIT: usize = 256;

/// A message the bridge sent through the loopback transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundMessage {
    pub peer: String,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

type PairingResult = Result<(), String>;

struct Line {
    events: mpsc::Sender<TransportEvent>,
    pairing: Mutex<Option<oneshot::Sender<PairingResult>>>,
    outbox: Mutex<VecDeque<OutboundMessage>>,
    closed: AtomicBool,
    fail_sends: AtomicBool,
    reclaims: AtomicUsize,
}

impl Line {
    fn resolve_pairing(&self, result: PairingResult) -> bool {
        let pending = self.pairing.lock().map(|mut slot| slot.take()).unwrap_or(None);
        match pending {
            Some(tx) => tx.send(result).is_ok(),
            None => false,
        }
    }
}

type Lines = Arc<DashMap<String, Arc<Line>>>;

/// Drop `line` from `lines` unless `session_id` now maps to another line.
fn remove_line(lines: &Lines, session_id: &str, line: &Arc<Line>) {
    if lines
        .remove_if(session_id, |_, current| Arc::ptr_eq(current, line))
        .is_some()
    {
        tracing::debug!(session_id, "loopback line removed");
    }
}

/// Removes a line whose handshake never completed, including when the
/// `open` future is dropped mid-handshake.
struct PendingLine {
    lines: Lines,
    session_id: String,
    line: Arc<Line>,
    paired: bool,
}

impl PendingLine {
    fn complete(mut self) -> Arc<Line> {
        self.paired = true;
        self.line.clone()
    }
}

impl Drop for PendingLine {
    fn drop(&mut self) {
        if !self.paired {
            remove_line(&self.lines, &self.session_id, &self.line);
        }
    }
}

/// Loopback transport. Cheap to clone; clones share all lines.
#[derive(Clone, Default)]
pub struct LoopbackTransport {
    auto_pair: bool,
    lines: Lines,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Complete every handshake right after the pairing artifact is emitted.
    pub fn with_auto_pair(mut self, auto_pair: bool) -> Self {
        self.auto_pair = auto_pair;
        self
    }

    pub fn auto_pair(&self) -> bool {
        self.auto_pair
    }

    fn line(&self, session_id: &str) -> Result<Arc<Line>, TransportError> {
        self.lines
            .get(session_id)
            .map(|line| line.value().clone())
            .ok_or_else(|| TransportError::UnknownSession(session_id.to_string()))
    }

    /// Complete the pending handshake for `session_id`, as if the artifact was scanned.
    pub fn pair(&self, session_id: &str) -> Result<(), TransportError> {
        if self.line(session_id)?.resolve_pairing(Ok(())) {
            tracing::debug!(session_id, "loopback line paired");
            Ok(())
        } else {
            Err(TransportError::Setup(format!(
                "no pairing pending for session '{session_id}'"
            )))
        }
    }

    /// Fail the pending handshake for `session_id` with `reason`.
    pub fn reject(&self, session_id: &str, reason: &str) -> Result<(), TransportError> {
        if self.line(session_id)?.resolve_pairing(Err(reason.to_string())) {
            Ok(())
        } else {
            Err(TransportError::Setup(format!(
                "no pairing pending for session '{session_id}'"
            )))
        }
    }

    /// Deliver an inbound message from `peer` to the session.
    pub async fn inject_message(&self, session_id: &str, peer: &str, text: &str) -> Result<(), TransportError> {
        self.emit(
            session_id,
            TransportEvent::Message {
                peer: peer.to_string(),
                text: text.to_string(),
            },
        )
        .await
    }

    /// Report a raw connection state (any case) to the session.
    pub async fn inject_state(&self, session_id: &str, state: &str) -> Result<(), TransportError> {
        self.emit(session_id, TransportEvent::StateChange(state.to_string()))
            .await
    }

    async fn emit(&self, session_id: &str, event: TransportEvent) -> Result<(), TransportError> {
        let line = self.line(session_id)?;
        if line.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        line.events
            .send(event)
            .await
            .map_err(|_| TransportError::Closed)
    }

    /// The latest messages sent to peers through `session_id`, oldest first.
    pub fn outbox(&self, session_id: &str) -> Result<Vec<OutboundMessage>, TransportError> {
        let line = self.line(session_id)?;
        let outbox = line
            .outbox
            .lock()
            .map(|outbox| outbox.iter().cloned().collect())
            .unwrap_or_default();
        Ok(outbox)
    }

    pub fn reclaim_count(&self, session_id: &str) -> Result<usize, TransportError> {
        Ok(self.line(session_id)?.reclaims.load(Ordering::SeqCst))
    }

    /// Whether `session_id` has a line that has not been closed.
    pub fn is_open(&self, session_id: &str) -> bool {
        self.lines
            .get(session_id)
            .is_some_and(|line| !line.closed.load(Ordering::SeqCst))
    }

    /// Number of lines currently registered, pending handshakes included.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Make every send on `session_id` fail until switched back.
    pub fn set_fail_sends(&self, session_id: &str, fail: bool) -> Result<(), TransportError> {
        self.line(session_id)?.fail_sends.store(fail, Ordering::SeqCst);
        Ok(())
    }
}

impl Transport for LoopbackTransport {
    fn name(&self) -> &str {
        "loopback"
    }

    async fn open(
        &self,
        session_id: &str,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<BoxConnection, TransportError> {
        let (pair_tx, pair_rx) = oneshot::channel();
        let line = Arc::new(Line {
            events: events.clone(),
            pairing: Mutex::new(Some(pair_tx)),
            outbox: Mutex::new(VecDeque::new()),
            closed: AtomicBool::new(false),
            fail_sends: AtomicBool::new(false),
            reclaims: AtomicUsize::new(0),
        });
        self.lines.insert(session_id.to_string(), line.clone());
        let pending = PendingLine {
            lines: self.lines.clone(),
            session_id: session_id.to_string(),
            line: line.clone(),
            paired: false,
        };

        let artifact = PairingArtifact::new(format!("bridgebot-pair:{session_id}:{}", Uuid::now_v7()).into_bytes());
        events
            .send(TransportEvent::PairingArtifact(artifact))
            .await
            .map_err(|_| TransportError::Setup("session stopped before pairing".to_string()))?;

        if self.auto_pair {
            line.resolve_pairing(Ok(()));
        }

        match pair_rx.await {
            Ok(Ok(())) => {
                tracing::info!(session_id, "loopback handshake complete");
                Ok(BoxConnection::new(LoopbackConnection {
                    session_id: session_id.to_string(),
                    line: pending.complete(),
                    lines: self.lines.clone(),
                }))
            }
            Ok(Err(reason)) => Err(TransportError::Setup(reason)),
            Err(_) => Err(TransportError::Setup("pairing abandoned".to_string())),
        }
    }
}

struct LoopbackConnection {
    session_id: String,
    line: Arc<Line>,
    lines: Lines,
}

impl Connection for LoopbackConnection {
    async fn send(&self, peer: &str, text: &str) -> Result<(), TransportError> {
        if self.line.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        if self.line.fail_sends.load(Ordering::SeqCst) {
            return Err(TransportError::Send("loopback send failure".to_string()));
        }
        let message = OutboundMessage {
            peer: peer.to_string(),
            text: text.to_string(),
            sent_at: Utc::now(),
        };
        let mut outbox = self
            .line
            .outbox
            .lock()
            .map_err(|_| TransportError::Send("outbox poisoned".to_string()))?;
        if outbox.len() >= OUTBOX_LIMIT {
            outbox.pop_front();
        }
        outbox.push_back(message);
        drop(outbox);
        tracing::trace!(session_id = %self.session_id, peer, "loopback message sent");
        Ok(())
    }

    /// Reclaim always succeeds and reports the line as connected again.
    async fn reclaim(&self) -> Result<(), TransportError> {
        if self.line.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        self.line.reclaims.fetch_add(1, Ordering::SeqCst);
        // The session's event loop is the one awaiting this call, so never block on the channel.
        self.line
            .events
            .try_send(TransportEvent::StateChange("CONNECTED".to_string()))
            .map_err(|e| TransportError::Reclaim(e.to_string()))
    }

    async fn close(&self) -> Result<(), TransportError> {
        if self.line.closed.swap(true, Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        remove_line(&self.lines, &self.session_id, &self.line);
        tracing::debug!(session_id = %self.session_id, "loopback line closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn open_paired(transport: &LoopbackTransport, id: &str) -> (BoxConnection, mpsc::Receiver<TransportEvent>) {
        let (tx, mut rx) = mpsc::channel(16);
        let connection = transport.open(id, tx).await.unwrap();
        assert!(matches!(rx.recv().await, Some(TransportEvent::PairingArtifact(_))));
        (connection, rx)
    }

    #[tokio::test]
    async fn auto_pair_connects_after_artifact() {
        let transport = LoopbackTransport::new().with_auto_pair(true);
        let (connection, _rx) = open_paired(&transport, "s1").await;

        connection.send("alice", "hello").await.unwrap();
        let outbox = transport.outbox("s1").unwrap();
        assert_eq!(outbox.len(), 1);
        assert_eq!(outbox[0].peer, "alice");
        assert_eq!(outbox[0].text, "hello");
    }

    #[tokio::test]
    async fn manual_pairing_waits_for_pair() {
        let transport = LoopbackTransport::new();
        let (tx, mut rx) = mpsc::channel(16);

        let opening = {
            let transport = transport.clone();
            tokio::spawn(async move { transport.open("s1", tx).await })
        };

        let Some(TransportEvent::PairingArtifact(artifact)) = rx.recv().await else {
            panic!("expected a pairing artifact");
        };
        assert!(artifact.as_bytes().starts_with(b"bridgebot-pair:s1:"));
        assert!(!opening.is_finished());

        transport.pair("s1").unwrap();
        assert!(opening.await.unwrap().is_ok());
        // Nothing left to pair.
        assert!(matches!(transport.pair("s1"), Err(TransportError::Setup(_))));
    }

    #[tokio::test]
    async fn rejected_pairing_is_setup_error() {
        let transport = LoopbackTransport::new();
        let (tx, mut rx) = mpsc::channel(16);
        let opening = {
            let transport = transport.clone();
            tokio::spawn(async move { transport.open("s1", tx).await })
        };
        rx.recv().await.unwrap();

        transport.reject("s1", "qr expired").unwrap();
        let err = opening.await.unwrap().unwrap_err();
        assert!(matches!(err, TransportError::Setup(reason) if reason == "qr expired"));
    }

    #[tokio::test]
    async fn unknown_session_is_reported() {
        let transport = LoopbackTransport::new();
        assert!(matches!(transport.pair("nope"), Err(TransportError::UnknownSession(_))));
        assert!(matches!(
            transport.inject_message("nope", "alice", "hi").await,
            Err(TransportError::UnknownSession(_))
        ));
    }

    #[tokio::test]
    async fn injected_events_reach_the_session() {
        let transport = LoopbackTransport::new().with_auto_pair(true);
        let (_connection, mut rx) = open_paired(&transport, "s1").await;

        transport.inject_state("s1", "CONFLICT").await.unwrap();
        transport.inject_message("s1", "alice", "hi").await.unwrap();

        assert!(matches!(rx.recv().await, Some(TransportEvent::StateChange(s)) if s == "CONFLICT"));
        assert!(matches!(
            rx.recv().await,
            Some(TransportEvent::Message { peer, text }) if peer == "alice" && text == "hi"
        ));
    }

    #[tokio::test]
    async fn reclaim_reports_connected() {
        let transport = LoopbackTransport::new().with_auto_pair(true);
        let (connection, mut rx) = open_paired(&transport, "s1").await;

        connection.reclaim().await.unwrap();

        assert_eq!(transport.reclaim_count("s1").unwrap(), 1);
        assert!(matches!(rx.recv().await, Some(TransportEvent::StateChange(s)) if s == "CONNECTED"));
    }

    #[tokio::test]
    async fn closed_line_rejects_traffic() {
        let transport = LoopbackTransport::new().with_auto_pair(true);
        let (connection, _rx) = open_paired(&transport, "s1").await;

        assert!(transport.is_open("s1"));
        connection.close().await.unwrap();

        assert!(!transport.is_open("s1"));
        assert_eq!(transport.line_count(), 0);
        assert!(matches!(connection.send("alice", "hi").await, Err(TransportError::Closed)));
        assert!(matches!(
            transport.inject_message("s1", "alice", "hi").await,
            Err(TransportError::UnknownSession(_))
        ));
        assert!(matches!(connection.close().await, Err(TransportError::Closed)));
    }

    #[tokio::test]
    async fn outbox_keeps_only_latest_messages() {
        let transport = LoopbackTransport::new().with_auto_pair(true);
        let (connection, _rx) = open_paired(&transport, "s1").await;

        for i in 0..OUTBOX_LIMIT + 10 {
            connection.send("alice", &format!("m{i}")).await.unwrap();
        }

        let outbox = transport.outbox("s1").unwrap();
        assert_eq!(outbox.len(), OUTBOX_LIMIT);
        assert_eq!(outbox[0].text, "m10");
        assert_eq!(outbox[OUTBOX_LIMIT - 1].text, format!("m{}", OUTBOX_LIMIT + 9));
    }

    #[tokio::test]
    async fn failed_or_abandoned_pairing_removes_line() {
        let transport = LoopbackTransport::new();
        let (tx, mut rx) = mpsc::channel(16);
        let opening = {
            let transport = transport.clone();
            tokio::spawn(async move { transport.open("s1", tx).await })
        };
        rx.recv().await.unwrap();
        transport.reject("s1", "qr expired").unwrap();
        assert!(opening.await.unwrap().is_err());
        assert_eq!(transport.line_count(), 0);

        // Dropping the open future mid-handshake cleans up too.
        let (tx, mut rx) = mpsc::channel(16);
        let opening = {
            let transport = transport.clone();
            tokio::spawn(async move { transport.open("s2", tx).await })
        };
        rx.recv().await.unwrap();
        assert!(transport.is_open("s2"));
        opening.abort();
        assert!(opening.await.unwrap_err().is_cancelled());
        assert_eq!(transport.line_count(), 0);
    }

    #[tokio::test]
    async fn closing_stale_connection_keeps_newer_line() {
        let transport = LoopbackTransport::new().with_auto_pair(true);
        let (old, _old_rx) = open_paired(&transport, "s1").await;
        let (_new, _new_rx) = open_paired(&transport, "s1").await;

        old.close().await.unwrap();

        assert!(transport.is_open("s1"));
        assert_eq!(transport.line_count(), 1);
    }

    #[tokio::test]
    async fn send_failures_can_be_forced() {
        let transport = LoopbackTransport::new().with_auto_pair(true);
        let (connection, _rx) = open_paired(&transport, "s1").await;

        transport.set_fail_sends("s1", true).unwrap();
        assert!(matches!(connection.send("alice", "hi").await, Err(TransportError::Send(_))));
        assert!(transport.outbox("s1").unwrap().is_empty());
    }
}
