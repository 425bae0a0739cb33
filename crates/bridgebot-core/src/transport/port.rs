//! Transport and Connection trait definitions.

use std::future::Future;

use bridgebot_types::error::TransportError;
use bridgebot_types::session::PairingArtifact;
use tokio::sync::mpsc;

use super::boxed::BoxConnection;

/// Event emitted by a transport for one session.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// A (new) pairing artifact is ready to be scanned.
    PairingArtifact(PairingArtifact),
    /// Raw connection state as reported by the transport, in any case.
    StateChange(String),
    /// A text message from a peer.
    Message { peer: String, text: String },
}

/// A live transport connection, exclusively owned by its session.
pub trait Connection: Send + Sync {
    /// Send `text` to `peer`.
    fn send(
        &self,
        peer: &str,
        text: &str,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Assert primary ownership of the account after an adverse state.
    ///
    /// Does not replace the connection; the transport reports the outcome as
    /// a later state change.
    fn reclaim(&self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Log out and close the connection.
    fn close(&self) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// Factory for session connections.
pub trait Transport: Send + Sync {
    /// Human-readable transport name (e.g., "loopback").
    fn name(&self) -> &str;

    /// Open the connection for `session_id`.
    ///
    /// Pairing artifacts are emitted on `events` while the handshake is
    /// pending; the future resolves once the handshake completes. The
    /// transport keeps using `events` for state changes and messages.
    fn open(
        &self,
        session_id: &str,
        events: mpsc::Sender<TransportEvent>,
    ) -> impl Future<Output = Result<BoxConnection, TransportError>> + Send;
}
