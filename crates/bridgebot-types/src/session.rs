//! Transport session types for Bridgebot.
//!
//! A session is one transport connection (one paired chat account) carrying
//! its own pairing artifact, status, and per-peer conversations.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

/// Prefix some transports put in front of the base64 QR image.
const PNG_DATA_URI_PREFIX: &str = "data:image/png;base64,";

/// Lifecycle status of a transport session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Initializing,
    QrReady,
    Connected,
    Conflict,
    Unpaired,
    Unlaunched,
    Error,
    Closed,
}

impl SessionStatus {
    /// Adverse states reported by the transport, recoverable through reclaim.
    pub fn is_adverse(self) -> bool {
        matches!(
            self,
            SessionStatus::Conflict | SessionStatus::Unpaired | SessionStatus::Unlaunched
        )
    }

    /// Whether a session in this status holds its connection handle.
    pub fn holds_connection(self) -> bool {
        self == SessionStatus::Connected || self.is_adverse()
    }

    /// Statuses before the handshake completed.
    pub fn is_pairing(self) -> bool {
        matches!(self, SessionStatus::Initializing | SessionStatus::QrReady)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Initializing => write!(f, "initializing"),
            SessionStatus::QrReady => write!(f, "qr_ready"),
            SessionStatus::Connected => write!(f, "connected"),
            SessionStatus::Conflict => write!(f, "conflict"),
            SessionStatus::Unpaired => write!(f, "unpaired"),
            SessionStatus::Unlaunched => write!(f, "unlaunched"),
            SessionStatus::Error => write!(f, "error"),
            SessionStatus::Closed => write!(f, "closed"),
        }
    }
}

impl FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "initializing" => Ok(SessionStatus::Initializing),
            "qr_ready" => Ok(SessionStatus::QrReady),
            "connected" => Ok(SessionStatus::Connected),
            "conflict" => Ok(SessionStatus::Conflict),
            "unpaired" => Ok(SessionStatus::Unpaired),
            "unlaunched" => Ok(SessionStatus::Unlaunched),
            "error" => Ok(SessionStatus::Error),
            "closed" => Ok(SessionStatus::Closed),
            other => Err(format!("invalid session status: '{other}'")),
        }
    }
}

/// A connection state as reported by the transport.
///
/// Transports report states as free-form strings in any case. Known states are
/// mapped to variants; everything else is kept (lowercased) in `Other`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportState {
    Connected,
    Conflict,
    Unpaired,
    Unlaunched,
    Other(String),
}

impl TransportState {
    /// Normalize a raw transport state string.
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.trim().to_lowercase();
        match normalized.as_str() {
            "connected" => TransportState::Connected,
            "conflict" => TransportState::Conflict,
            "unpaired" => TransportState::Unpaired,
            "unlaunched" => TransportState::Unlaunched,
            _ => TransportState::Other(normalized),
        }
    }

    /// The lowercase name of this state.
    pub fn as_str(&self) -> &str {
        match self {
            TransportState::Connected => "connected",
            TransportState::Conflict => "conflict",
            TransportState::Unpaired => "unpaired",
            TransportState::Unlaunched => "unlaunched",
            TransportState::Other(s) => s,
        }
    }

    /// The session status this state moves a session into, if any.
    pub fn target_status(&self) -> Option<SessionStatus> {
        match self {
            TransportState::Connected => Some(SessionStatus::Connected),
            TransportState::Conflict => Some(SessionStatus::Conflict),
            TransportState::Unpaired => Some(SessionStatus::Unpaired),
            TransportState::Unlaunched => Some(SessionStatus::Unlaunched),
            TransportState::Other(_) => None,
        }
    }
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque pairing payload (typically a PNG QR code) emitted by the transport.
#[derive(Clone, PartialEq, Eq)]
pub struct PairingArtifact(Vec<u8>);

impl PairingArtifact {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Build an artifact from a base64 string, with or without a PNG data URI prefix.
    pub fn from_base64(encoded: &str) -> Result<Self, base64::DecodeError> {
        let payload = encoded
            .strip_prefix(PNG_DATA_URI_PREFIX)
            .unwrap_or(encoded);
        Ok(Self(STANDARD.decode(payload.trim())?))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Base64 encoding without any data URI prefix.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.0)
    }
}

impl fmt::Debug for PairingArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PairingArtifact")
            .field("len", &self.0.len())
            .finish()
    }
}

/// Point-in-time view of a session, as exposed to status collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub status: SessionStatus,
    pub has_qr_code: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub connected_chats: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport_state: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_status_roundtrip() {
        let status: SessionStatus = "QR_READY".parse().unwrap();
        assert_eq!(status, SessionStatus::QrReady);
        assert_eq!(status.to_string(), "qr_ready");
        assert_eq!(
            serde_json::to_value(SessionStatus::QrReady).unwrap(),
            "qr_ready"
        );
        assert!("paused".parse::<SessionStatus>().is_err());
    }

    #[test]
    fn test_connection_holding_statuses() {
        assert!(SessionStatus::Connected.holds_connection());
        assert!(SessionStatus::Conflict.holds_connection());
        assert!(SessionStatus::Unpaired.holds_connection());
        assert!(!SessionStatus::QrReady.holds_connection());
        assert!(!SessionStatus::Error.holds_connection());
        assert!(!SessionStatus::Closed.holds_connection());
    }

    #[test]
    fn test_transport_state_is_case_insensitive() {
        assert_eq!(TransportState::parse("CONFLICT"), TransportState::Conflict);
        assert_eq!(TransportState::parse("Unpaired"), TransportState::Unpaired);
        assert_eq!(
            TransportState::parse("OPENING"),
            TransportState::Other("opening".to_string())
        );
        assert_eq!(TransportState::parse("OPENING").target_status(), None);
        assert_eq!(
            TransportState::parse("unlaunched").target_status(),
            Some(SessionStatus::Unlaunched)
        );
    }

    #[test]
    fn test_pairing_artifact_strips_data_uri_prefix() {
        let artifact = PairingArtifact::from_base64("data:image/png;base64,aGVsbG8=").unwrap();
        assert_eq!(artifact.as_bytes(), b"hello");
        assert_eq!(artifact.to_base64(), "aGVsbG8=");

        let plain = PairingArtifact::from_base64("aGVsbG8=").unwrap();
        assert_eq!(plain, artifact);
    }

    #[test]
    fn test_pairing_artifact_debug_hides_payload() {
        let artifact = PairingArtifact::new(vec![1, 2, 3]);
        assert_eq!(format!("{artifact:?}"), "PairingArtifact { len: 3 }");
    }
}
