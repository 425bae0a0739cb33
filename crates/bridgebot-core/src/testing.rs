//! In-memory doubles for the provider and transport ports, shared by the
//! unit tests of this crate.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use bridgebot_types::error::TransportError;
use bridgebot_types::llm::{CompletionRequest, CompletionResponse, LlmError, Usage};
use bridgebot_types::session::{PairingArtifact, SessionStatus};
use dashmap::DashMap;
use tokio::sync::{Mutex, Notify, mpsc};

use crate::llm::provider::LlmProvider;
use crate::session::Session;
use crate::transport::{BoxConnection, Connection, Transport, TransportEvent};

#[derive(Clone)]
enum Reply {
    Fixed(String),
    Echo,
    Fail,
}

/// Provider double that records every request.
#[derive(Clone)]
pub struct MockProvider {
    reply: Reply,
    delay: Option<Duration>,
    calls: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl MockProvider {
    pub fn replying(text: &str) -> Self {
        Self::with(Reply::Fixed(text.to_string()))
    }

    /// Replies with `echo: <last message content>`.
    pub fn echo() -> Self {
        Self::with(Reply::Echo)
    }

    /// Fails every call like an HTTP 500 would.
    pub fn failing() -> Self {
        Self::with(Reply::Fail)
    }

    fn with(reply: Reply) -> Self {
        Self {
            reply,
            delay: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Arc<Mutex<Vec<CompletionRequest>>> {
        self.calls.clone()
    }
}

impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.calls.lock().await.push(request.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let content = match &self.reply {
            Reply::Fixed(text) => text.clone(),
            Reply::Echo => format!(
                "echo: {}",
                request.messages.last().map(|m| m.content.as_str()).unwrap_or("")
            ),
            Reply::Fail => {
                return Err(LlmError::Provider {
                    message: "HTTP 500 Internal Server Error".to_string(),
                });
            }
        };
        Ok(CompletionResponse {
            content,
            model: request.model.clone(),
            usage: Usage::default(),
        })
    }
}

#[derive(Default)]
struct ConnectionLog {
    sent: std::sync::Mutex<Vec<(String, String)>>,
    fail_sends: AtomicBool,
    fail_close: AtomicBool,
    reclaims: AtomicUsize,
    closes: AtomicUsize,
}

/// Connection double; clones share the same log.
#[derive(Clone, Default)]
pub struct MockConnection {
    log: Arc<ConnectionLog>,
}

impl MockConnection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.log.sent.lock().unwrap().clone()
    }

    pub fn fail_sends(&self, fail: bool) {
        self.log.fail_sends.store(fail, Ordering::SeqCst);
    }

    pub fn fail_close(&self, fail: bool) {
        self.log.fail_close.store(fail, Ordering::SeqCst);
    }

    pub fn reclaim_count(&self) -> usize {
        self.log.reclaims.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.log.closes.load(Ordering::SeqCst)
    }
}

impl Connection for MockConnection {
    async fn send(&self, peer: &str, text: &str) -> Result<(), TransportError> {
        if self.log.fail_sends.load(Ordering::SeqCst) || self.close_count() > 0 {
            return Err(TransportError::Send("mock send failure".to_string()));
        }
        self.log
            .sent
            .lock()
            .unwrap()
            .push((peer.to_string(), text.to_string()));
        Ok(())
    }

    async fn reclaim(&self) -> Result<(), TransportError> {
        self.log.reclaims.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.log.closes.fetch_add(1, Ordering::SeqCst);
        if self.log.fail_close.load(Ordering::SeqCst) {
            return Err(TransportError::Close("mock close failure".to_string()));
        }
        Ok(())
    }
}

/// Transport double: emits one artifact, then connects (or fails).
///
/// A gated transport holds every handshake until [`MockTransport::release`].
#[derive(Clone, Default)]
pub struct MockTransport {
    fail_setup: bool,
    gate: Option<Arc<Notify>>,
    opens: Arc<AtomicUsize>,
    events: Arc<DashMap<String, mpsc::Sender<TransportEvent>>>,
    connections: Arc<DashMap<String, MockConnection>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_setup() -> Self {
        Self {
            fail_setup: true,
            ..Self::default()
        }
    }

    pub fn gated() -> Self {
        Self {
            gate: Some(Arc::new(Notify::new())),
            ..Self::default()
        }
    }

    /// Let one pending handshake complete.
    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn connection(&self, session_id: &str) -> Option<MockConnection> {
        self.connections.get(session_id).map(|c| c.clone())
    }

    pub async fn emit(&self, session_id: &str, event: TransportEvent) {
        let sender = self
            .events
            .get(session_id)
            .map(|s| s.clone())
            .expect("session was never opened");
        sender.send(event).await.expect("event loop stopped");
    }
}

impl Transport for MockTransport {
    fn name(&self) -> &str {
        "mock"
    }

    async fn open(
        &self,
        session_id: &str,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<BoxConnection, TransportError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.events.insert(session_id.to_string(), events.clone());
        let _ = events
            .send(TransportEvent::PairingArtifact(PairingArtifact::new(
                session_id.as_bytes().to_vec(),
            )))
            .await;

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if self.fail_setup {
            return Err(TransportError::Setup("pairing timed out".to_string()));
        }
        let connection = MockConnection::new();
        self.connections
            .insert(session_id.to_string(), connection.clone());
        Ok(BoxConnection::new(connection))
    }
}

/// Poll until the session reaches `status`, panicking after two seconds.
pub async fn wait_for_status(session: &Session, status: SessionStatus) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        if session.status().await.0 == status {
            return;
        }
        if tokio::time::Instant::now() > deadline {
            panic!(
                "session {} stuck in {:?}, expected {status:?}",
                session.id(),
                session.status().await.0
            );
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Poll until `check` holds, panicking after two seconds.
pub async fn wait_until(mut check: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !check() {
        if tokio::time::Instant::now() > deadline {
            panic!("condition not reached within two seconds");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
