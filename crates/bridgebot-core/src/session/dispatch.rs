//! Per-message dispatch pipeline.
//!
//! For one inbound message: discard blank text, append the user turn,
//! ask the responder, deliver the reply, then close the turn in the buffer.
//! Responder and delivery failures never escape this module: the responder
//! failure is replaced with [`DEGRADED_SERVICE_NOTICE`] here, and delivery
//! failures are logged by the session.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, trace, warn};

use crate::chat::completion::CompletionDetector;
use crate::config::ConfigStore;
use crate::llm::responder::{DEGRADED_SERVICE_NOTICE, ResponderGateway};

use super::handle::Session;

/// What happened to one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Blank text: no buffer mutation, no reply.
    Discarded,
    /// The session closed before the message could be handled.
    SessionClosed,
    /// A reply was produced and the turn recorded.
    Replied { reply: String, delivered: bool },
}

/// Shared dispatch context: responder, configuration, completion detection.
#[derive(Clone)]
pub struct Dispatcher {
    responder: Arc<ResponderGateway>,
    config: ConfigStore,
    detector: Option<Arc<dyn CompletionDetector>>,
    release_delay: Duration,
}

impl Dispatcher {
    pub fn new(responder: Arc<ResponderGateway>, config: ConfigStore) -> Self {
        Self {
            responder,
            config,
            detector: None,
            release_delay: Duration::from_secs(30),
        }
    }

    /// Release a peer's buffer `delay` after a reply the detector marks complete.
    pub fn with_completion_detector(
        mut self,
        detector: Arc<dyn CompletionDetector>,
        delay: Duration,
    ) -> Self {
        self.detector = Some(detector);
        self.release_delay = delay;
        self
    }

    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    /// Run the pipeline for one message from `peer`.
    ///
    /// Callers must serialize calls per (session, peer).
    pub async fn dispatch(&self, session: &Arc<Session>, peer: &str, text: &str) -> DispatchOutcome {
        let text = text.trim();
        if text.is_empty() {
            trace!(session_id = session.id(), peer, "discarding blank message");
            return DispatchOutcome::Discarded;
        }

        let Some(history) = session.begin_turn(peer, text) else {
            debug!(session_id = session.id(), peer, "session closed, dropping message");
            return DispatchOutcome::SessionClosed;
        };

        let config = self.config.snapshot().await;
        let reply = match self.responder.respond(&config, &history, text).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(
                    session_id = session.id(),
                    peer,
                    provider = self.responder.provider_name(),
                    error = %e,
                    "responder failed, sending degraded notice"
                );
                DEGRADED_SERVICE_NOTICE.to_string()
            }
        };

        let delivered = session.deliver(peer, &reply).await.is_ok();
        if delivered {
            info!(session_id = session.id(), peer, "replied");
        }

        match session.finish_turn(peer, &reply) {
            Some(turns) => self.maybe_schedule_release(session, peer, &reply, turns),
            None => debug!(session_id = session.id(), peer, "buffer gone before turn finished"),
        }

        DispatchOutcome::Replied { reply, delivered }
    }

    fn maybe_schedule_release(&self, session: &Arc<Session>, peer: &str, reply: &str, turns: u64) {
        let Some(detector) = &self.detector else {
            return;
        };
        if !detector.is_complete(reply) {
            return;
        }

        debug!(session_id = session.id(), peer, delay = ?self.release_delay, "conversation complete");
        let session = session.clone();
        let peer = peer.to_string();
        let delay = self.release_delay;
        tokio::spawn(async move {
            tokio::select! {
                _ = session.cancellation().cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    session.release_conversation(&peer, turns);
                }
            }
        });
    }
}
