//! Conversation completion detection.
//!
//! When a reply marks the end of a conversation (e.g. an order was placed),
//! the peer's buffer is released after a short delay so the next message
//! starts a fresh conversation.

/// Decides whether an assistant reply ends the conversation.
pub trait CompletionDetector: Send + Sync {
    fn is_complete(&self, reply: &str) -> bool;
}

/// Matches configured phrases case-insensitively anywhere in the reply.
#[derive(Debug, Clone)]
pub struct PhraseCompletionDetector {
    phrases: Vec<String>,
}

impl PhraseCompletionDetector {
    /// Build a detector from the given phrases.
    ///
    /// Blank phrases are ignored. Returns `None` when no phrase remains, so
    /// callers can skip detection entirely.
    pub fn from_phrases<I, S>(phrases: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let phrases: Vec<String> = phrases
            .into_iter()
            .map(|p| p.as_ref().trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();

        if phrases.is_empty() {
            None
        } else {
            Some(Self { phrases })
        }
    }
}

impl CompletionDetector for PhraseCompletionDetector {
    fn is_complete(&self, reply: &str) -> bool {
        let reply = reply.to_lowercase();
        self.phrases.iter().any(|p| reply.contains(p.as_str()))
    }
}
