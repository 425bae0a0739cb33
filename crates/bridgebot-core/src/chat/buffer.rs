//! Bounded conversation history for a single peer.
//!
//! A buffer grows by whole turns: the user entry is appended when a message
//! arrives, the assistant entry when the reply is known. Truncation only
//! runs once a turn is finished, so a pending user entry is never dropped.

use bridgebot_types::chat::ChatMessage;
use bridgebot_types::config::SessionsConfig;

/// High/low water marks for conversation history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryLimits {
    /// History longer than this is truncated.
    pub high_water: usize,
    /// Number of most recent entries kept after truncation.
    pub low_water: usize,
}

impl HistoryLimits {
    pub fn new(high_water: usize, low_water: usize) -> Self {
        Self {
            high_water,
            low_water: low_water.min(high_water),
        }
    }
}

impl Default for HistoryLimits {
    fn default() -> Self {
        Self::new(20, 16)
    }
}

impl From<&SessionsConfig> for HistoryLimits {
    fn from(config: &SessionsConfig) -> Self {
        Self::new(config.history_high_water, config.history_low_water)
    }
}

/// Ordered message history exchanged with one peer.
#[derive(Debug, Clone)]
pub struct ConversationBuffer {
    history: Vec<ChatMessage>,
    limits: HistoryLimits,
    /// Completed turns since the buffer was created.
    turns: u64,
}

impl ConversationBuffer {
    pub fn new(limits: HistoryLimits) -> Self {
        Self {
            history: Vec::new(),
            limits,
            turns: 0,
        }
    }

    /// Append the user entry that opens a turn.
    pub fn begin_turn(&mut self, text: &str) {
        self.history.push(ChatMessage::user(text));
    }

    /// Append the assistant entry that closes a turn, then enforce the limits.
    pub fn finish_turn(&mut self, reply: &str) {
        self.history.push(ChatMessage::assistant(reply));
        self.turns += 1;
        self.truncate();
    }

    fn truncate(&mut self) {
        if self.history.len() > self.limits.high_water {
            let excess = self.history.len() - self.limits.low_water;
            self.history.drain(..excess);
        }
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn turns(&self) -> u64 {
        self.turns
    }
}
