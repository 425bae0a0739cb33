//! Per-peer conversation state.
//!
//! - `ConversationBuffer`: bounded message history for one peer
//! - `CompletionDetector`: decides when a conversation has reached its end

pub mod buffer;
pub mod completion;
