//! Transport implementations.

pub mod loopback;

pub use loopback::{LoopbackTransport, OutboundMessage};
