//! Chat transport abstractions.
//!
//! A transport opens one connection per session. While the connection is
//! being established it emits pairing artifacts; afterwards it reports state
//! changes and inbound messages through the same event channel.

pub mod boxed;
pub mod port;

pub use boxed::{BoxConnection, BoxTransport};
pub use port::{Connection, Transport, TransportEvent};
