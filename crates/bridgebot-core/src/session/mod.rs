//! Transport sessions and their lifecycle.
//!
//! - `Session`: one connection, its status, pairing artifact, and conversations
//! - `SessionRegistry`: the set of live sessions, keyed by id
//! - `Dispatcher`: per-message pipeline (buffer, responder, delivery)
//! - `SessionController`: pairing, state changes, reclaim, event routing, shutdown

pub mod controller;
pub mod dispatch;
pub mod handle;
pub mod registry;

pub use controller::{ControllerSettings, SessionController};
pub use dispatch::{DispatchOutcome, Dispatcher};
pub use handle::Session;
pub use registry::SessionRegistry;
