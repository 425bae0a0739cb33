//! Object-safe wrappers for [`Transport`] and [`Connection`].
//!
//! Same blanket-impl pattern as `BoxLlmProvider`: a `*Dyn` trait with boxed
//! futures, a blanket impl for every implementor, and a `Box*` newtype that
//! delegates.

use std::future::Future;
use std::pin::Pin;

use bridgebot_types::error::TransportError;
use tokio::sync::mpsc;

use super::port::{Connection, Transport, TransportEvent};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Object-safe version of [`Connection`].
pub trait ConnectionDyn: Send + Sync {
    fn send_boxed<'a>(&'a self, peer: &'a str, text: &'a str) -> BoxFuture<'a, Result<(), TransportError>>;

    fn reclaim_boxed(&self) -> BoxFuture<'_, Result<(), TransportError>>;

    fn close_boxed(&self) -> BoxFuture<'_, Result<(), TransportError>>;
}

impl<T: Connection> ConnectionDyn for T {
    fn send_boxed<'a>(&'a self, peer: &'a str, text: &'a str) -> BoxFuture<'a, Result<(), TransportError>> {
        Box::pin(self.send(peer, text))
    }

    fn reclaim_boxed(&self) -> BoxFuture<'_, Result<(), TransportError>> {
        Box::pin(self.reclaim())
    }

    fn close_boxed(&self) -> BoxFuture<'_, Result<(), TransportError>> {
        Box::pin(self.close())
    }
}

/// Type-erased connection handle.
pub struct BoxConnection {
    inner: Box<dyn ConnectionDyn>,
}

impl BoxConnection {
    pub fn new<T: Connection + 'static>(connection: T) -> Self {
        Self {
            inner: Box::new(connection),
        }
    }

    pub async fn send(&self, peer: &str, text: &str) -> Result<(), TransportError> {
        self.inner.send_boxed(peer, text).await
    }

    pub async fn reclaim(&self) -> Result<(), TransportError> {
        self.inner.reclaim_boxed().await
    }

    pub async fn close(&self) -> Result<(), TransportError> {
        self.inner.close_boxed().await
    }
}

impl std::fmt::Debug for BoxConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxConnection").finish_non_exhaustive()
    }
}

/// Object-safe version of [`Transport`].
pub trait TransportDyn: Send + Sync {
    fn name(&self) -> &str;

    fn open_boxed<'a>(
        &'a self,
        session_id: &'a str,
        events: mpsc::Sender<TransportEvent>,
    ) -> BoxFuture<'a, Result<BoxConnection, TransportError>>;
}

impl<T: Transport> TransportDyn for T {
    fn name(&self) -> &str {
        Transport::name(self)
    }

    fn open_boxed<'a>(
        &'a self,
        session_id: &'a str,
        events: mpsc::Sender<TransportEvent>,
    ) -> BoxFuture<'a, Result<BoxConnection, TransportError>> {
        Box::pin(self.open(session_id, events))
    }
}

/// Type-erased transport for runtime transport selection.
pub struct BoxTransport {
    inner: Box<dyn TransportDyn>,
}

impl BoxTransport {
    pub fn new<T: Transport + 'static>(transport: T) -> Self {
        Self {
            inner: Box::new(transport),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Open the connection for a session. See [`Transport::open`].
    pub fn open<'a>(
        &'a self,
        session_id: &'a str,
        events: mpsc::Sender<TransportEvent>,
    ) -> BoxFuture<'a, Result<BoxConnection, TransportError>> {
        self.inner.open_boxed(session_id, events)
    }
}
