//! Event handler trait and closure adapter.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use resonance_core::events::Event;
use resonance_core::result::AppResult;

/// Receives events published on a subscribed topic.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handles one event. Errors are logged by the bus and never reach the publisher.
    async fn handle(&self, event: &Event) -> AppResult<()>;
}

type BoxedEventFn = dyn Fn(Event) -> BoxFuture<'static, AppResult<()>> + Send + Sync;

/// Adapts an async closure into an [`EventHandler`].
#[derive(Clone)]
pub struct FnEventHandler {
    handler: Arc<BoxedEventFn>,
}

impl FnEventHandler {
    /// Wraps `f`, which receives an owned copy of each event.
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = AppResult<()>> + Send + 'static,
    {
        Self {
            handler: Arc::new(move |event: Event| -> BoxFuture<'static, AppResult<()>> {
                Box::pin(f(event))
            }),
        }
    }
}

impl fmt::Debug for FnEventHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnEventHandler").finish_non_exhaustive()
    }
}

#[async_trait]
impl EventHandler for FnEventHandler {
    async fn handle(&self, event: &Event) -> AppResult<()> {
        (self.handler)(event.clone()).await
    }
}
