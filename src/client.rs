use std::fmt::{Debug, Formatter};

use typed_builder::TypedBuilder;

use crate::dispatcher::Dispatcher;
use crate::error::{BoxError, DispatchError, HandlerError};
use crate::event::Event;
use crate::registry::HandlerRegistry;

#[derive(TypedBuilder, Clone)]
pub struct ClientConfig {
    /// The signing secret the webhook payloads are verified against.
    #[builder(setter(into))]
    pub(crate) webhook_secret: String,
}

impl Debug for ClientConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("webhook_secret", &"<redacted>")
            .finish()
    }
}

/// Checks the integrity of a raw webhook payload against its signature and the signing secret, and
/// builds the verified [`Event`] out of it.
pub trait Verifier: Send + Sync {
    fn verify(&self, payload: &[u8], signature: &str, secret: &str) -> Result<Event, BoxError>;
}

impl<F> Verifier for F
where
    F: Fn(&[u8], &str, &str) -> Result<Event, BoxError> + Send + Sync,
{
    fn verify(&self, payload: &[u8], signature: &str, secret: &str) -> Result<Event, BoxError> {
        self(payload, signature, secret)
    }
}

/// Entry point coupling payload verification with the dispatch of the verified events.
pub struct Client<V> {
    config: ClientConfig,
    verifier: V,
    dispatcher: Dispatcher,
}

impl<V> Client<V>
where
    V: Verifier,
{
    pub fn new(config: ClientConfig, verifier: V, registry: HandlerRegistry) -> Self {
        Self {
            config,
            verifier,
            dispatcher: Dispatcher::new(registry),
        }
    }

    /// Verifies the raw payload against its signature and returns the event it carries.
    #[tracing::instrument(skip_all, err)]
    pub fn event(&self, payload: &[u8], signature: &str) -> Result<Event, DispatchError> {
        self.verifier
            .verify(payload, signature, &self.config.webhook_secret)
            .map_err(|cause| {
                DispatchError::Verification(HandlerError::new("client.event", vec![signature.to_string()], cause))
            })
    }

    /// See [`Dispatcher::dispatch_sequential`].
    pub async fn handle(&self, event: &Event) -> Result<(), DispatchError> {
        self.dispatcher.dispatch_sequential(event).await
    }

    /// See [`Dispatcher::dispatch_parallel`].
    pub async fn handle_parallel(&self, event: &Event) -> Result<(), DispatchError> {
        self.dispatcher.dispatch_parallel(event).await
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }
}
