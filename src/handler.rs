use std::ops::Deref;

use async_trait::async_trait;

use crate::error::{BoxError, DispatchError};
use crate::event::Event;
use crate::response::EventResponse;

/// This trait is used to implement an `EventHandler`. An event handler computes a response out of a
/// verified event, and is registered under one event type.
///
/// Under parallel dispatch handlers run concurrently with each other: they must treat the event as
/// read-only and must not rely on the side effects of other handlers.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handle an event and compute a response.
    async fn handle(&self, event: &Event) -> Result<Box<dyn EventResponse>, BoxError>;

    /// The name of the event handler. By default, this is the type name of the event handler,
    /// but it can be overridden to provide a custom name. This name is used as
    /// part of tracing spans, to identify the event handler being run.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

#[async_trait]
impl<Q, T> EventHandler for T
where
    Q: EventHandler + ?Sized,
    T: Deref<Target = Q> + Send + Sync,
{
    /// Deref call to [`EventHandler::handle`].
    async fn handle(&self, event: &Event) -> Result<Box<dyn EventResponse>, BoxError> {
        self.deref().handle(event).await
    }

    /// Deref call to [`EventHandler::name`].
    fn name(&self) -> &'static str {
        self.deref().name()
    }
}

/// Called once with every response when all the handlers of an event type succeeded.
///
/// The response it returns is discarded by the dispatcher; only its error is surfaced.
#[async_trait]
pub trait SuccessHandler: Send + Sync {
    async fn on_success(
        &self,
        event: &Event,
        responses: Vec<Box<dyn EventResponse>>,
    ) -> Result<Box<dyn EventResponse>, BoxError>;

    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Called once when dispatching an event type failed.
///
/// Returning `Ok(())` absorbs the failure: the dispatch is then considered successful.
#[async_trait]
pub trait FailureHandler: Send + Sync {
    async fn on_failure(&self, event: &Event, error: &DispatchError) -> Result<(), BoxError>;

    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// An [`EventHandler`] backed by a plain function. See [`handler_fn`].
pub struct FnHandler<F> {
    name: &'static str,
    f: F,
}

/// Wraps a synchronous function into an [`EventHandler`] named `name`.
pub fn handler_fn<F, R>(name: &'static str, f: F) -> FnHandler<F>
where
    F: Fn(&Event) -> Result<R, BoxError> + Send + Sync,
    R: EventResponse + 'static,
{
    FnHandler { name, f }
}

#[async_trait]
impl<F, R> EventHandler for FnHandler<F>
where
    F: Fn(&Event) -> Result<R, BoxError> + Send + Sync,
    R: EventResponse + 'static,
{
    async fn handle(&self, event: &Event) -> Result<Box<dyn EventResponse>, BoxError> {
        let response: R = (self.f)(event)?;
        Ok(Box::new(response))
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

/// A [`SuccessHandler`] backed by a plain function. See [`success_fn`].
pub struct FnSuccessHandler<F> {
    name: &'static str,
    f: F,
}

pub fn success_fn<F, R>(name: &'static str, f: F) -> FnSuccessHandler<F>
where
    F: Fn(&Event, Vec<Box<dyn EventResponse>>) -> Result<R, BoxError> + Send + Sync,
    R: EventResponse + 'static,
{
    FnSuccessHandler { name, f }
}

#[async_trait]
impl<F, R> SuccessHandler for FnSuccessHandler<F>
where
    F: Fn(&Event, Vec<Box<dyn EventResponse>>) -> Result<R, BoxError> + Send + Sync,
    R: EventResponse + 'static,
{
    async fn on_success(
        &self,
        event: &Event,
        responses: Vec<Box<dyn EventResponse>>,
    ) -> Result<Box<dyn EventResponse>, BoxError> {
        let response: R = (self.f)(event, responses)?;
        Ok(Box::new(response))
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

/// A [`FailureHandler`] backed by a plain function. See [`failure_fn`].
pub struct FnFailureHandler<F> {
    name: &'static str,
    f: F,
}

pub fn failure_fn<F>(name: &'static str, f: F) -> FnFailureHandler<F>
where
    F: Fn(&Event, &DispatchError) -> Result<(), BoxError> + Send + Sync,
{
    FnFailureHandler { name, f }
}

#[async_trait]
impl<F> FailureHandler for FnFailureHandler<F>
where
    F: Fn(&Event, &DispatchError) -> Result<(), BoxError> + Send + Sync,
{
    async fn on_failure(&self, event: &Event, error: &DispatchError) -> Result<(), BoxError> {
        (self.f)(event, error)
    }

    fn name(&self) -> &'static str {
        self.name
    }
}
