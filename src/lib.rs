//! Routes verified webhook events to the handlers registered for their type.
//!
//! Handlers are registered in a [`HandlerRegistry`] together with an optional success and failure
//! handler per event type. A [`Dispatcher`] then runs them either one after the other
//! ([`Dispatcher::dispatch_sequential`]) or all at once ([`Dispatcher::dispatch_parallel`]) and
//! calls exactly one of the terminal handlers.

pub use crate::client::{Client, ClientConfig, Verifier};
pub use crate::dispatcher::Dispatcher;
pub use crate::error::{AggregateError, BoxError, DispatchError, HandlerError};
pub use crate::event::Event;
pub use crate::handler::{
    failure_fn, handler_fn, success_fn, EventHandler, FailureHandler, FnFailureHandler, FnHandler,
    FnSuccessHandler, SuccessHandler,
};
pub use crate::registry::HandlerRegistry;
pub use crate::response::{AsAny, EventResponse, JsonResponse};

mod client;
mod dispatcher;
mod error;
mod event;
mod handler;
mod registry;
mod response;
