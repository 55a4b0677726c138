use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::Instrument;
use uuid::Uuid;

use crate::error::{AggregateError, BoxError, DispatchError, HandlerError};
use crate::event::Event;
use crate::handler::EventHandler;
use crate::registry::HandlerRegistry;
use crate::response::EventResponse;

/// The Dispatcher is responsible for routing an event to the handlers registered for its type and
/// for invoking exactly one terminal callback afterwards.
///
/// The basic APIs are:
/// 1. dispatch_sequential
/// 2. dispatch_parallel
pub struct Dispatcher {
    registry: HandlerRegistry,
}

impl Dispatcher {
    /// Creates a new instance of a [`Dispatcher`] owning the given registry.
    pub fn new(registry: HandlerRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Runs the handlers of the event type one after the other, in registration order.
    ///
    /// The first failing handler stops the dispatch: the remaining handlers never run, and the
    /// error goes to the failure handler of the event type if any, or is returned otherwise.
    /// When every handler succeeded the success handler, if any, receives the responses in
    /// handler order.
    #[tracing::instrument(
        skip_all,
        fields(dispatch_id = %Uuid::new_v4(), event_id = %event.id, event_type = %event.event_type),
        err
    )]
    pub async fn dispatch_sequential(&self, event: &Event) -> Result<(), DispatchError> {
        let handlers: &[Arc<dyn EventHandler>] = self.resolve(event)?;
        let mut responses: Vec<Box<dyn EventResponse>> = Vec::with_capacity(handlers.len());

        for (index, handler) in handlers.iter().enumerate() {
            let span = tracing::debug_span!(
                "hookrs.event_handler",
                event_id = %event.id,
                event_type = %event.event_type,
                event_handler = handler.name(),
                index
            );

            match handler.handle(event).instrument(span).await {
                Ok(response) => responses.push(response),
                Err(cause) => {
                    let error: HandlerError = handler_error("dispatch_sequential", index, handler.name(), event, cause);
                    return self.fail(event, DispatchError::Handler(error)).await;
                }
            }
        }

        self.succeed(event, responses).await
    }

    /// Runs every handler of the event type concurrently, one task each, and waits for all of them.
    ///
    /// A failing handler does not stop the others. Once every task completed, the errors (if any)
    /// are collected into an [`AggregateError`] and handed to the failure handler, or returned.
    /// Otherwise the success handler receives the responses in completion order.
    ///
    /// Must be called from within a tokio runtime. There is no timeout: a handler that never
    /// returns blocks the dispatch forever.
    #[tracing::instrument(
        skip_all,
        fields(dispatch_id = %Uuid::new_v4(), event_id = %event.id, event_type = %event.event_type),
        err
    )]
    pub async fn dispatch_parallel(&self, event: &Event) -> Result<(), DispatchError> {
        let handlers: &[Arc<dyn EventHandler>] = self.resolve(event)?;
        let expected: usize = handlers.len();

        let shared_event: Arc<Event> = Arc::new(event.clone());
        // Every task sends at most one message per channel, so no send ever waits.
        let (error_tx, mut error_rx) = mpsc::channel::<HandlerError>(expected);
        let (response_tx, mut response_rx) = mpsc::channel::<Box<dyn EventResponse>>(expected);

        let tasks: Vec<JoinHandle<()>> = handlers
            .iter()
            .enumerate()
            .map(|(index, handler)| {
                let handler: Arc<dyn EventHandler> = Arc::clone(handler);
                let event: Arc<Event> = Arc::clone(&shared_event);
                let error_tx: mpsc::Sender<HandlerError> = error_tx.clone();
                let response_tx: mpsc::Sender<Box<dyn EventResponse>> = response_tx.clone();

                let span = tracing::debug_span!(
                    "hookrs.event_handler",
                    event_id = %event.id,
                    event_type = %event.event_type,
                    event_handler = handler.name(),
                    index
                );

                tokio::spawn(
                    async move {
                        match handler.handle(&event).await {
                            Ok(response) => {
                                let _ = response_tx.send(response).await;
                            }
                            Err(cause) => {
                                let error: HandlerError =
                                    handler_error("dispatch_parallel", index, handler.name(), &event, cause);
                                let _ = error_tx.send(error).await;
                            }
                        }
                    }
                    .instrument(span),
                )
            })
            .collect();

        drop(error_tx);
        drop(response_tx);

        for (index, outcome) in futures::future::join_all(tasks).await.into_iter().enumerate() {
            if let Err(join_error) = outcome {
                tracing::error!({
                    event_id = %event.id,
                    event_type = %event.event_type,
                    event_handler = handlers[index].name(),
                    index,
                    error = %join_error,
                }, "event handler task did not complete");
            }
        }

        let mut errors: Vec<HandlerError> = Vec::new();
        while let Some(error) = error_rx.recv().await {
            errors.push(error);
        }

        let mut responses: Vec<Box<dyn EventResponse>> = Vec::with_capacity(expected);
        while let Some(response) = response_rx.recv().await {
            responses.push(response);
        }

        if let Some(aggregate) = AggregateError::new(errors) {
            return self.fail(event, DispatchError::Aggregate(aggregate)).await;
        }

        if responses.len() != expected {
            let error: DispatchError = DispatchError::IncompleteResult {
                event_id: event.id.clone(),
                expected,
                received: responses.len(),
            };
            return self.fail(event, error).await;
        }

        self.succeed(event, responses).await
    }

    fn resolve(&self, event: &Event) -> Result<&[Arc<dyn EventHandler>], DispatchError> {
        self.registry.resolve(&event.event_type).map_err(|error| {
            tracing::warn!({
                event_id = %event.id,
                event_type = %event.event_type,
            }, "no handlers registered for event type");
            error
        })
    }

    async fn fail(&self, event: &Event, error: DispatchError) -> Result<(), DispatchError> {
        let Some(failure_handler) = self.registry.failure_handler(&event.event_type) else {
            return Err(error);
        };

        let span = tracing::debug_span!(
            "hookrs.failure_handler",
            event_id = %event.id,
            event_type = %event.event_type,
            failure_handler = failure_handler.name()
        );

        failure_handler
            .on_failure(event, &error)
            .instrument(span)
            .await
            .map_err(|source| DispatchError::Callback {
                callback: failure_handler.name(),
                source,
            })
    }

    async fn succeed(&self, event: &Event, responses: Vec<Box<dyn EventResponse>>) -> Result<(), DispatchError> {
        let Some(success_handler) = self.registry.success_handler(&event.event_type) else {
            return Ok(());
        };

        let span = tracing::debug_span!(
            "hookrs.success_handler",
            event_id = %event.id,
            event_type = %event.event_type,
            success_handler = success_handler.name(),
            responses = responses.len()
        );

        success_handler
            .on_success(event, responses)
            .instrument(span)
            .await
            .map(|_| ())
            .map_err(|source| DispatchError::Callback {
                callback: success_handler.name(),
                source,
            })
    }
}

fn handler_error(strategy: &str, index: usize, name: &'static str, event: &Event, cause: BoxError) -> HandlerError {
    tracing::error!({
        event_id = %event.id,
        event_type = %event.event_type,
        event_handler = name,
        index,
        error = %cause,
    }, "event handler failed to handle event");

    HandlerError::new(
        format!("{}.handlers[{}]", strategy, index),
        vec![event.id.clone(), event.event_type.clone()],
        cause,
    )
}
