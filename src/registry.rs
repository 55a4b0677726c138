use std::collections::HashMap;
use std::sync::Arc;

use crate::error::DispatchError;
use crate::handler::{EventHandler, FailureHandler, SuccessHandler};

/// Maps every event type to the handlers that process it, and to its optional success and
/// failure handlers.
///
/// Registration needs a mutable borrow, so it has to be completed before the registry is handed
/// to a [`crate::Dispatcher`]. Handler lists are append-only and keep their registration order.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Vec<Arc<dyn EventHandler>>>,
    success_handlers: HashMap<String, Arc<dyn SuccessHandler>>,
    failure_handlers: HashMap<String, Arc<dyn FailureHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `handlers` to the list of the given event type.
    ///
    /// Registering the same handler twice makes it run twice per dispatch. An empty `handlers`
    /// leaves the registry untouched.
    pub fn register<I>(&mut self, event_type: impl Into<String>, handlers: I) -> &mut Self
    where
        I: IntoIterator<Item = Arc<dyn EventHandler>>,
    {
        let mut handlers = handlers.into_iter().peekable();

        if handlers.peek().is_some() {
            self.handlers.entry(event_type.into()).or_default().extend(handlers);
        }

        self
    }

    /// Appends a single handler to the list of the given event type.
    pub fn register_handler(
        &mut self,
        event_type: impl Into<String>,
        handler: impl EventHandler + 'static,
    ) -> &mut Self {
        let handler: Arc<dyn EventHandler> = Arc::new(handler);
        self.register(event_type, [handler])
    }

    /// Sets the success handler of the given event type, replacing any previous one.
    pub fn set_success_handler(
        &mut self,
        event_type: impl Into<String>,
        handler: impl SuccessHandler + 'static,
    ) -> &mut Self {
        self.success_handlers.insert(event_type.into(), Arc::new(handler));
        self
    }

    /// Sets the failure handler of the given event type, replacing any previous one.
    pub fn set_failure_handler(
        &mut self,
        event_type: impl Into<String>,
        handler: impl FailureHandler + 'static,
    ) -> &mut Self {
        self.failure_handlers.insert(event_type.into(), Arc::new(handler));
        self
    }

    /// Returns the handlers of the given event type, in registration order.
    ///
    /// Fails with [`DispatchError::NotFound`] if none has been registered. The returned slice is
    /// never empty.
    pub fn resolve(&self, event_type: &str) -> Result<&[Arc<dyn EventHandler>], DispatchError> {
        self.handlers
            .get(event_type)
            .map(Vec::as_slice)
            .ok_or_else(|| DispatchError::NotFound {
                event_type: event_type.to_string(),
            })
    }

    pub fn success_handler(&self, event_type: &str) -> Option<&Arc<dyn SuccessHandler>> {
        self.success_handlers.get(event_type)
    }

    pub fn failure_handler(&self, event_type: &str) -> Option<&Arc<dyn FailureHandler>> {
        self.failure_handlers.get(event_type)
    }

    pub fn handler_count(&self, event_type: &str) -> usize {
        self.handlers.get(event_type).map_or(0, Vec::len)
    }

    /// Every event type having at least one handler, in no particular order.
    pub fn event_types(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }
}
