use std::fmt::{Display, Formatter};

/// Type-erased error returned by handlers, callbacks and verifiers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A single failure, tagged with the operation that produced it and the arguments it was called with.
#[derive(Debug, thiserror::Error)]
#[error("{source_name} failed for [{joined_args}]: {cause}", joined_args = .args.join(", "))]
pub struct HandlerError {
    source_name: String,
    args: Vec<String>,
    #[source]
    cause: BoxError,
}

impl HandlerError {
    pub fn new(source_name: impl Into<String>, args: Vec<String>, cause: impl Into<BoxError>) -> Self {
        Self {
            source_name: source_name.into(),
            args,
            cause: cause.into(),
        }
    }

    /// The operation which failed, e.g. `dispatch_sequential.handlers[1]`.
    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn cause(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        self.cause.as_ref()
    }
}

/// One or more [`HandlerError`]s collected from a single dispatch.
///
/// An `AggregateError` is never empty: [`AggregateError::new`] refuses to build one out of no errors.
#[derive(Debug)]
pub struct AggregateError(Vec<HandlerError>);

impl AggregateError {
    /// Returns `None` if `errors` is empty.
    pub fn new(errors: Vec<HandlerError>) -> Option<Self> {
        if errors.is_empty() {
            None
        } else {
            Some(Self(errors))
        }
    }

    pub fn single(error: HandlerError) -> Self {
        Self(vec![error])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, HandlerError> {
        self.0.iter()
    }
}

impl Display for AggregateError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (index, error) in self.0.iter().enumerate() {
            if index > 0 {
                f.write_str(" - ")?;
            }
            Display::fmt(error, f)?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {}

impl IntoIterator for AggregateError {
    type Item = HandlerError;
    type IntoIter = std::vec::IntoIter<HandlerError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a AggregateError {
    type Item = &'a HandlerError;
    type IntoIter = std::slice::Iter<'a, HandlerError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Everything that can go wrong while routing an event.
///
/// When a failure handler is registered for the event type it receives this error and its own
/// result becomes the dispatch result.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// No handler has been registered for the event type.
    #[error("no handlers registered for event type `{event_type}`")]
    NotFound { event_type: String },
    /// A handler failed during sequential dispatch.
    #[error(transparent)]
    Handler(HandlerError),
    /// One or more handlers failed during parallel dispatch.
    #[error("{count} handler(s) failed: {0}", count = .0.len())]
    Aggregate(#[from] AggregateError),
    /// Some handlers neither returned a response nor an error.
    #[error("not all the handlers returned a valid response for event {event_id}: expected {expected}, got {received}")]
    IncompleteResult {
        event_id: String,
        expected: usize,
        received: usize,
    },
    /// A success or failure handler returned an error. It renders as that error, untouched;
    /// `callback` names the handler which returned it.
    #[error("{source}")]
    Callback { callback: &'static str, source: BoxError },
    /// The raw payload could not be verified against the webhook secret.
    #[error(transparent)]
    Verification(HandlerError),
}
