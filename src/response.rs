use std::any::Any;
use std::fmt::Debug;

use serde::de::DeserializeOwned;

use crate::error::BoxError;
use crate::event::{data_object, Event};

/// The value a handler computes out of an event.
///
/// Responses are opaque to the router; the only capability they share is `parse_data`, which
/// turns the raw event payload into the response's typed representation.
pub trait EventResponse: AsAny + Debug + Send + Sync {
    fn parse_data(&mut self) -> Result<(), BoxError>;
}

/// Upcast helper making `dyn EventResponse` downcastable to its concrete type.
pub trait AsAny {
    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl dyn EventResponse {
    pub fn downcast_ref<T: EventResponse + 'static>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: EventResponse + 'static>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }
}

/// A response holding the payload of an event, parsed on demand into `T` out of its `data.object` field.
#[derive(Debug)]
pub struct JsonResponse<T> {
    payload: Vec<u8>,
    data: Option<T>,
}

impl<T> JsonResponse<T>
where
    T: DeserializeOwned + Debug + Send + Sync + 'static,
{
    pub fn new(event: &Event) -> Self {
        Self {
            payload: event.payload.clone(),
            data: None,
        }
    }

    /// Builds the response and parses it right away.
    pub fn parsed(event: &Event) -> Result<Self, BoxError> {
        let mut response: Self = Self::new(event);
        response.parse_data()?;
        Ok(response)
    }

    /// The parsed data, `None` until [`EventResponse::parse_data`] succeeded.
    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    pub fn into_data(self) -> Option<T> {
        self.data
    }
}

impl<T> EventResponse for JsonResponse<T>
where
    T: DeserializeOwned + Debug + Send + Sync + 'static,
{
    fn parse_data(&mut self) -> Result<(), BoxError> {
        self.data = Some(data_object(&self.payload)?);
        Ok(())
    }
}
