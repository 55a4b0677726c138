use chrono::{DateTime, TimeZone, Utc};
use serde::de::{DeserializeOwned, Error as _};
use serde::Deserialize;

/// An already verified webhook event.
///
/// The router only ever reads an `Event`: it is looked up by its `event_type` and handed by
/// reference to every handler registered for that type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Identifier assigned by the sender, e.g. `evt_1NmQ...`.
    pub id: String,
    /// The type tag used as registry key, e.g. `invoice.paid`.
    pub event_type: String,
    /// When the sender created the event.
    pub created: DateTime<Utc>,
    /// Whether the event comes from live (as opposed to test) mode.
    pub livemode: bool,
    /// The raw, verified payload.
    pub payload: Vec<u8>,
}

#[derive(Deserialize)]
struct Envelope {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    created: i64,
    #[serde(default)]
    livemode: bool,
}

#[derive(Deserialize)]
struct DataEnvelope<T> {
    data: DataObject<T>,
}

#[derive(Deserialize)]
struct DataObject<T> {
    object: T,
}

impl Event {
    /// Creates an event out of its parts, timestamped now.
    pub fn new(id: impl Into<String>, event_type: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            id: id.into(),
            event_type: event_type.into(),
            created: Utc::now(),
            livemode: false,
            payload: payload.into(),
        }
    }

    /// Builds an event out of a JSON envelope shaped like
    /// `{"id": .., "type": .., "created": <unix seconds>, "livemode": .., "data": {"object": ..}}`.
    ///
    /// The given bytes are kept untouched as the event payload.
    pub fn from_json(payload: &[u8]) -> Result<Self, serde_json::Error> {
        let envelope: Envelope = serde_json::from_slice(payload)?;

        let created: DateTime<Utc> = Utc
            .timestamp_opt(envelope.created, 0)
            .single()
            .ok_or_else(|| serde_json::Error::custom(format!("invalid `created` timestamp {}", envelope.created)))?;

        Ok(Self {
            id: envelope.id,
            event_type: envelope.event_type,
            created,
            livemode: envelope.livemode,
            payload: payload.to_vec(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Deserializes the `data.object` field of the payload.
    pub fn data<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        data_object(&self.payload)
    }
}

pub(crate) fn data_object<T: DeserializeOwned>(payload: &[u8]) -> Result<T, serde_json::Error> {
    let envelope: DataEnvelope<T> = serde_json::from_slice(payload)?;
    Ok(envelope.data.object)
}
