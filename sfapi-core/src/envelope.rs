//! # Payload Envelope
//!
//! Records and results cross the wire as JSON text wrapped in a `JsonObject`
//! message, so the Protobuf schema never has to enumerate sObject shapes.
//!
//! [`Envelope`] is the domain side of that message. The JSON is parsed lazily,
//! at most once per instance, and can then be decoded into whatever type the
//! call site expects:
//!
//! ```rust
//! use sfapi_core::envelope::Envelope;
//!
//! # fn run() -> Result<(), sfapi_core::envelope::EnvelopeError> {
//! let envelope = Envelope::encode(&serde_json::json!({ "FirstName": "Ada" }))?;
//! let record: Option<serde_json::Value> = envelope.decode()?;
//! assert_eq!(record.unwrap()["FirstName"], "Ada");
//! # Ok(())
//! # }
//! ```
use serde::{Serialize, de::DeserializeOwned};
use sfapi_proto::pb::JsonObject;
use std::sync::OnceLock;

#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("Failed to serialize payload: '{0}'")]
    Encode(#[source] serde_json::Error),
    #[error("Envelope contents are not valid JSON: '{0}'")]
    Parse(#[source] serde_json::Error),
    #[error("Envelope contents do not match the expected shape: '{0}'")]
    Shape(#[source] serde_json::Error),
    #[error("Envelope contents are absent")]
    Absent,
}

/// A serialized JSON payload.
///
/// `contents` is optional because the wire field is declared `optional`; a
/// missing payload is reported as `None` by [`Envelope::decode`] rather than
/// as an error.
#[derive(Debug, Clone, Default)]
pub struct Envelope {
    contents: Option<String>,
    parsed: OnceLock<serde_json::Value>,
}

impl Envelope {
    /// Serializes `value` and wraps it.
    pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Self, EnvelopeError> {
        let contents = serde_json::to_string(value).map_err(EnvelopeError::Encode)?;
        Ok(Self::from_contents(contents))
    }

    /// Encodes every value of `values` into its own envelope.
    pub fn encode_all<T: Serialize>(values: &[T]) -> Result<Vec<Self>, EnvelopeError> {
        values.iter().map(Self::encode).collect()
    }

    /// Wraps already serialized JSON text without parsing it.
    pub fn from_contents(contents: impl Into<String>) -> Self {
        Self {
            contents: Some(contents.into()),
            parsed: OnceLock::new(),
        }
    }

    /// An envelope without contents.
    pub fn absent() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> Option<&str> {
        self.contents.as_deref()
    }

    pub fn is_absent(&self) -> bool {
        self.contents.is_none()
    }

    /// Returns the parsed JSON value, parsing the contents on first access.
    pub fn value(&self) -> Result<Option<&serde_json::Value>, EnvelopeError> {
        let Some(contents) = &self.contents else {
            return Ok(None);
        };

        if let Some(value) = self.parsed.get() {
            return Ok(Some(value));
        }

        let value = serde_json::from_str(contents).map_err(EnvelopeError::Parse)?;
        // Another reader may have won the race; both parsed the same text.
        let _ = self.parsed.set(value);

        Ok(self.parsed.get())
    }

    /// Decodes the contents into `T`, propagating absence as `Ok(None)`.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<Option<T>, EnvelopeError> {
        match self.value()? {
            Some(value) => T::deserialize(value)
                .map(Some)
                .map_err(EnvelopeError::Shape),
            None => Ok(None),
        }
    }

    /// Decodes the contents into `T`, treating absence as an error.
    pub fn require<T: DeserializeOwned>(&self) -> Result<T, EnvelopeError> {
        self.decode()?.ok_or(EnvelopeError::Absent)
    }
}

impl PartialEq for Envelope {
    fn eq(&self, other: &Self) -> bool {
        self.contents == other.contents
    }
}

impl From<JsonObject> for Envelope {
    fn from(message: JsonObject) -> Self {
        Self {
            contents: message.contents,
            parsed: OnceLock::new(),
        }
    }
}

impl From<Envelope> for JsonObject {
    fn from(envelope: Envelope) -> Self {
        JsonObject {
            contents: envelope.contents,
        }
    }
}
