//! # Wire Errors
//!
//! Failures cross the gRPC boundary as a [`tonic::Status`] whose message is the
//! error's name and whose `error-bin` metadata entry holds the full JSON form
//! of the error: name, message and every custom field.
//!
//! * [`translate`] turns any failure into such a status. A status that already
//!   carries an `error-bin` entry is returned unchanged.
//! * [`detranslate`] reads the entry back on the calling side, falling back to
//!   the raw status when the entry is missing or unreadable.
use crate::{
    aggregate::AggregateMutateError, crm::CrmError, error::ServiceError,
    validate::ValidationFailure,
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use tonic::{
    Code, Status,
    metadata::{MetadataMap, MetadataValue},
};

/// Metadata key of the serialized error.
pub const ERROR_METADATA_KEY: &str = "error-bin";

const DEFAULT_ERROR_NAME: &str = "Error";

/// The transmissible form of a failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredError {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub message: String,
    /// Custom fields of the original error.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_name() -> String {
    DEFAULT_ERROR_NAME.to_string()
}

impl StructuredError {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            name: if name.is_empty() { default_name() } else { name },
            message: message.into(),
            extra: Map::new(),
        }
    }

    /// Copies the serialized fields of `value` into `extra`, except the ones
    /// that already have a dedicated slot.
    pub fn with_fields_of<T: Serialize>(mut self, value: &T) -> Self {
        if let Ok(Value::Object(fields)) = serde_json::to_value(value) {
            self.extra.extend(
                fields
                    .into_iter()
                    .filter(|(k, _)| k != "name" && k != "message"),
            );
        }
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Rebuilds a typed error from `message` and the custom fields.
    fn typed<T: DeserializeOwned>(&self) -> Option<T> {
        let mut fields = self.extra.clone();
        fields.insert("name".into(), Value::String(self.name.clone()));
        fields.insert("message".into(), Value::String(self.message.clone()));
        serde_json::from_value(Value::Object(fields)).ok()
    }
}

/// Conversion of a failure into a wire status.
pub trait IntoStatus {
    fn into_status(self) -> Status;
}

/// Translates `error` into a status carrying its structured form.
pub fn translate<E: IntoStatus>(error: E) -> Status {
    error.into_status()
}

/// Builds a status from an already structured error.
pub fn structured_status(code: Code, error: &StructuredError) -> Status {
    let mut metadata = MetadataMap::new();

    match serde_json::to_vec(error) {
        Ok(bytes) => {
            metadata.insert_bin(ERROR_METADATA_KEY, MetadataValue::from_bytes(&bytes));
        }
        Err(err) => tracing::warn!(error = %err, "failed to serialize structured error"),
    }

    Status::with_metadata(code, error.name.clone(), metadata)
}

pub fn has_structured_payload(status: &Status) -> bool {
    status.metadata().get_bin(ERROR_METADATA_KEY).is_some()
}

impl IntoStatus for Status {
    fn into_status(self) -> Status {
        if has_structured_payload(&self) {
            return self;
        }

        let error = StructuredError::new(DEFAULT_ERROR_NAME, self.message())
            .with_field("code", Value::from(self.code() as i32));
        structured_status(self.code(), &error)
    }
}

impl IntoStatus for ServiceError {
    fn into_status(self) -> Status {
        let code = match &self {
            ServiceError::Validation(_) => Code::InvalidArgument,
            _ => Code::Internal,
        };
        structured_status(code, &self.to_structured())
    }
}

impl ServiceError {
    /// The name a remote caller sees for this failure.
    pub fn name(&self) -> &str {
        match self {
            ServiceError::Validation(_) => "ValidationError",
            ServiceError::Authentication(_) => "AuthenticationError",
            ServiceError::Crm(err) => &err.name,
            ServiceError::Mutate(_) => "AggregateMutateError",
            ServiceError::Envelope(_) => "EnvelopeError",
            ServiceError::Aborted(_) => "AbortedError",
        }
    }

    pub fn to_structured(&self) -> StructuredError {
        match self {
            ServiceError::Validation(failure) => {
                StructuredError::new(self.name(), failure.to_string()).with_fields_of(failure)
            }
            ServiceError::Authentication(err) => {
                let cause = serde_json::to_value(err).unwrap_or(Value::Null);
                StructuredError::new(self.name(), &err.message).with_field("cause", cause)
            }
            ServiceError::Crm(err) => {
                StructuredError::new(self.name(), &err.message).with_fields_of(err)
            }
            ServiceError::Mutate(err) => {
                StructuredError::new(self.name(), &err.message).with_fields_of(err)
            }
            ServiceError::Envelope(_) | ServiceError::Aborted(_) => {
                StructuredError::new(self.name(), self.to_string())
            }
        }
    }
}

/// An error status received from the service.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("{}: {}", .error.name, .error.message)]
    Structured { code: Code, error: StructuredError },
    #[error("gRPC call failed: {0}")]
    Status(Status),
}

/// Reconstructs the structured error carried by `status`.
pub fn detranslate(status: Status) -> RemoteError {
    let error = status
        .metadata()
        .get_bin(ERROR_METADATA_KEY)
        .and_then(|value| value.to_bytes().ok())
        .and_then(|bytes| serde_json::from_slice::<StructuredError>(&bytes).ok());

    match error {
        Some(error) => RemoteError::Structured {
            code: status.code(),
            error,
        },
        None => RemoteError::Status(status),
    }
}

impl RemoteError {
    pub fn code(&self) -> Code {
        match self {
            RemoteError::Structured { code, .. } => *code,
            RemoteError::Status(status) => status.code(),
        }
    }

    pub fn structured(&self) -> Option<&StructuredError> {
        match self {
            RemoteError::Structured { error, .. } => Some(error),
            RemoteError::Status(_) => None,
        }
    }

    pub fn name(&self) -> &str {
        self.structured()
            .map(|e| e.name.as_str())
            .unwrap_or(DEFAULT_ERROR_NAME)
    }

    pub fn validation_failure(&self) -> Option<ValidationFailure> {
        self.structured()
            .filter(|e| e.name == "ValidationError")
            .and_then(StructuredError::typed)
    }

    pub fn mutate_error(&self) -> Option<AggregateMutateError> {
        self.structured()
            .filter(|e| e.name == "AggregateMutateError")
            .and_then(StructuredError::typed)
    }

    /// A CRM failure, as reported by Salesforce.
    pub fn crm_error(&self) -> Option<CrmError> {
        self.structured()
            .filter(|e| {
                !matches!(
                    e.name.as_str(),
                    "ValidationError" | "AggregateMutateError" | "AuthenticationError"
                )
            })
            .and_then(StructuredError::typed)
    }
}
