//! # CRM Adapter
//!
//! The explicit set of Salesforce capabilities the facade relies on. A
//! concrete binding implements [`CrmConnection`]; nothing else about the
//! SDK leaks into the core.
//!
//! A connection holds the authenticated state of exactly one session, so a
//! [`ConnectionFactory`] hands out a fresh connection for every call.
use crate::session::Credentials;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A failure reported by the CRM or by the transport used to reach it.
///
/// `name` carries the CRM's own error code (e.g. `INVALID_FIELD`) so it can be
/// surfaced unchanged to remote callers.
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize, Deserialize)]
#[error("{name}: {message}")]
pub struct CrmError {
    pub name: String,
    pub message: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl CrmError {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            fields: Map::new(),
        }
    }

    /// Attaches a custom field that travels with the error.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

/// One entry of a failed record's error list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureDetail {
    pub status_code: String,
    pub message: String,
    #[serde(default)]
    pub fields: Vec<String>,
}

/// The per-record result of a batch mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawRecordResult", into = "RawRecordResult")]
pub enum RecordOutcome {
    Success { id: String },
    Failure { errors: Vec<FailureDetail> },
}

impl RecordOutcome {
    pub fn success(id: impl Into<String>) -> Self {
        RecordOutcome::Success { id: id.into() }
    }

    pub fn failure(errors: Vec<FailureDetail>) -> Self {
        RecordOutcome::Failure { errors }
    }
}

/// The wire shape used by Salesforce: `{ id, success, errors }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawRecordResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    success: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    errors: Vec<FailureDetail>,
}

impl TryFrom<RawRecordResult> for RecordOutcome {
    type Error = String;

    fn try_from(raw: RawRecordResult) -> Result<Self, Self::Error> {
        match (raw.success, raw.id) {
            (true, Some(id)) => Ok(RecordOutcome::Success { id }),
            (true, None) => Err("successful record result without an id".to_string()),
            (false, _) => Ok(RecordOutcome::Failure { errors: raw.errors }),
        }
    }
}

impl From<RecordOutcome> for RawRecordResult {
    fn from(outcome: RecordOutcome) -> Self {
        match outcome {
            RecordOutcome::Success { id } => RawRecordResult {
                id: Some(id),
                success: true,
                errors: vec![],
            },
            RecordOutcome::Failure { errors } => RawRecordResult {
                id: None,
                success: false,
                errors,
            },
        }
    }
}

/// The Salesforce operations used by the service facade.
#[tonic::async_trait]
pub trait CrmConnection: Send + Sync {
    async fn login(&self, credentials: &Credentials) -> Result<(), CrmError>;

    async fn logout(&self) -> Result<(), CrmError>;

    /// Runs a SOQL query.
    async fn query(&self, soql: &str) -> Result<Value, CrmError>;

    /// Runs a SOSL search.
    async fn search(&self, sosl: &str) -> Result<Value, CrmError>;

    async fn describe(&self, object: &str) -> Result<Value, CrmError>;

    async fn retrieve(&self, object: &str, ids: &[String]) -> Result<Value, CrmError>;

    async fn create(
        &self,
        object: &str,
        records: Vec<Map<String, Value>>,
    ) -> Result<Vec<RecordOutcome>, CrmError>;

    async fn update(
        &self,
        object: &str,
        records: Vec<Map<String, Value>>,
    ) -> Result<Vec<RecordOutcome>, CrmError>;

    async fn delete(&self, object: &str, ids: &[String]) -> Result<Vec<RecordOutcome>, CrmError>;

    /// Inserts or updates records, matching existing ones on `ext_id_field`.
    async fn upsert(
        &self,
        object: &str,
        records: Vec<Map<String, Value>>,
        ext_id_field: &str,
    ) -> Result<Vec<RecordOutcome>, CrmError>;

    /// Scopes record operations to a single sObject type.
    fn sobject<'a>(&'a self, name: &'a str) -> SObject<'a, Self>
    where
        Self: Sized,
    {
        SObject { conn: self, name }
    }
}

/// Record operations bound to one sObject type, e.g. `conn.sobject("Contact")`.
pub struct SObject<'a, C> {
    conn: &'a C,
    name: &'a str,
}

impl<C: CrmConnection> SObject<'_, C> {
    pub async fn describe(&self) -> Result<Value, CrmError> {
        self.conn.describe(self.name).await
    }

    pub async fn retrieve(&self, ids: &[String]) -> Result<Value, CrmError> {
        self.conn.retrieve(self.name, ids).await
    }

    pub async fn create(
        &self,
        records: Vec<Map<String, Value>>,
    ) -> Result<Vec<RecordOutcome>, CrmError> {
        self.conn.create(self.name, records).await
    }

    pub async fn update(
        &self,
        records: Vec<Map<String, Value>>,
    ) -> Result<Vec<RecordOutcome>, CrmError> {
        self.conn.update(self.name, records).await
    }

    pub async fn delete(&self, ids: &[String]) -> Result<Vec<RecordOutcome>, CrmError> {
        self.conn.delete(self.name, ids).await
    }

    pub async fn upsert(
        &self,
        records: Vec<Map<String, Value>>,
        ext_id_field: &str,
    ) -> Result<Vec<RecordOutcome>, CrmError> {
        self.conn.upsert(self.name, records, ext_id_field).await
    }
}

/// Hands out a fresh, unauthenticated connection for each call.
pub trait ConnectionFactory: Send + Sync + 'static {
    type Connection: CrmConnection + 'static;

    fn connect(&self) -> Self::Connection;
}

impl<F, C> ConnectionFactory for F
where
    F: Fn() -> C + Send + Sync + 'static,
    C: CrmConnection + 'static,
{
    type Connection = C;

    fn connect(&self) -> C {
        self()
    }
}
