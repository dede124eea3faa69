//! # Salesforce Client
//!
//! A typed client for the Salesforce microservice. It hides the envelope
//! encoding of records and results, and reconstructs structured errors from
//! failed calls.
//!
//! ```rust,no_run
//! use sfapi_core::client::{QueryResult, SalesforceClient};
//! use sfapi_core::request::QueryRequest;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let mut client = SalesforceClient::connect("http://localhost:8888").await?;
//!
//! let req = QueryRequest::new(["Id", "Name"], "Account").with_clauses("Name LIKE 'Acme%'");
//! let res: QueryResult<serde_json::Value> = client.query(req).await?;
//! # Ok(())
//! # }
//! ```
use crate::{
    BoxError,
    aggregate::SuccessOutcome,
    envelope::{Envelope, EnvelopeError},
    request::{
        DescribeRequest, IdRequest, QueryRequest, RecordsRequest, SearchRequest, UpsertRequest,
    },
    status::{RemoteError, detranslate},
};
use http_body::Body as HttpBody;
use serde::{Deserialize, de::DeserializeOwned};
use sfapi_proto::{SalesforceMicroserviceClient, pb::JsonObject};
use tonic::{
    Response, Status,
    client::GrpcService,
    transport::{Channel, Endpoint},
};

/// Errors that can occur when connecting to the service.
#[derive(Debug, thiserror::Error)]
pub enum ClientConnectError {
    #[error("Invalid URL '{0}': {1}")]
    InvalidUrl(String, #[source] tonic::transport::Error),
    #[error("Failed to connect to '{0}': {1}")]
    ConnectionFailed(String, #[source] tonic::transport::Error),
}

/// Errors that can occur during a call.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Failed to read the response payload: '{0}'")]
    Envelope(#[from] EnvelopeError),
    #[error("The service returned an empty response")]
    EmptyResponse,
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

/// The result of a SOQL query.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult<T> {
    pub total_size: u64,
    pub done: bool,
    pub records: Vec<T>,
    #[serde(default)]
    pub next_records_url: Option<String>,
}

/// The result of a SOSL search.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult<T> {
    pub search_records: Vec<T>,
}

pub struct SalesforceClient<S = Channel> {
    inner: SalesforceMicroserviceClient<S>,
}

impl SalesforceClient<Channel> {
    /// Connects to the service at `addr` (e.g. `http://localhost:8888`).
    pub async fn connect(addr: &str) -> Result<Self, ClientConnectError> {
        let endpoint = Endpoint::new(addr.to_string())
            .map_err(|e| ClientConnectError::InvalidUrl(addr.to_string(), e))?;

        let channel = endpoint
            .connect()
            .await
            .map_err(|e| ClientConnectError::ConnectionFailed(addr.to_string(), e))?;

        Ok(Self::from_service(channel))
    }
}

impl<S> SalesforceClient<S>
where
    S: GrpcService<tonic::body::Body>,
    S::Error: Into<BoxError>,
    S::ResponseBody: HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
    <S::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
{
    /// Creates a client from an existing Tonic service/channel.
    pub fn from_service(service: S) -> Self {
        Self {
            inner: SalesforceMicroserviceClient::new(service),
        }
    }

    /// Query records using SOQL `SELECT`.
    pub async fn query<T: DeserializeOwned>(
        &mut self,
        req: QueryRequest,
    ) -> Result<QueryResult<T>, ClientError> {
        read(self.inner.query(sfapi_proto::pb::QueryRequest::from(req)).await)
    }

    /// Retrieve records by id.
    pub async fn retrieve<T: DeserializeOwned>(&mut self, req: IdRequest) -> Result<T, ClientError> {
        read(self.inner.retrieve(sfapi_proto::pb::IdRequest::from(req)).await)
    }

    pub async fn create(&mut self, req: RecordsRequest) -> Result<Vec<SuccessOutcome>, ClientError> {
        read(self.inner.create(sfapi_proto::pb::RecordsRequest::from(req)).await)
    }

    pub async fn update(&mut self, req: RecordsRequest) -> Result<Vec<SuccessOutcome>, ClientError> {
        read(self.inner.update(sfapi_proto::pb::RecordsRequest::from(req)).await)
    }

    pub async fn delete(&mut self, req: IdRequest) -> Result<Vec<SuccessOutcome>, ClientError> {
        read(self.inner.delete(sfapi_proto::pb::IdRequest::from(req)).await)
    }

    pub async fn upsert(&mut self, req: UpsertRequest) -> Result<Vec<SuccessOutcome>, ClientError> {
        read(self.inner.upsert(sfapi_proto::pb::UpsertRequest::from(req)).await)
    }

    /// Describe an sObject type.
    pub async fn describe(&mut self, object: &str) -> Result<serde_json::Value, ClientError> {
        let req = sfapi_proto::pb::DescribeRequest::from(DescribeRequest::new(object));
        read(self.inner.describe(req).await)
    }

    /// Execute a SOSL search.
    pub async fn search<T: DeserializeOwned>(
        &mut self,
        req: SearchRequest,
    ) -> Result<SearchResult<T>, ClientError> {
        read(self.inner.search(sfapi_proto::pb::SearchRequest::from(req)).await)
    }
}

fn read<T: DeserializeOwned>(
    response: Result<Response<JsonObject>, Status>,
) -> Result<T, ClientError> {
    let envelope = Envelope::from(response.map_err(detranslate)?.into_inner());
    envelope.decode()?.ok_or(ClientError::EmptyResponse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::ServiceError, status::translate};

    #[test]
    fn absent_response_is_an_error() {
        let res = read::<serde_json::Value>(Ok(Response::new(JsonObject { contents: None })));
        assert!(matches!(res, Err(ClientError::EmptyResponse)));
    }

    #[test]
    fn error_statuses_are_detranslated() {
        let status = translate(ServiceError::Crm(crate::crm::CrmError::new(
            "NOT_FOUND",
            "Provided external ID field does not exist or is not accessible",
        )));

        let res = read::<serde_json::Value>(Err(status));

        match res {
            Err(ClientError::Remote(remote)) => assert_eq!(remote.name(), "NOT_FOUND"),
            other => panic!("Expected a remote error, got {other:?}"),
        }
    }
}
