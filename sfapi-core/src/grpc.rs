//! # gRPC Binding
//!
//! Wires [`SalesforceService`] into the generated `SalesforceMicroservice`
//! trait. Every RPC goes through [`handle_unary`], which converts the wire
//! request, logs the outcome and translates failures into structured
//! statuses.
use crate::{
    crm::ConnectionFactory,
    envelope::Envelope,
    error::ServiceError,
    service::SalesforceService,
    status::translate,
};
use sfapi_proto::{
    SalesforceMicroservice, SalesforceMicroserviceServer,
    pb::{
        DescribeRequest, IdRequest, JsonObject, QueryRequest, RecordsRequest, SearchRequest,
        UpsertRequest,
    },
};
use std::future::Future;
use tonic::{Request, Response, Status};
use tracing::Instrument;

impl<F: ConnectionFactory> SalesforceService<F> {
    /// Wraps the service into a tonic server.
    pub fn into_server(self) -> SalesforceMicroserviceServer<Self> {
        SalesforceMicroserviceServer::new(self)
    }
}

/// Runs one unary call, logging and translating its failure.
pub async fn handle_unary<Fut>(
    operation: &'static str,
    call: Fut,
) -> Result<Response<JsonObject>, Status>
where
    Fut: Future<Output = Result<Envelope, ServiceError>>,
{
    let span = tracing::info_span!("rpc", operation);

    async move {
        tracing::debug!("request received");

        match call.await {
            Ok(envelope) => {
                tracing::debug!("request succeeded");
                Ok(Response::new(envelope.into()))
            }
            Err(err) => {
                let detail = serde_json::to_string(&err.to_structured()).unwrap_or_default();

                if matches!(err, ServiceError::Mutate(_)) {
                    tracing::error!(%detail, "records partially failed in {operation}()");
                } else {
                    tracing::error!(%detail, "error in {operation}()");
                }

                Err(translate(err))
            }
        }
    }
    .instrument(span)
    .await
}

#[tonic::async_trait]
impl<F: ConnectionFactory> SalesforceMicroservice for SalesforceService<F> {
    async fn query(&self, req: Request<QueryRequest>) -> Result<Response<JsonObject>, Status> {
        handle_unary("query", SalesforceService::query(self, req.into_inner().into())).await
    }

    async fn retrieve(&self, req: Request<IdRequest>) -> Result<Response<JsonObject>, Status> {
        handle_unary(
            "retrieve",
            SalesforceService::retrieve(self, req.into_inner().into()),
        )
        .await
    }

    async fn create(&self, req: Request<RecordsRequest>) -> Result<Response<JsonObject>, Status> {
        handle_unary("create", SalesforceService::create(self, req.into_inner().into())).await
    }

    async fn update(&self, req: Request<RecordsRequest>) -> Result<Response<JsonObject>, Status> {
        handle_unary("update", SalesforceService::update(self, req.into_inner().into())).await
    }

    async fn delete(&self, req: Request<IdRequest>) -> Result<Response<JsonObject>, Status> {
        handle_unary("delete", SalesforceService::delete(self, req.into_inner().into())).await
    }

    async fn upsert(&self, req: Request<UpsertRequest>) -> Result<Response<JsonObject>, Status> {
        handle_unary("upsert", SalesforceService::upsert(self, req.into_inner().into())).await
    }

    async fn describe(
        &self,
        req: Request<DescribeRequest>,
    ) -> Result<Response<JsonObject>, Status> {
        handle_unary(
            "describe",
            SalesforceService::describe(self, req.into_inner().into()),
        )
        .await
    }

    async fn search(&self, req: Request<SearchRequest>) -> Result<Response<JsonObject>, Status> {
        handle_unary("search", SalesforceService::search(self, req.into_inner().into())).await
    }
}
