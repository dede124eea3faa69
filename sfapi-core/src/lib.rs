//! # Sfapi Core
//!
//! `sfapi-core` is the library behind the Salesforce microservice. It exposes a
//! fixed set of CRM operations (query, retrieve, create, update, delete,
//! upsert, describe and search) over unary gRPC, each one running inside its
//! own short-lived Salesforce session.
//!
//! ## Key Components
//!
//! * **[`SalesforceService`](service::SalesforceService):** The facade. It validates a request, opens a
//!   session, runs the operation and shapes the result.
//! * **[`Envelope`](envelope::Envelope):** JSON payloads wrapped in a generic message, so
//!   records of any sObject type cross the wire without a dedicated schema.
//! * **[`CrmConnection`](crm::CrmConnection):** The seam to Salesforce itself. The binary ships a
//!   REST implementation; tests plug in their own.
//! * **[`SalesforceClient`](client::SalesforceClient):** A typed client that encodes requests and
//!   rebuilds structured errors from failed calls.
//!
//! ## Errors on the wire
//!
//! Failures are sent as a gRPC status whose `error-bin` metadata holds the
//! error as JSON. See the [`status`] module for both directions.
//!
//! ## Re-exports
//!
//! This crate re-exports `tonic` to ensure that consumers use a compatible
//! version of it.
pub mod aggregate;
pub mod client;
pub mod crm;
pub mod envelope;
pub mod error;
pub mod grpc;
pub mod request;
pub mod service;
pub mod session;
pub mod status;
pub mod validate;

// Re-exports
pub use tonic;

/// Type alias for the standard boxed error used in generic bounds.
type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;
