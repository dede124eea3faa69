//! # Salesforce Microservice Protobuf Bindings
//!
//! Generated `prost` messages and `tonic` client/server stubs for the
//! `sfservices.SalesforceMicroservice` service, plus the encoded descriptor set
//! used to register gRPC server reflection.

pub mod pb {
    include!(concat!(env!("OUT_DIR"), "/sfservices.rs"));
}

pub use pb::salesforce_microservice_client::SalesforceMicroserviceClient;
pub use pb::salesforce_microservice_server::{
    SalesforceMicroservice, SalesforceMicroserviceServer,
};

pub const FILE_DESCRIPTOR_SET: &[u8] = tonic::include_file_descriptor_set!("descriptors");
