//! # Sfapi Server Entry Point
//!
//! The main executable of the Salesforce microservice. This file drives the
//! application lifecycle:
//!
//! 1. **Configuration**: Parses flags and environment variables using [`cli::Cli`].
//! 2. **Logging**: Installs the console, application and audit log sinks.
//! 3. **Wiring**: Builds the Salesforce connection factory and the service facade.
//! 4. **Serving**: Runs the gRPC server, with server reflection, until Ctrl-C.

mod cli;
mod logging;
mod salesforce;

use anyhow::Context;
use clap::Parser;
use cli::Cli;
use salesforce::{SalesforceConfig, SalesforceFactory};
use sfapi_core::{service::SalesforceService, session::Credentials};
use sfapi_proto::FILE_DESCRIPTOR_SET;
use std::net::SocketAddr;
use tonic::transport::Server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let _guard = logging::init(
        &args.log_path,
        &args.log_file,
        &args.audit_log_file,
        &args.log_level,
    )?;

    let http = reqwest::Client::builder()
        .timeout(args.request_timeout)
        .build()
        .context("Failed to build the HTTP client")?;

    let factory = SalesforceFactory::new(
        http,
        SalesforceConfig {
            login_url: args.sf_url,
            instance_url: args.sf_env,
            api_version: args.api_version,
        },
    );

    let credentials = Credentials::new(args.sf_user, args.sf_pass);
    tracing::info!(?credentials, "using Salesforce credentials");

    let service = SalesforceService::new(factory, credentials)
        .into_server()
        .max_decoding_message_size(args.max_message_size)
        .max_encoding_message_size(args.max_message_size);

    let reflection = tonic_reflection::server::Builder::configure()
        .register_encoded_file_descriptor_set(FILE_DESCRIPTOR_SET)
        .build_v1()
        .context("Failed to build the reflection service")?;

    let addr = SocketAddr::new(args.host, args.port);
    tracing::info!(%addr, "Salesforce microservice listening");

    Server::builder()
        .add_service(reflection)
        .add_service(service)
        .serve_with_shutdown(addr, shutdown_signal())
        .await
        .with_context(|| format!("gRPC server on {addr} failed"))?;

    tracing::info!("Salesforce microservice stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown signal received"),
        Err(err) => {
            tracing::error!(error = %err, "failed to listen for the shutdown signal");
            std::future::pending::<()>().await
        }
    }
}
