//! # CLI
//!
//! Server configuration, parsed with `clap`. Every flag can also be set from
//! the environment, which is how the service is usually deployed.
use std::{net::IpAddr, path::PathBuf, time::Duration};

use clap::Parser;
use reqwest::Url;

/// Default gRPC message size limit (1 GiB), both directions.
const DEFAULT_MAX_MESSAGE_SIZE: usize = 1024 * 1024 * 1024;

#[derive(Parser)]
#[command(name = "sfapi", version, about = "Salesforce gRPC microservice")]
pub struct Cli {
    /// Salesforce login URL (e.g. https://login.salesforce.com)
    #[arg(long, env = "SF_URL", value_parser = parse_url)]
    pub sf_url: Url,

    /// Salesforce instance URL (e.g. https://acme.my.salesforce.com)
    #[arg(long, env = "SF_ENV", value_parser = parse_url)]
    pub sf_env: Url,

    /// Username of the integration user
    #[arg(long, env = "SF_USER")]
    pub sf_user: String,

    /// Password (with the security token appended, if the org requires one)
    #[arg(long, env = "SF_PASS", hide_env_values = true)]
    pub sf_pass: String,

    /// Salesforce API version
    #[arg(long, env = "SF_API_VERSION", default_value = "62.0")]
    pub api_version: String,

    /// Timeout of every HTTP request sent to Salesforce, in seconds
    #[arg(
        long = "request-timeout",
        env = "SF_TIMEOUT_SECS",
        default_value = "120",
        value_parser = parse_seconds
    )]
    pub request_timeout: Duration,

    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,

    #[arg(long, env = "PORT", default_value_t = 8888)]
    pub port: u16,

    /// Maximum size of a gRPC message, in bytes
    #[arg(long, env = "MAX_MESSAGE_SIZE", default_value_t = DEFAULT_MAX_MESSAGE_SIZE)]
    pub max_message_size: usize,

    /// Directory of the log files
    #[arg(long, env = "LOG_PATH", default_value = ".")]
    pub log_path: PathBuf,

    #[arg(long, env = "LOG_FILE", default_value = "salesforce-api.log")]
    pub log_file: String,

    /// File receiving the audit trail of every write
    #[arg(long, env = "AUDIT_LOG_FILE", default_value = "salesforce-api.audit.log")]
    pub audit_log_file: String,

    /// Log level directive; `RUST_LOG` takes precedence when set
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

fn parse_url(value: &str) -> Result<Url, String> {
    let url = Url::parse(value.trim()).map_err(|e| format!("Invalid URL '{value}': {e}"))?;

    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(format!("Invalid URL: '{value}'. Expected an http(s) URL"));
    }

    Ok(url)
}

fn parse_seconds(value: &str) -> Result<Duration, String> {
    value
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|e| format!("Invalid number of seconds: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUIRED: [&str; 9] = [
        "sfapi",
        "--sf-url",
        "https://test.salesforce.com/",
        "--sf-env",
        "https://acme--dev.sandbox.my.salesforce.com",
        "--sf-user",
        "api@acme.com",
        "--sf-pass",
        "secret",
    ];

    #[test]
    fn defaults_apply_when_only_credentials_are_given() {
        let cli = Cli::try_parse_from(REQUIRED).unwrap();

        assert_eq!(cli.sf_url.as_str(), "https://test.salesforce.com/");
        assert_eq!(cli.sf_env.host_str(), Some("acme--dev.sandbox.my.salesforce.com"));
        assert_eq!(cli.port, 8888);
        assert_eq!(cli.max_message_size, DEFAULT_MAX_MESSAGE_SIZE);
        assert_eq!(cli.request_timeout, Duration::from_secs(120));
        assert_eq!(cli.log_file, "salesforce-api.log");
    }

    #[test]
    fn urls_must_use_http() {
        let mut args = REQUIRED.to_vec();
        args[2] = "test.salesforce.com";

        assert!(Cli::try_parse_from(args.clone()).is_err());

        args[2] = "ftp://test.salesforce.com";
        assert!(Cli::try_parse_from(args).is_err());
    }
}
