//! Command-line and environment configuration.

use axum::http::{HeaderValue, Uri};
use clap::Parser;

use crate::error::ServerError;

/// Options for the `todo-server` binary. Every flag can also be set through
/// the environment variable named next to it.
#[derive(Debug, Clone, Parser)]
#[command(name = "todo-server", version, about = "REST backend for todo items")]
pub struct Config {
    /// Interface to bind.
    #[arg(long, env = "TODO_HOST", default_value = "127.0.0.1")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// SQLite connection string; the file is created if missing.
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://todos.db?mode=rwc")]
    pub database_url: String,

    #[arg(long, env = "TODO_MAX_CONNECTIONS", default_value_t = 5)]
    pub max_connections: u32,

    /// Origins allowed by CORS. Empty, or `*`, allows any origin.
    #[arg(long = "allowed-origin", env = "CORS_ALLOWED_ORIGINS", value_delimiter = ',')]
    pub allowed_origins: Vec<String>,

    /// Base used for item urls, e.g. `https://todo.example.com`. When unset
    /// the base is taken from each request's `Host` header. Set this when
    /// running behind a proxy.
    #[arg(long, env = "PUBLIC_URL")]
    pub public_url: Option<String>,

    /// Host names accepted in the `Host` header when `--public-url` is unset.
    /// A leading `.` also matches subdomains; empty accepts any host.
    #[arg(long = "allowed-host", env = "ALLOWED_HOSTS", value_delimiter = ',')]
    pub allowed_hosts: Vec<String>,
}

/// The part of the configuration the router needs.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub public_url: Option<String>,
    pub allowed_origins: Vec<String>,
    pub allowed_hosts: Vec<String>,
}

impl Config {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn settings(&self) -> Settings {
        Settings {
            public_url: self.public_url.clone(),
            allowed_origins: self.allowed_origins.clone(),
            allowed_hosts: self.allowed_hosts.clone(),
        }
    }
}

/// Check that `raw` is an absolute `http`/`https` url usable in a `Location`
/// header, and return it without a trailing slash.
pub fn parse_public_url(raw: &str) -> Result<String, ServerError> {
    let invalid = |why: &str| ServerError::Config(format!("invalid public url {raw:?}: {why}"));
    HeaderValue::from_str(raw).map_err(|_| invalid("not a valid header value"))?;
    let uri: Uri = raw.parse().map_err(|_| invalid("not a url"))?;
    match uri.scheme_str() {
        Some("http") | Some("https") => {}
        _ => return Err(invalid("scheme must be http or https")),
    }
    match uri.authority() {
        Some(authority) if !authority.as_str().contains('@') => {}
        _ => return Err(invalid("missing or malformed host")),
    }
    if uri.query().is_some() {
        return Err(invalid("must not carry a query"));
    }
    Ok(raw.trim_end_matches('/').to_string())
}
