//! REST backend for todo items.
//!
//! # Overview
//! `app` builds the axum `Router` over a `TodoStore`; `run` serves it on a
//! listener until the shutdown future resolves. The binary in `main.rs` only
//! parses configuration, opens the database and calls `run`.
//!
//! # Design
//! - Handlers live in `routes`, validation in `model`, SQL in `store`.
//! - Item urls are assigned on create, inside the same transaction as the
//!   insert, so every readable row carries its own detail url.
//! - CORS and request logging are layers around the whole router.

pub mod config;
pub mod cors;
pub mod error;
pub mod model;
pub mod routes;
pub mod store;

use std::future::Future;
use std::time::Instant;

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::Router;
use log::info;
use tokio::net::TcpListener;

pub use config::{Config, Settings};
pub use error::{ApiError, ServerError};
pub use model::{Todo, TodoPayload};
pub use routes::AppState;
pub use store::{StoreError, TodoStore};

/// Fails with `ServerError::Config` when `settings` holds an unusable public
/// url or CORS origin.
pub fn app(store: TodoStore, settings: &Settings) -> Result<Router, ServerError> {
    let public_url = settings
        .public_url
        .as_deref()
        .map(config::parse_public_url)
        .transpose()?;
    let state = AppState::new(store, public_url.as_deref(), &settings.allowed_hosts);
    Ok(routes::router(state)
        .layer(cors::layer(&settings.allowed_origins)?)
        .layer(middleware::from_fn(log_request)))
}

pub async fn run<F>(
    listener: TcpListener,
    store: TodoStore,
    settings: &Settings,
    shutdown: F,
) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = app(store, settings)?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let started = Instant::now();
    let response = next.run(request).await;
    info!(
        "{method} {path} -> {} in {:?}",
        response.status().as_u16(),
        started.elapsed()
    );
    response
}
