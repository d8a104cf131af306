//! HTTP handlers for the `/todos` resource.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::uri::Authority;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, MethodRouter};
use axum::{Json, Router};
use log::info;

use crate::error::ApiError;
use crate::model::{detail_url, Todo, TodoPayload};
use crate::store::TodoStore;

#[derive(Clone)]
pub struct AppState {
    store: TodoStore,
    public_url: Option<Arc<str>>,
    allowed_hosts: Arc<[String]>,
}

impl AppState {
    /// `public_url` is expected to have passed `config::parse_public_url`.
    pub fn new(store: TodoStore, public_url: Option<&str>, allowed_hosts: &[String]) -> Self {
        Self {
            store,
            public_url: public_url.map(Arc::from),
            allowed_hosts: allowed_hosts.into(),
        }
    }

    /// Scheme and authority that item urls are built on. Without a
    /// configured public url, the `Host` header must be a plain authority
    /// and, if an allow-list is set, name an allowed host.
    fn base_url(&self, headers: &HeaderMap) -> Result<String, ApiError> {
        if let Some(url) = &self.public_url {
            return Ok(url.to_string());
        }
        let host = match headers.get(header::HOST) {
            None => "localhost",
            Some(value) => value
                .to_str()
                .map_err(|_| invalid_host())?,
        };
        let authority: Authority = host.parse().map_err(|_| invalid_host())?;
        if authority.as_str().contains('@') || !self.host_allowed(authority.host()) {
            return Err(invalid_host());
        }
        let scheme = match headers
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
        {
            Some(proto) if proto.eq_ignore_ascii_case("https") => "https",
            _ => "http",
        };
        Ok(format!("{scheme}://{authority}"))
    }

    fn host_allowed(&self, host: &str) -> bool {
        if self.allowed_hosts.is_empty() {
            return true;
        }
        self.allowed_hosts.iter().any(|allowed| {
            if allowed == "*" {
                true
            } else if let Some(domain) = allowed.strip_prefix('.') {
                host.eq_ignore_ascii_case(domain)
                    || host
                        .len()
                        .checked_sub(domain.len() + 1)
                        .and_then(|at| host.get(at..))
                        .is_some_and(|tail| tail.eq_ignore_ascii_case(allowed))
            } else {
                host.eq_ignore_ascii_case(allowed)
            }
        })
    }
}

fn invalid_host() -> ApiError {
    ApiError::Malformed("Invalid Host header.".to_string())
}

/// Every path is served with and without its trailing slash.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/todos", collection())
        .route("/todos/", collection())
        .route("/todos/{id}", item())
        .route("/todos/{id}/", item())
        .with_state(state)
}

fn collection() -> MethodRouter<AppState> {
    get(list_todos).post(create_todo).delete(delete_all_todos)
}

fn item() -> MethodRouter<AppState> {
    get(get_todo)
        .put(update_todo)
        .patch(update_todo)
        .delete(delete_todo)
}

async fn list_todos(State(state): State<AppState>) -> Result<Json<Vec<Todo>>, ApiError> {
    Ok(Json(state.store.list().await?))
}

async fn create_todo(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<TodoPayload>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    let new = payload.into_new()?;
    let base = state.base_url(&headers)?;
    let todo = state.store.create(&new, |id| detail_url(&base, id)).await?;
    info!("created todo {}", todo.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, todo.url.clone())],
        Json(todo),
    ))
}

async fn get_todo(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Todo>, ApiError> {
    state.store.get(id).await?.map(Json).ok_or(ApiError::NotFound)
}

async fn update_todo(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<TodoPayload>, JsonRejection>,
) -> Result<Json<Todo>, ApiError> {
    let Json(payload) = payload?;
    let changes = payload.into_changes()?;
    state
        .store
        .update(id, &changes)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound)
}

async fn delete_todo(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if state.store.delete(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound)
    }
}

async fn delete_all_todos(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    let removed = state.store.delete_all().await?;
    info!("deleted all todos ({removed} rows)");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    async fn state(public_url: Option<&str>, allowed_hosts: &[&str]) -> AppState {
        let allowed: Vec<String> = allowed_hosts.iter().map(|h| h.to_string()).collect();
        AppState::new(TodoStore::connect_in_memory().await.unwrap(), public_url, &allowed)
    }

    fn host(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static(value));
        headers
    }

    #[tokio::test]
    async fn base_url_prefers_configured_public_url() {
        let state = state(Some("https://todo.example.com"), &[]).await;
        assert_eq!(state.base_url(&host("internal:3000")).unwrap(), "https://todo.example.com");
    }

    #[tokio::test]
    async fn base_url_uses_host_and_forwarded_proto() {
        let state = state(None, &[]).await;
        let mut headers = host("api.example.com");
        assert_eq!(state.base_url(&headers).unwrap(), "http://api.example.com");

        headers.insert("x-forwarded-proto", HeaderValue::from_static("HTTPS"));
        assert_eq!(state.base_url(&headers).unwrap(), "https://api.example.com");
    }

    #[tokio::test]
    async fn unknown_forwarded_proto_falls_back_to_http() {
        let state = state(None, &[]).await;
        let mut headers = host("api.example.com");
        headers.insert("x-forwarded-proto", HeaderValue::from_static("javascript"));
        assert_eq!(state.base_url(&headers).unwrap(), "http://api.example.com");
    }

    #[tokio::test]
    async fn base_url_falls_back_to_localhost() {
        let state = state(None, &[]).await;
        assert_eq!(state.base_url(&HeaderMap::new()).unwrap(), "http://localhost");
    }

    #[tokio::test]
    async fn malformed_host_is_rejected() {
        let state = state(None, &[]).await;
        for bad in ["evil.com/path", "user@evil.com", "a b"] {
            let mut headers = HeaderMap::new();
            headers.insert(header::HOST, HeaderValue::from_str(bad).unwrap());
            assert!(matches!(state.base_url(&headers), Err(ApiError::Malformed(_))), "{bad}");
        }
    }

    #[tokio::test]
    async fn allow_list_restricts_hosts() {
        let state = state(None, &["todo.example.com", ".internal.net"]).await;
        assert_eq!(
            state.base_url(&host("todo.example.com:8000")).unwrap(),
            "http://todo.example.com:8000"
        );
        assert!(state.base_url(&host("internal.net")).is_ok());
        assert!(state.base_url(&host("api.internal.net")).is_ok());
        assert!(state.base_url(&host("evilinternal.net")).is_err());
        assert!(state.base_url(&host("elsewhere.com")).is_err());
    }
}
