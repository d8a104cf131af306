//! Cross-origin headers for every response.

use axum::http::HeaderValue;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::error::ServerError;

/// Build the CORS layer for `origins`. An empty list, or one containing `*`,
/// allows any origin.
pub fn layer(origins: &[String]) -> Result<CorsLayer, ServerError> {
    let allow_origin = if origins.is_empty() || origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let values = origins
            .iter()
            .map(|origin| {
                HeaderValue::from_str(origin)
                    .map_err(|_| ServerError::Config(format!("invalid CORS origin {origin:?}")))
            })
            .collect::<Result<Vec<_>, _>>()?;
        AllowOrigin::list(values)
    };

    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_wildcard_and_lists() {
        assert!(layer(&[]).is_ok());
        assert!(layer(&["*".to_string()]).is_ok());
        assert!(layer(&["http://someplace.com".to_string()]).is_ok());
    }

    #[test]
    fn rejects_unencodable_origin() {
        let err = layer(&["http://bad\norigin".to_string()]).unwrap_err();
        assert!(matches!(err, ServerError::Config(_)));
    }
}
