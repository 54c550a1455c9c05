//! Axum integration for role checks
//!
//! - `IntoResponse` for [`Forbidden`]: 403 with a JSON `{"message": ...}` body
//! - [`operation_key`]: the [`OperationKey`] of an incoming request
//!
//! Hosts that route by OpenAPI operation insert the `OperationKey` into the
//! request extensions themselves. Otherwise the key is derived from axum's
//! `MatchedPath`, whose `{param}` templates use the same syntax as OpenAPI
//! paths.
//!
//! # Example
//!
//! ```rust,ignore
//! use axum::{routing::get, Router};
//! use openapi_roles::{RolesLayer, RolesOptions, RolesPlugin};
//!
//! let roles = RolesPlugin::new(RolesOptions::default()).compile(&document)?;
//! let app = Router::new()
//!     .route("/greet", get(greet))
//!     .layer(RolesLayer::new(roles))
//!     .layer(session_authenticator);
//! ```

use axum::{
    extract::MatchedPath,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::analyzer::OperationKey;
use crate::authorizer::Forbidden;

impl IntoResponse for Forbidden {
    fn into_response(self) -> Response {
        (StatusCode::FORBIDDEN, Json(self)).into_response()
    }
}

/// Find the operation addressed by `request`.
pub fn operation_key<B>(request: &Request<B>) -> Option<OperationKey> {
    if let Some(key) = request.extensions().get::<OperationKey>() {
        return Some(key.clone());
    }

    request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| OperationKey::new(path.as_str(), request.method().as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};

    #[test]
    fn test_operation_key_from_extension() {
        let mut request = Request::builder()
            .method("POST")
            .uri("/anything")
            .body(Body::empty())
            .unwrap();
        request
            .extensions_mut()
            .insert(OperationKey::new("/greet", "get"));

        assert_eq!(
            operation_key(&request),
            Some(OperationKey::new("/greet", "get"))
        );
    }

    #[test]
    fn test_operation_key_missing() {
        let request = Request::builder().uri("/greet").body(Body::empty()).unwrap();
        assert_eq!(operation_key(&request), None);
    }

    #[tokio::test]
    async fn test_forbidden_response() {
        let response = Forbidden::new(vec!["sessionKey".to_string()]).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            json["message"],
            "Authenticated with sessionKey but missing one or more required roles."
        );
    }
}
