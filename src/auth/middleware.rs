//! Authentication middleware
//!
//! Resolves the calling service from its access token and, for write
//! requests, enforces the configured scopes.

use super::{CognitoAuth, ServiceUser, ALL_SCOPES};
use crate::error::AppError;
use axum::{
    extract::{Request, State},
    http::Method,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Insert the authenticated [`ServiceUser`] into request extensions
pub async fn auth_middleware(
    State(auth): State<Arc<CognitoAuth>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = auth.authenticate(request.headers()).await?;

    let method = request.method();
    let is_write = method != Method::GET && method != Method::HEAD && method != Method::OPTIONS;
    if is_write && !auth.write_scopes().is_empty() {
        check_scopes(&user, auth.write_scopes())?;
    }

    debug!(user = %user, path = %request.uri().path(), "Request authenticated");
    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

/// Pass when the user holds the wildcard scope or any of `scopes`
pub fn check_scopes<S: AsRef<str>>(user: &ServiceUser, scopes: &[S]) -> Result<(), AppError> {
    if user.has_scope(ALL_SCOPES) || scopes.iter().any(|s| user.has_scope(s.as_ref())) {
        return Ok(());
    }

    warn!(user = %user, "Missing required scope");
    Err(AppError::Forbidden(
        "User doesn't have access to this resource".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::cognito::tests::{auth_config, cognito, token_with_scopes};
    use axum::{
        body::{to_bytes, Body},
        http::{Request as HttpRequest, StatusCode},
        middleware::from_fn_with_state,
        routing::get,
        Extension, Router,
    };
    use tower::ServiceExt;

    fn user(scopes: &[&str]) -> ServiceUser {
        ServiceUser {
            client_id: Some("svc".to_string()),
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_check_scopes() {
        assert!(check_scopes(&user(&["read"]), &["read", "write"]).is_ok());
        assert!(check_scopes(&user(&["*"]), &["admin"]).is_ok());

        let err = check_scopes(&user(&["read"]), &["write"]).unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
        assert!(check_scopes(&user(&[]), &["write"]).is_err());
    }

    async fn app(write_scopes: &[&str]) -> Router {
        let auth = Arc::new(cognito(&auth_config("Bearer", write_scopes)).await);
        Router::new()
            .route(
                "/items",
                get(|Extension(user): Extension<ServiceUser>| async move {
                    user.client_id.unwrap_or_default()
                })
                .post(|| async { "created" }),
            )
            .layer(from_fn_with_state(auth, auth_middleware))
    }

    fn request(method: &str, token: Option<&str>) -> HttpRequest<Body> {
        let mut builder = HttpRequest::builder().method(method).uri("/items");
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let response = app(&[]).await.oneshot(request("GET", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["code"], 401);
        assert_eq!(json["error"], "Authorization Required");
    }

    #[tokio::test]
    async fn test_valid_token_reaches_handler() {
        let token = token_with_scopes("galactic_core/read");
        let response = app(&[]).await.oneshot(request("GET", Some(&token))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"svc-123");
    }

    #[tokio::test]
    async fn test_write_scopes_enforced_on_writes_only() {
        let token = token_with_scopes("galactic_core/read");
        let app = app(&["write"]).await;

        let response = app.clone().oneshot(request("GET", Some(&token))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app.clone().oneshot(request("POST", Some(&token))).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let writer = token_with_scopes("galactic_core/write");
        let response = app.oneshot(request("POST", Some(&writer))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
