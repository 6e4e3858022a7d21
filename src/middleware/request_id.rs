// ============================================================================
// Request ID Middleware
// ============================================================================
//
// Request: `X-Request-ID: <uuid>` (optional, caller may provide)
// Response: `X-Request-ID: <uuid>` (always returned)
//
// A caller-provided id is kept when it is a valid UUID so an upstream
// automation run can be correlated with the sync logs; otherwise a new v4
// id is generated. Every request is wrapped in a `request` span carrying it.
//
// ============================================================================

use axum::{
    extract::Request,
    http::{header, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4);

    request.extensions_mut().insert(request_id);

    let span = tracing::info_span!(
        "request",
        request_id = %request_id,
        method = %request.method(),
        uri = %request.uri().path(),
    );

    async move {
        tracing::info!("Incoming request");

        let mut response = next.run(request).await;

        if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
            response
                .headers_mut()
                .insert(header::HeaderName::from_static(REQUEST_ID_HEADER), value);
        }

        tracing::info!(status = %response.status(), "Outgoing response");
        response
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        routing::get,
        Extension, Router,
    };
    use tower::ServiceExt;

    async fn echo_id(Extension(id): Extension<Uuid>) -> String {
        id.to_string()
    }

    fn app() -> Router {
        Router::new()
            .route("/", get(echo_id))
            .layer(axum::middleware::from_fn(request_id_middleware))
    }

    #[tokio::test]
    async fn test_request_id_generated() {
        let response = app()
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let request_id = response.headers().get(REQUEST_ID_HEADER).unwrap();
        assert!(Uuid::parse_str(request_id.to_str().unwrap()).is_ok());
    }

    #[tokio::test]
    async fn test_request_id_preserved() {
        let client_request_id = Uuid::new_v4();

        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header(REQUEST_ID_HEADER, client_request_id.to_string())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let response_request_id = response.headers().get(REQUEST_ID_HEADER).unwrap();
        assert_eq!(response_request_id.to_str().unwrap(), client_request_id.to_string());
    }

    #[tokio::test]
    async fn test_invalid_request_id_replaced() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/")
                    .header(REQUEST_ID_HEADER, "invalid-uuid")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let request_id = response.headers().get(REQUEST_ID_HEADER).unwrap();
        assert_ne!(request_id.to_str().unwrap(), "invalid-uuid");
        assert!(Uuid::parse_str(request_id.to_str().unwrap()).is_ok());
    }
}
