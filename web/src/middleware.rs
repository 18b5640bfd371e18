//! Request tracing.
//!
//! Each request gets an `x-request-id` (kept from the client when present,
//! otherwise a fresh UUID), a tracing span carrying it, and the same header
//! on the response.
//!
//! ```ignore
//! let app = with_request_tracing(Router::new().route("/api/tickets", get(list_tickets)))
//!     .with_state(state);
//! ```

use axum::{
    http::{HeaderName, HeaderValue, Request},
    Router,
};
use tower_http::{
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::{MakeSpan, TraceLayer},
};
use tracing::Span;
use uuid::Uuid;

/// Header carrying the request id in both directions.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Generates a v4 UUID for requests that arrive without an id.
#[derive(Clone, Copy, Debug, Default)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Opens an `http_request` span with the request id, method and URI.
#[derive(Clone, Copy, Debug, Default)]
pub struct RequestSpan;

impl<B> MakeSpan<B> for RequestSpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        let request_id = request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("-");

        tracing::info_span!(
            "http_request",
            request_id = %request_id,
            method = %request.method(),
            uri = %request.uri(),
        )
    }
}

/// Wrap `router` with request-id assignment, per-request spans and
/// request-id propagation to the response.
///
/// The id is assigned outermost so the span and the handlers both see it.
pub fn with_request_tracing<S>(router: Router<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let header = HeaderName::from_static(REQUEST_ID_HEADER);

    router
        .layer(PropagateRequestIdLayer::new(header.clone()))
        .layer(TraceLayer::new_for_http().make_span_with(RequestSpan))
        .layer(SetRequestIdLayer::new(header, UuidRequestId))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::{body::Body, routing::get};
    use tower::ServiceExt;

    fn app() -> Router {
        with_request_tracing(Router::new().route(
            "/echo",
            get(|request: Request<Body>| async move {
                request
                    .extensions()
                    .get::<RequestId>()
                    .and_then(|id| id.header_value().to_str().ok())
                    .unwrap_or_default()
                    .to_string()
            }),
        ))
    }

    fn response_id(response: &axum::response::Response) -> String {
        response
            .headers()
            .get(REQUEST_ID_HEADER)
            .expect("request id on response")
            .to_str()
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn missing_id_is_generated() {
        let response = app()
            .oneshot(Request::builder().uri("/echo").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert!(Uuid::parse_str(&response_id(&response)).is_ok());
    }

    #[tokio::test]
    async fn client_id_is_kept_and_visible_to_handlers() {
        let request = Request::builder()
            .uri("/echo")
            .header(REQUEST_ID_HEADER, "desk-42")
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response_id(&response), "desk-42");

        use http_body_util::BodyExt;
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"desk-42");
    }
}
