use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use tracing::info;

/// First stage of the middleware chain: one line per incoming request.
pub async fn log_request(request: Request, next: Next) -> Response {
    info!("Request: {} {}", request.method(), request.uri().path());
    next.run(request).await
}
