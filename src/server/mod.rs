/// Stub HTTP service with a single route
use anyhow::{Context, Result};
use axum::{routing::get, Router};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;

/// Body returned by `GET /`
pub const HELLO_BODY: &str = "Hello World";

async fn hello() -> &'static str {
    HELLO_BODY
}

/// Router with the single `GET /` route; everything else falls through to
/// the framework defaults (404 for unknown paths, 405 for other methods)
pub fn build_router() -> Router {
    Router::new().route("/", get(hello))
}

/// Bind `addr` and serve until the process exits
pub async fn serve(addr: SocketAddr) -> Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    serve_on(listener).await
}

/// Serve on an already bound listener
pub async fn serve_on(listener: TcpListener) -> Result<()> {
    let addr = listener.local_addr().context("Failed to read local address")?;
    info!("Server is running on port {}", addr.port());

    axum::serve(listener, build_router())
        .await
        .context("HTTP server failed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    async fn spawn_server() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve_on(listener));
        addr
    }

    #[tokio::test]
    async fn test_get_root_returns_hello_world() {
        let addr = spawn_server().await;
        let response = reqwest::get(format!("http://{}/", addr)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.text().await.unwrap(), "Hello World");
    }

    #[tokio::test]
    async fn test_unknown_path_is_not_found() {
        let addr = spawn_server().await;
        let response = reqwest::get(format!("http://{}/missing", addr))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_other_method_on_root_is_rejected() {
        let addr = spawn_server().await;
        let response = reqwest::Client::new()
            .post(format!("http://{}/", addr))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_bind_conflict_is_reported() {
        let addr = spawn_server().await;
        let err = serve(addr).await.unwrap_err();
        assert!(err.to_string().contains("Failed to bind"));
    }
}
