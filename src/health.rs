use anyhow::{Context, Result};
use axum::{http::StatusCode, response::IntoResponse, routing::get, Router};
use std::net::SocketAddr;
use tracing::info;

/// Liveness probe: `GET /` answers while the process runs, whether or not
/// the Discord client ever logged in.
pub fn router() -> Router {
    Router::new()
        .route("/", get(alive))
        .fallback(not_found)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

async fn alive() -> &'static str {
    "Bot is alive!"
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not Found")
}

pub async fn serve(port: u16) -> Result<()> {
    let address = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .with_context(|| format!("Could not bind health server to {address}"))?;

    info!("🩺 Health server listening on {}", address);
    axum::serve(listener, router()).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use pretty_assertions::assert_eq;
    use tower::ServiceExt;

    async fn get_path(path: &str) -> (StatusCode, String) {
        let response = router()
            .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_root_reports_alive() {
        assert_eq!(get_path("/").await, (StatusCode::OK, "Bot is alive!".to_string()));
    }

    #[tokio::test]
    async fn test_other_paths_are_not_found() {
        assert_eq!(
            get_path("/status").await,
            (StatusCode::NOT_FOUND, "Not Found".to_string())
        );
        assert_eq!(
            get_path("/favicon.ico").await,
            (StatusCode::NOT_FOUND, "Not Found".to_string())
        );
    }
}
