use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use relay_engine::Relay;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tracing::{error, info, warn};

pub const SIGNATURE_HEADER: &str = "x-line-signature";

#[derive(Clone)]
pub struct AppState {
    relay: Arc<Relay>,
}

pub fn router(relay: Arc<Relay>, images_dir: Option<PathBuf>) -> Router {
    let router = Router::new()
        .route("/callback", post(callback))
        .route("/healthz", get(healthz))
        .with_state(AppState { relay });
    match images_dir {
        Some(dir) => router.nest_service("/images", ServeDir::new(dir)),
        None => router,
    }
}

pub async fn serve(
    relay: Arc<Relay>,
    images_dir: Option<PathBuf>,
    addr: &str,
) -> anyhow::Result<()> {
    let app = router(relay, images_dir);
    let listener = TcpListener::bind(addr).await?;
    info!("webhook listening at http://{addr}/callback");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn healthz() -> &'static str {
    "ok"
}

async fn callback(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let Some(signature) = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
    else {
        warn!("webhook without signature header");
        return (StatusCode::BAD_REQUEST, "missing signature").into_response();
    };

    let relay = state.relay.clone();
    let handled =
        tokio::task::spawn_blocking(move || relay.handle_webhook(&body, &signature)).await;
    match handled {
        Ok(Ok(_)) => (StatusCode::OK, "OK").into_response(),
        Ok(Err(err)) => (StatusCode::BAD_REQUEST, err.to_string()).into_response(),
        Err(err) => {
            error!("webhook worker failed: {err}");
            (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
        }
    }
}
