use crate::handlers;
use crate::pending::PendingLogins;
use anyhow::{Context, Result};
use axum::http::{HeaderValue, Method};
use axum::routing::get;
use axum::Router;
use nowplaying_relay_core::RelayConfig;
use nowplaying_relay_engine::Stabilizer;
use nowplaying_relay_upstream::{PlaybackApi, TokenApi};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RelayConfig>,
    pub playback: Arc<dyn PlaybackApi>,
    pub tokens: Arc<dyn TokenApi>,
    pub stabilizer: Arc<Stabilizer>,
    pub logins: Arc<PendingLogins>,
}

impl AppState {
    pub fn new(
        config: RelayConfig,
        playback: Arc<dyn PlaybackApi>,
        tokens: Arc<dyn TokenApi>,
    ) -> Self {
        let stabilizer = Stabilizer::new(config.stabilizer);
        let logins = PendingLogins::new(Duration::from_secs(config.oauth.pending_login_ttl_secs));
        Self {
            config: Arc::new(config),
            playback,
            tokens,
            stabilizer: Arc::new(stabilizer),
            logins: Arc::new(logins),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(state.config.http.cors_allow_origin.as_deref());
    Router::new()
        .route("/", get(handlers::root))
        .route("/login", get(handlers::login))
        .route("/callback", get(handlers::callback))
        .route("/refresh_token", get(handlers::refresh_token))
        .route("/now-playing", get(handlers::now_playing))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(allow_origin: Option<&str>) -> CorsLayer {
    let origin = allow_origin
        .and_then(|o| HeaderValue::from_str(o).ok())
        .map(AllowOrigin::exact)
        .unwrap_or_else(AllowOrigin::any);
    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::OPTIONS])
}

pub async fn serve(state: AppState) -> Result<()> {
    let http = &state.config.http;
    let addr: SocketAddr = format!("{}:{}", http.host, http.port)
        .parse()
        .with_context(|| format!("invalid http bind {}:{}", http.host, http.port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "nowplaying-relay listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("received ctrl-c; shutting down");
        })
        .await
        .context("http server error")?;
    Ok(())
}
