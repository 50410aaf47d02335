use crate::error::ApiError;
use crate::server::AppState;
use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use nowplaying_relay_core::urls::{
    authorize_url, decode_login_state, encode_login_state, frontend_redirect,
    sanitize_return_path,
};
use nowplaying_relay_core::{credential_fingerprint, epoch_ms, OAuthConfig};
use nowplaying_relay_engine::passthrough;
use serde::{Deserialize, Serialize};
use std::time::{Instant, SystemTime};
use tracing::{info, warn};

const NO_STORE: [(&str, &str); 6] = [
    ("cache-control", "no-store, no-cache, must-revalidate, max-age=0"),
    ("pragma", "no-cache"),
    ("expires", "0"),
    ("cdn-cache-control", "no-store"),
    ("surrogate-control", "no-store"),
    ("cloudflare-cdn-cache-control", "no-store"),
];

fn no_store(resp: impl IntoResponse) -> Response {
    (NO_STORE, resp).into_response()
}

fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

fn to_frontend(
    oauth: &OAuthConfig,
    return_path: &str,
    params: &[(&str, &str)],
) -> Result<Response, ApiError> {
    let url = frontend_redirect(&oauth.frontend_uri, return_path, params)
        .map_err(|e| ApiError::internal(format!("failed to build frontend url: {e}")))?;
    Ok(found(url.as_str()))
}

fn now_ms() -> i64 {
    epoch_ms(SystemTime::now())
}

pub async fn root() -> &'static str {
    "nowplaying-relay is running"
}

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    #[serde(rename = "return")]
    pub return_to: Option<String>,
}

pub async fn login(
    State(state): State<AppState>,
    Query(query): Query<LoginQuery>,
) -> Result<Response, ApiError> {
    let cfg = &state.config;
    let return_path = query
        .return_to
        .as_deref()
        .map(|raw| sanitize_return_path(Some(raw), &cfg.oauth.fallback_return_path));

    let nonce = state.logins.issue(Instant::now());
    let login_state = encode_login_state(&nonce, return_path.as_deref());
    let url = authorize_url(&cfg.upstream, &cfg.oauth, &login_state)
        .map_err(|e| ApiError::internal(format!("failed to build authorize url: {e}")))?;

    info!(return_path = return_path.as_deref().unwrap_or("-"), "redirecting to authorization");
    Ok(found(url.as_str()))
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

pub async fn callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Result<Response, ApiError> {
    let oauth = &state.config.oauth;
    let (nonce, raw_return) = decode_login_state(query.state.as_deref().unwrap_or_default());
    let return_path = sanitize_return_path(raw_return.as_deref(), &oauth.fallback_return_path);

    let redirect = |params: &[(&str, &str)]| to_frontend(oauth, &return_path, params);

    if !state.logins.redeem(&nonce, Instant::now()) {
        warn!("callback with unknown or expired login state");
        return redirect(&[("error", "invalid_token")]);
    }

    if let Some(err) = query.error.as_deref() {
        warn!(error = err, "authorization denied upstream");
        return redirect(&[("error", "invalid_token")]);
    }
    let Some(code) = query.code.as_deref().filter(|c| !c.is_empty()) else {
        warn!("callback without authorization code");
        return redirect(&[("error", "invalid_token")]);
    };

    match state.tokens.exchange_code(code).await {
        Ok(grant) => {
            info!(credential = %credential_fingerprint(&grant.access_token), "authorization code exchanged");
            let mut params = vec![("access_token", grant.access_token.as_str())];
            if let Some(refresh) = grant.refresh_token.as_deref() {
                params.push(("refresh_token", refresh));
            }
            redirect(params.as_slice())
        }
        Err(err) => {
            warn!(error = %err, "authorization code exchange failed");
            redirect(&[("error", "invalid_token")])
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RefreshQuery {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
}

pub async fn refresh_token(
    State(state): State<AppState>,
    Query(query): Query<RefreshQuery>,
) -> Result<Json<RefreshResponse>, ApiError> {
    let Some(token) = query.refresh_token.as_deref().filter(|t| !t.is_empty()) else {
        return Err(ApiError::bad_request("Missing refresh token"));
    };

    let grant = state.tokens.refresh(token).await.map_err(|err| {
        warn!(error = %err, "token refresh failed");
        ApiError::bad_request(err.reason())
    })?;

    Ok(Json(RefreshResponse {
        access_token: grant.access_token,
        expires_in: grant.expires_in,
    }))
}

#[derive(Debug, Deserialize)]
pub struct NowPlayingQuery {
    pub access_token: Option<String>,
    pub stable: Option<String>,
}

fn wants_stable(flag: Option<&str>) -> bool {
    matches!(flag.map(str::trim), Some("1") | Some("true"))
}

pub async fn now_playing(
    State(state): State<AppState>,
    Query(query): Query<NowPlayingQuery>,
) -> Response {
    let Some(token) = query.access_token.as_deref().filter(|t| !t.is_empty()) else {
        return no_store(ApiError::bad_request("Missing access token"));
    };

    let outcome = state.playback.fetch_currently_playing(token).await;
    let received_at = now_ms();

    if wants_stable(query.stable.as_deref()) {
        let body = state
            .stabilizer
            .respond(token, &outcome, received_at, now_ms());
        no_store(Json(body))
    } else {
        no_store(Json(passthrough(&outcome, received_at, now_ms())))
    }
}

#[cfg(test)]
mod tests {
    use super::wants_stable;

    #[test]
    fn stable_flag_parsing() {
        assert!(wants_stable(Some("1")));
        assert!(wants_stable(Some("true")));
        assert!(!wants_stable(Some("0")));
        assert!(!wants_stable(Some("yes")));
        assert!(!wants_stable(None));
    }
}
