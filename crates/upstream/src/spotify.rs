use crate::{FetchOutcome, PlaybackApi, TokenApi, TokenError, TokenGrant, STATUS_NO_CONTENT};
use async_trait::async_trait;
use nowplaying_relay_core::{credential_fingerprint, OAuthConfig, UpstreamConfig};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

const CURRENTLY_PLAYING_PATH: &str = "/v1/me/player/currently-playing";
const TOKEN_PATH: &str = "/api/token";

pub struct SpotifyClient {
    http: reqwest::Client,
    currently_playing_url: String,
    token_url: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl SpotifyClient {
    pub fn new(upstream: &UpstreamConfig, oauth: &OAuthConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .user_agent(upstream.user_agent.clone())
            .timeout(Duration::from_millis(upstream.timeout_ms))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;
        Ok(Self {
            http,
            currently_playing_url: format!(
                "{}{CURRENTLY_PLAYING_PATH}",
                upstream.api_base.trim_end_matches('/')
            ),
            token_url: format!("{}{TOKEN_PATH}", upstream.accounts_base.trim_end_matches('/')),
            client_id: oauth.client_id.clone(),
            client_secret: oauth.client_secret.clone(),
            redirect_uri: oauth.redirect_uri.clone(),
        })
    }

    fn describe_error(e: &reqwest::Error) -> String {
        if e.is_timeout() {
            format!("timeout: {e}")
        } else if e.is_connect() {
            format!("connect: {e}")
        } else {
            e.to_string()
        }
    }

    async fn request_token(&self, form: &[(&str, &str)]) -> Result<TokenGrant, TokenError> {
        let resp = self
            .http
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(form)
            .send()
            .await
            .map_err(|e| TokenError::Transport(Self::describe_error(&e)))?;

        let status = resp.status();
        if status.is_success() {
            return resp
                .json::<TokenGrant>()
                .await
                .map_err(|e| TokenError::Malformed(e.to_string()));
        }

        let body: Option<Value> = resp.json().await.ok();
        let error = body
            .as_ref()
            .and_then(|b| b.get("error"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("status_{}", status.as_u16()));
        Err(TokenError::Rejected {
            status: status.as_u16(),
            error,
        })
    }
}

#[async_trait]
impl PlaybackApi for SpotifyClient {
    async fn fetch_currently_playing(&self, credential: &str) -> FetchOutcome {
        let start = std::time::Instant::now();
        let fingerprint = credential_fingerprint(credential);
        debug!(credential = %fingerprint, "currently-playing fetch start");

        let resp = match self
            .http
            .get(&self.currently_playing_url)
            .bearer_auth(credential)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                let error = Self::describe_error(&e);
                warn!(credential = %fingerprint, %error, "currently-playing fetch failed");
                return FetchOutcome::transport(error);
            }
        };

        let status = resp.status().as_u16();
        if status == STATUS_NO_CONTENT {
            debug!(credential = %fingerprint, latency_ms = start.elapsed().as_millis() as u64, "nothing playing");
            return FetchOutcome::NoContent;
        }

        let body = match resp.bytes().await {
            Ok(body) => body,
            Err(e) => {
                let error = Self::describe_error(&e);
                warn!(credential = %fingerprint, status, %error, "failed reading currently-playing body");
                return FetchOutcome::transport(error);
            }
        };
        let payload = serde_json::from_slice::<Value>(&body).ok();
        debug!(
            credential = %fingerprint,
            status,
            json = payload.is_some(),
            latency_ms = start.elapsed().as_millis() as u64,
            "currently-playing fetch done"
        );
        FetchOutcome::from_response(status, payload)
    }
}

#[async_trait]
impl TokenApi for SpotifyClient {
    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, TokenError> {
        self.request_token(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", &self.redirect_uri),
        ])
        .await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, TokenError> {
        self.request_token(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ])
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::SpotifyClient;
    use crate::{FetchOutcome, PlaybackApi, TokenApi, TokenError};
    use nowplaying_relay_core::{OAuthConfig, UpstreamConfig};
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer, timeout_ms: u64) -> SpotifyClient {
        let upstream = UpstreamConfig {
            api_base: server.uri(),
            accounts_base: server.uri(),
            timeout_ms,
            ..UpstreamConfig::default()
        };
        let oauth = OAuthConfig {
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            ..OAuthConfig::default()
        };
        SpotifyClient::new(&upstream, &oauth).expect("client")
    }

    #[tokio::test]
    async fn fetch_sends_bearer_and_parses_payload() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/me/player/currently-playing"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"is_playing": true})),
            )
            .mount(&server)
            .await;

        let outcome = client(&server, 2_000).fetch_currently_playing("tok").await;
        assert_eq!(
            outcome,
            FetchOutcome::Ok {
                payload: Some(json!({"is_playing": true}))
            }
        );
    }

    #[tokio::test]
    async fn fetch_maps_no_content_and_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("authorization", "Bearer idle"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(header("authorization", "Bearer expired"))
            .respond_with(ResponseTemplate::new(401).set_body_string("nope"))
            .mount(&server)
            .await;

        let c = client(&server, 2_000);
        assert_eq!(c.fetch_currently_playing("idle").await, FetchOutcome::NoContent);
        assert_eq!(
            c.fetch_currently_playing("expired").await,
            FetchOutcome::Status {
                status: 401,
                payload: None
            }
        );
    }

    #[tokio::test]
    async fn fetch_times_out_as_transport_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let outcome = client(&server, 50).fetch_currently_playing("tok").await;
        assert!(matches!(outcome, FetchOutcome::Transport { .. }));
    }

    #[tokio::test]
    async fn exchanges_code_with_basic_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/token"))
            // base64("id:secret")
            .and(header("authorization", "Basic aWQ6c2VjcmV0"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "at",
                "refresh_token": "rt",
                "expires_in": 3600,
                "token_type": "Bearer"
            })))
            .mount(&server)
            .await;

        let grant = client(&server, 2_000).exchange_code("abc").await.expect("grant");
        assert_eq!(grant.access_token, "at");
        assert_eq!(grant.refresh_token.as_deref(), Some("rt"));
        assert_eq!(grant.expires_in, Some(3600));
    }

    #[tokio::test]
    async fn refresh_surfaces_oauth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})),
            )
            .mount(&server)
            .await;

        let err = client(&server, 2_000).refresh("stale").await.unwrap_err();
        assert!(matches!(err, TokenError::Rejected { status: 400, .. }));
        assert_eq!(err.reason(), "invalid_grant");
    }
}
