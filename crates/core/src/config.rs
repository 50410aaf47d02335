use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

fn default_schema_version() -> u32 {
    1
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config invalid: {0}")]
    Invalid(String),
    #[error("config missing required value: {0}")]
    Missing(&'static str),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
    // any origin when unset
    pub cors_allow_origin: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8888,
            cors_allow_origin: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub frontend_uri: String,
    pub fallback_return_path: String,
    pub scopes: Vec<String>,
    pub pending_login_ttl_secs: u64,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: "http://127.0.0.1:8888/callback".to_string(),
            frontend_uri: "http://127.0.0.1:3000".to_string(),
            fallback_return_path: "/".to_string(),
            scopes: vec![
                "user-read-currently-playing".to_string(),
                "user-read-playback-state".to_string(),
            ],
            pending_login_ttl_secs: 600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub api_base: String,
    pub accounts_base: String,
    pub timeout_ms: u64,
    pub user_agent: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.spotify.com".to_string(),
            accounts_base: "https://accounts.spotify.com".to_string(),
            timeout_ms: 5_000,
            user_agent: concat!("nowplaying-relay/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StabilizerConfig {
    pub stale_tolerance_ms: i64,
    pub near_end_ratio: f64,
    pub young_progress_ms: u64,
}

impl Default for StabilizerConfig {
    fn default() -> Self {
        Self {
            stale_tolerance_ms: 1_000,
            near_end_ratio: 0.92,
            young_progress_ms: 1_200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub log_level: String,
    pub http: HttpConfig,
    pub oauth: OAuthConfig,
    pub upstream: UpstreamConfig,
    pub stabilizer: StabilizerConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            schema_version: default_schema_version(),
            log_level: "info".to_string(),
            http: HttpConfig::default(),
            oauth: OAuthConfig::default(),
            upstream: UpstreamConfig::default(),
            stabilizer: StabilizerConfig::default(),
        }
    }
}

impl RelayConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.http.port == 0 {
            return Err(ConfigError::Invalid("http.port must be non-zero".into()));
        }
        let ratio = self.stabilizer.near_end_ratio;
        if !(ratio > 0.0 && ratio <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "stabilizer.near_end_ratio must be in (0, 1], got {ratio}"
            )));
        }
        if self.stabilizer.stale_tolerance_ms < 0 {
            return Err(ConfigError::Invalid(
                "stabilizer.stale_tolerance_ms must not be negative".into(),
            ));
        }
        if self.upstream.timeout_ms == 0 {
            return Err(ConfigError::Invalid("upstream.timeout_ms must be non-zero".into()));
        }
        for (name, value) in [
            ("oauth.redirect_uri", &self.oauth.redirect_uri),
            ("oauth.frontend_uri", &self.oauth.frontend_uri),
            ("upstream.api_base", &self.upstream.api_base),
            ("upstream.accounts_base", &self.upstream.accounts_base),
        ] {
            Url::parse(value).map_err(|e| ConfigError::Invalid(format!("{name}: {e}")))?;
        }
        if !self.oauth.fallback_return_path.starts_with('/') {
            return Err(ConfigError::Invalid(
                "oauth.fallback_return_path must start with '/'".into(),
            ));
        }
        Ok(())
    }

    pub fn validate_for_serving(&self) -> Result<(), ConfigError> {
        self.validate()?;
        if self.oauth.client_id.trim().is_empty() {
            return Err(ConfigError::Missing("oauth.client_id"));
        }
        if self.oauth.client_secret.trim().is_empty() {
            return Err(ConfigError::Missing("oauth.client_secret"));
        }
        Ok(())
    }

    pub fn redacted(&self) -> Self {
        let mut cfg = self.clone();
        if !cfg.oauth.client_secret.is_empty() {
            cfg.oauth.client_secret = "********".to_string();
        }
        cfg
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, RelayConfig};

    #[test]
    fn defaults_are_valid_but_not_servable() {
        let cfg = RelayConfig::default();
        assert!(cfg.validate().is_ok());
        assert!(matches!(
            cfg.validate_for_serving(),
            Err(ConfigError::Missing("oauth.client_id"))
        ));
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let cfg: RelayConfig = toml::from_str(
            r#"
            [stabilizer]
            near_end_ratio = 0.9

            [oauth]
            client_id = "abc"
            "#,
        )
        .expect("parse");

        assert_eq!(cfg.stabilizer.near_end_ratio, 0.9);
        assert_eq!(cfg.stabilizer.young_progress_ms, 1_200);
        assert_eq!(cfg.oauth.client_id, "abc");
        assert_eq!(cfg.http.port, 8888);
        assert_eq!(cfg.schema_version, 1);
    }

    #[test]
    fn rejects_out_of_range_ratio() {
        let mut cfg = RelayConfig::default();
        cfg.stabilizer.near_end_ratio = 1.5;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn redacts_client_secret() {
        let mut cfg = RelayConfig::default();
        cfg.oauth.client_secret = "hunter2".to_string();
        assert_eq!(cfg.redacted().oauth.client_secret, "********");
    }
}
