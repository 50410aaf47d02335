use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

mod spotify;

pub use spotify::SpotifyClient;

pub const STATUS_OK: u16 = 200;
pub const STATUS_NO_CONTENT: u16 = 204;
// no HTTP status received at all
pub const STATUS_TRANSPORT_FAILURE: u16 = 0;

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    // payload is None when the body was not JSON
    Ok { payload: Option<Value> },
    NoContent,
    Status { status: u16, payload: Option<Value> },
    Transport { error: String },
}

impl FetchOutcome {
    pub fn from_response(status: u16, payload: Option<Value>) -> Self {
        match status {
            STATUS_OK => Self::Ok { payload },
            STATUS_NO_CONTENT => Self::NoContent,
            status => Self::Status { status, payload },
        }
    }

    pub fn transport(err: impl ToString) -> Self {
        Self::Transport {
            error: err.to_string(),
        }
    }

    pub fn status(&self) -> u16 {
        match self {
            Self::Ok { .. } => STATUS_OK,
            Self::NoContent => STATUS_NO_CONTENT,
            Self::Status { status, .. } => *status,
            Self::Transport { .. } => STATUS_TRANSPORT_FAILURE,
        }
    }

    pub fn payload(&self) -> Option<&Value> {
        match self {
            Self::Ok { payload } | Self::Status { payload, .. } => payload.as_ref(),
            Self::NoContent | Self::Transport { .. } => None,
        }
    }
}

#[async_trait]
pub trait PlaybackApi: Send + Sync {
    async fn fetch_currently_playing(&self, credential: &str) -> FetchOutcome;
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token endpoint rejected the grant ({status}): {error}")]
    Rejected { status: u16, error: String },
    #[error("token endpoint unreachable: {0}")]
    Transport(String),
    #[error("token endpoint returned an unreadable body: {0}")]
    Malformed(String),
}

impl TokenError {
    pub fn reason(&self) -> &str {
        match self {
            Self::Rejected { error, .. } => error,
            Self::Transport(_) => "token_endpoint_unreachable",
            Self::Malformed(_) => "token_response_malformed",
        }
    }
}

#[async_trait]
pub trait TokenApi: Send + Sync {
    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, TokenError>;
    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, TokenError>;
}
