pub mod config;
pub mod model;
pub mod urls;

pub use config::{
    ConfigError, HttpConfig, OAuthConfig, RelayConfig, StabilizerConfig, UpstreamConfig,
};
pub use model::{credential_fingerprint, epoch_ms, AcceptedState, Sample};
