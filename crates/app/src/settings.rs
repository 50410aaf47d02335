use anyhow::{Context, Result};
use nowplaying_relay_core::RelayConfig;
use std::path::{Path, PathBuf};

pub fn default_config_path() -> PathBuf {
    let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("nowplaying-relay").join("config.toml")
}

pub fn init_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }
    let cfg = RelayConfig::default();
    let toml = toml::to_string_pretty(&cfg)?;
    std::fs::write(path, toml)
        .with_context(|| format!("failed to write config file {}", path.display()))?;
    Ok(())
}

pub fn load_or_default(path: &Path) -> Result<RelayConfig> {
    let mut cfg = if !path.exists() {
        RelayConfig::default()
    } else {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&data).with_context(|| format!("failed to parse {}", path.display()))?
    };
    apply_overrides(&mut cfg, |key| std::env::var(key).ok());
    Ok(cfg)
}

/// Overlays deployment-provided values; blank values are ignored.
pub fn apply_overrides<F>(cfg: &mut RelayConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(v) = get("NOWPLAYING_RELAY_CLIENT_ID") {
        cfg.oauth.client_id = v;
    }
    if let Some(v) = get("NOWPLAYING_RELAY_CLIENT_SECRET") {
        cfg.oauth.client_secret = v;
    }
    if let Some(v) = get("NOWPLAYING_RELAY_REDIRECT_URI") {
        cfg.oauth.redirect_uri = v;
    }
    if let Some(v) = get("NOWPLAYING_RELAY_FRONTEND_URI") {
        cfg.oauth.frontend_uri = v;
    }
    if let Some(v) = get("NOWPLAYING_RELAY_LOG_LEVEL") {
        cfg.log_level = v;
    }
    if let Some(v) = get("NOWPLAYING_RELAY_HOST") {
        cfg.http.host = v;
    }
    if let Some(port) = get("PORT").and_then(|v| v.trim().parse::<u16>().ok()) {
        cfg.http.port = port;
    }
}

#[cfg(test)]
mod tests {
    use super::{apply_overrides, init_config, load_or_default};
    use nowplaying_relay_core::RelayConfig;
    use std::collections::HashMap;

    #[test]
    fn env_overrides_replace_file_values() {
        let env: HashMap<&str, &str> = [
            ("NOWPLAYING_RELAY_CLIENT_ID", "cid"),
            ("NOWPLAYING_RELAY_CLIENT_SECRET", "sec"),
            ("NOWPLAYING_RELAY_FRONTEND_URI", "https://overlay.example"),
            ("NOWPLAYING_RELAY_LOG_LEVEL", "   "),
            ("PORT", "9001"),
        ]
        .into_iter()
        .collect();

        let mut cfg = RelayConfig::default();
        apply_overrides(&mut cfg, |k| env.get(k).map(|v| v.to_string()));

        assert_eq!(cfg.oauth.client_id, "cid");
        assert_eq!(cfg.oauth.client_secret, "sec");
        assert_eq!(cfg.oauth.frontend_uri, "https://overlay.example");
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.http.port, 9001);
    }

    #[test]
    fn unparsable_port_is_ignored() {
        let mut cfg = RelayConfig::default();
        apply_overrides(&mut cfg, |k| (k == "PORT").then(|| "http".to_string()));
        assert_eq!(cfg.http.port, 8888);
    }

    #[test]
    fn init_then_load_round_trips_defaults() {
        let dir = std::env::temp_dir().join(format!("nowplaying-relay-{}", uuid::Uuid::new_v4()));
        let path = dir.join("config.toml");

        init_config(&path).expect("init");
        let cfg = load_or_default(&path).expect("load");
        assert_eq!(cfg.stabilizer, RelayConfig::default().stabilizer);
        assert_eq!(cfg.upstream.timeout_ms, 5_000);

        let _ = std::fs::remove_dir_all(dir);
    }
}
