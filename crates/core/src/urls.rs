use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use url::Url;

use crate::config::{OAuthConfig, UpstreamConfig};

const STATE_SEGMENT: &AsciiSet = &CONTROLS.add(b' ').add(b':').add(b'%').add(b'#');

/// Keeps only same-site relative paths; anything else collapses to `fallback`.
pub fn sanitize_return_path(raw: Option<&str>, fallback: &str) -> String {
    let Some(path) = raw.map(str::trim).filter(|p| !p.is_empty()) else {
        return fallback.to_string();
    };

    let rejected = !path.starts_with('/')
        || path.starts_with("//")
        || path.contains('\\')
        || path.chars().any(char::is_control)
        || path.contains("://");

    if rejected {
        fallback.to_string()
    } else {
        path.to_string()
    }
}

/// `state` is `<nonce>` or `<nonce>:<escaped return path>`.
pub fn encode_login_state(nonce: &str, return_path: Option<&str>) -> String {
    match return_path {
        Some(path) => format!("{nonce}:{}", utf8_percent_encode(path, STATE_SEGMENT)),
        None => nonce.to_string(),
    }
}

pub fn decode_login_state(state: &str) -> (String, Option<String>) {
    match state.split_once(':') {
        Some((nonce, path)) => {
            let path = percent_encoding::percent_decode_str(path)
                .decode_utf8_lossy()
                .into_owned();
            (nonce.to_string(), Some(path))
        }
        None => (state.to_string(), None),
    }
}

pub fn authorize_url(
    upstream: &UpstreamConfig,
    oauth: &OAuthConfig,
    state: &str,
) -> Result<Url, url::ParseError> {
    let base = format!("{}/authorize", upstream.accounts_base.trim_end_matches('/'));
    Url::parse_with_params(
        &base,
        &[
            ("client_id", oauth.client_id.as_str()),
            ("response_type", "code"),
            ("redirect_uri", oauth.redirect_uri.as_str()),
            ("scope", oauth.scopes.join(" ").as_str()),
            ("state", state),
        ],
    )
}

/// Frontend location the browser lands on after the OAuth dance. The return
/// path is resolved beneath the frontend's own path prefix.
pub fn frontend_redirect(
    frontend_uri: &str,
    return_path: &str,
    params: &[(&str, &str)],
) -> Result<Url, url::ParseError> {
    let base = Url::parse(frontend_uri)?;
    let prefix = base.path().trim_end_matches('/');
    let mut url = base.join(&format!("{prefix}{return_path}"))?;
    if url.origin() != base.origin() {
        url = base;
    }
    if !params.is_empty() {
        url.query_pairs_mut().extend_pairs(params);
    }
    Ok(url)
}
