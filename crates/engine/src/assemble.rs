use crate::guard::Decision;
use nowplaying_relay_core::Sample;
use nowplaying_relay_upstream::FetchOutcome;
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NowPlayingResponse {
    pub item: Option<Map<String, Value>>,
    pub is_playing: bool,
    pub progress_ms: u64,
    pub timestamp: i64,
    pub server_now: i64,
    pub source_status: u16,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub stale_guard: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub early_switch_suppressed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_error: Option<String>,
}

impl NowPlayingResponse {
    fn from_sample(sample: &Sample, source_status: u16, server_now: i64) -> Self {
        Self {
            item: sample.item.clone(),
            is_playing: sample.is_playing,
            progress_ms: sample.progress_ms,
            timestamp: sample.reported_at_ms,
            server_now,
            source_status,
            stale_guard: false,
            early_switch_suppressed: false,
            upstream_error: None,
        }
    }

    pub fn failure(outcome: &FetchOutcome, marker: String, now_ms: i64, server_now: i64) -> Self {
        let mut resp = Self::from_sample(&Sample::empty(now_ms), outcome.status(), server_now);
        resp.upstream_error = Some(marker);
        resp
    }
}

// None when the outcome may reach the guard.
pub fn failure_marker(outcome: &FetchOutcome) -> Option<String> {
    match outcome {
        FetchOutcome::Ok { payload } if payload.as_ref().is_some_and(Value::is_object) => None,
        FetchOutcome::Ok { .. } => Some("malformed_payload".to_string()),
        FetchOutcome::NoContent => None,
        FetchOutcome::Status { status, .. } => Some(format!("status_{status}")),
        FetchOutcome::Transport { .. } => Some("transport".to_string()),
    }
}

pub fn assemble(decision: &Decision, server_now: i64) -> NowPlayingResponse {
    let state = decision.state();
    let mut resp = NowPlayingResponse::from_sample(&state.sample, state.source_status, server_now);
    match decision {
        Decision::Accept(_) => {}
        Decision::KeepStale(_) => resp.stale_guard = true,
        Decision::KeepSuppressed(_) => resp.early_switch_suppressed = true,
    }
    resp
}

pub fn passthrough(outcome: &FetchOutcome, now_ms: i64, server_now: i64) -> Value {
    if let FetchOutcome::Ok {
        payload: Some(Value::Object(raw)),
    } = outcome
    {
        let mut body = raw.clone();
        body.insert("server_now".to_string(), Value::from(server_now));
        return Value::Object(body);
    }

    let resp = match failure_marker(outcome) {
        Some(marker) => NowPlayingResponse::failure(outcome, marker, now_ms, server_now),
        None => NowPlayingResponse::from_sample(&Sample::empty(now_ms), outcome.status(), server_now),
    };
    serde_json::to_value(resp).unwrap_or_else(|_| Value::Object(Map::new()))
}
