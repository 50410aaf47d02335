use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub track_id: Option<String>,
    pub track_duration_ms: u64,
    pub is_playing: bool,
    pub progress_ms: u64,
    pub reported_at_ms: i64,
    pub item: Option<Map<String, Value>>,
}

impl Sample {
    pub fn empty(now_ms: i64) -> Self {
        Self {
            track_id: None,
            track_duration_ms: 0,
            is_playing: false,
            progress_ms: 0,
            reported_at_ms: now_ms,
            item: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcceptedState {
    pub sample: Sample,
    pub accepted_at_ms: i64,
    pub source_status: u16,
}

impl AcceptedState {
    pub fn new(sample: Sample, accepted_at_ms: i64, source_status: u16) -> Self {
        Self {
            sample,
            accepted_at_ms,
            source_status,
        }
    }
}

pub fn epoch_ms(now: SystemTime) -> i64 {
    now.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

/// Stable short tag for a credential so logs can correlate polls without the secret.
pub fn credential_fingerprint(credential: &str) -> String {
    let mut hasher = DefaultHasher::new();
    credential.hash(&mut hasher);
    format!("{:08x}", hasher.finish() as u32)
}
