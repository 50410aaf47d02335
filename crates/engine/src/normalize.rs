//! Upstream status + payload to [`Sample`].
//!
//! Field defaults:
//!
//! | field               | source              | absent / wrong type |
//! |---------------------|---------------------|---------------------|
//! | `item`              | `item` (object)     | `None`              |
//! | `track_id`          | `item.id`, `item.uri` (string) | `None`   |
//! | `track_duration_ms` | `item.duration_ms`  | `0`                 |
//! | `is_playing`        | `is_playing` (bool) | `false`             |
//! | `progress_ms`       | `progress_ms`       | `0`                 |
//! | `reported_at_ms`    | `timestamp`         | `now_ms`            |
//!
//! Negative durations and progress read as `0`.
use nowplaying_relay_core::Sample;
use nowplaying_relay_upstream::STATUS_OK;
use serde_json::{Map, Value};

pub fn normalize(status: u16, payload: Option<&Value>, now_ms: i64) -> Sample {
    let Some(obj) = payload.and_then(Value::as_object) else {
        return Sample::empty(now_ms);
    };
    if status != STATUS_OK {
        return Sample::empty(now_ms);
    }

    let item = obj.get("item").and_then(Value::as_object).cloned();
    let track_id = item.as_ref().and_then(track_id);
    let track_duration_ms = item
        .as_ref()
        .and_then(|i| i.get("duration_ms"))
        .and_then(non_negative_ms)
        .unwrap_or(0);

    Sample {
        track_id,
        track_duration_ms,
        is_playing: obj
            .get("is_playing")
            .and_then(Value::as_bool)
            .unwrap_or(false),
        progress_ms: obj
            .get("progress_ms")
            .and_then(non_negative_ms)
            .unwrap_or(0),
        reported_at_ms: obj
            .get("timestamp")
            .and_then(epoch_ms_value)
            .unwrap_or(now_ms),
        item,
    }
}

fn track_id(item: &Map<String, Value>) -> Option<String> {
    ["id", "uri"]
        .iter()
        .filter_map(|key| item.get(*key).and_then(Value::as_str))
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

fn non_negative_ms(v: &Value) -> Option<u64> {
    if let Some(u) = v.as_u64() {
        return Some(u);
    }
    if v.as_i64().is_some() {
        return Some(0);
    }
    v.as_f64()
        .filter(|f| f.is_finite())
        .map(|f| if f <= 0.0 { 0 } else { f as u64 })
}

fn epoch_ms_value(v: &Value) -> Option<i64> {
    v.as_i64()
        .or_else(|| v.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
}

#[cfg(test)]
mod tests {
    use super::normalize;
    use nowplaying_relay_core::Sample;
    use serde_json::json;

    const NOW: i64 = 1_700_000_000_000;

    #[test]
    fn extracts_playing_track() {
        let payload = json!({
            "is_playing": true,
            "progress_ms": 42_000,
            "timestamp": NOW - 300,
            "item": {"id": "track-a", "duration_ms": 200_000, "name": "Song"}
        });
        let sample = normalize(200, Some(&payload), NOW);

        assert_eq!(sample.track_id.as_deref(), Some("track-a"));
        assert_eq!(sample.track_duration_ms, 200_000);
        assert!(sample.is_playing);
        assert_eq!(sample.progress_ms, 42_000);
        assert_eq!(sample.reported_at_ms, NOW - 300);
        assert_eq!(
            sample.item.as_ref().and_then(|i| i.get("name")),
            Some(&json!("Song"))
        );
    }

    #[test]
    fn empty_sample_regardless_of_payload_for_unusable_outcomes() {
        let noisy = json!({
            "is_playing": true,
            "progress_ms": 5,
            "item": {"id": "x", "duration_ms": 10}
        });
        let expected = Sample::empty(NOW);

        assert_eq!(normalize(204, None, NOW), expected);
        assert_eq!(normalize(204, Some(&noisy), NOW), expected);
        assert_eq!(normalize(401, Some(&noisy), NOW), expected);
        assert_eq!(normalize(503, None, NOW), expected);
        assert_eq!(normalize(200, None, NOW), expected);
        assert_eq!(normalize(200, Some(&json!("oops")), NOW), expected);
        assert_eq!(normalize(200, Some(&json!([1, 2])), NOW), expected);
    }

    #[test]
    fn applies_defaults_for_wrong_types() {
        let payload = json!({
            "is_playing": "yes",
            "progress_ms": "12",
            "timestamp": null,
            "item": {"uri": "spotify:track:b", "duration_ms": "long"}
        });
        let sample = normalize(200, Some(&payload), NOW);

        assert_eq!(sample.track_id.as_deref(), Some("spotify:track:b"));
        assert_eq!(sample.track_duration_ms, 0);
        assert!(!sample.is_playing);
        assert_eq!(sample.progress_ms, 0);
        assert_eq!(sample.reported_at_ms, NOW);
    }

    #[test]
    fn negative_and_fractional_numbers() {
        let payload = json!({
            "progress_ms": -250,
            "timestamp": 1234.9,
            "item": {"id": "c", "duration_ms": 1500.7}
        });
        let sample = normalize(200, Some(&payload), NOW);

        assert_eq!(sample.progress_ms, 0);
        assert_eq!(sample.track_duration_ms, 1500);
        assert_eq!(sample.reported_at_ms, 1234);
    }

    #[test]
    fn null_item_means_no_track() {
        let payload = json!({"is_playing": false, "progress_ms": 0, "item": null});
        let sample = normalize(200, Some(&payload), NOW);
        assert!(sample.track_id.is_none());
        assert!(sample.item.is_none());
    }
}
