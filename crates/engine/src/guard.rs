use nowplaying_relay_core::{AcceptedState, Sample, StabilizerConfig};
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Accept(AcceptedState),
    KeepStale(AcceptedState),
    KeepSuppressed(AcceptedState),
}

impl Decision {
    pub fn state(&self) -> &AcceptedState {
        match self {
            Self::Accept(s) | Self::KeepStale(s) | Self::KeepSuppressed(s) => s,
        }
    }

    pub fn is_accept(&self) -> bool {
        matches!(self, Self::Accept(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    Stale,
    EarlySwitch,
}

#[derive(Debug, Clone)]
pub struct StabilizationGuard {
    cfg: StabilizerConfig,
}

impl StabilizationGuard {
    pub fn new(cfg: StabilizerConfig) -> Self {
        Self { cfg }
    }

    pub fn decide(
        &self,
        previous: Option<&AcceptedState>,
        sample: Sample,
        source_status: u16,
        now_ms: i64,
    ) -> Decision {
        let Some(prev) = previous else {
            return Decision::Accept(AcceptedState::new(sample, now_ms, source_status));
        };

        match self.reject(prev, &sample, now_ms) {
            Some(Rejection::Stale) => {
                debug!(
                    sample_ts = sample.reported_at_ms,
                    accepted_ts = prev.sample.reported_at_ms,
                    "stale sample rejected"
                );
                Decision::KeepStale(prev.clone())
            }
            Some(Rejection::EarlySwitch) => {
                debug!(
                    from = prev.sample.track_id.as_deref().unwrap_or_default(),
                    to = sample.track_id.as_deref().unwrap_or_default(),
                    new_progress_ms = sample.progress_ms,
                    "early track switch suppressed"
                );
                Decision::KeepSuppressed(prev.clone())
            }
            None => {
                // Polls that raced for the lock may carry an older clock reading.
                let accepted_at = now_ms.max(prev.accepted_at_ms);
                Decision::Accept(AcceptedState::new(sample, accepted_at, source_status))
            }
        }
    }

    fn reject(&self, prev: &AcceptedState, sample: &Sample, now_ms: i64) -> Option<Rejection> {
        let tolerance = self.cfg.stale_tolerance_ms;
        if sample.reported_at_ms.saturating_add(tolerance) < prev.sample.reported_at_ms {
            return Some(Rejection::Stale);
        }

        let switched = match (&prev.sample.track_id, &sample.track_id) {
            (Some(from), Some(to)) => from != to,
            _ => false,
        };
        // Without a known duration there is nothing to judge the switch against.
        if !switched || prev.sample.track_duration_ms == 0 {
            return None;
        }

        let near_end = progress_ratio(prev, now_ms) >= self.cfg.near_end_ratio;
        let new_is_young = sample.progress_ms < self.cfg.young_progress_ms;
        if !near_end && new_is_young {
            Some(Rejection::EarlySwitch)
        } else {
            None
        }
    }
}

pub fn estimated_progress_ms(prev: &AcceptedState, now_ms: i64) -> u64 {
    let s = &prev.sample;
    if !s.is_playing {
        return s.progress_ms;
    }
    let elapsed = now_ms.saturating_sub(prev.accepted_at_ms).max(0) as u64;
    let estimate = s.progress_ms.saturating_add(elapsed);
    if s.track_duration_ms > 0 {
        estimate.min(s.track_duration_ms)
    } else {
        estimate
    }
}

fn progress_ratio(prev: &AcceptedState, now_ms: i64) -> f64 {
    let duration = prev.sample.track_duration_ms;
    if duration == 0 {
        return 0.0;
    }
    estimated_progress_ms(prev, now_ms) as f64 / duration as f64
}
