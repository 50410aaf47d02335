mod assemble;
mod guard;
mod normalize;
mod store;

pub use assemble::{assemble, failure_marker, passthrough, NowPlayingResponse};
pub use guard::{estimated_progress_ms, Decision, StabilizationGuard};
pub use normalize::normalize;
pub use store::StateStore;

use nowplaying_relay_core::{credential_fingerprint, AcceptedState, StabilizerConfig};
use nowplaying_relay_upstream::FetchOutcome;
use tracing::{debug, info};

pub struct Stabilizer {
    guard: StabilizationGuard,
    store: StateStore,
}

impl Stabilizer {
    pub fn new(cfg: StabilizerConfig) -> Self {
        Self {
            guard: StabilizationGuard::new(cfg),
            store: StateStore::new(),
        }
    }

    // Failed outcomes never touch the store.
    pub fn observe(&self, credential: &str, outcome: &FetchOutcome, now_ms: i64) -> Option<Decision> {
        if failure_marker(outcome).is_some() {
            return None;
        }
        let status = outcome.status();
        let sample = normalize(status, outcome.payload(), now_ms);
        let decision = self.store.update(credential, |previous| {
            self.guard.decide(previous, sample, status, now_ms)
        });

        match &decision {
            Decision::Accept(state) => debug!(
                credential = %credential_fingerprint(credential),
                track = state.sample.track_id.as_deref().unwrap_or("<none>"),
                status,
                "sample accepted"
            ),
            Decision::KeepStale(_) | Decision::KeepSuppressed(_) => info!(
                credential = %credential_fingerprint(credential),
                stale = matches!(decision, Decision::KeepStale(_)),
                "sample rejected; re-serving accepted state"
            ),
        }
        Some(decision)
    }

    pub fn respond(
        &self,
        credential: &str,
        outcome: &FetchOutcome,
        now_ms: i64,
        server_now: i64,
    ) -> NowPlayingResponse {
        match self.observe(credential, outcome, now_ms) {
            Some(decision) => assemble(&decision, server_now),
            None => {
                let marker = failure_marker(outcome).unwrap_or_default();
                NowPlayingResponse::failure(outcome, marker, now_ms, server_now)
            }
        }
    }

    pub fn accepted(&self, credential: &str) -> Option<AcceptedState> {
        self.store.get(credential)
    }

    pub fn tracked_credentials(&self) -> usize {
        self.store.len()
    }
}
