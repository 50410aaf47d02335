use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub struct PendingLogins {
    ttl: Duration,
    issued: Mutex<HashMap<String, Instant>>,
}

impl PendingLogins {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            issued: Mutex::new(HashMap::new()),
        }
    }

    pub fn issue(&self, now: Instant) -> String {
        let nonce = uuid::Uuid::new_v4().simple().to_string();
        let mut issued = self.issued.lock().unwrap_or_else(|e| e.into_inner());
        let ttl = self.ttl;
        issued.retain(|_, at| now.saturating_duration_since(*at) < ttl);
        issued.insert(nonce.clone(), now);
        nonce
    }

    /// True when `nonce` was issued and has not expired; a nonce redeems once.
    pub fn redeem(&self, nonce: &str, now: Instant) -> bool {
        let mut issued = self.issued.lock().unwrap_or_else(|e| e.into_inner());
        match issued.remove(nonce) {
            Some(at) => now.saturating_duration_since(at) < self.ttl,
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.issued.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
