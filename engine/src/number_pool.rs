//! Per-draw registry of issued ticket numbers and the degraded-mode number
//! generator.
//!
//! True cross-device uniqueness without shared state is unattainable; the
//! authoritative allocator's transactional counter is the real guarantee.
//! This generator only has to make collisions overwhelmingly unlikely when
//! devices cannot coordinate: each candidate mixes the wall clock with
//! hash-derived entropy salted per device.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use sweepdraw_common::DrawId;
use tracing::warn;
use uuid::Uuid;

use crate::state::Env;

pub const MIN_TICKET_NUMBER: u32 = 1;
pub const MAX_TICKET_NUMBER: u32 = 999_999;
/// Retry budget before a possible (untracked) collision is accepted.
pub const MAX_GENERATION_ATTEMPTS: u32 = 100;

const SPAN: u64 = (MAX_TICKET_NUMBER - MIN_TICKET_NUMBER + 1) as u64;

#[derive(Debug)]
pub struct NumberPool {
    assigned: BTreeMap<DrawId, BTreeSet<u32>>,
    /// Mixed into every candidate so two devices drawing at the same instant
    /// still diverge.
    device_salt: Uuid,
    counter: u64,
}

impl Default for NumberPool {
    fn default() -> Self {
        Self::new()
    }
}

impl NumberPool {
    pub fn new() -> Self {
        Self::with_salt(Uuid::new_v4())
    }

    pub fn with_salt(device_salt: Uuid) -> Self {
        NumberPool {
            assigned: BTreeMap::new(),
            device_salt,
            counter: 0,
        }
    }

    /// Produce a number in `[MIN, MAX]` not yet issued for `draw_id`.
    ///
    /// Retries draw fresh hash output; once the budget is spent the last
    /// candidate is accepted as-is. Best effort, not a mathematical
    /// guarantee — the offline path trades certainty for availability.
    pub fn generate(&mut self, draw_id: &DrawId, env: &Env) -> u32 {
        let mut candidate = MIN_TICKET_NUMBER;
        for attempt in 0..MAX_GENERATION_ATTEMPTS {
            candidate = self.candidate(draw_id, env.now, attempt);
            let taken = self
                .assigned
                .get(draw_id)
                .map_or(false, |set| set.contains(&candidate));
            if !taken {
                return candidate;
            }
        }
        warn!(
            draw_id = %draw_id,
            attempts = MAX_GENERATION_ATTEMPTS,
            "ticket-number retry budget exhausted; accepting possible collision"
        );
        candidate
    }

    fn candidate(&mut self, draw_id: &DrawId, now: DateTime<Utc>, attempt: u32) -> u32 {
        let mut hasher = Sha256::new();
        hasher.update(self.device_salt.as_bytes());
        hasher.update(draw_id.as_str().as_bytes());
        hasher.update(self.counter.to_be_bytes());
        hasher.update(attempt.to_be_bytes());
        self.counter += 1;
        let digest: [u8; 32] = hasher.finalize().into();

        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[0..8]);
        let random_part = u64::from_be_bytes(bytes);
        let time_part = now.timestamp_millis().max(0) as u64;

        MIN_TICKET_NUMBER + (time_part.wrapping_add(random_part) % SPAN) as u32
    }

    /// Idempotently record `number` as issued for `draw_id`. The registry
    /// persists for the draw's lifetime; numbers are never reused, even once
    /// the draw completes.
    pub fn register(&mut self, draw_id: &DrawId, number: u32) {
        self.assigned.entry(draw_id.clone()).or_default().insert(number);
    }

    pub fn is_assigned(&self, draw_id: &DrawId, number: u32) -> bool {
        self.assigned
            .get(draw_id)
            .map_or(false, |set| set.contains(&number))
    }

    pub fn assigned_count(&self, draw_id: &DrawId) -> u64 {
        self.assigned.get(draw_id).map_or(0, |set| set.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use sweepdraw_common::derive_draw_id;

    fn env() -> Env {
        Env::at(Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap())
    }

    #[test]
    fn test_generated_numbers_unique_within_draw() {
        let mut pool = NumberPool::new();
        let draw_id = derive_draw_id(1, env().now);
        let mut seen = BTreeSet::new();
        for _ in 0..500 {
            let n = pool.generate(&draw_id, &env());
            pool.register(&draw_id, n);
            assert!((MIN_TICKET_NUMBER..=MAX_TICKET_NUMBER).contains(&n));
            assert!(seen.insert(n), "duplicate number {} issued", n);
        }
        assert_eq!(pool.assigned_count(&draw_id), 500);
    }

    #[test]
    fn test_registries_are_per_draw() {
        let mut pool = NumberPool::new();
        let d1 = derive_draw_id(1, env().now);
        let d2 = derive_draw_id(2, env().now);
        pool.register(&d1, 42);
        assert!(pool.is_assigned(&d1, 42));
        assert!(!pool.is_assigned(&d2, 42));
    }

    #[test]
    fn test_register_is_idempotent() {
        let mut pool = NumberPool::new();
        let d1 = derive_draw_id(1, env().now);
        pool.register(&d1, 42);
        pool.register(&d1, 42);
        assert_eq!(pool.assigned_count(&d1), 1);
    }

    #[test]
    fn test_distinct_salts_diverge_at_same_instant() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut pool_a = NumberPool::with_salt(a);
        let mut pool_b = NumberPool::with_salt(b);
        let draw_id = derive_draw_id(1, env().now);

        let from_a: Vec<u32> = (0..20)
            .map(|_| {
                let n = pool_a.generate(&draw_id, &env());
                pool_a.register(&draw_id, n);
                n
            })
            .collect();
        let from_b: Vec<u32> = (0..20)
            .map(|_| {
                let n = pool_b.generate(&draw_id, &env());
                pool_b.register(&draw_id, n);
                n
            })
            .collect();
        // Same wall clock, different devices: sequences should not line up.
        assert_ne!(from_a, from_b);
    }
}
