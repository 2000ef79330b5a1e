//! Reference number generation.
//!
//! A reference number is `{member_id}{yymmddHHMMSS}{sequence:05}`. The
//! sequence is a process-wide atomic counter seeded at random, so two calls in
//! the same second never collide within one process and restarts are unlikely
//! to replay a recent value. Cross-process uniqueness is backed by the
//! `(member_id, reference_number)` constraint in the order store; callers
//! regenerate on a constraint violation instead of reusing a value.

use chrono::{DateTime, Utc};
use rand::Rng;
use std::sync::atomic::{AtomicU32, Ordering};

const SEQUENCE_MODULUS: u32 = 100_000;

#[derive(Debug)]
pub struct ReferenceNumberGenerator {
    sequence: AtomicU32,
}

impl ReferenceNumberGenerator {
    pub fn new() -> Self {
        Self::with_seed(rand::thread_rng().gen_range(0..SEQUENCE_MODULUS))
    }

    pub fn with_seed(seed: u32) -> Self {
        Self {
            sequence: AtomicU32::new(seed % SEQUENCE_MODULUS),
        }
    }

    pub fn next(&self, member_id: &str) -> String {
        self.next_at(member_id, Utc::now())
    }

    pub fn next_at(&self, member_id: &str, now: DateTime<Utc>) -> String {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) % SEQUENCE_MODULUS;
        format!("{}{}{:05}", member_id, now.format("%y%m%d%H%M%S"), sequence)
    }
}

impl Default for ReferenceNumberGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn test_format() {
        let generator = ReferenceNumberGenerator::with_seed(42);
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        assert_eq!(generator.next_at("10001", now), "1000124030914050700042");
        assert_eq!(generator.next_at("10001", now), "1000124030914050700043");
    }

    #[test]
    fn test_sequence_wraps() {
        let generator = ReferenceNumberGenerator::with_seed(SEQUENCE_MODULUS - 1);
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert!(generator.next_at("M", now).ends_with("99999"));
        assert!(generator.next_at("M", now).ends_with("00000"));
    }

    #[tokio::test]
    async fn test_concurrent_calls_are_unique() {
        let generator = Arc::new(ReferenceNumberGenerator::new());
        let now = Utc::now();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let generator = Arc::clone(&generator);
                tokio::spawn(async move {
                    (0..500)
                        .map(|_| generator.next_at("10001", now))
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for reference in handle.await.unwrap() {
                assert!(seen.insert(reference), "duplicate reference number");
            }
        }
        assert_eq!(seen.len(), 4000);
    }
}
