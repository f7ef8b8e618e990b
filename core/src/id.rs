//! Twin identifier generation.
//!
//! Ids keep the `{type}:{millis}` form the backend and existing records use.
//! The millisecond component is strictly increasing within the process, so
//! two creations in the same millisecond still get distinct ids.
// TODO: move id assignment to the backend once it can return generated ids
// from POST; cross-process collisions are still possible.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::types::TwinType;

static LAST_ISSUED: AtomicU64 = AtomicU64::new(0);

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Next timestamp component: the wall clock, bumped past the last one issued.
fn next_stamp(now: u64, last: &AtomicU64) -> u64 {
    let mut prev = last.load(Ordering::Relaxed);
    loop {
        let candidate = now.max(prev + 1);
        match last.compare_exchange_weak(prev, candidate, Ordering::AcqRel, Ordering::Relaxed) {
            Ok(_) => return candidate,
            Err(actual) => prev = actual,
        }
    }
}

pub fn generate_twin_id(twin_type: TwinType) -> String {
    let stamp = next_stamp(now_millis(), &LAST_ISSUED);
    format!("{twin_type}:{stamp}")
}

pub fn policy_ref_for(id: &str) -> String {
    format!("{id}:policy")
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn id_has_type_prefix_and_digits() {
        let id = generate_twin_id(TwinType::Sensor);
        let (prefix, digits) = id.split_once(':').unwrap();
        assert_eq!(prefix, "Sensor");
        assert!(!digits.is_empty());
        assert!(digits.chars().all(|c| c.is_ascii_digit()), "{id}");
    }

    #[test]
    fn same_millisecond_stamps_are_bumped() {
        let last = AtomicU64::new(0);
        assert_eq!(next_stamp(1_000, &last), 1_000);
        assert_eq!(next_stamp(1_000, &last), 1_001);
        assert_eq!(next_stamp(999, &last), 1_002);
        assert_eq!(next_stamp(5_000, &last), 5_000);
    }

    #[test]
    fn rapid_generation_never_collides() {
        let ids: HashSet<String> = (0..1_000).map(|_| generate_twin_id(TwinType::Gateway)).collect();
        assert_eq!(ids.len(), 1_000);
    }

    #[test]
    fn policy_ref_appends_suffix() {
        assert_eq!(policy_ref_for("Sensor:1"), "Sensor:1:policy");
    }
}
