//! Audit timestamps and pre-save hooks.
//!
//! # Responsibility
//! - Hold `created_at`/`updated_at` for every persisted entity.
//! - Provide the hooks repositories call right before insert/update SQL.
//!
//! # Invariants
//! - `created_at` is set once by `pre_persist` and never touched afterwards.
//! - `updated_at` never moves backwards through `pre_update`.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Unix epoch milliseconds.
pub type EpochMillis = i64;

/// Creation and last-modification instants of a persisted entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamps {
    pub created_at: EpochMillis,
    pub updated_at: EpochMillis,
}

/// Entities carrying audit timestamps.
///
/// Repositories call `pre_persist` before `INSERT` and `pre_update` before
/// `UPDATE`; callers never have to set timestamps by hand.
pub trait Auditable {
    fn timestamps(&self) -> &Timestamps;
    fn timestamps_mut(&mut self) -> &mut Timestamps;

    /// Stamps both instants with `now`.
    fn pre_persist(&mut self, now: EpochMillis) {
        let timestamps = self.timestamps_mut();
        timestamps.created_at = now;
        timestamps.updated_at = now;
    }

    /// Moves `updated_at` to `now`, keeping `created_at` intact.
    fn pre_update(&mut self, now: EpochMillis) {
        let timestamps = self.timestamps_mut();
        timestamps.updated_at = now.max(timestamps.updated_at);
    }
}

/// Current wall-clock time in epoch milliseconds.
///
/// Clocks set before 1970 collapse to `0`.
pub fn now_epoch_ms() -> EpochMillis {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::{now_epoch_ms, Auditable, Timestamps};

    #[derive(Default)]
    struct Probe {
        timestamps: Timestamps,
    }

    impl Auditable for Probe {
        fn timestamps(&self) -> &Timestamps {
            &self.timestamps
        }

        fn timestamps_mut(&mut self) -> &mut Timestamps {
            &mut self.timestamps
        }
    }

    #[test]
    fn pre_persist_sets_both_instants() {
        let mut probe = Probe::default();
        probe.pre_persist(1_000);
        assert_eq!(probe.timestamps().created_at, 1_000);
        assert_eq!(probe.timestamps().updated_at, 1_000);
    }

    #[test]
    fn pre_update_keeps_created_at_and_never_rewinds() {
        let mut probe = Probe::default();
        probe.pre_persist(1_000);
        probe.pre_update(2_000);
        assert_eq!(probe.timestamps().created_at, 1_000);
        assert_eq!(probe.timestamps().updated_at, 2_000);

        probe.pre_update(1_500);
        assert_eq!(probe.timestamps().updated_at, 2_000);
    }

    #[test]
    fn now_is_after_2020() {
        assert!(now_epoch_ms() > 1_577_836_800_000);
    }
}
