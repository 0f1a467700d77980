//! Sync clock: per-record export eligibility.

use chrono::{DateTime, Duration, FixedOffset, Utc};

/// Far-past stand-in for an unset `last_update`.
fn sentinel() -> DateTime<FixedOffset> {
    DateTime::<Utc>::MIN_UTC.into()
}

/// `true` iff `record_updated_at` is strictly after `last_update`.
///
/// An unset `last_update` makes every record due. Offsets are honoured:
/// instants are compared, not wall-clock readings.
pub fn is_due(
    record_updated_at: DateTime<FixedOffset>,
    last_update: Option<DateTime<FixedOffset>>,
) -> bool {
    record_updated_at > last_update.unwrap_or_else(sentinel)
}

/// Pick the effective high-water mark: an explicit override wins, then the
/// persisted state, then the configured value.
pub fn effective_last_update(
    since: Option<DateTime<FixedOffset>>,
    stored: Option<DateTime<FixedOffset>>,
    configured: Option<DateTime<FixedOffset>>,
) -> Option<DateTime<FixedOffset>> {
    since.or(stored).or(configured)
}

/// Immutable clock for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncClock {
    last_update: Option<DateTime<FixedOffset>>,
}

impl SyncClock {
    pub fn new(last_update: Option<DateTime<FixedOffset>>) -> Self {
        SyncClock { last_update }
    }

    pub fn last_update(&self) -> Option<DateTime<FixedOffset>> {
        self.last_update
    }

    pub fn is_due(&self, record_updated_at: DateTime<FixedOffset>) -> bool {
        is_due(record_updated_at, self.last_update)
    }

    /// The mark to persist after a clean run that pushed records updated at
    /// `pushed`. Never moves backwards.
    ///
    /// `held_back` are the update times of due records the run skipped
    /// without pushing. The mark stays strictly below the earliest of them
    /// so those records are due again next run.
    pub fn advanced<I, H>(&self, pushed: I, held_back: H) -> Option<DateTime<FixedOffset>>
    where
        I: IntoIterator<Item = DateTime<FixedOffset>>,
        H: IntoIterator<Item = DateTime<FixedOffset>>,
    {
        let latest = pushed.into_iter().fold(self.last_update, |mark, at| match mark {
            Some(m) if m >= at => Some(m),
            _ => Some(at),
        });
        let Some(ceiling) = held_back
            .into_iter()
            .filter(|at| self.is_due(*at))
            .min()
            .map(|at| at - Duration::nanoseconds(1))
        else {
            return latest;
        };
        match latest {
            // Held-back records were due, so the ceiling is never below the old mark.
            Some(mark) if mark > ceiling => Some(ceiling),
            other => other,
        }
    }
}
