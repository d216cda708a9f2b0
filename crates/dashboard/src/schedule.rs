//! Next-watering calculation from the plant's two daily slots.
//!
//! Both slots are read as wall-clock times on the calendar day of `now`, in
//! `now`'s UTC offset. A slot at or before `now` has already fired today, so
//! its next occurrence is the same time on the following date. The earlier of
//! the two candidates wins.
//!
//! Nothing here is cached: callers re-derive the value on every read since
//! the answer changes as `now` advances.

use serde::Serialize;
use time::OffsetDateTime;

use crate::plant::{Plant, WateringTime};

// ---------------------------------------------------------------------------
// Display value
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NextWatering {
    /// The bridge decided the plant needs nothing right now.
    NotNeeded,
    Scheduled {
        #[serde(with = "time::serde::rfc3339")]
        at: OffsetDateTime,
    },
}

// ---------------------------------------------------------------------------
// Calculation
// ---------------------------------------------------------------------------

/// Earliest upcoming occurrence of either slot, strictly after `now`.
pub fn next_watering(first: WateringTime, second: WateringTime, now: OffsetDateTime) -> OffsetDateTime {
    next_occurrence(first, now).min(next_occurrence(second, now))
}

/// What the dashboard shows for `plant` at `now`, gated on the bridge's
/// `isWateringScheduled` flag.
pub fn describe(plant: &Plant, now: OffsetDateTime) -> NextWatering {
    if !plant.is_watering_scheduled {
        return NextWatering::NotNeeded;
    }
    NextWatering::Scheduled {
        at: next_watering(plant.watering_time1, plant.watering_time2, now),
    }
}

fn next_occurrence(slot: WateringTime, now: OffsetDateTime) -> OffsetDateTime {
    let today = now.replace_time(slot.as_time());
    if today > now {
        return today;
    }
    // Date arithmetic keeps month and year rollover correct.
    match today.date().next_day() {
        Some(tomorrow) => today.replace_date(tomorrow),
        None => today,
    }
}

// ===========================================================================
// Tests
// ===========================================================================
