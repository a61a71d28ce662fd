//! Agenda projection: bucket scheduled cards into per-day lanes.
//!
//! # Responsibility
//! - Slice a date range into day buckets and assign scheduled cards to them.
//!
//! # Invariants
//! - Day identity is the UTC epoch-day number; no calendar or timezone
//!   arithmetic happens in core.
//! - Every day in the requested range yields a bucket, scheduled or not.
//! - Bucket entries follow lane display order `(position, created_at)`.

use crate::model::item::HubItem;
use crate::ordering::position::sort_for_display;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Milliseconds per UTC day.
pub const MS_PER_DAY: i64 = 86_400_000;

/// Widest range the agenda will materialize in one call.
pub const MAX_AGENDA_DAYS: i64 = 366;

/// Errors from agenda range handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgendaError {
    /// Range end precedes range start.
    InvalidRange { start_ms: i64, end_ms: i64 },
    /// Range spans more days than the agenda materializes at once.
    RangeTooWide { days: i64, max: i64 },
}

impl Display for AgendaError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRange { start_ms, end_ms } => {
                write!(f, "agenda range end {end_ms} precedes start {start_ms}")
            }
            Self::RangeTooWide { days, max } => {
                write!(f, "agenda range spans {days} days, maximum is {max}")
            }
        }
    }
}

impl Error for AgendaError {}

/// One agenda day with its scheduled cards.
#[derive(Debug, Clone, PartialEq)]
pub struct DayBucket {
    /// UTC epoch-day number identifying the bucket.
    pub epoch_day: i64,
    /// Lane key under which this day's ordering lives.
    pub lane: String,
    /// Scheduled cards, in display order.
    pub entries: Vec<HubItem>,
}

/// Converts an epoch-milliseconds timestamp to its UTC epoch-day number.
pub fn epoch_day(epoch_ms: i64) -> i64 {
    epoch_ms.div_euclid(MS_PER_DAY)
}

/// Lane key for one agenda day bucket.
pub fn lane_for_epoch_day(day: i64) -> String {
    format!("day:{day}")
}

/// Buckets scheduled, active cards into the days of `[range_start_ms,
/// range_end_ms]`.
///
/// Cards bucket by the day of their `event_start`; unscheduled or
/// soft-deleted cards are ignored. Days without entries still appear so the
/// agenda can render an empty row for them.
pub fn bucket_by_day(
    items: &[HubItem],
    range_start_ms: i64,
    range_end_ms: i64,
) -> Result<Vec<DayBucket>, AgendaError> {
    if range_end_ms < range_start_ms {
        return Err(AgendaError::InvalidRange {
            start_ms: range_start_ms,
            end_ms: range_end_ms,
        });
    }

    let first_day = epoch_day(range_start_ms);
    let last_day = epoch_day(range_end_ms);
    let days = last_day - first_day + 1;
    if days > MAX_AGENDA_DAYS {
        return Err(AgendaError::RangeTooWide {
            days,
            max: MAX_AGENDA_DAYS,
        });
    }

    let mut buckets: Vec<DayBucket> = (first_day..=last_day)
        .map(|day| DayBucket {
            epoch_day: day,
            lane: lane_for_epoch_day(day),
            entries: Vec::new(),
        })
        .collect();

    for item in items {
        if !item.is_active() {
            continue;
        }
        let Some(start_ms) = item.event_start else {
            continue;
        };
        let day = epoch_day(start_ms);
        if day < first_day || day > last_day {
            continue;
        }
        buckets[(day - first_day) as usize].entries.push(item.clone());
    }

    for bucket in &mut buckets {
        sort_for_display(&mut bucket.entries);
    }

    Ok(buckets)
}
