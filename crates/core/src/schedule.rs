use chrono::{DateTime, Datelike, NaiveDate, Timelike, Weekday};
use chrono_tz::Tz;

use crate::catalog::Bucket;

/// A wall-clock trigger pattern: minute/hour/weekday, no seconds.
///
/// A slot matches at most one tick per week in a given timezone; the
/// dispatcher evaluates it against the local wall clock of its entry's zone.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Slot {
    pub minute: u32,
    pub hour: u32,
    pub weekday: Weekday,
}

impl Slot {
    pub const fn new(minute: u32, hour: u32, weekday: Weekday) -> Self {
        Self { minute, hour, weekday }
    }

    /// Whether this slot fires at the given local wall-clock instant.
    pub fn matches(&self, local: &DateTime<Tz>) -> bool {
        local.minute() == self.minute
            && local.hour() == self.hour
            && local.weekday() == self.weekday
    }
}

/// Which bucket a schedule entry posts, possibly alternating on a derived
/// date discriminant so two content types can share one weekly slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BucketChoice {
    Fixed(Bucket),
    /// ISO week-number parity: `odd` on odd weeks, `even` on even weeks.
    WeekParity { odd: Bucket, even: Bucket },
    /// Day-of-month parity: `odd` on odd days, `even` on even days.
    DayParity { odd: Bucket, even: Bucket },
}

impl BucketChoice {
    /// Resolve the bucket for a date. Pure, so alternation is testable
    /// without the dispatcher's timing machinery.
    pub fn for_date(&self, date: NaiveDate) -> Bucket {
        match *self {
            Self::Fixed(bucket) => bucket,
            Self::WeekParity { odd, even } => {
                if date.iso_week().week() % 2 == 1 {
                    odd
                } else {
                    even
                }
            }
            Self::DayParity { odd, even } => {
                if date.day() % 2 == 1 {
                    odd
                } else {
                    even
                }
            }
        }
    }
}
