use std::str::FromStr;

use anyhow::{Result, anyhow};
use time::macros::time;
use time::{Duration, OffsetDateTime, Time, UtcOffset, Weekday};

/// Business-hours clock: a daily working window on a fixed set of weekdays,
/// evaluated in one UTC offset.
///
/// The offset does not follow daylight-saving changes. Windows on days across
/// a DST transition from the captured offset are shifted by the difference,
/// usually one hour. On Unix `time` only reads the local offset while the
/// process is single-threaded, so `main` captures it once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkCalendar {
    pub hours: WorkHours,
    /// Indexed by `Weekday::number_days_from_monday`.
    pub work_days: [bool; 7],
    pub offset: UtcOffset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkHours {
    pub start: Time,
    pub end: Time,
}

impl Default for WorkHours {
    fn default() -> Self {
        Self {
            start: time!(9:00),
            end: time!(17:00),
        }
    }
}

/// Parses `HH:MM-HH:MM`.
impl FromStr for WorkHours {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (start, end) = s
            .split_once('-')
            .ok_or_else(|| anyhow!("work hours must look like 09:00-17:00, got {s:?}"))?;
        let start = parse_clock(start)?;
        let end = parse_clock(end)?;
        if end <= start {
            return Err(anyhow!("work hours must end after they start: {s:?}"));
        }
        Ok(Self { start, end })
    }
}

fn parse_clock(s: &str) -> Result<Time> {
    let (h, m) = s
        .trim()
        .split_once(':')
        .ok_or_else(|| anyhow!("expected HH:MM, got {s:?}"))?;
    let h: u8 = h.parse().map_err(|_| anyhow!("invalid hour in {s:?}"))?;
    let m: u8 = m.parse().map_err(|_| anyhow!("invalid minute in {s:?}"))?;
    Time::from_hms(h, m, 0).map_err(|e| anyhow!("invalid time {s:?}: {e}"))
}

impl WorkCalendar {
    /// Monday to Friday within `hours`.
    pub fn new(hours: WorkHours, offset: UtcOffset) -> Self {
        Self {
            hours,
            work_days: [true, true, true, true, true, false, false],
            offset,
        }
    }

    pub fn is_work_day(&self, day: Weekday) -> bool {
        self.work_days[day.number_days_from_monday() as usize]
    }

    /// Working time elapsed between `from` and `to`; zero when `to` is not
    /// after `from`.
    pub fn working_duration(&self, from: OffsetDateTime, to: OffsetDateTime) -> Duration {
        if to <= from {
            return Duration::ZERO;
        }
        let from = from.to_offset(self.offset);
        let to = to.to_offset(self.offset);

        let mut total = Duration::ZERO;
        let mut day = from.date();
        let last = to.date();
        while day <= last {
            if self.is_work_day(day.weekday()) {
                let open = day.with_time(self.hours.start).assume_offset(self.offset);
                let close = day.with_time(self.hours.end).assume_offset(self.offset);
                let lo = open.max(from);
                let hi = close.min(to);
                if hi > lo {
                    total += hi - lo;
                }
            }
            match day.next_day() {
                Some(next) => day = next,
                None => break,
            }
        }
        total
    }

    /// Whole working hours between `from` and `to`, truncated.
    pub fn working_hours(&self, from: OffsetDateTime, to: OffsetDateTime) -> i64 {
        self.working_duration(from, to).whole_hours()
    }
}

impl Default for WorkCalendar {
    fn default() -> Self {
        Self::new(WorkHours::default(), UtcOffset::UTC)
    }
}
