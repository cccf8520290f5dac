use time::OffsetDateTime;

use crate::domain::calendar::WorkCalendar;
use crate::domain::review::ReviewRecord;

pub const MAX_BADNESS_SCORE: u8 = 7;

/// One badness point per this many working hours of neglect.
pub const HOURS_PER_POINT: i64 = 4;

/// The most recent moment the viewer did something on the review, or was
/// asked to.
pub fn last_activity(review: &ReviewRecord) -> OffsetDateTime {
    match review.my_last_comment_at {
        Some(commented) if commented > review.review_requested_at => commented,
        _ => review.review_requested_at,
    }
}

/// Unclamped score for a single review.
pub fn review_score(review: &ReviewRecord, now: OffsetDateTime, calendar: &WorkCalendar) -> i64 {
    calendar.working_hours(last_activity(review), now) / HOURS_PER_POINT
}

/// Score in `0..=MAX_BADNESS_SCORE` driven by the most neglected review.
pub fn badness_score(reviews: &[ReviewRecord], now: OffsetDateTime, calendar: &WorkCalendar) -> u8 {
    let worst = reviews
        .iter()
        .map(|r| review_score(r, now, calendar))
        .max()
        .unwrap_or(0);
    worst.clamp(0, MAX_BADNESS_SCORE as i64) as u8
}

/// Reviews ordered oldest activity first, for the human-facing queue.
pub fn by_last_activity(reviews: &[ReviewRecord]) -> Vec<&ReviewRecord> {
    let mut sorted: Vec<&ReviewRecord> = reviews.iter().collect();
    sorted.sort_by_key(|r| last_activity(r));
    sorted
}
