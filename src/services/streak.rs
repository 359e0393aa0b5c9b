//! Consecutive-day streak calculation over a set of completion dates.

use chrono::NaiveDate;
use std::collections::HashSet;

/// Hard cap on the backward walk so malformed data can't loop forever.
pub const MAX_STREAK_DAYS: u32 = 365;

/// Count consecutive completed days ending at `reference_date`, walking
/// backward one day at a time until the first gap.
///
/// Walking backward from "today" keeps the common case (does today extend an
/// existing streak?) proportional to the streak length rather than the full
/// completion history. Returns 0 when `reference_date` itself is absent.
pub fn calculate_streak(completion_dates: &HashSet<NaiveDate>, reference_date: NaiveDate) -> u32 {
    let mut streak = 0;
    let mut day = reference_date;

    while streak < MAX_STREAK_DAYS && completion_dates.contains(&day) {
        streak += 1;
        match day.pred_opt() {
            Some(prev) => day = prev,
            None => break,
        }
    }

    streak
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn range(last: NaiveDate, days: u32) -> HashSet<NaiveDate> {
        (0..days)
            .map(|i| last - chrono::Duration::days(i as i64))
            .collect()
    }

    #[test]
    fn empty_set_has_no_streak() {
        assert_eq!(calculate_streak(&HashSet::new(), d("2024-06-15")), 0);
    }

    #[test]
    fn missing_reference_date_breaks_streak() {
        // Completions exist for the past but not for today
        let dates = range(d("2024-06-14"), 5);
        assert_eq!(calculate_streak(&dates, d("2024-06-15")), 0);
    }

    #[test]
    fn full_range_counts_every_day() {
        let today = d("2024-06-15");
        for k in [1u32, 2, 7, 30] {
            let dates = range(today, k);
            assert_eq!(calculate_streak(&dates, today), k);
        }
    }

    #[test]
    fn streak_stops_at_first_gap() {
        let today = d("2024-06-15");
        let mut dates = range(today, 10);
        // Remove the 4th day back; streak from today should be 3
        dates.remove(&d("2024-06-12"));
        assert_eq!(calculate_streak(&dates, today), 3);
    }

    #[test]
    fn sparse_dates_only_count_today() {
        let mut dates = HashSet::new();
        dates.insert(d("2024-06-15"));
        dates.insert(d("2024-06-10"));
        dates.insert(d("2024-06-01"));
        assert_eq!(calculate_streak(&dates, d("2024-06-15")), 1);
    }

    #[test]
    fn walk_is_capped() {
        let today = d("2024-06-15");
        let dates = range(today, 400);
        assert_eq!(calculate_streak(&dates, today), MAX_STREAK_DAYS);
    }
}
