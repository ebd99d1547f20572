//! SM-2 (SuperMemo 2) spaced repetition scheduler.
//!
//! Computes the next schedule of a card from a quality grade and the card's
//! previous schedule, if it has one:
//! - Grades 0-2: the card was forgotten. Interval drops back to 1 day and the
//!   ease factor loses 0.2.
//! - Grades 3-5: the ease factor moves by the classic SM-2 update and the
//!   interval is multiplied by it. A card without a previous schedule starts
//!   at 2 days (grade 3) or 4 days (grades 4-5).
//! - The ease factor never falls below 1.3.
//!
//! The scheduler does no I/O and reads no clock: `now` is passed in, so the
//! same inputs always give the same schedule.

use chrono::{DateTime, Days, Utc};

use super::{PriorSchedule, Quality, Rating, ReviewState};

pub const MIN_EASE_FACTOR: f64 = 1.3;
pub const DEFAULT_EASE_FACTOR: f64 = 2.5;
const FAILURE_EASE_PENALTY: f64 = 0.2;

const FIRST_PASS_INTERVAL: u32 = 2;
const FIRST_EASY_INTERVAL: u32 = 4;

/// About a century. Keeps the due date inside chrono's range.
pub const MAX_INTERVAL_DAYS: u32 = 36_500;

/// Calculates the schedule that follows a rating.
pub fn schedule(quality: Quality, prior: Option<PriorSchedule>, now: DateTime<Utc>) -> ReviewState {
    // A prior without a positive interval never produced a real schedule.
    let genuine = prior.filter(|p| p.interval_days > 0);
    let prev_interval = genuine.map_or(1, |p| p.interval_days);
    let prev_ease = prior
        .map(|p| p.ease_factor)
        .filter(|ef| ef.is_finite() && *ef > 0.0)
        .unwrap_or(DEFAULT_EASE_FACTOR);

    let (interval_days, ease_factor) = if !quality.is_passing() {
        (1, (prev_ease - FAILURE_EASE_PENALTY).max(MIN_EASE_FACTOR))
    } else {
        let q = quality.value() as f64;
        let ease = (prev_ease + (0.1 - (5.0 - q) * (0.08 + (5.0 - q) * 0.02))).max(MIN_EASE_FACTOR);
        let interval = match genuine {
            Some(_) => (prev_interval as f64 * ease).round() as u32,
            None if quality.value() >= 4 => FIRST_EASY_INTERVAL,
            None => FIRST_PASS_INTERVAL,
        };
        (interval.clamp(1, MAX_INTERVAL_DAYS), ease)
    };

    ReviewState {
        interval_days,
        ease_factor,
        due_at: add_days(now, interval_days),
        reviewed_at: now,
    }
}

/// Calendar-day addition, so month and year rollover follow the calendar.
fn add_days(at: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    at.checked_add_days(Days::new(days as u64))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Interval each button would give, in display order.
pub fn preview_intervals(prior: Option<PriorSchedule>, now: DateTime<Utc>) -> [(Rating, u32); 4] {
    Rating::ALL.map(|rating| (rating, schedule(rating.quality(), prior, now).interval_days))
}

/// Short human label for an interval: `1d`, `2w`, `3mo`, `1y`.
pub fn format_interval(days: u32) -> String {
    match days {
        0 => "now".to_string(),
        1..=6 => format!("{}d", days),
        7..=29 => format!("{}w", days / 7),
        30..=364 => format!("{}mo", days / 30),
        _ => format!("{}y", days / 365),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 9, 30, 0).unwrap()
    }

    fn q(value: i64) -> Quality {
        Quality::new(value).unwrap()
    }

    fn prior(interval_days: u32, ease_factor: f64) -> Option<PriorSchedule> {
        Some(PriorSchedule {
            interval_days,
            ease_factor,
        })
    }

    #[test]
    fn test_cold_start_failure() {
        let next = schedule(q(0), None, now());
        assert_eq!(next.interval_days, 1);
        assert!((next.ease_factor - 2.3).abs() < 1e-9);
        assert_eq!(next.due_at, now() + chrono::Duration::days(1));
    }

    #[test]
    fn test_cold_start_easy_then_again() {
        let first = schedule(Rating::Easy.quality(), None, now());
        assert_eq!(first.interval_days, 4);
        assert!((first.ease_factor - 2.6).abs() < 1e-9);
        assert_eq!(first.due_at, Utc.with_ymd_and_hms(2024, 3, 14, 9, 30, 0).unwrap());
        assert_eq!(first.reviewed_at, now());

        let second = schedule(Rating::Again.quality(), Some(first.prior()), now());
        assert_eq!(second.interval_days, 1);
        assert!((second.ease_factor - 2.4).abs() < 1e-9);
    }

    #[test]
    fn test_cold_start_hard_uses_short_seed() {
        let next = schedule(q(3), None, now());
        assert_eq!(next.interval_days, 2);
        assert!((next.ease_factor - 2.36).abs() < 1e-9);
    }

    #[test]
    fn test_success_grows_interval() {
        let next = schedule(q(5), prior(6, 2.5), now());
        // 6 * 2.6 = 15.6
        assert_eq!(next.interval_days, 16);
        assert!(next.interval_days > 6);
    }

    #[test]
    fn test_good_keeps_ease() {
        let next = schedule(q(4), prior(10, 2.5), now());
        assert!((next.ease_factor - 2.5).abs() < 1e-9);
        assert_eq!(next.interval_days, 25);
    }

    #[test]
    fn test_failure_resets_interval() {
        let next = schedule(q(2), prior(30, 2.5), now());
        assert_eq!(next.interval_days, 1);
        assert!((next.ease_factor - 2.3).abs() < 1e-9);
    }

    #[test]
    fn test_zero_interval_prior_is_treated_as_first_review() {
        let next = schedule(q(4), prior(0, 2.5), now());
        assert_eq!(next.interval_days, 4);
    }

    #[test]
    fn test_bad_prior_ease_falls_back_to_default() {
        let next = schedule(q(4), prior(3, f64::NAN), now());
        assert!((next.ease_factor - 2.5).abs() < 1e-9);
        assert_eq!(next.interval_days, 8);
    }

    #[test]
    fn test_due_date_crosses_month_and_year() {
        let new_year_eve = Utc.with_ymd_and_hms(2023, 12, 30, 12, 0, 0).unwrap();
        let next = schedule(q(5), None, new_year_eve);
        assert_eq!(next.due_at, Utc.with_ymd_and_hms(2024, 1, 3, 12, 0, 0).unwrap());

        let leap = Utc.with_ymd_and_hms(2024, 2, 27, 8, 0, 0).unwrap();
        let next = schedule(q(3), None, leap);
        assert_eq!(next.due_at, Utc.with_ymd_and_hms(2024, 2, 29, 8, 0, 0).unwrap());
    }

    #[test]
    fn test_interval_is_capped() {
        let next = schedule(q(5), prior(MAX_INTERVAL_DAYS, 2.5), now());
        assert_eq!(next.interval_days, MAX_INTERVAL_DAYS);
    }

    #[test]
    fn test_deterministic() {
        let a = schedule(q(4), prior(7, 2.18), now());
        let b = schedule(q(4), prior(7, 2.18), now());
        assert_eq!(a, b);
        assert_eq!(a.ease_factor.to_bits(), b.ease_factor.to_bits());
    }

    #[test]
    fn test_preview_intervals() {
        let preview = preview_intervals(prior(10, 2.5), now());
        let intervals: Vec<u32> = preview.iter().map(|(_, days)| *days).collect();
        assert_eq!(preview[0].0, Rating::Again);
        assert_eq!(intervals, vec![1, 24, 25, 26]);
    }

    #[test]
    fn test_format_interval() {
        assert_eq!(format_interval(0), "now");
        assert_eq!(format_interval(1), "1d");
        assert_eq!(format_interval(5), "5d");
        assert_eq!(format_interval(7), "1w");
        assert_eq!(format_interval(14), "2w");
        assert_eq!(format_interval(30), "1mo");
        assert_eq!(format_interval(90), "3mo");
        assert_eq!(format_interval(365), "1y");
        assert_eq!(format_interval(730), "2y");
    }

    proptest! {
        #[test]
        fn prop_ease_floor_and_positive_interval(grades in prop::collection::vec(0i64..=5, 1..60)) {
            let mut state: Option<PriorSchedule> = None;
            for grade in grades {
                let next = schedule(q(grade), state, now());
                prop_assert!(next.ease_factor >= MIN_EASE_FACTOR);
                prop_assert!(next.interval_days >= 1);
                prop_assert!(next.due_at > now());
                state = Some(next.prior());
            }
        }

        #[test]
        fn prop_ease_change_follows_grade(grade in 0i64..=5, interval in 1u32..400, ease in 1.3f64..4.0) {
            let next = schedule(q(grade), prior(interval, ease), now());
            match grade {
                5 => prop_assert!(next.ease_factor > ease),
                4 => prop_assert!((next.ease_factor - ease).abs() < 1e-9),
                3 => prop_assert!((next.ease_factor - (ease - 0.14).max(1.3)).abs() < 1e-9),
                _ => {
                    prop_assert_eq!(next.interval_days, 1);
                    prop_assert!((next.ease_factor - (ease - 0.2).max(1.3)).abs() < 1e-9);
                }
            }
        }
    }
}
