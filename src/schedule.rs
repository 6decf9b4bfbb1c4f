//! Schedule strings and the deadlines they produce.
//!
//! A plan's schedule is either a period keyword (`weekly`, `biweekly`,
//! `monthly`), a literal `DD-MM-YYYY` date, or anything else (including
//! nothing), which falls back to one hour.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};

/// When a plan with this schedule next comes due, measured from `anchor`
/// (the last promotion, or the plan's creation when never promoted).
///
/// A `DD-MM-YYYY` schedule is an absolute date and ignores the anchor.
pub fn next(schedule: Option<&str>, anchor: DateTime<Utc>) -> DateTime<Utc> {
    let Some(schedule) = schedule else {
        return anchor + Duration::hours(1);
    };
    let schedule = schedule.trim().to_lowercase();
    match schedule.as_str() {
        "weekly" => anchor + Duration::days(3),
        "biweekly" => anchor + Duration::days(7),
        "monthly" => anchor + Duration::days(14),
        other => match NaiveDate::parse_from_str(other, "%d-%m-%Y") {
            Ok(date) => date.and_time(NaiveTime::MIN).and_utc(),
            Err(_) => anchor + Duration::hours(1),
        },
    }
}

/// The deadline stamped on a task promoted at `now`. Same mapping as
/// [`next`], except a date already in the past collapses to one hour
/// from now.
pub fn deadline(schedule: Option<&str>, now: DateTime<Utc>) -> DateTime<Utc> {
    let at = next(schedule, now);
    if at < now {
        now + Duration::hours(1)
    } else {
        at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn weekly_means_three_days() {
        assert_eq!(deadline(Some("weekly"), now()), now() + Duration::days(3));
    }

    #[test]
    fn biweekly_means_seven_days() {
        assert_eq!(deadline(Some("biweekly"), now()), now() + Duration::days(7));
    }

    #[test]
    fn monthly_means_fourteen_days() {
        assert_eq!(deadline(Some("monthly"), now()), now() + Duration::days(14));
    }

    #[test]
    fn keyword_is_trimmed_and_lowercased() {
        assert_eq!(deadline(Some("  Weekly "), now()), now() + Duration::days(3));
    }

    #[test]
    fn future_date_is_taken_literally() {
        let at = deadline(Some("01-07-2024"), now());
        assert_eq!(at, Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn past_date_becomes_one_hour_from_now() {
        assert_eq!(
            deadline(Some("01-01-2024"), now()),
            now() + Duration::hours(1)
        );
    }

    #[test]
    fn garbage_becomes_one_hour_from_now() {
        assert_eq!(deadline(Some("whenever"), now()), now() + Duration::hours(1));
        assert_eq!(deadline(None, now()), now() + Duration::hours(1));
    }

    #[test]
    fn next_keeps_past_dates_in_the_past() {
        assert!(next(Some("01-01-2024"), now()) < now());
    }
}
