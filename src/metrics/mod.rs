//! Derived operational KPIs.
//!
//! Every function here is a pure mapping from already-fetched record fields
//! to a derived value. Inputs outside a function's domain produce a sentinel
//! (`None`, `MigrationPerformance::None`, `OnboardingStatus::Unknown`, ...)
//! rather than an error. Date-only comparisons work on calendar days of the
//! wall-clock value passed in; no timezone conversion happens here.

pub mod types;

pub use types::*;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike, Weekday};

use crate::date_util::add_one_month;
use crate::model::{MigrationStatus, SlaUnit, TicketStatus};

/// Default first-response target in minutes.
pub const DEFAULT_FRT_TARGET_MINUTES: i64 = 10;

/// First response time in whole minutes, truncated toward zero.
///
/// A response recorded before creation yields a negative value, which is
/// passed through unchanged.
pub fn compute_frt(
    created_at: Option<NaiveDateTime>,
    responded_at: Option<NaiveDateTime>,
) -> Option<i64> {
    let (created, responded) = (created_at?, responded_at?);
    Some((responded - created).num_minutes())
}

/// Classify a migration item by comparing its completion day with its deadline.
pub fn classify_migration_performance(
    status: MigrationStatus,
    deadline: Option<NaiveDate>,
    completed_at: Option<NaiveDateTime>,
) -> MigrationPerformance {
    if !status.is_terminal() {
        return MigrationPerformance::None;
    }
    let (Some(deadline), Some(completed_at)) = (deadline, completed_at) else {
        return MigrationPerformance::None;
    };
    let completed = completed_at.date();
    if completed == deadline {
        MigrationPerformance::OnTime
    } else if completed > deadline {
        MigrationPerformance::Late
    } else {
        MigrationPerformance::Fast
    }
}

/// Signed whole days from the deadline to the completion day; positive when late.
pub fn late_days(deadline: Option<NaiveDate>, completed_at: Option<NaiveDateTime>) -> Option<i64> {
    Some((completed_at?.date() - deadline?).num_days())
}

/// Compare operator-training completion with the deadline one calendar month
/// after deployment.
pub fn classify_onboarding_status(
    deployment_date: Option<NaiveDate>,
    train_finish_date: Option<NaiveDate>,
) -> OnboardingStatus {
    let (Some(deployed), Some(finished)) = (deployment_date, train_finish_date) else {
        return OnboardingStatus::Unknown;
    };
    let sla_deadline = add_one_month(deployed);
    let diff_days = (finished - sla_deadline).num_days();
    match diff_days {
        d if d < 0 => OnboardingStatus::Early(d.abs()),
        0 => OnboardingStatus::OnTime,
        d => OnboardingStatus::Late(d),
    }
}

/// Project a deadline forward from `now` by an SLA.
///
/// Deadlines are stored as dates, so hour-based SLAs only move the date by
/// whole days (`duration / 24`, and only from 24 hours up) and minute-based
/// SLAs never move it.
pub fn project_deadline(now: NaiveDate, duration: i64, unit: SlaUnit) -> NaiveDate {
    let days = match unit {
        SlaUnit::Hari => duration,
        SlaUnit::Jam if duration >= 24 => duration / 24,
        SlaUnit::Jam | SlaUnit::Menit => 0,
    };
    Duration::try_days(days)
        .and_then(|d| now.checked_add_signed(d))
        .unwrap_or(now)
}

/// Completed share as a whole percentage, rounded half up.
pub fn compute_progress_percent(completed: u64, total: u64) -> u32 {
    if total == 0 {
        return 0;
    }
    let pct = (completed as f64 / total as f64 * 100.0).round();
    pct.clamp(0.0, 100.0) as u32
}

/// Percentage change from `previous` to `current`.
///
/// Undefined (returns `None`) when either value is missing or `previous` is
/// zero. The direction is purely numeric: whether `Down` is good news is the
/// caller's call.
pub fn compute_trend_delta(current: Option<f64>, previous: Option<f64>) -> Option<TrendDelta> {
    let (current, previous) = (current?, previous?);
    if previous == 0.0 || !current.is_finite() || !previous.is_finite() {
        return None;
    }
    let change = (current - previous) / previous * 100.0;
    Some(TrendDelta {
        percentage: round1(change.abs()),
        direction: if current < previous {
            TrendDirection::Down
        } else {
            TrendDirection::Up
        },
    })
}

/// Support hours are Mon–Fri 08:00–20:00 and Sat 08:00–17:00.
pub fn classify_working_hours<T: Datelike + Timelike>(ts: &T) -> WorkingHours {
    let hour = ts.hour();
    let in_hours = match ts.weekday() {
        Weekday::Sun => false,
        Weekday::Sat => (8..17).contains(&hour),
        _ => (8..20).contains(&hour),
    };
    if in_hours {
        WorkingHours::InHours
    } else {
        WorkingHours::OutOfHours
    }
}

/// Day-count from ticket creation to resolution for solved tickets.
pub fn classify_resolution(
    status: TicketStatus,
    created_at: Option<NaiveDateTime>,
    solved_at: Option<NaiveDateTime>,
) -> ResolutionStatus {
    if !status.is_solved() {
        return ResolutionStatus::Unknown;
    }
    let (Some(created), Some(solved)) = (created_at, solved_at) else {
        return ResolutionStatus::Unknown;
    };
    match (solved.date() - created.date()).num_days() {
        d if d <= 0 => ResolutionStatus::OnTime,
        d => ResolutionStatus::Late(d),
    }
}

pub fn classify_frt_target(frt: Option<i64>, target_minutes: i64) -> FrtVerdict {
    match frt {
        None => FrtVerdict::Unknown,
        Some(m) if m <= target_minutes => FrtVerdict::Fast(m),
        Some(m) => FrtVerdict::Slow(m - target_minutes),
    }
}

/// Round to one decimal place.
pub fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        ymd(y, m, d).and_hms_opt(h, min, 0).unwrap()
    }

    #[test]
    fn test_frt_whole_minutes() {
        let created = at(2025, 1, 10, 9, 0);
        assert_eq!(compute_frt(Some(created), Some(created)), Some(0));
        assert_eq!(compute_frt(Some(created), Some(at(2025, 1, 10, 9, 45))), Some(45));
        // partial minutes are dropped
        let almost = created + Duration::seconds(119);
        assert_eq!(compute_frt(Some(created), Some(almost)), Some(1));
    }

    #[test]
    fn test_frt_missing_and_negative() {
        let created = at(2025, 1, 10, 9, 0);
        assert_eq!(compute_frt(Some(created), None), None);
        assert_eq!(compute_frt(None, Some(created)), None);
        assert_eq!(compute_frt(Some(created), Some(at(2025, 1, 10, 8, 30))), Some(-30));
    }

    #[test]
    fn test_migration_performance_requires_closed_status() {
        let deadline = Some(ymd(2025, 1, 10));
        let done = Some(at(2025, 1, 12, 10, 0));
        assert_eq!(
            classify_migration_performance(MigrationStatus::Todo, deadline, done),
            MigrationPerformance::None
        );
        assert_eq!(
            classify_migration_performance(MigrationStatus::Completed, None, done),
            MigrationPerformance::None
        );
        assert_eq!(
            classify_migration_performance(MigrationStatus::Completed, deadline, None),
            MigrationPerformance::None
        );
    }

    #[test]
    fn test_migration_performance_classes() {
        let deadline = Some(ymd(2025, 1, 10));
        let status = MigrationStatus::Completed;
        assert_eq!(
            classify_migration_performance(status, deadline, Some(at(2025, 1, 10, 23, 0))),
            MigrationPerformance::OnTime
        );
        let late = Some(at(2025, 1, 12, 8, 0));
        assert_eq!(
            classify_migration_performance(status, deadline, late),
            MigrationPerformance::Late
        );
        assert_eq!(late_days(deadline, late), Some(2));
        assert_eq!(
            classify_migration_performance(
                MigrationStatus::Cancel,
                deadline,
                Some(at(2025, 1, 8, 8, 0))
            ),
            MigrationPerformance::Fast
        );
    }

    #[test]
    fn test_onboarding_status() {
        let deployed = Some(ymd(2025, 1, 15));
        assert_eq!(
            classify_onboarding_status(deployed, Some(ymd(2025, 2, 15))),
            OnboardingStatus::OnTime
        );
        assert_eq!(
            classify_onboarding_status(deployed, Some(ymd(2025, 2, 10))),
            OnboardingStatus::Early(5)
        );
        assert_eq!(
            classify_onboarding_status(deployed, Some(ymd(2025, 2, 20))),
            OnboardingStatus::Late(5)
        );
        assert_eq!(
            classify_onboarding_status(None, Some(ymd(2025, 2, 20))),
            OnboardingStatus::Unknown
        );
        assert_eq!(classify_onboarding_status(deployed, None), OnboardingStatus::Unknown);
    }

    #[test]
    fn test_onboarding_month_end_rollover() {
        // Jan 31 + 1 month lands on Mar 3 in 2025
        let deployed = Some(ymd(2025, 1, 31));
        assert_eq!(
            classify_onboarding_status(deployed, Some(ymd(2025, 3, 3))),
            OnboardingStatus::OnTime
        );
        assert_eq!(
            classify_onboarding_status(deployed, Some(ymd(2025, 2, 28))),
            OnboardingStatus::Early(3)
        );
    }

    #[test]
    fn test_onboarding_labels() {
        assert_eq!(OnboardingStatus::Early(5).to_string(), "Cepat 5 hari");
        assert_eq!(OnboardingStatus::OnTime.to_string(), "Tepat Waktu");
        assert_eq!(OnboardingStatus::Late(2).to_string(), "Telat 2 hari");
        assert_eq!(OnboardingStatus::Unknown.to_string(), "-");
    }

    #[test]
    fn test_project_deadline() {
        let now = ymd(2025, 1, 10);
        assert_eq!(project_deadline(now, 3, SlaUnit::Hari), ymd(2025, 1, 13));
        assert_eq!(project_deadline(now, 2, SlaUnit::Jam), now);
        assert_eq!(project_deadline(now, 24, SlaUnit::Jam), ymd(2025, 1, 11));
        assert_eq!(project_deadline(now, 50, SlaUnit::Jam), ymd(2025, 1, 12));
        assert_eq!(project_deadline(now, 3000, SlaUnit::Menit), now);
    }

    #[test]
    fn test_project_deadline_out_of_range_duration() {
        let now = ymd(2025, 1, 10);
        assert_eq!(project_deadline(now, i64::MAX, SlaUnit::Hari), now);
        assert_eq!(project_deadline(now, 200_000_000_000_000, SlaUnit::Jam), now);
        // Representable as a duration but past the last representable date.
        assert_eq!(project_deadline(now, 1_000_000_000, SlaUnit::Hari), now);
    }

    #[test]
    fn test_progress_percent() {
        assert_eq!(compute_progress_percent(0, 0), 0);
        assert_eq!(compute_progress_percent(1, 3), 33);
        assert_eq!(compute_progress_percent(2, 3), 67);
        assert_eq!(compute_progress_percent(1, 2), 50);
        assert_eq!(compute_progress_percent(1, 8), 13); // 12.5 rounds up
        assert_eq!(compute_progress_percent(4, 4), 100);
    }

    #[test]
    fn test_trend_delta() {
        let down = compute_trend_delta(Some(90.0), Some(100.0)).unwrap();
        assert_eq!(down.percentage, 10.0);
        assert_eq!(down.direction, TrendDirection::Down);

        let up = compute_trend_delta(Some(110.0), Some(100.0)).unwrap();
        assert_eq!(up.percentage, 10.0);
        assert_eq!(up.direction, TrendDirection::Up);

        let flat = compute_trend_delta(Some(5.0), Some(5.0)).unwrap();
        assert_eq!(flat.percentage, 0.0);
        assert_eq!(flat.direction, TrendDirection::Up);

        let third = compute_trend_delta(Some(4.0), Some(3.0)).unwrap();
        assert_eq!(third.percentage, 33.3);
    }

    #[test]
    fn test_trend_delta_undefined() {
        assert!(compute_trend_delta(Some(10.0), Some(0.0)).is_none());
        assert!(compute_trend_delta(None, Some(10.0)).is_none());
        assert!(compute_trend_delta(Some(10.0), None).is_none());
    }

    #[test]
    fn test_working_hours() {
        // 2025-01-06 is a Monday
        assert_eq!(classify_working_hours(&at(2025, 1, 6, 9, 0)), WorkingHours::InHours);
        assert_eq!(classify_working_hours(&at(2025, 1, 6, 21, 0)), WorkingHours::OutOfHours);
        assert_eq!(classify_working_hours(&at(2025, 1, 6, 7, 59)), WorkingHours::OutOfHours);
        assert_eq!(classify_working_hours(&at(2025, 1, 6, 8, 0)), WorkingHours::InHours);
        assert_eq!(classify_working_hours(&at(2025, 1, 6, 20, 0)), WorkingHours::OutOfHours);
        assert_eq!(classify_working_hours(&at(2025, 1, 11, 16, 0)), WorkingHours::InHours);
        assert_eq!(classify_working_hours(&at(2025, 1, 11, 18, 0)), WorkingHours::OutOfHours);
        for hour in 0..24 {
            assert_eq!(
                classify_working_hours(&at(2025, 1, 12, hour, 0)),
                WorkingHours::OutOfHours
            );
        }
    }

    #[test]
    fn test_working_hours_uses_caller_offset() {
        use chrono::{FixedOffset, TimeZone};
        let wib = FixedOffset::east_opt(7 * 3600).unwrap();
        let ts = wib.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap();
        assert_eq!(classify_working_hours(&ts), WorkingHours::InHours);
    }

    #[test]
    fn test_resolution() {
        let created = Some(at(2025, 1, 10, 15, 0));
        assert_eq!(
            classify_resolution(TicketStatus::Completed, created, Some(at(2025, 1, 10, 18, 0))),
            ResolutionStatus::OnTime
        );
        assert_eq!(
            classify_resolution(TicketStatus::Flip, created, Some(at(2025, 1, 13, 1, 0))),
            ResolutionStatus::Late(3)
        );
        assert_eq!(
            classify_resolution(TicketStatus::Todo, created, Some(at(2025, 1, 13, 1, 0))),
            ResolutionStatus::Unknown
        );
        assert_eq!(
            classify_resolution(TicketStatus::Completed, created, None),
            ResolutionStatus::Unknown
        );
    }

    #[test]
    fn test_frt_target() {
        assert_eq!(classify_frt_target(Some(7), 10), FrtVerdict::Fast(7));
        assert_eq!(classify_frt_target(Some(10), 10), FrtVerdict::Fast(10));
        assert_eq!(classify_frt_target(Some(25), 10), FrtVerdict::Slow(15));
        assert_eq!(classify_frt_target(None, 10), FrtVerdict::Unknown);
        assert_eq!(FrtVerdict::Slow(15).to_string(), "Telat 15 menit");
    }

    #[test]
    fn test_pure_functions_are_repeatable() {
        let a = at(2025, 3, 1, 10, 0);
        let b = at(2025, 3, 1, 12, 31);
        assert_eq!(compute_frt(Some(a), Some(b)), compute_frt(Some(a), Some(b)));
        assert_eq!(
            compute_trend_delta(Some(12.0), Some(9.0)),
            compute_trend_delta(Some(12.0), Some(9.0))
        );
        assert_eq!(
            classify_onboarding_status(Some(ymd(2025, 1, 1)), Some(ymd(2025, 2, 3))),
            classify_onboarding_status(Some(ymd(2025, 1, 1)), Some(ymd(2025, 2, 3)))
        );
    }
}
