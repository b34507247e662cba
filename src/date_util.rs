use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};

/// Storage format for timestamps (local wall-clock, no offset).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// Storage format for calendar dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Get the last day of a given month.
pub fn last_day_of_month(year: i32, month: u32) -> NaiveDate {
    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    first_of_next.map_or(NaiveDate::MAX, |d| d - Duration::days(1))
}

/// Add one calendar month the way a native "set month + 1" does: the day of
/// month is kept and any overflow rolls into the following month, so
/// Jan 31 becomes Mar 3 (Mar 2 in a leap year) rather than being clamped.
pub fn add_one_month(d: NaiveDate) -> NaiveDate {
    let (year, month) = if d.month() == 12 {
        (d.year() + 1, 1)
    } else {
        (d.year(), d.month() + 1)
    };
    match NaiveDate::from_ymd_opt(year, month, 1) {
        Some(first) => first + Duration::days(d.day() as i64 - 1),
        None => d,
    }
}

/// First day of the month `n` months before the month containing `d`.
pub fn months_back_start(d: NaiveDate, n: u32) -> NaiveDate {
    let total = d.year() * 12 + d.month0() as i32 - n as i32;
    let (year, month0) = (total.div_euclid(12), total.rem_euclid(12) as u32);
    NaiveDate::from_ymd_opt(year, month0 + 1, 1).unwrap_or(d)
}

/// Midnight at the start of the given date.
pub fn start_of_day(d: NaiveDate) -> NaiveDateTime {
    d.and_time(NaiveTime::MIN)
}

pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub fn format_date(d: &NaiveDate) -> String {
    d.format(DATE_FORMAT).to_string()
}

/// Parse a stored or user-supplied timestamp.
///
/// Accepts `YYYY-MM-DD HH:MM[:SS]`, the `T`-separated input form and a bare
/// date (taken as midnight).
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    for fmt in [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
    ] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(ts);
        }
    }
    parse_date(s).map(start_of_day)
}

/// Parse a date, ignoring any trailing time-of-day component.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    let head = s.get(..10).unwrap_or(s);
    NaiveDate::parse_from_str(head, DATE_FORMAT).ok()
}

/// Short month label used in trend charts, e.g. `Jan 2025`.
pub fn month_label(d: NaiveDate) -> String {
    d.format("%b %Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_last_day_of_month() {
        assert_eq!(last_day_of_month(2025, 1), ymd(2025, 1, 31));
        assert_eq!(last_day_of_month(2025, 2), ymd(2025, 2, 28));
        assert_eq!(last_day_of_month(2024, 2), ymd(2024, 2, 29)); // Leap year
        assert_eq!(last_day_of_month(2025, 12), ymd(2025, 12, 31));
    }

    #[test]
    fn test_add_one_month_plain() {
        assert_eq!(add_one_month(ymd(2025, 1, 15)), ymd(2025, 2, 15));
        assert_eq!(add_one_month(ymd(2025, 12, 10)), ymd(2026, 1, 10));
    }

    #[test]
    fn test_add_one_month_rolls_over() {
        assert_eq!(add_one_month(ymd(2025, 1, 31)), ymd(2025, 3, 3));
        assert_eq!(add_one_month(ymd(2024, 1, 31)), ymd(2024, 3, 2));
        assert_eq!(add_one_month(ymd(2025, 3, 31)), ymd(2025, 5, 1));
    }

    #[test]
    fn test_months_back_start() {
        assert_eq!(months_back_start(ymd(2025, 7, 20), 6), ymd(2025, 1, 1));
        assert_eq!(months_back_start(ymd(2025, 3, 5), 6), ymd(2024, 9, 1));
        assert_eq!(months_back_start(ymd(2025, 3, 5), 0), ymd(2025, 3, 1));
    }

    #[test]
    fn test_parse_timestamp_forms() {
        let expected = ymd(2025, 1, 10).and_hms_opt(9, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2025-01-10 09:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2025-01-10T09:30"), Some(expected));
        assert_eq!(
            parse_timestamp("2025-01-10"),
            Some(start_of_day(ymd(2025, 1, 10)))
        );
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("not a date"), None);
    }

    #[test]
    fn test_parse_date_ignores_time() {
        assert_eq!(parse_date("2025-01-10 23:59:59"), Some(ymd(2025, 1, 10)));
        assert_eq!(parse_date("10-01-2025"), None);
    }

    #[test]
    fn test_month_label() {
        assert_eq!(month_label(ymd(2025, 1, 10)), "Jan 2025");
    }
}
