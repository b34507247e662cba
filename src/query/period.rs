use std::sync::LazyLock;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use regex::Regex;

use crate::date_util::{format_date, last_day_of_month, parse_date};
use crate::error::{Error, Result};

static RE_QUARTER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{4})-Q([1-4])$").unwrap());
static RE_WEEK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{4})-W(\d{1,2})$").unwrap());
static RE_MONTH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{2})$").unwrap());
static RE_ROLLING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{1,4})[dD]$").unwrap());

/// A reporting window. Every variant resolves to an inclusive date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Year(i32),
    Quarter(i32, u8),
    Month(i32, u8),
    /// ISO week.
    Week(i32, u8),
    /// The last `days` days ending on (and including) `end`.
    Rolling { days: u32, end: NaiveDate },
    /// Arbitrary inclusive range, also used for the to-date shortcuts.
    Range { start: NaiveDate, end: NaiveDate },
}

fn first_of_month(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MIN)
}

fn iso_monday(year: i32, week: u32) -> NaiveDate {
    NaiveDate::from_isoywd_opt(year, week, Weekday::Mon).unwrap_or(NaiveDate::MIN)
}

/// Number of ISO weeks in `year` (52 or 53).
fn iso_weeks_in(year: i32) -> u8 {
    NaiveDate::from_ymd_opt(year, 12, 28).map_or(52, |d| d.iso_week().week() as u8)
}

impl Period {
    /// Parse a period relative to `today`.
    ///
    /// Supported formats:
    /// - `2025` year, `2025-Q1` quarter, `2025-01` month, `2025-W05` ISO week
    /// - `30d` the last N days
    /// - `mtd` / `qtd` / `ytd` month, quarter or year to date
    /// - `2025-01-15..2025-02-14` explicit range
    pub fn parse(s: &str, today: NaiveDate) -> Result<Self> {
        let s = s.trim();

        match s.to_lowercase().as_str() {
            "mtd" => {
                return Ok(Period::Range {
                    start: first_of_month(today.year(), today.month()),
                    end: today,
                })
            }
            "qtd" => {
                let start_month = today.month0() / 3 * 3 + 1;
                return Ok(Period::Range {
                    start: first_of_month(today.year(), start_month),
                    end: today,
                });
            }
            "ytd" => {
                return Ok(Period::Range {
                    start: first_of_month(today.year(), 1),
                    end: today,
                })
            }
            _ => {}
        }

        if let Some((a, b)) = s.split_once("..") {
            let start = parse_date(a)
                .ok_or_else(|| Error::PeriodParse(format!("invalid range start: {a}")))?;
            let end = parse_date(b)
                .ok_or_else(|| Error::PeriodParse(format!("invalid range end: {b}")))?;
            if end < start {
                return Err(Error::PeriodParse(format!("range ends before it starts: {s}")));
            }
            return Ok(Period::Range { start, end });
        }

        if let Some(caps) = RE_ROLLING.captures(s) {
            let days: u32 = caps[1].parse().unwrap_or(0);
            if days == 0 {
                return Err(Error::PeriodParse(format!("empty rolling window: {s}")));
            }
            return Ok(Period::Rolling { days, end: today });
        }

        if s.len() == 4 {
            if let Ok(year) = s.parse::<i32>() {
                return Ok(Period::Year(year));
            }
        }

        if let Some(caps) = RE_QUARTER.captures(s) {
            let year: i32 = caps[1].parse().unwrap_or_default();
            let q: u8 = caps[2].parse().unwrap_or_default();
            return Ok(Period::Quarter(year, q));
        }

        if let Some(caps) = RE_WEEK.captures(s) {
            let year: i32 = caps[1].parse().unwrap_or_default();
            let week: u8 = caps[2].parse().unwrap_or_default();
            if (1..=iso_weeks_in(year)).contains(&week) {
                return Ok(Period::Week(year, week));
            }
        }

        if let Some(caps) = RE_MONTH.captures(s) {
            let year: i32 = caps[1].parse().unwrap_or_default();
            let month: u8 = caps[2].parse().unwrap_or_default();
            if (1..=12).contains(&month) {
                return Ok(Period::Month(year, month));
            }
        }

        Err(Error::PeriodParse(format!("unrecognized period: {s}")))
    }

    /// Inclusive start and end dates.
    pub fn date_range(&self) -> (NaiveDate, NaiveDate) {
        match *self {
            Period::Year(y) => (first_of_month(y, 1), last_day_of_month(y, 12)),
            Period::Quarter(y, q) => {
                let start_month = (q.clamp(1, 4) as u32 - 1) * 3 + 1;
                (
                    first_of_month(y, start_month),
                    last_day_of_month(y, start_month + 2),
                )
            }
            Period::Month(y, m) => (first_of_month(y, m as u32), last_day_of_month(y, m as u32)),
            Period::Week(y, w) => {
                let start = iso_monday(y, w as u32);
                (start, start + Duration::days(6))
            }
            Period::Rolling { days, end } => (end - Duration::days(days as i64 - 1), end),
            Period::Range { start, end } => (start, end),
        }
    }

    /// The window of the same kind immediately before this one.
    pub fn previous(&self) -> Self {
        match *self {
            Period::Year(y) => Period::Year(y - 1),
            Period::Quarter(y, 1) => Period::Quarter(y - 1, 4),
            Period::Quarter(y, q) => Period::Quarter(y, q - 1),
            Period::Month(y, 1) => Period::Month(y - 1, 12),
            Period::Month(y, m) => Period::Month(y, m - 1),
            Period::Week(y, 1) => Period::Week(y - 1, iso_weeks_in(y - 1)),
            Period::Week(y, w) => Period::Week(y, w - 1),
            Period::Rolling { days, end } => Period::Rolling {
                days,
                end: end - Duration::days(days as i64),
            },
            Period::Range { start, end } => {
                let len = (end - start).num_days() + 1;
                Period::Range {
                    start: start - Duration::days(len),
                    end: start - Duration::days(1),
                }
            }
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        let (start, end) = self.date_range();
        date >= start && date <= end
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Period::Year(y) => write!(f, "{y}"),
            Period::Quarter(y, q) => write!(f, "{y}-Q{q}"),
            Period::Month(y, m) => write!(f, "{y}-{m:02}"),
            Period::Week(y, w) => write!(f, "{y}-W{w:02}"),
            Period::Rolling { days, end } => write!(f, "{days}d to {}", format_date(end)),
            Period::Range { start, end } => {
                write!(f, "{}..{}", format_date(start), format_date(end))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn today() -> NaiveDate {
        ymd(2025, 5, 14)
    }

    #[test]
    fn test_parse_calendar_periods() {
        assert_eq!(Period::parse("2025", today()).unwrap(), Period::Year(2025));
        assert_eq!(Period::parse("2025-Q2", today()).unwrap(), Period::Quarter(2025, 2));
        assert_eq!(Period::parse("2025-01", today()).unwrap(), Period::Month(2025, 1));
        assert_eq!(Period::parse("2025-W05", today()).unwrap(), Period::Week(2025, 5));
    }

    #[test]
    fn test_parse_to_date() {
        assert_eq!(
            Period::parse("mtd", today()).unwrap(),
            Period::Range {
                start: ymd(2025, 5, 1),
                end: today()
            }
        );
        assert_eq!(
            Period::parse("QTD", today()).unwrap().date_range(),
            (ymd(2025, 4, 1), today())
        );
        assert_eq!(
            Period::parse("ytd", today()).unwrap().date_range(),
            (ymd(2025, 1, 1), today())
        );
    }

    #[test]
    fn test_parse_rolling_and_range() {
        let p = Period::parse("30d", today()).unwrap();
        assert_eq!(p.date_range(), (ymd(2025, 4, 15), today()));

        let r = Period::parse("2025-01-15..2025-02-14", today()).unwrap();
        assert_eq!(r.date_range(), (ymd(2025, 1, 15), ymd(2025, 2, 14)));
    }

    #[test]
    fn test_parse_invalid() {
        assert!(Period::parse("garbage", today()).is_err());
        assert!(Period::parse("2025-Q5", today()).is_err());
        assert!(Period::parse("2025-13", today()).is_err());
        assert!(Period::parse("0d", today()).is_err());
        assert!(Period::parse("2025-W54", today()).is_err());
        assert!(Period::parse("2025-03-01..2025-02-01", today()).is_err());
    }

    #[test]
    fn test_date_ranges() {
        assert_eq!(
            Period::Quarter(2025, 1).date_range(),
            (ymd(2025, 1, 1), ymd(2025, 3, 31))
        );
        assert_eq!(
            Period::Month(2024, 2).date_range(),
            (ymd(2024, 2, 1), ymd(2024, 2, 29))
        );
        let (s, e) = Period::Week(2025, 1).date_range();
        assert_eq!(s.weekday(), Weekday::Mon);
        assert_eq!((e - s).num_days(), 6);
    }

    #[test]
    fn test_previous() {
        assert_eq!(Period::Quarter(2025, 1).previous(), Period::Quarter(2024, 4));
        assert_eq!(Period::Month(2025, 1).previous(), Period::Month(2024, 12));
        // 2020 has 53 ISO weeks.
        assert_eq!(Period::Week(2021, 1).previous(), Period::Week(2020, 53));
        assert_eq!(
            Period::Range {
                start: ymd(2025, 3, 11),
                end: ymd(2025, 3, 20)
            }
            .previous()
            .date_range(),
            (ymd(2025, 3, 1), ymd(2025, 3, 10))
        );
        let rolling = Period::parse("7d", today()).unwrap().previous();
        assert_eq!(rolling.date_range(), (ymd(2025, 5, 1), ymd(2025, 5, 7)));
    }

    #[test]
    fn test_contains() {
        let p = Period::Month(2025, 5);
        assert!(p.contains(ymd(2025, 5, 31)));
        assert!(!p.contains(ymd(2025, 6, 1)));
    }
}
