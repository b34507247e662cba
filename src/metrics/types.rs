use std::fmt;

use serde::Serialize;

/// How a closed migration item finished relative to its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationPerformance {
    None,
    OnTime,
    Fast,
    Late,
}

impl MigrationPerformance {
    pub fn as_str(&self) -> &'static str {
        match self {
            MigrationPerformance::None => "none",
            MigrationPerformance::OnTime => "on_time",
            MigrationPerformance::Fast => "fast",
            MigrationPerformance::Late => "late",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "none" => Some(MigrationPerformance::None),
            "on_time" => Some(MigrationPerformance::OnTime),
            "fast" => Some(MigrationPerformance::Fast),
            "late" => Some(MigrationPerformance::Late),
            _ => None,
        }
    }
}

/// Operator-training completion measured against the one-month onboarding window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnboardingStatus {
    Unknown,
    Early(i64),
    OnTime,
    Late(i64),
}

impl fmt::Display for OnboardingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OnboardingStatus::Unknown => f.write_str("-"),
            OnboardingStatus::Early(days) => write!(f, "Cepat {days} hari"),
            OnboardingStatus::OnTime => f.write_str("Tepat Waktu"),
            OnboardingStatus::Late(days) => write!(f, "Telat {days} hari"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
}

/// Relative change between two consecutive values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendDelta {
    /// Absolute percentage change, one decimal place.
    pub percentage: f64,
    pub direction: TrendDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkingHours {
    InHours,
    OutOfHours,
}

impl WorkingHours {
    /// Label stored on tickets and shown on the ticket table.
    pub fn label(&self) -> &'static str {
        match self {
            WorkingHours::InHours => "Dalam Jam Kerja",
            WorkingHours::OutOfHours => "Diluar Jam Kerja",
        }
    }
}

/// Resolution day-count of a solved ticket, counted from its creation day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionStatus {
    Unknown,
    OnTime,
    Late(i64),
}

impl fmt::Display for ResolutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionStatus::Unknown => f.write_str("-"),
            ResolutionStatus::OnTime => f.write_str("Tepat Waktu"),
            ResolutionStatus::Late(days) => write!(f, "Telat {days} hari"),
        }
    }
}

/// FRT compared with the response target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrtVerdict {
    Unknown,
    /// Answered within target; carries the FRT.
    Fast(i64),
    /// Answered late; carries the minutes beyond target.
    Slow(i64),
}

impl fmt::Display for FrtVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrtVerdict::Unknown => f.write_str("-"),
            FrtVerdict::Fast(m) => write!(f, "Cepat {m} menit"),
            FrtVerdict::Slow(m) => write!(f, "Telat {m} menit"),
        }
    }
}
