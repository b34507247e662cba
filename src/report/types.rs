use chrono::NaiveDate;
use serde::Serialize;

use crate::metrics::{TrendDelta, TrendDirection};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TicketStats {
    pub total: u64,
    pub completed: u64,
    pub active: u64,
    pub new_today: u64,
}

/// One day of the weekly ticket trend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyTrend {
    /// Short weekday, e.g. `Mon`.
    pub name: String,
    pub date: NaiveDate,
    pub tiket: u64,
    pub selesai: u64,
}

/// Count of records per status value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusCount {
    pub name: String,
    pub value: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Composition {
    pub cs: Vec<StatusCount>,
    pub migration: Vec<StatusCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyFrt {
    /// Display label, e.g. `Jan 2025`.
    pub month: String,
    pub month_key: String,
    pub avg_frt: f64,
    pub ticket_count: u64,
}

/// Latest month's average FRT against the month before it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrtChange {
    pub percentage: f64,
    /// `down` means responses got faster.
    pub direction: TrendDirection,
    pub current: f64,
    pub previous: f64,
}

impl FrtChange {
    pub fn new(delta: TrendDelta, current: f64, previous: f64) -> Self {
        Self {
            percentage: delta.percentage,
            direction: delta.direction,
            current,
            previous,
        }
    }

    pub fn is_improvement(&self) -> bool {
        self.direction == TrendDirection::Down
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardReport {
    pub stats: TicketStats,
    pub trend: Vec<DailyTrend>,
    pub composition: Composition,
    #[serde(rename = "frtTrend")]
    pub frt_trend: Vec<MonthlyFrt>,
    #[serde(rename = "frtChange")]
    pub frt_change: Option<FrtChange>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OnboardingRow {
    pub id: i64,
    pub name: String,
    pub deployment_date: Option<NaiveDate>,
    pub impl_completed: u64,
    pub impl_total: u64,
    pub train_completed: u64,
    pub train_total: u64,
    pub train_finish_date: Option<NaiveDate>,
    #[serde(rename = "implProgress")]
    pub impl_progress: u32,
    #[serde(rename = "trainProgress")]
    pub train_progress: u32,
    /// `Cepat N hari`, `Tepat Waktu`, `Telat N hari` or `-`.
    #[serde(rename = "onboardingStatus")]
    pub onboarding_status: String,
}

/// Migration outcomes for items closed within one period.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PerformanceSummary {
    pub period: String,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub total: u64,
    pub on_time: u64,
    pub fast: u64,
    pub late: u64,
    /// Closed items missing a deadline.
    pub unclassified: u64,
    /// Share of classified items that met their deadline, one decimal place.
    pub on_time_rate: Option<f64>,
    pub avg_late_days: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceReport {
    pub current: PerformanceSummary,
    pub previous: PerformanceSummary,
    pub on_time_rate_change: Option<TrendDelta>,
}
