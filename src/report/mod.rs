//! Aggregate views over the store, built on the metrics engine.

pub mod types;

pub use types::*;

use std::collections::HashMap;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection};

use crate::date_util::{
    format_date, format_timestamp, month_label, months_back_start, parse_date, parse_timestamp,
    start_of_day,
};
use crate::error::Result;
use crate::metrics::{
    classify_migration_performance, classify_onboarding_status, compute_progress_percent,
    compute_trend_delta, late_days, round1, MigrationPerformance,
};
use crate::model::MigrationStatus;
use crate::query::Period;
use crate::storage::Database;

/// Months of FRT history on the dashboard, not counting the current one.
pub const FRT_TREND_MONTHS: u32 = 6;

/// Build the dashboard as seen at `as_of`.
pub async fn dashboard(db: &Database, as_of: NaiveDateTime) -> Result<DashboardReport> {
    let today = as_of.date();
    let today_start = format_timestamp(&start_of_day(today));
    let week_start = today - Duration::days(6);
    let frt_start = months_back_start(today, FRT_TREND_MONTHS);

    let (stats, trend, composition, frt_trend) = db
        .reader()
        .call(move |conn| {
            let stats = ticket_stats(conn, &today_start)?;
            let trend = weekly_trend(conn, week_start, today)?;
            let composition = Composition {
                cs: status_counts(conn, "customer_service_tickets")?,
                migration: status_counts(conn, "migrations")?,
            };
            let frt_trend = monthly_frt(conn, frt_start, today)?;
            Ok::<_, rusqlite::Error>((stats, trend, composition, frt_trend))
        })
        .await?;

    let frt_change = frt_change(&frt_trend);
    log::info!(
        "dashboard as of {}: {} tickets, {} FRT months",
        format_timestamp(&as_of),
        stats.total,
        frt_trend.len()
    );
    Ok(DashboardReport {
        stats,
        trend,
        composition,
        frt_trend,
        frt_change,
    })
}

fn ticket_stats(conn: &Connection, today_start: &str) -> rusqlite::Result<TicketStats> {
    conn.query_row(
        "SELECT COUNT(*),
                COALESCE(SUM(CASE WHEN status = 'completed' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN status != 'completed' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN created_at >= ?1 THEN 1 ELSE 0 END), 0)
         FROM customer_service_tickets",
        params![today_start],
        |row| {
            Ok(TicketStats {
                total: row.get::<_, i64>(0)? as u64,
                completed: row.get::<_, i64>(1)? as u64,
                active: row.get::<_, i64>(2)? as u64,
                new_today: row.get::<_, i64>(3)? as u64,
            })
        },
    )
}

/// Tickets created and completed per day, one entry for every day from
/// `start` through `end` (days without tickets count zero).
fn weekly_trend(
    conn: &Connection,
    start: NaiveDate,
    end: NaiveDate,
) -> rusqlite::Result<Vec<DailyTrend>> {
    let mut stmt = conn.prepare(
        "SELECT substr(created_at, 1, 10) AS day,
                COUNT(*),
                SUM(CASE WHEN status = 'completed' THEN 1 ELSE 0 END)
         FROM customer_service_tickets
         WHERE substr(created_at, 1, 10) BETWEEN ?1 AND ?2
         GROUP BY day",
    )?;
    let counts: HashMap<String, (i64, i64)> = stmt
        .query_map(params![format_date(&start), format_date(&end)], |row| {
            Ok((row.get(0)?, (row.get(1)?, row.get(2)?)))
        })?
        .collect::<rusqlite::Result<_>>()?;

    Ok(start
        .iter_days()
        .take_while(|d| *d <= end)
        .map(|date| {
            let (tiket, selesai) = counts.get(&format_date(&date)).copied().unwrap_or((0, 0));
            DailyTrend {
                name: date.format("%a").to_string(),
                date,
                tiket: tiket as u64,
                selesai: selesai as u64,
            }
        })
        .collect())
}

fn status_counts(conn: &Connection, table: &str) -> rusqlite::Result<Vec<StatusCount>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT status, COUNT(*) FROM {table} GROUP BY status ORDER BY status"
    ))?;
    let rows = stmt.query_map([], |row| {
        Ok(StatusCount {
            name: row.get(0)?,
            value: row.get::<_, i64>(1)? as u64,
        })
    })?;
    rows.collect()
}

/// Average FRT per calendar month for answered tickets created from `start`.
fn monthly_frt(
    conn: &Connection,
    start: NaiveDate,
    end: NaiveDate,
) -> rusqlite::Result<Vec<MonthlyFrt>> {
    let mut stmt = conn.prepare(
        "SELECT substr(created_at, 1, 7) AS month_key, AVG(frt), COUNT(*)
         FROM customer_service_tickets
         WHERE substr(created_at, 1, 10) BETWEEN ?1 AND ?2
           AND response_at IS NOT NULL
           AND frt IS NOT NULL
         GROUP BY month_key
         ORDER BY month_key ASC",
    )?;
    let rows = stmt.query_map(params![format_date(&start), format_date(&end)], |row| {
        let month_key: String = row.get(0)?;
        let month = parse_date(&format!("{month_key}-01"))
            .map(month_label)
            .unwrap_or_else(|| month_key.clone());
        Ok(MonthlyFrt {
            month,
            month_key,
            avg_frt: round1(row.get(1)?),
            ticket_count: row.get::<_, i64>(2)? as u64,
        })
    })?;
    rows.collect()
}

/// Change between the last two months of the FRT trend.
pub fn frt_change(trend: &[MonthlyFrt]) -> Option<FrtChange> {
    let [.., previous, current] = trend else {
        return None;
    };
    compute_trend_delta(Some(current.avg_frt), Some(previous.avg_frt))
        .map(|delta| FrtChange::new(delta, current.avg_frt, previous.avg_frt))
}

/// Onboarding progress for every active campus.
///
/// The deployment date is the earliest completion of a migration whose SLA
/// type contains `deployment_keyword`; training is finished at the latest
/// close of a `done` session whose material contains `operator_keyword`.
pub async fn onboarding(
    db: &Database,
    deployment_keyword: &str,
    operator_keyword: &str,
) -> Result<Vec<OnboardingRow>> {
    let deployment_keyword = deployment_keyword.to_string();
    let operator_keyword = operator_keyword.to_string();

    let rows = db
        .reader()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT c.id, c.name,
                    (SELECT MIN(m.completed_at)
                     FROM migrations m
                     JOIN sla s ON m.sla_id = s.id
                     WHERE m.campus_id = c.id AND s.type LIKE '%' || ?1 || '%'
                       AND m.status = 'completed') AS deployment_date,
                    (SELECT COUNT(*) FROM migrations m
                     WHERE m.campus_id = c.id AND m.status = 'completed') AS impl_completed,
                    (SELECT COUNT(*) FROM migrations m WHERE m.campus_id = c.id) AS impl_total,
                    (SELECT COUNT(*) FROM training_tickets t
                     WHERE t.campus_id = c.id AND t.status = 'done') AS train_completed,
                    (SELECT COUNT(*) FROM training_tickets t WHERE t.campus_id = c.id) AS train_total,
                    (SELECT MAX(t.date_closed)
                     FROM training_tickets t
                     JOIN materials mt ON t.material_id = mt.id
                     WHERE t.campus_id = c.id AND t.status = 'done'
                       AND mt.name LIKE '%' || ?2 || '%') AS train_finish_date
                 FROM campuses c
                 WHERE c.status = 'active'
                 ORDER BY c.name",
            )?;
            let rows = stmt.query_map(params![deployment_keyword, operator_keyword], |row| {
                let deployment: Option<String> = row.get("deployment_date")?;
                let finish: Option<String> = row.get("train_finish_date")?;
                let impl_completed = row.get::<_, i64>("impl_completed")? as u64;
                let impl_total = row.get::<_, i64>("impl_total")? as u64;
                let train_completed = row.get::<_, i64>("train_completed")? as u64;
                let train_total = row.get::<_, i64>("train_total")? as u64;
                let deployment_date = deployment.as_deref().and_then(parse_date);
                let train_finish_date = finish.as_deref().and_then(parse_date);
                Ok(OnboardingRow {
                    id: row.get("id")?,
                    name: row.get("name")?,
                    deployment_date,
                    impl_completed,
                    impl_total,
                    train_completed,
                    train_total,
                    train_finish_date,
                    impl_progress: compute_progress_percent(impl_completed, impl_total),
                    train_progress: compute_progress_percent(train_completed, train_total),
                    onboarding_status: classify_onboarding_status(
                        deployment_date,
                        train_finish_date,
                    )
                    .to_string(),
                })
            })?;
            rows.collect::<std::result::Result<Vec<_>, rusqlite::Error>>()
        })
        .await?;

    log::info!("onboarding report: {} active campuses", rows.len());
    Ok(rows)
}

/// Raw tallies for one period, before rates are rounded.
#[derive(Debug, Default)]
struct PerformanceTally {
    on_time: u64,
    fast: u64,
    late: u64,
    unclassified: u64,
    late_day_sum: i64,
}

impl PerformanceTally {
    fn classified(&self) -> u64 {
        self.on_time + self.fast + self.late
    }

    fn on_time_rate(&self) -> Option<f64> {
        match self.classified() {
            0 => None,
            n => Some((self.on_time + self.fast) as f64 / n as f64 * 100.0),
        }
    }

    fn summary(&self, period: &Period) -> PerformanceSummary {
        let (start, end) = period.date_range();
        PerformanceSummary {
            period: period.to_string(),
            start: Some(start),
            end: Some(end),
            total: self.classified() + self.unclassified,
            on_time: self.on_time,
            fast: self.fast,
            late: self.late,
            unclassified: self.unclassified,
            on_time_rate: self.on_time_rate().map(round1),
            avg_late_days: (self.late > 0)
                .then(|| round1(self.late_day_sum as f64 / self.late as f64)),
        }
    }
}

fn tally_performance(conn: &Connection, period: &Period) -> rusqlite::Result<PerformanceTally> {
    let (start, end) = period.date_range();
    let mut stmt = conn.prepare(
        "SELECT status, deadline, completed_at
         FROM migrations
         WHERE status IN ('completed', 'cancel')
           AND substr(completed_at, 1, 10) BETWEEN ?1 AND ?2",
    )?;
    let mut rows = stmt.query(params![format_date(&start), format_date(&end)])?;
    let mut tally = PerformanceTally::default();
    while let Some(row) = rows.next()? {
        let status: MigrationStatus = row.get(0)?;
        let deadline = row.get::<_, Option<String>>(1)?.as_deref().and_then(parse_date);
        let completed_at = row
            .get::<_, Option<String>>(2)?
            .as_deref()
            .and_then(parse_timestamp);
        match classify_migration_performance(status, deadline, completed_at) {
            MigrationPerformance::OnTime => tally.on_time += 1,
            MigrationPerformance::Fast => tally.fast += 1,
            MigrationPerformance::Late => {
                tally.late += 1;
                tally.late_day_sum += late_days(deadline, completed_at).unwrap_or(0);
            }
            MigrationPerformance::None => tally.unclassified += 1,
        }
    }
    Ok(tally)
}

/// Migration deadline performance for `period` against the period before it.
pub async fn migration_performance(db: &Database, period: Period) -> Result<PerformanceReport> {
    let previous = period.previous();
    let (current, prior) = db
        .reader()
        .call(move |conn| {
            Ok::<_, rusqlite::Error>((
                tally_performance(conn, &period)?,
                tally_performance(conn, &previous)?,
            ))
        })
        .await?;

    let report = PerformanceReport {
        on_time_rate_change: compute_trend_delta(current.on_time_rate(), prior.on_time_rate()),
        current: current.summary(&period),
        previous: prior.summary(&previous),
    };
    log::info!(
        "migration performance for {period}: {} closed, on-time rate {:?}",
        report.current.total,
        report.current.on_time_rate
    );
    Ok(report)
}
