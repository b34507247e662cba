use chrono::NaiveDate;

use crate::date_util::{format_date, format_timestamp};
use crate::error::Result;
use crate::metrics::MigrationPerformance;
use crate::model::{MigrationRow, MigrationStatus};
use crate::storage::{repository, Database};

/// Builder for filtered migration listings.
///
/// Every filter but `performance` becomes a SQL predicate. Performance is
/// derived per row, so it is applied after the rows are classified.
#[derive(Debug, Clone, Default)]
pub struct MigrationQuery {
    campus_name: Option<String>,
    campus_id: Option<i64>,
    sla_id: Option<i64>,
    condition: Option<String>,
    specialist_id: Option<i64>,
    status: Option<MigrationStatus>,
    deadline: Option<NaiveDate>,
    performance: Option<MigrationPerformance>,
    limit: Option<u32>,
}

impl MigrationQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Case-insensitive substring match on the campus name.
    pub fn campus_name(mut self, needle: &str) -> Self {
        self.campus_name = Some(needle.to_string());
        self
    }

    pub fn campus(mut self, id: i64) -> Self {
        self.campus_id = Some(id);
        self
    }

    /// Job type, identified by its SLA row.
    pub fn sla(mut self, id: i64) -> Self {
        self.sla_id = Some(id);
        self
    }

    pub fn condition(mut self, condition: &str) -> Self {
        self.condition = Some(condition.to_string());
        self
    }

    pub fn specialist(mut self, id: i64) -> Self {
        self.specialist_id = Some(id);
        self
    }

    pub fn status(mut self, status: MigrationStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn deadline(mut self, date: NaiveDate) -> Self {
        self.deadline = Some(date);
        self
    }

    pub fn performance(mut self, performance: MigrationPerformance) -> Self {
        self.performance = Some(performance);
        self
    }

    pub fn limit(mut self, n: u32) -> Self {
        self.limit = Some(n);
        self
    }

    /// Build and execute the query.
    pub async fn rows(self, db: &Database) -> Result<Vec<MigrationRow>> {
        let performance = self.performance;
        let limit = self.limit.map(|n| n as usize);
        let rows = db
            .reader()
            .call(move |conn| {
                let (sql, params) = self.build_sql();
                let param_refs: Vec<&dyn rusqlite::types::ToSql> =
                    params.iter().map(|p| p.as_ref()).collect();
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(param_refs.as_slice(), repository::migration_from_row)?;
                rows.collect::<std::result::Result<Vec<_>, rusqlite::Error>>()
            })
            .await?;

        let filtered = rows
            .into_iter()
            .filter(|r| performance.map_or(true, |p| r.performance == p));
        Ok(match limit {
            Some(n) => filtered.take(n).collect(),
            None => filtered.collect(),
        })
    }

    pub async fn to_json(self, db: &Database) -> Result<String> {
        let rows = self.rows(db).await?;
        Ok(serde_json::to_string_pretty(&rows)?)
    }

    pub async fn to_csv(self, db: &Database) -> Result<String> {
        let rows = self.rows(db).await?;
        Ok(rows_to_csv(&rows))
    }

    fn build_sql(&self) -> (String, Vec<Box<dyn rusqlite::types::ToSql>>) {
        let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
        let mut wheres = Vec::new();
        let mut param_idx = 1;

        if let Some(ref needle) = self.campus_name {
            wheres.push(format!("LOWER(c.name) LIKE ?{param_idx} ESCAPE '\\'"));
            params.push(Box::new(format!("%{}%", escape_like(&needle.to_lowercase()))));
            param_idx += 1;
        }
        if let Some(id) = self.campus_id {
            wheres.push(format!("m.campus_id = ?{param_idx}"));
            params.push(Box::new(id));
            param_idx += 1;
        }
        if let Some(id) = self.sla_id {
            wheres.push(format!("m.sla_id = ?{param_idx}"));
            params.push(Box::new(id));
            param_idx += 1;
        }
        if let Some(ref condition) = self.condition {
            wheres.push(format!("m.migration_condition = ?{param_idx}"));
            params.push(Box::new(condition.clone()));
            param_idx += 1;
        }
        if let Some(id) = self.specialist_id {
            wheres.push(format!("m.specialist_id = ?{param_idx}"));
            params.push(Box::new(id));
            param_idx += 1;
        }
        if let Some(status) = self.status {
            wheres.push(format!("m.status = ?{param_idx}"));
            params.push(Box::new(status));
            param_idx += 1;
        }
        if let Some(date) = self.deadline {
            wheres.push(format!("substr(m.deadline, 1, 10) = ?{param_idx}"));
            params.push(Box::new(format_date(&date)));
        }

        let mut sql = repository::MIGRATION_SELECT.to_string();
        if !wheres.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&wheres.join(" AND "));
        }
        sql.push_str(" ORDER BY c.name, m.created_at DESC, m.id DESC");

        (sql, params)
    }
}

pub fn rows_to_csv(rows: &[MigrationRow]) -> String {
    let mut out = String::new();
    out.push_str("id,campus_name,job_name,specialist_name,verifier_name,status,deadline,completed_at,migration_condition,performance,late_days,link_task\n");
    for row in rows {
        out.push_str(&format!(
            "{},{},{},{},{},{},{},{},{},{},{},{}\n",
            row.id,
            csv_escape(&row.campus_name),
            csv_escape(row.job_name.as_deref().unwrap_or("")),
            csv_escape(row.specialist_name.as_deref().unwrap_or("")),
            csv_escape(row.verifier_name.as_deref().unwrap_or("")),
            row.status,
            row.deadline.as_ref().map(format_date).unwrap_or_default(),
            row.completed_at.as_ref().map(format_timestamp).unwrap_or_default(),
            csv_escape(row.migration_condition.as_deref().unwrap_or("")),
            row.performance.as_str(),
            row.late_days.map_or(String::new(), |d| d.to_string()),
            csv_escape(row.link_task.as_deref().unwrap_or("")),
        ));
    }
    out
}

/// Make `%`, `_` and `\` match literally in a `LIKE ... ESCAPE '\'` pattern.
fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

pub fn csv_escape(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date_util::parse_timestamp;
    use crate::model::{ActiveStatus, MigrationItem, NewCampus, NewMigration};

    #[test]
    fn test_build_sql_default() {
        let (sql, params) = MigrationQuery::new().build_sql();
        assert!(sql.contains("FROM migrations m"));
        assert!(!sql.contains("WHERE"));
        assert!(params.is_empty());
    }

    #[test]
    fn test_build_sql_with_filters() {
        let (sql, params) = MigrationQuery::new()
            .campus_name("Nusa")
            .status(MigrationStatus::Completed)
            .deadline(NaiveDate::from_ymd_opt(2024, 4, 10).unwrap())
            .performance(MigrationPerformance::Late)
            .build_sql();
        assert!(sql.contains("LOWER(c.name) LIKE ?1 ESCAPE '\\'"));
        assert!(sql.contains("m.status = ?2"));
        assert!(sql.contains("substr(m.deadline, 1, 10) = ?3"));
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("nusa"), "nusa");
        assert_eq!(escape_like("100%_x"), "100\\%\\_x");
        assert_eq!(escape_like("a\\b"), "a\\\\b");
    }

    #[test]
    fn test_csv_escape() {
        assert_eq!(csv_escape("Deployment"), "Deployment");
        assert_eq!(csv_escape("Universitas A, Kampus 2"), "\"Universitas A, Kampus 2\"");
        assert_eq!(csv_escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[tokio::test]
    async fn test_performance_filter_applies_after_classification() {
        let db = Database::open_memory().await.unwrap();
        db.writer()
            .call(|conn| {
                let campus = NewCampus {
                    code: None,
                    name: "Universitas Nusa Bangsa".into(),
                    address: None,
                    applications: vec![],
                    status: ActiveStatus::Active,
                    deployment_date: None,
                };
                let campus_id = repository::insert_campus(conn, &campus)?;
                let deadline = NaiveDate::from_ymd_opt(2024, 4, 10);
                for (status, done) in [
                    (MigrationStatus::Completed, "2024-04-09 10:00:00"),
                    (MigrationStatus::Completed, "2024-04-12 10:00:00"),
                    (MigrationStatus::InProgress, "2024-04-12 10:00:00"),
                ] {
                    let m = NewMigration {
                        campus_id,
                        item: MigrationItem {
                            deadline,
                            status,
                            ..Default::default()
                        },
                    };
                    repository::insert_migration(conn, &m, parse_timestamp(done).unwrap())?;
                }
                Ok::<(), rusqlite::Error>(())
            })
            .await
            .unwrap();

        let late = MigrationQuery::new()
            .campus_name("nusa")
            .performance(MigrationPerformance::Late)
            .rows(&db)
            .await
            .unwrap();
        assert_eq!(late.len(), 1);
        assert_eq!(late[0].late_days, Some(2));

        let wildcard = MigrationQuery::new().campus_name("%").rows(&db).await.unwrap();
        assert!(wildcard.is_empty());
        let underscore = MigrationQuery::new().campus_name("nusa_bangsa").rows(&db).await.unwrap();
        assert!(underscore.is_empty());

        let csv = MigrationQuery::new()
            .status(MigrationStatus::Completed)
            .to_csv(&db)
            .await
            .unwrap();
        assert_eq!(csv.lines().count(), 3);
        assert!(csv.contains("fast"));
    }
}
