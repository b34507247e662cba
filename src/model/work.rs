use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::serde_ts;
use super::status::{MigrationStatus, PrintItemStatus, TicketStatus, TrainingMethod, TrainingStatus};
use crate::error::{Error, Result};
use crate::metrics::MigrationPerformance;
use crate::validate::{self, Validate};

// ── Training tickets ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct TrainingTicketRow {
    pub id: i64,
    pub date: Option<NaiveDate>,
    pub campus_id: i64,
    pub campus_name: Option<String>,
    /// The trainer; stored as `trainer_id`.
    pub agent_id: Option<i64>,
    pub agent_name: Option<String>,
    pub material_id: Option<i64>,
    pub material_name: Option<String>,
    pub method: TrainingMethod,
    pub status: TrainingStatus,
    pub minutes_link: Option<String>,
    pub date_closed: Option<NaiveDateTime>,
    pub created_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTrainingTicket {
    pub date: NaiveDate,
    pub campus_id: i64,
    #[serde(alias = "trainer_id")]
    pub agent_id: i64,
    pub material_id: i64,
    #[serde(default)]
    pub method: TrainingMethod,
    #[serde(default)]
    pub status: TrainingStatus,
    #[serde(default)]
    pub minutes_link: Option<String>,
}

impl Validate for NewTrainingTicket {
    fn validate(&self) -> Result<()> {
        validate::positive_id("campus_id", self.campus_id)?;
        validate::positive_id("agent_id", self.agent_id)?;
        validate::positive_id("material_id", self.material_id)?;
        validate::link("minutes_link", self.minutes_link.as_deref())
    }
}

// ── Migrations ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct MigrationRow {
    pub id: i64,
    pub campus_id: i64,
    pub campus_name: String,
    pub sla_id: Option<i64>,
    /// SLA type of the job, e.g. `Deployment`.
    pub job_name: Option<String>,
    pub sla_duration: Option<i64>,
    pub sla_unit: Option<String>,
    pub specialist_id: Option<i64>,
    pub specialist_name: Option<String>,
    pub verifier_id: Option<i64>,
    pub verifier_name: Option<String>,
    pub link_task: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub status: MigrationStatus,
    pub completed_at: Option<NaiveDateTime>,
    pub migration_condition: Option<String>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
    pub performance: MigrationPerformance,
    pub late_days: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewMigration {
    pub campus_id: i64,
    #[serde(flatten)]
    pub item: MigrationItem,
}

/// The per-job part of a migration, shared by single and batch creation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MigrationItem {
    #[serde(default)]
    pub sla_id: Option<i64>,
    #[serde(default)]
    pub specialist_id: Option<i64>,
    #[serde(default)]
    pub verifier_id: Option<i64>,
    #[serde(default)]
    pub link_task: Option<String>,
    #[serde(default, deserialize_with = "serde_ts::optional_date")]
    pub deadline: Option<NaiveDate>,
    #[serde(default)]
    pub status: MigrationStatus,
    #[serde(default)]
    pub migration_condition: Option<String>,
}

impl Validate for MigrationItem {
    fn validate(&self) -> Result<()> {
        validate::link("link_task", self.link_task.as_deref())?;
        validate::migration_condition("migration_condition", self.migration_condition.as_deref())
    }
}

impl Validate for NewMigration {
    fn validate(&self) -> Result<()> {
        validate::positive_id("campus_id", self.campus_id)?;
        self.item.validate()
    }
}

/// Several jobs for one campus, written in a single transaction.
#[derive(Debug, Clone, Deserialize)]
pub struct MigrationBatch {
    pub campus_id: i64,
    pub items: Vec<MigrationItem>,
}

impl Validate for MigrationBatch {
    fn validate(&self) -> Result<()> {
        validate::positive_id("campus_id", self.campus_id)?;
        if self.items.is_empty() {
            return Err(Error::validation("items", "at least one item is required"));
        }
        self.items.iter().try_for_each(Validate::validate)
    }
}

// ── Customer-service tickets ───────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct TicketRow {
    pub id: i64,
    pub campus_id: Option<i64>,
    pub campus_name: Option<String>,
    pub campus_pic: Option<String>,
    pub source_id: Option<i64>,
    pub source_name: Option<String>,
    pub question: Option<String>,
    pub scope: Option<String>,
    pub answer_agent_id: Option<i64>,
    pub answer_agent_name: Option<String>,
    pub solved_agent_id: Option<i64>,
    pub solved_agent_name: Option<String>,
    pub created_at: Option<NaiveDateTime>,
    pub response_at: Option<NaiveDateTime>,
    pub solved_at: Option<NaiveDateTime>,
    pub status: TicketStatus,
    pub bug_link: Option<String>,
    pub working_hours: Option<String>,
    pub frt: Option<i64>,
    /// `Tepat Waktu`, `Telat N hari` or `-`.
    pub resolution: String,
    /// `Cepat N menit`, `Telat N menit` or `-`.
    pub frt_status: String,
}

/// Ticket payload. `frt` and `working_hours` are always derived on write, so
/// any client-supplied values are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTicket {
    #[serde(default)]
    pub campus_id: Option<i64>,
    #[serde(default)]
    pub campus_pic: Option<String>,
    #[serde(default)]
    pub source_id: Option<i64>,
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub answer_agent_id: Option<i64>,
    #[serde(default)]
    pub solved_agent_id: Option<i64>,
    #[serde(default, deserialize_with = "serde_ts::optional")]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default, deserialize_with = "serde_ts::optional")]
    pub response_at: Option<NaiveDateTime>,
    #[serde(default, deserialize_with = "serde_ts::optional")]
    pub solved_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub status: TicketStatus,
    #[serde(default)]
    pub bug_link: Option<String>,
}

impl Validate for NewTicket {
    fn validate(&self) -> Result<()> {
        let has_bug_link = self
            .bug_link
            .as_deref()
            .is_some_and(|l| !l.trim().is_empty());
        if self.status == TicketStatus::Bug && !has_bug_link {
            return Err(Error::validation(
                "bug_link",
                "is required when status is 'bug'",
            ));
        }
        validate::link("bug_link", self.bug_link.as_deref())
    }
}

// ── Implementation prints ──────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImplPrintItem {
    pub name: String,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub status: PrintItemStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImplementationPrintRow {
    pub id: i64,
    pub campus_id: i64,
    pub campus_name: String,
    pub items: Vec<ImplPrintItem>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
    /// Share of items in `Completed`, as a whole percentage.
    pub progress: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewImplementationPrint {
    pub campus_id: i64,
    #[serde(default)]
    pub items: Vec<ImplPrintItem>,
}

impl Validate for NewImplementationPrint {
    fn validate(&self) -> Result<()> {
        validate::positive_id("campus_id", self.campus_id)?;
        for item in &self.items {
            validate::non_empty("items.name", &item.name)?;
            validate::link("items.link", item.link.as_deref())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bug_ticket_requires_link() {
        let ticket: NewTicket =
            serde_json::from_str(r#"{"status":"bug","question":"Nilai tidak muncul"}"#).unwrap();
        let err = ticket.validate().unwrap_err();
        assert!(matches!(err, Error::Validation { ref field, .. } if field == "bug_link"));

        let with_link = NewTicket {
            bug_link: Some("https://tracker.example.com/BUG-7".into()),
            ..ticket
        };
        assert!(with_link.validate().is_ok());
    }

    #[test]
    fn test_ticket_ignores_client_derived_fields() {
        let ticket: NewTicket = serde_json::from_str(
            r#"{"created_at":"2024-03-04T09:00","response_at":"2024-03-04 09:12:00","frt":999,"working_hours":"x","solved_at":""}"#,
        )
        .unwrap();
        assert!(ticket.created_at.is_some());
        assert!(ticket.response_at.is_some());
        assert!(ticket.solved_at.is_none());
        assert_eq!(ticket.status, TicketStatus::Todo);
    }

    #[test]
    fn test_training_accepts_trainer_alias() {
        let t: NewTrainingTicket = serde_json::from_str(
            r#"{"date":"2024-05-02","campus_id":1,"trainer_id":4,"material_id":2,"method":"Offline dikantor"}"#,
        )
        .unwrap();
        assert_eq!(t.agent_id, 4);
        assert_eq!(t.method, TrainingMethod::OfflineOffice);
        assert_eq!(t.status, TrainingStatus::Todo);
        assert!(t.validate().is_ok());
    }

    #[test]
    fn test_migration_batch_validation() {
        let batch: MigrationBatch = serde_json::from_str(
            r#"{"campus_id":3,"items":[{"sla_id":1,"migration_condition":"Ke-2"},{"sla_id":2,"deadline":""}]}"#,
        )
        .unwrap();
        assert!(batch.validate().is_ok());
        assert_eq!(batch.items[0].status, MigrationStatus::Backlog);

        let empty = MigrationBatch {
            campus_id: 3,
            items: vec![],
        };
        assert!(empty.validate().is_err());

        let bad = MigrationBatch {
            campus_id: 3,
            items: vec![MigrationItem {
                migration_condition: Some("Ke-12".into()),
                ..Default::default()
            }],
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_impl_print_item_defaults_to_backlog() {
        let p: NewImplementationPrint = serde_json::from_str(
            r#"{"campus_id":1,"items":[{"name":"KRS","link":"https://docs.example.com/krs"}]}"#,
        )
        .unwrap();
        assert_eq!(p.items[0].status, PrintItemStatus::Backlog);
        assert!(p.validate().is_ok());
    }
}
