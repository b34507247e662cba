use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::serde_ts;
use super::status::{ActiveStatus, AgentRole, Portal, SlaUnit};
use crate::error::{Error, Result};
use crate::validate::{self, Validate};

// ── Agents ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct AgentRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub username: String,
    pub phone: Option<String>,
    pub role: AgentRole,
    pub status: ActiveStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewAgent {
    pub name: String,
    pub email: String,
    pub username: String,
    #[serde(default)]
    pub phone: Option<String>,
    pub role: AgentRole,
    #[serde(default)]
    pub status: ActiveStatus,
}

impl Validate for NewAgent {
    fn validate(&self) -> Result<()> {
        validate::non_empty("name", &self.name)?;
        validate::email("email", &self.email)?;
        validate::min_len("username", &self.username, 3)?;
        Ok(())
    }
}

// ── Campuses ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct CampusRow {
    pub id: i64,
    pub code: Option<String>,
    pub name: String,
    pub address: Option<String>,
    /// Applications the campus runs, e.g. `SIAKAD`, `Feeder PDDIKTI`.
    pub applications: Vec<String>,
    pub status: ActiveStatus,
    pub deployment_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCampus {
    #[serde(default)]
    pub code: Option<String>,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "applications")]
    pub applications: Vec<String>,
    #[serde(default)]
    pub status: ActiveStatus,
    #[serde(default, deserialize_with = "serde_ts::optional_date")]
    pub deployment_date: Option<NaiveDate>,
}

impl Validate for NewCampus {
    fn validate(&self) -> Result<()> {
        validate::non_empty("name", &self.name)?;
        if self.applications.iter().any(|a| a.trim().is_empty()) {
            return Err(Error::validation("applications", "contains an empty entry"));
        }
        Ok(())
    }
}

/// Applications arrive either as a JSON array or as a comma-separated
/// spreadsheet cell.
fn applications<'de, D>(d: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Apps {
        List(Vec<String>),
        Csv(String),
    }
    Ok(match Option::<Apps>::deserialize(d)? {
        None => Vec::new(),
        Some(Apps::List(list)) => list,
        Some(Apps::Csv(s)) => s
            .split(',')
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect(),
    })
}

// ── Sources / scopes / materials ───────────────────────────────────

/// A row of one of the single-name lookup tables.
#[derive(Debug, Clone, Serialize)]
pub struct NamedRow {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewNamed {
    pub name: String,
}

impl Validate for NewNamed {
    fn validate(&self) -> Result<()> {
        validate::non_empty("name", &self.name)
    }
}

// ── Holidays ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct HolidayRow {
    pub id: i64,
    pub date: NaiveDate,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewHoliday {
    pub date: NaiveDate,
    pub name: String,
}

impl Validate for NewHoliday {
    fn validate(&self) -> Result<()> {
        validate::non_empty("name", &self.name)
    }
}

// ── SLA ────────────────────────────────────────────────────────────

pub const DEFAULT_SLA_CATEGORY: &str = "Customer Service";

#[derive(Debug, Clone, Serialize)]
pub struct SlaRow {
    pub id: i64,
    pub category: String,
    #[serde(rename = "type")]
    pub sla_type: String,
    pub duration: i64,
    pub unit: SlaUnit,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewSla {
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(rename = "type")]
    pub sla_type: String,
    pub duration: i64,
    #[serde(default = "default_unit")]
    pub unit: SlaUnit,
}

fn default_category() -> String {
    DEFAULT_SLA_CATEGORY.to_string()
}

fn default_unit() -> SlaUnit {
    SlaUnit::Menit
}

impl Validate for NewSla {
    fn validate(&self) -> Result<()> {
        validate::non_empty("type", &self.sla_type)?;
        validate::non_empty("category", &self.category)?;
        if self.duration < 0 {
            return Err(Error::validation("duration", "must not be negative"));
        }
        Ok(())
    }
}

// ── Print results ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct PrintResultRow {
    pub id: i64,
    pub name: String,
    pub portal: Portal,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPrintResult {
    pub name: String,
    pub portal: Portal,
}

impl Validate for NewPrintResult {
    fn validate(&self) -> Result<()> {
        validate::non_empty("name", &self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_agent_validation() {
        let agent: NewAgent = serde_json::from_str(
            r#"{"name":"Siti Rahayu","email":"siti@example.com","username":"siti","role":"Trainer"}"#,
        )
        .unwrap();
        assert_eq!(agent.status, ActiveStatus::Active);
        assert!(agent.validate().is_ok());

        let bad = NewAgent {
            username: "si".into(),
            ..agent
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_campus_applications_forms() {
        let from_list: NewCampus =
            serde_json::from_str(r#"{"name":"Politeknik Mandiri","applications":["SIAKAD","SISTER"]}"#)
                .unwrap();
        assert_eq!(from_list.applications, vec!["SIAKAD", "SISTER"]);

        let from_csv: NewCampus = serde_json::from_str(
            r#"{"name":"Politeknik Mandiri","applications":"SIAKAD, Feeder PDDIKTI","deployment_date":""}"#,
        )
        .unwrap();
        assert_eq!(from_csv.applications, vec!["SIAKAD", "Feeder PDDIKTI"]);
        assert!(from_csv.deployment_date.is_none());
    }

    #[test]
    fn test_sla_defaults_and_validation() {
        let sla: NewSla = serde_json::from_str(r#"{"type":"Eskalasi","duration":30}"#).unwrap();
        assert_eq!(sla.unit, SlaUnit::Menit);
        assert_eq!(sla.category, DEFAULT_SLA_CATEGORY);
        assert!(sla.validate().is_ok());

        let negative = NewSla { duration: -1, ..sla };
        assert!(negative.validate().is_err());
    }
}
