//! Bulk import of JSON arrays exported from spreadsheets.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::model::{NewCampus, NewHoliday, NewSla, NewTrainingTicket};
use crate::storage::{repository, Database};
use crate::validate::Validate;

/// Resources that accept bulk import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportResource {
    Campuses,
    Holidays,
    Slas,
    Training,
}

impl ImportResource {
    pub const ALL: &'static [ImportResource] = &[
        ImportResource::Campuses,
        ImportResource::Holidays,
        ImportResource::Slas,
        ImportResource::Training,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ImportResource::Campuses => "campuses",
            ImportResource::Holidays => "holidays",
            ImportResource::Slas => "slas",
            ImportResource::Training => "training",
        }
    }
}

impl fmt::Display for ImportResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImportResource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ImportResource::ALL
            .iter()
            .copied()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| Error::Import(format!("unsupported import resource: {s}")))
    }
}

/// Outcome of one import run.
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub resource: ImportResource,
    pub imported: u64,
    pub failed: u64,
    /// One message per rejected element, prefixed with its array index.
    pub errors: Vec<String>,
}

impl ImportReport {
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

enum Batch {
    Campuses(Vec<NewCampus>),
    Holidays(Vec<NewHoliday>),
    Slas(Vec<NewSla>),
    Training(Vec<NewTrainingTicket>),
}

impl Batch {
    fn len(&self) -> usize {
        match self {
            Batch::Campuses(v) => v.len(),
            Batch::Holidays(v) => v.len(),
            Batch::Slas(v) => v.len(),
            Batch::Training(v) => v.len(),
        }
    }

    fn insert(&self, conn: &Connection, now: NaiveDateTime) -> rusqlite::Result<()> {
        match self {
            Batch::Campuses(items) => {
                for item in items {
                    repository::insert_campus(conn, item)?;
                }
            }
            Batch::Holidays(items) => {
                for item in items {
                    repository::insert_holiday(conn, item)?;
                }
            }
            Batch::Slas(items) => {
                for item in items {
                    repository::insert_sla(conn, item)?;
                }
            }
            Batch::Training(items) => {
                for item in items {
                    repository::insert_training(conn, item, now)?;
                }
            }
        }
        Ok(())
    }
}

/// Deserialize and validate each element on its own, keeping the good ones.
fn parse_items<T: DeserializeOwned + Validate>(values: Vec<Value>, errors: &mut Vec<String>) -> Vec<T> {
    values
        .into_iter()
        .enumerate()
        .filter_map(|(i, value)| {
            let parsed = serde_json::from_value::<T>(value)
                .map_err(Error::from)
                .and_then(|item| item.validate().map(|_| item));
            match parsed {
                Ok(item) => Some(item),
                Err(e) => {
                    errors.push(format!("item {i}: {e}"));
                    None
                }
            }
        })
        .collect()
}

/// Import a JSON array of `resource` payloads.
///
/// Invalid elements are reported and skipped; the valid ones are written in
/// a single transaction, so a storage failure leaves nothing behind.
pub async fn import(
    db: &Database,
    resource: ImportResource,
    json_text: &str,
    now: NaiveDateTime,
) -> Result<ImportReport> {
    let values = match serde_json::from_str::<Value>(json_text) {
        Ok(Value::Array(values)) => values,
        Ok(_) => return Err(Error::Import("expected a JSON array".into())),
        Err(e) => return Err(Error::Import(format!("invalid JSON: {e}"))),
    };
    if values.is_empty() {
        return Err(Error::Import("nothing to import".into()));
    }

    let total = values.len();
    let mut errors = Vec::new();
    let batch = match resource {
        ImportResource::Campuses => Batch::Campuses(parse_items(values, &mut errors)),
        ImportResource::Holidays => Batch::Holidays(parse_items(values, &mut errors)),
        ImportResource::Slas => Batch::Slas(parse_items(values, &mut errors)),
        ImportResource::Training => Batch::Training(parse_items(values, &mut errors)),
    };

    let imported = batch.len();
    if imported > 0 {
        db.writer()
            .call(move |conn| {
                let tx = conn.transaction()?;
                batch.insert(&tx, now)?;
                tx.commit()?;
                Ok::<(), rusqlite::Error>(())
            })
            .await?;
    }

    let report = ImportReport {
        resource,
        imported: imported as u64,
        failed: (total - imported) as u64,
        errors,
    };
    if report.is_clean() {
        log::info!("imported {} {}", report.imported, resource);
    } else {
        log::info!(
            "imported {} {}, {} rejected",
            report.imported,
            resource,
            report.failed
        );
    }
    Ok(report)
}
