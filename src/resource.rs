//! Resource-name dispatch over the typed facade, used by the CLI's generic
//! `list`/`get`/`add`/`update`/`delete` commands.

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::model::{MigrationBatch, NewMigration};
use crate::storage::repository::NamedTable;
use crate::OpsDash;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Agents,
    Campuses,
    Sources,
    Scopes,
    Materials,
    Holidays,
    Slas,
    Training,
    Migrations,
    Tickets,
    PrintResults,
    ImplPrints,
}

impl Resource {
    pub const ALL: &'static [Resource] = &[
        Resource::Agents,
        Resource::Campuses,
        Resource::Sources,
        Resource::Scopes,
        Resource::Materials,
        Resource::Holidays,
        Resource::Slas,
        Resource::Training,
        Resource::Migrations,
        Resource::Tickets,
        Resource::PrintResults,
        Resource::ImplPrints,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Agents => "agents",
            Resource::Campuses => "campuses",
            Resource::Sources => "sources",
            Resource::Scopes => "scopes",
            Resource::Materials => "materials",
            Resource::Holidays => "holidays",
            Resource::Slas => "slas",
            Resource::Training => "training",
            Resource::Migrations => "migrations",
            Resource::Tickets => "tickets",
            Resource::PrintResults => "print-results",
            Resource::ImplPrints => "impl-prints",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase().replace('_', "-");
        Resource::ALL
            .iter()
            .copied()
            .find(|r| r.as_str() == wanted)
            .ok_or_else(|| {
                let known: Vec<&str> = Resource::ALL.iter().map(|r| r.as_str()).collect();
                Error::Other(format!("unknown resource {s:?} (expected one of: {})", known.join(", ")))
            })
    }
}

fn payload<T: DeserializeOwned>(data: &str) -> Result<T> {
    serde_json::from_str(data).map_err(|e| Error::validation("payload", e.to_string()))
}

fn to_value<T: serde::Serialize>(value: T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

impl OpsDash {
    pub async fn list_json(&self, resource: Resource) -> Result<Value> {
        match resource {
            Resource::Agents => to_value(self.list_agents().await?),
            Resource::Campuses => to_value(self.list_campuses().await?),
            Resource::Holidays => to_value(self.list_holidays().await?),
            Resource::Slas => to_value(self.list_slas().await?),
            Resource::Training => to_value(self.list_training().await?),
            Resource::Migrations => to_value(self.list_migrations().await?),
            Resource::Tickets => to_value(self.list_tickets().await?),
            Resource::PrintResults => to_value(self.list_print_results().await?),
            Resource::ImplPrints => to_value(self.list_impl_prints().await?),
            Resource::Sources => to_value(self.list_named(NamedTable::Sources).await?),
            Resource::Scopes => to_value(self.list_named(NamedTable::Scopes).await?),
            Resource::Materials => to_value(self.list_named(NamedTable::Materials).await?),
        }
    }

    pub async fn get_json(&self, resource: Resource, id: i64) -> Result<Value> {
        match resource {
            Resource::Agents => to_value(self.get_agent(id).await?),
            Resource::Campuses => to_value(self.get_campus(id).await?),
            Resource::Holidays => to_value(self.get_holiday(id).await?),
            Resource::Slas => to_value(self.get_sla(id).await?),
            Resource::Training => to_value(self.get_training(id).await?),
            Resource::Migrations => to_value(self.get_migration(id).await?),
            Resource::Tickets => to_value(self.get_ticket(id).await?),
            Resource::PrintResults => to_value(self.get_print_result(id).await?),
            Resource::ImplPrints => to_value(self.get_impl_print(id).await?),
            Resource::Sources => to_value(self.get_named(NamedTable::Sources, id).await?),
            Resource::Scopes => to_value(self.get_named(NamedTable::Scopes, id).await?),
            Resource::Materials => to_value(self.get_named(NamedTable::Materials, id).await?),
        }
    }

    /// Create from a JSON payload. A migration payload carrying an `items`
    /// array is created as one batch.
    pub async fn create_json(&self, resource: Resource, data: &str) -> Result<Vec<i64>> {
        let id = match resource {
            Resource::Agents => self.create_agent(payload(data)?).await?,
            Resource::Campuses => self.create_campus(payload(data)?).await?,
            Resource::Holidays => self.create_holiday(payload(data)?).await?,
            Resource::Slas => self.create_sla(payload(data)?).await?,
            Resource::Training => self.create_training(payload(data)?).await?,
            Resource::Migrations => {
                let raw: Value = payload(data)?;
                if raw.get("items").is_some() {
                    let batch: MigrationBatch =
                        serde_json::from_value(raw).map_err(|e| Error::validation("payload", e.to_string()))?;
                    return self.create_migration_batch(batch).await;
                }
                let migration: NewMigration =
                    serde_json::from_value(raw).map_err(|e| Error::validation("payload", e.to_string()))?;
                self.create_migration(migration).await?
            }
            Resource::Tickets => self.create_ticket(payload(data)?).await?,
            Resource::PrintResults => self.create_print_result(payload(data)?).await?,
            Resource::ImplPrints => self.create_impl_print(payload(data)?).await?,
            Resource::Sources => self.create_named(NamedTable::Sources, payload(data)?).await?,
            Resource::Scopes => self.create_named(NamedTable::Scopes, payload(data)?).await?,
            Resource::Materials => self.create_named(NamedTable::Materials, payload(data)?).await?,
        };
        Ok(vec![id])
    }

    pub async fn update_json(&self, resource: Resource, id: i64, data: &str) -> Result<()> {
        match resource {
            Resource::Agents => self.update_agent(id, payload(data)?).await,
            Resource::Campuses => self.update_campus(id, payload(data)?).await,
            Resource::Holidays => self.update_holiday(id, payload(data)?).await,
            Resource::Slas => self.update_sla(id, payload(data)?).await,
            Resource::Training => self.update_training(id, payload(data)?).await,
            Resource::Migrations => self.update_migration(id, payload(data)?).await,
            Resource::Tickets => self.update_ticket(id, payload(data)?).await,
            Resource::PrintResults => self.update_print_result(id, payload(data)?).await,
            Resource::ImplPrints => self.update_impl_print(id, payload(data)?).await,
            Resource::Sources => self.update_named(NamedTable::Sources, id, payload(data)?).await,
            Resource::Scopes => self.update_named(NamedTable::Scopes, id, payload(data)?).await,
            Resource::Materials => self.update_named(NamedTable::Materials, id, payload(data)?).await,
        }
    }

    pub async fn delete(&self, resource: Resource, id: i64) -> Result<()> {
        match resource {
            Resource::Agents => self.delete_agent(id).await,
            Resource::Campuses => self.delete_campus(id).await,
            Resource::Holidays => self.delete_holiday(id).await,
            Resource::Slas => self.delete_sla(id).await,
            Resource::Training => self.delete_training(id).await,
            Resource::Migrations => self.delete_migration(id).await,
            Resource::Tickets => self.delete_ticket(id).await,
            Resource::PrintResults => self.delete_print_result(id).await,
            Resource::ImplPrints => self.delete_impl_print(id).await,
            Resource::Sources => self.delete_named(NamedTable::Sources, id).await,
            Resource::Scopes => self.delete_named(NamedTable::Scopes, id).await,
            Resource::Materials => self.delete_named(NamedTable::Materials, id).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_resource_names() {
        assert_eq!("print-results".parse::<Resource>().unwrap(), Resource::PrintResults);
        assert_eq!("impl_prints".parse::<Resource>().unwrap(), Resource::ImplPrints);
        assert_eq!(" Tickets ".parse::<Resource>().unwrap(), Resource::Tickets);
        assert!("users".parse::<Resource>().is_err());
    }

    #[tokio::test]
    async fn test_json_crud_cycle() {
        let dw = OpsDash::open_memory().await.unwrap();
        let ids = dw
            .create_json(Resource::Materials, r#"{"name": "Pelatihan Operator"}"#)
            .await
            .unwrap();
        let id = ids[0];
        dw.update_json(Resource::Materials, id, r#"{"name": "Pelatihan Operator PMB"}"#)
            .await
            .unwrap();
        let row = dw.get_json(Resource::Materials, id).await.unwrap();
        assert_eq!(row["name"], "Pelatihan Operator PMB");

        dw.delete(Resource::Materials, id).await.unwrap();
        assert!(matches!(
            dw.get_json(Resource::Materials, id).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_migration_batch_payload() {
        let dw = OpsDash::open_memory().await.unwrap();
        let campus = dw
            .create_json(Resource::Campuses, r#"{"name": "Universitas Merdeka"}"#)
            .await
            .unwrap()[0];
        let ids = dw
            .create_json(
                Resource::Migrations,
                &format!(r#"{{"campus_id": {campus}, "items": [{{}}, {{"status": "todo"}}]}}"#),
            )
            .await
            .unwrap();
        assert_eq!(ids.len(), 2);

        let listed = dw.list_json(Resource::Migrations).await.unwrap();
        assert_eq!(listed.as_array().unwrap().len(), 2);
        assert_eq!(listed[0]["campus_name"], "Universitas Merdeka");
    }

    #[tokio::test]
    async fn test_bad_payload_is_a_validation_error() {
        let dw = OpsDash::open_memory().await.unwrap();
        let err = dw
            .create_json(Resource::Holidays, r#"{"name": "Nyepi"}"#)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation { ref field, .. } if field == "payload"));
    }
}
