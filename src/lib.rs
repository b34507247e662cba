pub mod date_util;
pub mod error;
pub mod import;
pub mod metrics;
pub mod model;
pub mod query;
pub mod report;
pub mod resource;
pub mod storage;
pub mod validate;

pub use error::{Error, Result};
pub use import::{ImportReport, ImportResource};
pub use query::{MigrationQuery, Period};
pub use report::{DashboardReport, OnboardingRow, PerformanceReport};
pub use resource::Resource;
pub use storage::Database;

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::Connection;

use metrics::DEFAULT_FRT_TARGET_MINUTES;
use model::*;
use storage::repository::{self, NamedTable};
use validate::Validate;

pub const FRT_TARGET_KEY: &str = "frt_target_minutes";
pub const DEPLOYMENT_KEYWORD_KEY: &str = "deployment_keyword";
pub const OPERATOR_KEYWORD_KEY: &str = "operator_keyword";

pub const DEFAULT_DEPLOYMENT_KEYWORD: &str = "Deployment";
pub const DEFAULT_OPERATOR_KEYWORD: &str = "Operator";

fn now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

fn found(affected: usize, what: &str, id: i64) -> Result<()> {
    if affected == 0 {
        Err(Error::NotFound(format!("{what} {id}")))
    } else {
        Ok(())
    }
}

fn require<T>(row: Option<T>, what: &str, id: i64) -> Result<T> {
    row.ok_or_else(|| Error::NotFound(format!("{what} {id}")))
}

/// Main entry point for the operations warehouse.
pub struct OpsDash {
    db: Database,
}

impl OpsDash {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Open the warehouse at the default path (`~/.opsdash/opsdash.db`).
    pub async fn open() -> Result<Self> {
        Ok(Self::new(Database::open().await?))
    }

    pub async fn open_at(path: impl AsRef<std::path::Path>) -> Result<Self> {
        Ok(Self::new(Database::open_at(path).await?))
    }

    pub async fn open_memory() -> Result<Self> {
        Ok(Self::new(Database::open_memory().await?))
    }

    /// Access the database (for direct queries in the CLI).
    pub fn db(&self) -> &Database {
        &self.db
    }

    async fn read<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> std::result::Result<T, rusqlite::Error> + Send + 'static,
        T: Send + 'static,
    {
        Ok(self.db.reader().call(move |conn| f(conn)).await?)
    }

    async fn write<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> std::result::Result<T, rusqlite::Error> + Send + 'static,
        T: Send + 'static,
    {
        Ok(self.db.writer().call(f).await?)
    }

    // ── Agents ─────────────────────────────────────────────────────

    pub async fn list_agents(&self) -> Result<Vec<AgentRow>> {
        self.read(repository::list_agents).await
    }

    pub async fn get_agent(&self, id: i64) -> Result<AgentRow> {
        require(self.read(move |c| repository::get_agent(c, id)).await?, "agent", id)
    }

    pub async fn create_agent(&self, agent: NewAgent) -> Result<i64> {
        agent.validate()?;
        let id = self.write(move |c| repository::insert_agent(c, &agent)).await?;
        log::debug!("created agent {id}");
        Ok(id)
    }

    pub async fn update_agent(&self, id: i64, agent: NewAgent) -> Result<()> {
        agent.validate()?;
        let n = self.write(move |c| repository::update_agent(c, id, &agent)).await?;
        log::debug!("updated agent {id}");
        found(n, "agent", id)
    }

    pub async fn delete_agent(&self, id: i64) -> Result<()> {
        found(self.write(move |c| repository::delete_agent(c, id)).await?, "agent", id)
    }

    // ── Campuses ───────────────────────────────────────────────────

    pub async fn list_campuses(&self) -> Result<Vec<CampusRow>> {
        self.read(repository::list_campuses).await
    }

    pub async fn get_campus(&self, id: i64) -> Result<CampusRow> {
        require(self.read(move |c| repository::get_campus(c, id)).await?, "campus", id)
    }

    pub async fn create_campus(&self, campus: NewCampus) -> Result<i64> {
        campus.validate()?;
        let id = self.write(move |c| repository::insert_campus(c, &campus)).await?;
        log::debug!("created campus {id}");
        Ok(id)
    }

    pub async fn update_campus(&self, id: i64, campus: NewCampus) -> Result<()> {
        campus.validate()?;
        let n = self.write(move |c| repository::update_campus(c, id, &campus)).await?;
        log::debug!("updated campus {id}");
        found(n, "campus", id)
    }

    /// Deleting a campus also removes its migrations, tickets and prints.
    pub async fn delete_campus(&self, id: i64) -> Result<()> {
        found(self.write(move |c| repository::delete_campus(c, id)).await?, "campus", id)
    }

    // ── Sources / scopes / materials ───────────────────────────────

    pub async fn list_named(&self, table: NamedTable) -> Result<Vec<NamedRow>> {
        self.read(move |c| repository::list_named(c, table)).await
    }

    pub async fn get_named(&self, table: NamedTable, id: i64) -> Result<NamedRow> {
        require(
            self.read(move |c| repository::get_named(c, table, id)).await?,
            table.table(),
            id,
        )
    }

    pub async fn create_named(&self, table: NamedTable, item: NewNamed) -> Result<i64> {
        item.validate()?;
        let id = self.write(move |c| repository::insert_named(c, table, &item)).await?;
        log::debug!("created {} {id}", table.table());
        Ok(id)
    }

    pub async fn update_named(&self, table: NamedTable, id: i64, item: NewNamed) -> Result<()> {
        item.validate()?;
        let n = self
            .write(move |c| repository::update_named(c, table, id, &item))
            .await?;
        found(n, table.table(), id)
    }

    pub async fn delete_named(&self, table: NamedTable, id: i64) -> Result<()> {
        let n = self.write(move |c| repository::delete_named(c, table, id)).await?;
        found(n, table.table(), id)
    }

    // ── Holidays ───────────────────────────────────────────────────

    pub async fn list_holidays(&self) -> Result<Vec<HolidayRow>> {
        self.read(repository::list_holidays).await
    }

    pub async fn get_holiday(&self, id: i64) -> Result<HolidayRow> {
        require(self.read(move |c| repository::get_holiday(c, id)).await?, "holiday", id)
    }

    pub async fn create_holiday(&self, holiday: NewHoliday) -> Result<i64> {
        holiday.validate()?;
        let id = self.write(move |c| repository::insert_holiday(c, &holiday)).await?;
        log::debug!("created holiday {id}");
        Ok(id)
    }

    pub async fn update_holiday(&self, id: i64, holiday: NewHoliday) -> Result<()> {
        holiday.validate()?;
        let n = self
            .write(move |c| repository::update_holiday(c, id, &holiday))
            .await?;
        found(n, "holiday", id)
    }

    pub async fn delete_holiday(&self, id: i64) -> Result<()> {
        found(self.write(move |c| repository::delete_holiday(c, id)).await?, "holiday", id)
    }

    // ── SLA ────────────────────────────────────────────────────────

    pub async fn list_slas(&self) -> Result<Vec<SlaRow>> {
        self.read(repository::list_slas).await
    }

    pub async fn get_sla(&self, id: i64) -> Result<SlaRow> {
        require(self.read(move |c| repository::get_sla(c, id)).await?, "sla", id)
    }

    pub async fn create_sla(&self, sla: NewSla) -> Result<i64> {
        sla.validate()?;
        let id = self.write(move |c| repository::insert_sla(c, &sla)).await?;
        log::debug!("created sla {id}");
        Ok(id)
    }

    pub async fn update_sla(&self, id: i64, sla: NewSla) -> Result<()> {
        sla.validate()?;
        let n = self.write(move |c| repository::update_sla(c, id, &sla)).await?;
        found(n, "sla", id)
    }

    pub async fn delete_sla(&self, id: i64) -> Result<()> {
        found(self.write(move |c| repository::delete_sla(c, id)).await?, "sla", id)
    }

    /// Deadline a job of this SLA would get if it started on `today`.
    pub async fn project_sla_deadline(&self, sla_id: i64, today: NaiveDate) -> Result<NaiveDate> {
        let sla = self.get_sla(sla_id).await?;
        Ok(metrics::project_deadline(today, sla.duration, sla.unit))
    }

    // ── Print results ──────────────────────────────────────────────

    pub async fn list_print_results(&self) -> Result<Vec<PrintResultRow>> {
        self.read(repository::list_print_results).await
    }

    pub async fn get_print_result(&self, id: i64) -> Result<PrintResultRow> {
        require(
            self.read(move |c| repository::get_print_result(c, id)).await?,
            "print result",
            id,
        )
    }

    pub async fn create_print_result(&self, item: NewPrintResult) -> Result<i64> {
        item.validate()?;
        let id = self
            .write(move |c| repository::insert_print_result(c, &item))
            .await?;
        log::debug!("created print result {id}");
        Ok(id)
    }

    pub async fn update_print_result(&self, id: i64, item: NewPrintResult) -> Result<()> {
        item.validate()?;
        let n = self
            .write(move |c| repository::update_print_result(c, id, &item))
            .await?;
        found(n, "print result", id)
    }

    pub async fn delete_print_result(&self, id: i64) -> Result<()> {
        let n = self.write(move |c| repository::delete_print_result(c, id)).await?;
        found(n, "print result", id)
    }

    // ── Training ───────────────────────────────────────────────────

    pub async fn list_training(&self) -> Result<Vec<TrainingTicketRow>> {
        self.read(repository::list_training).await
    }

    pub async fn get_training(&self, id: i64) -> Result<TrainingTicketRow> {
        require(self.read(move |c| repository::get_training(c, id)).await?, "training", id)
    }

    pub async fn create_training(&self, ticket: NewTrainingTicket) -> Result<i64> {
        ticket.validate()?;
        let now = now();
        let id = self
            .write(move |c| repository::insert_training(c, &ticket, now))
            .await?;
        log::debug!("created training {id}");
        Ok(id)
    }

    pub async fn update_training(&self, id: i64, ticket: NewTrainingTicket) -> Result<()> {
        ticket.validate()?;
        let now = now();
        let n = self
            .write(move |c| repository::update_training(c, id, &ticket, now))
            .await?;
        log::debug!("updated training {id}");
        found(n, "training", id)
    }

    pub async fn delete_training(&self, id: i64) -> Result<()> {
        found(self.write(move |c| repository::delete_training(c, id)).await?, "training", id)
    }

    // ── Migrations ─────────────────────────────────────────────────

    pub async fn list_migrations(&self) -> Result<Vec<MigrationRow>> {
        self.read(repository::list_migrations).await
    }

    pub async fn get_migration(&self, id: i64) -> Result<MigrationRow> {
        require(self.read(move |c| repository::get_migration(c, id)).await?, "migration", id)
    }

    pub async fn create_migration(&self, migration: NewMigration) -> Result<i64> {
        migration.validate()?;
        let now = now();
        let id = self
            .write(move |c| repository::insert_migration(c, &migration, now))
            .await?;
        log::debug!("created migration {id}");
        Ok(id)
    }

    /// Create every item of the batch or none of them.
    pub async fn create_migration_batch(&self, batch: MigrationBatch) -> Result<Vec<i64>> {
        batch.validate()?;
        let now = now();
        let campus_id = batch.campus_id;
        let ids = self
            .write(move |c| repository::insert_migration_batch(c, &batch, now))
            .await?;
        log::debug!("created {} migrations for campus {campus_id}", ids.len());
        Ok(ids)
    }

    pub async fn update_migration(&self, id: i64, migration: NewMigration) -> Result<()> {
        migration.validate()?;
        let now = now();
        let n = self
            .write(move |c| repository::update_migration(c, id, &migration, now))
            .await?;
        log::debug!("updated migration {id}");
        found(n, "migration", id)
    }

    pub async fn delete_migration(&self, id: i64) -> Result<()> {
        found(self.write(move |c| repository::delete_migration(c, id)).await?, "migration", id)
    }

    /// Remove all migrations of a campus; returns how many were removed.
    pub async fn delete_campus_migrations(&self, campus_id: i64) -> Result<usize> {
        let n = self
            .write(move |c| repository::delete_campus_migrations(c, campus_id))
            .await?;
        log::debug!("deleted {n} migrations of campus {campus_id}");
        Ok(n)
    }

    // ── Customer-service tickets ───────────────────────────────────

    pub async fn list_tickets(&self) -> Result<Vec<TicketRow>> {
        let target = self.frt_target_minutes().await?;
        self.read(move |c| repository::list_tickets(c, target)).await
    }

    pub async fn get_ticket(&self, id: i64) -> Result<TicketRow> {
        let target = self.frt_target_minutes().await?;
        require(
            self.read(move |c| repository::get_ticket(c, id, target)).await?,
            "ticket",
            id,
        )
    }

    pub async fn create_ticket(&self, ticket: NewTicket) -> Result<i64> {
        ticket.validate()?;
        let now = now();
        let id = self
            .write(move |c| repository::insert_ticket(c, &ticket, now))
            .await?;
        log::debug!("created ticket {id}");
        Ok(id)
    }

    pub async fn update_ticket(&self, id: i64, ticket: NewTicket) -> Result<()> {
        ticket.validate()?;
        let now = now();
        let n = self
            .write(move |c| repository::update_ticket(c, id, &ticket, now))
            .await?;
        log::debug!("updated ticket {id}");
        found(n, "ticket", id)
    }

    pub async fn delete_ticket(&self, id: i64) -> Result<()> {
        found(self.write(move |c| repository::delete_ticket(c, id)).await?, "ticket", id)
    }

    // ── Implementation prints ──────────────────────────────────────

    pub async fn list_impl_prints(&self) -> Result<Vec<ImplementationPrintRow>> {
        self.read(repository::list_impl_prints).await
    }

    pub async fn get_impl_print(&self, id: i64) -> Result<ImplementationPrintRow> {
        require(
            self.read(move |c| repository::get_impl_print(c, id)).await?,
            "implementation print",
            id,
        )
    }

    pub async fn create_impl_print(&self, print: NewImplementationPrint) -> Result<i64> {
        print.validate()?;
        let now = now();
        let id = self
            .write(move |c| repository::insert_impl_print(c, &print, now))
            .await?;
        log::debug!("created implementation print {id}");
        Ok(id)
    }

    pub async fn update_impl_print(&self, id: i64, print: NewImplementationPrint) -> Result<()> {
        print.validate()?;
        let now = now();
        let n = self
            .write(move |c| repository::update_impl_print(c, id, &print, now))
            .await?;
        found(n, "implementation print", id)
    }

    pub async fn delete_impl_print(&self, id: i64) -> Result<()> {
        let n = self.write(move |c| repository::delete_impl_print(c, id)).await?;
        found(n, "implementation print", id)
    }

    // ── Reports ────────────────────────────────────────────────────

    pub async fn dashboard(&self, as_of: NaiveDateTime) -> Result<DashboardReport> {
        report::dashboard(&self.db, as_of).await
    }

    pub async fn onboarding(&self) -> Result<Vec<OnboardingRow>> {
        let deployment = self.deployment_keyword().await?;
        let operator = self.operator_keyword().await?;
        report::onboarding(&self.db, &deployment, &operator).await
    }

    pub async fn migration_performance(&self, period: Period) -> Result<PerformanceReport> {
        report::migration_performance(&self.db, period).await
    }

    pub async fn import(&self, resource: ImportResource, json_text: &str) -> Result<ImportReport> {
        import::import(&self.db, resource, json_text, now()).await
    }

    /// Row counts of every stored resource.
    pub async fn status(&self) -> Result<Vec<(&'static str, i64)>> {
        self.read(repository::table_counts).await
    }

    // ── Config commands ────────────────────────────────────────────

    pub async fn config_get(&self, key: &str) -> Result<Option<String>> {
        let key = key.to_string();
        self.read(move |c| repository::get_config(c, &key)).await
    }

    /// Store a setting. Known keys are checked before they are written.
    pub async fn config_set(&self, key: &str, value: &str) -> Result<()> {
        let value = value.trim().to_string();
        match key {
            FRT_TARGET_KEY if value.parse::<i64>().map_or(true, |m| m < 0) => {
                return Err(Error::Config(format!(
                    "{key} must be a non-negative number of minutes, got {value:?}"
                )));
            }
            DEPLOYMENT_KEYWORD_KEY | OPERATOR_KEYWORD_KEY if value.is_empty() => {
                return Err(Error::Config(format!("{key} must not be empty")));
            }
            _ => {}
        }
        let key = key.to_string();
        self.write(move |c| repository::set_config(c, &key, &value)).await
    }

    pub async fn config_list(&self) -> Result<Vec<(String, String)>> {
        self.read(repository::list_config).await
    }

    /// First-response target in minutes.
    pub async fn frt_target_minutes(&self) -> Result<i64> {
        match self.config_get(FRT_TARGET_KEY).await? {
            None => Ok(DEFAULT_FRT_TARGET_MINUTES),
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(minutes) if minutes >= 0 => Ok(minutes),
                _ => {
                    log::warn!(
                        "ignoring invalid {FRT_TARGET_KEY} {raw:?}, using {DEFAULT_FRT_TARGET_MINUTES}"
                    );
                    Ok(DEFAULT_FRT_TARGET_MINUTES)
                }
            },
        }
    }

    pub async fn deployment_keyword(&self) -> Result<String> {
        self.keyword(DEPLOYMENT_KEYWORD_KEY, DEFAULT_DEPLOYMENT_KEYWORD)
            .await
    }

    pub async fn operator_keyword(&self) -> Result<String> {
        self.keyword(OPERATOR_KEYWORD_KEY, DEFAULT_OPERATOR_KEYWORD).await
    }

    async fn keyword(&self, key: &str, default: &str) -> Result<String> {
        match self.config_get(key).await? {
            Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
            Some(_) => {
                log::warn!("{key} is blank, using {default:?}");
                Ok(default.to_string())
            }
            None => Ok(default.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn campus(name: &str) -> NewCampus {
        NewCampus {
            code: Some("UM".into()),
            name: name.into(),
            address: None,
            applications: vec!["SIAKAD".into()],
            status: ActiveStatus::Active,
            deployment_date: None,
        }
    }

    #[tokio::test]
    async fn test_missing_ids_are_not_found() {
        let dw = OpsDash::open_memory().await.unwrap();
        assert!(matches!(dw.get_agent(42).await, Err(Error::NotFound(_))));
        assert!(matches!(
            dw.update_campus(42, campus("Universitas Merdeka")).await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(dw.delete_ticket(42).await, Err(Error::NotFound(_))));
        assert!(matches!(
            dw.delete_named(NamedTable::Scopes, 42).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_validation_runs_before_write() {
        let dw = OpsDash::open_memory().await.unwrap();
        let err = dw
            .create_agent(NewAgent {
                name: "Rudi".into(),
                email: "not-an-email".into(),
                username: "rudi".into(),
                phone: None,
                role: AgentRole::CustomerService,
                status: ActiveStatus::Active,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation { ref field, .. } if field == "email"));
        assert!(dw.list_agents().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_campus_roundtrip_and_cascade() {
        let dw = OpsDash::open_memory().await.unwrap();
        let id = dw.create_campus(campus("Universitas Merdeka")).await.unwrap();
        dw.create_migration_batch(MigrationBatch {
            campus_id: id,
            items: vec![MigrationItem::default(), MigrationItem::default()],
        })
        .await
        .unwrap();
        assert_eq!(dw.list_migrations().await.unwrap().len(), 2);

        dw.update_campus(id, campus("Universitas Merdeka Malang"))
            .await
            .unwrap();
        assert_eq!(dw.get_campus(id).await.unwrap().name, "Universitas Merdeka Malang");

        dw.delete_campus(id).await.unwrap();
        assert!(dw.list_migrations().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_campus_migrations() {
        let dw = OpsDash::open_memory().await.unwrap();
        let a = dw.create_campus(campus("Kampus A")).await.unwrap();
        let b = dw.create_campus(campus("Kampus B")).await.unwrap();
        for campus_id in [a, a, b] {
            dw.create_migration(NewMigration {
                campus_id,
                item: MigrationItem::default(),
            })
            .await
            .unwrap();
        }
        assert_eq!(dw.delete_campus_migrations(a).await.unwrap(), 2);
        let left = dw.list_migrations().await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].campus_id, b);
    }

    #[tokio::test]
    async fn test_config_accessors_fall_back_to_defaults() {
        let dw = OpsDash::open_memory().await.unwrap();
        assert_eq!(dw.frt_target_minutes().await.unwrap(), 10);
        assert_eq!(dw.deployment_keyword().await.unwrap(), "Deployment");

        dw.config_set(FRT_TARGET_KEY, "15").await.unwrap();
        assert_eq!(dw.frt_target_minutes().await.unwrap(), 15);
        assert!(matches!(
            dw.config_set(FRT_TARGET_KEY, "soon").await,
            Err(Error::Config(_))
        ));
        assert!(matches!(
            dw.config_set(OPERATOR_KEYWORD_KEY, "  ").await,
            Err(Error::Config(_))
        ));

        // Values written behind the facade's back still fall back.
        dw.db()
            .writer()
            .call(|c| repository::set_config(c, FRT_TARGET_KEY, "-3"))
            .await
            .unwrap();
        assert_eq!(dw.frt_target_minutes().await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_ticket_frt_status_uses_configured_target() {
        let dw = OpsDash::open_memory().await.unwrap();
        let created = date_util::parse_timestamp("2025-01-06 09:00:00");
        let id = dw
            .create_ticket(NewTicket {
                created_at: created,
                response_at: date_util::parse_timestamp("2025-01-06 09:12:00"),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(dw.get_ticket(id).await.unwrap().frt_status, "Telat 2 menit");

        dw.config_set(FRT_TARGET_KEY, "15").await.unwrap();
        let ticket = dw.get_ticket(id).await.unwrap();
        assert_eq!(ticket.frt, Some(12));
        assert_eq!(ticket.frt_status, "Cepat 12 menit");
        assert_eq!(ticket.working_hours.as_deref(), Some("Dalam Jam Kerja"));
    }

    #[tokio::test]
    async fn test_project_sla_deadline() {
        let dw = OpsDash::open_memory().await.unwrap();
        let id = dw
            .create_sla(NewSla {
                category: "Migrasi".into(),
                sla_type: "Import Nilai".into(),
                duration: 48,
                unit: SlaUnit::Jam,
            })
            .await
            .unwrap();
        let today = NaiveDate::from_ymd_opt(2025, 1, 30).unwrap();
        assert_eq!(
            dw.project_sla_deadline(id, today).await.unwrap(),
            NaiveDate::from_ymd_opt(2025, 2, 1).unwrap()
        );
        assert!(matches!(
            dw.project_sla_deadline(9999, today).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_status_counts_seeded_slas() {
        let dw = OpsDash::open_memory().await.unwrap();
        let counts = dw.status().await.unwrap();
        let sla = counts.iter().find(|(t, _)| *t == "sla").unwrap();
        assert_eq!(sla.1, 5);
    }
}
