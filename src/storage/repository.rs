use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::date_util::{format_date, format_timestamp, parse_date, parse_timestamp};
use crate::metrics::{
    classify_frt_target, classify_migration_performance, classify_resolution,
    classify_working_hours, compute_frt, compute_progress_percent, late_days, project_deadline,
};
use crate::model::*;

// ── Row helpers ────────────────────────────────────────────────────

fn get_ts(row: &Row<'_>, col: &str) -> Result<Option<NaiveDateTime>, rusqlite::Error> {
    let raw: Option<String> = row.get(col)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

fn get_date(row: &Row<'_>, col: &str) -> Result<Option<NaiveDate>, rusqlite::Error> {
    let raw: Option<String> = row.get(col)?;
    Ok(raw.as_deref().and_then(parse_date))
}

fn ts_text(ts: Option<NaiveDateTime>) -> Option<String> {
    ts.as_ref().map(format_timestamp)
}

fn date_text(d: Option<NaiveDate>) -> Option<String> {
    d.as_ref().map(format_date)
}

fn to_json_text<T: serde::Serialize>(value: &T) -> Result<String, rusqlite::Error> {
    serde_json::to_string(value).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

fn from_json_text<T: serde::de::DeserializeOwned>(
    row: &Row<'_>,
    col: &str,
) -> Result<T, rusqlite::Error> {
    let idx = row.as_ref().column_index(col)?;
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Stamp for a record entering a closing status. An existing stamp survives
/// re-saves while the record stays closed; reopening clears it.
pub fn closing_stamp(
    closed: bool,
    existing: Option<NaiveDateTime>,
    now: NaiveDateTime,
) -> Option<NaiveDateTime> {
    if closed {
        existing.or(Some(now))
    } else {
        None
    }
}

fn delete_by_id(conn: &Connection, table: &str, id: i64) -> Result<usize, rusqlite::Error> {
    conn.execute(&format!("DELETE FROM {table} WHERE id = ?1"), params![id])
}

// ── Agents ─────────────────────────────────────────────────────────

fn agent_from_row(row: &Row<'_>) -> Result<AgentRow, rusqlite::Error> {
    Ok(AgentRow {
        id: row.get("id")?,
        name: row.get("name")?,
        email: row.get("email")?,
        username: row.get("username")?,
        phone: row.get("phone")?,
        role: row.get("role")?,
        status: row.get("status")?,
    })
}

const AGENT_SELECT: &str = "SELECT id, name, email, username, phone, role, status FROM agents";

pub fn list_agents(conn: &Connection) -> Result<Vec<AgentRow>, rusqlite::Error> {
    let mut stmt = conn.prepare(&format!("{AGENT_SELECT} ORDER BY name"))?;
    let rows = stmt.query_map([], agent_from_row)?;
    rows.collect()
}

pub fn get_agent(conn: &Connection, id: i64) -> Result<Option<AgentRow>, rusqlite::Error> {
    conn.query_row(
        &format!("{AGENT_SELECT} WHERE id = ?1"),
        params![id],
        agent_from_row,
    )
    .optional()
}

pub fn insert_agent(conn: &Connection, agent: &NewAgent) -> Result<i64, rusqlite::Error> {
    conn.execute(
        "INSERT INTO agents (name, email, username, phone, role, status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            agent.name.trim(),
            agent.email.trim(),
            agent.username.trim(),
            agent.phone,
            agent.role,
            agent.status
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_agent(conn: &Connection, id: i64, agent: &NewAgent) -> Result<usize, rusqlite::Error> {
    conn.execute(
        "UPDATE agents SET name = ?1, email = ?2, username = ?3, phone = ?4, role = ?5, status = ?6
         WHERE id = ?7",
        params![
            agent.name.trim(),
            agent.email.trim(),
            agent.username.trim(),
            agent.phone,
            agent.role,
            agent.status,
            id
        ],
    )
}

pub fn delete_agent(conn: &Connection, id: i64) -> Result<usize, rusqlite::Error> {
    delete_by_id(conn, "agents", id)
}

// ── Campuses ───────────────────────────────────────────────────────

fn campus_from_row(row: &Row<'_>) -> Result<CampusRow, rusqlite::Error> {
    // Rows written before applications were structured may hold plain text.
    let applications = from_json_text(row, "applications").unwrap_or_default();
    Ok(CampusRow {
        id: row.get("id")?,
        code: row.get("code")?,
        name: row.get("name")?,
        address: row.get("address")?,
        applications,
        status: row.get("status")?,
        deployment_date: get_date(row, "deployment_date")?,
    })
}

const CAMPUS_SELECT: &str =
    "SELECT id, code, name, address, applications, status, deployment_date FROM campuses";

pub fn list_campuses(conn: &Connection) -> Result<Vec<CampusRow>, rusqlite::Error> {
    let mut stmt = conn.prepare(&format!("{CAMPUS_SELECT} ORDER BY name"))?;
    let rows = stmt.query_map([], campus_from_row)?;
    rows.collect()
}

pub fn get_campus(conn: &Connection, id: i64) -> Result<Option<CampusRow>, rusqlite::Error> {
    conn.query_row(
        &format!("{CAMPUS_SELECT} WHERE id = ?1"),
        params![id],
        campus_from_row,
    )
    .optional()
}

pub fn insert_campus(conn: &Connection, campus: &NewCampus) -> Result<i64, rusqlite::Error> {
    conn.execute(
        "INSERT INTO campuses (code, name, address, applications, status, deployment_date)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            campus.code,
            campus.name.trim(),
            campus.address,
            to_json_text(&campus.applications)?,
            campus.status,
            date_text(campus.deployment_date)
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_campus(conn: &Connection, id: i64, campus: &NewCampus) -> Result<usize, rusqlite::Error> {
    conn.execute(
        "UPDATE campuses SET code = ?1, name = ?2, address = ?3, applications = ?4, status = ?5,
                deployment_date = ?6
         WHERE id = ?7",
        params![
            campus.code,
            campus.name.trim(),
            campus.address,
            to_json_text(&campus.applications)?,
            campus.status,
            date_text(campus.deployment_date),
            id
        ],
    )
}

/// Deleting a campus cascades to its migrations, tickets, training and prints.
pub fn delete_campus(conn: &Connection, id: i64) -> Result<usize, rusqlite::Error> {
    delete_by_id(conn, "campuses", id)
}

// ── Sources / scopes / materials ───────────────────────────────────

/// The three lookup tables that hold nothing but a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedTable {
    Sources,
    Scopes,
    Materials,
}

impl NamedTable {
    pub fn table(&self) -> &'static str {
        match self {
            NamedTable::Sources => "sources",
            NamedTable::Scopes => "scopes",
            NamedTable::Materials => "materials",
        }
    }
}

pub fn list_named(conn: &Connection, table: NamedTable) -> Result<Vec<NamedRow>, rusqlite::Error> {
    let mut stmt = conn.prepare(&format!(
        "SELECT id, name FROM {} ORDER BY name",
        table.table()
    ))?;
    let rows = stmt.query_map([], |row| {
        Ok(NamedRow {
            id: row.get(0)?,
            name: row.get(1)?,
        })
    })?;
    rows.collect()
}

pub fn get_named(
    conn: &Connection,
    table: NamedTable,
    id: i64,
) -> Result<Option<NamedRow>, rusqlite::Error> {
    conn.query_row(
        &format!("SELECT id, name FROM {} WHERE id = ?1", table.table()),
        params![id],
        |row| {
            Ok(NamedRow {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        },
    )
    .optional()
}

pub fn insert_named(conn: &Connection, table: NamedTable, item: &NewNamed) -> Result<i64, rusqlite::Error> {
    conn.execute(
        &format!("INSERT INTO {} (name) VALUES (?1)", table.table()),
        params![item.name.trim()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_named(
    conn: &Connection,
    table: NamedTable,
    id: i64,
    item: &NewNamed,
) -> Result<usize, rusqlite::Error> {
    conn.execute(
        &format!("UPDATE {} SET name = ?1 WHERE id = ?2", table.table()),
        params![item.name.trim(), id],
    )
}

pub fn delete_named(conn: &Connection, table: NamedTable, id: i64) -> Result<usize, rusqlite::Error> {
    delete_by_id(conn, table.table(), id)
}

// ── Holidays ───────────────────────────────────────────────────────

fn holiday_from_row(row: &Row<'_>) -> Result<HolidayRow, rusqlite::Error> {
    let date = get_date(row, "date")?.ok_or_else(|| {
        rusqlite::Error::InvalidColumnType(1, "date".into(), Type::Text)
    })?;
    Ok(HolidayRow {
        id: row.get("id")?,
        date,
        name: row.get("name")?,
    })
}

pub fn list_holidays(conn: &Connection) -> Result<Vec<HolidayRow>, rusqlite::Error> {
    let mut stmt = conn.prepare("SELECT id, date, name FROM holidays ORDER BY date")?;
    let rows = stmt.query_map([], holiday_from_row)?;
    rows.collect()
}

pub fn get_holiday(conn: &Connection, id: i64) -> Result<Option<HolidayRow>, rusqlite::Error> {
    conn.query_row(
        "SELECT id, date, name FROM holidays WHERE id = ?1",
        params![id],
        holiday_from_row,
    )
    .optional()
}

pub fn insert_holiday(conn: &Connection, holiday: &NewHoliday) -> Result<i64, rusqlite::Error> {
    conn.execute(
        "INSERT INTO holidays (date, name) VALUES (?1, ?2)",
        params![format_date(&holiday.date), holiday.name.trim()],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_holiday(conn: &Connection, id: i64, holiday: &NewHoliday) -> Result<usize, rusqlite::Error> {
    conn.execute(
        "UPDATE holidays SET date = ?1, name = ?2 WHERE id = ?3",
        params![format_date(&holiday.date), holiday.name.trim(), id],
    )
}

pub fn delete_holiday(conn: &Connection, id: i64) -> Result<usize, rusqlite::Error> {
    delete_by_id(conn, "holidays", id)
}

// ── SLA ────────────────────────────────────────────────────────────

fn sla_from_row(row: &Row<'_>) -> Result<SlaRow, rusqlite::Error> {
    Ok(SlaRow {
        id: row.get("id")?,
        category: row.get("category")?,
        sla_type: row.get("type")?,
        duration: row.get("duration")?,
        unit: row.get("unit")?,
    })
}

pub fn list_slas(conn: &Connection) -> Result<Vec<SlaRow>, rusqlite::Error> {
    let mut stmt =
        conn.prepare("SELECT id, category, type, duration, unit FROM sla ORDER BY category, id")?;
    let rows = stmt.query_map([], sla_from_row)?;
    rows.collect()
}

pub fn get_sla(conn: &Connection, id: i64) -> Result<Option<SlaRow>, rusqlite::Error> {
    conn.query_row(
        "SELECT id, category, type, duration, unit FROM sla WHERE id = ?1",
        params![id],
        sla_from_row,
    )
    .optional()
}

pub fn insert_sla(conn: &Connection, sla: &NewSla) -> Result<i64, rusqlite::Error> {
    conn.execute(
        "INSERT INTO sla (category, type, duration, unit) VALUES (?1, ?2, ?3, ?4)",
        params![sla.category.trim(), sla.sla_type.trim(), sla.duration, sla.unit],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_sla(conn: &Connection, id: i64, sla: &NewSla) -> Result<usize, rusqlite::Error> {
    conn.execute(
        "UPDATE sla SET category = ?1, type = ?2, duration = ?3, unit = ?4 WHERE id = ?5",
        params![sla.category.trim(), sla.sla_type.trim(), sla.duration, sla.unit, id],
    )
}

pub fn delete_sla(conn: &Connection, id: i64) -> Result<usize, rusqlite::Error> {
    delete_by_id(conn, "sla", id)
}

// ── Print results ──────────────────────────────────────────────────

fn print_result_from_row(row: &Row<'_>) -> Result<PrintResultRow, rusqlite::Error> {
    Ok(PrintResultRow {
        id: row.get("id")?,
        name: row.get("name")?,
        portal: row.get("portal")?,
        created_at: row.get("created_at")?,
    })
}

pub fn list_print_results(conn: &Connection) -> Result<Vec<PrintResultRow>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT id, name, portal, created_at FROM print_results ORDER BY created_at DESC, id DESC",
    )?;
    let rows = stmt.query_map([], print_result_from_row)?;
    rows.collect()
}

pub fn get_print_result(conn: &Connection, id: i64) -> Result<Option<PrintResultRow>, rusqlite::Error> {
    conn.query_row(
        "SELECT id, name, portal, created_at FROM print_results WHERE id = ?1",
        params![id],
        print_result_from_row,
    )
    .optional()
}

pub fn insert_print_result(conn: &Connection, item: &NewPrintResult) -> Result<i64, rusqlite::Error> {
    conn.execute(
        "INSERT INTO print_results (name, portal) VALUES (?1, ?2)",
        params![item.name.trim(), item.portal],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_print_result(
    conn: &Connection,
    id: i64,
    item: &NewPrintResult,
) -> Result<usize, rusqlite::Error> {
    conn.execute(
        "UPDATE print_results SET name = ?1, portal = ?2 WHERE id = ?3",
        params![item.name.trim(), item.portal, id],
    )
}

pub fn delete_print_result(conn: &Connection, id: i64) -> Result<usize, rusqlite::Error> {
    delete_by_id(conn, "print_results", id)
}

// ── Training tickets ───────────────────────────────────────────────

const TRAINING_SELECT: &str = "
    SELECT t.*,
           c.name AS campus_name,
           a.name AS agent_name,
           m.name AS material_name
    FROM training_tickets t
    LEFT JOIN campuses c ON t.campus_id = c.id
    LEFT JOIN agents a ON t.trainer_id = a.id
    LEFT JOIN materials m ON t.material_id = m.id";

fn training_from_row(row: &Row<'_>) -> Result<TrainingTicketRow, rusqlite::Error> {
    Ok(TrainingTicketRow {
        id: row.get("id")?,
        date: get_date(row, "date")?,
        campus_id: row.get("campus_id")?,
        campus_name: row.get("campus_name")?,
        agent_id: row.get("trainer_id")?,
        agent_name: row.get("agent_name")?,
        material_id: row.get("material_id")?,
        material_name: row.get("material_name")?,
        method: row.get("method")?,
        status: row.get("status")?,
        minutes_link: row.get("minutes_link")?,
        date_closed: get_ts(row, "date_closed")?,
        created_at: get_ts(row, "created_at")?,
    })
}

pub fn list_training(conn: &Connection) -> Result<Vec<TrainingTicketRow>, rusqlite::Error> {
    let mut stmt = conn.prepare(&format!(
        "{TRAINING_SELECT} ORDER BY t.created_at DESC, t.id DESC"
    ))?;
    let rows = stmt.query_map([], training_from_row)?;
    rows.collect()
}

pub fn get_training(conn: &Connection, id: i64) -> Result<Option<TrainingTicketRow>, rusqlite::Error> {
    conn.query_row(
        &format!("{TRAINING_SELECT} WHERE t.id = ?1"),
        params![id],
        training_from_row,
    )
    .optional()
}

pub fn insert_training(
    conn: &Connection,
    ticket: &NewTrainingTicket,
    now: NaiveDateTime,
) -> Result<i64, rusqlite::Error> {
    let date_closed = closing_stamp(ticket.status.is_closed(), None, now);
    conn.execute(
        "INSERT INTO training_tickets
            (date, campus_id, trainer_id, material_id, method, status, minutes_link, date_closed, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            format_date(&ticket.date),
            ticket.campus_id,
            ticket.agent_id,
            ticket.material_id,
            ticket.method,
            ticket.status,
            ticket.minutes_link,
            ts_text(date_closed),
            format_timestamp(&now)
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_training(
    conn: &Connection,
    id: i64,
    ticket: &NewTrainingTicket,
    now: NaiveDateTime,
) -> Result<usize, rusqlite::Error> {
    let existing: Option<Option<String>> = conn
        .query_row(
            "SELECT date_closed FROM training_tickets WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )
        .optional()?;
    let Some(existing) = existing else {
        return Ok(0);
    };
    let date_closed = closing_stamp(
        ticket.status.is_closed(),
        existing.as_deref().and_then(parse_timestamp),
        now,
    );
    conn.execute(
        "UPDATE training_tickets SET date = ?1, campus_id = ?2, trainer_id = ?3, material_id = ?4,
                method = ?5, status = ?6, minutes_link = ?7, date_closed = ?8
         WHERE id = ?9",
        params![
            format_date(&ticket.date),
            ticket.campus_id,
            ticket.agent_id,
            ticket.material_id,
            ticket.method,
            ticket.status,
            ticket.minutes_link,
            ts_text(date_closed),
            id
        ],
    )
}

pub fn delete_training(conn: &Connection, id: i64) -> Result<usize, rusqlite::Error> {
    delete_by_id(conn, "training_tickets", id)
}

// ── Migrations ─────────────────────────────────────────────────────

/// Joined migration listing; filters append `WHERE`/`AND` clauses on the
/// `m`, `c`, `s`, `sp` and `v` aliases.
pub const MIGRATION_SELECT: &str = "
    SELECT m.*,
           c.name AS campus_name,
           s.type AS job_name, s.duration AS sla_duration, s.unit AS sla_unit,
           sp.name AS specialist_name,
           v.name AS verifier_name
    FROM migrations m
    JOIN campuses c ON m.campus_id = c.id
    LEFT JOIN sla s ON m.sla_id = s.id
    LEFT JOIN agents sp ON m.specialist_id = sp.id
    LEFT JOIN agents v ON m.verifier_id = v.id";

pub fn migration_from_row(row: &Row<'_>) -> Result<MigrationRow, rusqlite::Error> {
    let status: MigrationStatus = row.get("status")?;
    let deadline = get_date(row, "deadline")?;
    let completed_at = get_ts(row, "completed_at")?;
    Ok(MigrationRow {
        id: row.get("id")?,
        campus_id: row.get("campus_id")?,
        campus_name: row.get("campus_name")?,
        sla_id: row.get("sla_id")?,
        job_name: row.get("job_name")?,
        sla_duration: row.get("sla_duration")?,
        sla_unit: row.get("sla_unit")?,
        specialist_id: row.get("specialist_id")?,
        specialist_name: row.get("specialist_name")?,
        verifier_id: row.get("verifier_id")?,
        verifier_name: row.get("verifier_name")?,
        link_task: row.get("link_task")?,
        deadline,
        status,
        completed_at,
        migration_condition: row.get("migration_condition")?,
        created_at: get_ts(row, "created_at")?,
        updated_at: get_ts(row, "updated_at")?,
        performance: classify_migration_performance(status, deadline, completed_at),
        late_days: if status.is_terminal() {
            late_days(deadline, completed_at)
        } else {
            None
        },
    })
}

pub fn list_migrations(conn: &Connection) -> Result<Vec<MigrationRow>, rusqlite::Error> {
    let mut stmt = conn.prepare(&format!(
        "{MIGRATION_SELECT} ORDER BY m.created_at DESC, m.id DESC"
    ))?;
    let rows = stmt.query_map([], migration_from_row)?;
    rows.collect()
}

pub fn get_migration(conn: &Connection, id: i64) -> Result<Option<MigrationRow>, rusqlite::Error> {
    conn.query_row(
        &format!("{MIGRATION_SELECT} WHERE m.id = ?1"),
        params![id],
        migration_from_row,
    )
    .optional()
}

/// Deadline to store: the supplied one, else the stored one, else projected
/// from the SLA once the job has left the backlog.
fn resolve_deadline(
    conn: &Connection,
    item: &MigrationItem,
    stored: Option<NaiveDate>,
    now: NaiveDateTime,
) -> Result<Option<NaiveDate>, rusqlite::Error> {
    if let Some(deadline) = item.deadline.or(stored) {
        return Ok(Some(deadline));
    }
    if item.status == MigrationStatus::Backlog {
        return Ok(None);
    }
    let Some(sla_id) = item.sla_id else {
        return Ok(None);
    };
    let sla = conn
        .query_row(
            "SELECT duration, unit FROM sla WHERE id = ?1",
            params![sla_id],
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, SlaUnit>(1)?)),
        )
        .optional()?;
    Ok(sla.map(|(duration, unit)| project_deadline(now.date(), duration, unit)))
}

fn insert_migration_item(
    conn: &Connection,
    campus_id: i64,
    item: &MigrationItem,
    now: NaiveDateTime,
) -> Result<i64, rusqlite::Error> {
    let deadline = resolve_deadline(conn, item, None, now)?;
    let completed_at = closing_stamp(item.status.is_terminal(), None, now);
    let now_text = format_timestamp(&now);
    conn.execute(
        "INSERT INTO migrations
            (campus_id, sla_id, specialist_id, verifier_id, link_task, deadline, status,
             completed_at, migration_condition, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)",
        params![
            campus_id,
            item.sla_id,
            item.specialist_id,
            item.verifier_id,
            item.link_task,
            date_text(deadline),
            item.status,
            ts_text(completed_at),
            item.migration_condition,
            now_text
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn insert_migration(
    conn: &Connection,
    migration: &NewMigration,
    now: NaiveDateTime,
) -> Result<i64, rusqlite::Error> {
    insert_migration_item(conn, migration.campus_id, &migration.item, now)
}

/// Insert every item of the batch or none of them.
pub fn insert_migration_batch(
    conn: &mut Connection,
    batch: &MigrationBatch,
    now: NaiveDateTime,
) -> Result<Vec<i64>, rusqlite::Error> {
    let tx = conn.transaction()?;
    let ids = batch
        .items
        .iter()
        .map(|item| insert_migration_item(&tx, batch.campus_id, item, now))
        .collect::<Result<Vec<_>, _>>()?;
    tx.commit()?;
    Ok(ids)
}

pub fn update_migration(
    conn: &Connection,
    id: i64,
    migration: &NewMigration,
    now: NaiveDateTime,
) -> Result<usize, rusqlite::Error> {
    let existing: Option<(Option<String>, Option<String>)> = conn
        .query_row(
            "SELECT deadline, completed_at FROM migrations WHERE id = ?1",
            params![id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;
    let Some((stored_deadline, stored_completed)) = existing else {
        return Ok(0);
    };
    let item = &migration.item;
    let deadline = resolve_deadline(
        conn,
        item,
        stored_deadline.as_deref().and_then(parse_date),
        now,
    )?;
    let completed_at = closing_stamp(
        item.status.is_terminal(),
        stored_completed.as_deref().and_then(parse_timestamp),
        now,
    );
    conn.execute(
        "UPDATE migrations SET campus_id = ?1, sla_id = ?2, specialist_id = ?3, verifier_id = ?4,
                link_task = ?5, deadline = ?6, status = ?7, completed_at = ?8,
                migration_condition = ?9, updated_at = ?10
         WHERE id = ?11",
        params![
            migration.campus_id,
            item.sla_id,
            item.specialist_id,
            item.verifier_id,
            item.link_task,
            date_text(deadline),
            item.status,
            ts_text(completed_at),
            item.migration_condition,
            format_timestamp(&now),
            id
        ],
    )
}

pub fn delete_migration(conn: &Connection, id: i64) -> Result<usize, rusqlite::Error> {
    delete_by_id(conn, "migrations", id)
}

pub fn delete_campus_migrations(conn: &Connection, campus_id: i64) -> Result<usize, rusqlite::Error> {
    conn.execute("DELETE FROM migrations WHERE campus_id = ?1", params![campus_id])
}

// ── Customer-service tickets ───────────────────────────────────────

const TICKET_SELECT: &str = "
    SELECT t.*,
           c.name AS campus_name,
           s.name AS source_name,
           ag_ans.name AS answer_agent_name,
           ag_sol.name AS solved_agent_name
    FROM customer_service_tickets t
    LEFT JOIN campuses c ON t.campus_id = c.id
    LEFT JOIN sources s ON t.source_id = s.id
    LEFT JOIN agents ag_ans ON t.answer_agent_id = ag_ans.id
    LEFT JOIN agents ag_sol ON t.solved_agent_id = ag_sol.id";

fn ticket_from_row(row: &Row<'_>, frt_target: i64) -> Result<TicketRow, rusqlite::Error> {
    let status: TicketStatus = row.get("status")?;
    let created_at = get_ts(row, "created_at")?;
    let solved_at = get_ts(row, "solved_at")?;
    let frt: Option<i64> = row.get("frt")?;
    Ok(TicketRow {
        id: row.get("id")?,
        campus_id: row.get("campus_id")?,
        campus_name: row.get("campus_name")?,
        campus_pic: row.get("campus_pic")?,
        source_id: row.get("source_id")?,
        source_name: row.get("source_name")?,
        question: row.get("question")?,
        scope: row.get("scope")?,
        answer_agent_id: row.get("answer_agent_id")?,
        answer_agent_name: row.get("answer_agent_name")?,
        solved_agent_id: row.get("solved_agent_id")?,
        solved_agent_name: row.get("solved_agent_name")?,
        created_at,
        response_at: get_ts(row, "response_at")?,
        solved_at,
        status,
        bug_link: row.get("bug_link")?,
        working_hours: row.get("working_hours")?,
        frt,
        resolution: classify_resolution(status, created_at, solved_at).to_string(),
        frt_status: classify_frt_target(frt, frt_target).to_string(),
    })
}

pub fn list_tickets(conn: &Connection, frt_target: i64) -> Result<Vec<TicketRow>, rusqlite::Error> {
    let mut stmt = conn.prepare(&format!(
        "{TICKET_SELECT} ORDER BY t.created_at DESC, t.id DESC"
    ))?;
    let rows = stmt.query_map([], |row| ticket_from_row(row, frt_target))?;
    rows.collect()
}

pub fn get_ticket(
    conn: &Connection,
    id: i64,
    frt_target: i64,
) -> Result<Option<TicketRow>, rusqlite::Error> {
    conn.query_row(
        &format!("{TICKET_SELECT} WHERE t.id = ?1"),
        params![id],
        |row| ticket_from_row(row, frt_target),
    )
    .optional()
}

/// Ticket fields after server-side derivation.
struct DerivedTicket {
    created_at: NaiveDateTime,
    solved_at: Option<NaiveDateTime>,
    frt: Option<i64>,
    working_hours: &'static str,
}

fn derive_ticket(
    ticket: &NewTicket,
    existing: Option<(Option<NaiveDateTime>, Option<NaiveDateTime>)>,
    now: NaiveDateTime,
) -> DerivedTicket {
    let (prev_created, prev_solved) = existing.unwrap_or((None, None));
    let created_at = ticket.created_at.or(prev_created).unwrap_or(now);
    let solved_at = if ticket.status.is_solved() {
        ticket.solved_at.or(prev_solved).or(Some(now))
    } else {
        None
    };
    DerivedTicket {
        created_at,
        solved_at,
        frt: compute_frt(Some(created_at), ticket.response_at),
        working_hours: classify_working_hours(&created_at).label(),
    }
}

pub fn insert_ticket(
    conn: &Connection,
    ticket: &NewTicket,
    now: NaiveDateTime,
) -> Result<i64, rusqlite::Error> {
    let d = derive_ticket(ticket, None, now);
    conn.execute(
        "INSERT INTO customer_service_tickets
            (campus_id, campus_pic, source_id, question, scope, answer_agent_id, solved_agent_id,
             created_at, response_at, solved_at, status, bug_link, working_hours, frt)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            ticket.campus_id,
            ticket.campus_pic,
            ticket.source_id,
            ticket.question,
            ticket.scope,
            ticket.answer_agent_id,
            ticket.solved_agent_id,
            format_timestamp(&d.created_at),
            ts_text(ticket.response_at),
            ts_text(d.solved_at),
            ticket.status,
            ticket.bug_link,
            d.working_hours,
            d.frt
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_ticket(
    conn: &Connection,
    id: i64,
    ticket: &NewTicket,
    now: NaiveDateTime,
) -> Result<usize, rusqlite::Error> {
    let existing = conn
        .query_row(
            "SELECT created_at, solved_at FROM customer_service_tickets WHERE id = ?1",
            params![id],
            |row| Ok((get_ts(row, "created_at")?, get_ts(row, "solved_at")?)),
        )
        .optional()?;
    if existing.is_none() {
        return Ok(0);
    }
    let d = derive_ticket(ticket, existing, now);
    conn.execute(
        "UPDATE customer_service_tickets SET
            campus_id = ?1, campus_pic = ?2, source_id = ?3, question = ?4, scope = ?5,
            answer_agent_id = ?6, solved_agent_id = ?7, created_at = ?8, response_at = ?9,
            solved_at = ?10, status = ?11, bug_link = ?12, working_hours = ?13, frt = ?14
         WHERE id = ?15",
        params![
            ticket.campus_id,
            ticket.campus_pic,
            ticket.source_id,
            ticket.question,
            ticket.scope,
            ticket.answer_agent_id,
            ticket.solved_agent_id,
            format_timestamp(&d.created_at),
            ts_text(ticket.response_at),
            ts_text(d.solved_at),
            ticket.status,
            ticket.bug_link,
            d.working_hours,
            d.frt,
            id
        ],
    )
}

pub fn delete_ticket(conn: &Connection, id: i64) -> Result<usize, rusqlite::Error> {
    delete_by_id(conn, "customer_service_tickets", id)
}

// ── Implementation prints ──────────────────────────────────────────

const IMPL_PRINT_SELECT: &str = "
    SELECT ip.*, c.name AS campus_name
    FROM implementation_prints ip
    JOIN campuses c ON ip.campus_id = c.id";

fn impl_print_from_row(row: &Row<'_>) -> Result<ImplementationPrintRow, rusqlite::Error> {
    let items: Vec<ImplPrintItem> = from_json_text(row, "items")?;
    let completed = items
        .iter()
        .filter(|i| i.status == PrintItemStatus::Completed)
        .count();
    Ok(ImplementationPrintRow {
        id: row.get("id")?,
        campus_id: row.get("campus_id")?,
        campus_name: row.get("campus_name")?,
        progress: compute_progress_percent(completed as u64, items.len() as u64),
        items,
        created_at: get_ts(row, "created_at")?,
        updated_at: get_ts(row, "updated_at")?,
    })
}

pub fn list_impl_prints(conn: &Connection) -> Result<Vec<ImplementationPrintRow>, rusqlite::Error> {
    let mut stmt = conn.prepare(&format!(
        "{IMPL_PRINT_SELECT} ORDER BY ip.updated_at DESC, ip.id DESC"
    ))?;
    let rows = stmt.query_map([], impl_print_from_row)?;
    rows.collect()
}

pub fn get_impl_print(
    conn: &Connection,
    id: i64,
) -> Result<Option<ImplementationPrintRow>, rusqlite::Error> {
    conn.query_row(
        &format!("{IMPL_PRINT_SELECT} WHERE ip.id = ?1"),
        params![id],
        impl_print_from_row,
    )
    .optional()
}

pub fn insert_impl_print(
    conn: &Connection,
    print: &NewImplementationPrint,
    now: NaiveDateTime,
) -> Result<i64, rusqlite::Error> {
    let now_text = format_timestamp(&now);
    conn.execute(
        "INSERT INTO implementation_prints (campus_id, items, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?3)",
        params![print.campus_id, to_json_text(&print.items)?, now_text],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_impl_print(
    conn: &Connection,
    id: i64,
    print: &NewImplementationPrint,
    now: NaiveDateTime,
) -> Result<usize, rusqlite::Error> {
    conn.execute(
        "UPDATE implementation_prints SET campus_id = ?1, items = ?2, updated_at = ?3 WHERE id = ?4",
        params![
            print.campus_id,
            to_json_text(&print.items)?,
            format_timestamp(&now),
            id
        ],
    )
}

pub fn delete_impl_print(conn: &Connection, id: i64) -> Result<usize, rusqlite::Error> {
    delete_by_id(conn, "implementation_prints", id)
}

// ── App Config ─────────────────────────────────────────────────────

pub fn get_config(conn: &Connection, key: &str) -> Result<Option<String>, rusqlite::Error> {
    conn.query_row(
        "SELECT value FROM app_config WHERE key = ?1",
        params![key],
        |row| row.get(0),
    )
    .optional()
}

pub fn set_config(conn: &Connection, key: &str, value: &str) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT OR REPLACE INTO app_config (key, value, updated_at)
         VALUES (?1, ?2, datetime('now', 'localtime'))",
        params![key, value],
    )?;
    Ok(())
}

pub fn list_config(conn: &Connection) -> Result<Vec<(String, String)>, rusqlite::Error> {
    let mut stmt = conn.prepare("SELECT key, value FROM app_config ORDER BY key")?;
    let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
    rows.collect()
}

// ── Status ─────────────────────────────────────────────────────────

/// Row counts of every stored resource, in display order.
pub fn table_counts(conn: &Connection) -> Result<Vec<(&'static str, i64)>, rusqlite::Error> {
    const TABLES: &[&str] = &[
        "agents",
        "campuses",
        "sources",
        "scopes",
        "materials",
        "holidays",
        "sla",
        "training_tickets",
        "migrations",
        "customer_service_tickets",
        "print_results",
        "implementation_prints",
    ];
    TABLES
        .iter()
        .map(|table| {
            let count: i64 =
                conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))?;
            Ok::<_, rusqlite::Error>((*table, count))
        })
        .collect()
}
