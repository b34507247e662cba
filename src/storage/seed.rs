use rusqlite::{params, Connection};

use crate::model::SlaUnit;

/// SLA rows a fresh store starts with: (category, type, duration, unit).
pub const DEFAULT_SLAS: &[(&str, &str, i64, SlaUnit)] = &[
    ("Customer Service", "Respon Awal", 15, SlaUnit::Menit),
    ("Customer Service", "Penyelesaian Ringan", 2, SlaUnit::Jam),
    ("Customer Service", "Penyelesaian Berat", 3, SlaUnit::Hari),
    ("Customer Service", "Eskalasi", 30, SlaUnit::Menit),
    ("Migrasi", "Deployment", 14, SlaUnit::Hari),
];

/// Insert the default SLA rows when the `sla` table is empty.
/// Returns the number of rows inserted.
pub fn ensure_default_slas(conn: &Connection) -> Result<usize, rusqlite::Error> {
    let existing: i64 = conn.query_row("SELECT COUNT(*) FROM sla", [], |row| row.get(0))?;
    if existing > 0 {
        return Ok(0);
    }
    let mut stmt = conn.prepare(
        "INSERT INTO sla (category, type, duration, unit) VALUES (?1, ?2, ?3, ?4)",
    )?;
    for (category, sla_type, duration, unit) in DEFAULT_SLAS {
        stmt.execute(params![category, sla_type, duration, unit])?;
    }
    Ok(DEFAULT_SLAS.len())
}
