use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

use crate::models::Instrument;

/// Every instrument, alphabetically. Drives the instrument autocomplete.
pub fn fetch_instruments(conn: &Connection) -> Result<Vec<Instrument>> {
    let mut stmt = conn
        .prepare("SELECT id, name FROM instruments ORDER BY name COLLATE NOCASE")
        .context("failed to prepare instrument query")?;

    let instruments = stmt
        .query_map([], |row| {
            Ok(Instrument {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })
        .context("failed to load instruments")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect instruments")?;

    Ok(instruments)
}

/// A single instrument, or `None` for an unknown id.
pub fn fetch_instrument(conn: &Connection, id: i64) -> Result<Option<Instrument>> {
    conn.query_row(
        "SELECT id, name FROM instruments WHERE id = ?1",
        params![id],
        |row| {
            Ok(Instrument {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        },
    )
    .optional()
    .context("failed to load instrument")
}
