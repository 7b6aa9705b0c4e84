use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::models::Part;

const PART_COLUMNS: &str = "id, piece_instrument_id, file_path, file_url, uploaded_at";

fn part_from_row(row: &Row<'_>) -> rusqlite::Result<Part> {
    Ok(Part {
        id: row.get(0)?,
        slot_id: row.get(1)?,
        file_path: row.get(2)?,
        file_url: row.get(3)?,
        uploaded_at: row.get(4)?,
    })
}

/// The newest part of a slot, by insertion order. Older uploads stay in the
/// table but are never shown.
pub fn fetch_latest_part(conn: &Connection, slot_id: i64) -> Result<Option<Part>> {
    conn.query_row(
        &format!(
            "SELECT {PART_COLUMNS}
             FROM instrument_parts
             WHERE piece_instrument_id = ?1
             ORDER BY id DESC
             LIMIT 1"
        ),
        params![slot_id],
        part_from_row,
    )
    .optional()
    .context("failed to load latest part")
}

/// A part by id, regardless of account. Callers check ownership through the
/// slot.
pub fn fetch_part(conn: &Connection, id: i64) -> Result<Option<Part>> {
    conn.query_row(
        &format!("SELECT {PART_COLUMNS} FROM instrument_parts WHERE id = ?1"),
        params![id],
        part_from_row,
    )
    .optional()
    .context("failed to load part")
}

/// Record an uploaded part for a slot, stamped with the current time.
pub fn insert_part(conn: &Connection, slot_id: i64, file_path: &str, file_url: &str) -> Result<Part> {
    let uploaded_at = Utc::now();
    conn.execute(
        "INSERT INTO instrument_parts (piece_instrument_id, file_path, file_url, uploaded_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![slot_id, file_path, file_url, uploaded_at],
    )
    .context("failed to insert part")?;

    Ok(Part {
        id: conn.last_insert_rowid(),
        slot_id,
        file_path: file_path.to_string(),
        file_url: file_url.to_string(),
        uploaded_at,
    })
}

/// Remove one part row. `false` when no row matched.
pub fn delete_part(conn: &Connection, id: i64) -> Result<bool> {
    let deleted = conn
        .execute("DELETE FROM instrument_parts WHERE id = ?1", params![id])
        .context("failed to delete part")?;
    Ok(deleted > 0)
}

/// Object keys of every part stored for a slot, including superseded ones.
pub fn fetch_part_paths_for_slot(conn: &Connection, slot_id: i64) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT file_path FROM instrument_parts WHERE piece_instrument_id = ?1")
        .context("failed to prepare slot part paths query")?;

    let paths = stmt
        .query_map(params![slot_id], |row| row.get(0))
        .context("failed to load slot part paths")?
        .collect::<Result<Vec<String>, _>>()
        .context("failed to collect slot part paths")?;

    Ok(paths)
}

/// Object keys of every part stored under any slot of a piece. Read before a
/// piece is deleted so the cascade does not orphan the files.
pub fn fetch_part_paths_for_piece(conn: &Connection, piece_id: i64) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare(
            "SELECT ip.file_path
             FROM instrument_parts ip
             INNER JOIN piece_instruments pi ON pi.id = ip.piece_instrument_id
             WHERE pi.piece_id = ?1",
        )
        .context("failed to prepare piece part paths query")?;

    let paths = stmt
        .query_map(params![piece_id], |row| row.get(0))
        .context("failed to load piece part paths")?
        .collect::<Result<Vec<String>, _>>()
        .context("failed to collect piece part paths")?;

    Ok(paths)
}
