use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::models::{Instrument, InstrumentSlot};

fn slot_from_row(row: &Row<'_>) -> rusqlite::Result<InstrumentSlot> {
    Ok(InstrumentSlot {
        id: row.get(0)?,
        piece_id: row.get(1)?,
        instrument_id: row.get(2)?,
        instrument_name: row.get(3)?,
        slot_label: row.get(4)?,
        created_at: row.get(5)?,
    })
}

/// Slots of a piece joined with their instrument names, ordered by label so
/// "First Violin" sits above "Second Violin".
pub fn fetch_slots_for_piece(conn: &Connection, piece_id: i64) -> Result<Vec<InstrumentSlot>> {
    let mut stmt = conn
        .prepare(
            "SELECT pi.id, pi.piece_id, pi.instrument_id, i.name, pi.slot_label, pi.created_at
             FROM piece_instruments pi
             INNER JOIN instruments i ON i.id = pi.instrument_id
             WHERE pi.piece_id = ?1
             ORDER BY pi.slot_label COLLATE NOCASE, pi.id",
        )
        .context("failed to prepare slot query")?;

    let slots = stmt
        .query_map(params![piece_id], slot_from_row)
        .context("failed to load slots")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect slots")?;

    Ok(slots)
}

/// Look up a slot whose piece belongs to the given account.
pub fn fetch_slot(conn: &Connection, account_id: &str, id: i64) -> Result<Option<InstrumentSlot>> {
    conn.query_row(
        "SELECT pi.id, pi.piece_id, pi.instrument_id, i.name, pi.slot_label, pi.created_at
         FROM piece_instruments pi
         INNER JOIN instruments i ON i.id = pi.instrument_id
         INNER JOIN music_pieces p ON p.id = pi.piece_id
         WHERE pi.id = ?1 AND p.account_id = ?2",
        params![id, account_id],
        slot_from_row,
    )
    .optional()
    .context("failed to load slot")
}

/// Add a slot to a piece. The label is stored as given; defaulting to the
/// instrument name happens in the catalog.
pub fn insert_slot(
    conn: &Connection,
    piece_id: i64,
    instrument: &Instrument,
    slot_label: &str,
) -> Result<InstrumentSlot> {
    let created_at = Utc::now();
    conn.execute(
        "INSERT INTO piece_instruments (piece_id, instrument_id, slot_label, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![piece_id, instrument.id, slot_label, created_at],
    )
    .context("failed to insert instrument slot")?;

    Ok(InstrumentSlot {
        id: conn.last_insert_rowid(),
        piece_id,
        instrument_id: instrument.id,
        instrument_name: instrument.name.clone(),
        slot_label: slot_label.to_string(),
        created_at,
    })
}

/// Remove a slot row; its parts go with it through the cascade.
pub fn delete_slot(conn: &Connection, id: i64) -> Result<bool> {
    let deleted = conn
        .execute("DELETE FROM piece_instruments WHERE id = ?1", params![id])
        .context("failed to delete instrument slot")?;
    Ok(deleted > 0)
}
