use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::models::Piece;

const PIECE_COLUMNS: &str = "id, account_id, title, composer, file_path, file_url, created_at";

fn piece_from_row(row: &Row<'_>) -> rusqlite::Result<Piece> {
    Ok(Piece {
        id: row.get(0)?,
        account_id: row.get(1)?,
        title: row.get(2)?,
        composer: row.get(3)?,
        file_path: row.get(4)?,
        file_url: row.get(5)?,
        created_at: row.get(6)?,
    })
}

/// Retrieve the account's pieces, newest first. Rows created within the same
/// clock tick fall back to insertion order.
pub fn fetch_pieces(conn: &Connection, account_id: &str) -> Result<Vec<Piece>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {PIECE_COLUMNS}
             FROM music_pieces
             WHERE account_id = ?1
             ORDER BY created_at DESC, id DESC"
        ))
        .context("failed to prepare piece query")?;

    let pieces = stmt
        .query_map(params![account_id], piece_from_row)
        .context("failed to load pieces")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect pieces")?;

    Ok(pieces)
}

/// Look up a single piece, scoped to the account. A piece owned by someone
/// else is reported as missing.
pub fn fetch_piece(conn: &Connection, account_id: &str, id: i64) -> Result<Option<Piece>> {
    conn.query_row(
        &format!("SELECT {PIECE_COLUMNS} FROM music_pieces WHERE id = ?1 AND account_id = ?2"),
        params![id, account_id],
        piece_from_row,
    )
    .optional()
    .context("failed to load piece")
}

/// Insert a piece row pointing at an already uploaded main score.
pub fn insert_piece(
    conn: &Connection,
    account_id: &str,
    title: &str,
    composer: Option<&str>,
    file_path: &str,
    file_url: &str,
) -> Result<Piece> {
    let created_at = Utc::now();
    conn.execute(
        "INSERT INTO music_pieces (account_id, title, composer, file_path, file_url, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![account_id, title, composer, file_path, file_url, created_at],
    )
    .context("failed to insert piece")?;

    Ok(Piece {
        id: conn.last_insert_rowid(),
        account_id: account_id.to_string(),
        title: title.to_string(),
        composer: composer.map(str::to_string),
        file_path: file_path.to_string(),
        file_url: file_url.to_string(),
        created_at,
    })
}

/// Remove a piece row. The schema cascades to `piece_instruments` and from
/// there to `instrument_parts`. Returns whether a row was deleted.
pub fn delete_piece(conn: &Connection, id: i64) -> Result<bool> {
    let deleted = conn
        .execute("DELETE FROM music_pieces WHERE id = ?1", params![id])
        .context("failed to delete piece")?;
    Ok(deleted > 0)
}
