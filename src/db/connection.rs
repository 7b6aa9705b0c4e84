use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{params, Connection};

/// Instruments available to every account. Seeded idempotently on each start
/// so new entries appear in existing databases too.
const DEFAULT_INSTRUMENTS: &[&str] = &[
    "Violin",
    "Viola",
    "Cello",
    "Double Bass",
    "Harp",
    "Piccolo",
    "Flute",
    "Oboe",
    "English Horn",
    "Clarinet",
    "Bass Clarinet",
    "Bassoon",
    "Contrabassoon",
    "Horn",
    "Trumpet",
    "Trombone",
    "Bass Trombone",
    "Tuba",
    "Timpani",
    "Percussion",
    "Piano",
    "Celesta",
];

/// Open (or create) the database file, run lazy migrations, and return a live
/// connection. Foreign keys are switched on for every connection because the
/// piece → slot → part cascade depends on them.
pub fn open_database(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create data directory")?;
    }

    let conn = Connection::open(path).context("failed to open SQLite database")?;
    migrate(&conn)?;
    Ok(conn)
}

/// Same schema as [`open_database`] but backed by memory. Used by tests and
/// throwaway sessions.
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
    migrate(&conn)?;
    Ok(conn)
}

fn migrate(conn: &Connection) -> Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])
        .context("failed to enable foreign keys")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS instruments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        )",
        [],
    )
    .context("failed to create instruments table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS music_pieces (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            account_id TEXT NOT NULL,
            title TEXT NOT NULL,
            composer TEXT,
            file_path TEXT NOT NULL,
            file_url TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        [],
    )
    .context("failed to create music_pieces table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS piece_instruments (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            piece_id INTEGER NOT NULL,
            instrument_id INTEGER NOT NULL,
            slot_label TEXT NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY(piece_id) REFERENCES music_pieces(id) ON DELETE CASCADE,
            FOREIGN KEY(instrument_id) REFERENCES instruments(id)
        )",
        [],
    )
    .context("failed to create piece_instruments table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS instrument_parts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            piece_instrument_id INTEGER NOT NULL,
            file_path TEXT NOT NULL UNIQUE,
            file_url TEXT NOT NULL,
            uploaded_at TEXT NOT NULL,
            FOREIGN KEY(piece_instrument_id) REFERENCES piece_instruments(id) ON DELETE CASCADE
        )",
        [],
    )
    .context("failed to create instrument_parts table")?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_music_pieces_account
            ON music_pieces(account_id, created_at)",
        [],
    )
    .context("failed to create music_pieces index")?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_piece_instruments_piece
            ON piece_instruments(piece_id)",
        [],
    )
    .context("failed to create piece_instruments index")?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_instrument_parts_slot
            ON instrument_parts(piece_instrument_id, uploaded_at)",
        [],
    )
    .context("failed to create instrument_parts index")?;

    for name in DEFAULT_INSTRUMENTS {
        conn.execute(
            "INSERT OR IGNORE INTO instruments (name) VALUES (?1)",
            params![name],
        )
        .with_context(|| format!("failed to seed instrument {name}"))?;
    }

    Ok(())
}
