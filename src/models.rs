//! Domain models that mirror the SQLite schema and get passed between the
//! catalog service and the TUI. They stay plain data holders; the catalog owns
//! the rules about how they relate to each other.

use std::fmt;

use chrono::{DateTime, Utc};

/// A playable instrument type ("Violin", "Cello"). Reference data seeded by
/// the schema migration and never edited by the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instrument {
    pub id: i64,
    pub name: String,
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A musical work with its main score file.
#[derive(Debug, Clone, PartialEq)]
pub struct Piece {
    /// Primary key from the `music_pieces` table.
    pub id: i64,
    /// Account the piece belongs to. Every catalog query filters on it.
    pub account_id: String,
    pub title: String,
    /// Optional composer, `None` when the form left it blank.
    pub composer: Option<String>,
    /// Object-store key of the main score.
    pub file_path: String,
    /// Public URL derived from `file_path`.
    pub file_url: String,
    pub created_at: DateTime<Utc>,
}

impl Piece {
    /// Compose a `Title - Composer` string that omits the hyphen when the
    /// composer is unknown.
    pub fn display_title(&self) -> String {
        match self.composer.as_deref().map(str::trim) {
            Some(composer) if !composer.is_empty() => format!("{} - {}", self.title, composer),
            _ => self.title.clone(),
        }
    }
}

/// One named role inside a piece, e.g. "First Violin" played on a Violin.
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentSlot {
    pub id: i64,
    pub piece_id: i64,
    pub instrument_id: i64,
    /// Joined from `instruments.name` when the slot is loaded.
    pub instrument_name: String,
    pub slot_label: String,
    pub created_at: DateTime<Utc>,
}

/// An uploaded document filling an instrument slot.
#[derive(Debug, Clone, PartialEq)]
pub struct Part {
    pub id: i64,
    pub slot_id: i64,
    pub file_path: String,
    pub file_url: String,
    pub uploaded_at: DateTime<Utc>,
}

/// A slot paired with its authoritative (newest) part, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotEntry {
    pub slot: InstrumentSlot,
    pub part: Option<Part>,
}

impl SlotEntry {
    pub fn is_uploaded(&self) -> bool {
        self.part.is_some()
    }
}

/// A piece with its slots, as rendered by the catalog views.
#[derive(Debug, Clone, PartialEq)]
pub struct PieceEntry {
    pub piece: Piece,
    pub slots: Vec<SlotEntry>,
}

impl PieceEntry {
    /// Number of slots that currently have an uploaded part.
    pub fn uploaded_count(&self) -> usize {
        self.slots.iter().filter(|entry| entry.is_uploaded()).count()
    }
}

/// A file picked by the user, ready to be sent to the object store.
#[derive(Debug, Clone)]
pub struct Upload {
    /// Original file name, used for the extension check.
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }
}

/// One slot requested while creating a piece.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotRequest {
    pub instrument_id: i64,
    /// Free text; a blank label falls back to the instrument name.
    pub slot_label: String,
}

/// Input for [`crate::catalog::Catalog::create_piece`].
#[derive(Debug, Clone)]
pub struct NewPiece {
    pub title: String,
    pub composer: Option<String>,
    pub slots: Vec<SlotRequest>,
    pub file: Upload,
}
