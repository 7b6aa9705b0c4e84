//! Core library surface for the orchestra sheet-music manager.
//!
//! The catalog service is usable on its own (for scripts or other front-ends);
//! the `bin` target wires it to a local bucket and the terminal UI.
pub mod catalog;
pub mod config;
pub mod db;
pub mod logging;
pub mod models;
pub mod storage;
pub mod ui;

pub use catalog::{Catalog, CatalogError, CatalogResult, Session};
pub use config::{AppConfig, CliArgs};
pub use db::{open_database, open_in_memory};
pub use logging::init_logging;
pub use models::{
    Instrument, InstrumentSlot, NewPiece, Part, Piece, PieceEntry, SlotEntry, SlotRequest, Upload,
};
pub use storage::{LocalBucket, ObjectStore, StorageError};

/// The interactive application entry point and state container.
pub use ui::{run_app, App};
