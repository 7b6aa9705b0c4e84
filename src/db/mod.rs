//! Persistence module split across logical submodules, one per table.

mod connection;
mod instruments;
mod parts;
mod pieces;
mod slots;

pub use connection::{open_database, open_in_memory};
pub use instruments::{fetch_instrument, fetch_instruments};
pub use parts::{
    delete_part, fetch_latest_part, fetch_part, fetch_part_paths_for_piece,
    fetch_part_paths_for_slot, insert_part,
};
pub use pieces::{delete_piece, fetch_piece, fetch_pieces, insert_piece};
pub use slots::{delete_slot, fetch_slot, fetch_slots_for_piece, insert_slot};
