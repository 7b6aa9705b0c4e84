//! Ratatui front-end over the catalog: a piece library, a per-piece slot view
//! and the forms that drive the catalog workflows.
mod app;
mod forms;
mod helpers;
mod screens;
mod terminal;

pub use app::App;
pub use terminal::run_app;
