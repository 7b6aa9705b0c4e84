use anyhow::Error;
use chrono::{DateTime, Local, Utc};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};

use crate::catalog::CatalogError;
use crate::models::PieceEntry;

/// Produce a rectangle centered within `area` that spans the requested percent
/// of the width and height. Used for modal dialogs.
pub(crate) fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(area);

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(horizontal[1]);

    vertical[1]
}

/// Pick the message to show in the status footer. Catalog errors are already
/// phrased for users; anything else shows its innermost cause.
pub(crate) fn surface_error(err: &Error) -> String {
    if let Some(catalog_err) = err.downcast_ref::<CatalogError>() {
        return catalog_err.to_string();
    }
    err.chain()
        .last()
        .map(|cause| cause.to_string())
        .unwrap_or_else(|| err.to_string())
}

/// Render a stored UTC timestamp in the local timezone.
pub(crate) fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

/// "3/4 parts" style progress summary for a piece card.
pub(crate) fn parts_summary(entry: &PieceEntry) -> String {
    let total = entry.slots.len();
    let uploaded = entry.uploaded_count();
    let noun = if total == 1 { "part" } else { "parts" };
    format!("{uploaded}/{total} {noun} uploaded")
}

/// Style the progress summary: green when complete, yellow otherwise.
pub(crate) fn parts_summary_line(entry: &PieceEntry) -> Line<'static> {
    let complete = entry.uploaded_count() == entry.slots.len();
    let style = if complete {
        Style::default().fg(Color::Green)
    } else {
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::ITALIC)
    };
    Line::from(Span::styled(parts_summary(entry), style))
}
