use std::cmp::min;
use std::mem;

use anyhow::Result;
use crossterm::event::KeyCode;
use open::that as open_link;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::prelude::*;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Frame;
use tracing::debug;

use crate::catalog::{Catalog, Session};
use crate::models::{Instrument, InstrumentSlot, NewPiece, PieceEntry, SlotEntry};
use crate::storage::{LocalBucket, ObjectStore};

use super::forms::{
    read_upload, ConfirmPartDelete, ConfirmPieceDelete, PartForm, PieceField, PieceForm,
    SlotField, SlotForm,
};
use super::helpers::{centered_rect, format_timestamp, parts_summary_line, surface_error};
use super::screens::{PieceScreen, PiecesScreen};

/// Footer space reserved for status messages and instructions.
const FOOTER_HEIGHT: u16 = 3;
/// Height of a piece card in the library list.
const PIECE_CARD_HEIGHT: u16 = 6;
/// Height of a slot card on the piece screen.
const SLOT_CARD_HEIGHT: u16 = 5;
/// Height of the title block above the slot cards.
const PIECE_HEADER_HEIGHT: u16 = 4;

/// Which top-level view is showing.
enum Screen {
    Pieces,
    Piece(PieceScreen),
}

/// Modal state layered over the current screen.
enum Mode {
    Normal,
    CreatingPiece(PieceForm),
    AddingSlot { piece_id: i64, form: SlotForm },
    UploadingPart { slot: InstrumentSlot, form: PartForm },
    ConfirmPieceDelete(ConfirmPieceDelete),
    ConfirmPartDelete(ConfirmPartDelete),
    Searching(SearchState),
}

/// Inline search over the piece library.
struct SearchState {
    query: String,
}

/// Holds the footer message text plus its severity.
struct StatusMessage {
    text: String,
    kind: StatusKind,
}

/// Severity levels shown in the footer.
enum StatusKind {
    Info,
    Error,
}

impl StatusKind {
    fn style(&self) -> Style {
        match self {
            StatusKind::Info => Style::default().fg(Color::Green),
            StatusKind::Error => Style::default().fg(Color::Red),
        }
    }
}

/// Central application state shared across the TUI.
pub struct App<S = LocalBucket> {
    catalog: Catalog<S>,
    session: Session,
    instruments: Vec<Instrument>,
    pieces: PiecesScreen,
    screen: Screen,
    mode: Mode,
    status: Option<StatusMessage>,
}

impl<S: ObjectStore> App<S> {
    /// Load the instrument catalog and the signed-in account's pieces.
    pub fn new(catalog: Catalog<S>, session: Session) -> Result<Self> {
        let instruments = catalog.list_instruments()?;
        let entries = catalog.list_pieces(&session)?;
        debug!(
            instruments = instruments.len(),
            pieces = entries.len(),
            "loaded catalog"
        );
        Ok(Self {
            catalog,
            session,
            instruments,
            pieces: PiecesScreen::new(entries),
            screen: Screen::Pieces,
            mode: Mode::Normal,
            status: None,
        })
    }

    pub fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        let mut exit = false;
        let mut mode = mem::replace(&mut self.mode, Mode::Normal);

        mode = match mode {
            Mode::Normal => {
                if matches!(self.screen, Screen::Pieces) {
                    self.handle_pieces_key(code, &mut exit)?
                } else {
                    self.handle_piece_key(code, &mut exit)?
                }
            }
            Mode::CreatingPiece(form) => self.handle_create_piece(code, form)?,
            Mode::AddingSlot { piece_id, form } => self.handle_add_slot(code, piece_id, form)?,
            Mode::UploadingPart { slot, form } => self.handle_upload_part(code, slot, form)?,
            Mode::ConfirmPieceDelete(confirm) => self.handle_confirm_piece_delete(code, confirm)?,
            Mode::ConfirmPartDelete(confirm) => self.handle_confirm_part_delete(code, confirm)?,
            Mode::Searching(state) => self.handle_search(code, state)?,
        };

        self.mode = mode;
        Ok(exit)
    }

    /// Toggle the "incomplete pieces only" filter on the library screen.
    pub(crate) fn handle_ctrl_l(&mut self) -> Result<()> {
        if matches!(self.screen, Screen::Pieces) {
            let message = if self.pieces.toggle_show_incomplete() {
                "Showing pieces with missing parts."
            } else {
                "Showing all pieces."
            };
            self.set_status(message, StatusKind::Info);
        }
        Ok(())
    }

    fn handle_pieces_key(&mut self, code: KeyCode, exit: &mut bool) -> Result<Mode> {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => *exit = true,
            KeyCode::Up => self.pieces.move_selection(-1),
            KeyCode::Down => self.pieces.move_selection(1),
            KeyCode::PageUp => self.pieces.move_selection(-5),
            KeyCode::PageDown => self.pieces.move_selection(5),
            KeyCode::Home => self.pieces.select_first(),
            KeyCode::End => self.pieces.select_last(),
            KeyCode::Enter => match self.pieces.current().cloned() {
                Some(entry) => {
                    self.clear_status();
                    self.screen = Screen::Piece(PieceScreen::new(entry));
                }
                None => self.set_status("No piece selected.", StatusKind::Error),
            },
            KeyCode::Char('o') => {
                if let Some(entry) = self.pieces.current().cloned() {
                    self.open_url(&entry.piece.file_url, &entry.piece.display_title());
                }
            }
            KeyCode::Char('+') => {
                self.clear_status();
                return Ok(Mode::CreatingPiece(PieceForm::default()));
            }
            KeyCode::Char('-') => match self.pieces.current().cloned() {
                Some(entry) => {
                    let confirm = ConfirmPieceDelete {
                        piece: entry.piece,
                        slot_count: entry.slots.len(),
                    };
                    self.clear_status();
                    return Ok(Mode::ConfirmPieceDelete(confirm));
                }
                None => self.set_status("No piece selected to delete.", StatusKind::Error),
            },
            KeyCode::Char('f') => {
                let query = self.pieces.filter.clone().unwrap_or_default();
                return Ok(Mode::Searching(SearchState { query }));
            }
            KeyCode::Char('r') => self.refresh(),
            _ => {}
        }
        Ok(Mode::Normal)
    }

    fn handle_piece_key(&mut self, code: KeyCode, exit: &mut bool) -> Result<Mode> {
        let Screen::Piece(piece) = &mut self.screen else {
            return Ok(Mode::Normal);
        };

        match code {
            KeyCode::Char('q') => *exit = true,
            KeyCode::Esc => {
                let piece_id = piece.piece_id();
                self.screen = Screen::Pieces;
                self.pieces.focus(piece_id);
                self.clear_status();
            }
            KeyCode::Up => piece.move_selection(-1),
            KeyCode::Down => piece.move_selection(1),
            KeyCode::PageUp => piece.move_selection(-5),
            KeyCode::PageDown => piece.move_selection(5),
            KeyCode::Home => piece.select_first(),
            KeyCode::End => piece.select_last(),
            KeyCode::Enter | KeyCode::Char('o') => match piece.current_slot().cloned() {
                Some(SlotEntry {
                    slot,
                    part: Some(part),
                }) => self.open_url(&part.file_url, &slot.slot_label),
                Some(SlotEntry { slot, part: None }) => self.set_status(
                    format!("No part uploaded for {} yet.", slot.slot_label),
                    StatusKind::Error,
                ),
                None => self.set_status("No slot selected.", StatusKind::Error),
            },
            KeyCode::Char('+') => {
                let piece_id = piece.piece_id();
                self.clear_status();
                return Ok(Mode::AddingSlot {
                    piece_id,
                    form: SlotForm::default(),
                });
            }
            KeyCode::Char('u') => match piece.current_slot().map(|entry| entry.slot.clone()) {
                Some(slot) => {
                    self.clear_status();
                    return Ok(Mode::UploadingPart {
                        slot,
                        form: PartForm::default(),
                    });
                }
                None => self.set_status("No slot selected.", StatusKind::Error),
            },
            KeyCode::Char('-') => match piece.current_slot().cloned() {
                Some(SlotEntry {
                    slot,
                    part: Some(part),
                }) => {
                    self.clear_status();
                    return Ok(Mode::ConfirmPartDelete(ConfirmPartDelete { slot, part }));
                }
                Some(SlotEntry { slot, part: None }) => self.set_status(
                    format!("{} has no uploaded part to delete.", slot.slot_label),
                    StatusKind::Error,
                ),
                None => self.set_status("No slot selected.", StatusKind::Error),
            },
            KeyCode::Char('r') => self.refresh(),
            _ => {}
        }
        Ok(Mode::Normal)
    }

    fn handle_create_piece(&mut self, code: KeyCode, mut form: PieceForm) -> Result<Mode> {
        let mut keep_open = true;
        match code {
            KeyCode::Esc => {
                if !form.instrument.cancel_autocomplete() {
                    self.set_status("New piece cancelled.", StatusKind::Info);
                    keep_open = false;
                }
            }
            KeyCode::Tab => {
                let consumed =
                    form.active == PieceField::Instrument && form.instrument.accept_suggestion();
                if !consumed {
                    form.toggle_field();
                }
            }
            KeyCode::BackTab => form.previous_field(),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Delete => {
                if let Some(staged) = form.unstage_last_slot() {
                    self.set_status(format!("Removed {}.", staged.display()), StatusKind::Info);
                }
            }
            KeyCode::Enter if form.on_slot_fields() => match form.stage_slot(&self.instruments) {
                Ok(staged) => {
                    form.error = None;
                    self.set_status(format!("Staged {}.", staged.display()), StatusKind::Info);
                }
                Err(err) => {
                    let message = surface_error(&err);
                    form.error = Some(message.clone());
                    self.set_status(message, StatusKind::Error);
                }
            },
            KeyCode::Enter => match self.save_new_piece(&mut form) {
                Ok(_) => keep_open = false,
                Err(err) => {
                    let message = surface_error(&err);
                    form.error = Some(message.clone());
                    self.set_status(message, StatusKind::Error);
                }
            },
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            _ => {}
        }

        if !keep_open {
            return Ok(Mode::Normal);
        }
        if form.active == PieceField::Instrument {
            form.instrument.update_suggestion(&self.instruments);
        }
        Ok(Mode::CreatingPiece(form))
    }

    fn handle_add_slot(&mut self, code: KeyCode, piece_id: i64, mut form: SlotForm) -> Result<Mode> {
        let mut keep_open = true;
        match code {
            KeyCode::Esc => {
                if !form.instrument.cancel_autocomplete() {
                    self.set_status("Add slot cancelled.", StatusKind::Info);
                    keep_open = false;
                }
            }
            KeyCode::Tab => {
                let consumed =
                    form.active == SlotField::Instrument && form.instrument.accept_suggestion();
                if !consumed {
                    form.toggle_field();
                }
            }
            KeyCode::BackTab => form.previous_field(),
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter => match self.save_new_slot(piece_id, &form) {
                Ok(_) => keep_open = false,
                Err(err) => {
                    let message = surface_error(&err);
                    form.error = Some(message.clone());
                    self.set_status(message, StatusKind::Error);
                }
            },
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            _ => {}
        }

        if !keep_open {
            return Ok(Mode::Normal);
        }
        if form.active == SlotField::Instrument {
            form.instrument.update_suggestion(&self.instruments);
        }
        Ok(Mode::AddingSlot { piece_id, form })
    }

    fn handle_upload_part(
        &mut self,
        code: KeyCode,
        slot: InstrumentSlot,
        mut form: PartForm,
    ) -> Result<Mode> {
        match code {
            KeyCode::Esc => {
                self.set_status("Upload cancelled.", StatusKind::Info);
                return Ok(Mode::Normal);
            }
            KeyCode::Backspace => form.backspace(),
            KeyCode::Enter => match self.save_part(&slot, &form) {
                Ok(_) => return Ok(Mode::Normal),
                Err(err) => {
                    let message = surface_error(&err);
                    form.error = Some(message.clone());
                    self.set_status(message, StatusKind::Error);
                }
            },
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            _ => {}
        }
        Ok(Mode::UploadingPart { slot, form })
    }

    fn handle_confirm_piece_delete(
        &mut self,
        code: KeyCode,
        confirm: ConfirmPieceDelete,
    ) -> Result<Mode> {
        match code {
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {
                self.set_status("Deletion cancelled.", StatusKind::Info);
                Ok(Mode::Normal)
            }
            KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y') => {
                match self.perform_piece_delete(&confirm) {
                    Ok(_) => Ok(Mode::Normal),
                    Err(err) => {
                        let message = surface_error(&err);
                        self.set_status(message, StatusKind::Error);
                        Ok(Mode::ConfirmPieceDelete(confirm))
                    }
                }
            }
            _ => Ok(Mode::ConfirmPieceDelete(confirm)),
        }
    }

    fn handle_confirm_part_delete(
        &mut self,
        code: KeyCode,
        confirm: ConfirmPartDelete,
    ) -> Result<Mode> {
        match code {
            KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('N') => {
                self.set_status("Deletion cancelled.", StatusKind::Info);
                Ok(Mode::Normal)
            }
            KeyCode::Enter | KeyCode::Char('y') | KeyCode::Char('Y') => {
                match self.perform_part_delete(&confirm) {
                    Ok(_) => Ok(Mode::Normal),
                    Err(err) => {
                        let message = surface_error(&err);
                        self.set_status(message, StatusKind::Error);
                        Ok(Mode::ConfirmPartDelete(confirm))
                    }
                }
            }
            _ => Ok(Mode::ConfirmPartDelete(confirm)),
        }
    }

    fn handle_search(&mut self, code: KeyCode, mut state: SearchState) -> Result<Mode> {
        match code {
            KeyCode::Esc => {
                self.pieces.set_filter(None);
                return Ok(Mode::Normal);
            }
            KeyCode::Up => self.pieces.move_selection(-1),
            KeyCode::Down => self.pieces.move_selection(1),
            KeyCode::PageUp => self.pieces.move_selection(-5),
            KeyCode::PageDown => self.pieces.move_selection(5),
            KeyCode::Home => self.pieces.select_first(),
            KeyCode::End => self.pieces.select_last(),
            KeyCode::Enter => {
                if let Some(entry) = self.pieces.current().cloned() {
                    self.screen = Screen::Piece(PieceScreen::new(entry));
                }
                return Ok(Mode::Normal);
            }
            KeyCode::Backspace => {
                state.query.pop();
                self.pieces.set_filter(Some(state.query.clone()));
            }
            KeyCode::Char(ch) if !ch.is_control() => {
                state.query.push(ch);
                self.pieces.set_filter(Some(state.query.clone()));
            }
            _ => {}
        }
        Ok(Mode::Searching(state))
    }

    fn save_new_piece(&mut self, form: &mut PieceForm) -> Result<()> {
        let inputs = form.parse_inputs(&self.instruments)?;
        let file = read_upload(&inputs.file_path)?;
        let piece = self.catalog.create_piece(
            &self.session,
            NewPiece {
                title: inputs.title,
                composer: inputs.composer,
                slots: inputs.slots,
                file,
            },
        )?;
        self.reload(Some(piece.id), None)?;
        self.set_status(
            format!("Created {}.", piece.display_title()),
            StatusKind::Info,
        );
        Ok(())
    }

    fn save_new_slot(&mut self, piece_id: i64, form: &SlotForm) -> Result<()> {
        let (instrument, label, file_path) = form.parse_inputs(&self.instruments)?;
        let file = read_upload(&file_path)?;
        let (slot, _part) = self.catalog.add_slot_with_part(
            &self.session,
            piece_id,
            instrument.id,
            &label,
            file,
        )?;
        self.reload(Some(piece_id), Some(slot.id))?;
        self.set_status(
            format!("Added {} with its part.", slot.slot_label),
            StatusKind::Info,
        );
        Ok(())
    }

    fn save_part(&mut self, slot: &InstrumentSlot, form: &PartForm) -> Result<()> {
        let file = read_upload(&form.file)?;
        self.catalog.upload_part_for_slot(&self.session, slot.id, file)?;
        self.reload(Some(slot.piece_id), Some(slot.id))?;
        self.set_status(
            format!("Uploaded a new part for {}.", slot.slot_label),
            StatusKind::Info,
        );
        Ok(())
    }

    fn perform_piece_delete(&mut self, confirm: &ConfirmPieceDelete) -> Result<()> {
        let piece = &confirm.piece;
        self.catalog
            .delete_piece(&self.session, piece.id, &piece.file_path)?;
        self.reload(None, None)?;
        self.set_status(
            format!("Deleted {}.", piece.display_title()),
            StatusKind::Info,
        );
        Ok(())
    }

    fn perform_part_delete(&mut self, confirm: &ConfirmPartDelete) -> Result<()> {
        self.catalog.delete_part(
            &self.session,
            confirm.part.id,
            confirm.slot.id,
            &confirm.part.file_path,
        )?;
        self.reload(Some(confirm.slot.piece_id), None)?;
        self.set_status(
            format!("Deleted {} and its part.", confirm.slot.slot_label),
            StatusKind::Info,
        );
        Ok(())
    }

    /// Refetch everything after a write. The open piece screen follows its
    /// piece, or falls back to the library when the piece is gone.
    fn reload(&mut self, focus_piece: Option<i64>, focus_slot: Option<i64>) -> Result<()> {
        let entries = self.catalog.list_pieces(&self.session)?;
        self.pieces.set_entries(entries, focus_piece);

        let open_piece = match &self.screen {
            Screen::Piece(piece) => Some(piece.piece_id()),
            Screen::Pieces => None,
        };
        if let Some(piece_id) = open_piece {
            match self.pieces.find(piece_id).cloned() {
                Some(entry) => {
                    if let Screen::Piece(piece) = &mut self.screen {
                        piece.set_entry(entry, focus_slot);
                    }
                }
                None => self.screen = Screen::Pieces,
            }
        }
        Ok(())
    }

    fn refresh(&mut self) {
        let focus = self.pieces.current().map(|entry| entry.piece.id);
        match self.reload(focus, None) {
            Ok(()) => self.set_status("Refreshed.", StatusKind::Info),
            Err(err) => self.set_status(surface_error(&err), StatusKind::Error),
        }
    }

    fn open_url(&mut self, url: &str, what: &str) {
        match open_link(url) {
            Ok(()) => self.set_status(format!("Opened {what}."), StatusKind::Info),
            Err(err) => self.set_status(format!("Failed to open {url}: {err}"), StatusKind::Error),
        }
    }

    fn set_status<T: Into<String>>(&mut self, text: T, kind: StatusKind) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind,
        });
    }

    fn clear_status(&mut self) {
        self.status = None;
    }

    pub(crate) fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let footer_height = FOOTER_HEIGHT.min(area.height);

        let (content_area, footer_area) = if area.height > footer_height {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(0), Constraint::Length(footer_height)])
                .split(area);
            (chunks[0], chunks[1])
        } else {
            (area, area)
        };

        match &self.screen {
            Screen::Pieces => self.draw_pieces(frame, content_area),
            Screen::Piece(piece) => self.draw_piece(frame, content_area, piece),
        }

        if area.height >= footer_height {
            self.draw_footer(frame, footer_area);
        }

        match &self.mode {
            Mode::CreatingPiece(form) => self.draw_piece_form(frame, area, form),
            Mode::AddingSlot { form, .. } => self.draw_slot_form(frame, area, form),
            Mode::UploadingPart { slot, form } => self.draw_part_form(frame, area, slot, form),
            Mode::ConfirmPieceDelete(confirm) => self.draw_confirm_piece(frame, area, confirm),
            Mode::ConfirmPartDelete(confirm) => self.draw_confirm_part(frame, area, confirm),
            Mode::Searching(state) => self.draw_search_bar(frame, area, state),
            Mode::Normal => {}
        }
    }

    fn draw_pieces(&self, frame: &mut Frame, area: Rect) {
        let mut title = format!("Pieces ({})", self.pieces.filtered.len());
        if self.pieces.show_only_incomplete {
            title.push_str(" - missing parts only");
        }
        let block = Block::default().title(title).borders(Borders::ALL);
        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);

        if self.pieces.filtered.is_empty() {
            let message = if self.pieces.entries.is_empty() {
                "No pieces yet. Press '+' to add one."
            } else {
                "No pieces match the current filter."
            };
            let paragraph = Paragraph::new(message)
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true });
            frame.render_widget(paragraph, inner);
            return;
        }

        for (index, chunk) in card_rows(
            inner,
            PIECE_CARD_HEIGHT,
            self.pieces.filtered.len(),
            self.pieces.selected,
        ) {
            let entry = &self.pieces.filtered[index];
            let selected = index == self.pieces.selected;
            render_card(frame, chunk, selected, piece_card_lines(entry, selected));
        }
    }

    fn draw_piece(&self, frame: &mut Frame, area: Rect, screen: &PieceScreen) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(PIECE_HEADER_HEIGHT), Constraint::Min(0)])
            .split(area);

        let piece = &screen.entry.piece;
        let mut details = vec![
            Span::styled(
                piece
                    .composer
                    .clone()
                    .unwrap_or_else(|| "Unknown composer".to_string()),
                Style::default().fg(Color::Gray),
            ),
            Span::raw("   "),
        ];
        details.extend(parts_summary_line(&screen.entry).spans);
        let header = vec![
            Line::from(Span::styled(
                piece.title.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(details),
        ];
        let header_block = Block::default().borders(Borders::ALL).title("Piece");
        frame.render_widget(
            Paragraph::new(header)
                .block(header_block)
                .wrap(Wrap { trim: true }),
            chunks[0],
        );

        let list_block = Block::default()
            .borders(Borders::ALL)
            .title(format!("Instrument slots ({})", screen.entry.slots.len()));
        frame.render_widget(list_block.clone(), chunks[1]);
        let inner = list_block.inner(chunks[1]);

        if screen.entry.slots.is_empty() {
            frame.render_widget(
                Paragraph::new("No instrument slots. Press '+' to add one.")
                    .alignment(Alignment::Center),
                inner,
            );
            return;
        }

        for (index, chunk) in card_rows(
            inner,
            SLOT_CARD_HEIGHT,
            screen.entry.slots.len(),
            screen.selected,
        ) {
            let selected = index == screen.selected;
            let lines = slot_card_lines(&screen.entry.slots[index], selected);
            render_card(frame, chunk, selected, lines);
        }
    }

    fn draw_footer(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::TOP);
        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);

        let status_line = if let Some(status) = &self.status {
            Line::from(vec![Span::styled(status.text.clone(), status.kind.style())])
        } else {
            Line::from("")
        };

        let instructions = self.footer_instructions();

        let paragraph = Paragraph::new(vec![status_line, instructions]).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn draw_search_bar(&self, frame: &mut Frame, area: Rect, state: &SearchState) {
        let height = 3u16.min(area.height);
        let popup_area = Rect {
            x: area.x,
            y: area.y,
            width: area.width,
            height,
        };
        frame.render_widget(Clear, popup_area);

        let block = Block::default().borders(Borders::ALL).title("Search");
        let paragraph = Paragraph::new(Span::raw(format!("Search: {}", state.query)))
            .block(block.clone())
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, popup_area);

        let inner = block.inner(popup_area);
        frame.set_cursor_position(cursor_position(
            inner,
            "Search: ",
            state.query.chars().count(),
            0,
        ));
    }

    fn footer_instructions(&self) -> Line<'static> {
        let key_style = Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD);
        let keys: &[(&str, &str)] = match (&self.screen, &self.mode) {
            (_, Mode::CreatingPiece(_)) => &[
                ("[Tab]", " Next / Accept   "),
                ("[Enter]", " Stage Slot / Save   "),
                ("[Del]", " Unstage Slot   "),
                ("[Esc]", " Cancel"),
            ],
            (_, Mode::AddingSlot { .. }) | (_, Mode::UploadingPart { .. }) => &[
                ("[Tab]", " Next / Accept   "),
                ("[Enter]", " Save   "),
                ("[Esc]", " Cancel"),
            ],
            (_, Mode::ConfirmPieceDelete(_)) | (_, Mode::ConfirmPartDelete(_)) => {
                &[("[y]", " Delete   "), ("[n/Esc]", " Keep")]
            }
            (_, Mode::Searching(_)) => &[
                ("[↑↓]", " Select   "),
                ("[Enter]", " Open   "),
                ("[Esc]", " Clear Search"),
            ],
            (Screen::Piece(_), _) => &[
                ("[↑↓]", " Select   "),
                ("[Enter/o]", " Open Part   "),
                ("[+]", " Add Slot   "),
                ("[u]", " Upload Part   "),
                ("[-]", " Delete Part   "),
                ("[r]", " Refresh   "),
                ("[Esc]", " Back   "),
                ("[q]", " Quit"),
            ],
            (Screen::Pieces, _) => &[
                ("[↑↓]", " Select   "),
                ("[Enter]", " Open   "),
                ("[o]", " Open Score   "),
                ("[+]", " Add   "),
                ("[-]", " Delete   "),
                ("[f]", " Search   "),
                ("[Ctrl+L]", " Missing Parts   "),
                ("[r]", " Refresh   "),
                ("[q]", " Quit"),
            ],
        };

        Line::from(
            keys.iter()
                .flat_map(|(key, label)| {
                    [
                        Span::styled(key.to_string(), key_style),
                        Span::raw(label.to_string()),
                    ]
                })
                .collect::<Vec<_>>(),
        )
    }

    fn draw_piece_form(&self, frame: &mut Frame, area: Rect, form: &PieceForm) {
        let popup_area = centered_rect(70, 60, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title("New Piece").borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let mut lines = vec![
            form.build_line("Title", PieceField::Title),
            form.build_line("Composer", PieceField::Composer),
            form.build_line("Score file", PieceField::File),
            Line::from(""),
            Line::from(Span::styled(
                "Instrument slots:",
                Style::default().add_modifier(Modifier::BOLD),
            )),
        ];
        if form.slots.is_empty() {
            lines.push(Line::from(Span::styled(
                "  none staged yet",
                Style::default().fg(Color::DarkGray),
            )));
        } else {
            lines.extend(
                form.slots
                    .iter()
                    .map(|staged| Line::from(format!("  • {}", staged.display()))),
            );
        }
        let instrument_row = u16::try_from(lines.len()).unwrap_or(u16::MAX);
        lines.push(form.build_line("Instrument", PieceField::Instrument));
        lines.push(form.build_line("Label", PieceField::Label));
        lines.push(Line::from(""));
        lines.push(form_hint(
            form.error.as_deref(),
            "Enter on a slot field stages it • Enter elsewhere saves • Esc to cancel",
        ));

        frame.render_widget(Paragraph::new(lines), inner);

        let (prefix, row) = match form.active {
            PieceField::Title => ("Title: ", 0),
            PieceField::Composer => ("Composer: ", 1),
            PieceField::File => ("Score file: ", 2),
            PieceField::Instrument => ("Instrument: ", instrument_row),
            PieceField::Label => ("Label: ", instrument_row.saturating_add(1)),
        };
        frame.set_cursor_position(cursor_position(
            inner,
            prefix,
            form.value_len(form.active),
            row,
        ));
    }

    fn draw_slot_form(&self, frame: &mut Frame, area: Rect, form: &SlotForm) {
        let popup_area = centered_rect(70, 40, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title("Add Instrument Slot")
            .borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let lines = vec![
            form.build_line("Instrument", SlotField::Instrument),
            form.build_line("Label", SlotField::Label),
            form.build_line("Part file", SlotField::File),
            Line::from(""),
            form_hint(
                form.error.as_deref(),
                "Enter to save • Tab to switch • Esc to cancel",
            ),
        ];
        frame.render_widget(Paragraph::new(lines), inner);

        let (prefix, row) = match form.active {
            SlotField::Instrument => ("Instrument: ", 0),
            SlotField::Label => ("Label: ", 1),
            SlotField::File => ("Part file: ", 2),
        };
        frame.set_cursor_position(cursor_position(
            inner,
            prefix,
            form.value_len(form.active),
            row,
        ));
    }

    fn draw_part_form(&self, frame: &mut Frame, area: Rect, slot: &InstrumentSlot, form: &PartForm) {
        let popup_area = centered_rect(70, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title("Upload Part").borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let lines = vec![
            Line::from(format!(
                "New part for {} ({}):",
                slot.slot_label, slot.instrument_name
            )),
            form.build_line(),
            Line::from(""),
            form_hint(form.error.as_deref(), "Enter to upload • Esc to cancel"),
        ];
        frame.render_widget(Paragraph::new(lines), inner);
        frame.set_cursor_position(cursor_position(
            inner,
            "File: ",
            form.file.chars().count(),
            1,
        ));
    }

    fn draw_confirm_piece(&self, frame: &mut Frame, area: Rect, confirm: &ConfirmPieceDelete) {
        let slots = match confirm.slot_count {
            1 => "1 instrument slot".to_string(),
            n => format!("{n} instrument slots"),
        };
        let lines = vec![
            Line::from(format!("Delete {}?", confirm.piece.display_title())),
            Line::from(format!(
                "The score, its {slots} and every uploaded part will be removed."
            )),
            Line::from(""),
            Line::from(Span::styled(
                "Press Y to confirm or N / Esc to cancel.",
                Style::default().fg(Color::Gray),
            )),
        ];
        draw_confirm(frame, area, lines);
    }

    fn draw_confirm_part(&self, frame: &mut Frame, area: Rect, confirm: &ConfirmPartDelete) {
        let lines = vec![
            Line::from(format!(
                "Delete the part for {} ({})?",
                confirm.slot.slot_label, confirm.slot.instrument_name
            )),
            Line::from("The instrument slot is removed from the piece as well."),
            Line::from(""),
            Line::from(Span::styled(
                "Press Y to confirm or N / Esc to cancel.",
                Style::default().fg(Color::Gray),
            )),
        ];
        draw_confirm(frame, area, lines);
    }
}

fn draw_confirm(frame: &mut Frame, area: Rect, lines: Vec<Line<'static>>) {
    let popup_area = centered_rect(60, 30, area);
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .title("Confirm Deletion")
        .borders(Borders::ALL);
    frame.render_widget(block.clone(), popup_area);
    let inner = block.inner(popup_area);

    let paragraph = Paragraph::new(lines)
        .alignment(Alignment::Left)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, inner);
}

/// Cursor cell after `prefix` and `value_len` typed characters on `row`,
/// clamped to the last cell of `inner` so long input cannot overflow.
fn cursor_position(inner: Rect, prefix: &str, value_len: usize, row: u16) -> (u16, u16) {
    let last_column = usize::from(inner.width.saturating_sub(1));
    let column = (prefix.chars().count() + value_len).min(last_column);
    let x = inner.x.saturating_add(u16::try_from(column).unwrap_or(u16::MAX));
    let y = inner.y.saturating_add(row.min(inner.height.saturating_sub(1)));
    (x, y)
}

fn form_hint(error: Option<&str>, hint: &'static str) -> Line<'static> {
    match error {
        Some(error) => Line::from(Span::styled(
            error.to_string(),
            Style::default().fg(Color::Red),
        )),
        None => Line::from(Span::styled(hint, Style::default().fg(Color::Gray))),
    }
}

/// Lay out the window of cards that keeps `selected` visible.
fn card_rows(area: Rect, card_height: u16, len: usize, selected: usize) -> Vec<(usize, Rect)> {
    if len == 0 || area.height == 0 {
        return Vec::new();
    }

    let capacity = ((area.height / card_height) as usize).max(1);
    let mut start = if selected >= capacity {
        selected + 1 - capacity
    } else {
        0
    };
    if start + capacity > len {
        start = len.saturating_sub(capacity);
    }
    let end = min(start + capacity, len);

    let constraints: Vec<Constraint> = (start..end)
        .map(|_| Constraint::Length(card_height))
        .collect();
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    (start..end)
        .zip(rows.iter().copied())
        .filter(|(_, rect)| rect.height > 0)
        .collect()
}

fn render_card(frame: &mut Frame, area: Rect, selected: bool, lines: Vec<Line<'static>>) {
    let mut block = Block::default().borders(Borders::ALL);
    let mut paragraph_style = Style::default();
    if selected {
        block = block.style(Style::default().fg(Color::Yellow));
        paragraph_style = Style::default().fg(Color::Yellow);
    }

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: true })
        .alignment(Alignment::Left)
        .style(paragraph_style);
    frame.render_widget(paragraph, area);
}

fn piece_card_lines(entry: &PieceEntry, selected: bool) -> Vec<Line<'static>> {
    let piece = &entry.piece;
    let title = if selected {
        format!("▶ {}", piece.title)
    } else {
        piece.title.clone()
    };
    vec![
        Line::from(Span::styled(
            title,
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            piece
                .composer
                .clone()
                .unwrap_or_else(|| "Unknown composer".to_string()),
            Style::default().fg(Color::Gray),
        )),
        parts_summary_line(entry),
        Line::from(Span::styled(
            piece.file_url.clone(),
            Style::default().fg(Color::Cyan),
        )),
    ]
}

fn slot_card_lines(entry: &SlotEntry, selected: bool) -> Vec<Line<'static>> {
    let slot = &entry.slot;
    let label = if selected {
        format!("▶ {}", slot.slot_label)
    } else {
        slot.slot_label.clone()
    };
    let status = match &entry.part {
        Some(part) => Span::styled(
            format!("Uploaded {}", format_timestamp(&part.uploaded_at)),
            Style::default().fg(Color::Green),
        ),
        None => Span::styled(
            "Not uploaded",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::ITALIC),
        ),
    };
    vec![
        Line::from(Span::styled(
            label,
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            slot.instrument_name.clone(),
            Style::default().fg(Color::Gray),
        )),
        Line::from(status),
    ]
}
