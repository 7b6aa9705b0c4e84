use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

use crate::models::{Instrument, InstrumentSlot, Part, Piece, SlotRequest, Upload};

/// Text input with ghosted autocomplete over the instrument names.
#[derive(Default, Clone)]
pub(crate) struct InstrumentInput {
    pub(crate) text: String,
    pub(crate) suggestion: Option<String>,
    pub(crate) autocomplete_disabled: bool,
}

impl InstrumentInput {
    pub(crate) fn push_char(&mut self, ch: char) {
        self.autocomplete_disabled = false;
        self.text.push(ch);
    }

    pub(crate) fn backspace(&mut self) {
        self.text.pop();
        self.autocomplete_disabled = false;
    }

    pub(crate) fn clear(&mut self) {
        *self = Self::default();
    }

    /// Recompute the suggestion from the current prefix.
    pub(crate) fn update_suggestion(&mut self, instruments: &[Instrument]) {
        if self.autocomplete_disabled || self.text.is_empty() {
            self.suggestion = None;
            return;
        }

        let current_lower = self.text.to_lowercase();
        self.suggestion = instruments
            .iter()
            .find(|candidate| candidate.name.to_lowercase().starts_with(&current_lower))
            .filter(|candidate| candidate.name.to_lowercase() != current_lower)
            .map(|candidate| candidate.name.clone());
    }

    /// Apply the suggested name, marking autocomplete as satisfied.
    pub(crate) fn accept_suggestion(&mut self) -> bool {
        if self.suggestion_suffix().is_none() {
            return false;
        }
        match self.suggestion.take() {
            Some(candidate) => {
                self.text = candidate;
                self.autocomplete_disabled = true;
                true
            }
            None => false,
        }
    }

    /// Drop the suggestion for the rest of this interaction.
    pub(crate) fn cancel_autocomplete(&mut self) -> bool {
        if self.suggestion.take().is_some() {
            self.autocomplete_disabled = true;
            return true;
        }
        false
    }

    /// Remaining characters shown as a ghosted hint.
    pub(crate) fn suggestion_suffix(&self) -> Option<String> {
        let candidate = self.suggestion.as_ref()?;
        let suffix: String = candidate.chars().skip(self.text.chars().count()).collect();
        if suffix.is_empty() {
            None
        } else {
            Some(suffix)
        }
    }

    /// Match the typed name against the catalog: exact (case-insensitive)
    /// first, then a unique prefix.
    pub(crate) fn resolve(&self, instruments: &[Instrument]) -> Result<Instrument> {
        let typed = self.text.trim().to_lowercase();
        if typed.is_empty() {
            return Err(anyhow!("Choose an instrument."));
        }

        if let Some(exact) = instruments
            .iter()
            .find(|instrument| instrument.name.to_lowercase() == typed)
        {
            return Ok(exact.clone());
        }

        let mut matches = instruments
            .iter()
            .filter(|instrument| instrument.name.to_lowercase().starts_with(&typed));
        match (matches.next(), matches.next()) {
            (Some(only), None) => Ok(only.clone()),
            (Some(_), Some(_)) => Err(anyhow!("'{}' matches several instruments.", self.text.trim())),
            _ => Err(anyhow!("Unknown instrument '{}'.", self.text.trim())),
        }
    }

    fn spans(&self, is_active: bool) -> Vec<Span<'static>> {
        let style = field_style(&self.text, is_active);
        let mut spans = Vec::new();
        if self.text.is_empty() && !(is_active && self.suggestion.is_some()) {
            spans.push(Span::styled("<instrument>".to_string(), style));
        } else {
            spans.push(Span::styled(self.text.clone(), style));
        }
        if is_active {
            if let Some(suffix) = self.suggestion_suffix() {
                spans.push(Span::styled(suffix, Style::default().fg(Color::DarkGray)));
            }
        }
        spans
    }
}

/// Slot picked in the new-piece form but not saved yet.
#[derive(Clone)]
pub(crate) struct StagedSlot {
    pub(crate) instrument: Instrument,
    pub(crate) label: String,
}

impl StagedSlot {
    pub(crate) fn display(&self) -> String {
        if self.label.trim().is_empty() || self.label.trim() == self.instrument.name {
            self.instrument.name.clone()
        } else {
            format!("{} ({})", self.label.trim(), self.instrument.name)
        }
    }
}

/// Fields of the new-piece form.
#[derive(Copy, Clone, PartialEq, Eq, Default)]
pub(crate) enum PieceField {
    #[default]
    Title,
    Composer,
    File,
    Instrument,
    Label,
}

/// Parsed content of the new-piece form.
pub(crate) struct PieceInputs {
    pub(crate) title: String,
    pub(crate) composer: Option<String>,
    pub(crate) file_path: String,
    pub(crate) slots: Vec<SlotRequest>,
}

/// Form state for creating a piece with its initial slots.
#[derive(Default, Clone)]
pub(crate) struct PieceForm {
    pub(crate) title: String,
    pub(crate) composer: String,
    pub(crate) file: String,
    pub(crate) instrument: InstrumentInput,
    pub(crate) label: String,
    pub(crate) slots: Vec<StagedSlot>,
    pub(crate) active: PieceField,
    pub(crate) error: Option<String>,
}

impl PieceForm {
    pub(crate) fn toggle_field(&mut self) {
        self.active = match self.active {
            PieceField::Title => PieceField::Composer,
            PieceField::Composer => PieceField::File,
            PieceField::File => PieceField::Instrument,
            PieceField::Instrument => PieceField::Label,
            PieceField::Label => PieceField::Title,
        };
        if self.active != PieceField::Instrument {
            self.instrument.suggestion = None;
        }
    }

    pub(crate) fn previous_field(&mut self) {
        self.active = match self.active {
            PieceField::Title => PieceField::Label,
            PieceField::Composer => PieceField::Title,
            PieceField::File => PieceField::Composer,
            PieceField::Instrument => PieceField::File,
            PieceField::Label => PieceField::Instrument,
        };
        if self.active != PieceField::Instrument {
            self.instrument.suggestion = None;
        }
    }

    /// Whether Enter should stage a slot rather than save the piece.
    pub(crate) fn on_slot_fields(&self) -> bool {
        matches!(self.active, PieceField::Instrument | PieceField::Label)
    }

    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_control() {
            return false;
        }
        match self.active {
            PieceField::Title => self.title.push(ch),
            PieceField::Composer => self.composer.push(ch),
            PieceField::File => self.file.push(ch),
            PieceField::Instrument => self.instrument.push_char(ch),
            PieceField::Label => self.label.push(ch),
        }
        true
    }

    pub(crate) fn backspace(&mut self) {
        match self.active {
            PieceField::Title => {
                self.title.pop();
            }
            PieceField::Composer => {
                self.composer.pop();
            }
            PieceField::File => {
                self.file.pop();
            }
            PieceField::Instrument => self.instrument.backspace(),
            PieceField::Label => {
                self.label.pop();
            }
        }
    }

    /// Move the instrument and label fields into the staged slot list.
    pub(crate) fn stage_slot(&mut self, instruments: &[Instrument]) -> Result<StagedSlot> {
        let instrument = self.instrument.resolve(instruments)?;
        let staged = StagedSlot {
            instrument,
            label: self.label.trim().to_string(),
        };
        self.slots.push(staged.clone());
        self.instrument.clear();
        self.label.clear();
        self.active = PieceField::Instrument;
        Ok(staged)
    }

    pub(crate) fn unstage_last_slot(&mut self) -> Option<StagedSlot> {
        self.slots.pop()
    }

    /// Validate the form. A slot still sitting in the instrument field counts
    /// as staged.
    pub(crate) fn parse_inputs(&mut self, instruments: &[Instrument]) -> Result<PieceInputs> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(anyhow!("A title is required."));
        }
        let file_path = self.file.trim();
        if file_path.is_empty() {
            return Err(anyhow!("A score PDF is required."));
        }
        if !self.instrument.text.trim().is_empty() {
            self.stage_slot(instruments)?;
        }
        if self.slots.is_empty() {
            return Err(anyhow!("Add at least one instrument slot."));
        }

        let composer = self.composer.trim();
        Ok(PieceInputs {
            title: self.title.trim().to_string(),
            composer: if composer.is_empty() {
                None
            } else {
                Some(composer.to_string())
            },
            file_path: self.file.trim().to_string(),
            slots: self
                .slots
                .iter()
                .map(|staged| SlotRequest {
                    instrument_id: staged.instrument.id,
                    slot_label: staged.label.clone(),
                })
                .collect(),
        })
    }

    pub(crate) fn build_line(&self, field_name: &str, field: PieceField) -> Line<'static> {
        let is_active = self.active == field;
        let mut spans = vec![Span::raw(format!("{field_name}: "))];
        match field {
            PieceField::Title => spans.push(text_span(&self.title, "<required>", is_active)),
            PieceField::Composer => spans.push(text_span(&self.composer, "<optional>", is_active)),
            PieceField::File => spans.push(text_span(&self.file, "<path to PDF>", is_active)),
            PieceField::Instrument => spans.extend(self.instrument.spans(is_active)),
            PieceField::Label => spans.push(text_span(&self.label, "<same as instrument>", is_active)),
        }
        Line::from(spans)
    }

    pub(crate) fn value_len(&self, field: PieceField) -> usize {
        match field {
            PieceField::Title => self.title.chars().count(),
            PieceField::Composer => self.composer.chars().count(),
            PieceField::File => self.file.chars().count(),
            PieceField::Instrument => self.instrument.text.chars().count(),
            PieceField::Label => self.label.chars().count(),
        }
    }
}

/// Fields of the add-slot form.
#[derive(Copy, Clone, PartialEq, Eq, Default)]
pub(crate) enum SlotField {
    #[default]
    Instrument,
    Label,
    File,
}

/// Form state for adding a slot (with its first part) to a piece.
#[derive(Default, Clone)]
pub(crate) struct SlotForm {
    pub(crate) instrument: InstrumentInput,
    pub(crate) label: String,
    pub(crate) file: String,
    pub(crate) active: SlotField,
    pub(crate) error: Option<String>,
}

impl SlotForm {
    pub(crate) fn toggle_field(&mut self) {
        self.active = match self.active {
            SlotField::Instrument => SlotField::Label,
            SlotField::Label => SlotField::File,
            SlotField::File => SlotField::Instrument,
        };
        if self.active != SlotField::Instrument {
            self.instrument.suggestion = None;
        }
    }

    pub(crate) fn previous_field(&mut self) {
        self.active = match self.active {
            SlotField::Instrument => SlotField::File,
            SlotField::Label => SlotField::Instrument,
            SlotField::File => SlotField::Label,
        };
        if self.active != SlotField::Instrument {
            self.instrument.suggestion = None;
        }
    }

    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_control() {
            return false;
        }
        match self.active {
            SlotField::Instrument => self.instrument.push_char(ch),
            SlotField::Label => self.label.push(ch),
            SlotField::File => self.file.push(ch),
        }
        true
    }

    pub(crate) fn backspace(&mut self) {
        match self.active {
            SlotField::Instrument => self.instrument.backspace(),
            SlotField::Label => {
                self.label.pop();
            }
            SlotField::File => {
                self.file.pop();
            }
        }
    }

    /// Resolve the instrument and return `(instrument, label, file path)`.
    pub(crate) fn parse_inputs(&self, instruments: &[Instrument]) -> Result<(Instrument, String, String)> {
        let instrument = self.instrument.resolve(instruments)?;
        let file_path = self.file.trim();
        if file_path.is_empty() {
            return Err(anyhow!("A part PDF is required."));
        }
        Ok((
            instrument,
            self.label.trim().to_string(),
            file_path.to_string(),
        ))
    }

    pub(crate) fn build_line(&self, field_name: &str, field: SlotField) -> Line<'static> {
        let is_active = self.active == field;
        let mut spans = vec![Span::raw(format!("{field_name}: "))];
        match field {
            SlotField::Instrument => spans.extend(self.instrument.spans(is_active)),
            SlotField::Label => spans.push(text_span(&self.label, "<same as instrument>", is_active)),
            SlotField::File => spans.push(text_span(&self.file, "<path to PDF>", is_active)),
        }
        Line::from(spans)
    }

    pub(crate) fn value_len(&self, field: SlotField) -> usize {
        match field {
            SlotField::Instrument => self.instrument.text.chars().count(),
            SlotField::Label => self.label.chars().count(),
            SlotField::File => self.file.chars().count(),
        }
    }
}

/// Single-field form used to upload a new part for an existing slot.
#[derive(Default, Clone)]
pub(crate) struct PartForm {
    pub(crate) file: String,
    pub(crate) error: Option<String>,
}

impl PartForm {
    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_control() {
            return false;
        }
        self.file.push(ch);
        true
    }

    pub(crate) fn backspace(&mut self) {
        self.file.pop();
    }

    pub(crate) fn build_line(&self) -> Line<'static> {
        Line::from(vec![
            Span::raw("File: "),
            text_span(&self.file, "<path to PDF>", true),
        ])
    }
}

pub(crate) struct ConfirmPieceDelete {
    pub(crate) piece: Piece,
    pub(crate) slot_count: usize,
}

pub(crate) struct ConfirmPartDelete {
    pub(crate) slot: InstrumentSlot,
    pub(crate) part: Part,
}

/// Load a file picked in a form. Terminals wrap dropped paths in quotes, so
/// those are stripped first.
pub(crate) fn read_upload(raw_path: &str) -> Result<Upload> {
    let trimmed = raw_path.trim().trim_matches(|c: char| c == '\'' || c == '"');
    let path = Path::new(trimmed);
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow!("'{trimmed}' is not a file path."))?;
    let bytes = fs::read(path).with_context(|| format!("Could not read '{trimmed}'."))?;
    Ok(Upload::new(file_name, bytes))
}

fn field_style(value: &str, is_active: bool) -> Style {
    if is_active {
        Style::default().fg(Color::Yellow)
    } else if value.is_empty() {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default()
    }
}

fn text_span(value: &str, placeholder: &str, is_active: bool) -> Span<'static> {
    let display = if value.is_empty() {
        placeholder.to_string()
    } else {
        value.to_string()
    };
    Span::styled(display, field_style(value, is_active))
}
