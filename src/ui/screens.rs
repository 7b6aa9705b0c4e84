use crate::models::{PieceEntry, SlotEntry};

/// Clamp `selected + offset` into `0..len`.
fn offset_selection(selected: usize, offset: isize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let target = selected as isize + offset;
    target.clamp(0, len as isize - 1) as usize
}

/// The piece library with its search filter.
pub(crate) struct PiecesScreen {
    pub(crate) entries: Vec<PieceEntry>,
    pub(crate) filtered: Vec<PieceEntry>,
    pub(crate) filter: Option<String>,
    pub(crate) show_only_incomplete: bool,
    pub(crate) selected: usize,
}

impl PiecesScreen {
    pub(crate) fn new(entries: Vec<PieceEntry>) -> Self {
        let mut screen = Self {
            entries,
            filtered: Vec::new(),
            filter: None,
            show_only_incomplete: false,
            selected: 0,
        };
        screen.apply_filter();
        screen
    }

    /// Rebuild `filtered` from the search query (title or composer) and the
    /// incomplete-only toggle.
    pub(crate) fn apply_filter(&mut self) {
        let query = self
            .filter
            .as_ref()
            .map(|q| q.trim().to_lowercase())
            .filter(|q| !q.is_empty());

        self.filtered = self
            .entries
            .iter()
            .filter(|entry| match &query {
                Some(q) => {
                    entry.piece.title.to_lowercase().contains(q)
                        || entry
                            .piece
                            .composer
                            .as_deref()
                            .map(|c| c.to_lowercase().contains(q))
                            .unwrap_or(false)
                }
                None => true,
            })
            .filter(|entry| {
                !self.show_only_incomplete || entry.uploaded_count() < entry.slots.len()
            })
            .cloned()
            .collect();

        self.ensure_in_bounds();
    }

    pub(crate) fn set_filter(&mut self, filter: Option<String>) {
        self.filter = filter;
        self.apply_filter();
    }

    pub(crate) fn toggle_show_incomplete(&mut self) -> bool {
        self.show_only_incomplete = !self.show_only_incomplete;
        self.apply_filter();
        self.show_only_incomplete
    }

    /// Replace the data after a refetch, keeping the selection on `focus_id`
    /// when it is still visible.
    pub(crate) fn set_entries(&mut self, entries: Vec<PieceEntry>, focus_id: Option<i64>) {
        self.entries = entries;
        self.apply_filter();
        if let Some(id) = focus_id {
            self.focus(id);
        }
    }

    pub(crate) fn focus(&mut self, piece_id: i64) {
        if let Some(idx) = self
            .filtered
            .iter()
            .position(|entry| entry.piece.id == piece_id)
        {
            self.selected = idx;
        }
    }

    pub(crate) fn find(&self, piece_id: i64) -> Option<&PieceEntry> {
        self.entries.iter().find(|entry| entry.piece.id == piece_id)
    }

    pub(crate) fn current(&self) -> Option<&PieceEntry> {
        self.filtered.get(self.selected)
    }

    pub(crate) fn move_selection(&mut self, offset: isize) {
        self.selected = offset_selection(self.selected, offset, self.filtered.len());
    }

    pub(crate) fn select_first(&mut self) {
        self.selected = 0;
    }

    pub(crate) fn select_last(&mut self) {
        self.selected = self.filtered.len().saturating_sub(1);
    }

    fn ensure_in_bounds(&mut self) {
        if self.filtered.is_empty() {
            self.selected = 0;
        } else if self.selected >= self.filtered.len() {
            self.selected = self.filtered.len() - 1;
        }
    }
}

/// Detail view of one piece and its slots.
pub(crate) struct PieceScreen {
    pub(crate) entry: PieceEntry,
    pub(crate) selected: usize,
}

impl PieceScreen {
    pub(crate) fn new(entry: PieceEntry) -> Self {
        Self { entry, selected: 0 }
    }

    pub(crate) fn piece_id(&self) -> i64 {
        self.entry.piece.id
    }

    pub(crate) fn current_slot(&self) -> Option<&SlotEntry> {
        self.entry.slots.get(self.selected)
    }

    /// Swap in refreshed data, following the previously selected slot if it
    /// still exists.
    pub(crate) fn set_entry(&mut self, entry: PieceEntry, focus_slot: Option<i64>) {
        let previous = focus_slot.or_else(|| self.current_slot().map(|s| s.slot.id));
        self.entry = entry;
        self.selected = previous
            .and_then(|id| self.entry.slots.iter().position(|s| s.slot.id == id))
            .unwrap_or(self.selected)
            .min(self.entry.slots.len().saturating_sub(1));
    }

    pub(crate) fn move_selection(&mut self, offset: isize) {
        self.selected = offset_selection(self.selected, offset, self.entry.slots.len());
    }

    pub(crate) fn select_first(&mut self) {
        self.selected = 0;
    }

    pub(crate) fn select_last(&mut self) {
        self.selected = self.entry.slots.len().saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InstrumentSlot, Part, Piece};
    use chrono::Utc;

    fn entry(id: i64, title: &str, composer: Option<&str>, parts: &[bool]) -> PieceEntry {
        let now = Utc::now();
        PieceEntry {
            piece: Piece {
                id,
                account_id: "local".to_string(),
                title: title.to_string(),
                composer: composer.map(str::to_string),
                file_path: format!("music/{id}.pdf"),
                file_url: format!("file:///tmp/music/{id}.pdf"),
                created_at: now,
            },
            slots: parts
                .iter()
                .enumerate()
                .map(|(idx, uploaded)| {
                    let slot_id = id * 10 + idx as i64;
                    SlotEntry {
                        slot: InstrumentSlot {
                            id: slot_id,
                            piece_id: id,
                            instrument_id: 1,
                            instrument_name: "Violin".to_string(),
                            slot_label: format!("Violin {idx}"),
                            created_at: now,
                        },
                        part: uploaded.then(|| Part {
                            id: slot_id,
                            slot_id,
                            file_path: format!("music/p{slot_id}.pdf"),
                            file_url: format!("file:///tmp/music/p{slot_id}.pdf"),
                            uploaded_at: now,
                        }),
                    }
                })
                .collect(),
        }
    }

    fn library() -> Vec<PieceEntry> {
        vec![
            entry(3, "Bolero", Some("Ravel"), &[true, true]),
            entry(2, "Symphony No. 5", Some("Beethoven"), &[true, false]),
            entry(1, "Pavane", Some("Faure"), &[false]),
        ]
    }

    #[test]
    fn filters_by_title_or_composer() {
        let mut screen = PiecesScreen::new(library());
        screen.set_filter(Some("BEETH".to_string()));
        assert_eq!(screen.filtered.len(), 1);
        assert_eq!(screen.current().unwrap().piece.id, 2);

        screen.set_filter(Some("  ".to_string()));
        assert_eq!(screen.filtered.len(), 3);
    }

    #[test]
    fn incomplete_toggle_hides_finished_pieces() {
        let mut screen = PiecesScreen::new(library());
        assert!(screen.toggle_show_incomplete());
        let ids: Vec<_> = screen.filtered.iter().map(|e| e.piece.id).collect();
        assert_eq!(ids, [2, 1]);
    }

    #[test]
    fn refetch_keeps_focus_and_bounds() {
        let mut screen = PiecesScreen::new(library());
        screen.select_last();
        assert_eq!(screen.current().unwrap().piece.id, 1);

        screen.set_entries(library().into_iter().take(2).collect(), None);
        assert_eq!(screen.selected, 1);

        screen.set_entries(library(), Some(3));
        assert_eq!(screen.current().unwrap().piece.id, 3);
    }

    #[test]
    fn piece_screen_follows_slot_after_refresh() {
        let mut screen = PieceScreen::new(entry(2, "Symphony No. 5", None, &[true, false, false]));
        screen.move_selection(5);
        assert_eq!(screen.selected, 2);

        screen.set_entry(entry(2, "Symphony No. 5", None, &[true, false]), None);
        assert_eq!(screen.selected, 1);

        screen.set_entry(entry(2, "Symphony No. 5", None, &[true, false]), Some(20));
        assert_eq!(screen.current_slot().unwrap().slot.id, 20);
    }
}
