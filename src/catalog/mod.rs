//! The sheet-music catalog: keeps pieces, instrument slots and uploaded parts
//! consistent across the SQLite tables and the object store.
//!
//! Every workflow runs its store calls strictly in order and stops at the
//! first failure. Nothing spans both stores atomically, so each operation
//! documents which earlier steps stay committed when a later one fails.
//! Removing files is always best-effort: a storage failure is logged and the
//! metadata change goes ahead.

mod error;
mod session;
mod validation;

use rusqlite::Connection;
use tracing::{debug, info, warn};

use crate::db;
use crate::models::{
    Instrument, InstrumentSlot, NewPiece, Part, Piece, PieceEntry, SlotEntry, Upload,
};
use crate::storage::{new_object_key, ObjectStore};

pub use error::{CatalogError, CatalogResult};
pub use session::Session;

use validation::validate_pdf;

/// Catalog service over one SQLite connection and one bucket.
pub struct Catalog<S> {
    conn: Connection,
    store: S,
}

impl<S: ObjectStore> Catalog<S> {
    pub fn new(conn: Connection, store: S) -> Self {
        Self { conn, store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Every instrument that can be assigned to a slot.
    pub fn list_instruments(&self) -> CatalogResult<Vec<Instrument>> {
        Ok(db::fetch_instruments(&self.conn)?)
    }

    /// The caller's pieces newest-first, each with its slots and the newest
    /// part per slot. Any failing query aborts the whole listing.
    pub fn list_pieces(&self, session: &Session) -> CatalogResult<Vec<PieceEntry>> {
        let pieces = db::fetch_pieces(&self.conn, session.account_id())?;

        let mut entries = Vec::with_capacity(pieces.len());
        for piece in pieces {
            let slots = db::fetch_slots_for_piece(&self.conn, piece.id)?;
            let mut slot_entries = Vec::with_capacity(slots.len());
            for slot in slots {
                let part = db::fetch_latest_part(&self.conn, slot.id)?;
                slot_entries.push(SlotEntry { slot, part });
            }
            entries.push(PieceEntry {
                piece,
                slots: slot_entries,
            });
        }

        debug!(account = session.account_id(), pieces = entries.len(), "listed pieces");
        Ok(entries)
    }

    /// Create a piece with its main score and initial slots.
    ///
    /// Steps: upload the score, insert the piece, insert one slot per request.
    /// A failed upload persists nothing. A failed piece insert removes the
    /// uploaded score again (best-effort). A failed slot insert leaves the
    /// piece with the slots inserted so far.
    pub fn create_piece(&self, session: &Session, input: NewPiece) -> CatalogResult<Piece> {
        let title = input.title.trim();
        if title.is_empty() {
            return Err(CatalogError::validation("A title is required."));
        }
        if input.slots.is_empty() {
            return Err(CatalogError::validation(
                "Select at least one instrument for the piece.",
            ));
        }

        let mut slots = Vec::with_capacity(input.slots.len());
        for request in &input.slots {
            let instrument = self.resolve_instrument(request.instrument_id)?;
            let label = slot_label_or_default(&request.slot_label, &instrument);
            slots.push((instrument, label));
        }
        let extension = validate_pdf(&input.file)?;

        let composer = input
            .composer
            .as_deref()
            .map(str::trim)
            .filter(|composer| !composer.is_empty());

        let (file_path, file_url) = self.store_file(&input.file, extension)?;

        let piece = match db::insert_piece(
            &self.conn,
            session.account_id(),
            title,
            composer,
            &file_path,
            &file_url,
        ) {
            Ok(piece) => piece,
            Err(err) => {
                self.discard_objects(vec![file_path], "piece insert failed");
                return Err(err.into());
            }
        };

        for (instrument, label) in &slots {
            db::insert_slot(&self.conn, piece.id, instrument, label)?;
        }

        info!(
            account = session.account_id(),
            piece_id = piece.id,
            slots = slots.len(),
            "created piece '{}'",
            piece.title
        );
        Ok(piece)
    }

    /// Upload a new part for an existing slot. Older parts of the slot stay
    /// stored but are no longer shown.
    pub fn upload_part_for_slot(
        &self,
        session: &Session,
        slot_id: i64,
        file: Upload,
    ) -> CatalogResult<Part> {
        let slot = db::fetch_slot(&self.conn, session.account_id(), slot_id)?
            .ok_or_else(|| CatalogError::not_found("slot", slot_id))?;
        let extension = validate_pdf(&file)?;

        let part = self.attach_part(&slot, &file, extension)?;
        info!(
            account = session.account_id(),
            slot_id = slot.id,
            part_id = part.id,
            "uploaded part for '{}'",
            slot.slot_label
        );
        Ok(part)
    }

    /// Add a slot to an existing piece and upload its first part.
    ///
    /// The slot is inserted before the upload; if the upload or the part
    /// insert fails the slot stays behind as "not uploaded".
    pub fn add_slot_with_part(
        &self,
        session: &Session,
        piece_id: i64,
        instrument_id: i64,
        slot_label: &str,
        file: Upload,
    ) -> CatalogResult<(InstrumentSlot, Part)> {
        let piece = db::fetch_piece(&self.conn, session.account_id(), piece_id)?
            .ok_or_else(|| CatalogError::not_found("piece", piece_id))?;
        let instrument = self.resolve_instrument(instrument_id)?;
        let extension = validate_pdf(&file)?;

        let label = slot_label_or_default(slot_label, &instrument);
        let slot = db::insert_slot(&self.conn, piece.id, &instrument, &label)?;
        let part = self.attach_part(&slot, &file, extension)?;

        info!(
            account = session.account_id(),
            piece_id = piece.id,
            slot_id = slot.id,
            part_id = part.id,
            "added slot '{}'",
            slot.slot_label
        );
        Ok((slot, part))
    }

    /// Delete a piece, its slots and parts, and their files.
    ///
    /// The main score and every part file are removed from storage first
    /// (failures are logged, not returned), then the piece row is deleted and
    /// the schema cascades to slots and parts.
    pub fn delete_piece(
        &self,
        session: &Session,
        piece_id: i64,
        file_path: &str,
    ) -> CatalogResult<()> {
        let piece = db::fetch_piece(&self.conn, session.account_id(), piece_id)?
            .ok_or_else(|| CatalogError::not_found("piece", piece_id))?;
        if piece.file_path != file_path {
            return Err(CatalogError::validation(format!(
                "'{file_path}' is not the score of piece {piece_id}."
            )));
        }

        let mut keys = vec![piece.file_path.clone()];
        keys.extend(db::fetch_part_paths_for_piece(&self.conn, piece.id)?);
        self.discard_objects(keys, "piece deleted");

        if !db::delete_piece(&self.conn, piece.id)? {
            return Err(CatalogError::not_found("piece", piece_id));
        }

        info!(
            account = session.account_id(),
            piece_id,
            "deleted piece '{}'",
            piece.title
        );
        Ok(())
    }

    /// Delete a part together with the slot it fills.
    ///
    /// The part's file and any superseded uploads of the same slot are
    /// removed best-effort, then the part row and the slot row.
    pub fn delete_part(
        &self,
        session: &Session,
        part_id: i64,
        slot_id: i64,
        file_path: &str,
    ) -> CatalogResult<()> {
        let slot = db::fetch_slot(&self.conn, session.account_id(), slot_id)?
            .ok_or_else(|| CatalogError::not_found("slot", slot_id))?;
        let part = db::fetch_part(&self.conn, part_id)?
            .filter(|part| part.slot_id == slot.id)
            .ok_or_else(|| CatalogError::not_found("part", part_id))?;
        if part.file_path != file_path {
            return Err(CatalogError::validation(format!(
                "'{file_path}' is not the file of part {part_id}."
            )));
        }

        let mut keys = db::fetch_part_paths_for_slot(&self.conn, slot.id)?;
        if !keys.contains(&part.file_path) {
            keys.push(part.file_path.clone());
        }
        self.discard_objects(keys, "part deleted");

        if !db::delete_part(&self.conn, part.id)? {
            return Err(CatalogError::not_found("part", part_id));
        }
        db::delete_slot(&self.conn, slot.id)?;

        info!(
            account = session.account_id(),
            slot_id = slot.id,
            part_id = part.id,
            "deleted part and slot '{}'",
            slot.slot_label
        );
        Ok(())
    }

    fn resolve_instrument(&self, instrument_id: i64) -> CatalogResult<Instrument> {
        db::fetch_instrument(&self.conn, instrument_id)?.ok_or_else(|| {
            CatalogError::validation(format!("Unknown instrument id {instrument_id}."))
        })
    }

    /// Upload under a fresh key and return `(key, public url)`.
    fn store_file(&self, file: &Upload, extension: &str) -> CatalogResult<(String, String)> {
        let key = new_object_key(extension);
        self.store.upload(&key, &file.bytes)?;
        let url = self.store.public_url(&key);
        Ok((key, url))
    }

    /// Upload `file` and record it as the newest part of `slot`. A failed
    /// insert removes the uploaded object again.
    fn attach_part(
        &self,
        slot: &InstrumentSlot,
        file: &Upload,
        extension: &str,
    ) -> CatalogResult<Part> {
        let (file_path, file_url) = self.store_file(file, extension)?;
        match db::insert_part(&self.conn, slot.id, &file_path, &file_url) {
            Ok(part) => Ok(part),
            Err(err) => {
                self.discard_objects(vec![file_path], "part insert failed");
                Err(err.into())
            }
        }
    }

    fn discard_objects(&self, keys: Vec<String>, reason: &str) {
        if keys.is_empty() {
            return;
        }
        if let Err(err) = self.store.remove(&keys) {
            warn!(?keys, reason, "failed to remove stored objects: {err}");
        }
    }
}

fn slot_label_or_default(label: &str, instrument: &Instrument) -> String {
    let label = label.trim();
    if label.is_empty() {
        instrument.name.clone()
    } else {
        label.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SlotRequest;
    use crate::storage::memory::MemoryBucket;
    use crate::storage::LocalBucket;

    fn catalog() -> Catalog<MemoryBucket> {
        Catalog::new(db::open_in_memory().unwrap(), MemoryBucket::default())
    }

    fn session() -> Session {
        Session::new("strings-section").unwrap()
    }

    fn pdf(name: &str) -> Upload {
        Upload::new(name, format!("%PDF-1.4\n% {name}\n").into_bytes())
    }

    fn instrument_id<S: ObjectStore>(catalog: &Catalog<S>, name: &str) -> i64 {
        catalog
            .list_instruments()
            .unwrap()
            .into_iter()
            .find(|instrument| instrument.name == name)
            .map(|instrument| instrument.id)
            .unwrap()
    }

    fn slot(instrument_id: i64, label: &str) -> SlotRequest {
        SlotRequest {
            instrument_id,
            slot_label: label.to_string(),
        }
    }

    fn symphony<S: ObjectStore>(catalog: &Catalog<S>, session: &Session) -> Piece {
        let violin = instrument_id(catalog, "Violin");
        catalog
            .create_piece(
                session,
                NewPiece {
                    title: "Symphony No. 5".to_string(),
                    composer: Some("Beethoven".to_string()),
                    slots: vec![slot(violin, "First Violin")],
                    file: pdf("a.pdf"),
                },
            )
            .unwrap()
    }

    fn count(catalog: &Catalog<MemoryBucket>, table: &str) -> i64 {
        catalog
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn created_piece_is_listed_with_its_slots_and_score() {
        let catalog = catalog();
        let session = session();
        let piece = symphony(&catalog, &session);

        let listed = catalog.list_pieces(&session).unwrap();
        assert_eq!(listed.len(), 1);
        let entry = &listed[0];
        assert_eq!(entry.piece.id, piece.id);
        assert_eq!(entry.piece.composer.as_deref(), Some("Beethoven"));
        assert_eq!(entry.slots.len(), 1);
        assert_eq!(entry.slots[0].slot.slot_label, "First Violin");
        assert_eq!(entry.slots[0].slot.instrument_name, "Violin");
        assert!(entry.slots[0].part.is_none());

        assert!(!entry.piece.file_url.is_empty());
        assert!(entry.piece.file_path.starts_with("music/"));
        assert_eq!(
            catalog.store().download(&entry.piece.file_path).unwrap(),
            pdf("a.pdf").bytes
        );
    }

    #[test]
    fn slot_count_matches_request_and_labels_are_sorted() {
        let catalog = catalog();
        let session = session();
        let violin = instrument_id(&catalog, "Violin");
        let viola = instrument_id(&catalog, "Viola");

        catalog
            .create_piece(
                &session,
                NewPiece {
                    title: "Serenade".to_string(),
                    composer: None,
                    slots: vec![
                        slot(violin, "Second Violin"),
                        slot(violin, "First Violin"),
                        slot(viola, ""),
                    ],
                    file: pdf("serenade.pdf"),
                },
            )
            .unwrap();

        let listed = catalog.list_pieces(&session).unwrap();
        let labels: Vec<_> = listed[0]
            .slots
            .iter()
            .map(|entry| entry.slot.slot_label.as_str())
            .collect();
        assert_eq!(labels, ["First Violin", "Second Violin", "Viola"]);
    }

    #[test]
    fn pieces_are_listed_newest_first() {
        let catalog = catalog();
        let session = session();
        let violin = instrument_id(&catalog, "Violin");
        for title in ["Older", "Newer"] {
            catalog
                .create_piece(
                    &session,
                    NewPiece {
                        title: title.to_string(),
                        composer: None,
                        slots: vec![slot(violin, "Violin")],
                        file: pdf("score.pdf"),
                    },
                )
                .unwrap();
        }

        let titles: Vec<_> = catalog
            .list_pieces(&session)
            .unwrap()
            .into_iter()
            .map(|entry| entry.piece.title)
            .collect();
        assert_eq!(titles, ["Newer", "Older"]);
    }

    #[test]
    fn invalid_input_has_no_side_effects() {
        let catalog = catalog();
        let session = session();
        let violin = instrument_id(&catalog, "Violin");

        let cases = [
            NewPiece {
                title: "  ".to_string(),
                composer: None,
                slots: vec![slot(violin, "First Violin")],
                file: pdf("a.pdf"),
            },
            NewPiece {
                title: "No slots".to_string(),
                composer: None,
                slots: Vec::new(),
                file: pdf("a.pdf"),
            },
            NewPiece {
                title: "Unknown instrument".to_string(),
                composer: None,
                slots: vec![slot(9_999, "Theremin")],
                file: pdf("a.pdf"),
            },
            NewPiece {
                title: "Not a pdf".to_string(),
                composer: None,
                slots: vec![slot(violin, "First Violin")],
                file: Upload::new("a.docx", b"PK\x03\x04".to_vec()),
            },
        ];

        for input in cases {
            let err = catalog.create_piece(&session, input).unwrap_err();
            assert!(matches!(err, CatalogError::Validation(_)), "{err}");
        }
        assert_eq!(catalog.store().len(), 0);
        assert_eq!(count(&catalog, "music_pieces"), 0);
    }

    #[test]
    fn failed_upload_persists_nothing() {
        let catalog = catalog();
        let session = session();
        catalog.store().fail_uploads.set(true);
        let violin = instrument_id(&catalog, "Violin");

        let err = catalog
            .create_piece(
                &session,
                NewPiece {
                    title: "Symphony No. 5".to_string(),
                    composer: None,
                    slots: vec![slot(violin, "First Violin")],
                    file: pdf("a.pdf"),
                },
            )
            .unwrap_err();

        assert!(matches!(err, CatalogError::Storage(_)));
        assert_eq!(count(&catalog, "music_pieces"), 0);
        assert_eq!(count(&catalog, "piece_instruments"), 0);
    }

    #[test]
    fn add_slot_with_part_grows_the_piece() {
        let catalog = catalog();
        let session = session();
        let piece = symphony(&catalog, &session);
        let cello = instrument_id(&catalog, "Cello");

        let (slot, part) = catalog
            .add_slot_with_part(&session, piece.id, cello, "Principal Cello", pdf("b.pdf"))
            .unwrap();
        assert_eq!(part.slot_id, slot.id);

        let listed = catalog.list_pieces(&session).unwrap();
        assert_eq!(listed[0].slots.len(), 2);
        let cello_entry = listed[0]
            .slots
            .iter()
            .find(|entry| entry.slot.id == slot.id)
            .unwrap();
        assert_eq!(cello_entry.part.as_ref().map(|p| p.id), Some(part.id));
        assert_eq!(listed[0].uploaded_count(), 1);
    }

    #[test]
    fn failed_part_upload_leaves_empty_slot() {
        let catalog = catalog();
        let session = session();
        let piece = symphony(&catalog, &session);
        let cello = instrument_id(&catalog, "Cello");

        catalog.store().fail_uploads.set(true);
        let err = catalog
            .add_slot_with_part(&session, piece.id, cello, "Principal Cello", pdf("b.pdf"))
            .unwrap_err();
        assert!(matches!(err, CatalogError::Storage(_)));

        let listed = catalog.list_pieces(&session).unwrap();
        assert_eq!(listed[0].slots.len(), 2);
        assert_eq!(listed[0].uploaded_count(), 0);
    }

    #[test]
    fn add_slot_to_missing_piece_is_not_found() {
        let catalog = catalog();
        let session = session();
        let cello = instrument_id(&catalog, "Cello");

        let err = catalog
            .add_slot_with_part(&session, 42, cello, "Principal Cello", pdf("b.pdf"))
            .unwrap_err();
        assert!(matches!(err, CatalogError::NotFound { entity: "piece", id: 42 }));
        assert_eq!(catalog.store().len(), 0);
    }

    #[test]
    fn newest_upload_wins() {
        let catalog = catalog();
        let session = session();
        let piece = symphony(&catalog, &session);
        let slot_id = catalog.list_pieces(&session).unwrap()[0].slots[0].slot.id;

        catalog
            .upload_part_for_slot(&session, slot_id, pdf("c.pdf"))
            .unwrap();
        let latest = catalog
            .upload_part_for_slot(&session, slot_id, pdf("d.pdf"))
            .unwrap();

        let listed = catalog.list_pieces(&session).unwrap();
        assert_eq!(listed[0].piece.id, piece.id);
        assert_eq!(listed[0].slots.len(), 1);
        let shown = listed[0].slots[0].part.as_ref().unwrap();
        assert_eq!(shown.id, latest.id);
        assert_eq!(
            catalog.store().download(&shown.file_path).unwrap(),
            pdf("d.pdf").bytes
        );
        assert_eq!(count(&catalog, "instrument_parts"), 2);
    }

    #[test]
    fn upload_to_missing_slot_stores_nothing() {
        let catalog = catalog();
        let session = session();

        let err = catalog
            .upload_part_for_slot(&session, 7, pdf("c.pdf"))
            .unwrap_err();
        assert!(matches!(err, CatalogError::NotFound { entity: "slot", id: 7 }));
        assert_eq!(catalog.store().len(), 0);
    }

    #[test]
    fn deleting_a_piece_cascades_and_cleans_storage() {
        let catalog = catalog();
        let session = session();
        let piece = symphony(&catalog, &session);
        let cello = instrument_id(&catalog, "Cello");
        catalog
            .add_slot_with_part(&session, piece.id, cello, "Principal Cello", pdf("b.pdf"))
            .unwrap();
        assert_eq!(catalog.store().len(), 2);

        catalog
            .delete_piece(&session, piece.id, &piece.file_path)
            .unwrap();

        assert!(catalog.list_pieces(&session).unwrap().is_empty());
        assert_eq!(count(&catalog, "piece_instruments"), 0);
        assert_eq!(count(&catalog, "instrument_parts"), 0);
        assert_eq!(catalog.store().len(), 0);
    }

    #[test]
    fn storage_failure_does_not_block_piece_delete() {
        let catalog = catalog();
        let session = session();
        let piece = symphony(&catalog, &session);

        catalog.store().fail_removes.set(true);
        catalog
            .delete_piece(&session, piece.id, &piece.file_path)
            .unwrap();

        assert!(catalog.list_pieces(&session).unwrap().is_empty());
        assert!(catalog.store().contains(&piece.file_path));
    }

    /// Make every insert into `table` matching `condition` fail.
    fn reject_inserts(catalog: &Catalog<MemoryBucket>, table: &str, condition: &str) {
        catalog
            .conn
            .execute_batch(&format!(
                "CREATE TRIGGER reject_{table} BEFORE INSERT ON {table}
                 WHEN {condition}
                 BEGIN SELECT RAISE(ABORT, 'insert rejected'); END;"
            ))
            .unwrap();
    }

    #[test]
    fn failed_piece_insert_removes_uploaded_score() {
        let catalog = catalog();
        let session = session();
        reject_inserts(&catalog, "music_pieces", "1");

        let violin = instrument_id(&catalog, "Violin");
        let err = catalog
            .create_piece(
                &session,
                NewPiece {
                    title: "Symphony No. 5".to_string(),
                    composer: None,
                    slots: vec![slot(violin, "First Violin")],
                    file: pdf("a.pdf"),
                },
            )
            .unwrap_err();

        assert!(matches!(err, CatalogError::Persistence(_)));
        assert_eq!(count(&catalog, "music_pieces"), 0);
        assert_eq!(catalog.store().len(), 0);
    }

    #[test]
    fn failed_slot_insert_keeps_piece_and_earlier_slots() {
        let catalog = catalog();
        let session = session();
        reject_inserts(&catalog, "piece_instruments", "NEW.slot_label = 'Viola'");

        let violin = instrument_id(&catalog, "Violin");
        let viola = instrument_id(&catalog, "Viola");
        let err = catalog
            .create_piece(
                &session,
                NewPiece {
                    title: "Serenade".to_string(),
                    composer: None,
                    slots: vec![slot(violin, "First Violin"), slot(viola, "")],
                    file: pdf("serenade.pdf"),
                },
            )
            .unwrap_err();

        assert!(matches!(err, CatalogError::Persistence(_)));
        let listed = catalog.list_pieces(&session).unwrap();
        assert_eq!(listed.len(), 1);
        let labels: Vec<_> = listed[0]
            .slots
            .iter()
            .map(|entry| entry.slot.slot_label.as_str())
            .collect();
        assert_eq!(labels, ["First Violin"]);
        assert!(catalog.store().contains(&listed[0].piece.file_path));
        assert_eq!(catalog.store().len(), 1);
    }

    #[test]
    fn failed_part_insert_removes_uploaded_part() {
        let catalog = catalog();
        let session = session();
        let piece = symphony(&catalog, &session);
        let slot_id = catalog.list_pieces(&session).unwrap()[0].slots[0].slot.id;
        reject_inserts(&catalog, "instrument_parts", "1");

        let err = catalog
            .upload_part_for_slot(&session, slot_id, pdf("c.pdf"))
            .unwrap_err();

        assert!(matches!(err, CatalogError::Persistence(_)));
        assert_eq!(count(&catalog, "instrument_parts"), 0);
        assert_eq!(catalog.store().len(), 1);
        assert!(catalog.store().contains(&piece.file_path));
    }

    #[test]
    fn storage_failure_does_not_block_part_delete() {
        let catalog = catalog();
        let session = session();
        let piece = symphony(&catalog, &session);
        let cello = instrument_id(&catalog, "Cello");
        let (slot, part) = catalog
            .add_slot_with_part(&session, piece.id, cello, "Principal Cello", pdf("b.pdf"))
            .unwrap();

        catalog.store().fail_removes.set(true);
        catalog
            .delete_part(&session, part.id, slot.id, &part.file_path)
            .unwrap();

        assert_eq!(count(&catalog, "instrument_parts"), 0);
        let listed = catalog.list_pieces(&session).unwrap();
        assert!(listed[0].slots.iter().all(|entry| entry.slot.id != slot.id));
        assert!(catalog.store().contains(&part.file_path));
    }

    #[test]
    fn delete_piece_checks_existence_and_score_path() {
        let catalog = catalog();
        let session = session();
        let piece = symphony(&catalog, &session);

        let err = catalog
            .delete_piece(&session, piece.id + 1, &piece.file_path)
            .unwrap_err();
        assert!(matches!(err, CatalogError::NotFound { entity: "piece", .. }));

        let err = catalog
            .delete_piece(&session, piece.id, "music/other.pdf")
            .unwrap_err();
        assert!(matches!(err, CatalogError::Validation(_)));
        assert_eq!(catalog.list_pieces(&session).unwrap().len(), 1);
    }

    #[test]
    fn deleting_a_part_removes_its_slot() {
        let catalog = catalog();
        let session = session();
        let piece = symphony(&catalog, &session);
        let cello = instrument_id(&catalog, "Cello");
        let (slot, first) = catalog
            .add_slot_with_part(&session, piece.id, cello, "Principal Cello", pdf("b.pdf"))
            .unwrap();
        let second = catalog
            .upload_part_for_slot(&session, slot.id, pdf("b2.pdf"))
            .unwrap();

        catalog
            .delete_part(&session, second.id, slot.id, &second.file_path)
            .unwrap();

        let listed = catalog.list_pieces(&session).unwrap();
        assert!(listed[0].slots.iter().all(|entry| entry.slot.id != slot.id));
        assert_eq!(listed[0].slots.len(), 1);
        assert!(!catalog.store().contains(&first.file_path));
        assert!(!catalog.store().contains(&second.file_path));
        assert!(catalog.store().contains(&piece.file_path));
    }

    #[test]
    fn delete_part_rejects_mismatched_slot() {
        let catalog = catalog();
        let session = session();
        let piece = symphony(&catalog, &session);
        let first_violin = catalog.list_pieces(&session).unwrap()[0].slots[0].slot.id;
        let cello = instrument_id(&catalog, "Cello");
        let (_, part) = catalog
            .add_slot_with_part(&session, piece.id, cello, "Principal Cello", pdf("b.pdf"))
            .unwrap();

        let err = catalog
            .delete_part(&session, part.id, first_violin, &part.file_path)
            .unwrap_err();
        assert!(matches!(err, CatalogError::NotFound { entity: "part", .. }));
        assert_eq!(catalog.list_pieces(&session).unwrap()[0].slots.len(), 2);
    }

    #[test]
    fn other_accounts_cannot_see_or_touch_pieces() {
        let catalog = catalog();
        let owner = session();
        let stranger = Session::new("brass-section").unwrap();
        let piece = symphony(&catalog, &owner);
        let slot_id = catalog.list_pieces(&owner).unwrap()[0].slots[0].slot.id;

        assert!(catalog.list_pieces(&stranger).unwrap().is_empty());
        assert!(matches!(
            catalog.delete_piece(&stranger, piece.id, &piece.file_path),
            Err(CatalogError::NotFound { .. })
        ));
        assert!(matches!(
            catalog.upload_part_for_slot(&stranger, slot_id, pdf("x.pdf")),
            Err(CatalogError::NotFound { .. })
        ));
        assert_eq!(catalog.list_pieces(&owner).unwrap().len(), 1);
    }

    #[test]
    fn symphony_lifecycle_on_disk() {
        let root = tempfile::tempdir().unwrap();
        let bucket = LocalBucket::open(root.path(), "sheet-music").unwrap();
        let catalog = Catalog::new(db::open_in_memory().unwrap(), bucket);
        let session = session();

        let piece = symphony(&catalog, &session);
        let listed = catalog.list_pieces(&session).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].slots.len(), 1);
        assert_eq!(listed[0].slots[0].slot.slot_label, "First Violin");

        let score_path = catalog.store().path_for_url(&piece.file_url).unwrap();
        assert_eq!(std::fs::read(&score_path).unwrap(), pdf("a.pdf").bytes);

        let cello = instrument_id(&catalog, "Cello");
        let (_, part) = catalog
            .add_slot_with_part(&session, piece.id, cello, "Principal Cello", pdf("b.pdf"))
            .unwrap();
        assert_eq!(catalog.list_pieces(&session).unwrap()[0].slots.len(), 2);
        let part_path = catalog.store().path_for_url(&part.file_url).unwrap();

        catalog
            .delete_piece(&session, piece.id, &piece.file_path)
            .unwrap();
        assert!(catalog.list_pieces(&session).unwrap().is_empty());
        assert!(!score_path.exists());
        assert!(!part_path.exists());
    }
}
