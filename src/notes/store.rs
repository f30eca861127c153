use indexmap::IndexMap;

use super::model::{Note, NoteId, NotePatch};

/// Ordered, in-memory collection of notes for the current session.
///
/// Iteration yields notes in insertion order. Ids are unique; the map keyed by
/// `NoteId` is what guarantees it.
#[derive(Debug, Clone, Default)]
pub struct NoteStore {
    notes: IndexMap<NoteId, Note>,
}

impl NoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `note` unless its title or content is blank after trimming.
    pub fn add(&mut self, note: Note) -> bool {
        if !note.has_required_fields() {
            tracing::debug!("rejecting note with blank title or content");
            return false;
        }
        if self.notes.contains_key(&note.id) {
            tracing::warn!(id = %note.id, "note id already present, ignoring add");
            return false;
        }
        self.notes.insert(note.id, note);
        true
    }

    /// Overwrites title, content and color of the matching note. The id and
    /// creation date are left alone. Patches are applied as given.
    pub fn update(&mut self, id: &NoteId, patch: NotePatch) -> bool {
        match self.notes.get_mut(id) {
            Some(note) => {
                note.title = patch.title;
                note.content = patch.content;
                note.color = patch.color;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: &NoteId) -> Option<Note> {
        self.notes.shift_remove(id)
    }

    pub fn find_by_id(&self, id: &NoteId) -> Option<&Note> {
        self.notes.get(id)
    }

    pub fn get_index(&self, index: usize) -> Option<&Note> {
        self.notes.get_index(index).map(|(_, note)| note)
    }

    pub fn position(&self, id: &NoteId) -> Option<usize> {
        self.notes.get_index_of(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Note> {
        self.notes.values()
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}
