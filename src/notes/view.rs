use serde::{Deserialize, Serialize};

use super::model::{Note, NoteColor, NoteId, NotePatch};
use super::store::NoteStore;

/// Which note modal is on screen. Only one can be open at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModalState {
    #[default]
    Closed,
    Creating,
    Editing(NoteId),
}

impl ModalState {
    pub fn is_open(&self) -> bool {
        !matches!(self, ModalState::Closed)
    }

    pub fn editing_id(&self) -> Option<NoteId> {
        match self {
            ModalState::Editing(id) => Some(*id),
            _ => None,
        }
    }
}

/// Whether saving an edit re-checks that title and content are non-blank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EditValidation {
    /// Edits are written as typed, blank fields included.
    #[default]
    Unvalidated,
    /// Edits follow the same non-blank rule as creation.
    Validated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotesPolicy {
    pub default_color: NoteColor,
    pub edit_validation: EditValidation,
    pub discard_draft_on_cancel: bool,
}

impl Default for NotesPolicy {
    fn default() -> Self {
        Self {
            default_color: NoteColor::Green,
            edit_validation: EditValidation::Unvalidated,
            discard_draft_on_cancel: false,
        }
    }
}

/// Form fields shared between the grid and whichever modal is open.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub title: String,
    pub content: String,
    pub select_color: NoteColor,
    pub selected_note_id: Option<NoteId>,
}

impl Draft {
    fn with_color(color: NoteColor) -> Self {
        Self {
            select_color: color,
            ..Self::default()
        }
    }

    fn from_note(note: &Note) -> Self {
        Self {
            title: note.title.clone(),
            content: note.content.clone(),
            select_color: note.color,
            selected_note_id: Some(note.id),
        }
    }

    fn patch(&self) -> NotePatch {
        NotePatch {
            title: self.title.clone(),
            content: self.content.clone(),
            color: self.select_color,
        }
    }
}

/// State behind the notes board: the store, the draft and the modal. All
/// store mutations go through the handlers here.
#[derive(Debug, Clone, Default)]
pub struct NotesView {
    store: NoteStore,
    draft: Draft,
    modal: ModalState,
    policy: NotesPolicy,
    cursor: usize,
}

impl NotesView {
    pub fn new(policy: NotesPolicy) -> Self {
        Self {
            store: NoteStore::new(),
            draft: Draft::with_color(policy.default_color),
            modal: ModalState::Closed,
            policy,
            cursor: 0,
        }
    }

    pub fn store(&self) -> &NoteStore {
        &self.store
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut Draft {
        &mut self.draft
    }

    pub fn modal(&self) -> ModalState {
        self.modal
    }

    pub fn policy(&self) -> NotesPolicy {
        self.policy
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.draft.title = title.into();
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.draft.content = content.into();
    }

    pub fn select_color(&mut self, color: NoteColor) {
        self.draft.select_color = color;
    }

    /// Applies a color given by name. Unknown names leave the draft color as
    /// it was and return `false`.
    pub fn select_color_str(&mut self, value: &str) -> bool {
        match NoteColor::parse(value) {
            Some(color) => {
                self.draft.select_color = color;
                true
            }
            None => {
                tracing::debug!(value, "ignoring unknown note color");
                false
            }
        }
    }

    pub fn open_create(&mut self) {
        if let ModalState::Editing(_) = self.modal {
            self.reset_draft();
        }
        self.modal = ModalState::Creating;
    }

    pub fn open_edit(&mut self, id: &NoteId) -> bool {
        let Some(note) = self.store.find_by_id(id) else {
            return false;
        };
        self.draft = Draft::from_note(note);
        self.modal = ModalState::Editing(*id);
        if let Some(position) = self.store.position(id) {
            self.cursor = position;
        }
        true
    }

    pub fn open_edit_at_cursor(&mut self) -> bool {
        match self.selected_note().map(|note| note.id) {
            Some(id) => self.open_edit(&id),
            None => false,
        }
    }

    /// Dismisses the open modal without touching the store.
    pub fn close_modal(&mut self) {
        match self.modal {
            ModalState::Creating if self.policy.discard_draft_on_cancel => self.reset_draft(),
            ModalState::Creating => {}
            ModalState::Editing(_) => self.reset_draft(),
            ModalState::Closed => {}
        }
        self.modal = ModalState::Closed;
    }

    /// Saves the creation draft as a new note. Returns the new id, or `None`
    /// when the draft was rejected (the modal then stays open).
    pub fn save_new(&mut self) -> Option<NoteId> {
        if self.modal != ModalState::Creating {
            return None;
        }
        let note = Note::new(
            self.draft.title.clone(),
            self.draft.content.clone(),
            self.draft.select_color,
        );
        let id = note.id;
        if !self.store.add(note) {
            return None;
        }
        tracing::info!(%id, "note created");
        self.reset_draft();
        self.modal = ModalState::Closed;
        self.cursor = self.store.len() - 1;
        Some(id)
    }

    /// Writes the draft over the note being edited.
    pub fn save_edit(&mut self) -> bool {
        let Some(id) = self.modal.editing_id() else {
            return false;
        };
        let patch = self.draft.patch();
        if self.policy.edit_validation == EditValidation::Validated && patch.is_blank() {
            tracing::debug!(%id, "rejecting blank edit");
            return false;
        }
        if !self.store.update(&id, patch) {
            return false;
        }
        tracing::info!(%id, "note updated");
        self.reset_draft();
        self.modal = ModalState::Closed;
        true
    }

    /// Deletes the note being edited and closes the modal.
    pub fn delete_editing(&mut self) -> Option<Note> {
        let id = self.modal.editing_id()?;
        let removed = self.store.remove(&id);
        if removed.is_some() {
            tracing::info!(%id, "note deleted");
        }
        self.reset_draft();
        self.modal = ModalState::Closed;
        self.clamp_cursor();
        removed
    }

    pub fn selected_note(&self) -> Option<&Note> {
        self.store.get_index(self.cursor)
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn move_cursor(&mut self, delta: isize) {
        if self.store.is_empty() {
            self.cursor = 0;
            return;
        }
        let len = self.store.len() as isize;
        let next = (self.cursor as isize + delta).clamp(0, len - 1);
        self.cursor = next as usize;
    }

    fn clamp_cursor(&mut self) {
        if self.store.is_empty() {
            self.cursor = 0;
        } else if self.cursor >= self.store.len() {
            self.cursor = self.store.len() - 1;
        }
    }

    fn reset_draft(&mut self) {
        self.draft = Draft::with_color(self.policy.default_color);
    }
}
