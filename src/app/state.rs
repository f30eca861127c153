use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use unicode_segmentation::UnicodeSegmentation;

use crate::content::{ContentField, ContentForm, Job, JobOutcome, CONTENT_ADDED};
use crate::dropzone::{names_explicit_paths, parse_drop_payload};
use crate::images::ImagesView;
use crate::notes::{ModalState, NotesPolicy, NotesView};
use crate::notify::Toasts;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Notes,
    Images,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteField {
    Title,
    Content,
    Color,
}

impl NoteField {
    fn next(self) -> Self {
        match self {
            NoteField::Title => NoteField::Content,
            NoteField::Content => NoteField::Color,
            NoteField::Color => NoteField::Title,
        }
    }

    fn previous(self) -> Self {
        match self {
            NoteField::Title => NoteField::Color,
            NoteField::Content => NoteField::Title,
            NoteField::Color => NoteField::Content,
        }
    }
}

/// What the event loop has to do after a key or paste was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    None,
    Quit,
    Run(Job),
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub screen: Screen,
    pub notes: NotesView,
    pub note_field: NoteField,
    pub content: ContentForm,
    pub content_open: bool,
    pub images: ImagesView,
    pub toasts: Toasts,
    pub status_message: Option<String>,
    pub signed_in: bool,
}

impl AppState {
    pub fn new(policy: NotesPolicy, toast_ttl: Duration, signed_in: bool) -> Self {
        Self {
            screen: Screen::Notes,
            notes: NotesView::new(policy),
            note_field: NoteField::Title,
            content: ContentForm::new(),
            content_open: false,
            images: ImagesView::new(),
            toasts: Toasts::new(toast_ttl),
            status_message: None,
            signed_in,
        }
    }

    pub fn set_status_message<S: Into<String>>(&mut self, message: Option<S>) {
        self.status_message = message.map(Into::into);
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Effect {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Effect::Quit;
        }
        if self.content_open {
            return self.handle_content_key(key);
        }
        if self.notes.modal().is_open() {
            self.handle_note_modal_key(key);
            return Effect::None;
        }
        if key.code == KeyCode::Tab {
            self.toggle_screen();
            return Effect::None;
        }
        match self.screen {
            Screen::Notes => self.handle_grid_key(key),
            Screen::Images => self.handle_images_key(key),
        }
    }

    /// Bracketed paste. A payload naming files is treated as a drop onto
    /// whichever dropzone is visible; anything else is typed into the
    /// focused field. In the content form a relative name only counts as a
    /// drop while the image field has focus.
    pub fn handle_paste(&mut self, text: &str) {
        if self.content_open {
            let as_drop =
                self.content.focus() == ContentField::Image || names_explicit_paths(text);
            let files = if as_drop {
                parse_drop_payload(text)
            } else {
                Vec::new()
            };
            if files.is_empty() {
                insert_text(self.content.focused_mut(), text, false);
            } else {
                self.content.image.drop(files);
                self.set_status_message(Some("Image attached"));
            }
            return;
        }
        if self.notes.modal().is_open() {
            match self.note_field {
                NoteField::Title => insert_text(&mut self.notes.draft_mut().title, text, false),
                NoteField::Content => {
                    insert_text(&mut self.notes.draft_mut().content, text, true)
                }
                NoteField::Color => {
                    if !self.notes.select_color_str(text.trim()) {
                        self.set_status_message(Some(format!("Unknown color '{}'", text.trim())));
                    }
                }
            }
            return;
        }
        if self.screen == Screen::Images {
            if parse_drop_payload(text).is_empty() {
                insert_text(&mut self.images.path_input, text, false);
            } else {
                self.images.drop_payload(text);
            }
        }
    }

    pub fn apply_outcome(&mut self, outcome: JobOutcome) {
        match &outcome {
            JobOutcome::ContentCreated => {
                self.content.finish_submit(&outcome);
                self.toasts.success(CONTENT_ADDED);
            }
            JobOutcome::ContentUnconfirmed { status } => {
                self.content.finish_submit(&outcome);
                self.toasts.info(format!("Server answered {status}"));
            }
            JobOutcome::ContentFailed { message } => {
                self.content.finish_submit(&outcome);
                self.toasts.error(message.clone());
            }
            JobOutcome::ImageUploaded { .. } => {
                self.images.finish_upload(&outcome);
                self.toasts.success("Image uploaded");
            }
            JobOutcome::ImageFailed { message } => {
                self.images.finish_upload(&outcome);
                self.toasts.error(message.clone());
            }
        }
    }

    /// The image screen is one big dropzone, so showing it arms the drop
    /// highlight and leaving it clears it.
    fn toggle_screen(&mut self) {
        self.screen = self.screen.other();
        match self.screen {
            Screen::Images => self.images.zone.drag_enter(),
            Screen::Notes => self.images.zone.drag_leave(),
        }
        self.status_message = None;
    }

    fn handle_grid_key(&mut self, key: KeyEvent) -> Effect {
        if key
            .modifiers
            .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER)
        {
            return Effect::None;
        }
        match key.code {
            KeyCode::Char('q') => return Effect::Quit,
            KeyCode::Char('a') => {
                self.notes.open_create();
                self.note_field = NoteField::Title;
                self.set_status_message(Some("Ctrl-s save • Esc close • Tab next field"));
            }
            KeyCode::Char('e') | KeyCode::Enter => {
                if self.notes.open_edit_at_cursor() {
                    self.note_field = NoteField::Title;
                    self.set_status_message(Some(
                        "Ctrl-s save changes • Ctrl-d delete • Esc close",
                    ));
                }
            }
            KeyCode::Char('c') => {
                self.content_open = true;
                if self.content.focus() == ContentField::Image {
                    self.content.image.drag_enter();
                }
                self.set_status_message(Some("Ctrl-s save content • Esc close"));
            }
            KeyCode::Char('j') | KeyCode::Char('l') | KeyCode::Down | KeyCode::Right => {
                self.notes.move_cursor(1)
            }
            KeyCode::Char('k') | KeyCode::Char('h') | KeyCode::Up | KeyCode::Left => {
                self.notes.move_cursor(-1)
            }
            _ => {}
        }
        Effect::None
    }

    fn handle_note_modal_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => {
                self.notes.close_modal();
                self.set_status_message(None::<String>);
            }
            KeyCode::Char('s') if ctrl => self.save_note_modal(),
            KeyCode::Char('d') if ctrl => {
                if let Some(note) = self.notes.delete_editing() {
                    self.set_status_message(Some(format!("Deleted \"{}\"", note.title)));
                }
            }
            KeyCode::Tab => self.note_field = self.note_field.next(),
            KeyCode::BackTab => self.note_field = self.note_field.previous(),
            KeyCode::Char('p') if ctrl => {
                let color = self.notes.draft().select_color.previous();
                self.notes.select_color(color);
            }
            KeyCode::Char('n') if ctrl => {
                let color = self.notes.draft().select_color.next();
                self.notes.select_color(color);
            }
            KeyCode::Left if self.note_field == NoteField::Color => {
                let color = self.notes.draft().select_color.previous();
                self.notes.select_color(color);
            }
            KeyCode::Right if self.note_field == NoteField::Color => {
                let color = self.notes.draft().select_color.next();
                self.notes.select_color(color);
            }
            KeyCode::Enter => match self.note_field {
                NoteField::Title => self.note_field = NoteField::Content,
                NoteField::Content => self.notes.draft_mut().content.push('\n'),
                NoteField::Color => self.save_note_modal(),
            },
            KeyCode::Backspace => match self.note_field {
                NoteField::Title => pop_grapheme(&mut self.notes.draft_mut().title),
                NoteField::Content => pop_grapheme(&mut self.notes.draft_mut().content),
                NoteField::Color => {}
            },
            KeyCode::Char(ch)
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER) =>
            {
                match self.note_field {
                    NoteField::Title => self.notes.draft_mut().title.push(ch),
                    NoteField::Content => self.notes.draft_mut().content.push(ch),
                    NoteField::Color => {}
                }
            }
            _ => {}
        }
    }

    fn save_note_modal(&mut self) {
        match self.notes.modal() {
            ModalState::Creating => {
                if self.notes.save_new().is_some() {
                    self.set_status_message(Some("Note added"));
                } else {
                    self.set_status_message(Some("Title and content are required"));
                }
            }
            ModalState::Editing(_) => {
                if self.notes.save_edit() {
                    self.set_status_message(Some("Note updated"));
                } else {
                    self.set_status_message(Some("Title and content are required"));
                }
            }
            ModalState::Closed => {}
        }
    }

    fn handle_content_key(&mut self, key: KeyEvent) -> Effect {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => {
                self.content_open = false;
                self.content.image.drag_leave();
                self.set_status_message(None::<String>);
            }
            KeyCode::Char('s') if ctrl => {
                if let Some(job) = self.content.begin_submit() {
                    return Effect::Run(job);
                }
            }
            KeyCode::Char('x') if ctrl && self.content.focus() == ContentField::Image => {
                self.content.image.remove();
            }
            KeyCode::Tab => self.content.focus_next(),
            KeyCode::BackTab => self.content.focus_previous(),
            KeyCode::Enter => match self.content.focus() {
                ContentField::Image => {
                    if let Err(err) = self.content.pick_typed_path() {
                        self.toasts.error(format!("Cannot use that file: {err}"));
                    }
                }
                ContentField::Description => self.content.description.push('\n'),
                _ => self.content.focus_next(),
            },
            KeyCode::Backspace => pop_grapheme(self.content.focused_mut()),
            KeyCode::Char(ch)
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER) =>
            {
                self.content.focused_mut().push(ch);
            }
            _ => {}
        }
        Effect::None
    }

    fn handle_images_key(&mut self, key: KeyEvent) -> Effect {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('u') if ctrl => {
                if let Some(job) = self.images.begin_upload() {
                    return Effect::Run(job);
                }
                if self.images.zone.current_file().is_none() {
                    self.set_status_message(Some("Drop or pick an image first"));
                }
            }
            KeyCode::Char('x') if ctrl => self.images.remove(),
            KeyCode::Enter => {
                if let Err(err) = self.images.pick_typed_path() {
                    self.toasts.error(format!("Cannot use that file: {err}"));
                }
            }
            KeyCode::Esc => self.images.path_input.clear(),
            KeyCode::Backspace => pop_grapheme(&mut self.images.path_input),
            KeyCode::Char(ch)
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER) =>
            {
                self.images.path_input.push(ch);
            }
            _ => {}
        }
        Effect::None
    }
}

impl Screen {
    fn other(self) -> Self {
        match self {
            Screen::Notes => Screen::Images,
            Screen::Images => Screen::Notes,
        }
    }
}

fn pop_grapheme(text: &mut String) {
    if let Some((idx, _)) = text.grapheme_indices(true).next_back() {
        text.truncate(idx);
    }
}

fn insert_text(target: &mut String, text: &str, multiline: bool) {
    if multiline {
        target.push_str(&text.replace("\r\n", "\n").replace('\r', "\n"));
    } else {
        target.extend(text.chars().filter(|c| *c != '\n' && *c != '\r'));
    }
}
