use once_cell::sync::Lazy;
use regex::Regex;
use strum::{EnumIter, IntoEnumIterator};

use crate::api::ContentPayload;
use crate::dropzone::{FileDropController, SingleFile};

pub mod submit;

pub use submit::{execute, Job, JobOutcome, SubmissionRunner};

pub const CONTENT_ADDED: &str = "Content added successfully";
pub const CONTENT_FAILED: &str = "Failed to add content!";
pub const IMAGE_UPLOAD_FAILED: &str = "Image upload failed!";

static TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"#?([^\s,#]+)").expect("tag pattern compiles"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum ContentField {
    Title,
    Link,
    Brain,
    Tags,
    Description,
    Image,
}

impl ContentField {
    pub fn label(self) -> &'static str {
        match self {
            ContentField::Title => "Title your brain",
            ContentField::Link => "Paste your link",
            ContentField::Brain => "What brain is it?",
            ContentField::Tags => "Tags",
            ContentField::Description => "Describe your brain notes",
            ContentField::Image => "Image",
        }
    }

    pub fn placeholder(self) -> &'static str {
        match self {
            ContentField::Title => "Vibe coding",
            ContentField::Link => "https://...",
            ContentField::Brain => "Youtube, Github and others",
            ContentField::Tags => "#vibe,#grind,#fun",
            ContentField::Description => "Vibing the flow of the music",
            ContentField::Image => "Type a path and press Enter, or drop a file",
        }
    }

    fn step(self, forward: bool) -> Self {
        let all: Vec<_> = Self::iter().collect();
        let idx = all.iter().position(|f| *f == self).unwrap_or(0);
        let next = if forward {
            (idx + 1) % all.len()
        } else {
            (idx + all.len() - 1) % all.len()
        };
        all[next]
    }
}

/// The add-content modal: bookmark fields, an image dropzone and the
/// submission flag.
#[derive(Debug, Clone)]
pub struct ContentForm {
    pub title: String,
    pub link: String,
    pub tags: String,
    pub brain: String,
    pub description: String,
    pub image: FileDropController<SingleFile>,
    /// Path typed into the image field, applied with [`ContentForm::pick_typed_path`].
    pub image_path: String,
    focus: ContentField,
    loading: bool,
}

impl Default for ContentForm {
    fn default() -> Self {
        Self {
            title: String::new(),
            link: String::new(),
            tags: String::new(),
            brain: String::new(),
            description: String::new(),
            image: FileDropController::new(),
            image_path: String::new(),
            focus: ContentField::Title,
            loading: false,
        }
    }
}

impl ContentForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn focus(&self) -> ContentField {
        self.focus
    }

    pub fn focus_next(&mut self) {
        self.set_focus(self.focus.step(true));
    }

    pub fn focus_previous(&mut self) {
        self.set_focus(self.focus.step(false));
    }

    /// Moving onto the image field arms the dropzone highlight, moving off
    /// clears it.
    pub fn set_focus(&mut self, field: ContentField) {
        if field == self.focus {
            return;
        }
        if self.focus == ContentField::Image {
            self.image.drag_leave();
        }
        if field == ContentField::Image {
            self.image.drag_enter();
        }
        self.focus = field;
    }

    pub fn field_mut(&mut self, field: ContentField) -> &mut String {
        match field {
            ContentField::Title => &mut self.title,
            ContentField::Link => &mut self.link,
            ContentField::Brain => &mut self.brain,
            ContentField::Tags => &mut self.tags,
            ContentField::Description => &mut self.description,
            ContentField::Image => &mut self.image_path,
        }
    }

    pub fn field(&self, field: ContentField) -> &str {
        match field {
            ContentField::Title => &self.title,
            ContentField::Link => &self.link,
            ContentField::Brain => &self.brain,
            ContentField::Tags => &self.tags,
            ContentField::Description => &self.description,
            ContentField::Image => &self.image_path,
        }
    }

    pub fn focused_mut(&mut self) -> &mut String {
        self.field_mut(self.focus)
    }

    pub fn pick_typed_path(&mut self) -> std::io::Result<()> {
        let path = self.image_path.trim().to_string();
        self.image.pick_path(&path)?;
        self.image_path.clear();
        Ok(())
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn tag_chips(&self) -> Vec<String> {
        tag_chips(&self.tags)
    }

    /// Marks the form as submitting and hands back the request to send.
    /// Returns `None` while a previous submission is still running.
    pub fn begin_submit(&mut self) -> Option<Job> {
        if self.loading {
            return None;
        }
        self.loading = true;
        Some(Job::AddContent {
            payload: ContentPayload {
                title: self.title.clone(),
                link: self.link.clone(),
                tags: self.tags.clone(),
                brain: self.brain.clone(),
                description: self.description.clone(),
                image: None,
            },
            image: self.image.current_file().map(|file| file.path.clone()),
        })
    }

    /// Clears the loading flag whatever the outcome. A created response also
    /// resets the fields.
    pub fn finish_submit(&mut self, outcome: &JobOutcome) {
        self.loading = false;
        if matches!(outcome, JobOutcome::ContentCreated) {
            self.reset_fields();
        }
    }

    fn reset_fields(&mut self) {
        self.title.clear();
        self.link.clear();
        self.tags.clear();
        self.brain.clear();
        self.description.clear();
        self.image_path.clear();
        self.image.remove();
    }
}

/// Splits a free-form tag string such as `#vibe,#grind fun` into chips.
pub fn tag_chips(raw: &str) -> Vec<String> {
    TAG_PATTERN
        .captures_iter(raw)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}
