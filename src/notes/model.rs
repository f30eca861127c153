use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};
use time::{macros::format_description, OffsetDateTime};
use uuid::Uuid;

/// Opaque note identifier, generated once when the note is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NoteId(Uuid);

impl NoteId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

// Declaration order is the order colors appear in the picker.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum NoteColor {
    Red,
    Yellow,
    #[default]
    Green,
    Pink,
    Purple,
}

impl NoteColor {
    /// Narrows an arbitrary string to a known color. Matching is exact and
    /// case-sensitive, so "Green" or "teal" are rejected.
    pub fn parse(value: &str) -> Option<Self> {
        value.parse().ok()
    }

    pub fn next(self) -> Self {
        let all: Vec<_> = Self::iter().collect();
        let idx = all.iter().position(|c| *c == self).unwrap_or(0);
        all[(idx + 1) % all.len()]
    }

    pub fn previous(self) -> Self {
        let all: Vec<_> = Self::iter().collect();
        let idx = all.iter().position(|c| *c == self).unwrap_or(0);
        all[(idx + all.len() - 1) % all.len()]
    }

    pub fn label(self) -> &'static str {
        match self {
            NoteColor::Red => "Red",
            NoteColor::Yellow => "Yellow",
            NoteColor::Green => "Green",
            NoteColor::Pink => "Pink",
            NoteColor::Purple => "Purple",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    pub content: String,
    /// Creation date as `YYYY-MM-DD` (UTC). Never touched by edits.
    pub date: String,
    pub color: NoteColor,
}

impl Note {
    pub fn new(title: impl Into<String>, content: impl Into<String>, color: NoteColor) -> Self {
        Self {
            id: NoteId::generate(),
            title: title.into(),
            content: content.into(),
            date: today(),
            color,
        }
    }

    pub fn has_required_fields(&self) -> bool {
        !self.title.trim().is_empty() && !self.content.trim().is_empty()
    }
}

/// Replacement values applied by an edit. Identity and creation date are not
/// part of a patch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotePatch {
    pub title: String,
    pub content: String,
    pub color: NoteColor,
}

impl NotePatch {
    pub fn is_blank(&self) -> bool {
        self.title.trim().is_empty() || self.content.trim().is_empty()
    }
}

pub fn today() -> String {
    let date = OffsetDateTime::now_utc().date();
    date.format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_else(|_| date.to_string())
}
