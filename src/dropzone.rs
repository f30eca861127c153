//! File input shared by the content form and the image view.
//!
//! Terminals deliver a drag-and-drop as a bracketed paste of file paths, so a
//! "drop" here is a paste payload turned into files by [`parse_drop_payload`].
//! Typing a path and confirming it goes through [`FileDropController::pick`].

use std::fs;
use std::io;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedFile {
    pub path: PathBuf,
    pub name: String,
    pub size: u64,
}

impl DroppedFile {
    pub fn from_path(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let metadata = fs::metadata(path)?;
        if !metadata.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a regular file", path.display()),
            ));
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self {
            path: path.to_path_buf(),
            name,
            size: metadata.len(),
        })
    }

    pub fn size_label(&self) -> String {
        const KIB: f64 = 1024.0;
        let size = self.size as f64;
        if size >= KIB * KIB {
            format!("{:.1} MiB", size / (KIB * KIB))
        } else if size >= KIB {
            format!("{:.1} KiB", size / KIB)
        } else {
            format!("{} B", self.size)
        }
    }
}

/// How a controller merges incoming files with what it already holds.
pub trait DropPolicy {
    fn accept(held: &mut Vec<DroppedFile>, incoming: Vec<DroppedFile>);
}

/// Keeps only the first incoming file, replacing any previous one.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleFile;

impl DropPolicy for SingleFile {
    fn accept(held: &mut Vec<DroppedFile>, incoming: Vec<DroppedFile>) {
        if let Some(first) = incoming.into_iter().next() {
            held.clear();
            held.push(first);
        }
    }
}

/// Appends every incoming file.
#[derive(Debug, Clone, Copy, Default)]
pub struct MultiFile;

impl DropPolicy for MultiFile {
    fn accept(held: &mut Vec<DroppedFile>, incoming: Vec<DroppedFile>) {
        held.extend(incoming);
    }
}

#[derive(Debug, Clone)]
pub struct FileDropController<P: DropPolicy = SingleFile> {
    files: Vec<DroppedFile>,
    dragging: bool,
    _policy: PhantomData<P>,
}

impl<P: DropPolicy> Default for FileDropController<P> {
    fn default() -> Self {
        Self {
            files: Vec::new(),
            dragging: false,
            _policy: PhantomData,
        }
    }
}

impl<P: DropPolicy> FileDropController<P> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_file(&self) -> Option<&DroppedFile> {
        self.files.first()
    }

    pub fn files(&self) -> &[DroppedFile] {
        &self.files
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn drag_enter(&mut self) {
        self.dragging = true;
    }

    pub fn drag_leave(&mut self) {
        self.dragging = false;
    }

    /// An empty payload leaves the held files untouched.
    pub fn drop(&mut self, files: Vec<DroppedFile>) {
        self.dragging = false;
        if files.is_empty() {
            tracing::debug!("drop payload carried no files");
            return;
        }
        P::accept(&mut self.files, files);
    }

    pub fn drop_payload(&mut self, text: &str) {
        let files = parse_drop_payload(text);
        self.drop(files);
    }

    pub fn pick(&mut self, files: Vec<DroppedFile>) {
        if files.is_empty() {
            return;
        }
        P::accept(&mut self.files, files);
    }

    pub fn pick_path(&mut self, path: impl AsRef<Path>) -> io::Result<()> {
        let file = DroppedFile::from_path(path)?;
        self.pick(vec![file]);
        Ok(())
    }

    pub fn remove(&mut self) {
        self.files.clear();
    }
}

/// Turns a pasted drop payload into the files it names. Entries that are not
/// existing regular files are skipped.
pub fn parse_drop_payload(text: &str) -> Vec<DroppedFile> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    // A single unescaped path containing spaces.
    if let Ok(file) = DroppedFile::from_path(normalize_entry(trimmed)) {
        return vec![file];
    }
    split_payload(trimmed)
        .into_iter()
        .filter_map(|entry| DroppedFile::from_path(normalize_entry(&entry)).ok())
        .collect()
}

/// True when the payload starts with an absolute path or a `file://` URI,
/// the shapes a terminal emits for a real drag-and-drop.
pub fn names_explicit_paths(text: &str) -> bool {
    let first = text.trim_start().trim_start_matches(['\'', '"']);
    first.starts_with("file://") || Path::new(first).is_absolute()
}

fn normalize_entry(entry: &str) -> PathBuf {
    match entry.strip_prefix("file://") {
        Some(rest) => {
            let rest = rest.strip_prefix("localhost").unwrap_or(rest);
            PathBuf::from(percent_decode(rest))
        }
        None => PathBuf::from(entry),
    }
}

fn split_payload(text: &str) -> Vec<String> {
    let mut entries = Vec::new();
    let mut current = String::new();
    let mut in_entry = false;
    let mut quote: Option<char> = None;
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => current.push(ch),
            None => match ch {
                '\'' | '"' => {
                    quote = Some(ch);
                    in_entry = true;
                }
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        current.push(escaped);
                        in_entry = true;
                    }
                }
                c if c.is_whitespace() => {
                    if in_entry {
                        entries.push(std::mem::take(&mut current));
                        in_entry = false;
                    }
                }
                c => {
                    current.push(c);
                    in_entry = true;
                }
            },
        }
    }
    if in_entry {
        entries.push(current);
    }
    entries
}

fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut idx = 0;
    while idx < bytes.len() {
        if bytes[idx] == b'%' && idx + 2 < bytes.len() {
            let hex = [bytes[idx + 1], bytes[idx + 2]];
            let decoded = std::str::from_utf8(&hex)
                .ok()
                .and_then(|hex| u8::from_str_radix(hex, 16).ok());
            if let Some(value) = decoded {
                out.push(value);
                idx += 3;
                continue;
            }
        }
        out.push(bytes[idx]);
        idx += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
