use crate::content::{Job, JobOutcome};
use crate::dropzone::{FileDropController, SingleFile};

/// Full-screen image dropzone with an optional upload of the held image.
#[derive(Debug, Clone, Default)]
pub struct ImagesView {
    pub zone: FileDropController<SingleFile>,
    pub path_input: String,
    uploaded_link: Option<String>,
    loading: bool,
}

impl ImagesView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn uploaded_link(&self) -> Option<&str> {
        self.uploaded_link.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn pick_typed_path(&mut self) -> std::io::Result<()> {
        let path = self.path_input.trim().to_string();
        self.zone.pick_path(&path)?;
        self.path_input.clear();
        self.uploaded_link = None;
        Ok(())
    }

    pub fn drop_payload(&mut self, text: &str) {
        let before = self.zone.current_file().cloned();
        self.zone.drop_payload(text);
        if self.zone.current_file() != before.as_ref() {
            self.uploaded_link = None;
        }
    }

    pub fn remove(&mut self) {
        self.zone.remove();
        self.uploaded_link = None;
    }

    pub fn begin_upload(&mut self) -> Option<Job> {
        if self.loading {
            return None;
        }
        let path = self.zone.current_file()?.path.clone();
        self.loading = true;
        Some(Job::UploadImage { path })
    }

    pub fn finish_upload(&mut self, outcome: &JobOutcome) {
        self.loading = false;
        if let JobOutcome::ImageUploaded { link } = outcome {
            self.uploaded_link = Some(link.clone());
        }
    }
}
