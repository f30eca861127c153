use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::notes::{EditValidation, NoteColor, NotesPolicy};

const APP_DOMAIN: &str = "io";
const APP_ORG: &str = "SecondBrain";
const APP_NAME: &str = "brain";

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:3000";

pub struct ConfigLoader {
    paths: ConfigPaths,
}

impl ConfigLoader {
    pub fn discover() -> Result<Self> {
        let paths = ConfigPaths::discover()?;
        Ok(Self { paths })
    }

    pub fn with_paths(paths: ConfigPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    pub fn load_or_init(&self) -> Result<AppConfig> {
        self.paths.ensure_directories()?;
        if !self.paths.config_file.exists() {
            let mut default_cfg = AppConfig::default();
            default_cfg.post_load();
            self.write_default_config(&default_cfg)?;
            return Ok(default_cfg);
        }

        self.load()
    }

    pub fn load(&self) -> Result<AppConfig> {
        let raw = fs::read_to_string(&self.paths.config_file)
            .with_context(|| format!("reading config {}", self.paths.config_file.display()))?;
        let mut cfg: AppConfig = toml::from_str(&raw).context("parsing config toml")?;
        cfg.post_load();
        Ok(cfg)
    }

    fn write_default_config(&self, cfg: &AppConfig) -> Result<()> {
        let toml = toml::to_string_pretty(cfg).context("serializing default config")?;
        if let Some(parent) = self.paths.config_file.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }
        let mut file = fs::File::create(&self.paths.config_file)
            .with_context(|| format!("creating config {}", self.paths.config_file.display()))?;
        file.write_all(toml.as_bytes())
            .context("writing default config")?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
    pub data_dir: PathBuf,
    /// Key-value file holding the session token.
    pub session_store: PathBuf,
    pub log_dir: PathBuf,
}

impl ConfigPaths {
    pub fn discover() -> Result<Self> {
        let override_config = env::var("BRAIN_CONFIG").ok().map(PathBuf::from);
        let override_data = env::var("BRAIN_DATA").ok().map(PathBuf::from);

        let project_dirs = ProjectDirs::from(APP_DOMAIN, APP_ORG, APP_NAME)
            .context("resolving XDG project directories")?;

        let config_dir = override_config
            .clone()
            .map(|p| {
                if p.is_dir() {
                    p
                } else {
                    p.parent().map(Path::to_path_buf).unwrap_or(p)
                }
            })
            .unwrap_or_else(|| project_dirs.config_dir().to_path_buf());

        let config_file = override_config
            .filter(|p| p.is_file() || p.extension().is_some())
            .unwrap_or_else(|| config_dir.join("config.toml"));

        let data_dir = override_data.unwrap_or_else(|| project_dirs.data_dir().to_path_buf());
        let log_dir = project_dirs
            .state_dir()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| data_dir.join("state"))
            .join("logs");

        Ok(Self::rooted(config_dir, config_file, data_dir, log_dir))
    }

    /// Lays out every path under explicit roots.
    pub fn rooted(
        config_dir: PathBuf,
        config_file: PathBuf,
        data_dir: PathBuf,
        log_dir: PathBuf,
    ) -> Self {
        let session_store = data_dir.join("storage.json");
        Self {
            config_dir,
            config_file,
            data_dir,
            session_store,
            log_dir,
        }
    }

    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [&self.config_dir, &self.data_dir, &self.log_dir] {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating application directory {}", dir.display()))?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub backend: BackendOptions,
    pub notes: NotesOptions,
    pub ui: UiOptions,
}

impl AppConfig {
    fn post_load(&mut self) {
        if let Ok(url) = env::var("BRAIN_BACKEND_URL") {
            if !url.trim().is_empty() {
                self.backend.base_url = url;
            }
        }
        if self.backend.base_url.trim().is_empty() {
            tracing::warn!("empty backend url in config, falling back to default");
            self.backend.base_url = DEFAULT_BACKEND_URL.to_string();
        }
        if self.backend.timeout_secs == 0 {
            tracing::warn!("backend timeout of 0s is not allowed, using 30s");
            self.backend.timeout_secs = 30;
        }
        if self.ui.tick_ms == 0 {
            self.ui.tick_ms = UiOptions::default().tick_ms;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendOptions {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for BackendOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BACKEND_URL.to_string(),
            timeout_secs: 30,
        }
    }
}

impl BackendOptions {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotesOptions {
    pub default_color: NoteColor,
    /// `unvalidated` lets an edit blank out a note; `validated` applies the
    /// creation rule to edits too.
    pub edit_validation: EditValidation,
    /// Throw away a half-written note when its modal is closed.
    pub discard_draft_on_cancel: bool,
}

impl Default for NotesOptions {
    fn default() -> Self {
        let policy = NotesPolicy::default();
        Self {
            default_color: policy.default_color,
            edit_validation: policy.edit_validation,
            discard_draft_on_cancel: policy.discard_draft_on_cancel,
        }
    }
}

impl NotesOptions {
    pub fn policy(&self) -> NotesPolicy {
        NotesPolicy {
            default_color: self.default_color,
            edit_validation: self.edit_validation,
            discard_draft_on_cancel: self.discard_draft_on_cancel,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiOptions {
    pub toast_secs: u64,
    pub tick_ms: u64,
}

impl Default for UiOptions {
    fn default() -> Self {
        Self {
            toast_secs: 4,
            tick_ms: 250,
        }
    }
}

impl UiOptions {
    pub fn toast_ttl(&self) -> Duration {
        Duration::from_secs(self.toast_secs)
    }

    pub fn tick_rate(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_paths(root: &TempDir) -> ConfigPaths {
        let base = root.path();
        let config_dir = base.join("config");
        ConfigPaths::rooted(
            config_dir.clone(),
            config_dir.join("config.toml"),
            base.join("data"),
            base.join("logs"),
        )
    }

    #[test]
    fn first_run_writes_default_config() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let loader = ConfigLoader::with_paths(temp_paths(&temp));
        let cfg = loader.load_or_init()?;
        assert!(loader.paths().config_file.exists());
        assert_eq!(cfg.notes.default_color, NoteColor::Green);
        assert_eq!(cfg.notes.edit_validation, EditValidation::Unvalidated);
        assert!(!cfg.notes.discard_draft_on_cancel);
        assert!(loader.paths().data_dir.is_dir());
        assert_eq!(
            loader.paths().session_store,
            loader.paths().data_dir.join("storage.json")
        );
        Ok(())
    }

    #[test]
    fn partial_config_fills_defaults() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let paths = temp_paths(&temp);
        paths.ensure_directories()?;
        fs::write(
            &paths.config_file,
            "[notes]\ndefault_color = \"purple\"\nedit_validation = \"validated\"\n\n[backend]\ntimeout_secs = 0\n",
        )?;
        let cfg = ConfigLoader::with_paths(paths).load()?;
        assert_eq!(cfg.notes.default_color, NoteColor::Purple);
        assert_eq!(cfg.notes.policy().edit_validation, EditValidation::Validated);
        assert_eq!(cfg.backend.timeout_secs, 30);
        assert_eq!(cfg.ui.tick_ms, 250);
        Ok(())
    }

    #[test]
    fn unknown_color_in_config_is_an_error() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let paths = temp_paths(&temp);
        paths.ensure_directories()?;
        fs::write(&paths.config_file, "[notes]\ndefault_color = \"teal\"\n")?;
        assert!(ConfigLoader::with_paths(paths).load().is_err());
        Ok(())
    }
}
