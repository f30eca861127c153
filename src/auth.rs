use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::{Map, Value};

const TOKEN_KEY: &str = "token";

/// Small JSON key-value file holding client-side session entries.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.read_entries()?;
        Ok(entries
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_owned))
    }

    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.read_entries()?;
        entries.insert(key.to_owned(), Value::String(value.to_owned()));
        self.write_entries(&entries)
    }

    pub fn remove(&self, key: &str) -> Result<bool> {
        let mut entries = self.read_entries()?;
        let removed = entries.remove(key).is_some();
        if removed {
            self.write_entries(&entries)?;
        }
        Ok(removed)
    }

    pub fn token(&self) -> Result<Option<String>> {
        self.get(TOKEN_KEY)
    }

    pub fn set_token(&self, token: &str) -> Result<()> {
        self.set(TOKEN_KEY, token)
    }

    pub fn clear_token(&self) -> Result<bool> {
        self.remove(TOKEN_KEY)
    }

    fn read_entries(&self) -> Result<Map<String, Value>> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))?;
        if raw.trim().is_empty() {
            return Ok(Map::new());
        }
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", self.path.display()))
    }

    fn write_entries(&self, entries: &Map<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(entries).context("serializing key-value store")?;
        fs::write(&self.path, json).with_context(|| format!("writing {}", self.path.display()))
    }
}

/// Credentials resolved once at startup and handed to whatever talks to the
/// backend.
#[derive(Clone, Default)]
pub struct AuthContext {
    token: Option<String>,
}

impl AuthContext {
    pub fn new(token: Option<String>) -> Self {
        let token = token.filter(|t| !t.trim().is_empty());
        Self { token }
    }

    pub fn load(store: &TokenStore) -> Result<Self> {
        let token = store.token().context("reading session token")?;
        if token.is_none() {
            tracing::warn!(path = %store.path().display(), "no session token found");
        }
        Ok(Self::new(token))
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn bearer_header(&self) -> Option<String> {
        self.token.as_ref().map(|token| format!("Bearer {token}"))
    }
}

impl std::fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthContext")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
