//! Local fallback store: one JSON file mapping user id to an ordered list of
//! memory entries.
//!
//! Every operation loads the whole file and every mutation rewrites it
//! (temp file + rename). There is no locking; two processes writing the same
//! file can lose each other's updates.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::lexical;

/// Full on-disk contents: user id -> entries, oldest first.
pub type MemoryMap = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone)]
pub struct LocalStore {
    path: PathBuf,
}

impl LocalStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole mapping. A missing file is an empty mapping.
    pub fn load(&self) -> Result<MemoryMap> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(MemoryMap::new()),
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("failed to read memory file {}", self.path.display())
                })
            }
        };

        if contents.trim().is_empty() {
            return Ok(MemoryMap::new());
        }

        serde_json::from_str(&contents)
            .with_context(|| format!("memory file {} is not valid JSON", self.path.display()))
    }

    /// Rewrite the whole mapping atomically (tmp + rename).
    pub fn save(&self, map: &MemoryMap) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(map)?;
        let tmp_path = self.temp_path();
        std::fs::write(&tmp_path, json)
            .with_context(|| format!("failed to write temp file: {}", tmp_path.display()))?;
        std::fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("failed to replace {}", self.path.display()))?;
        Ok(())
    }

    /// Sibling written before the rename: `<path>.tmp`, never `path` itself.
    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }

    pub fn add(&self, user_id: &str, text: &str) -> Result<()> {
        self.add_all(user_id, std::iter::once(text.to_string()))
    }

    /// Append several entries with a single rewrite.
    pub fn add_all(&self, user_id: &str, texts: impl IntoIterator<Item = String>) -> Result<()> {
        let mut map = self.load()?;
        let entries = map.entry(user_id.to_string()).or_default();
        let before = entries.len();
        entries.extend(texts);
        tracing::debug!(
            user_id,
            added = entries.len() - before,
            total = entries.len(),
            "local memory appended"
        );
        self.save(&map)
    }

    pub fn search(&self, user_id: &str, query: &str, limit: usize) -> Result<Vec<String>> {
        let map = self.load()?;
        Ok(map
            .get(user_id)
            .map(|entries| lexical::rank(entries, query, limit))
            .unwrap_or_default())
    }

    pub fn list(&self, user_id: &str) -> Result<Vec<String>> {
        Ok(self.load()?.remove(user_id).unwrap_or_default())
    }

    /// Drop every entry for `user_id`. Returns how many were removed; clearing
    /// an unknown user removes nothing and leaves the file untouched.
    pub fn clear(&self, user_id: &str) -> Result<usize> {
        let mut map = self.load()?;
        match map.remove(user_id) {
            Some(removed) => {
                self.save(&map)?;
                Ok(removed.len())
            }
            None => Ok(0),
        }
    }

    pub fn users(&self) -> Result<Vec<String>> {
        Ok(self.load()?.into_keys().collect())
    }
}
