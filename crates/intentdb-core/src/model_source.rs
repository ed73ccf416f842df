//! Model sources that feed the indexer.
//!
//! `DirectoryModelSource` reads page models from `*.json` files below a root
//! directory. A file may hold a single page object or an array of pages.
//! Files are visited in path order so repeated loads yield the same sequence.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use crate::traits::ModelSource;
use crate::types::PageModel;

#[derive(Debug, Clone)]
pub struct DirectoryModelSource {
    root: PathBuf,
}

impl DirectoryModelSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn list_json_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = WalkDir::new(&self.root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "json"))
            .map(|e| e.into_path())
            .collect();
        files.sort();
        files
    }

    fn read_pages(path: &Path) -> Result<Vec<PageModel>> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read model file {}", path.display()))?;
        let value: serde_json::Value = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid JSON in {}", path.display()))?;
        let pages = if value.is_array() {
            serde_json::from_value(value)
        } else {
            serde_json::from_value(value).map(|page| vec![page])
        };
        pages.with_context(|| format!("Unexpected page model shape in {}", path.display()))
    }
}

impl ModelSource for DirectoryModelSource {
    fn load_pages(&self) -> Result<Vec<PageModel>> {
        if !self.root.is_dir() {
            anyhow::bail!(crate::error::Error::NotFound(format!(
                "model directory {}",
                self.root.display()
            )));
        }
        let mut pages = Vec::new();
        for file in self.list_json_files() {
            let loaded = Self::read_pages(&file)?;
            debug!(file = %file.display(), pages = loaded.len(), "loaded page models");
            pages.extend(loaded);
        }
        Ok(pages)
    }
}

/// Fixed set of pages held in memory; handy for embedding the engine in
/// another process that already owns the model.
#[derive(Debug, Clone, Default)]
pub struct InMemoryModelSource {
    pages: Vec<PageModel>,
}

impl InMemoryModelSource {
    pub fn new(pages: Vec<PageModel>) -> Self {
        Self { pages }
    }
}

impl ModelSource for InMemoryModelSource {
    fn load_pages(&self) -> Result<Vec<PageModel>> {
        Ok(self.pages.clone())
    }
}
