//! Loads plain-text documents from a directory tree.

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::chunking::Chunker;
use crate::error::Error;
use crate::types::{Chunk, Meta};

#[derive(Debug, Clone, PartialEq)]
pub struct SourceDocument {
    /// Path relative to the data root with `/` separators; the identity
    /// chunks and point ids are derived from.
    pub source: String,
    pub path: PathBuf,
    /// Parent directory relative to the data root, or `misc` at the top level.
    pub category: String,
    pub text: String,
}

pub struct DataProcessor {
    extensions: Vec<String>,
}

impl Default for DataProcessor {
    fn default() -> Self {
        Self { extensions: vec!["txt".into(), "md".into()] }
    }
}

impl DataProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_extensions<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { extensions: extensions.into_iter().map(Into::into).collect() }
    }

    pub fn load_directory(&self, data_dir: &Path) -> Result<Vec<SourceDocument>> {
        self.load_directory_limited(data_dir, usize::MAX)
    }

    pub fn load_directory_limited(&self, data_dir: &Path, limit: usize) -> Result<Vec<SourceDocument>> {
        if !data_dir.is_dir() {
            return Err(Error::NotFound(format!("data directory {}", data_dir.display())).into());
        }
        let mut files = self.list_files(data_dir);
        if files.len() > limit {
            files.truncate(limit);
            info!(limit, "limited to first files");
        }
        let mut docs = Vec::with_capacity(files.len());
        for (i, path) in files.iter().enumerate() {
            debug!(file = %path.display(), n = i + 1, of = files.len(), "reading");
            docs.push(SourceDocument {
                source: relative_source(path, data_dir),
                category: facet_from_path(path, data_dir),
                text: read_lossy(path)?,
                path: path.clone(),
            });
        }
        info!(documents = docs.len(), dir = %data_dir.display(), "loaded documents");
        Ok(docs)
    }

    /// Loads and chunks every document under `data_dir`.
    pub fn process_directory(&self, data_dir: &Path, chunker: &Chunker) -> Result<Vec<Chunk>> {
        let docs = self.load_directory(data_dir)?;
        let mut all_chunks = Vec::new();
        for doc in &docs {
            let mut extra = Meta::new();
            extra.insert("path".into(), doc.path.to_string_lossy().into_owned().into());
            extra.insert("category".into(), doc.category.clone().into());
            all_chunks.extend(chunker.chunk_document(&doc.source, &doc.text, &extra));
        }
        info!(files = docs.len(), chunks = all_chunks.len(), "processed directory");
        Ok(all_chunks)
    }

    fn list_files(&self, root: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.path().to_path_buf())
            .filter(|p| {
                p.extension()
                    .and_then(|s| s.to_str())
                    .is_some_and(|ext| self.extensions.iter().any(|x| x.eq_ignore_ascii_case(ext)))
            })
            .collect();
        files.sort();
        files
    }
}

fn read_lossy(path: &Path) -> Result<String> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(_) => Ok(String::from_utf8_lossy(&fs::read(path)?).into_owned()),
    }
}

fn relative_source(path: &Path, data_dir: &Path) -> String {
    let relative = path.strip_prefix(data_dir).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn facet_from_path(path: &Path, data_dir: &Path) -> String {
    let relative = path.strip_prefix(data_dir).unwrap_or(path);
    match relative.parent().and_then(|p| p.to_str()) {
        Some(facet) if !facet.is_empty() => facet.to_string(),
        _ => "misc".to_string(),
    }
}
