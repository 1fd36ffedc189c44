//! Reads plain-text sources from disk for ingestion.
//!
//! Only formats that are already text are read; binary formats (PDF, DOCX)
//! are labelled but extraction belongs to an outer layer.
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Error, Result};

const TEXT_EXTENSIONS: &[&str] = &["txt", "text", "md", "markdown"];

/// A text source ready to be uploaded.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub title: String,
    pub source: String,
    pub file_type: &'static str,
    pub text: String,
}

#[derive(Debug, Default)]
pub struct DataProcessor {
    limit: Option<usize>,
}

impl DataProcessor {
    pub fn new() -> Self { Self::default() }

    pub fn with_limit(limit: usize) -> Self { Self { limit: Some(limit) } }

    pub fn process_directory(&self, data_dir: &Path) -> Result<Vec<SourceFile>> {
        if !data_dir.is_dir() {
            return Err(Error::NotFound(format!("data directory {}", data_dir.display())));
        }
        let mut files = list_text_files(data_dir);
        if files.is_empty() {
            warn!(dir = %data_dir.display(), "no text files found");
            return Ok(vec![]);
        }
        if let Some(limit) = self.limit {
            if files.len() > limit { files.truncate(limit); debug!(limit, "limited source files"); }
        }
        let mut sources = Vec::with_capacity(files.len());
        for (file_index, file_path) in files.iter().enumerate() {
            debug!("Reading file {}/{}: {}", file_index + 1, files.len(), file_path.display());
            let text = read_file_content(file_path)?;
            let title = file_path
                .file_name()
                .map_or_else(|| file_path.to_string_lossy().to_string(), |n| n.to_string_lossy().to_string());
            let source = file_path.strip_prefix(data_dir).unwrap_or(file_path).to_string_lossy().to_string();
            sources.push(SourceFile { path: file_path.clone(), title, source, file_type: file_type_label(file_path), text });
        }
        Ok(sources)
    }
}

fn read_file_content(file_path: &Path) -> Result<String> {
    let bytes = fs::read(file_path)
        .map_err(|e| Error::Operation(format!("failed to read {}: {}", file_path.display(), e)))?;
    match String::from_utf8(bytes) {
        Ok(content) => Ok(content),
        Err(e) => Ok(String::from_utf8_lossy(e.as_bytes()).to_string()),
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension().and_then(|s| s.to_str()).map(str::to_ascii_lowercase)
}

/// Human-readable label for a file's format, keyed on its extension.
pub fn file_type_label(path: &Path) -> &'static str {
    match extension(path).as_deref() {
        Some("pdf") => "PDF Document",
        Some("docx" | "doc") => "Word Document",
        Some("txt" | "text") => "Text File",
        Some("md" | "markdown") => "Markdown",
        Some("html" | "htm") => "HTML Document",
        _ => "Unknown",
    }
}

pub fn list_text_files(root: &Path) -> Vec<PathBuf> {
    let mut text_files = Vec::new();
    for entry in walkdir::WalkDir::new(root).into_iter().filter_map(|e| e.ok()).filter(|e| e.file_type().is_file()) {
        let path = entry.path();
        if extension(path).is_some_and(|ext| TEXT_EXTENSIONS.contains(&ext.as_str())) { text_files.push(path.to_path_buf()); }
    }
    text_files.sort(); text_files
}
