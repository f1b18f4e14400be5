//! Loading plain-text and Markdown files from a directory tree.

use std::path::Path;

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::document::Document;
use crate::error::{RagError, Result};

/// File extensions picked up by [`load_documents`].
pub const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "md"];

/// Load every `.txt` and `.md` file under `dir`, sorted by path.
///
/// Each document's source id is its path relative to `dir` with `/`
/// separators, and its metadata holds `path` (the full path) and
/// `extension`. Files are decoded as UTF-8, replacing invalid sequences.
/// Files with no non-whitespace content are skipped.
///
/// # Errors
///
/// Returns [`RagError::Io`] if `dir` is not a readable directory or a
/// matching file cannot be read.
pub fn load_documents(dir: impl AsRef<Path>) -> Result<Vec<Document>> {
    let root = dir.as_ref();
    if !root.is_dir() {
        return Err(RagError::io(
            root,
            std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
        ));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            RagError::io(path, e.into())
        })?;
        if entry.file_type().is_file() && is_supported(entry.path()) {
            files.push(entry.into_path());
        }
    }
    files.sort();

    let mut documents = Vec::with_capacity(files.len());
    for path in files {
        let bytes = std::fs::read(&path).map_err(|e| RagError::io(&path, e))?;
        let text = String::from_utf8_lossy(&bytes).into_owned();
        if text.trim().is_empty() {
            debug!(path = %path.display(), "skipping empty file");
            continue;
        }

        let relative = path.strip_prefix(root).unwrap_or(&path);
        let source_id = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let extension =
            path.extension().map(|ext| ext.to_string_lossy().to_lowercase()).unwrap_or_default();

        documents.push(
            Document::new(source_id, text)
                .with_metadata("path", path.display().to_string())
                .with_metadata("extension", extension),
        );
    }

    info!(dir = %root.display(), documents = documents.len(), "documents loaded");
    Ok(documents)
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SUPPORTED_EXTENSIONS.iter().any(|s| ext.eq_ignore_ascii_case(s)))
}
