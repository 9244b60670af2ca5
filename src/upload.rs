//! Bulk folder loading: `<root>/<customer>/<file>` on disk to [`UploadedFile`]s.

use crate::error::{ClassifierError, Result};
use crate::types::UploadedFile;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

/// Read every file below `root`. Relative paths start with the root folder's own name and use
/// `/` separators, so the customer folder is always the second-to-last segment.
pub fn load_folder(root: &Path) -> Result<Vec<UploadedFile>> {
    if !root.is_dir() {
        return Err(ClassifierError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Folder not found: {}", root.display()),
        )));
    }
    let root_name = root
        .canonicalize()?
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload")
        .to_string();

    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = entry.map_err(|e| {
            ClassifierError::Io(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(String::from) else {
            tracing::warn!("Skipping non UTF-8 file name: {}", entry.path().display());
            continue;
        };
        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        let mut segments = vec![root_name.clone()];
        segments.extend(
            relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned()),
        );
        let content = fs::read(entry.path())?;
        files.push(UploadedFile::new(name, Some(segments.join("/")), content));
    }
    files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    tracing::info!("{} files loaded from folder {}", files.len(), root.display());
    Ok(files)
}
