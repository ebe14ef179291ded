// src/core/documents.rs
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

/// Directory names never descended into
const SKIPPED_DIRS: &[&str] = &["vendor", "node_modules", ".git", "target", "build", "storage", ".idea", ".gradle"];

/// One source file, read permissively into memory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDocument {
    pub path: PathBuf,
    /// Path relative to the project root, always with `/` separators
    pub relative_path: String,
    pub content: String,
    pub content_hash: String,
}

impl SourceDocument {
    /// Read a file, substituting undecodable bytes instead of failing.
    pub fn load(root: &Path, path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let content = String::from_utf8_lossy(&bytes).into_owned();
        let relative = path.strip_prefix(root).unwrap_or(path);
        Ok(Self::new(path.to_path_buf(), &relative.to_string_lossy(), content))
    }

    /// Build a document from text already in memory.
    pub fn from_text(relative_path: &str, content: &str) -> Self {
        Self::new(PathBuf::from(relative_path), relative_path, content.to_string())
    }

    fn new(path: PathBuf, relative: &str, content: String) -> Self {
        let content_hash = format!("{:x}", Sha256::digest(content.as_bytes()));
        Self {
            path,
            relative_path: relative.replace('\\', "/"),
            content,
            content_hash,
        }
    }

    pub fn file_name(&self) -> &str {
        self.relative_path.rsplit('/').next().unwrap_or(&self.relative_path)
    }

    /// File name without its final extension (`web` for `routes/web.php`)
    pub fn stem(&self) -> &str {
        let name = self.file_name();
        name.rsplit_once('.').map_or(name, |(stem, _)| stem)
    }

    pub fn extension(&self) -> Option<&str> {
        self.file_name().rsplit_once('.').map(|(_, ext)| ext)
    }
}

/// Gathers the documents an ecosystem cares about
pub struct DocumentCollector {
    extensions: Vec<String>,
    extra_skips: Vec<String>,
}

impl DocumentCollector {
    pub fn new(extensions: &[&str], extra_skips: &[String]) -> Self {
        Self {
            extensions: extensions.iter().map(|e| e.to_string()).collect(),
            extra_skips: extra_skips.to_vec(),
        }
    }

    fn wants(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| self.extensions.iter().any(|wanted| wanted.eq_ignore_ascii_case(ext)))
            .unwrap_or(false)
    }

    /// Walk `root` in file-name order and load every matching file.
    pub fn collect_directory(&self, root: &Path) -> Vec<SourceDocument> {
        let extra = self.extra_skips.clone();
        let mut builder = WalkBuilder::new(root);
        builder
            .hidden(false)
            .git_ignore(true)
            .sort_by_file_name(|a, b| a.cmp(b))
            .filter_entry(move |entry| {
                let is_dir = entry.file_type().map_or(false, |ft| ft.is_dir());
                if !is_dir {
                    return true;
                }
                let name = entry.file_name().to_string_lossy();
                let skipped = SKIPPED_DIRS.contains(&name.as_ref())
                    || extra.iter().any(|d| d == name.as_ref())
                    || entry.path().ends_with("bootstrap/cache");
                !skipped
            });

        let mut documents = Vec::new();
        for entry in builder.build() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!("Walk error under {}: {}", root.display(), e);
                    continue;
                }
            };
            if !entry.file_type().map_or(false, |ft| ft.is_file()) || !self.wants(entry.path()) {
                continue;
            }
            match SourceDocument::load(root, entry.path()) {
                Ok(doc) => documents.push(doc),
                Err(e) => debug!("Skipping unreadable file {}: {}", entry.path().display(), e),
            }
        }

        debug!("Collected {} documents under {}", documents.len(), root.display());
        documents
    }

    /// Load an explicit file list relative to `root`; unreadable files are skipped.
    pub fn collect_files(&self, root: &Path, files: &[PathBuf]) -> Vec<SourceDocument> {
        files
            .iter()
            .filter(|path| self.wants(path))
            .filter_map(|path| {
                let path = path.canonicalize().unwrap_or_else(|_| path.clone());
                match SourceDocument::load(root, &path) {
                    Ok(doc) => Some(doc),
                    Err(e) => {
                        debug!("Skipping unreadable file {}: {}", path.display(), e);
                        None
                    }
                }
            })
            .collect()
    }
}

/// Nearest ancestor of `file` holding one of `markers`, else its parent.
pub fn find_project_root(file: &Path, markers: &[&str]) -> PathBuf {
    let file = file.canonicalize().unwrap_or_else(|_| file.to_path_buf());
    let parent = file.parent().map(Path::to_path_buf).unwrap_or_default();

    file.ancestors()
        .skip(1)
        .find(|dir| markers.iter().any(|marker| dir.join(marker).is_file()))
        .map(Path::to_path_buf)
        .unwrap_or(parent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    #[test]
    fn test_document_names() {
        let doc = SourceDocument::from_text("routes/api.php", "<?php");
        assert_eq!(doc.file_name(), "api.php");
        assert_eq!(doc.stem(), "api");
        assert_eq!(doc.extension(), Some("php"));
        assert_eq!(doc.content_hash.len(), 64);
    }

    #[test]
    fn test_invalid_utf8_is_read_permissively() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("bad.php");
        file.write_binary(b"<?php \xff\xfe $x = 1;").unwrap();

        let doc = SourceDocument::load(temp.path(), file.path()).unwrap();
        assert!(doc.content.contains("$x = 1;"));
        assert_eq!(doc.relative_path, "bad.php");
    }

    #[test]
    fn test_collect_directory_sorted_and_filtered() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("database/migrations/2024_02_01_alter.php").write_str("<?php").unwrap();
        temp.child("database/migrations/2024_01_01_create.php").write_str("<?php").unwrap();
        temp.child("vendor/laravel/framework/Model.php").write_str("<?php").unwrap();
        temp.child("README.md").write_str("# readme").unwrap();

        let collector = DocumentCollector::new(&["php"], &[]);
        let docs = collector.collect_directory(temp.path());
        let paths: Vec<_> = docs.iter().map(|d| d.relative_path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "database/migrations/2024_01_01_create.php",
                "database/migrations/2024_02_01_alter.php",
            ]
        );
    }

    #[test]
    fn test_find_project_root_uses_marker() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("server/composer.json").write_str("{}").unwrap();
        let model = temp.child("server/app/Models/User.php");
        model.write_str("<?php").unwrap();

        let root = find_project_root(model.path(), &["composer.json"]);
        assert_eq!(root, temp.path().join("server").canonicalize().unwrap());

        let collector = DocumentCollector::new(&["php"], &[]);
        let docs = collector.collect_files(&root, &[model.path().to_path_buf()]);
        assert_eq!(docs[0].relative_path, "app/Models/User.php");
    }
}
