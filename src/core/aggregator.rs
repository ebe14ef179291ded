// src/core/aggregator.rs
//! Collects a project's documents and runs the ecosystem plugin over them.

use std::path::PathBuf;

use tracing::info;

use super::documents::{find_project_root, DocumentCollector, SourceDocument};
use super::model::ProjectModel;
use super::plugins::FrameworkPlugin;
use crate::error::{Result, SpecError};

/// What the user pointed the tool at
#[derive(Debug, Clone)]
pub enum AnalysisInput {
    Directory(PathBuf),
    Files(Vec<PathBuf>),
}

impl AnalysisInput {
    /// Fail with `MissingInput` for the first path that does not exist.
    pub fn validate(&self) -> Result<()> {
        match self {
            AnalysisInput::Directory(dir) => {
                if !dir.is_dir() {
                    return Err(SpecError::MissingInput(dir.clone()));
                }
            }
            AnalysisInput::Files(files) => {
                if files.is_empty() {
                    return Err(SpecError::Config("no input files given".to_string()));
                }
                if let Some(missing) = files.iter().find(|f| !f.exists()) {
                    return Err(SpecError::MissingInput(missing.clone()));
                }
            }
        }
        Ok(())
    }
}

pub struct Analysis {
    pub root: PathBuf,
    pub documents: Vec<SourceDocument>,
    pub model: ProjectModel,
}

pub struct Aggregator<'a> {
    plugin: &'a dyn FrameworkPlugin,
    extra_skips: Vec<String>,
}

impl<'a> Aggregator<'a> {
    pub fn new(plugin: &'a dyn FrameworkPlugin, extra_skips: &[String]) -> Self {
        Self { plugin, extra_skips: extra_skips.to_vec() }
    }

    fn project_root(&self, input: &AnalysisInput) -> PathBuf {
        match input {
            AnalysisInput::Directory(dir) => dir.canonicalize().unwrap_or_else(|_| dir.clone()),
            AnalysisInput::Files(files) => files
                .first()
                .map(|first| find_project_root(first, self.plugin.root_markers()))
                .unwrap_or_default(),
        }
    }

    pub fn analyze(&self, input: &AnalysisInput) -> Result<Analysis> {
        input.validate()?;

        let root = self.project_root(input);
        let collector = DocumentCollector::new(self.plugin.file_extensions(), &self.extra_skips);
        let documents = match input {
            AnalysisInput::Directory(_) => collector.collect_directory(&root),
            AnalysisInput::Files(files) => collector.collect_files(&root, files),
        };
        info!(
            "Analyzing {} {} documents under {}",
            documents.len(),
            self.plugin.ecosystem_name(),
            root.display()
        );

        let model = self.plugin.analyze(&documents);
        for (kind, count) in model.artifact_counts() {
            if count > 0 {
                info!("  {}: {}", kind, count);
            }
        }

        Ok(Analysis { root, documents, model })
    }
}
