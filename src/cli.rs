use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgGroup, Parser};

use crate::config::{Ecosystem, OutputFormat};
use crate::core::{AnalysisInput, Engine, RunOptions};

#[derive(Parser, Debug)]
#[command(name = "specscribe")]
#[command(about = "Reconstructs a specification document from a Laravel or Spring codebase")]
#[command(version)]
#[command(group(ArgGroup::new("input").required(true).args(["dir", "file"])))]
pub struct Cli {
    /// Project directory to analyze
    #[arg(short, long)]
    pub dir: Option<PathBuf>,

    /// Individual files to analyze
    #[arg(short, long, num_args = 1..)]
    pub file: Vec<PathBuf>,

    /// Target ecosystem
    #[arg(short, long, alias = "plugin", value_enum)]
    pub ecosystem: Option<Ecosystem>,

    /// Text generation backend (claude, claude-code, gemini, openai)
    #[arg(long)]
    pub ai_backend: Option<String>,

    /// Skip description generation
    #[arg(long)]
    pub no_ai: bool,

    /// Output format
    #[arg(short, long, value_enum)]
    pub output: Option<OutputFormat>,

    /// Output file path
    #[arg(long)]
    pub output_file: Option<PathBuf>,

    /// Workspace API token (falls back to NOTION_TOKEN / NOTION_API_KEY)
    #[arg(long)]
    pub notion_token: Option<String>,

    /// Destination page id (falls back to NOTION_PARENT_PAGE_ID / NOTION_PAGE_ID)
    #[arg(long)]
    pub notion_page_id: Option<String>,

    /// With notion-hier, create section pages directly under the destination
    #[arg(long)]
    pub notion_flat: bool,

    /// Path to configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    fn input(&self) -> AnalysisInput {
        match &self.dir {
            Some(dir) => AnalysisInput::Directory(dir.clone()),
            None => AnalysisInput::Files(self.file.clone()),
        }
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            input: self.input(),
            ecosystem: self.ecosystem,
            ai_backend: self.ai_backend.clone(),
            no_ai: self.no_ai,
            format: self.output,
            output_path: self.output_file.clone(),
            notion_token: self.notion_token.clone(),
            notion_page_id: self.notion_page_id.clone(),
            notion_flat: self.notion_flat,
        }
    }

    pub async fn execute(self, engine: Engine) -> Result<()> {
        let report = engine.run(self.run_options()).await?;
        for url in &report.urls {
            println!("{}", url);
        }
        Ok(())
    }
}
