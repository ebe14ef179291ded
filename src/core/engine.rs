// src/core/engine.rs
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use super::aggregator::{Aggregator, Analysis, AnalysisInput};
use super::export::{NotionClient, WorkspaceClient, WorkspaceExporter};
use super::llm::{create_generator, Describer, Descriptions, TextGenerator};
use super::plugins::plugin_for;
use super::render::{render_json, MarkdownRenderer};
use super::retry::RetryPolicy;
use crate::config::{Config, Ecosystem, OutputFormat, WorkspaceCredentials};
use crate::error::{Result, SpecError};

/// What one invocation asked for; unset fields fall back to the config file.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub input: AnalysisInput,
    pub ecosystem: Option<Ecosystem>,
    pub ai_backend: Option<String>,
    pub no_ai: bool,
    pub format: Option<OutputFormat>,
    pub output_path: Option<PathBuf>,
    pub notion_token: Option<String>,
    pub notion_page_id: Option<String>,
    pub notion_flat: bool,
}

/// Options resolved against the config and environment, validated up front
#[derive(Debug)]
struct RunPlan {
    input: AnalysisInput,
    ecosystem: Ecosystem,
    format: OutputFormat,
    output_path: PathBuf,
    /// `None` when descriptions are disabled
    backend: Option<String>,
    credentials: Option<WorkspaceCredentials>,
    notion_flat: bool,
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub written: Vec<PathBuf>,
    pub urls: Vec<String>,
}

/// Main orchestration engine: analyze, describe, render, write, export
pub struct Engine {
    config: Config,
}

impl Engine {
    pub fn new(config: Config) -> Self {
        debug!("Loaded configuration: {:?}", config);
        Self { config }
    }

    /// Credentials are checked before the inputs, and both before any work.
    fn plan_with<F>(&self, options: RunOptions, env: F) -> Result<RunPlan>
    where
        F: Fn(&str) -> Option<String>,
    {
        let format = options.format.unwrap_or(self.config.output.format);
        let credentials = if format.is_workspace_export() {
            Some(WorkspaceCredentials::resolve_with(
                options.notion_token.as_deref(),
                options.notion_page_id.as_deref(),
                &env,
            )?)
        } else {
            None
        };

        options.input.validate()?;

        let backend = if options.no_ai || !self.config.llm.enabled {
            None
        } else {
            Some(
                options
                    .ai_backend
                    .or_else(|| env("AI_BACKEND").filter(|b| !b.trim().is_empty()))
                    .unwrap_or_else(|| self.config.llm.provider.clone()),
            )
        };

        Ok(RunPlan {
            input: options.input,
            ecosystem: options.ecosystem.unwrap_or(self.config.project.ecosystem),
            format,
            output_path: options.output_path.unwrap_or_else(|| self.config.output.path.clone()),
            backend,
            credentials,
            notion_flat: options.notion_flat,
        })
    }

    fn create_backend(&self, name: &str) -> Option<Box<dyn TextGenerator>> {
        let mut llm = self.config.llm.clone();
        llm.provider = name.to_string();
        match create_generator(&llm) {
            Ok(generator) => {
                info!("✅ Text generation enabled: {}", generator.backend_name());
                Some(generator)
            }
            Err(e) => {
                warn!("⚠️ Failed to initialize text generation: {}", e);
                warn!("Continuing without descriptions");
                None
            }
        }
    }

    pub async fn run(&self, options: RunOptions) -> Result<RunReport> {
        let plan = self.plan_with(options, |key| std::env::var(key).ok())?;

        let generator = match &plan.backend {
            Some(name) => self.create_backend(name),
            None => {
                debug!("Text generation disabled");
                None
            }
        };
        let client = plan.credentials.as_ref().map(|c| NotionClient::new(&c.token));
        let workspace = match (&client, &plan.credentials) {
            (Some(client), Some(credentials)) => {
                Some((client as &dyn WorkspaceClient, credentials.parent_page_id.as_str()))
            }
            _ => None,
        };

        self.execute(&plan, generator.as_deref(), workspace).await
    }

    async fn execute(
        &self,
        plan: &RunPlan,
        generator: Option<&dyn TextGenerator>,
        workspace: Option<(&dyn WorkspaceClient, &str)>,
    ) -> Result<RunReport> {
        info!("🚀 Generating {} output for a {} project", plan.format, plan.ecosystem);

        let plugin = plugin_for(plan.ecosystem);
        let analysis = Aggregator::new(plugin.as_ref(), &self.config.project.ignore_dirs).analyze(&plan.input)?;
        if analysis.model.is_empty() {
            warn!("No {} artifacts recognized under {}", plugin.ecosystem_name(), analysis.root.display());
        }

        let descriptions = match generator {
            Some(generator) => {
                let policy = RetryPolicy::new(self.config.llm.timeout_secs, self.config.llm.retries);
                Describer::new(generator, policy).describe(&analysis.model).await
            }
            None => Descriptions::new(),
        };

        let mut report = RunReport {
            written: write_outputs(plan.format, &plan.output_path, &analysis, &descriptions)?,
            urls: Vec::new(),
        };
        for path in &report.written {
            info!("📄 Wrote {}", path.display());
        }

        if let Some((client, parent_id)) = workspace {
            match self.export(plan, &analysis, &descriptions, client, parent_id).await {
                Ok(urls) => {
                    for url in &urls {
                        info!("🔗 {}", url);
                    }
                    report.urls = urls;
                }
                Err(e) => {
                    error!("❌ Export failed: {}", e);
                    error!("Local output kept at {}", plan.output_path.display());
                    return Err(e);
                }
            }
        }

        info!("🎉 Done");
        Ok(report)
    }

    async fn export(
        &self,
        plan: &RunPlan,
        analysis: &Analysis,
        descriptions: &Descriptions,
        client: &dyn WorkspaceClient,
        parent_id: &str,
    ) -> Result<Vec<String>> {
        let policy = RetryPolicy::new(self.config.export.timeout_secs, self.config.export.retries);
        let exporter = WorkspaceExporter::new(client, policy);
        let renderer = MarkdownRenderer::new(&analysis.model, descriptions);
        let title = output_stem(&plan.output_path);

        match plan.format {
            OutputFormat::Notion => {
                let url = exporter.upload_markdown(&renderer.render_document(), parent_id, &title).await?;
                Ok(vec![url])
            }
            OutputFormat::NotionHierarchy if plan.notion_flat => {
                let urls = exporter.upload_flat(&renderer.render_sections(), parent_id).await?;
                Ok(urls.into_iter().map(|(_, url)| url).collect())
            }
            OutputFormat::NotionHierarchy => {
                let root_title = self.config.export.root_title.clone().unwrap_or(title);
                let url = exporter.upload_hierarchy(&renderer.render_sections(), parent_id, &root_title).await?;
                Ok(vec![url])
            }
            other => Err(SpecError::Config(format!("{} is not a workspace format", other))),
        }
    }
}

fn output_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("spec")
        .to_string()
}

fn write_file(path: &Path, content: &str) -> Result<PathBuf> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    Ok(path.to_path_buf())
}

/// Write the local artifacts for `format`; workspace formats keep a single Markdown file.
fn write_outputs(
    format: OutputFormat,
    output_path: &Path,
    analysis: &Analysis,
    descriptions: &Descriptions,
) -> Result<Vec<PathBuf>> {
    let renderer = MarkdownRenderer::new(&analysis.model, descriptions);
    match format {
        OutputFormat::Markdown | OutputFormat::Notion | OutputFormat::NotionHierarchy => {
            Ok(vec![write_file(output_path, &renderer.render_document())?])
        }
        OutputFormat::MarkdownMulti => {
            let stem = output_stem(output_path);
            let dir = output_path.parent().unwrap_or_else(|| Path::new(""));
            renderer
                .render_sections()
                .into_iter()
                .map(|(section, markdown)| {
                    write_file(&dir.join(format!("{}_{}.md", stem, section.key())), &markdown)
                })
                .collect()
        }
        OutputFormat::Json => {
            let json = render_json(&analysis.model, descriptions, &analysis.documents)?;
            Ok(vec![write_file(&output_path.with_extension("json"), &json)?])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::export::{Block, CreatedPage};
    use assert_fs::prelude::*;
    use async_trait::async_trait;
    use predicates::prelude::*;
    use std::sync::Mutex;

    struct EchoGenerator;

    #[async_trait]
    impl TextGenerator for EchoGenerator {
        async fn generate(&self, prompt: &str) -> Result<String> {
            if prompt.contains("\"overview\"") {
                return Ok(r#"{"overview": "Tracks todos.", "features": [], "characteristics": []}"#.into());
            }
            Ok("Generated sentence.".into())
        }

        fn backend_name(&self) -> &str {
            "echo"
        }
    }

    #[derive(Default)]
    struct FakeWorkspace {
        fail: bool,
        titles: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl WorkspaceClient for FakeWorkspace {
        async fn create_page(
            &self,
            _parent_id: &str,
            title: &str,
            _icon: Option<&str>,
            _children: &[Block],
        ) -> Result<CreatedPage> {
            if self.fail {
                return Err(SpecError::Export("unauthorized".into()));
            }
            let mut titles = self.titles.lock().unwrap();
            titles.push(title.to_string());
            Ok(CreatedPage { id: format!("p{}", titles.len()), url: format!("https://notion.test/p{}", titles.len()) })
        }

        async fn append_blocks(&self, _page_id: &str, _children: &[Block]) -> Result<()> {
            Ok(())
        }
    }

    fn laravel_project() -> assert_fs::TempDir {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("composer.json").write_str("{}").unwrap();
        temp.child("database/migrations/2024_01_01_000000_create_todos_table.php")
            .write_str("<?php\nSchema::create('todos', function (Blueprint $table) {\n    $table->id();\n    $table->string('title');\n});\n")
            .unwrap();
        temp.child("app/Models/Todo.php")
            .write_str("<?php\nclass Todo extends Model {\n    protected $fillable = ['title'];\n}\n")
            .unwrap();
        temp.child("routes/api.php")
            .write_str("<?php\nRoute::get('/todos', [TodoController::class, 'index']);\n")
            .unwrap();
        temp
    }

    fn options(dir: &Path, format: OutputFormat, output: PathBuf) -> RunOptions {
        RunOptions {
            input: AnalysisInput::Directory(dir.to_path_buf()),
            ecosystem: Some(Ecosystem::Laravel),
            ai_backend: None,
            no_ai: true,
            format: Some(format),
            output_path: Some(output),
            notion_token: Some("secret".into()),
            notion_page_id: Some("parent".into()),
            notion_flat: false,
        }
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_credentials_are_checked_before_inputs() {
        let engine = Engine::new(Config::default());
        let mut opts = options(Path::new("/no/such/dir"), OutputFormat::Notion, PathBuf::from("spec.md"));
        opts.notion_token = None;

        let err = engine.plan_with(opts, no_env).unwrap_err();
        assert!(matches!(err, SpecError::Config(_)));

        let opts = options(Path::new("/no/such/dir"), OutputFormat::Markdown, PathBuf::from("spec.md"));
        let err = engine.plan_with(opts, no_env).unwrap_err();
        assert!(matches!(err, SpecError::MissingInput(_)));
    }

    #[test]
    fn test_backend_precedence() {
        let project = laravel_project();
        let engine = Engine::new(Config::default());
        let env = |key: &str| (key == "AI_BACKEND").then(|| "gemini".to_string());

        let mut opts = options(project.path(), OutputFormat::Markdown, PathBuf::from("spec.md"));
        opts.no_ai = false;
        assert_eq!(engine.plan_with(opts.clone(), no_env).unwrap().backend.as_deref(), Some("claude-code"));
        assert_eq!(engine.plan_with(opts.clone(), env).unwrap().backend.as_deref(), Some("gemini"));

        opts.ai_backend = Some("openai".into());
        assert_eq!(engine.plan_with(opts.clone(), env).unwrap().backend.as_deref(), Some("openai"));

        opts.no_ai = true;
        assert_eq!(engine.plan_with(opts, env).unwrap().backend, None);
    }

    #[tokio::test]
    async fn test_markdown_with_descriptions() {
        let project = laravel_project();
        let out = assert_fs::TempDir::new().unwrap();
        let engine = Engine::new(Config::default());
        let plan = engine
            .plan_with(options(project.path(), OutputFormat::Markdown, out.path().join("docs/spec.md")), no_env)
            .unwrap();

        let report = engine.execute(&plan, Some(&EchoGenerator), None).await.unwrap();

        assert_eq!(report.written, vec![out.path().join("docs/spec.md")]);
        out.child("docs/spec.md").assert(
            predicate::str::starts_with("# Laravel Project Specification")
                .and(predicate::str::contains("Tracks todos."))
                .and(predicate::str::contains("- Description: Generated sentence."))
                .and(predicate::str::contains("`/todos` → `TodoController@index`")),
        );
    }

    #[tokio::test]
    async fn test_markdown_multi_writes_one_file_per_section() {
        let project = laravel_project();
        let out = assert_fs::TempDir::new().unwrap();
        let engine = Engine::new(Config::default());
        let plan = engine
            .plan_with(options(project.path(), OutputFormat::MarkdownMulti, out.path().join("spec.md")), no_env)
            .unwrap();

        let report = engine.execute(&plan, None, None).await.unwrap();

        let names: Vec<_> = report
            .written
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec!["spec_overview.md", "spec_database.md", "spec_api.md", "spec_security.md", "spec_api-schema.md"]
        );
        out.child("spec_database.md").assert(predicate::str::contains("## Table: todos"));
        out.child("spec.md").assert(predicate::path::missing());
    }

    #[tokio::test]
    async fn test_json_output_uses_json_extension() {
        let project = laravel_project();
        let out = assert_fs::TempDir::new().unwrap();
        let engine = Engine::new(Config::default());
        let plan = engine
            .plan_with(options(project.path(), OutputFormat::Json, out.path().join("spec.md")), no_env)
            .unwrap();

        engine.execute(&plan, None, None).await.unwrap();

        let text = std::fs::read_to_string(out.path().join("spec.json")).unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["project"]["ecosystem"], "laravel");
        assert_eq!(json["project"]["migrations"][0]["name"], "todos");
        assert_eq!(json["documents"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_hierarchy_export_titles() {
        let project = laravel_project();
        let out = assert_fs::TempDir::new().unwrap();
        let engine = Engine::new(Config::default());
        let plan = engine
            .plan_with(options(project.path(), OutputFormat::NotionHierarchy, out.path().join("todo-app.md")), no_env)
            .unwrap();
        let workspace = FakeWorkspace::default();

        let report = engine.execute(&plan, None, Some((&workspace, "parent"))).await.unwrap();

        assert_eq!(report.urls, vec!["https://notion.test/p1"]);
        assert_eq!(
            *workspace.titles.lock().unwrap(),
            vec!["todo-app", "Overview", "Database", "API", "Security", "API Schema"]
        );
    }

    #[tokio::test]
    async fn test_failed_export_keeps_local_file() {
        let project = laravel_project();
        let out = assert_fs::TempDir::new().unwrap();
        let mut config = Config::default();
        config.export.retries = 0;
        let engine = Engine::new(config);
        let plan = engine
            .plan_with(options(project.path(), OutputFormat::Notion, out.path().join("spec.md")), no_env)
            .unwrap();
        let workspace = FakeWorkspace { fail: true, ..Default::default() };

        let result = engine.execute(&plan, None, Some((&workspace, "parent"))).await;

        assert!(matches!(result, Err(SpecError::Export(_))));
        out.child("spec.md").assert(predicate::path::exists());
    }

    #[test]
    fn test_output_stem() {
        assert_eq!(output_stem(Path::new("out/my-spec.md")), "my-spec");
        assert_eq!(output_stem(Path::new("")), "spec");
    }
}
