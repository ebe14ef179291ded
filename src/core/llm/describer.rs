//! Sequential description pass over the notable entities of a project.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::generator::TextGenerator;
use super::prompts;
use crate::core::model::ProjectModel;
use crate::core::retry::{with_retry, RetryPolicy};
use crate::error::Result;

pub const PROJECT_SUMMARY_KEY: &str = "project_summary";

/// Generated text keyed by `project_summary`, `model_<Class>`, `controller_<Class>`,
/// `service_<Class>` or `entity_<Class>`
pub type Descriptions = BTreeMap<String, String>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectSummary {
    pub overview: String,
    pub features: Vec<String>,
    pub characteristics: Vec<String>,
}

impl ProjectSummary {
    pub fn to_markdown(&self) -> String {
        let mut out = String::from("## Summary\n\n");
        out.push_str(self.overview.trim());
        out.push('\n');

        for (title, items) in [("Main Features", &self.features), ("Technical Characteristics", &self.characteristics)] {
            if items.is_empty() {
                continue;
            }
            out.push_str(&format!("\n## {}\n\n", title));
            for item in items {
                out.push_str(&format!("- {}\n", item.trim()));
            }
        }
        out
    }
}

pub struct Describer<'a> {
    generator: &'a dyn TextGenerator,
    policy: RetryPolicy,
}

impl<'a> Describer<'a> {
    pub fn new(generator: &'a dyn TextGenerator, policy: RetryPolicy) -> Self {
        Self { generator, policy }
    }

    async fn ask(&self, operation: &str, prompt: &str) -> Result<String> {
        let generator = self.generator;
        with_retry(operation, self.policy, move || generator.generate(prompt)).await
    }

    /// Describe one entity; a failure is logged and leaves no entry behind.
    async fn describe_one(&self, descriptions: &mut Descriptions, key: String, prompt: String) {
        match self.ask(&key, &prompt).await {
            Ok(text) if !text.trim().is_empty() => {
                info!("  ✓ {}", key);
                descriptions.insert(key, text.trim().to_string());
            }
            Ok(_) => warn!("  ✗ {} skipped: empty response", key),
            Err(e) => warn!("  ✗ {} skipped: {}", key, e),
        }
    }

    async fn summarize(&self, model: &ProjectModel) -> Result<ProjectSummary> {
        let prompt = prompts::project_summary_prompt(model);
        let generator = self.generator;
        let value = with_retry(PROJECT_SUMMARY_KEY, self.policy, || generator.generate_structured(&prompt)).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Ask for every description in a fixed order, one call at a time.
    pub async fn describe(&self, model: &ProjectModel) -> Descriptions {
        info!("🤖 Generating descriptions with {}", self.generator.backend_name());
        let mut descriptions = Descriptions::new();

        match self.summarize(model).await {
            Ok(summary) => {
                info!("  ✓ {}", PROJECT_SUMMARY_KEY);
                descriptions.insert(PROJECT_SUMMARY_KEY.to_string(), summary.to_markdown());
            }
            Err(e) => warn!("  ✗ {} skipped: {}", PROJECT_SUMMARY_KEY, e),
        }

        let mut jobs: Vec<(String, String)> = Vec::new();
        match model {
            ProjectModel::Laravel(p) => {
                for m in &p.models {
                    jobs.push((format!("model_{}", m.class_name), prompts::model_prompt(m)));
                }
                for c in p.controllers.iter().filter(|c| !c.methods.is_empty()) {
                    jobs.push((format!("controller_{}", c.class_name), prompts::controller_prompt(c)));
                }
                for s in &p.services {
                    jobs.push((format!("service_{}", s.class_name), prompts::service_prompt(s)));
                }
            }
            ProjectModel::Java(p) => {
                for e in &p.entities {
                    jobs.push((format!("entity_{}", e.name), prompts::entity_prompt(e)));
                }
                for c in p.controllers.iter().filter(|c| !c.endpoints.is_empty()) {
                    jobs.push((format!("controller_{}", c.name), prompts::rest_controller_prompt(c)));
                }
                for s in &p.services {
                    jobs.push((format!("service_{}", s.name), prompts::spring_service_prompt(s)));
                }
            }
        }

        for (key, prompt) in jobs {
            self.describe_one(&mut descriptions, key, prompt).await;
        }

        info!("✅ Generated {} descriptions", descriptions.len());
        descriptions
    }
}
