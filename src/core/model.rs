// src/core/model.rs
use serde::{Deserialize, Serialize};

use super::plugins::laravel::LaravelProject;
use super::plugins::spring::SpringProject;

/// The unified result of one analysis run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "ecosystem", rename_all = "lowercase")]
pub enum ProjectModel {
    Laravel(LaravelProject),
    Java(SpringProject),
}

impl ProjectModel {
    /// Artifact kind and how many of it were found, in report order.
    pub fn artifact_counts(&self) -> Vec<(&'static str, usize)> {
        match self {
            ProjectModel::Laravel(p) => vec![
                ("models", p.models.len()),
                ("controllers", p.controllers.len()),
                ("routes", p.route_count()),
                ("tables", p.migrations.len()),
                ("services", p.services.len()),
                ("middleware", p.middleware.len()),
                ("requests", p.requests.len()),
                ("policies", p.policies.len()),
                ("jobs", p.jobs.len()),
                ("events", p.events.len()),
                ("listeners", p.listeners.len()),
                ("graphql schemas", p.graphql_schemas.len()),
            ],
            ProjectModel::Java(p) => vec![
                ("entities", p.entities.len()),
                ("controllers", p.controllers.len()),
                ("endpoints", p.rest_endpoints.len()),
                ("services", p.services.len()),
                ("repositories", p.repositories.len()),
                ("dtos", p.dtos.len()),
                ("config files", p.configs.len()),
            ],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.artifact_counts().iter().all(|(_, count)| *count == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_is_tagged_by_ecosystem() {
        let model = ProjectModel::Java(SpringProject::default());
        let json = serde_json::to_value(&model).unwrap();
        assert_eq!(json["ecosystem"], "java");
        assert!(json["entities"].as_array().unwrap().is_empty());
        assert!(model.is_empty());
    }

    #[test]
    fn test_artifact_counts() {
        let mut project = LaravelProject::default();
        project.routes.insert("api".into(), Vec::new());
        let counts = ProjectModel::Laravel(project).artifact_counts();
        assert_eq!(counts[0], ("models", 0));
        assert!(counts.contains(&("routes", 0)));
    }
}
