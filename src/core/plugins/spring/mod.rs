// src/core/plugins/spring/mod.rs
//! Java/Spring project analysis.

mod components;
mod properties;
mod web;

pub use components::{Dto, JpaEntity, Repository, SpringService};
pub use properties::{ConfigContent, ConfigFile};
pub use web::{RestEndpoint, SpringController};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::FrameworkPlugin;
use crate::core::documents::SourceDocument;
use crate::core::model::ProjectModel;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpringProject {
    pub entities: Vec<JpaEntity>,
    pub controllers: Vec<SpringController>,
    pub services: Vec<SpringService>,
    pub repositories: Vec<Repository>,
    pub dtos: Vec<Dto>,
    pub configs: Vec<ConfigFile>,
    pub rest_endpoints: Vec<RestEndpoint>,
}

pub struct SpringPlugin;

impl SpringPlugin {
    pub fn analyze_documents(documents: &[SourceDocument]) -> SpringProject {
        let mut project = SpringProject::default();

        for doc in documents {
            if properties::is_config_file(doc) {
                project.configs.extend(properties::extract_config(doc));
                continue;
            }
            if doc.extension() != Some("java") {
                continue;
            }

            // A file lands in the first category whose shape it matches
            if let Some(entity) = components::extract_entity(doc) {
                project.entities.push(entity);
            } else if let Some(controller) = web::extract_controller(doc) {
                project.controllers.push(controller);
            } else if let Some(service) = components::extract_service(doc) {
                project.services.push(service);
            } else if let Some(repository) = components::extract_repository(doc) {
                project.repositories.push(repository);
            } else if components::is_dto_path(&doc.relative_path) {
                project.dtos.extend(components::extract_dto(doc));
            } else {
                debug!("{}: not a recognized Spring component", doc.relative_path);
            }
        }

        project.rest_endpoints = web::rest_endpoints(&project.controllers);
        project
    }
}

impl FrameworkPlugin for SpringPlugin {
    fn analyze(&self, documents: &[SourceDocument]) -> ProjectModel {
        ProjectModel::Java(Self::analyze_documents(documents))
    }

    fn file_extensions(&self) -> &[&str] {
        &["java", "properties", "yml", "yaml"]
    }

    fn root_markers(&self) -> &[&str] {
        &["pom.xml", "build.gradle", "build.gradle.kts"]
    }

    fn ecosystem_name(&self) -> &str {
        "Java/Spring"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyze_spring_documents() {
        let docs = vec![
            SourceDocument::from_text(
                "src/main/java/com/example/entity/Todo.java",
                "@Entity\npublic class Todo {\n    @Id\n    private Long id;\n    private String title;\n}",
            ),
            SourceDocument::from_text(
                "src/main/java/com/example/web/TodoController.java",
                "@RestController\n@RequestMapping(\"/todos\")\npublic class TodoController {\n    @GetMapping\n    public List<Todo> all() { return null; }\n}",
            ),
            SourceDocument::from_text(
                "src/main/java/com/example/repo/TodoRepository.java",
                "public interface TodoRepository extends JpaRepository<Todo, Long> {\n    List<Todo> findByTitle(String title);\n}",
            ),
            SourceDocument::from_text(
                "src/main/java/com/example/dto/TodoResponse.java",
                "public record TodoResponse(Long id, String title) {}",
            ),
            SourceDocument::from_text(
                "src/main/resources/application.properties",
                "spring.datasource.password=x",
            ),
            SourceDocument::from_text("src/main/java/com/example/App.java", "public class App {}"),
        ];

        let project = SpringPlugin::analyze_documents(&docs);
        assert_eq!(project.entities[0].name, "Todo");
        assert_eq!(project.controllers[0].name, "TodoController");
        assert_eq!(project.repositories[0].entity, "Todo");
        assert_eq!(project.dtos[0].fields.len(), 2);
        assert_eq!(project.configs.len(), 1);
        assert_eq!(project.rest_endpoints.len(), 1);
        assert_eq!(project.rest_endpoints[0].path, "/todos");
        assert!(project.services.is_empty());
    }
}
