//! Few-shot prompt builders, one per described entity kind.

use crate::core::model::ProjectModel;
use crate::core::plugins::laravel::{Controller, EloquentModel, Service};
use crate::core::plugins::spring::{JpaEntity, SpringController, SpringService};

const MODEL_EXAMPLES: &str = "\
Model: User
Table: users
Fillable: name, email, password
Relations: todos (hasMany -> Todo), profile (hasOne -> Profile)
Description: Stores user accounts and links each user to their todos.

Model: Todo
Table: todos
Fillable: title, description, completed, user_id, deadline, priority
Relations: user (belongsTo -> User), category (belongsTo -> Category)
Description: Holds a user's tasks with deadline, priority and category.";

const CONTROLLER_EXAMPLES: &str = "\
Class: TodoController
Methods: index(), store(Request), show($id), update(Request, $id), destroy($id)
Description: Handles CRUD operations and listing for todos.

Class: AuthController
Methods: login(Request), logout(), register(Request), me()
Description: Handles sign-in, registration and token management.";

const SERVICE_EXAMPLES: &str = "\
Class: TodoQueryBuilder
Methods: applyFilters(), filterByStatus(), sortByDeadline()
Description: Builds filtered and sorted todo queries.

Class: NotificationService
Methods: sendEmail(), sendSlack(), notifyDeadline()
Description: Sends deadline reminders by email and Slack.";

const ENTITY_EXAMPLES: &str = "\
Entity: UserEntity
Table: users
Fields: user_id, username, email, password, created_at
Annotations: @Entity, @Table, @Id, @GeneratedValue
Description: Persists user accounts used for authentication.

Entity: RefreshTokenEntity
Table: refresh_tokens
Fields: token_id, user_id, token, expires_at
Annotations: @Entity, @Table, @Id, @Column
Description: Persists refresh tokens so sessions can be renewed securely.";

const REST_CONTROLLER_EXAMPLES: &str = "\
Controller: TodoController
Base path: /api/todos
Endpoints: GET /api/todos, POST /api/todos, PUT /api/todos/{id}, DELETE /api/todos/{id}
Description: Exposes todo CRUD operations as a REST API.

Controller: AuthController
Base path: /auth
Endpoints: POST /auth/login, POST /auth/register, POST /auth/refresh
Description: Exposes the login, registration and token refresh flow.";

fn one_sentence(examples: &str, subject: &str, facts: &str) -> String {
    format!(
        "Examples:\n\n{examples}\n\nFollowing the examples, describe the responsibility of this {subject} in exactly one sentence.\n\n{facts}\n\nReply with the sentence only, no preamble."
    )
}

fn method_list<'a>(names: impl Iterator<Item = &'a str>) -> String {
    names.map(|n| format!("{}()", n)).collect::<Vec<_>>().join(", ")
}

pub fn model_prompt(model: &EloquentModel) -> String {
    let relations = model
        .relations
        .iter()
        .map(|r| {
            format!(
                "{} ({} -> {})",
                r.method,
                r.kind,
                r.related_model.as_deref().unwrap_or("?")
            )
        })
        .collect::<Vec<_>>()
        .join(", ");
    let facts = format!(
        "Model: {}\nTable: {}\nFillable: {}\nRelations: {}",
        model.class_name,
        model.table(),
        model.fillable.join(", "),
        relations
    );
    one_sentence(MODEL_EXAMPLES, "model", &facts)
}

pub fn controller_prompt(controller: &Controller) -> String {
    let facts = format!(
        "Class: {}\nMethods: {}",
        controller.class_name,
        method_list(controller.methods.iter().map(|m| m.name.as_str()))
    );
    one_sentence(CONTROLLER_EXAMPLES, "controller", &facts)
}

pub fn service_prompt(service: &Service) -> String {
    let facts = format!(
        "Class: {}\nMethods: {}",
        service.class_name,
        method_list(service.methods.iter().map(|m| m.name.as_str()))
    );
    one_sentence(SERVICE_EXAMPLES, "service", &facts)
}

pub fn entity_prompt(entity: &JpaEntity) -> String {
    let mut annotations: Vec<&str> = entity
        .fields
        .iter()
        .flat_map(|f| f.annotations.iter().map(String::as_str))
        .collect();
    annotations.sort_unstable();
    annotations.dedup();

    let facts = format!(
        "Entity: {}\nTable: {}\nFields: {}\nAnnotations: {}",
        entity.name,
        entity.table,
        entity.fields.iter().map(|f| f.name.as_str()).collect::<Vec<_>>().join(", "),
        annotations.iter().map(|a| format!("@{}", a)).collect::<Vec<_>>().join(", ")
    );
    one_sentence(ENTITY_EXAMPLES, "entity", &facts)
}

pub fn rest_controller_prompt(controller: &SpringController) -> String {
    let endpoints = controller
        .endpoints
        .iter()
        .take(5)
        .map(|e| format!("{} {}", e.method, e.path))
        .collect::<Vec<_>>()
        .join(", ");
    let facts = format!(
        "Controller: {}\nBase path: {}\nEndpoints: {}",
        controller.name,
        if controller.base_path.is_empty() { "/" } else { &controller.base_path },
        endpoints
    );
    one_sentence(REST_CONTROLLER_EXAMPLES, "controller", &facts)
}

pub fn spring_service_prompt(service: &SpringService) -> String {
    let facts = format!(
        "Class: {}\nMethods: {}",
        service.name,
        method_list(service.methods.iter().map(|m| m.name.as_str()))
    );
    one_sentence(SERVICE_EXAMPLES, "service", &facts)
}

/// Ask for a JSON summary of the whole application.
pub fn project_summary_prompt(model: &ProjectModel) -> String {
    let (framework, facts, hints) = match model {
        ProjectModel::Laravel(p) => {
            let names: Vec<&str> = p.models.iter().map(|m| m.class_name.as_str()).collect();
            let facts = format!(
                "- Models: {} ({})\n- Controllers: {}\n- Routes: {}\n- Tables: {}\n- Services: {}\n- GraphQL API: {} ({} query resolvers, {} mutation resolvers)",
                p.models.len(),
                if names.is_empty() { "none".to_string() } else { names.join(", ") },
                p.controllers.len(),
                p.route_count(),
                p.migrations.len(),
                p.services.len(),
                if p.has_graphql() { "yes" } else { "no" },
                p.graphql_resolvers.queries.len(),
                p.graphql_resolvers.mutations.len(),
            );
            let hints = "Infer the business domain from the model names. A GraphQL API suggests a backend for a SPA or mobile client. Services suggest business logic separated from controllers.";
            ("Laravel", facts, hints)
        }
        ProjectModel::Java(p) => {
            let names: Vec<&str> = p.entities.iter().map(|e| e.name.as_str()).collect();
            let facts = format!(
                "- Entities: {} ({})\n- Controllers: {}\n- Services: {}\n- REST endpoints: {}",
                p.entities.len(),
                if names.is_empty() { "none".to_string() } else { names.join(", ") },
                p.controllers.len(),
                p.services.len(),
                p.rest_endpoints.len(),
            );
            let hints = "Infer the business domain from the entity names. The REST surface suggests which clients the backend serves.";
            ("Spring Boot", facts, hints)
        }
    };

    format!(
        r#"You are a technical writer documenting a {framework} application.
The data below was extracted from the application's source code. Describe the application only; do not mention tools, code analysis or AI.

## Extracted facts
{facts}

## Hints
{hints}

## Output
Reply with a single JSON object and nothing else:
{{"overview": "2-3 sentences on what the application does and which problem it solves",
  "features": ["3 to 5 short noun phrases naming main features"],
  "characteristics": ["3 to 5 short notes on architecture, API design and security"]}}"#
    )
}
