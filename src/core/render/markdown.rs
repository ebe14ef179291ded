use crate::core::llm::{Descriptions, PROJECT_SUMMARY_KEY};
use crate::core::model::ProjectModel;
use crate::core::plugins::laravel::{LaravelProject, MethodSignature};
use crate::core::plugins::spring::{ConfigContent, SpringProject};
use crate::core::schema::TableSchema;

/// Tables every Laravel skeleton ships with; listed briefly, not detailed
const FRAMEWORK_TABLES: &[&str] = &[
    "cache",
    "cache_locks",
    "jobs",
    "job_batches",
    "failed_jobs",
    "sessions",
    "password_reset_tokens",
    "password_resets",
    "personal_access_tokens",
    "migrations",
];

/// GraphQL schema lines shown before a preview is cut
const SCHEMA_PREVIEW_LINES: usize = 20;

/// The canonical sections of a generated specification, in output order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecSection {
    Overview,
    Database,
    Api,
    Security,
    ApiSchema,
}

impl SpecSection {
    pub const ALL: [SpecSection; 5] = [
        SpecSection::Overview,
        SpecSection::Database,
        SpecSection::Api,
        SpecSection::Security,
        SpecSection::ApiSchema,
    ];

    /// File-name and page key
    pub fn key(&self) -> &'static str {
        match self {
            SpecSection::Overview => "overview",
            SpecSection::Database => "database",
            SpecSection::Api => "api",
            SpecSection::Security => "security",
            SpecSection::ApiSchema => "api-schema",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            SpecSection::Overview => "Overview",
            SpecSection::Database => "Database",
            SpecSection::Api => "API",
            SpecSection::Security => "Security",
            SpecSection::ApiSchema => "API Schema",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            SpecSection::Overview => "🗂️",
            SpecSection::Database => "🗄️",
            SpecSection::Api => "🔗",
            SpecSection::Security => "🔒",
            SpecSection::ApiSchema => "🔮",
        }
    }
}

fn code(text: &str) -> String {
    format!("`{}`", text)
}

fn code_list(items: &[String]) -> String {
    items.iter().map(|i| code(i)).collect::<Vec<_>>().join(", ")
}

fn signature(method: &MethodSignature) -> String {
    let mut sig = format!("`{}({})`", method.name, method.parameters.as_deref().unwrap_or(""));
    if let Some(note) = &method.note {
        sig.push_str(&format!(" ({})", note));
    }
    sig
}

/// Push one more `#` onto every heading outside fenced code.
fn demote_headings(markdown: &str) -> String {
    let mut in_code = false;
    markdown
        .lines()
        .map(|line| {
            if line.starts_with("```") {
                in_code = !in_code;
            }
            if !in_code && line.starts_with('#') {
                format!("#{}", line)
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Renders a project model plus its descriptions as Markdown
pub struct MarkdownRenderer<'a> {
    model: &'a ProjectModel,
    descriptions: &'a Descriptions,
}

impl<'a> MarkdownRenderer<'a> {
    pub fn new(model: &'a ProjectModel, descriptions: &'a Descriptions) -> Self {
        Self { model, descriptions }
    }

    fn framework(&self) -> &'static str {
        match self.model {
            ProjectModel::Laravel(_) => "Laravel",
            ProjectModel::Java(_) => "Spring Boot",
        }
    }

    fn describe(&self, md: &mut String, key: &str) {
        if let Some(text) = self.descriptions.get(key) {
            md.push_str(&format!("- Description: {}\n", text));
        }
    }

    /// The whole specification as one document.
    pub fn render_document(&self) -> String {
        let mut md = format!("# {} Project Specification\n\n", self.framework());
        if let Some(summary) = self.descriptions.get(PROJECT_SUMMARY_KEY) {
            md.push_str(summary.trim());
            md.push_str("\n\n");
        }
        md.push_str(&demote_headings(&self.inventory()));
        md.push_str("\n\n");

        for section in &SpecSection::ALL[1..] {
            md.push_str(&demote_headings(&self.render_section(*section)));
            md.push_str("\n\n");
        }
        format!("{}\n", md.trim_end())
    }

    /// Every canonical section in order.
    pub fn render_sections(&self) -> Vec<(SpecSection, String)> {
        SpecSection::ALL
            .iter()
            .map(|section| (*section, self.render_section(*section)))
            .collect()
    }

    pub fn render_section(&self, section: SpecSection) -> String {
        let md = match (section, self.model) {
            (SpecSection::Overview, _) => self.overview(),
            (SpecSection::Database, ProjectModel::Laravel(p)) => self.laravel_database(p),
            (SpecSection::Api, ProjectModel::Laravel(p)) => self.laravel_api(p),
            (SpecSection::Security, ProjectModel::Laravel(p)) => self.laravel_security(p),
            (SpecSection::ApiSchema, ProjectModel::Laravel(p)) => self.laravel_graphql(p),
            (SpecSection::Database, ProjectModel::Java(p)) => self.spring_database(p),
            (SpecSection::Api, ProjectModel::Java(p)) => self.spring_api(p),
            (SpecSection::Security, ProjectModel::Java(p)) => self.spring_security(p),
            (SpecSection::ApiSchema, ProjectModel::Java(p)) => self.spring_schema(p),
        };
        md.trim().to_string()
    }

    fn inventory(&self) -> String {
        let mut md = String::from("# Inventory\n\n");
        for (kind, count) in self.model.artifact_counts() {
            md.push_str(&format!("- {}: {}\n", kind, count));
        }
        md
    }

    fn overview(&self) -> String {
        let mut md = format!("# {} Project Overview\n\n", self.framework());
        if let Some(summary) = self.descriptions.get(PROJECT_SUMMARY_KEY) {
            md.push_str(summary.trim());
            md.push_str("\n\n");
        }
        md.push_str(&demote_headings(&self.inventory()));
        md
    }

    fn table(&self, md: &mut String, table: &TableSchema) {
        md.push_str(&format!("## Table: {}\n", table.name));
        if !table.source_documents.is_empty() {
            md.push_str(&format!("- Migrations: {}\n", code_list(&table.source_documents)));
        }
        if !table.columns.is_empty() {
            md.push_str("- Columns:\n");
            for column in &table.columns {
                md.push_str(&format!("  - `{}` ({})\n", column.name, column.column_type));
            }
        }
        if !table.indexes.is_empty() {
            md.push_str("- Indexes:\n");
            for index in &table.indexes {
                md.push_str(&format!("  - `{}` ({})\n", index.column, index.kind.as_str()));
            }
        }
        if !table.foreign_keys.is_empty() {
            md.push_str("- Foreign keys:\n");
            for fk in &table.foreign_keys {
                let mut line = format!("  - `{}`", fk.column);
                if let (Some(references), Some(on_table)) = (&fk.references, &fk.on_table) {
                    line.push_str(&format!(" -> {} on {}", references, on_table));
                }
                if let Some(on_delete) = &fk.on_delete {
                    line.push_str(&format!(" onDelete={}", on_delete));
                }
                if let Some(on_update) = &fk.on_update {
                    line.push_str(&format!(" onUpdate={}", on_update));
                }
                md.push_str(&line);
                md.push('\n');
            }
        }
        md.push('\n');
    }

    fn laravel_database(&self, p: &LaravelProject) -> String {
        let mut md = String::from("# Database Schema\n\n");
        if p.migrations.is_empty() {
            md.push_str("- No migrations detected\n\n");
        }

        let (framework, business): (Vec<&TableSchema>, Vec<&TableSchema>) = p
            .migrations
            .iter()
            .partition(|t| FRAMEWORK_TABLES.contains(&t.name.as_str()));

        for table in business {
            self.table(&mut md, table);
        }
        if !framework.is_empty() {
            md.push_str("## Framework Tables\n");
            for table in framework {
                md.push_str(&format!("- {} (migrations: {})\n", table.name, table.source_documents.join(", ")));
            }
            md.push('\n');
        }

        if !p.models.is_empty() {
            md.push_str("## Models\n\n");
            for model in &p.models {
                md.push_str(&format!("### {}\n", model.class_name));
                self.describe(&mut md, &format!("model_{}", model.class_name));
                match &model.table_name {
                    Some(table) => md.push_str(&format!("- Table: `{}`\n", table)),
                    None => md.push_str(&format!("- Table: `{}` (default)\n", model.table())),
                }
                if !model.fillable.is_empty() {
                    md.push_str(&format!("- Fillable: {}\n", code_list(&model.fillable)));
                }
                if !model.hidden.is_empty() {
                    md.push_str(&format!("- Hidden: {}\n", code_list(&model.hidden)));
                }
                if !model.casts.is_empty() {
                    let casts: Vec<String> =
                        model.casts.iter().map(|c| format!("`{}` as {}", c.attribute, c.cast)).collect();
                    md.push_str(&format!("- Casts: {}\n", casts.join(", ")));
                }
                if !model.relations.is_empty() {
                    md.push_str("- Relations:\n");
                    for relation in &model.relations {
                        md.push_str(&format!(
                            "  - `{}()` {} -> {}\n",
                            relation.method,
                            relation.kind,
                            relation.related_model.as_deref().unwrap_or("?")
                        ));
                    }
                }
                md.push('\n');
            }
        }
        md
    }

    fn laravel_api(&self, p: &LaravelProject) -> String {
        let mut md = String::from("# API (Routes / Controllers / Services)\n\n");

        md.push_str("## Routes\n");
        if p.route_count() == 0 {
            md.push_str("- No routes detected (the API may be GraphQL only)\n");
        }
        md.push('\n');
        for (file, routes) in &p.routes {
            md.push_str(&format!("### {}.php\n", file));
            if routes.is_empty() {
                md.push_str("- No route definitions found\n");
            }
            for route in routes {
                let mut line = format!(
                    "- **{}** `{}` → `{}`",
                    route.http_method, route.uri_pattern, route.action_reference
                );
                if !route.middleware.is_empty() {
                    line.push_str(&format!(" (middleware: {})", route.middleware.join(", ")));
                }
                if let Some(name) = &route.name {
                    line.push_str(&format!(" [{}]", name));
                }
                md.push_str(&line);
                md.push('\n');
            }
            md.push('\n');
        }

        if !p.controllers.is_empty() {
            md.push_str("## Controllers\n\n");
            for controller in &p.controllers {
                md.push_str(&format!("### {}\n", controller.class_name));
                md.push_str(&format!("- File: `{}`\n", controller.file_path));
                self.describe(&mut md, &format!("controller_{}", controller.class_name));
                if !controller.traits.is_empty() {
                    md.push_str(&format!("- Traits: {}\n", controller.traits.join(", ")));
                }
                if controller.methods.is_empty() {
                    md.push_str("- Methods: none detected\n");
                } else {
                    md.push_str("- Methods:\n");
                    for method in &controller.methods {
                        md.push_str(&format!("  - {}\n", signature(method)));
                    }
                }
                if !controller.validations.is_empty() {
                    md.push_str("- Inline validation:\n");
                    for rule in &controller.validations {
                        md.push_str(&format!("  - `{}`: {}\n", rule.field, rule.rules));
                    }
                }
                md.push('\n');
            }
        }

        if !p.services.is_empty() {
            md.push_str("## Services\n\n");
            for service in &p.services {
                md.push_str(&format!("### {}\n", service.class_name));
                md.push_str(&format!("- File: `{}`\n", service.file_path));
                self.describe(&mut md, &format!("service_{}", service.class_name));
                if !service.query_columns.is_empty() {
                    md.push_str(&format!("- Query columns: {}\n", code_list(&service.query_columns)));
                }
                if !service.methods.is_empty() {
                    md.push_str("- Methods:\n");
                    for method in &service.methods {
                        md.push_str(&format!("  - {}\n", signature(method)));
                    }
                }
                md.push('\n');
            }
        }

        if !p.jobs.is_empty() {
            md.push_str("## Jobs\n");
            for job in &p.jobs {
                let queued = if job.queued { " (queued)" } else { "" };
                md.push_str(&format!("- **{}**{} - `{}`\n", job.class_name, queued, job.file_path));
            }
            md.push('\n');
        }
        if !p.events.is_empty() {
            md.push_str("## Events\n");
            for event in &p.events {
                let broadcast = if event.broadcasts { " (broadcast)" } else { "" };
                md.push_str(&format!("- **{}**{} - `{}`\n", event.class_name, broadcast, event.file_path));
            }
            md.push('\n');
        }
        if !p.listeners.is_empty() {
            md.push_str("## Listeners\n");
            for listener in &p.listeners {
                let handles = listener.handles.as_deref().map(|e| format!(" handles {}", e)).unwrap_or_default();
                md.push_str(&format!("- **{}**{} - `{}`\n", listener.class_name, handles, listener.file_path));
            }
            md.push('\n');
        }
        md
    }

    fn laravel_security(&self, p: &LaravelProject) -> String {
        let mut md = String::from("# Security / Validation\n\n");

        md.push_str("## Middleware\n");
        if p.middleware.is_empty() {
            md.push_str("- None detected (authentication may rely on GraphQL directives such as @guard)\n");
        }
        for middleware in &p.middleware {
            md.push_str(&format!("- `{}` ({})\n", middleware.class_name, middleware.file_path));
        }
        md.push('\n');

        if let Some(kernel) = &p.kernel {
            md.push_str("## Kernel Middleware\n");
            if !kernel.global.is_empty() {
                md.push_str("- Global:\n");
                for m in &kernel.global {
                    md.push_str(&format!("  - {}\n", m));
                }
            }
            if !kernel.groups.is_empty() {
                md.push_str("- Groups:\n");
                for group in &kernel.groups {
                    md.push_str(&format!("  - {}: {}\n", group.name, group.middleware.join(", ")));
                }
            }
            if !kernel.aliases.is_empty() {
                md.push_str("- Route middleware:\n");
                for alias in &kernel.aliases {
                    md.push_str(&format!("  - {}: {}\n", alias.alias, alias.class));
                }
            }
            md.push('\n');
        }

        md.push_str("## Form Requests\n");
        if p.requests.is_empty() {
            md.push_str("- No dedicated form requests (validation may happen inside controllers)\n");
        }
        md.push('\n');
        for request in &p.requests {
            md.push_str(&format!("### {}\n", request.class_name));
            md.push_str(&format!("- File: `{}`\n", request.file_path));
            if !request.rules.is_empty() {
                md.push_str("- Rules:\n");
                for rule in &request.rules {
                    md.push_str(&format!("  - `{}`: {}\n", rule.field, rule.rules));
                }
            }
            md.push('\n');
        }

        if !p.policies.is_empty() {
            md.push_str("## Policies\n\n");
            for policy in &p.policies {
                md.push_str(&format!("### {}\n", policy.class_name));
                md.push_str(&format!("- File: `{}`\n", policy.file_path));
                if !policy.abilities.is_empty() {
                    md.push_str("- Abilities:\n");
                    for ability in &policy.abilities {
                        md.push_str(&format!("  - `{}()`\n", ability));
                    }
                }
                md.push('\n');
            }
        }
        md
    }

    fn laravel_graphql(&self, p: &LaravelProject) -> String {
        let mut md = String::from("# GraphQL API\n\n");
        if !p.has_graphql() && p.graphql_operations.is_empty() {
            md.push_str("- No GraphQL API detected\n");
            return md;
        }
        md.push_str(&format!("- Endpoint: `{}`\n\n", p.graphql_endpoint));

        if !p.graphql_schemas.is_empty() {
            md.push_str("## Schema Files\n\n");
            let mut schemas: Vec<_> = p.graphql_schemas.iter().collect();
            schemas.sort_by(|a, b| a.path.cmp(&b.path));
            for schema in schemas {
                md.push_str(&format!("### {}\n\n", schema.path));
                let lines: Vec<&str> = schema.content.lines().collect();
                md.push_str("```graphql\n");
                md.push_str(&lines[..lines.len().min(SCHEMA_PREVIEW_LINES)].join("\n"));
                if lines.len() > SCHEMA_PREVIEW_LINES {
                    md.push_str("\n... (truncated)");
                }
                md.push_str("\n```\n\n");
            }
        }

        if !p.graphql_operations.is_empty() {
            md.push_str("## Queries / Mutations\n\n");
            for (title, ops) in [("Queries", &p.graphql_operations.queries), ("Mutations", &p.graphql_operations.mutations)] {
                if ops.is_empty() {
                    continue;
                }
                md.push_str(&format!("### {}\n", title));
                for op in ops {
                    let args = if op.args.is_empty() { String::new() } else { format!("({})", op.args) };
                    md.push_str(&format!("- `{}{}` : {}\n", op.name, args, op.return_type));
                }
                md.push('\n');
            }
        }

        let resolvers = &p.graphql_resolvers;
        if !resolvers.queries.is_empty() || !resolvers.mutations.is_empty() {
            md.push_str("## Resolvers\n\n");
            for (title, files) in [("Queries", &resolvers.queries), ("Mutations", &resolvers.mutations)] {
                if files.is_empty() {
                    continue;
                }
                md.push_str(&format!("### {}\n", title));
                for file in files {
                    md.push_str(&format!("- `{}`\n", file));
                }
                md.push('\n');
            }
        }
        md
    }

    fn spring_database(&self, p: &SpringProject) -> String {
        let mut md = String::from("# Database Schema (JPA Entities)\n\n");
        if p.entities.is_empty() {
            md.push_str("- No entities detected\n\n");
        }
        for entity in &p.entities {
            md.push_str(&format!("## Entity: {}\n", entity.name));
            self.describe(&mut md, &format!("entity_{}", entity.name));
            md.push_str(&format!("- Table: `{}`\n", entity.table));
            md.push_str(&format!("- File: `{}`\n", entity.file));
            if !entity.fields.is_empty() {
                md.push_str("- Fields:\n");
                for field in &entity.fields {
                    let mut line = format!("  - `{}` ({})", field.name, field.field_type);
                    if let Some(column) = &field.column {
                        line.push_str(&format!(" column `{}`", column));
                    }
                    if !field.annotations.is_empty() {
                        let annotations: Vec<String> = field.annotations.iter().map(|a| format!("@{}", a)).collect();
                        line.push_str(&format!(" {}", annotations.join(" ")));
                    }
                    md.push_str(&line);
                    md.push('\n');
                }
            }
            md.push('\n');
        }

        if !p.repositories.is_empty() {
            md.push_str("## Repositories\n\n");
            for repository in &p.repositories {
                md.push_str(&format!("### {}\n", repository.name));
                md.push_str(&format!("- Entity: {} (id: {})\n", repository.entity, repository.id_type));
                if !repository.custom_methods.is_empty() {
                    md.push_str("- Custom queries:\n");
                    for method in &repository.custom_methods {
                        md.push_str(&format!(
                            "  - `{} {}({})`\n",
                            method.return_type,
                            method.name,
                            method.parameters.as_deref().unwrap_or("")
                        ));
                    }
                }
                md.push('\n');
            }
        }
        md
    }

    fn spring_api(&self, p: &SpringProject) -> String {
        let mut md = String::from("# API (REST Endpoints / Controllers / Services)\n\n");

        md.push_str("## REST Endpoints\n");
        if p.rest_endpoints.is_empty() {
            md.push_str("- No endpoints detected\n");
        }
        for endpoint in &p.rest_endpoints {
            md.push_str(&format!(
                "- **{}** `{}` → `{}.{}`\n",
                endpoint.method, endpoint.path, endpoint.controller, endpoint.handler
            ));
        }
        md.push('\n');

        if !p.controllers.is_empty() {
            md.push_str("## Controllers\n\n");
            for controller in &p.controllers {
                md.push_str(&format!("### {}\n", controller.name));
                md.push_str(&format!("- File: `{}`\n", controller.file));
                self.describe(&mut md, &format!("controller_{}", controller.name));
                let base = if controller.base_path.is_empty() { "/" } else { &controller.base_path };
                md.push_str(&format!("- Base path: `{}`\n", base));
                md.push('\n');
            }
        }

        if !p.services.is_empty() {
            md.push_str("## Services\n\n");
            for service in &p.services {
                md.push_str(&format!("### {}\n", service.name));
                md.push_str(&format!("- File: `{}`\n", service.file));
                self.describe(&mut md, &format!("service_{}", service.name));
                if !service.methods.is_empty() {
                    md.push_str("- Methods:\n");
                    for method in &service.methods {
                        md.push_str(&format!(
                            "  - `{} {}({})`\n",
                            method.return_type,
                            method.name,
                            method.parameters.as_deref().unwrap_or("")
                        ));
                    }
                }
                md.push('\n');
            }
        }
        md
    }

    fn spring_security(&self, p: &SpringProject) -> String {
        let mut md = String::from("# Configuration\n\n");
        if p.configs.is_empty() {
            md.push_str("- No application configuration files detected\n");
        }
        for config in &p.configs {
            md.push_str(&format!("## {}\n\n", config.file));
            match &config.content {
                ConfigContent::Properties { entries } => {
                    for property in entries {
                        md.push_str(&format!("- `{}`: {}\n", property.key, property.value));
                    }
                }
                ConfigContent::Yaml { text } => {
                    md.push_str("```yaml\n");
                    md.push_str(text);
                    md.push_str("\n```\n");
                }
            }
            md.push('\n');
        }
        md
    }

    fn spring_schema(&self, p: &SpringProject) -> String {
        let mut md = String::from("# Request / Response Schemas (DTOs)\n\n");
        if p.dtos.is_empty() {
            md.push_str("- No DTOs detected\n");
        }
        for dto in &p.dtos {
            md.push_str(&format!("## {} ({})\n", dto.name, dto.kind));
            md.push_str(&format!("- File: `{}`\n", dto.file));
            for field in &dto.fields {
                md.push_str(&format!("- `{}`: {}\n", field.name, field.field_type));
            }
            md.push('\n');
        }
        md
    }
}
