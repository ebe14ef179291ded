// src/core/plugins/laravel/mod.rs
//! Laravel project analysis: classifies documents by their conventional
//! location and runs the matching extractor over each.

mod classes;
mod graphql;
mod kernel;

pub use classes::{
    ClassFile, Controller, EloquentModel, Event, FormRequest, Job, Listener, MethodSignature, Policy,
    Relation, Service,
};
pub use graphql::{GraphqlOperations, GraphqlResolvers, GraphqlSchema};
pub use kernel::KernelMiddleware;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::FrameworkPlugin;
use crate::core::documents::SourceDocument;
use crate::core::model::ProjectModel;
use crate::core::routes::{RouteDeclaration, RouteTableReconstructor};
use crate::core::schema::{SchemaReconstructor, TableSchema};

/// Everything recovered from a Laravel project
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LaravelProject {
    pub models: Vec<EloquentModel>,
    pub controllers: Vec<Controller>,
    /// Route file stem (`api`, `web`) to its flattened routes
    pub routes: BTreeMap<String, Vec<RouteDeclaration>>,
    pub migrations: Vec<TableSchema>,
    pub services: Vec<Service>,
    pub middleware: Vec<ClassFile>,
    pub requests: Vec<FormRequest>,
    pub policies: Vec<Policy>,
    pub jobs: Vec<Job>,
    pub events: Vec<Event>,
    pub listeners: Vec<Listener>,
    pub kernel: Option<KernelMiddleware>,
    pub graphql_schemas: Vec<GraphqlSchema>,
    pub graphql_operations: GraphqlOperations,
    pub graphql_resolvers: GraphqlResolvers,
    pub graphql_endpoint: String,
}

impl LaravelProject {
    pub fn route_count(&self) -> usize {
        self.routes.values().map(Vec::len).sum()
    }

    pub fn has_graphql(&self) -> bool {
        !self.graphql_schemas.is_empty()
            || !self.graphql_resolvers.queries.is_empty()
            || !self.graphql_resolvers.mutations.is_empty()
    }
}

/// Where a PHP file sits in the conventional Laravel layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Location {
    Model,
    Controller,
    Middleware,
    Request,
    Kernel,
    Service,
    Policy,
    Job,
    Event,
    Listener,
    QueryResolver,
    MutationResolver,
    Migration,
    RouteFile,
    LighthouseConfig,
    Other,
}

fn locate(doc: &SourceDocument) -> Location {
    let path = format!("/{}", doc.relative_path);
    let under = |dir: &str| path.contains(dir);

    if path.ends_with("/app/Http/Kernel.php") {
        Location::Kernel
    } else if path.ends_with("/config/lighthouse.php") {
        Location::LighthouseConfig
    } else if under("/app/Models/") {
        Location::Model
    } else if under("/app/Http/Controllers/") {
        Location::Controller
    } else if under("/app/Http/Middleware/") {
        Location::Middleware
    } else if under("/app/Http/Requests/") {
        Location::Request
    } else if under("/app/Services/") {
        Location::Service
    } else if under("/app/Policies/") {
        Location::Policy
    } else if under("/app/Jobs/") {
        Location::Job
    } else if under("/app/Events/") {
        Location::Event
    } else if under("/app/Listeners/") {
        Location::Listener
    } else if under("/app/GraphQL/Queries/") {
        Location::QueryResolver
    } else if under("/app/GraphQL/Mutations/") {
        Location::MutationResolver
    } else if under("/database/migrations/") {
        Location::Migration
    } else if path
        .rsplit('/')
        .nth(1)
        .is_some_and(|parent| parent == "routes")
    {
        Location::RouteFile
    } else {
        Location::Other
    }
}

fn schema_path(doc: &SourceDocument) -> String {
    match doc.relative_path.split_once("graphql/") {
        Some((_, rest)) if !rest.is_empty() => rest.to_string(),
        _ => doc.relative_path.clone(),
    }
}

fn push<T>(items: &mut Vec<T>, found: Option<T>) -> bool {
    match found {
        Some(item) => {
            items.push(item);
            true
        }
        None => false,
    }
}

pub struct LaravelPlugin;

impl LaravelPlugin {
    pub fn analyze_documents(documents: &[SourceDocument]) -> LaravelProject {
        let mut project = LaravelProject::default();
        let mut migrations = Vec::new();
        let mut lighthouse_config = None;

        for doc in documents {
            if doc.extension() == Some("graphql") {
                let ops = graphql::extract_operations(&doc.content);
                project.graphql_operations.queries.extend(ops.queries);
                project.graphql_operations.mutations.extend(ops.mutations);
                project.graphql_schemas.push(GraphqlSchema {
                    path: schema_path(doc),
                    content: doc.content.clone(),
                });
                continue;
            }

            let location = locate(doc);
            let recognized = match location {
                Location::Model => push(&mut project.models, classes::extract_model(doc)),
                Location::Controller => push(&mut project.controllers, classes::extract_controller(doc)),
                Location::Middleware => push(&mut project.middleware, classes::extract_class_file(doc)),
                Location::Request => push(&mut project.requests, classes::extract_form_request(doc)),
                Location::Service => push(&mut project.services, classes::extract_service(doc)),
                Location::Policy => push(&mut project.policies, classes::extract_policy(doc)),
                Location::Job => push(&mut project.jobs, classes::extract_job(doc)),
                Location::Event => push(&mut project.events, classes::extract_event(doc)),
                Location::Listener => push(&mut project.listeners, classes::extract_listener(doc)),
                Location::Kernel => {
                    project.kernel = Some(kernel::extract_kernel(&doc.content));
                    true
                }
                Location::QueryResolver => {
                    project.graphql_resolvers.queries.push(doc.relative_path.clone());
                    true
                }
                Location::MutationResolver => {
                    project.graphql_resolvers.mutations.push(doc.relative_path.clone());
                    true
                }
                Location::Migration => {
                    migrations.push(doc.clone());
                    true
                }
                Location::RouteFile => {
                    let routes = RouteTableReconstructor::reconstruct(&doc.content);
                    debug!("{}: {} routes", doc.relative_path, routes.len());
                    project.routes.insert(doc.stem().to_string(), routes);
                    true
                }
                Location::LighthouseConfig => {
                    lighthouse_config = Some(doc.content.as_str());
                    true
                }
                Location::Other => true,
            };

            if !recognized {
                debug!("{}: no {:?} shape recognized, skipped", doc.relative_path, location);
            }
        }

        project.migrations = SchemaReconstructor::reconstruct(&migrations);
        project.graphql_endpoint = graphql::extract_endpoint(lighthouse_config);
        project
    }
}

impl FrameworkPlugin for LaravelPlugin {
    fn analyze(&self, documents: &[SourceDocument]) -> ProjectModel {
        ProjectModel::Laravel(Self::analyze_documents(documents))
    }

    fn file_extensions(&self) -> &[&str] {
        &["php", "graphql"]
    }

    fn root_markers(&self) -> &[&str] {
        &["composer.json", "artisan"]
    }

    fn ecosystem_name(&self) -> &str {
        "Laravel"
    }
}
