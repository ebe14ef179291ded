// src/core/plugins/mod.rs
//! Framework plugins: each one knows which files belong to its ecosystem
//! and how to turn them into a project model.

pub mod laravel;
pub mod spring;

use crate::config::Ecosystem;
use crate::core::documents::SourceDocument;
use crate::core::model::ProjectModel;

pub use laravel::LaravelPlugin;
pub use spring::SpringPlugin;

pub trait FrameworkPlugin: Send + Sync {
    /// Build the project model from already-collected documents
    fn analyze(&self, documents: &[SourceDocument]) -> ProjectModel;

    /// Extensions (without the dot) the collector should pick up
    fn file_extensions(&self) -> &[&str];

    /// Files whose presence marks the project root
    fn root_markers(&self) -> &[&str];

    fn ecosystem_name(&self) -> &str;
}

pub fn plugin_for(ecosystem: Ecosystem) -> Box<dyn FrameworkPlugin> {
    match ecosystem {
        Ecosystem::Laravel => Box::new(LaravelPlugin),
        Ecosystem::Java => Box::new(SpringPlugin),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plugin_for_ecosystem() {
        let laravel = plugin_for(Ecosystem::Laravel);
        assert_eq!(laravel.ecosystem_name(), "Laravel");
        assert!(laravel.file_extensions().contains(&"php"));

        let java = plugin_for(Ecosystem::Java);
        assert_eq!(java.ecosystem_name(), "Java/Spring");
        assert!(java.root_markers().contains(&"pom.xml"));
    }
}
