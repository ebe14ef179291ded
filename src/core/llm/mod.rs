//! Text generation for human-readable descriptions
//!
//! Backends sit behind the [`TextGenerator`] trait and are chosen by name
//! through [`create_generator`]. The [`Describer`] walks a project model and
//! asks for one description per notable entity.

mod describer;
mod generator;
mod prompts;
mod providers;

pub use describer::{Describer, Descriptions, PROJECT_SUMMARY_KEY};
pub use generator::TextGenerator;
pub use providers::create_generator;
