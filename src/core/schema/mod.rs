//! Database schema reconstruction by replaying migrations in file-name order

mod operations;
mod reconstructor;

pub use operations::snake_case;
pub use reconstructor::{SchemaReconstructor, TableSchema};
