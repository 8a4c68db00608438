//! Game content: the definition catalog and the standard kit.

mod catalog;
mod standard;

pub use catalog::{Catalog, CatalogError};
pub use standard::{abilities, effects, items};
