pub mod catalog;
pub mod models;

pub use catalog::{CatalogError, EpisodeCatalog, StaticCatalog};
pub use models::*;

#[cfg(test)]
pub(crate) use catalog::fixtures;
