#![forbid(unsafe_code)]

pub mod ids;
pub mod model;
pub mod tree;

pub use ids::{CategoryId, RelatedModel, RelatedModelError};
pub use model::{Category, ClosureRelation};
