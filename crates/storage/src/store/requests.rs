#![forbid(unsafe_code)]

use ct_core::{CategoryId, RelatedModel};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateCategoryRequest {
    pub name: String,
    /// Inherited from the parent when `None`.
    pub related_model: Option<RelatedModel>,
    /// `None` (or the root sentinel) creates a top-level category.
    pub parent_id: Option<CategoryId>,
}

impl CreateCategoryRequest {
    pub fn root(name: impl Into<String>, related_model: Option<RelatedModel>) -> Self {
        Self {
            name: name.into(),
            related_model,
            parent_id: None,
        }
    }

    pub fn child(name: impl Into<String>, parent_id: CategoryId) -> Self {
        Self {
            name: name.into(),
            related_model: None,
            parent_id: Some(parent_id),
        }
    }
}
