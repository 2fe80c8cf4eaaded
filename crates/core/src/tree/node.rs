#![forbid(unsafe_code)]

use crate::ids::CategoryId;
use crate::model::Category;
use serde::{Deserialize, Serialize};

/// Cache-only projection of a category. Links are identifiers resolved
/// against the owning [`TreeSnapshot`](super::TreeSnapshot).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimplifiedNode {
    pub id: CategoryId,
    pub name: String,
    /// Raw `parent_id` column value.
    pub parent_id: CategoryId,
    /// Resolved parent link; `None` for top-level nodes.
    pub parent: Option<CategoryId>,
    pub children: Vec<CategoryId>,
}

impl SimplifiedNode {
    pub fn from_category(category: &Category) -> Self {
        Self {
            id: category.id,
            name: category.name.clone(),
            parent_id: category.parent_id,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn is_top_level(&self) -> bool {
        self.parent.is_none()
    }
}
