#![forbid(unsafe_code)]

use crate::ids::{CategoryId, RelatedModel};

pub const MAX_CATEGORY_NAME_LEN: usize = 255;
/// Levels from a top-level category (level 1) down to its deepest descendant.
pub const MAX_CATEGORY_DEPTH: usize = 128;

/// One persisted category row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub parent_id: CategoryId,
    pub related_model: Option<RelatedModel>,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
}

impl Category {
    pub fn is_top_level(&self) -> bool {
        self.parent_id.is_root_sentinel()
    }

    pub fn parent(&self) -> Option<CategoryId> {
        self.parent_id.as_parent()
    }

    /// Tags must match exactly, `None` included.
    pub fn same_related_model(&self, other: &Category) -> bool {
        self.related_model == other.related_model
    }
}

/// One closure-index row: `ancestor` is reachable from `descendant` by
/// following `parent_id`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClosureRelation {
    pub descendant: CategoryId,
    pub ancestor: CategoryId,
}
