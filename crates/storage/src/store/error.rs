#![forbid(unsafe_code)]

use ct_core::tree::TreeError;
use ct_core::{CategoryId, RelatedModelError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("sqlite: {0}")]
    Sql(#[from] rusqlite::Error),
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    #[error("unknown category id {0}")]
    UnknownId(CategoryId),
    #[error("category {0} not found in tree")]
    NotFound(CategoryId),
    #[error("related model mismatch (target={target}, category={category})")]
    DifferentRelatedModel {
        target: CategoryId,
        category: CategoryId,
    },
    #[error("new category's related model differs from parent {parent}")]
    DifferentParentRelatedModel { parent: CategoryId },
    #[error("category {0} cannot be appended to itself")]
    AppendSelf(CategoryId),
    #[error("the root sentinel cannot be appended")]
    AppendRoot,
    #[error("category {category} cannot be appended under its descendant {target}")]
    AppendDescendant {
        target: CategoryId,
        category: CategoryId,
    },
    #[error("placing a subtree under {parent} exceeds the maximum depth of {max}")]
    DepthExceeded { parent: CategoryId, max: usize },
    #[error("category {category} has {children} children and cannot be removed")]
    RemoveHasChildren { category: CategoryId, children: i64 },
    #[error("tree snapshot: {0}")]
    Snapshot(TreeError),
}

impl StoreError {
    /// Errors the caller can fix by changing the request. Never retried.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput(_)
                | Self::UnknownId(_)
                | Self::NotFound(_)
                | Self::DifferentRelatedModel { .. }
                | Self::DifferentParentRelatedModel { .. }
                | Self::AppendSelf(_)
                | Self::AppendRoot
                | Self::AppendDescendant { .. }
                | Self::DepthExceeded { .. }
                | Self::RemoveHasChildren { .. }
        )
    }
}

impl From<TreeError> for StoreError {
    fn from(value: TreeError) -> Self {
        match value {
            TreeError::NotFound(id) => Self::NotFound(id),
            other => Self::Snapshot(other),
        }
    }
}

impl From<RelatedModelError> for StoreError {
    fn from(value: RelatedModelError) -> Self {
        Self::InvalidInput(value.message())
    }
}
