#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use std::fmt;

/// Store-assigned category identifier. `0` is reserved as the root sentinel
/// ("no parent") and never names a stored row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(i64);

impl CategoryId {
    pub const ROOT: CategoryId = CategoryId(0);

    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> i64 {
        self.0
    }

    pub const fn is_root_sentinel(self) -> bool {
        self.0 == 0
    }

    /// `None` for the root sentinel, the id itself otherwise.
    pub fn as_parent(self) -> Option<CategoryId> {
        if self.is_root_sentinel() {
            None
        } else {
            Some(self)
        }
    }
}

impl From<i64> for CategoryId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Tag naming the domain entity a category branch applies to.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelatedModel(String);

impl RelatedModel {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn try_new(value: impl Into<String>) -> Result<Self, RelatedModelError> {
        let value = value.into();
        let trimmed = value.trim();
        validate_related_model(trimmed)?;
        Ok(Self(trimmed.to_string()))
    }

    /// Tag derived from a Rust type path, e.g. `app::models::Product`.
    pub fn of<T: ?Sized>() -> Self {
        Self(std::any::type_name::<T>().to_string())
    }
}

impl fmt::Display for RelatedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RelatedModelError {
    Empty,
    TooLong,
    ContainsControl,
}

impl RelatedModelError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Empty => "related_model must not be empty",
            Self::TooLong => "related_model is too long",
            Self::ContainsControl => "related_model contains control characters",
        }
    }
}

impl fmt::Display for RelatedModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for RelatedModelError {}

pub const MAX_RELATED_MODEL_LEN: usize = 255;

fn validate_related_model(value: &str) -> Result<(), RelatedModelError> {
    if value.is_empty() {
        return Err(RelatedModelError::Empty);
    }
    if value.len() > MAX_RELATED_MODEL_LEN {
        return Err(RelatedModelError::TooLong);
    }
    if value.chars().any(|c| c.is_control()) {
        return Err(RelatedModelError::ContainsControl);
    }
    Ok(())
}
