#![forbid(unsafe_code)]

use crate::ids::CategoryId;
use std::fmt;

#[derive(Debug)]
pub enum TreeError {
    NotFound(CategoryId),
    Decode(serde_json::Error),
    UnsupportedVersion(u32),
    BrokenLink(CategoryId),
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "category {id} not found in tree"),
            Self::Decode(err) => write!(f, "tree decode: {err}"),
            Self::UnsupportedVersion(version) => {
                write!(f, "unsupported tree encoding version {version}")
            }
            Self::BrokenLink(id) => write!(f, "tree link broken at category {id}"),
        }
    }
}

impl std::error::Error for TreeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Decode(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for TreeError {
    fn from(value: serde_json::Error) -> Self {
        Self::Decode(value)
    }
}
