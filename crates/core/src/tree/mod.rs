#![forbid(unsafe_code)]

mod error;
mod node;
mod serialize;
mod snapshot;

pub use error::*;
pub use node::*;
pub use serialize::*;
pub use snapshot::*;
