#![forbid(unsafe_code)]

mod category_tx;
mod closure_tx;
mod schema;
mod time;

pub(super) use category_tx::*;
pub(super) use closure_tx::*;
pub(super) use schema::migrate_sqlite_schema;
pub(super) use time::now_secs;
