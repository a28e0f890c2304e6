//! High-level operations — write engine and query engine.

pub mod query;
pub mod write;

pub use query::QueryEngine;
pub use write::{GameChange, GameEntities, UpdateReport, WriteEngine};
