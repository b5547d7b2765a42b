//! HTTP handlers for entity CRUD, nested creation, transitions and links.

pub mod association;
pub mod entity;
pub use association::*;
pub use entity::{create, create_nested, delete, list, read, transition, update};
