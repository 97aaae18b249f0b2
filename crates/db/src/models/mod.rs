//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` entity struct matching the database row
//! - A `Deserialize` create DTO for inserts where the API accepts one

pub mod dataset;
pub mod job;
pub mod preset;
pub mod project;
pub mod user;
