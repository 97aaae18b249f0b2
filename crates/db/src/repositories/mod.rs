//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod dataset_repo;
pub mod job_repo;
pub mod preset_repo;
pub mod project_repo;
pub mod user_repo;

pub use dataset_repo::DatasetRepo;
pub use job_repo::JobRepo;
pub use preset_repo::PresetRepo;
pub use project_repo::ProjectRepo;
pub use user_repo::UserRepo;
