//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod hook_repo;
pub mod hook_run_repo;

pub use hook_repo::HookRepo;
pub use hook_run_repo::HookRunRepo;
