//! Service Module
//!
//! Business logic of the compose API. Services read and enqueue jobs through
//! [`workers::Workers`] and never touch the job store directly.

pub mod chain;
pub mod clone;
pub mod compose;
pub mod error;
pub mod logs;
pub mod metadata;
pub mod status;
pub mod workers;

pub use composer_core::dto::BASE_PATH;
