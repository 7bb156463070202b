//! Core domain types
//!
//! This module contains the structures shared by the orchestrator and its
//! clients: jobs as recorded by the job store, their typed arguments and
//! results, upload targets and the static image catalog.

pub mod image;
pub mod job;
pub mod osbuild;
pub mod target;
pub mod worker;
