//! Composer Core
//!
//! Core types for the image composer orchestration service.
//!
//! This crate contains:
//! - Domain types: jobs, their typed arguments and results, upload targets
//! - DTOs: request and response shapes of the compose API, including the
//!   translation of target results into upload statuses

pub mod domain;
pub mod dto;
