//! # odoogen-common
//!
//! Shared types, error definitions, configuration models, constants and the
//! progress-reporting interface used across the whole odoogen workspace.
//!
//! This crate is the leaf of the dependency graph and depends on no other
//! internal crate.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod config;
pub mod constants;
pub mod error;
pub mod report;
pub mod types;
