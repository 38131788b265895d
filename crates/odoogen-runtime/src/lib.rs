//! Deployment of generated instances through the container runtime.
//!
//! Handles:
//! - **Backend**: the `ComposeRuntime` abstraction and its Docker Compose CLI implementation.
//! - **Inspect**: reading the published port and project name back from a compose file.
//! - **Deploy**: build, start, state check and optional database initialization.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod backend;
pub mod deploy;
pub mod inspect;
