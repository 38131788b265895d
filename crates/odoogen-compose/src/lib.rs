//! # odoogen-compose
//!
//! Generation of one isolated Odoo deployment unit.
//!
//! Handles:
//! - **Naming**: collision-free instance directory and derived resource names.
//! - **Addons**: volume mounts and enterprise addon layout detection.
//! - **Odoo config**: the `odoo.conf` written for each instance.
//! - **Context**: the flat key set handed to the templates.
//! - **Render**: template rendering and the generated file set.
//! - **Composer**: the orchestrator sequencing all of the above.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod addons;
pub mod composer;
pub mod context;
pub mod naming;
pub mod odoo_conf;
pub mod render;
