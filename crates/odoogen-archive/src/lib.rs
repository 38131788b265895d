//! # odoogen-archive
//!
//! Enterprise archive handling for odoogen.
//!
//! Handles:
//! - **Cache**: version-keyed store of downloaded archives.
//! - **Fetch**: token-gated thanks-page scrape followed by a streamed download.
//! - **Extract**: tar-gzip extraction that strips a single wrapper directory.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod cache;
pub mod extract;
pub mod fetch;

#[cfg(test)]
pub(crate) mod testutil;
