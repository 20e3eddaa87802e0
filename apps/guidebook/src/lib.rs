//! # guidebook
//!
//! Application layer for the Guidebook renderer: configuration, the
//! filesystem catalog, the CLI and the HTTP API. The resolution logic itself
//! lives in `guidebook-core`.

pub mod api;
pub mod catalog;
pub mod cli;
pub mod config;
