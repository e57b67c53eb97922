//! # topoc-common
//!
//! Shared error types, compiler configuration, resolution warnings, and
//! constants used across the entire topoc workspace.
//!
//! This crate is the leaf of the dependency graph. It depends on no other
//! internal crate.

pub mod config;
pub mod constants;
pub mod error;
pub mod warning;
