//! # featgraph Library
//!
//! This library exposes the featgraph application modules for testing and
//! integration.
//!
//! The main binary uses these modules through the `main.rs` entry point.

pub mod api;
pub mod cli;
pub mod json;

// Re-export featgraph_core for convenience
pub use featgraph_core;
