//! debug-sandbox library
//!
//! Launches interactive debugger sessions inside a container sandbox:
//! - Runtime selection by source file extension
//! - Identity bind-mount planning and sandbox command assembly
//! - Terminal-attached launching with sentinel-delimited result extraction

pub mod backend;
pub mod command;
pub mod config;
pub mod error;
pub mod extract;
pub mod mounts;
pub mod runtime;
pub mod session;
