//! Host platform detection and filesystem probing for cubuild.
//!
//! This crate provides the pieces of tool configuration that touch the host
//! system directly:
//! - Platform family detection (the `PLATFORM` identifier a build
//!   environment carries)
//! - Process-environment roots used to derive candidate install locations
//! - Ordered first-match directory probing

mod os;
mod paths;

pub use os::Os;
pub use paths::{HostDirs, first_existing_dir};
