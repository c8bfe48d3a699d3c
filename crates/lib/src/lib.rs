//! cubuild-lib: build-environment configuration for CUDA compilation.
//!
//! This crate teaches a build environment how to compile `.cu` sources:
//! - `env`: the mutable construction environment that tools configure
//! - `template`: `$VAR` command templates, expanded at invocation time
//! - `cuda`: the CUDA tool itself — nvcc command wiring, Toolkit/SDK
//!   discovery, and the auxiliary PTX/cubin builders
//!
//! The host build framework owns the [`env::Environment`]; [`cuda::generate`]
//! mutates it in place, once per environment.

pub mod cuda;
pub mod env;
pub mod template;
