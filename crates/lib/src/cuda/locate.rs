//! Locating CUDA Toolkit and SDK installations on disk.
//!
//! An explicit `CUDA_TOOLKIT_PATH` / `CUDA_SDK_PATH` environment entry
//! always wins and is used verbatim. Otherwise an ordered list of
//! conventional install locations is probed and the first existing
//! directory is taken. The lists cover the Linux, macOS and Windows
//! layouts that shipped over the years; order encodes priority.

use std::path::PathBuf;

use thiserror::Error;
use tracing::{info, warn};

use cubuild_platform::{HostDirs, first_existing_dir};

use crate::env::Environment;

/// Errors that can occur while resolving installation roots.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocateError {
  /// No toolkit anywhere in the probe list. Fatal for the whole build:
  /// without the toolkit there is no compiler to invoke.
  #[error(
    "cannot find the CUDA Toolkit: set CUDA_TOOLKIT_PATH in the build environment or install the toolkit in a standard location"
  )]
  ToolkitNotFound,
}

/// Candidate toolkit install locations, highest priority first.
pub fn toolkit_candidates(dirs: &HostDirs) -> Vec<PathBuf> {
  vec![
    dirs.home.join("NVIDIA_CUDA_TOOLKIT"),
    dirs.home.join("Apps/NVIDIA_CUDA_TOOLKIT"),
    dirs.home.join("Apps/CudaToolkit"),
    dirs.home.join("Apps/CudaTK"),
    PathBuf::from("/usr/lib/nvidia-cuda-toolkit"),
    PathBuf::from("/usr/local/NVIDIA_CUDA_TOOLKIT"),
    PathBuf::from("/usr/local/CUDA_TOOLKIT"),
    PathBuf::from("/usr/local/cuda_toolkit"),
    PathBuf::from("/usr/local/CUDA"),
    PathBuf::from("/usr/local/cuda"),
    PathBuf::from("/Developer/NVIDIA CUDA TOOLKIT"),
    PathBuf::from("/Developer/CUDA TOOLKIT"),
    PathBuf::from("/Developer/CUDA"),
    dirs.program_files.join("NVIDIA Corporation/NVIDIA CUDA TOOLKIT"),
    dirs.program_files.join("NVIDIA Corporation/NVIDIA CUDA"),
    dirs.program_files.join("NVIDIA Corporation/CUDA TOOLKIT"),
    dirs.program_files.join("NVIDIA Corporation/CUDA"),
    dirs.program_files.join("NVIDIA/NVIDIA CUDA TOOLKIT"),
    dirs.program_files.join("NVIDIA/NVIDIA CUDA"),
    dirs.program_files.join("NVIDIA/CUDA TOOLKIT"),
    dirs.program_files.join("NVIDIA/CUDA"),
    dirs.program_files.join("CUDA TOOLKIT"),
    dirs.program_files.join("CUDA"),
    dirs.home_drive.join("CUDA TOOLKIT"),
    dirs.home_drive.join("CUDA"),
    // Last resort: distribution packages that install nvcc straight into
    // the system bin directory.
    PathBuf::from("/usr/bin"),
  ]
}

/// Candidate SDK install locations, highest priority first.
pub fn sdk_candidates(dirs: &HostDirs) -> Vec<PathBuf> {
  vec![
    dirs.home.join("NVIDIA_GPU_Computing_SDK"),
    dirs.home.join("local/opt/NVIDIA_GPU_Computing_SDK"),
    dirs.home.join("Apps/NVIDIA_GPU_Computing_SDK"),
    dirs.home.join("NVIDIA_CUDA_SDK"),
    dirs.home.join("Apps/NVIDIA_CUDA_SDK"),
    dirs.home.join("Apps/CudaSDK"),
    PathBuf::from("/usr/local/NVIDIA_CUDA_SDK"),
    PathBuf::from("/usr/local/CUDASDK"),
    PathBuf::from("/usr/local/cuda_sdk"),
    PathBuf::from("/Developer/NVIDIA CUDA SDK"),
    PathBuf::from("/Developer/CUDA SDK"),
    PathBuf::from("/Developer/CUDA"),
    dirs.program_files.join("NVIDIA Corporation/NVIDIA CUDA SDK"),
    dirs.program_files.join("NVIDIA/NVIDIA CUDA SDK"),
    dirs.program_files.join("NVIDIA CUDA SDK"),
    dirs.program_files.join("CudaSDK"),
    dirs.home_drive.join("NVIDIA CUDA SDK"),
    dirs.home_drive.join("CUDA SDK"),
    dirs.home_drive.join("CUDA/SDK"),
  ]
}

/// Resolve the toolkit root.
///
/// An explicit `CUDA_TOOLKIT_PATH` entry is returned unmodified, without
/// probing or validation. Otherwise the candidate list is probed in order.
///
/// # Errors
///
/// [`LocateError::ToolkitNotFound`] when no override is set and no
/// candidate exists.
pub fn locate_toolkit(env: &Environment, dirs: &HostDirs) -> Result<PathBuf, LocateError> {
  if let Some(path) = env.get_str("CUDA_TOOLKIT_PATH") {
    return Ok(PathBuf::from(path));
  }

  probe_toolkit(toolkit_candidates(dirs))
}

fn probe_toolkit(candidates: Vec<PathBuf>) -> Result<PathBuf, LocateError> {
  match first_existing_dir(candidates) {
    Some(path) => {
      info!(path = %path.display(), "CUDA Toolkit found");
      Ok(path)
    }
    None => Err(LocateError::ToolkitNotFound),
  }
}

/// Resolve the SDK root.
///
/// Same override-then-probe pattern as [`locate_toolkit`], but a miss is
/// not an error: the SDK only provides extra headers and libraries, so the
/// caller degrades instead.
pub fn locate_sdk(env: &Environment, dirs: &HostDirs) -> Option<PathBuf> {
  if let Some(path) = env.get_str("CUDA_SDK_PATH") {
    return Some(PathBuf::from(path));
  }

  let found = first_existing_dir(sdk_candidates(dirs));
  match &found {
    Some(path) => info!(path = %path.display(), "CUDA SDK found"),
    None => {
      warn!("cannot find the CUDA SDK; set CUDA_SDK_PATH in the build environment to enable CUDA support")
    }
  }
  found
}
