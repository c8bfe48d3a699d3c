//! CUDA build support: nvcc object compilation, include scanning, Toolkit
//! and SDK discovery, and auxiliary PTX/cubin builders.
//!
//! [`generate`] is the tool registration entry point. The host framework
//! invokes it once per build environment and it mutates the environment in
//! place; [`exists`] reports whether the configured compiler is reachable
//! on the environment's search path.

mod locate;

pub use locate::{LocateError, locate_sdk, locate_toolkit, sdk_candidates, toolkit_candidates};

use std::path::PathBuf;

use tracing::debug;

use cubuild_platform::HostDirs;

use crate::env::{
  BuilderDef, Environment, Scanner, shared_object_emitter, static_object_emitter,
};

/// Default compiler executable name.
pub const NVCC: &str = "nvcc";

/// Fixed relative location of the decuda helper scripts.
const DECUDA_PATH: &str = "tools/decuda";

/// Emitter for `.cu` static objects: defers to the standard object
/// emitter.
///
/// nvcc also drops a `.linkinfo` file next to some objects; those are not
/// tracked as targets, so a clean pass leaves them behind.
fn nvcc_static_object_emitter(
  targets: Vec<PathBuf>,
  sources: Vec<PathBuf>,
  env: &Environment,
) -> (Vec<PathBuf>, Vec<PathBuf>) {
  static_object_emitter(targets, sources, env)
}

/// Emitter for `.cu` shared objects: defers to the standard object
/// emitter.
fn nvcc_shared_object_emitter(
  targets: Vec<PathBuf>,
  sources: Vec<PathBuf>,
  env: &Environment,
) -> (Vec<PathBuf>, Vec<PathBuf>) {
  shared_object_emitter(targets, sources, env)
}

/// SDK library subdirectory for a platform identifier.
///
/// The SDK ships prebuilt libraries per platform under its `lib`
/// directories. The mapping is keyed on the environment's `PLATFORM`
/// entry, not on the host the configurator happens to run on.
pub fn sdk_lib_subdir(platform: &str) -> &'static str {
  match platform {
    "posix" => "/linux",
    "darwin" => "/darwin",
    _ => "",
  }
}

/// Register CUDA support on a build environment.
///
/// Reads install roots from the process environment. Fails only when no
/// CUDA Toolkit can be found; a missing SDK degrades gracefully by setting
/// `NO_CUDA` and skipping path and builder registration, so non-CUDA
/// targets still build.
pub fn generate(env: &mut Environment) -> Result<(), LocateError> {
  generate_with(env, &HostDirs::from_env())
}

/// [`generate`] with explicit host directories, for callers that already
/// resolved them.
pub fn generate_with(env: &mut Environment, dirs: &HostDirs) -> Result<(), LocateError> {
  // Object compilation for .cu sources, on both object builders.
  env.static_object_mut().add_action(".cu", "$STATICNVCCCMD");
  env
    .static_object_mut()
    .add_emitter(".cu", nvcc_static_object_emitter);
  env.shared_object_mut().add_action(".cu", "$SHAREDNVCCCMD");
  env
    .shared_object_mut()
    .add_emitter(".cu", nvcc_shared_object_emitter);

  // CUDA source is a superset of C as far as #include goes.
  env.add_scanner(".cu", Scanner::CIncludes);

  // Defaults. Unconditional overwrites, like any other tool module.
  env.set("NVCC", NVCC);
  env.set("NVCCFLAGS", "-I$CUDA_SDK_PATH/C/common/inc");
  env.set("STATICNVCCFLAGS", "");
  env.set("SHAREDNVCCFLAGS", "");
  env.set("ENABLESHAREDNVCCFLAG", "-shared");
  env.set(
    "STATICNVCCCMD",
    "$NVCC -o $TARGET -c $NVCCFLAGS $STATICNVCCFLAGS $SOURCES",
  );
  env.set(
    "SHAREDNVCCCMD",
    "$NVCC -o $TARGET -c $NVCCFLAGS $SHAREDNVCCFLAGS $ENABLESHAREDNVCCFLAG $SOURCES",
  );

  // Toolkit resolution must precede every path-dependent entry below; a
  // miss aborts before any of them is written.
  let toolkit = locate_toolkit(env, dirs)?;
  env.set("CUDA_TOOLKIT_PATH", toolkit.to_string_lossy().as_ref());

  let Some(sdk) = locate_sdk(env, dirs) else {
    env.set("NO_CUDA", true);
    return Ok(());
  };
  env.set("CUDA_SDK_PATH", sdk.to_string_lossy().as_ref());

  let lib_subdir = sdk_lib_subdir(env.get_str("PLATFORM").unwrap_or_default());
  debug!(
    toolkit = %toolkit.display(),
    sdk = %sdk.display(),
    lib_subdir,
    "configuring CUDA search paths"
  );

  // The compiler must be invocable by the host's executor.
  env.prepend_exec_path("PATH", toolkit.join("bin"));

  let as_str = |p: PathBuf| p.to_string_lossy().into_owned();

  env.append(
    "CPPPATH",
    [
      sdk.join("shared/inc"),
      sdk.join("C/common/inc"),
      sdk.join("common/inc"),
      toolkit.join("include"),
    ]
    .map(as_str),
  );
  env.append(
    "LIBPATH",
    [
      sdk.join("lib"),
      sdk.join("C/lib"),
      sdk.join("shared/lib"),
      sdk.join(format!("common/lib{lib_subdir}")),
      sdk.join(format!("C/common/lib{lib_subdir}")),
      toolkit.join("lib64"),
      toolkit.join("lib"),
    ]
    .map(as_str),
  );
  env.append("LIBS", ["cudart"]);

  // Auxiliary builders: intermediate formats and the decuda disassembly
  // helpers.
  env.add_builder(
    "Ptx",
    BuilderDef {
      action: "$NVCC -o $TARGET $NVCCFLAGS -ptx $SOURCE".to_string(),
      suffix: ".ptx".to_string(),
    },
  );
  env.add_builder(
    "Elf",
    BuilderDef {
      action: "$NVCC -o $TARGET $NVCCFLAGS -cubin $SOURCE".to_string(),
      suffix: ".elf".to_string(),
    },
  );
  env.add_builder(
    "Cubin",
    BuilderDef {
      action: format!("{DECUDA_PATH}/elfToCubin.py $SOURCE > $TARGET"),
      suffix: ".cubin".to_string(),
    },
  );
  env.add_builder(
    "DeCubin",
    BuilderDef {
      action: format!("{DECUDA_PATH}/decuda.py -o $TARGET $SOURCE"),
      suffix: ".txt".to_string(),
    },
  );

  Ok(())
}

/// Reports whether the configured CUDA compiler can be found on the
/// environment's executable search path. Pure query, no side effects.
pub fn exists(env: &Environment) -> bool {
  let compiler = env.get_str("NVCC").unwrap_or(NVCC);
  env.find_program(compiler).is_some()
}
