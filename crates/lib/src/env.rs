//! The mutable build environment that tools configure.
//!
//! An [`Environment`] is owned by the host build framework and handed to
//! each tool's registration entry point by mutable reference. Tools write
//! construction variables (scalars and lists), extend the subprocess
//! environment used to invoke compilers, and register builders, emitters
//! and scanners. Nothing here executes commands: the environment only
//! carries the templates and metadata the host's execution engine consumes
//! later.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use cubuild_platform::Os;

use crate::template::Resolver;

/// Separator for PATH-style subprocess environment entries.
const PATH_LIST_SEP: char = if cfg!(windows) { ';' } else { ':' };

/// A single construction variable value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
  String(String),
  Bool(bool),
  List(Vec<String>),
}

impl From<&str> for Value {
  fn from(value: &str) -> Self {
    Value::String(value.to_string())
  }
}

impl From<String> for Value {
  fn from(value: String) -> Self {
    Value::String(value)
  }
}

impl From<bool> for Value {
  fn from(value: bool) -> Self {
    Value::Bool(value)
  }
}

impl From<Vec<String>> for Value {
  fn from(value: Vec<String>) -> Self {
    Value::List(value)
  }
}

/// Emitter hook: adjusts the declared target/source file sets for a build
/// step before the host schedules it.
pub type Emitter = fn(Vec<PathBuf>, Vec<PathBuf>, &Environment) -> (Vec<PathBuf>, Vec<PathBuf>);

/// Dependency scanner kinds that can be attached to a source suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scanner {
  /// C-preprocessor `#include` discovery, shared by C, C++ and CUDA
  /// sources.
  CIncludes,
}

/// A named single-command builder: one typed output file from one input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuilderDef {
  /// Command template executed to produce the target.
  pub action: String,
  /// Suffix given to generated targets (e.g. `.ptx`).
  pub suffix: String,
}

/// Per-suffix actions and emitters for one object builder (static or
/// shared).
#[derive(Default)]
pub struct ObjectBuilder {
  actions: BTreeMap<String, String>,
  emitters: BTreeMap<String, Emitter>,
}

impl ObjectBuilder {
  /// Bind a source suffix to a command template.
  pub fn add_action(&mut self, suffix: &str, command: &str) {
    self.actions.insert(suffix.to_string(), command.to_string());
  }

  /// Bind a source suffix to an emitter.
  pub fn add_emitter(&mut self, suffix: &str, emitter: Emitter) {
    self.emitters.insert(suffix.to_string(), emitter);
  }

  /// The command template registered for a source suffix.
  pub fn action(&self, suffix: &str) -> Option<&str> {
    self.actions.get(suffix).map(String::as_str)
  }

  /// Apply the emitter registered for a source suffix; passthrough when
  /// none is registered.
  pub fn emit(
    &self,
    suffix: &str,
    targets: Vec<PathBuf>,
    sources: Vec<PathBuf>,
    env: &Environment,
  ) -> (Vec<PathBuf>, Vec<PathBuf>) {
    match self.emitters.get(suffix) {
      Some(emitter) => emitter(targets, sources, env),
      None => (targets, sources),
    }
  }
}

/// The build environment: construction variables, subprocess environment,
/// object builders, scanners, and named builder registrations.
///
/// Lives exactly as long as one build invocation and is never shared across
/// threads; tools mutate it through `&mut` and the host reads it afterwards.
pub struct Environment {
  vars: BTreeMap<String, Value>,
  exec_env: BTreeMap<String, String>,
  static_object: ObjectBuilder,
  shared_object: ObjectBuilder,
  scanners: BTreeMap<String, Scanner>,
  builders: BTreeMap<String, BuilderDef>,
}

impl Environment {
  /// Create an environment with host defaults for the running platform:
  /// the `PLATFORM` identifier, object suffixes, and the subprocess PATH
  /// inherited from the current process.
  pub fn new() -> Self {
    Self::for_platform(Os::current())
  }

  /// Create an environment configured for an explicit target platform.
  pub fn for_platform(os: Os) -> Self {
    let mut env = Self {
      vars: BTreeMap::new(),
      exec_env: BTreeMap::new(),
      static_object: ObjectBuilder::default(),
      shared_object: ObjectBuilder::default(),
      scanners: BTreeMap::new(),
      builders: BTreeMap::new(),
    };

    env.set("PLATFORM", os.as_str());
    match os {
      Os::Win32 => {
        env.set("OBJSUFFIX", ".obj");
        env.set("SHOBJSUFFIX", ".obj");
      }
      Os::Posix | Os::Darwin => {
        env.set("OBJSUFFIX", ".o");
        env.set("SHOBJSUFFIX", ".os");
      }
    }

    if let Ok(path) = std::env::var("PATH") {
      env.exec_env.insert("PATH".to_string(), path);
    }

    env
  }

  /// Set a construction variable, overwriting any existing value.
  pub fn set(&mut self, key: &str, value: impl Into<Value>) {
    self.vars.insert(key.to_string(), value.into());
  }

  /// The raw value of a construction variable.
  pub fn get(&self, key: &str) -> Option<&Value> {
    self.vars.get(key)
  }

  /// A scalar string variable; `None` for absent or non-string entries.
  pub fn get_str(&self, key: &str) -> Option<&str> {
    match self.vars.get(key) {
      Some(Value::String(s)) => Some(s.as_str()),
      _ => None,
    }
  }

  /// A boolean variable; absent or non-boolean entries read as `false`.
  pub fn get_bool(&self, key: &str) -> bool {
    matches!(self.vars.get(key), Some(Value::Bool(true)))
  }

  /// A list variable; `None` for absent or non-list entries.
  pub fn get_list(&self, key: &str) -> Option<&[String]> {
    match self.vars.get(key) {
      Some(Value::List(items)) => Some(items.as_slice()),
      _ => None,
    }
  }

  /// Append entries to a list variable, preserving whatever the
  /// environment already contained. An absent entry becomes a fresh list;
  /// a pre-existing scalar is promoted to the first element.
  pub fn append<I, S>(&mut self, key: &str, items: I)
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    let items: Vec<String> = items.into_iter().map(Into::into).collect();
    let value = self
      .vars
      .entry(key.to_string())
      .or_insert_with(|| Value::List(Vec::new()));

    match value {
      Value::List(list) => list.extend(items),
      Value::String(existing) => {
        let mut list = vec![std::mem::take(existing)];
        list.extend(items);
        *value = Value::List(list);
      }
      Value::Bool(_) => *value = Value::List(items),
    }
  }

  /// A subprocess environment entry.
  pub fn exec_env(&self, name: &str) -> Option<&str> {
    self.exec_env.get(name).map(String::as_str)
  }

  /// Set a subprocess environment entry, overwriting any existing value.
  pub fn set_exec_env(&mut self, name: &str, value: &str) {
    self.exec_env.insert(name.to_string(), value.to_string());
  }

  /// Prepend a directory to a PATH-style subprocess environment entry.
  pub fn prepend_exec_path(&mut self, name: &str, dir: impl AsRef<Path>) {
    let dir = dir.as_ref().to_string_lossy().into_owned();
    let entry = self.exec_env.entry(name.to_string()).or_default();
    if entry.is_empty() {
      *entry = dir;
    } else {
      *entry = format!("{dir}{PATH_LIST_SEP}{entry}");
    }
  }

  /// Search the subprocess `PATH` for an executable, the way the host
  /// framework's tool detection does. Returns the first match.
  pub fn find_program(&self, name: &str) -> Option<PathBuf> {
    let path = self.exec_env.get("PATH")?;
    for dir in std::env::split_paths(path) {
      let candidate = dir.join(name);
      if candidate.is_file() {
        return Some(candidate);
      }
      if cfg!(windows) {
        let candidate = candidate.with_extension("exe");
        if candidate.is_file() {
          return Some(candidate);
        }
      }
    }
    None
  }

  /// The builder for static object files.
  pub fn static_object(&self) -> &ObjectBuilder {
    &self.static_object
  }

  pub fn static_object_mut(&mut self) -> &mut ObjectBuilder {
    &mut self.static_object
  }

  /// The builder for shared (position-independent) object files.
  pub fn shared_object(&self) -> &ObjectBuilder {
    &self.shared_object
  }

  pub fn shared_object_mut(&mut self) -> &mut ObjectBuilder {
    &mut self.shared_object
  }

  /// Attach a dependency scanner to a source suffix.
  pub fn add_scanner(&mut self, suffix: &str, scanner: Scanner) {
    self.scanners.insert(suffix.to_string(), scanner);
  }

  /// The scanner registered for a source suffix.
  pub fn scanner(&self, suffix: &str) -> Option<Scanner> {
    self.scanners.get(suffix).copied()
  }

  /// Register a named builder.
  pub fn add_builder(&mut self, name: &str, def: BuilderDef) {
    self.builders.insert(name.to_string(), def);
  }

  /// A named builder registration.
  pub fn builder(&self, name: &str) -> Option<&BuilderDef> {
    self.builders.get(name)
  }

  /// Names of all registered builders, in sorted order.
  pub fn builder_names(&self) -> impl Iterator<Item = &str> {
    self.builders.keys().map(String::as_str)
  }
}

impl Default for Environment {
  fn default() -> Self {
    Self::new()
  }
}

impl Resolver for Environment {
  fn resolve(&self, name: &str) -> Option<String> {
    match self.vars.get(name)? {
      Value::String(s) => Some(s.clone()),
      Value::Bool(b) => Some(b.to_string()),
      Value::List(items) => Some(items.join(" ")),
    }
  }
}

/// Standard static-object emitter: when the caller declared no targets,
/// derive one from the first source and the `OBJSUFFIX` entry.
pub fn static_object_emitter(
  targets: Vec<PathBuf>,
  sources: Vec<PathBuf>,
  env: &Environment,
) -> (Vec<PathBuf>, Vec<PathBuf>) {
  default_object_targets(targets, sources, env, "OBJSUFFIX")
}

/// Standard shared-object emitter, keyed on `SHOBJSUFFIX`.
pub fn shared_object_emitter(
  targets: Vec<PathBuf>,
  sources: Vec<PathBuf>,
  env: &Environment,
) -> (Vec<PathBuf>, Vec<PathBuf>) {
  default_object_targets(targets, sources, env, "SHOBJSUFFIX")
}

fn default_object_targets(
  mut targets: Vec<PathBuf>,
  sources: Vec<PathBuf>,
  env: &Environment,
  suffix_key: &str,
) -> (Vec<PathBuf>, Vec<PathBuf>) {
  if targets.is_empty() {
    if let Some(first) = sources.first() {
      let suffix = env.get_str(suffix_key).unwrap_or(".o");
      targets.push(first.with_extension(suffix.trim_start_matches('.')));
    }
  }
  (targets, sources)
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  fn posix_env() -> Environment {
    Environment::for_platform(Os::Posix)
  }

  mod vars {
    use super::*;

    #[test]
    fn set_overwrites_unconditionally() {
      let mut env = posix_env();
      env.set("NVCC", "custom-nvcc");
      env.set("NVCC", "nvcc");
      assert_eq!(env.get_str("NVCC"), Some("nvcc"));
    }

    #[test]
    fn absent_bool_reads_false() {
      let env = posix_env();
      assert!(!env.get_bool("NO_CUDA"));
    }

    #[test]
    fn bool_round_trip() {
      let mut env = posix_env();
      env.set("NO_CUDA", true);
      assert!(env.get_bool("NO_CUDA"));
    }

    #[test]
    fn append_creates_list_when_absent() {
      let mut env = posix_env();
      env.append("CPPPATH", ["/opt/cuda/include"]);
      assert_eq!(
        env.get_list("CPPPATH"),
        Some(&["/opt/cuda/include".to_string()][..])
      );
    }

    #[test]
    fn append_preserves_existing_entries() {
      let mut env = posix_env();
      env.append("LIBS", ["m"]);
      env.append("LIBS", ["cudart"]);
      assert_eq!(
        env.get_list("LIBS"),
        Some(&["m".to_string(), "cudart".to_string()][..])
      );
    }

    #[test]
    fn append_promotes_scalar_to_first_element() {
      let mut env = posix_env();
      env.set("LIBS", "m");
      env.append("LIBS", ["cudart"]);
      assert_eq!(
        env.get_list("LIBS"),
        Some(&["m".to_string(), "cudart".to_string()][..])
      );
    }

    #[test]
    fn platform_defaults_are_seeded() {
      let env = posix_env();
      assert_eq!(env.get_str("PLATFORM"), Some("posix"));
      assert_eq!(env.get_str("OBJSUFFIX"), Some(".o"));
      assert_eq!(env.get_str("SHOBJSUFFIX"), Some(".os"));
    }

    #[test]
    fn win32_uses_obj_suffix() {
      let env = Environment::for_platform(Os::Win32);
      assert_eq!(env.get_str("OBJSUFFIX"), Some(".obj"));
      assert_eq!(env.get_str("SHOBJSUFFIX"), Some(".obj"));
    }
  }

  mod exec_env {
    use super::*;

    #[test]
    fn prepend_puts_new_entry_first() {
      let mut env = posix_env();
      env.exec_env.insert("PATH".to_string(), "/usr/bin".to_string());
      env.prepend_exec_path("PATH", "/opt/cuda/bin");
      let path = env.exec_env("PATH").unwrap();
      assert!(path.starts_with("/opt/cuda/bin"));
      assert!(path.contains("/usr/bin"));
    }

    #[test]
    fn prepend_into_empty_entry() {
      let mut env = posix_env();
      env.exec_env.remove("PATH");
      env.prepend_exec_path("PATH", "/opt/cuda/bin");
      assert_eq!(env.exec_env("PATH"), Some("/opt/cuda/bin"));
    }

    #[test]
    fn find_program_locates_executable_on_path() {
      let tmp = TempDir::new().unwrap();
      let bin = tmp.path().join("bin");
      std::fs::create_dir(&bin).unwrap();
      std::fs::write(bin.join("nvcc"), b"").unwrap();

      let mut env = posix_env();
      env.exec_env.remove("PATH");
      env.prepend_exec_path("PATH", &bin);

      assert_eq!(env.find_program("nvcc"), Some(bin.join("nvcc")));
      assert_eq!(env.find_program("nonexistent-compiler"), None);
    }
  }

  mod builders {
    use super::*;

    #[test]
    fn object_builder_registers_action_per_suffix() {
      let mut env = posix_env();
      env.static_object_mut().add_action(".cu", "$STATICNVCCCMD");
      assert_eq!(env.static_object().action(".cu"), Some("$STATICNVCCCMD"));
      assert_eq!(env.static_object().action(".c"), None);
    }

    #[test]
    fn emit_defaults_to_passthrough() {
      let env = posix_env();
      let (targets, sources) = env.static_object().emit(
        ".cu",
        vec![PathBuf::from("explicit.o")],
        vec![PathBuf::from("kernel.cu")],
        &env,
      );
      assert_eq!(targets, vec![PathBuf::from("explicit.o")]);
      assert_eq!(sources, vec![PathBuf::from("kernel.cu")]);
    }

    #[test]
    fn standard_emitter_derives_target_from_source() {
      let env = posix_env();
      let (targets, _) =
        static_object_emitter(Vec::new(), vec![PathBuf::from("src/kernel.cu")], &env);
      assert_eq!(targets, vec![PathBuf::from("src/kernel.o")]);
    }

    #[test]
    fn shared_emitter_uses_shared_suffix() {
      let env = posix_env();
      let (targets, _) =
        shared_object_emitter(Vec::new(), vec![PathBuf::from("kernel.cu")], &env);
      assert_eq!(targets, vec![PathBuf::from("kernel.os")]);
    }

    #[test]
    fn explicit_targets_are_left_alone() {
      let env = posix_env();
      let (targets, _) = static_object_emitter(
        vec![PathBuf::from("custom.o")],
        vec![PathBuf::from("kernel.cu")],
        &env,
      );
      assert_eq!(targets, vec![PathBuf::from("custom.o")]);
    }

    #[test]
    fn named_builder_round_trip() {
      let mut env = posix_env();
      env.add_builder(
        "Ptx",
        BuilderDef {
          action: "$NVCC -o $TARGET $NVCCFLAGS -ptx $SOURCE".to_string(),
          suffix: ".ptx".to_string(),
        },
      );
      let def = env.builder("Ptx").unwrap();
      assert_eq!(def.suffix, ".ptx");
      assert!(env.builder("Elf").is_none());
    }

    #[test]
    fn scanner_registration() {
      let mut env = posix_env();
      env.add_scanner(".cu", Scanner::CIncludes);
      assert_eq!(env.scanner(".cu"), Some(Scanner::CIncludes));
      assert_eq!(env.scanner(".rs"), None);
    }
  }

  mod resolver {
    use super::*;
    use crate::template::Resolver as _;

    #[test]
    fn lists_resolve_space_joined() {
      let mut env = posix_env();
      env.append("LIBS", ["cuda", "cudart"]);
      assert_eq!(env.resolve("LIBS"), Some("cuda cudart".to_string()));
    }

    #[test]
    fn absent_vars_resolve_to_none() {
      let env = posix_env();
      assert_eq!(env.resolve("UNDEFINED"), None);
    }
  }
}
