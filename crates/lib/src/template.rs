//! Construction-variable templates for compiler command lines.
//!
//! Command templates reference environment entries with `$NAME` or
//! `${NAME}` and are expanded late, when the host framework is about to
//! invoke a command. Expansion is recursive: a variable's value may itself
//! reference further variables (`$STATICNVCCCMD` pulls in `$NVCCFLAGS`,
//! which pulls in `$CUDA_SDK_PATH`). Unknown variables expand to the empty
//! string, matching the host framework's substitution rules.
//!
//! # Escaping
//!
//! `$$` produces a literal `$`. A `$` not followed by an identifier or `{`
//! passes through unchanged.
//!
//! # Example
//!
//! ```
//! use cubuild_lib::template::{Segment, parse};
//!
//! let segments = parse("$NVCC -o $TARGET").unwrap();
//! assert_eq!(segments, vec![
//!   Segment::Var("NVCC".to_string()),
//!   Segment::Literal(" -o ".to_string()),
//!   Segment::Var("TARGET".to_string()),
//! ]);
//! ```

use thiserror::Error;

/// Expansion stops once a chain of variable references reaches this depth.
const MAX_DEPTH: usize = 16;

/// A parsed fragment of a command template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
  /// Literal text (no variable references)
  Literal(String),

  /// A variable reference to be resolved
  Var(String),
}

/// Errors that can occur during template parsing or expansion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
  #[error("unclosed variable reference at position {0}")]
  Unclosed(usize),

  #[error("empty variable reference at position {0}")]
  EmptyVar(usize),

  #[error("variable expansion exceeded depth limit in '{0}'")]
  TooDeep(String),
}

/// Provides values for variables referenced by a template.
pub trait Resolver {
  /// Resolve a variable by name; `None` means undefined.
  fn resolve(&self, name: &str) -> Option<String>;
}

/// Resolver for a single command invocation: `$TARGET`, `$SOURCE` and
/// `$SOURCES` come from the invocation, everything else from the base
/// resolver (usually the environment).
pub struct Invocation<'a, R> {
  base: &'a R,
  target: String,
  sources: Vec<String>,
}

impl<'a, R: Resolver> Invocation<'a, R> {
  pub fn new<T, I, S>(base: &'a R, target: T, sources: I) -> Self
  where
    T: Into<String>,
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      base,
      target: target.into(),
      sources: sources.into_iter().map(Into::into).collect(),
    }
  }
}

impl<R: Resolver> Resolver for Invocation<'_, R> {
  fn resolve(&self, name: &str) -> Option<String> {
    match name {
      "TARGET" => Some(self.target.clone()),
      "SOURCE" => self.sources.first().cloned(),
      "SOURCES" => Some(self.sources.join(" ")),
      _ => self.base.resolve(name),
    }
  }
}

fn is_ident_start(c: char) -> bool {
  c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
  c.is_ascii_alphanumeric() || c == '_'
}

/// Parse a template into literal and variable segments.
///
/// # Errors
///
/// Returns an error for an unclosed `${` or an empty `${}` reference.
pub fn parse(input: &str) -> Result<Vec<Segment>, TemplateError> {
  let mut segments = Vec::new();
  let mut literal = String::new();
  let mut chars = input.char_indices().peekable();

  while let Some((pos, ch)) = chars.next() {
    if ch != '$' {
      literal.push(ch);
      continue;
    }

    match chars.peek().copied() {
      Some((_, '$')) => {
        // Escaped: $$ -> literal $
        chars.next();
        literal.push('$');
      }
      Some((_, '{')) => {
        chars.next();

        let mut name = String::new();
        let mut found_close = false;
        for (_, c) in chars.by_ref() {
          if c == '}' {
            found_close = true;
            break;
          }
          name.push(c);
        }

        if !found_close {
          return Err(TemplateError::Unclosed(pos));
        }
        if name.is_empty() {
          return Err(TemplateError::EmptyVar(pos));
        }

        if !literal.is_empty() {
          segments.push(Segment::Literal(std::mem::take(&mut literal)));
        }
        segments.push(Segment::Var(name));
      }
      Some((_, c)) if is_ident_start(c) => {
        let mut name = String::new();
        while let Some(&(_, c)) = chars.peek() {
          if !is_ident_continue(c) {
            break;
          }
          name.push(c);
          chars.next();
        }

        if !literal.is_empty() {
          segments.push(Segment::Literal(std::mem::take(&mut literal)));
        }
        segments.push(Segment::Var(name));
      }
      _ => {
        // Lone $, or $ followed by something that cannot start a name
        literal.push('$');
      }
    }
  }

  if !literal.is_empty() {
    segments.push(Segment::Literal(literal));
  }

  Ok(segments)
}

/// Expand all variable references in a template using the provided
/// resolver.
///
/// Resolved values are themselves expanded, so templates can reference
/// variables that hold further templates. Undefined variables expand to
/// the empty string.
///
/// # Errors
///
/// Returns an error if parsing fails or if expansion recurses past the
/// depth limit (a reference cycle).
pub fn expand(input: &str, resolver: &impl Resolver) -> Result<String, TemplateError> {
  expand_at_depth(input, resolver, 0)
}

fn expand_at_depth(
  input: &str,
  resolver: &impl Resolver,
  depth: usize,
) -> Result<String, TemplateError> {
  if depth >= MAX_DEPTH {
    return Err(TemplateError::TooDeep(input.to_string()));
  }

  let mut result = String::new();
  for segment in parse(input)? {
    match segment {
      Segment::Literal(s) => result.push_str(&s),
      Segment::Var(name) => {
        if let Some(value) = resolver.resolve(&name) {
          result.push_str(&expand_at_depth(&value, resolver, depth + 1)?);
        }
      }
    }
  }

  Ok(result)
}

/// Expand a template and split the result into command words.
///
/// This is the form the host's executor consumes; it also collapses the
/// blank runs left behind by empty flag variables.
pub fn expand_words(input: &str, resolver: &impl Resolver) -> Result<Vec<String>, TemplateError> {
  let expanded = expand(input, resolver)?;
  Ok(expanded.split_whitespace().map(str::to_string).collect())
}
