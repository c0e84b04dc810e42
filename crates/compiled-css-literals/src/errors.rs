use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// The sequence of keys leading from the root style object to a node.
///
/// Displayed as `root["@media (min-width: 900px)"]["_hover"]` so that callers
/// can point at the exact place in the authored object.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct KeyPath(Vec<String>);

impl KeyPath {
  pub fn root() -> Self {
    Self::default()
  }

  pub fn child(&self, key: impl Into<String>) -> Self {
    let mut keys = self.0.clone();
    keys.push(key.into());
    Self(keys)
  }

  pub fn push(&mut self, key: impl Into<String>) {
    self.0.push(key.into());
  }

  pub fn pop(&mut self) -> Option<String> {
    self.0.pop()
  }

  pub fn keys(&self) -> &[String] {
    &self.0
  }

  pub fn is_root(&self) -> bool {
    self.0.is_empty()
  }
}

impl<S: Into<String>> FromIterator<S> for KeyPath {
  fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
    Self(iter.into_iter().map(Into::into).collect())
  }
}

impl fmt::Display for KeyPath {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("root")?;
    for key in &self.0 {
      write!(f, "[{key:?}]")?;
    }
    Ok(())
  }
}

/// Failure to compile a style object.
///
/// Compilation is atomic: the first error aborts the unit and no partial
/// output is produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
  #[error("ambiguous condition key {key:?} in {path}: {reason}")]
  AmbiguousConditionKey {
    path: KeyPath,
    key: String,
    reason: String,
  },
  #[error("`{property}` at {path} references @{reference} before it is declared")]
  ForwardPropertyReference {
    path: KeyPath,
    property: String,
    reference: String,
  },
  #[error("unknown variant reference %{variant} at {path}")]
  UnknownVariantReference { path: KeyPath, variant: String },
  #[error("cannot linearize {first} with {second}: {reason}")]
  ConflictingAtRuleKind {
    first: KeyPath,
    second: KeyPath,
    reason: String,
  },
  #[error("unsupported at-rule {key:?} in {path}")]
  UnsupportedAtRule { path: KeyPath, key: String },
  #[error("invalid style value at {path}: {reason}")]
  InvalidStyleValue { path: KeyPath, reason: String },
}

impl CompileError {
  /// Path of the node the error is reported against. For conflicts this is
  /// the innermost of the two offending paths.
  pub fn path(&self) -> &KeyPath {
    match self {
      CompileError::AmbiguousConditionKey { path, .. }
      | CompileError::ForwardPropertyReference { path, .. }
      | CompileError::UnknownVariantReference { path, .. }
      | CompileError::UnsupportedAtRule { path, .. }
      | CompileError::InvalidStyleValue { path, .. } => path,
      CompileError::ConflictingAtRuleKind { second, .. } => second,
    }
  }
}
