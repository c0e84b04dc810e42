use std::fmt;

use serde::Serialize;

use crate::config::CompilerConfig;

/// Opaque class name assigned to a compiled style object.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ClassToken(String);

impl ClassToken {
  pub fn new(name: impl Into<String>) -> Self {
    ClassToken(name.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }

  /// The class selector, `.name`.
  pub fn selector(&self) -> String {
    format!(".{}", self.0)
  }
}

impl fmt::Display for ClassToken {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// Assigns class names to style objects.
///
/// Called once per `css` compilation and once per variant of a variant group,
/// with a logical path such as `button` or `button.primary`. Implementations
/// shared between threads must hand out unique names on their own.
pub trait ClassNamer: Send + Sync {
  fn name_for(&self, logical_path: &str) -> ClassToken;
}

impl<F> ClassNamer for F
where
  F: Fn(&str) -> ClassToken + Send + Sync,
{
  fn name_for(&self, logical_path: &str) -> ClassToken {
    self(logical_path)
  }
}

/// Names classes `_<hash>` from the logical path, optionally mixed with a
/// prefix so independently built sheets do not collide.
#[derive(Clone, Debug, Default)]
pub struct HashClassNamer {
  prefix: Option<String>,
}

impl HashClassNamer {
  pub fn new(prefix: Option<String>) -> Self {
    HashClassNamer { prefix }
  }

  pub fn from_config(config: &CompilerConfig) -> Self {
    Self::new(config.class_hash_prefix.clone())
  }
}

impl ClassNamer for HashClassNamer {
  fn name_for(&self, logical_path: &str) -> ClassToken {
    let hashed = match &self.prefix {
      Some(prefix) => hash(&format!("{prefix}{logical_path}"), 0),
      None => hash(logical_path, 0),
    };
    ClassToken(format!("_{hashed}"))
  }
}

const M: u32 = 0x5bd1_e995;

fn murmur2(bytes: &[u8], seed: u32) -> u32 {
  let mut h = seed ^ bytes.len() as u32;

  let mut chunks = bytes.chunks_exact(4);
  for chunk in &mut chunks {
    let mut k = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    k = k.wrapping_mul(M);
    k ^= k >> 24;
    k = k.wrapping_mul(M);
    h = h.wrapping_mul(M) ^ k;
  }

  let tail = chunks.remainder();
  if !tail.is_empty() {
    for (index, byte) in tail.iter().enumerate() {
      h ^= u32::from(*byte) << (8 * index);
    }
    h = h.wrapping_mul(M);
  }

  h ^= h >> 13;
  h = h.wrapping_mul(M);
  h ^ (h >> 15)
}

fn to_base36(mut value: u32) -> String {
  const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
  if value == 0 {
    return "0".into();
  }

  let mut digits = Vec::new();
  while value > 0 {
    digits.push(char::from(DIGITS[(value % 36) as usize]));
    value /= 36;
  }
  digits.iter().rev().collect()
}

/// MurmurHash2 of `key`, base-36 encoded. Produces the same strings as the
/// compiled CSS runtime's class name hash.
pub fn hash(key: &str, seed: u32) -> String {
  to_base36(murmur2(key.as_bytes(), seed))
}
