//! Classification of the keys of a style object.
//!
//! Every key that is not a property declaration is turned into a
//! [`ConditionKey`]: a selector template (always written relative to the
//! parent selector `&`), a single at-rule condition, or an at-rule group whose
//! children carry the literal condition values.

use serde::Serialize;

use crate::utils::kebab_case;

/// The at-rules that can wrap a declaration block, in canonical outer-to-inner
/// order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AtRuleKind {
  Layer,
  Supports,
  Media,
  Container,
}

impl AtRuleKind {
  pub fn from_name(name: &str) -> Option<Self> {
    match name {
      "layer" => Some(AtRuleKind::Layer),
      "supports" => Some(AtRuleKind::Supports),
      "media" => Some(AtRuleKind::Media),
      "container" => Some(AtRuleKind::Container),
      _ => None,
    }
  }

  pub fn name(self) -> &'static str {
    match self {
      AtRuleKind::Layer => "layer",
      AtRuleKind::Supports => "supports",
      AtRuleKind::Media => "media",
      AtRuleKind::Container => "container",
    }
  }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConditionKey {
  /// Selector template. `&` stands for the parent selector; list items
  /// without `&` nest as descendants of it.
  Selector(String),
  /// `@media (min-width: 900px)` and friends.
  AtRule { kind: AtRuleKind, query: String },
  /// Bare `@media`, whose children are keyed by query.
  Group(AtRuleKind),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyError {
  Ambiguous(&'static str),
  UnsupportedAtRule,
  /// An at-rule key used where a literal condition value was expected.
  NestedAtRule,
}

/// Keys that can be read as a property name. Such keys hold declarations when
/// their value is a scalar or a condition map.
pub fn is_property_like(key: &str) -> bool {
  let rest = key
    .strip_prefix("--")
    .or_else(|| key.strip_prefix('-'))
    .unwrap_or(key);
  let mut chars = rest.chars();
  matches!(chars.next(), Some(first) if first.is_ascii_alphabetic())
    && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
}

pub fn classify_key(key: &str) -> Result<ConditionKey, KeyError> {
  let key = key.trim();
  if key.is_empty() {
    return Err(KeyError::Ambiguous("empty keys select nothing"));
  }

  if let Some(rest) = key.strip_prefix('@') {
    if key.contains('&') {
      return Err(KeyError::Ambiguous(
        "an at-rule key cannot also reference the parent selector",
      ));
    }
    let name_end = rest
      .find(|ch: char| !(ch.is_ascii_alphanumeric() || ch == '-'))
      .unwrap_or(rest.len());
    let kind = AtRuleKind::from_name(&rest[..name_end]).ok_or(KeyError::UnsupportedAtRule)?;
    let query = rest[name_end..].trim();
    if query.is_empty() {
      return Ok(ConditionKey::Group(kind));
    }
    return Ok(ConditionKey::AtRule {
      kind,
      query: query.to_string(),
    });
  }

  if let Some(name) = key.strip_prefix("__") {
    return pseudo_shorthand(name, "::");
  }

  if let Some(name) = key.strip_prefix('_') {
    return pseudo_shorthand(name, ":");
  }

  if key.starts_with('[') {
    if key.contains('&') {
      return Err(KeyError::Ambiguous(
        "an attribute shorthand cannot also reference the parent selector",
      ));
    }
    return Ok(ConditionKey::Selector(format!("&{key}")));
  }

  if key.starts_with(':') && !key.contains('&') {
    return Ok(ConditionKey::Selector(format!("&{key}")));
  }

  Ok(ConditionKey::Selector(key.to_string()))
}

fn pseudo_shorthand(name: &str, prefix: &str) -> Result<ConditionKey, KeyError> {
  if name.contains('&') {
    return Err(KeyError::Ambiguous(
      "a pseudo shorthand cannot also reference the parent selector",
    ));
  }
  if name.is_empty() || name.starts_with('_') {
    return Err(KeyError::Ambiguous("pseudo shorthand without a name"));
  }
  Ok(ConditionKey::Selector(format!(
    "&{prefix}{}",
    kebab_case(name)
  )))
}

/// Classifies a child key of an at-rule group: the key is the literal
/// condition value (a dotted layer path or a query).
pub fn classify_group_member(kind: AtRuleKind, key: &str) -> Result<ConditionKey, KeyError> {
  let query = key.trim();
  if query.is_empty() {
    return Err(KeyError::Ambiguous("empty keys select nothing"));
  }
  if query.starts_with('@') {
    return Err(KeyError::NestedAtRule);
  }
  Ok(ConditionKey::AtRule {
    kind,
    query: query.to_string(),
  })
}
