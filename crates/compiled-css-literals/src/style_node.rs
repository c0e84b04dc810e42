//! The nested style description the compiler consumes.
//!
//! A [`StyleNode`] is usually read from a JSON object whose keys keep their
//! authored order:
//!
//! ```
//! use compiled_css_literals::StyleNode;
//! use serde_json::json;
//!
//! let node = StyleNode::from_json(&json!({
//!   "color": { "base": "black", "_hover": "red" },
//!   "@media (min-width: 900px)": { "padding": 16 },
//! }))
//! .unwrap();
//! assert_eq!(node.declarations().count(), 1);
//! assert_eq!(node.children().count(), 1);
//! ```

use serde_json::{Map, Value};

use crate::condition::{classify_group_member, classify_key, is_property_like, AtRuleKind, ConditionKey, KeyError};
use crate::errors::{CompileError, KeyPath};
use crate::resolver::ValueTemplate;
use crate::utils::add_unit_if_needed;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct StyleNode {
  entries: Vec<StyleEntry>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum StyleEntry {
  Declaration {
    property: String,
    value: StyleValue,
  },
  Nested {
    key: String,
    condition: ConditionKey,
    node: StyleNode,
  },
}

#[derive(Clone, Debug, PartialEq)]
pub enum StyleValue {
  Literal(String),
  Reference(ValueTemplate),
  Conditional(ConditionMap),
}

impl StyleValue {
  /// A literal, or a reference when `value` mentions `@property`.
  pub fn from_text(value: &str) -> Self {
    let value = value.trim();
    match ValueTemplate::parse(value) {
      Some(template) => StyleValue::Reference(template),
      None => StyleValue::Literal(value.to_string()),
    }
  }
}

/// `color: { base: "black", _hover: "red" }`: one property whose value depends
/// on conditions.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConditionMap {
  base: Option<Box<StyleValue>>,
  conditions: Vec<ConditionalValue>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ConditionalValue {
  pub key: String,
  pub condition: ConditionKey,
  pub value: StyleValue,
}

impl ConditionMap {
  pub fn base(&self) -> Option<&StyleValue> {
    self.base.as_deref()
  }

  pub fn conditions(&self) -> &[ConditionalValue] {
    &self.conditions
  }

  /// Rewrites the map as the equivalent nested entries: `base` declares the
  /// property in place, every condition becomes a child holding a single
  /// declaration of the property.
  pub fn expand(&self, property: &str) -> Vec<StyleEntry> {
    let mut entries = Vec::with_capacity(self.conditions.len() + 1);
    if let Some(base) = &self.base {
      entries.push(StyleEntry::Declaration {
        property: property.to_string(),
        value: (**base).clone(),
      });
    }
    for conditional in &self.conditions {
      entries.push(StyleEntry::Nested {
        key: conditional.key.clone(),
        condition: conditional.condition.clone(),
        node: StyleNode::single(property, conditional.value.clone()),
      });
    }
    entries
  }
}

impl StyleNode {
  pub fn single(property: &str, value: StyleValue) -> Self {
    StyleNode {
      entries: vec![StyleEntry::Declaration {
        property: property.to_string(),
        value,
      }],
    }
  }

  pub fn from_json(value: &Value) -> Result<Self, CompileError> {
    parse_node(value, &KeyPath::root())
  }

  pub fn entries(&self) -> &[StyleEntry] {
    &self.entries
  }

  /// Properties this node declares itself: plain and referencing values, and
  /// condition maps with a `base`.
  pub fn declared_properties(&self) -> impl Iterator<Item = &str> {
    self.declarations().filter_map(|(property, value)| match value {
      StyleValue::Conditional(conditions) if conditions.base().is_none() => None,
      _ => Some(property),
    })
  }

  pub fn declarations(&self) -> impl Iterator<Item = (&str, &StyleValue)> {
    self.entries.iter().filter_map(|entry| match entry {
      StyleEntry::Declaration { property, value } => Some((property.as_str(), value)),
      StyleEntry::Nested { .. } => None,
    })
  }

  pub fn children(&self) -> impl Iterator<Item = (&str, &ConditionKey, &StyleNode)> {
    self.entries.iter().filter_map(|entry| match entry {
      StyleEntry::Nested {
        key,
        condition,
        node,
      } => Some((key.as_str(), condition, node)),
      StyleEntry::Declaration { .. } => None,
    })
  }
}

fn parse_node(value: &Value, path: &KeyPath) -> Result<StyleNode, CompileError> {
  let Value::Object(map) = value else {
    return Err(CompileError::InvalidStyleValue {
      path: path.clone(),
      reason: format!("expected a style object, found {}", describe(value)),
    });
  };

  let mut entries = Vec::with_capacity(map.len());
  for (key, value) in map {
    entries.push(parse_entry(key, value, path)?);
  }
  Ok(StyleNode { entries })
}

fn parse_entry(key: &str, value: &Value, parent: &KeyPath) -> Result<StyleEntry, CompileError> {
  let path = parent.child(key);

  if is_property_like(key) {
    let Value::Object(map) = value else {
      return Ok(StyleEntry::Declaration {
        property: key.to_string(),
        value: parse_scalar(key, value, &path)?,
      });
    };

    return match shape_of(map) {
      Shape::ConditionMap => Ok(StyleEntry::Declaration {
        property: key.to_string(),
        value: StyleValue::Conditional(parse_condition_map(key, map, &path)?),
      }),
      Shape::Rule => Ok(StyleEntry::Nested {
        key: key.to_string(),
        condition: classify(key, parent)?,
        node: parse_node(value, &path)?,
      }),
      Shape::Mixed => Err(CompileError::AmbiguousConditionKey {
        path: parent.clone(),
        key: key.to_string(),
        reason: "value mixes conditional values with nested rules".into(),
      }),
    };
  }

  let condition = classify(key, parent)?;
  if !value.is_object() {
    return Err(CompileError::InvalidStyleValue {
      path,
      reason: format!("condition keys take a style object, found {}", describe(value)),
    });
  }
  let node = match condition {
    ConditionKey::Group(kind) => parse_group(kind, value, &path)?,
    _ => parse_node(value, &path)?,
  };
  Ok(StyleEntry::Nested {
    key: key.to_string(),
    condition,
    node,
  })
}

fn parse_group(kind: AtRuleKind, value: &Value, path: &KeyPath) -> Result<StyleNode, CompileError> {
  let Value::Object(members) = value else {
    return Err(CompileError::InvalidStyleValue {
      path: path.clone(),
      reason: format!("expected a style object, found {}", describe(value)),
    });
  };

  let mut entries = Vec::with_capacity(members.len());
  for (member, value) in members {
    let condition = group_member(kind, member, path)?;
    entries.push(StyleEntry::Nested {
      key: member.clone(),
      condition,
      node: parse_node(value, &path.child(member))?,
    });
  }
  Ok(StyleNode { entries })
}

fn parse_condition_map(
  property: &str,
  map: &Map<String, Value>,
  path: &KeyPath,
) -> Result<ConditionMap, CompileError> {
  let mut conditions = ConditionMap::default();

  for (key, value) in map {
    let value_path = path.child(key);
    if key == "base" {
      conditions.base = Some(Box::new(parse_conditional_value(property, value, &value_path)?));
      continue;
    }

    match classify(key, path)? {
      ConditionKey::Group(kind) => {
        let Value::Object(members) = value else {
          return Err(CompileError::InvalidStyleValue {
            path: value_path,
            reason: format!("expected an object of conditions, found {}", describe(value)),
          });
        };
        for (member, value) in members {
          let condition = group_member(kind, member, &value_path)?;
          conditions.conditions.push(ConditionalValue {
            key: format!("@{} {}", kind.name(), member.trim()),
            condition,
            value: parse_conditional_value(property, value, &value_path.child(member))?,
          });
        }
      }
      condition => conditions.conditions.push(ConditionalValue {
        key: key.clone(),
        condition,
        value: parse_conditional_value(property, value, &value_path)?,
      }),
    }
  }

  Ok(conditions)
}

fn parse_conditional_value(property: &str, value: &Value, path: &KeyPath) -> Result<StyleValue, CompileError> {
  match value {
    Value::Object(map) => Ok(StyleValue::Conditional(parse_condition_map(property, map, path)?)),
    _ => parse_scalar(property, value, path),
  }
}

fn parse_scalar(property: &str, value: &Value, path: &KeyPath) -> Result<StyleValue, CompileError> {
  match value {
    Value::String(text) => Ok(StyleValue::from_text(text)),
    Value::Number(number) => match number.as_f64() {
      Some(number) => Ok(StyleValue::Literal(add_unit_if_needed(property, number))),
      None => Err(CompileError::InvalidStyleValue {
        path: path.clone(),
        reason: format!("{number} is not representable as a CSS number"),
      }),
    },
    _ => Err(CompileError::InvalidStyleValue {
      path: path.clone(),
      reason: format!("expected a string or number, found {}", describe(value)),
    }),
  }
}

fn classify(key: &str, parent: &KeyPath) -> Result<ConditionKey, CompileError> {
  classify_key(key).map_err(|error| key_error(error, key, parent))
}

fn group_member(kind: AtRuleKind, member: &str, group: &KeyPath) -> Result<ConditionKey, CompileError> {
  classify_group_member(kind, member).map_err(|error| match error {
    KeyError::NestedAtRule => CompileError::ConflictingAtRuleKind {
      first: group.clone(),
      second: group.child(member),
      reason: format!(
        "children of a bare @{} group are {} values, not at-rules",
        kind.name(),
        kind.name()
      ),
    },
    other => key_error(other, member, group),
  })
}

fn key_error(error: KeyError, key: &str, parent: &KeyPath) -> CompileError {
  match error {
    KeyError::Ambiguous(reason) => CompileError::AmbiguousConditionKey {
      path: parent.clone(),
      key: key.to_string(),
      reason: reason.to_string(),
    },
    KeyError::UnsupportedAtRule => CompileError::UnsupportedAtRule {
      path: parent.clone(),
      key: key.to_string(),
    },
    KeyError::NestedAtRule => CompileError::ConflictingAtRuleKind {
      first: parent.clone(),
      second: parent.child(key),
      reason: "at-rule used where a condition value was expected".into(),
    },
  }
}

enum Shape {
  ConditionMap,
  Rule,
  Mixed,
}

/// Decides whether the object under a property-like key is a condition map
/// or a nested rule for an element selector.
fn shape_of(map: &Map<String, Value>) -> Shape {
  let mut conditional = false;
  let mut rule = false;

  for (key, value) in map {
    if key != "base" && is_property_like(key) {
      rule = true;
    } else if is_conditional_entry(key, value) || !value.is_object() {
      conditional = true;
    } else {
      rule = true;
    }
  }

  match (conditional, rule) {
    (true, true) => Shape::Mixed,
    (true, false) => Shape::ConditionMap,
    _ => Shape::Rule,
  }
}

fn is_condition_map(map: &Map<String, Value>) -> bool {
  !map.is_empty() && map.iter().all(|(key, value)| is_conditional_entry(key, value))
}

fn is_conditional_entry(key: &str, value: &Value) -> bool {
  if key != "base" && is_property_like(key) {
    return false;
  }
  match value {
    Value::String(_) | Value::Number(_) => true,
    // Group members are queries, which may look like property names.
    Value::Object(members) if matches!(classify_key(key), Ok(ConditionKey::Group(_))) => {
      !members.is_empty()
        && members.values().all(|value| match value {
          Value::String(_) | Value::Number(_) => true,
          Value::Object(inner) => is_condition_map(inner),
          _ => false,
        })
    }
    Value::Object(inner) => is_condition_map(inner),
    _ => false,
  }
}

fn describe(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "a boolean",
    Value::Number(_) => "a number",
    Value::String(_) => "a string",
    Value::Array(_) => "an array",
    Value::Object(_) => "an object",
  }
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;
  use serde_json::json;

  use super::*;

  fn parse(value: Value) -> StyleNode {
    match StyleNode::from_json(&value) {
      Ok(node) => node,
      Err(error) => panic!("{error}"),
    }
  }

  #[test]
  fn keeps_authored_entry_order() {
    let node = parse(json!({
      "color": "red",
      "_hover": { "color": "blue" },
      "padding": 8,
    }));

    let kinds: Vec<bool> = node
      .entries()
      .iter()
      .map(|entry| matches!(entry, StyleEntry::Declaration { .. }))
      .collect();
    assert_eq!(kinds, vec![true, false, true]);
    assert_eq!(
      node.declarations().collect::<Vec<_>>(),
      vec![
        ("color", &StyleValue::Literal("red".into())),
        ("padding", &StyleValue::Literal("8px".into())),
      ]
    );
  }

  #[test]
  fn detects_references() {
    let node = parse(json!({ "width": "50px", "height": " @width " }));
    let values: Vec<_> = node.declarations().map(|(_, value)| value.clone()).collect();
    assert!(matches!(values[0], StyleValue::Literal(_)));
    assert!(matches!(values[1], StyleValue::Reference(_)));
  }

  #[test]
  fn property_objects_with_conditions_are_condition_maps() {
    let node = parse(json!({
      "color": {
        "base": "black",
        "_hover": "red",
        "@media": { "(min-width: 900px)": "teal" },
      }
    }));

    let Some((_, StyleValue::Conditional(map))) = node.declarations().next() else {
      panic!("expected a condition map");
    };
    assert_eq!(map.base(), Some(&StyleValue::Literal("black".into())));
    assert_eq!(
      map.conditions().iter().map(|c| c.key.as_str()).collect::<Vec<_>>(),
      vec!["_hover", "@media (min-width: 900px)"]
    );
    assert_eq!(
      map.conditions()[1].condition,
      ConditionKey::AtRule {
        kind: AtRuleKind::Media,
        query: "(min-width: 900px)".into(),
      }
    );
  }

  #[test]
  fn lists_properties_declared_in_place() {
    let node = parse(json!({
      "width": 10,
      "color": { "_hover": "red" },
      "margin": { "base": 0, "_hover": 4 },
      "_focus": { "height": 2 },
    }));
    assert_eq!(node.declared_properties().collect::<Vec<_>>(), vec!["width", "margin"]);
  }

  #[test]
  fn expansion_is_the_nested_equivalent() {
    let node = parse(json!({ "color": { "base": "black", "_hover": "red" } }));
    let Some((_, StyleValue::Conditional(map))) = node.declarations().next() else {
      panic!("expected a condition map");
    };

    let nested = parse(json!({ "color": "black", "_hover": { "color": "red" } }));
    assert_eq!(map.expand("color"), nested.entries().to_vec());
  }

  #[test]
  fn property_objects_with_declarations_are_element_rules() {
    let node = parse(json!({ "li": { "listStyle": "none" } }));
    let children: Vec<_> = node.children().collect();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].1, &ConditionKey::Selector("li".into()));
  }

  #[test]
  fn mixed_property_objects_are_ambiguous() {
    let error = StyleNode::from_json(&json!({
      "_focus": {
        "color": { "base": "black", "_hover": { "outline": "none" } }
      }
    }));
    assert_eq!(
      error,
      Err(CompileError::AmbiguousConditionKey {
        path: KeyPath::root().child("_focus"),
        key: "color".into(),
        reason: "value mixes conditional values with nested rules".into(),
      })
    );
  }

  #[test]
  fn groups_hold_literal_conditions() {
    let node = parse(json!({ "@layer": { "base": { "color": "red" } } }));
    let Some((_, condition, group)) = node.children().next() else {
      panic!("expected a group");
    };
    assert_eq!(condition, &ConditionKey::Group(AtRuleKind::Layer));
    assert_eq!(
      group.children().map(|(_, condition, _)| condition.clone()).collect::<Vec<_>>(),
      vec![ConditionKey::AtRule {
        kind: AtRuleKind::Layer,
        query: "base".into(),
      }]
    );
  }

  #[test]
  fn at_rules_inside_groups_conflict() {
    let error = StyleNode::from_json(&json!({
      "@media": { "@supports (display: grid)": { "color": "red" } }
    }));
    assert!(matches!(
      error,
      Err(CompileError::ConflictingAtRuleKind { first, second, .. })
        if first == KeyPath::root().child("@media")
          && second == KeyPath::root().child("@media").child("@supports (display: grid)")
    ));
  }

  #[test]
  fn rejects_non_css_values() {
    assert!(matches!(
      StyleNode::from_json(&json!({ "color": true })),
      Err(CompileError::InvalidStyleValue { .. })
    ));
    assert!(matches!(
      StyleNode::from_json(&json!({ "_hover": "red" })),
      Err(CompileError::InvalidStyleValue { .. })
    ));
    assert!(matches!(
      StyleNode::from_json(&json!(["color"])),
      Err(CompileError::InvalidStyleValue { .. })
    ));
  }

  #[test]
  fn reports_unsupported_at_rules_with_their_parent() {
    assert_eq!(
      StyleNode::from_json(&json!({ "_hover": { "@font-face": {} } })),
      Err(CompileError::UnsupportedAtRule {
        path: KeyPath::root().child("_hover"),
        key: "@font-face".into(),
      })
    );
  }
}
