use indexmap::IndexMap;
use serde::Serialize;

use crate::context::{Context, ContextStack};
use crate::utils::kebab_case;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Declaration {
  pub property: String,
  pub value: String,
}

impl Declaration {
  pub fn new(property: impl Into<String>, value: impl Into<String>) -> Self {
    Declaration {
      property: property.into(),
      value: value.into(),
    }
  }
}

/// Declarations sharing one canonical context stack.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FlatRule {
  #[serde(rename = "contexts")]
  pub stack: ContextStack,
  pub declarations: Vec<Declaration>,
}

impl FlatRule {
  pub fn selector(&self) -> &str {
    self.stack.selector()
  }

  /// Value declared for `property`, compared in kebab-case.
  pub fn get(&self, property: &str) -> Option<&str> {
    let property = kebab_case(property);
    self
      .declarations
      .iter()
      .find(|declaration| kebab_case(&declaration.property) == property)
      .map(|declaration| declaration.value.as_str())
  }
}

/// Collects resolved declarations and orders the resulting rules.
///
/// Declarations reaching an existing stack join its rule. Declaring a property
/// twice on the same stack keeps the later value, placed after the others.
#[derive(Debug, Default)]
pub struct RuleEmitter {
  rules: IndexMap<ContextStack, IndexMap<String, Declaration>>,
}

impl RuleEmitter {
  pub fn push(&mut self, stack: &ContextStack, property: &str, value: impl Into<String>) {
    let declaration = Declaration::new(property, value);
    let rule = self.rules.entry(stack.clone()).or_default();
    let key = kebab_case(property);
    if let Some(previous) = rule.shift_remove(&key) {
      tracing::debug!(
        selector = stack.selector(),
        property = key.as_str(),
        previous = previous.value.as_str(),
        "overriding declaration"
      );
    }
    rule.insert(key, declaration);
  }

  /// Rules without at-rules come first, then rules grouped by their outermost
  /// at-rule: layers, supports, media and container queries. Within a group,
  /// rules sharing the outermost condition stay together in the order that
  /// condition was first met.
  pub fn finish(self) -> Vec<FlatRule> {
    let mut groups: IndexMap<Context, usize> = IndexMap::new();
    let mut rules: Vec<((usize, usize), FlatRule)> = self
      .rules
      .into_iter()
      .map(|(stack, declarations)| {
        let rank = match stack.outermost_at_rule() {
          None => (0, 0),
          Some(outermost) => {
            let kind = outermost.at_rule_kind().map_or(0, |kind| kind as usize + 1);
            let next = groups.len();
            (kind, *groups.entry(outermost).or_insert(next))
          }
        };
        let rule = FlatRule {
          stack,
          declarations: declarations.into_values().collect(),
        };
        (rank, rule)
      })
      .collect();

    rules.sort_by_key(|(rank, _)| *rank);
    rules.into_iter().map(|(_, rule)| rule).collect()
  }
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use super::*;
  use crate::condition::AtRuleKind;

  fn selectors(rules: &[FlatRule]) -> Vec<String> {
    rules
      .iter()
      .map(|rule| {
        let mut out: Vec<String> = rule
          .stack
          .at_rules()
          .iter()
          .map(|context| context.value().to_string())
          .collect();
        out.push(rule.selector().to_string());
        out.join(" | ")
      })
      .collect()
  }

  #[test]
  fn merges_declarations_with_equal_stacks() {
    let mut emitter = RuleEmitter::default();
    let stack = ContextStack::new(".a");
    emitter.push(&stack, "color", "red");
    emitter.push(&ContextStack::new(".a:hover"), "color", "blue");
    emitter.push(&stack, "padding", "8px");

    let rules = emitter.finish();
    assert_eq!(rules.len(), 2);
    assert_eq!(
      rules[0].declarations,
      vec![Declaration::new("color", "red"), Declaration::new("padding", "8px")]
    );
  }

  #[test]
  fn later_declarations_override_earlier_ones() {
    let mut emitter = RuleEmitter::default();
    let stack = ContextStack::new(".a");
    emitter.push(&stack, "backgroundColor", "red");
    emitter.push(&stack, "color", "black");
    emitter.push(&stack, "background-color", "blue");

    let rules = emitter.finish();
    assert_eq!(
      rules[0].declarations,
      vec![
        Declaration::new("color", "black"),
        Declaration::new("background-color", "blue"),
      ]
    );
    assert_eq!(rules[0].get("backgroundColor"), Some("blue"));
  }

  #[test]
  fn orders_rules_by_outermost_at_rule() {
    let mut emitter = RuleEmitter::default();
    let media = ContextStack::new(".a").with(AtRuleKind::Media, "print");
    let supports = ContextStack::new(".a").with(AtRuleKind::Supports, "(display: grid)");
    let layered = ContextStack::new(".a")
      .with(AtRuleKind::Layer, "base")
      .with(AtRuleKind::Media, "print");
    let screen = ContextStack::new(".a").with(AtRuleKind::Media, "screen");
    let print_hover = ContextStack::new(".a:hover").with(AtRuleKind::Media, "print");

    emitter.push(&media, "color", "black");
    emitter.push(&supports, "display", "grid");
    emitter.push(&layered, "color", "gray");
    emitter.push(&screen, "color", "blue");
    emitter.push(&ContextStack::new(".a"), "color", "red");
    emitter.push(&print_hover, "color", "navy");

    assert_eq!(
      selectors(&emitter.finish()),
      vec![
        ".a",
        "base | print | .a",
        "(display: grid) | .a",
        "print | .a",
        "print | .a:hover",
        "screen | .a",
      ]
    );
  }
}
