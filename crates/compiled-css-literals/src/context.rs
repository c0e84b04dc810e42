//! Wrapping contexts and the canonical stack they are assembled into.
//!
//! However a style object nests its conditions, the declarations of a leaf
//! end up wrapped in the fixed order Layer, Supports, Media, Container and
//! finally the selector. Conditions of the same kind found at different depths
//! are merged into one.

use serde::ser::{Serialize, SerializeSeq, Serializer};

use crate::condition::AtRuleKind;
use crate::config::CompilerConfig;
use crate::errors::{CompileError, KeyPath};
use crate::selector::nest_selector;
use crate::utils::split_top_level;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ContextKind {
  Layer,
  Supports,
  Media,
  Container,
  Selector,
}

/// One wrapping step applied to a declaration block.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum Context {
  Layer(String),
  Supports(String),
  Media(String),
  Container(String),
  Selector(String),
}

impl Context {
  pub fn at_rule(kind: AtRuleKind, value: impl Into<String>) -> Self {
    let value = value.into();
    match kind {
      AtRuleKind::Layer => Context::Layer(value),
      AtRuleKind::Supports => Context::Supports(value),
      AtRuleKind::Media => Context::Media(value),
      AtRuleKind::Container => Context::Container(value),
    }
  }

  pub fn kind(&self) -> ContextKind {
    match self {
      Context::Layer(_) => ContextKind::Layer,
      Context::Supports(_) => ContextKind::Supports,
      Context::Media(_) => ContextKind::Media,
      Context::Container(_) => ContextKind::Container,
      Context::Selector(_) => ContextKind::Selector,
    }
  }

  pub fn at_rule_kind(&self) -> Option<AtRuleKind> {
    match self {
      Context::Layer(_) => Some(AtRuleKind::Layer),
      Context::Supports(_) => Some(AtRuleKind::Supports),
      Context::Media(_) => Some(AtRuleKind::Media),
      Context::Container(_) => Some(AtRuleKind::Container),
      Context::Selector(_) => None,
    }
  }

  pub fn value(&self) -> &str {
    match self {
      Context::Layer(value)
      | Context::Supports(value)
      | Context::Media(value)
      | Context::Container(value)
      | Context::Selector(value) => value,
    }
  }
}

/// Canonical wrapping of a flat rule: at most one context per at-rule kind and
/// exactly one, innermost, selector.
///
/// Equality and hashing are structural, so two stacks built from differently
/// nested sources compare equal when they wrap declarations the same way.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ContextStack {
  layer: Option<String>,
  supports: Option<String>,
  media: Option<String>,
  container: Option<String>,
  selector: String,
}

impl ContextStack {
  pub fn new(selector: impl Into<String>) -> Self {
    ContextStack {
      layer: None,
      supports: None,
      media: None,
      container: None,
      selector: selector.into(),
    }
  }

  pub fn with(mut self, kind: AtRuleKind, value: impl Into<String>) -> Self {
    *self.slot_mut(kind) = Some(value.into());
    self
  }

  fn slot_mut(&mut self, kind: AtRuleKind) -> &mut Option<String> {
    match kind {
      AtRuleKind::Layer => &mut self.layer,
      AtRuleKind::Supports => &mut self.supports,
      AtRuleKind::Media => &mut self.media,
      AtRuleKind::Container => &mut self.container,
    }
  }

  pub fn get(&self, kind: AtRuleKind) -> Option<&str> {
    match kind {
      AtRuleKind::Layer => self.layer.as_deref(),
      AtRuleKind::Supports => self.supports.as_deref(),
      AtRuleKind::Media => self.media.as_deref(),
      AtRuleKind::Container => self.container.as_deref(),
    }
  }

  pub fn selector(&self) -> &str {
    &self.selector
  }

  /// The wrapping at-rules, outermost first.
  pub fn at_rules(&self) -> Vec<Context> {
    [
      AtRuleKind::Layer,
      AtRuleKind::Supports,
      AtRuleKind::Media,
      AtRuleKind::Container,
    ]
    .into_iter()
    .filter_map(|kind| self.get(kind).map(|value| Context::at_rule(kind, value)))
    .collect()
  }

  pub fn outermost_at_rule(&self) -> Option<Context> {
    self.at_rules().into_iter().next()
  }

  pub fn has_at_rules(&self) -> bool {
    self.layer.is_some()
      || self.supports.is_some()
      || self.media.is_some()
      || self.container.is_some()
  }

  /// Every context in canonical order, the selector last.
  pub fn contexts(&self) -> Vec<Context> {
    let mut contexts = self.at_rules();
    contexts.push(Context::Selector(self.selector.clone()));
    contexts
  }
}

impl Serialize for ContextStack {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    let contexts = self.contexts();
    let mut seq = serializer.serialize_seq(Some(contexts.len()))?;
    for context in &contexts {
      seq.serialize_element(context)?;
    }
    seq.end()
  }
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct ChainLink {
  context: Context,
  path: KeyPath,
}

/// Contexts met on the way from the root to the current node, in encounter
/// order. Selector contexts hold templates relative to their parent.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContextChain {
  links: Vec<ChainLink>,
}

impl ContextChain {
  pub fn push(&mut self, context: Context, path: KeyPath) {
    self.links.push(ChainLink { context, path });
  }

  pub fn pop(&mut self) -> Option<Context> {
    self.links.pop().map(|link| link.context)
  }

  pub fn contexts(&self) -> impl Iterator<Item = &Context> {
    self.links.iter().map(|link| &link.context)
  }
}

/// Value merged so far for one at-rule kind, with the path that last
/// contributed to it.
struct Merged {
  value: String,
  path: KeyPath,
}

pub struct ContextStackBuilder<'a> {
  config: &'a CompilerConfig,
}

impl<'a> ContextStackBuilder<'a> {
  pub fn new(config: &'a CompilerConfig) -> Self {
    ContextStackBuilder { config }
  }

  /// Folds a chain into its canonical stack. `root_selector` is what the
  /// first `&` refers to.
  pub fn build(&self, root_selector: &str, chain: &ContextChain) -> Result<ContextStack, CompileError> {
    let mut layer: Option<Merged> = None;
    let mut supports: Option<Merged> = None;
    let mut media: Option<Merged> = None;
    let mut container: Option<Merged> = None;
    let mut selector = root_selector.to_string();

    for link in &chain.links {
      match &link.context {
        Context::Layer(name) => merge(&mut layer, name, &link.path, |outer, inner| {
          Ok(format!("{outer}.{inner}"))
        })?,
        Context::Supports(query) => merge(&mut supports, query, &link.path, |outer, inner| {
          Ok(format!("{} and {}", grouped(outer), grouped(inner)))
        })?,
        Context::Media(query) => merge(&mut media, query, &link.path, |outer, inner| {
          self.merge_media(outer, inner)
        })?,
        Context::Container(query) => merge(&mut container, query, &link.path, merge_container)?,
        Context::Selector(template) => selector = nest_selector(&selector, template),
      }
    }

    let value = |merged: Option<Merged>| merged.map(|merged| merged.value);
    Ok(ContextStack {
      layer: value(layer),
      supports: value(supports),
      media: value(media),
      container: value(container),
      selector,
    })
  }

  fn merge_media(&self, outer: &str, inner: &str) -> Result<String, String> {
    let outer_list = split_top_level(outer);
    let inner_list = split_top_level(inner);
    if let Some(query) = outer_list
      .iter()
      .chain(&inner_list)
      .find(|query| has_media_type_modifier(query))
    {
      return Err(format!(
        "`{query}` negates or restricts its whole query and cannot be combined with another media query"
      ));
    }
    if outer_list.len() <= 1 && inner_list.len() <= 1 {
      return Ok(format!("{} and {}", grouped(outer), grouped(inner)));
    }
    if !self.config.distribute_media_query_lists() {
      return Err("media query lists cannot be combined with `and`".into());
    }

    let mut combined = Vec::with_capacity(outer_list.len() * inner_list.len());
    for outer in &outer_list {
      for inner in &inner_list {
        combined.push(format!("{} and {}", grouped(outer), grouped(inner)));
      }
    }
    Ok(combined.join(", "))
  }
}

/// Words of `query` outside parentheses.
fn top_level_words(query: &str) -> Vec<&str> {
  let mut words = Vec::new();
  let mut depth = 0usize;
  let mut start: Option<usize> = None;

  for (index, ch) in query.char_indices() {
    let boundary = ch.is_whitespace() || ch == '(' || ch == ')';
    if boundary {
      if let Some(begin) = start.take() {
        if depth == 0 {
          words.push(&query[begin..index]);
        }
      }
    } else if start.is_none() {
      start = Some(index);
    }
    match ch {
      '(' => depth += 1,
      ')' => depth = depth.saturating_sub(1),
      _ => {}
    }
  }
  if let (Some(begin), 0) = (start, depth) {
    words.push(&query[begin..]);
  }
  words
}

/// `not` and `or` bind looser than `and`, so such conditions are parenthesized
/// before being joined.
fn grouped(condition: &str) -> String {
  let condition = condition.trim();
  let words = top_level_words(condition);
  let loose = words
    .first()
    .is_some_and(|word| word.eq_ignore_ascii_case("not"))
    || words.iter().any(|word| word.eq_ignore_ascii_case("or"));
  if loose {
    format!("({condition})")
  } else {
    condition.to_string()
  }
}

/// `not print`, `only screen`: the modifier applies to the whole query, which
/// has no form combining it with another query.
fn has_media_type_modifier(query: &str) -> bool {
  let words = top_level_words(query);
  matches!(words.as_slice(), [first, _, ..]
    if first.eq_ignore_ascii_case("not") || first.eq_ignore_ascii_case("only"))
}

fn merge(
  slot: &mut Option<Merged>,
  value: &str,
  path: &KeyPath,
  combine: impl FnOnce(&str, &str) -> Result<String, String>,
) -> Result<(), CompileError> {
  let merged = match slot.take() {
    None => value.to_string(),
    Some(outer) => combine(&outer.value, value).map_err(|reason| {
      CompileError::ConflictingAtRuleKind {
        first: outer.path.clone(),
        second: path.clone(),
        reason,
      }
    })?,
  };
  *slot = Some(Merged {
    value: merged,
    path: path.clone(),
  });
  Ok(())
}

/// Splits `sidebar (min-width: 400px)` into its container name and condition.
fn container_name(query: &str) -> (Option<&str>, &str) {
  let query = query.trim();
  let Some((first, rest)) = query.split_once(char::is_whitespace) else {
    return (None, query);
  };
  let is_name = first
    .chars()
    .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
    && !matches!(first, "not" | "and" | "or");
  if is_name {
    (Some(first), rest.trim())
  } else {
    (None, query)
  }
}

fn merge_container(outer: &str, inner: &str) -> Result<String, String> {
  let (outer_name, outer_condition) = container_name(outer);
  let (inner_name, inner_condition) = container_name(inner);
  if outer_name.is_some() && inner_name.is_some() && outer_name != inner_name {
    return Err(format!(
      "container queries target different containers ({} and {})",
      outer_name.unwrap_or_default(),
      inner_name.unwrap_or_default()
    ));
  }

  let condition = format!("{} and {}", grouped(outer_condition), grouped(inner_condition));
  Ok(match outer_name.or(inner_name) {
    Some(name) => format!("{name} {condition}"),
    None => condition,
  })
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use super::*;

  fn chain(contexts: &[(Context, &str)]) -> ContextChain {
    let mut chain = ContextChain::default();
    for (context, key) in contexts {
      chain.push(context.clone(), KeyPath::root().child(*key));
    }
    chain
  }

  fn build(chain: &ContextChain) -> Result<ContextStack, CompileError> {
    let config = CompilerConfig::default();
    ContextStackBuilder::new(&config).build(".root", chain)
  }

  #[test]
  fn reorders_contexts_canonically() {
    let chain = chain(&[
      (Context::Selector("nav li > &".into()), "nav li > &"),
      (Context::Media("(prefers-color-scheme: dark)".into()), "@media"),
      (Context::Selector("&:hover".into()), "&:hover"),
      (Context::Layer("base".into()), "@layer base"),
    ]);

    assert_eq!(
      build(&chain).map(|stack| stack.contexts()),
      Ok(vec![
        Context::Layer("base".into()),
        Context::Media("(prefers-color-scheme: dark)".into()),
        Context::Selector("nav li > .root:hover".into()),
      ])
    );
  }

  #[test]
  fn merges_contexts_of_the_same_kind() {
    let chain = chain(&[
      (Context::Layer("framework".into()), "@layer framework"),
      (Context::Media("(prefers-color-scheme: dark)".into()), "@media a"),
      (Context::Layer("layout".into()), "layout"),
      (Context::Supports("(display: grid)".into()), "@supports a"),
      (Context::Media("(prefers-reduced-motion)".into()), "@media b"),
      (Context::Supports("(gap: 1rem)".into()), "@supports b"),
    ]);

    assert_eq!(
      build(&chain),
      Ok(
        ContextStack::new(".root")
          .with(AtRuleKind::Layer, "framework.layout")
          .with(AtRuleKind::Supports, "(display: grid) and (gap: 1rem)")
          .with(
            AtRuleKind::Media,
            "(prefers-color-scheme: dark) and (prefers-reduced-motion)"
          )
      )
    );
  }

  #[test]
  fn distributes_media_query_lists() {
    let chain = chain(&[
      (Context::Media("screen, print".into()), "@media screen, print"),
      (Context::Media("(min-width: 900px)".into()), "@media (min-width: 900px)"),
    ]);

    assert_eq!(
      build(&chain).map(|stack| stack.get(AtRuleKind::Media).map(str::to_string)),
      Ok(Some(
        "screen and (min-width: 900px), print and (min-width: 900px)".to_string()
      ))
    );
  }

  #[test]
  fn media_query_lists_conflict_when_distribution_is_disabled() {
    let config = CompilerConfig {
      distribute_media_query_lists: Some(false),
      ..CompilerConfig::default()
    };
    let chain = chain(&[
      (Context::Media("screen, print".into()), "@media screen, print"),
      (Context::Media("(min-width: 900px)".into()), "@media (min-width: 900px)"),
    ]);

    let error = ContextStackBuilder::new(&config).build(".root", &chain);
    assert_eq!(
      error,
      Err(CompileError::ConflictingAtRuleKind {
        first: KeyPath::root().child("@media screen, print"),
        second: KeyPath::root().child("@media (min-width: 900px)"),
        reason: "media query lists cannot be combined with `and`".into(),
      })
    );
  }

  #[test]
  fn merges_container_queries_on_one_container() {
    let chain = chain(&[
      (Context::Container("card (min-width: 400px)".into()), "a"),
      (Context::Container("(orientation: landscape)".into()), "b"),
    ]);

    assert_eq!(
      build(&chain).map(|stack| stack.get(AtRuleKind::Container).map(str::to_string)),
      Ok(Some(
        "card (min-width: 400px) and (orientation: landscape)".to_string()
      ))
    );
  }

  #[test]
  fn rejects_container_queries_on_different_containers() {
    let chain = chain(&[
      (Context::Container("card (min-width: 400px)".into()), "a"),
      (Context::Container("sidebar (min-width: 200px)".into()), "b"),
    ]);

    assert!(matches!(
      build(&chain),
      Err(CompileError::ConflictingAtRuleKind { .. })
    ));
  }

  #[test]
  fn groups_negated_and_disjunctive_conditions_before_joining() {
    let chain = chain(&[
      (Context::Supports("not (display: grid)".into()), "@supports a"),
      (Context::Supports("(gap: 1rem)".into()), "@supports b"),
      (Context::Media("(hover: hover) or (pointer: fine)".into()), "@media a"),
      (Context::Media("(min-width: 900px)".into()), "@media b"),
      (Context::Container("card not (min-width: 400px)".into()), "@container a"),
      (Context::Container("(orientation: landscape)".into()), "@container b"),
    ]);

    assert_eq!(
      build(&chain),
      Ok(
        ContextStack::new(".root")
          .with(AtRuleKind::Supports, "(not (display: grid)) and (gap: 1rem)")
          .with(
            AtRuleKind::Media,
            "((hover: hover) or (pointer: fine)) and (min-width: 900px)"
          )
          .with(
            AtRuleKind::Container,
            "card (not (min-width: 400px)) and (orientation: landscape)"
          )
      )
    );
  }

  #[test]
  fn media_type_modifiers_cannot_be_combined() {
    let negated = chain(&[
      (Context::Media("not print".into()), "@media not print"),
      (Context::Media("(min-width: 900px)".into()), "@media (min-width: 900px)"),
    ]);
    assert!(matches!(
      build(&negated),
      Err(CompileError::ConflictingAtRuleKind { .. })
    ));

    let restricted = chain(&[
      (Context::Media("(min-width: 900px)".into()), "@media (min-width: 900px)"),
      (Context::Media("only screen".into()), "@media only screen"),
    ]);
    assert!(matches!(
      build(&restricted),
      Err(CompileError::ConflictingAtRuleKind { .. })
    ));
  }

  #[test]
  fn negated_media_features_are_grouped() {
    let chain = chain(&[
      (Context::Media("not (hover: hover)".into()), "@media a"),
      (Context::Media("print".into()), "@media print"),
    ]);
    assert_eq!(
      build(&chain).map(|stack| stack.get(AtRuleKind::Media).map(str::to_string)),
      Ok(Some("(not (hover: hover)) and print".to_string()))
    );
  }

  #[test]
  fn empty_chain_is_the_root_selector() {
    assert_eq!(
      build(&ContextChain::default()).map(|stack| stack.contexts()),
      Ok(vec![Context::Selector(".root".into())])
    );
  }

  #[test]
  fn serializes_as_a_context_list() {
    let stack = ContextStack::new(".a").with(AtRuleKind::Media, "print");
    assert_eq!(
      serde_json::to_value(&stack).ok(),
      Some(serde_json::json!([
        { "kind": "media", "value": "print" },
        { "kind": "selector", "value": ".a" }
      ]))
    );
  }
}
