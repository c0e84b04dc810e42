//! Property (`@width`) and variant (`%primary`) reference resolution.

use indexmap::{IndexMap, IndexSet};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::class_name::ClassToken;
use crate::errors::{CompileError, KeyPath};
use crate::selector::substitute_variant_references;
use crate::utils::kebab_case;

static PROPERTY_REFERENCE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"@([A-Za-z_][A-Za-z0-9_]*)").expect("valid property reference regex"));

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TemplatePart {
  Text(String),
  Property(String),
}

/// A declaration value containing property references, split into literal
/// text and the referenced property names.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValueTemplate {
  parts: Vec<TemplatePart>,
}

impl ValueTemplate {
  /// Returns `None` when `value` holds no reference.
  pub fn parse(value: &str) -> Option<Self> {
    let mut parts = Vec::new();
    let mut last = 0;

    for captures in PROPERTY_REFERENCE.captures_iter(value) {
      let (Some(whole), Some(name)) = (captures.get(0), captures.get(1)) else {
        continue;
      };
      // `a@b` is not a reference.
      let preceded_by_word = value[..whole.start()]
        .chars()
        .next_back()
        .is_some_and(|ch| ch.is_alphanumeric() || ch == '_');
      if preceded_by_word {
        continue;
      }
      if whole.start() > last {
        parts.push(TemplatePart::Text(value[last..whole.start()].to_string()));
      }
      parts.push(TemplatePart::Property(name.as_str().to_string()));
      last = whole.end();
    }

    if !parts
      .iter()
      .any(|part| matches!(part, TemplatePart::Property(_)))
    {
      return None;
    }
    if last < value.len() {
      parts.push(TemplatePart::Text(value[last..].to_string()));
    }
    Some(ValueTemplate { parts })
  }

  pub fn parts(&self) -> &[TemplatePart] {
    &self.parts
  }
}

/// Property values of one style node. `declared` lists every property the
/// node declares, visited or not; `values` only the visited ones.
#[derive(Clone, Debug, Default)]
struct Scope {
  declared: IndexSet<String>,
  values: IndexMap<String, String>,
}

/// Resolved property values, one scope per style node on the current path.
///
/// Names are compared in kebab-case, so `@backgroundColor` finds a
/// `background-color` declaration.
#[derive(Clone, Debug, Default)]
pub struct SymbolTable {
  scopes: Vec<Scope>,
}

impl SymbolTable {
  /// Opens the scope of a node declaring `declared`.
  pub fn push_scope<'p>(&mut self, declared: impl IntoIterator<Item = &'p str>) {
    self.scopes.push(Scope {
      declared: declared.into_iter().map(kebab_case).collect(),
      values: IndexMap::new(),
    });
  }

  pub fn pop_scope(&mut self) {
    self.scopes.pop();
  }

  pub fn declare(&mut self, property: &str, value: impl Into<String>) {
    if self.scopes.is_empty() {
      self.push_scope(std::iter::empty());
    }
    if let Some(scope) = self.scopes.last_mut() {
      let key = kebab_case(property);
      scope.declared.insert(key.clone());
      scope.values.insert(key, value.into());
    }
  }

  /// Value bound to `property`: the innermost scope declaring it decides.
  /// `None` when that scope has not reached the declaration yet, or when no
  /// scope declares it.
  pub fn lookup(&self, property: &str) -> Option<&str> {
    let key = kebab_case(property);
    self
      .scopes
      .iter()
      .rev()
      .find(|scope| scope.declared.contains(&key) || scope.values.contains_key(&key))
      .and_then(|scope| scope.values.get(&key))
      .map(String::as_str)
  }

  /// Substitutes every reference of `template`. A reference to a property
  /// its binding scope declares further on is a forward reference.
  pub fn resolve(
    &self,
    property: &str,
    template: &ValueTemplate,
    path: &KeyPath,
  ) -> Result<String, CompileError> {
    let mut out = String::new();
    for part in &template.parts {
      match part {
        TemplatePart::Text(text) => out.push_str(text),
        TemplatePart::Property(reference) => {
          let value =
            self
              .lookup(reference)
              .ok_or_else(|| CompileError::ForwardPropertyReference {
                path: path.clone(),
                property: property.to_string(),
                reference: reference.clone(),
              })?;
          out.push_str(value);
        }
      }
    }
    Ok(out)
  }
}

/// Class tokens of the variants of one group, by variant name.
#[derive(Clone, Debug, Default)]
pub struct VariantTable {
  tokens: IndexMap<String, ClassToken>,
}

impl VariantTable {
  pub fn new(tokens: IndexMap<String, ClassToken>) -> Self {
    VariantTable { tokens }
  }

  pub fn token(&self, variant: &str) -> Option<&ClassToken> {
    self.tokens.get(variant)
  }

  /// Replaces `%variant` references in a selector template with the
  /// variants' class selectors.
  pub fn substitute(&self, template: &str, path: &KeyPath) -> Result<String, CompileError> {
    substitute_variant_references(template, |name| self.token(name).map(ClassToken::selector))
      .map_err(|variant| CompileError::UnknownVariantReference {
        path: path.clone(),
        variant: variant.to_string(),
      })
  }
}
