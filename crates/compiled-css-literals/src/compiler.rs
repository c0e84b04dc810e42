//! Walks a [`StyleNode`] and emits its declarations as flat rules.

use indexmap::IndexMap;
use serde::Serialize;

use crate::class_name::{ClassNamer, ClassToken};
use crate::condition::ConditionKey;
use crate::config::CompilerConfig;
use crate::context::{Context, ContextChain, ContextStack, ContextStackBuilder};
use crate::emitter::{FlatRule, RuleEmitter};
use crate::errors::{CompileError, KeyPath};
use crate::resolver::{SymbolTable, VariantTable};
use crate::selector::has_variant_reference;
use crate::style_node::{StyleEntry, StyleNode, StyleValue};

/// A compiled `css` call: the class to apply and the rules that style it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CompiledStyle {
  pub token: ClassToken,
  pub rules: Vec<FlatRule>,
}

/// A compiled variant group. `global_rules` hold the rules of subtrees whose
/// selectors reference sibling variants.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledVariants {
  pub variants: IndexMap<String, CompiledStyle>,
  pub global_rules: Vec<FlatRule>,
}

pub struct StyleCompiler<'a> {
  config: &'a CompilerConfig,
  namer: &'a dyn ClassNamer,
}

impl<'a> StyleCompiler<'a> {
  pub fn new(config: &'a CompilerConfig, namer: &'a dyn ClassNamer) -> Self {
    StyleCompiler { config, namer }
  }

  #[tracing::instrument(level = "debug", skip_all, fields(logical_path = logical_path))]
  pub fn css(&self, logical_path: &str, node: &StyleNode) -> Result<CompiledStyle, CompileError> {
    let token = self.namer.name_for(logical_path);
    let rules = compile_rules(self.config, &token.selector(), node)?;
    tracing::debug!(token = token.as_str(), rules = rules.len(), "compiled style");
    Ok(CompiledStyle { token, rules })
  }

  /// Compiles every variant of a group. Variants are named `{logical_path}.{name}`
  /// and may refer to each other's classes in selectors as `%name`.
  #[tracing::instrument(level = "debug", skip_all, fields(logical_path = logical_path))]
  pub fn variants(
    &self,
    logical_path: &str,
    variants: &IndexMap<String, StyleNode>,
  ) -> Result<CompiledVariants, CompileError> {
    let tokens: IndexMap<String, ClassToken> = variants
      .keys()
      .map(|name| {
        let token = self.namer.name_for(&format!("{logical_path}.{name}"));
        (name.clone(), token)
      })
      .collect();

    let mut compiled = IndexMap::with_capacity(variants.len());
    let mut deferred = Vec::new();
    for ((name, node), token) in variants.iter().zip(tokens.values()) {
      let root_selector = token.selector();
      let mut emitter = RuleEmitter::default();
      let mut walker = Walker::new(
        self.config,
        &root_selector,
        &mut emitter,
        VariantMode::Defer,
      );
      walker.walk_node(node)?;
      deferred.append(&mut walker.deferred);

      let rules = emitter.finish();
      tracing::debug!(variant = name.as_str(), rules = rules.len(), "compiled variant");
      compiled.insert(
        name.clone(),
        CompiledStyle {
          token: token.clone(),
          rules,
        },
      );
    }

    // Every token is known now, so the set-aside subtrees can be resolved.
    let table = VariantTable::new(tokens);
    let mut global = RuleEmitter::default();
    for rule in deferred {
      let mut walker = Walker::new(
        self.config,
        &rule.root_selector,
        &mut global,
        VariantMode::Resolve(&table),
      );
      walker.chain = rule.chain;
      walker.symbols = rule.symbols;
      walker.path = rule.path;
      walker.variant_rule(&rule.template, &rule.node)?;
    }

    Ok(CompiledVariants {
      variants: compiled,
      global_rules: global.finish(),
    })
  }
}

/// Compiles `node` with `root_selector` standing for the top-level `&`.
pub fn compile_rules(
  config: &CompilerConfig,
  root_selector: &str,
  node: &StyleNode,
) -> Result<Vec<FlatRule>, CompileError> {
  let table = VariantTable::default();
  let mut emitter = RuleEmitter::default();
  Walker::new(config, root_selector, &mut emitter, VariantMode::Resolve(&table)).walk_node(node)?;
  Ok(emitter.finish())
}

enum VariantMode<'a> {
  /// Set subtrees with `%variant` selectors aside until every variant of the
  /// group has a token.
  Defer,
  Resolve(&'a VariantTable),
}

/// A subtree whose selector references a variant, with everything needed to
/// resume the walk where it was left.
struct DeferredRule {
  root_selector: String,
  chain: ContextChain,
  path: KeyPath,
  symbols: SymbolTable,
  template: String,
  node: StyleNode,
}

struct Walker<'a, 'e> {
  builder: ContextStackBuilder<'a>,
  root_selector: String,
  emitter: &'e mut RuleEmitter,
  mode: VariantMode<'a>,
  symbols: SymbolTable,
  chain: ContextChain,
  path: KeyPath,
  deferred: Vec<DeferredRule>,
}

impl<'a, 'e> Walker<'a, 'e> {
  fn new(
    config: &'a CompilerConfig,
    root_selector: &str,
    emitter: &'e mut RuleEmitter,
    mode: VariantMode<'a>,
  ) -> Self {
    Walker {
      builder: ContextStackBuilder::new(config),
      root_selector: root_selector.to_string(),
      emitter,
      mode,
      symbols: SymbolTable::default(),
      chain: ContextChain::default(),
      path: KeyPath::root(),
      deferred: Vec::new(),
    }
  }

  fn walk_node(&mut self, node: &StyleNode) -> Result<(), CompileError> {
    self.symbols.push_scope(node.declared_properties());
    let result = self.walk_entries(node.entries());
    self.symbols.pop_scope();
    result
  }

  fn walk_entries(&mut self, entries: &[StyleEntry]) -> Result<(), CompileError> {
    let mut stack: Option<ContextStack> = None;
    for entry in entries {
      match entry {
        StyleEntry::Declaration { property, value } => {
          if stack.is_none() {
            stack = Some(self.builder.build(&self.root_selector, &self.chain)?);
          }
          if let Some(stack) = &stack {
            self.declare(stack, property, value)?;
          }
        }
        StyleEntry::Nested {
          key,
          condition,
          node,
        } => self.walk_child(key, condition, node)?,
      }
    }
    Ok(())
  }

  fn declare(
    &mut self,
    stack: &ContextStack,
    property: &str,
    value: &StyleValue,
  ) -> Result<(), CompileError> {
    let resolved = match value {
      StyleValue::Literal(literal) => literal.clone(),
      StyleValue::Reference(template) => {
        self
          .symbols
          .resolve(property, template, &self.path.child(property))?
      }
      StyleValue::Conditional(conditions) => {
        self.path.push(property);
        let result = self.walk_expanded(stack, conditions.expand(property));
        self.path.pop();
        return result;
      }
    };

    tracing::trace!(selector = stack.selector(), property, value = resolved.as_str(), "declare");
    self.symbols.declare(property, resolved.clone());
    self.emitter.push(stack, property, resolved);
    Ok(())
  }

  fn walk_expanded(&mut self, stack: &ContextStack, entries: Vec<StyleEntry>) -> Result<(), CompileError> {
    for entry in entries {
      match entry {
        StyleEntry::Declaration { property, value } => self.declare(stack, &property, &value)?,
        StyleEntry::Nested {
          key,
          condition,
          node,
        } => self.walk_child(&key, &condition, &node)?,
      }
    }
    Ok(())
  }

  fn walk_child(&mut self, key: &str, condition: &ConditionKey, node: &StyleNode) -> Result<(), CompileError> {
    self.path.push(key);
    let result = match condition {
      // Members of a group carry their own contexts.
      ConditionKey::Group(_) => self.walk_node(node),
      ConditionKey::AtRule { kind, query } => self.within(Context::at_rule(*kind, query.as_str()), node),
      ConditionKey::Selector(template) if has_variant_reference(template) => {
        self.variant_rule(template, node)
      }
      ConditionKey::Selector(template) => self.within(Context::Selector(template.clone()), node),
    };
    self.path.pop();
    result
  }

  fn within(&mut self, context: Context, node: &StyleNode) -> Result<(), CompileError> {
    self.chain.push(context, self.path.clone());
    let result = self.walk_node(node);
    self.chain.pop();
    result
  }

  fn variant_rule(&mut self, template: &str, node: &StyleNode) -> Result<(), CompileError> {
    let table = match self.mode {
      VariantMode::Resolve(table) => table,
      VariantMode::Defer => {
        tracing::trace!(path = %self.path, template, "deferring variant rule");
        self.deferred.push(DeferredRule {
          root_selector: self.root_selector.clone(),
          chain: self.chain.clone(),
          path: self.path.clone(),
          symbols: self.symbols.clone(),
          template: template.to_string(),
          node: node.clone(),
        });
        return Ok(());
      }
    };

    let selector = table.substitute(template, &self.path)?;
    self.within(Context::Selector(selector), node)
  }
}
