use std::fmt;

use crate::config::CompilerConfig;
use crate::emitter::FlatRule;
use crate::utils::kebab_case;

/// Writes rules as a style sheet, in the order given.
pub fn stringify_rules(rules: &[FlatRule], config: &CompilerConfig) -> String {
  let rules: Vec<String> = rules.iter().map(|rule| stringify_rule(rule, config)).collect();
  if config.minify() {
    rules.join("\n")
  } else {
    rules.concat()
  }
}

pub fn stringify_rule(rule: &FlatRule, config: &CompilerConfig) -> String {
  RuleWriter { rule, config }.to_string()
}

struct RuleWriter<'a> {
  rule: &'a FlatRule,
  config: &'a CompilerConfig,
}

impl RuleWriter<'_> {
  fn write_minified(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let at_rules = self.rule.stack.at_rules();
    for context in &at_rules {
      let name = context.at_rule_kind().map_or("", |kind| kind.name());
      write!(f, "@{name} {}{{", context.value())?;
    }

    write!(f, "{}{{", self.rule.selector())?;
    for (index, declaration) in self.rule.declarations.iter().enumerate() {
      if index > 0 {
        f.write_str(";")?;
      }
      write!(
        f,
        "{}:{}",
        property_name(&declaration.property),
        declaration_value(&declaration.value, self.config)
      )?;
    }
    f.write_str("}")?;

    for _ in &at_rules {
      f.write_str("}")?;
    }
    Ok(())
  }

  fn write_pretty(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let at_rules = self.rule.stack.at_rules();
    for (depth, context) in at_rules.iter().enumerate() {
      let name = context.at_rule_kind().map_or("", |kind| kind.name());
      writeln!(f, "{}@{name} {} {{", indent(depth), context.value())?;
    }

    let depth = at_rules.len();
    writeln!(f, "{}{} {{", indent(depth), self.rule.selector())?;
    for declaration in &self.rule.declarations {
      writeln!(
        f,
        "{}{}: {};",
        indent(depth + 1),
        property_name(&declaration.property),
        declaration_value(&declaration.value, self.config)
      )?;
    }
    writeln!(f, "{}}}", indent(depth))?;

    for depth in (0..depth).rev() {
      writeln!(f, "{}}}", indent(depth))?;
    }
    Ok(())
  }
}

impl fmt::Display for RuleWriter<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.config.minify() {
      self.write_minified(f)
    } else {
      self.write_pretty(f)
    }
  }
}

fn indent(depth: usize) -> String {
  "  ".repeat(depth)
}

fn property_name(property: &str) -> String {
  kebab_case(property)
}

fn declaration_value(value: &str, config: &CompilerConfig) -> String {
  if config.expand_important_shorthand() && !value.ends_with("!important") {
    if let Some(value) = value.strip_suffix('!') {
      return format!("{} !important", value.trim_end());
    }
  }
  value.to_string()
}
