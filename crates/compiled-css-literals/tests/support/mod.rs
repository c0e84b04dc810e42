#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use compiled_css_literals::{
  stringify_rules, ClassToken, CompileError, CompilerConfig, FlatRule, StyleCompiler, StyleNode,
};
use indexmap::IndexMap;
use serde_json::Value;

pub fn fixtures_dir() -> PathBuf {
  PathBuf::from(env!("CARGO_MANIFEST_DIR"))
    .join("tests")
    .join("fixtures")
}

pub fn load_fixture_config(path: &Path) -> CompilerConfig {
  let config_path = path.join("config.json");
  if !config_path.exists() {
    return CompilerConfig::default();
  }
  let raw = fs::read_to_string(&config_path).expect("failed to read config.json");
  CompilerConfig::from_json_str(&raw).expect("failed to parse config.json")
}

/// Class names readable in expected output: `button.primary` becomes
/// `button-primary`.
pub fn readable_token(logical_path: &str) -> ClassToken {
  ClassToken::new(logical_path.replace('.', "-"))
}

pub fn style(value: Value) -> StyleNode {
  StyleNode::from_json(&value).expect("style object should parse")
}

pub fn compile(value: Value) -> Result<Vec<FlatRule>, CompileError> {
  let config = CompilerConfig::default();
  let namer = readable_token;
  let node = StyleNode::from_json(&value)?;
  StyleCompiler::new(&config, &namer)
    .css("a", &node)
    .map(|style| style.rules)
}

/// Compiles a fixture document (`{ "css": {..}, "variants": {..} }`) and
/// stringifies every rule in document order.
pub fn run_fixture(input: &str, config: &CompilerConfig) -> Result<String, CompileError> {
  let document: Value = serde_json::from_str(input).expect("failed to parse in.json");
  let namer = readable_token;
  let compiler = StyleCompiler::new(config, &namer);
  let mut rules = Vec::new();

  if let Some(Value::Object(styles)) = document.get("css") {
    for (logical_path, value) in styles {
      let node = StyleNode::from_json(value)?;
      rules.extend(compiler.css(logical_path, &node)?.rules);
    }
  }

  if let Some(Value::Object(groups)) = document.get("variants") {
    for (logical_path, variants) in groups {
      let Value::Object(variants) = variants else {
        panic!("variants of {logical_path} should be an object");
      };
      let mut nodes = IndexMap::new();
      for (name, value) in variants {
        nodes.insert(name.clone(), StyleNode::from_json(value)?);
      }
      let compiled = compiler.variants(logical_path, &nodes)?;
      for style in compiled.variants.into_values() {
        rules.extend(style.rules);
      }
      rules.extend(compiled.global_rules);
    }
  }

  Ok(stringify_rules(&rules, config))
}

pub fn normalize(output: &str) -> String {
  output.replace("\r\n", "\n").trim().to_string()
}
