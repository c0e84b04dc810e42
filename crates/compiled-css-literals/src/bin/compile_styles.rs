use std::fs;
use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use compiled_css_literals::{
  stringify_rules, CompiledStyle, CompiledVariants, CompilerConfig, FlatRule, HashClassNamer,
  StyleCompiler, StyleNode,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::Level;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
  Css,
  Json,
}

/// Compiles a document of nested style objects into CSS
#[derive(Parser, Debug)]
#[command(name = "compile-styles", version)]
struct CompileStylesCommand {
  /// JSON document with `css` and `variants` style objects
  input: PathBuf,
  /// JSON compiler configuration
  #[arg(long)]
  config: Option<PathBuf>,
  /// Write to this file instead of stdout
  #[arg(short, long)]
  output: Option<PathBuf>,
  #[arg(long, value_enum, default_value = "css")]
  format: OutputFormat,
  /// Repeat for more logging (-v debug, -vv trace)
  #[arg(short, long, action = clap::ArgAction::Count)]
  verbose: u8,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StyleDocument {
  css: IndexMap<String, Value>,
  variants: IndexMap<String, IndexMap<String, Value>>,
}

#[derive(Debug, Default, Serialize)]
struct CompiledDocument {
  css: IndexMap<String, CompiledStyle>,
  variants: IndexMap<String, CompiledVariants>,
}

impl CompiledDocument {
  fn rules(&self) -> Vec<FlatRule> {
    let mut rules = Vec::new();
    for style in self.css.values() {
      rules.extend(style.rules.iter().cloned());
    }
    for group in self.variants.values() {
      for style in group.variants.values() {
        rules.extend(style.rules.iter().cloned());
      }
      rules.extend(group.global_rules.iter().cloned());
    }
    rules
  }
}

fn main() -> anyhow::Result<()> {
  let command = CompileStylesCommand::parse();

  let level = match command.verbose {
    0 => Level::WARN,
    1 => Level::DEBUG,
    _ => Level::TRACE,
  };
  let _ = tracing_subscriber::fmt::SubscriberBuilder::default()
    .with_max_level(level)
    .with_writer(std::io::stderr)
    .try_init();

  let config = match &command.config {
    Some(path) => {
      let source = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
      CompilerConfig::from_json_str(&source)
        .with_context(|| format!("Invalid config {}", path.display()))?
    }
    None => CompilerConfig::default(),
  };

  let source = fs::read_to_string(&command.input)
    .with_context(|| format!("Failed to read {}", command.input.display()))?;
  let document: StyleDocument = serde_json::from_str(&source)
    .with_context(|| format!("Invalid style document {}", command.input.display()))?;

  let compiled = compile_document(&document, &config)?;
  let output = match command.format {
    OutputFormat::Css => stringify_rules(&compiled.rules(), &config),
    OutputFormat::Json => serde_json::to_string_pretty(&compiled)?,
  };

  match &command.output {
    Some(path) => fs::write(path, output)
      .with_context(|| format!("Failed to write {}", path.display()))?,
    None => {
      let mut stdout = std::io::stdout().lock();
      stdout.write_all(output.as_bytes())?;
      stdout.flush()?;
    }
  }
  Ok(())
}

fn compile_document(
  document: &StyleDocument,
  config: &CompilerConfig,
) -> anyhow::Result<CompiledDocument> {
  let namer = HashClassNamer::from_config(config);
  let compiler = StyleCompiler::new(config, &namer);
  let mut compiled = CompiledDocument::default();

  for (logical_path, style) in &document.css {
    let node = StyleNode::from_json(style)
      .with_context(|| format!("Failed to read style {logical_path}"))?;
    let style = compiler
      .css(logical_path, &node)
      .with_context(|| format!("Failed to compile style {logical_path}"))?;
    compiled.css.insert(logical_path.clone(), style);
  }

  for (logical_path, variants) in &document.variants {
    let mut nodes = IndexMap::with_capacity(variants.len());
    for (name, style) in variants {
      let node = StyleNode::from_json(style)
        .with_context(|| format!("Failed to read variant {logical_path}.{name}"))?;
      nodes.insert(name.clone(), node);
    }
    let group = compiler
      .variants(logical_path, &nodes)
      .with_context(|| format!("Failed to compile variants {logical_path}"))?;
    compiled.variants.insert(logical_path.clone(), group);
  }

  Ok(compiled)
}
