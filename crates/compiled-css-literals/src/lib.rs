//! Compiles nested style objects into flat CSS rules.
//!
//! A style object mixes declarations with nested selectors, pseudo shorthands
//! (`_hover`, `__before`), conditional values and the `@layer`, `@supports`,
//! `@media` and `@container` at-rules in any order. Compilation produces flat
//! rules whose contexts are always wrapped in that canonical at-rule order,
//! and orders the rules so later, more specific conditions win the cascade.

pub mod class_name;
pub mod compiler;
pub mod condition;
pub mod config;
pub mod context;
pub mod emitter;
pub mod errors;
pub mod resolver;
pub mod selector;
pub mod stringify;
pub mod style_node;
pub mod utils;

pub use class_name::{ClassNamer, ClassToken, HashClassNamer};
pub use compiler::{compile_rules, CompiledStyle, CompiledVariants, StyleCompiler};
pub use config::CompilerConfig;
pub use context::{Context, ContextStack};
pub use emitter::{Declaration, FlatRule};
pub use errors::{CompileError, KeyPath};
pub use stringify::{stringify_rule, stringify_rules};
pub use style_node::{StyleNode, StyleValue};
