use serde::Deserialize;

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompilerConfig {
  ///
  /// Adds a defined prefix to the generated classes' hashes.
  /// Useful when several independently compiled style sheets share a page.
  ///
  /// Defaults to `None`
  ///
  pub class_hash_prefix: Option<String>,
  ///
  /// Whether nesting a media query list (`screen, print`) inside another media
  /// condition distributes the inner condition over every list item.
  /// When disabled such nesting is reported as a conflict.
  ///
  /// Defaults to `true`
  ///
  pub distribute_media_query_lists: Option<bool>,
  ///
  /// Writes stringified CSS without whitespace.
  ///
  /// Defaults to `false`
  ///
  pub minify: Option<bool>,
  ///
  /// Rewrites values ending in `!` to `!important` when stringifying.
  ///
  /// Defaults to `true`
  ///
  pub expand_important_shorthand: Option<bool>,
}

impl Default for CompilerConfig {
  fn default() -> Self {
    Self {
      class_hash_prefix: None,
      distribute_media_query_lists: Some(true),
      expand_important_shorthand: Some(true),
      minify: Some(false),
    }
  }
}

impl CompilerConfig {
  pub fn from_json_str(source: &str) -> Result<Self, serde_json::Error> {
    serde_json::from_str(source)
  }

  pub fn distribute_media_query_lists(&self) -> bool {
    self.distribute_media_query_lists.unwrap_or(true)
  }

  pub fn minify(&self) -> bool {
    self.minify.unwrap_or(false)
  }

  pub fn expand_important_shorthand(&self) -> bool {
    self.expand_important_shorthand.unwrap_or(true)
  }
}
