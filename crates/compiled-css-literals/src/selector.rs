use once_cell::sync::Lazy;
use regex::Regex;

use crate::utils::split_top_level;

static VARIANT_REFERENCE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"%([A-Za-z_][A-Za-z0-9_-]*)").expect("valid variant reference regex"));

/// Nests `template` inside `parent`.
///
/// Each `&` outside of quotes is replaced by the parent selector. Templates
/// without `&` become descendants of the parent. Selector lists on either
/// side combine parent-major: `.a, .b` with `&:hover, &:focus` gives
/// `.a:hover, .a:focus, .b:hover, .b:focus`.
pub fn nest_selector(parent: &str, template: &str) -> String {
  let parents = split_top_level(parent);
  let children = split_top_level(template);
  let mut combined = Vec::with_capacity(parents.len() * children.len());

  for parent in &parents {
    for child in &children {
      if has_parent_reference(child) {
        combined.push(replace_parent_references(child, parent));
      } else {
        combined.push(format!("{parent} {child}"));
      }
    }
  }

  combined.join(", ")
}

pub fn has_parent_reference(selector: &str) -> bool {
  parent_reference_positions(selector).next().is_some()
}

fn replace_parent_references(selector: &str, parent: &str) -> String {
  let mut out = String::with_capacity(selector.len() + parent.len());
  let mut last = 0;
  for index in parent_reference_positions(selector) {
    out.push_str(&selector[last..index]);
    out.push_str(parent);
    last = index + 1;
  }
  out.push_str(&selector[last..]);
  out
}

fn parent_reference_positions(selector: &str) -> impl Iterator<Item = usize> + '_ {
  let mut quote: Option<char> = None;
  selector.char_indices().filter_map(move |(index, ch)| {
    match (quote, ch) {
      (Some(open), _) if ch == open => quote = None,
      (Some(_), _) => {}
      (None, '"' | '\'') => quote = Some(ch),
      (None, '&') => return Some(index),
      (None, _) => {}
    }
    None
  })
}

pub fn has_variant_reference(selector: &str) -> bool {
  VARIANT_REFERENCE.is_match(selector)
}

/// Replaces every `%name` in `selector` with the result of `lookup`. Returns
/// the first name `lookup` does not know as the error.
pub fn substitute_variant_references<'s>(
  selector: &'s str,
  lookup: impl Fn(&str) -> Option<String>,
) -> Result<String, &'s str> {
  let mut out = String::with_capacity(selector.len());
  let mut last = 0;
  for captures in VARIANT_REFERENCE.captures_iter(selector) {
    let (Some(whole), Some(name)) = (captures.get(0), captures.get(1)) else {
      continue;
    };
    let replacement = lookup(name.as_str()).ok_or(name.as_str())?;
    out.push_str(&selector[last..whole.start()]);
    out.push_str(&replacement);
    last = whole.end();
  }
  out.push_str(&selector[last..]);
  Ok(out)
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use super::*;

  #[test]
  fn replaces_parent_references() {
    assert_eq!(nest_selector(".a", "&:hover"), ".a:hover");
    assert_eq!(nest_selector(".a", "nav li > &"), "nav li > .a");
    assert_eq!(nest_selector(".a", "& + &"), ".a + .a");
  }

  #[test]
  fn templates_without_parent_reference_are_descendants() {
    assert_eq!(nest_selector(".a", "span"), ".a span");
    assert_eq!(nest_selector(".a", "> li"), ".a > li");
  }

  #[test]
  fn combines_selector_lists_parent_major() {
    assert_eq!(
      nest_selector(".a, .b", "&:hover, &:focus"),
      ".a:hover, .a:focus, .b:hover, .b:focus"
    );
    assert_eq!(nest_selector(".a", ":is(&, .b)"), ":is(.a, .b)");
  }

  #[test]
  fn ignores_ampersands_inside_quotes() {
    assert_eq!(
      nest_selector(".a", "&[title='a & b']"),
      ".a[title='a & b']"
    );
  }

  #[test]
  fn substitutes_variant_references() {
    let lookup = |name: &str| (name == "primary").then(|| ".p".to_string());
    assert_eq!(substitute_variant_references("%primary &", lookup), Ok(".p &".to_string()));
    assert_eq!(substitute_variant_references("%ghost &", lookup), Err("ghost"));
    assert!(has_variant_reference("%primary &"));
    assert!(!has_variant_reference("[width='50%']"));
  }
}
