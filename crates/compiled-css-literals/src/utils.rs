/// Properties whose numeric values are written without a `px` suffix.
///
/// Names are camelCase, the way they are authored in style objects.
const UNITLESS_PROPERTIES: &[&str] = &[
  "animationIterationCount",
  "aspectRatio",
  "borderImageOutset",
  "borderImageSlice",
  "borderImageWidth",
  "boxFlex",
  "boxFlexGroup",
  "boxOrdinalGroup",
  "columnCount",
  "columns",
  "fillOpacity",
  "flex",
  "flexGrow",
  "flexNegative",
  "flexOrder",
  "flexPositive",
  "flexShrink",
  "floodOpacity",
  "fontSizeAdjust",
  "fontWeight",
  "gridArea",
  "gridColumn",
  "gridColumnEnd",
  "gridColumnSpan",
  "gridColumnStart",
  "gridRow",
  "gridRowEnd",
  "gridRowSpan",
  "gridRowStart",
  "lineClamp",
  "lineHeight",
  "opacity",
  "order",
  "orphans",
  "stopOpacity",
  "strokeDasharray",
  "strokeDashoffset",
  "strokeMiterlimit",
  "strokeOpacity",
  "strokeWidth",
  "tabSize",
  "WebkitLineClamp",
  "widows",
  "zIndex",
  "zoom",
];

/// Converts a camelCase property name into its kebab-case CSS form.
///
/// Custom properties (`--name`) and names that are already kebab-case pass
/// through untouched.
pub fn kebab_case(name: &str) -> String {
  if name.starts_with("--") {
    return name.to_string();
  }

  let mut out = String::with_capacity(name.len() + 4);
  for ch in name.chars() {
    if ch.is_uppercase() {
      out.push('-');
      out.extend(ch.to_lowercase());
    } else {
      out.push(ch);
    }
  }
  out
}

/// Inverse of [`kebab_case`]: `-webkit-line-clamp` becomes `WebkitLineClamp`.
pub fn camel_case(name: &str) -> String {
  let mut out = String::with_capacity(name.len());
  let mut upper_next = false;
  for ch in name.chars() {
    if ch == '-' {
      upper_next = true;
      continue;
    }
    if upper_next {
      out.extend(ch.to_uppercase());
      upper_next = false;
    } else {
      out.push(ch);
    }
  }
  out
}

pub fn is_unitless_property(name: &str) -> bool {
  if UNITLESS_PROPERTIES.contains(&name) {
    return true;
  }
  name.contains('-') && UNITLESS_PROPERTIES.contains(&camel_case(name).as_str())
}

fn format_number(mut number: f64) -> String {
  if number == 0.0 {
    // Collapses -0 as well.
    number = 0.0;
  }
  let mut text = number.to_string();
  if text.starts_with("0.") {
    text.remove(0);
  } else if text.starts_with("-0.") {
    text.remove(1);
  }
  text
}

/// Formats a numeric style value, appending `px` unless the value is zero or
/// the property is unitless.
pub fn add_unit_if_needed(property: &str, number: f64) -> String {
  let text = format_number(number);
  if number == 0.0 || property.starts_with("--") || is_unitless_property(property) {
    text
  } else {
    format!("{text}px")
  }
}

/// Splits a comma separated list at top level only, ignoring commas nested in
/// parentheses, brackets or quotes. Empty items are dropped.
pub fn split_top_level(input: &str) -> Vec<&str> {
  let mut items = Vec::new();
  let mut depth = 0usize;
  let mut quote: Option<char> = None;
  let mut start = 0usize;

  for (index, ch) in input.char_indices() {
    match quote {
      Some(open) => {
        if ch == open {
          quote = None;
        }
      }
      None => match ch {
        '"' | '\'' => quote = Some(ch),
        '(' | '[' => depth += 1,
        ')' | ']' => depth = depth.saturating_sub(1),
        ',' if depth == 0 => {
          items.push(input[start..index].trim());
          start = index + 1;
        }
        _ => {}
      },
    }
  }
  items.push(input[start..].trim());
  items.retain(|item| !item.is_empty());
  items
}
