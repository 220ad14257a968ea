//! Small shared helpers: name globs and registry scopes

/// Match a package name against a simple glob pattern.
///
/// Only `*` is special and matches any run of characters (including none).
/// Patterns without `*` are exact matches.
pub fn glob_match(pattern: &str, name: &str) -> bool {
  if !pattern.contains('*') {
    return pattern == name;
  }

  let segments: Vec<&str> = pattern.split('*').collect();
  let mut rest = name;

  // Leading segment must anchor at the start
  if let Some(first) = segments.first() {
    if !rest.starts_with(first) {
      return false;
    }
    rest = &rest[first.len()..];
  }

  // Trailing segment must anchor at the end
  let last = segments[segments.len() - 1];
  if !rest.ends_with(last) {
    return false;
  }
  let rest_end = rest.len() - last.len();
  rest = &rest[..rest_end];

  // Middle segments must appear in order
  for segment in &segments[1..segments.len() - 1] {
    if segment.is_empty() {
      continue;
    }
    match rest.find(segment) {
      Some(pos) => rest = &rest[pos + segment.len()..],
      None => return false,
    }
  }

  true
}

/// Registry scope of a package name: the segment before an optional `/`.
///
/// `@scope/pkg` → `Some("@scope")`; unscoped names have no scope.
pub fn scope_of(name: &str) -> Option<&str> {
  name.split_once('/').map(|(scope, _)| scope)
}
