//! Collision-free name allocation.

/// Splits `"name (3)"` into `("name", Some(3))`.
fn split_suffix(name: &str) -> (&str, Option<u64>) {
    let Some(body) = name.strip_suffix(')') else {
        return (name, None);
    };
    let Some((stem, digits)) = body.rsplit_once(" (") else {
        return (name, None);
    };
    match digits.parse::<u64>() {
        Ok(n) if !stem.is_empty() && !digits.starts_with('+') => (stem, Some(n)),
        _ => (name, None),
    }
}

/// Returns `name` if free, otherwise the first free `"stem (n)"` with
/// `n >= 2`, where `stem` is `name` without any existing `" (n)"` suffix.
///
/// `"task1"` -> `"task1 (2)"`, `"task1 (2)"` -> `"task1 (3)"`. A suffix at
/// `u64::MAX` wraps the search around to `(2)`.
pub fn unique_name(name: &str, is_taken: impl Fn(&str) -> bool) -> String {
    if !is_taken(name) {
        return name.to_string();
    }
    let (stem, suffix) = split_suffix(name);
    let start = suffix.and_then(|n| n.max(1).checked_add(1)).unwrap_or(2);
    (start..=u64::MAX)
        .chain(2..start)
        .map(|n| format!("{} ({})", stem, n))
        .find(|candidate| !is_taken(candidate))
        .unwrap_or_else(|| format!("{} (2)", name))
}
