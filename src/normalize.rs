/// Splits a target at the first `?` or `#`. The second half keeps its
/// separator and is never inspected.
pub fn split_target(value: &str) -> (&str, &str) {
    match value.find(|c: char| c == '?' || c == '#') {
        Some(idx) => value.split_at(idx),
        None => (value, ""),
    }
}

/// Resolves dot segments and collapses repeated slashes in an absolute path.
/// `..` at the root is dropped. A trailing slash is kept.
pub fn normalize_path(path: &str) -> String {
    let mut stack: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                stack.pop();
            }
            _ => stack.push(segment),
        }
    }

    let mut normalized = String::with_capacity(path.len());
    normalized.push('/');
    normalized.push_str(&stack.join("/"));
    if !stack.is_empty() && path.ends_with('/') {
        normalized.push('/');
    }
    normalized
}
