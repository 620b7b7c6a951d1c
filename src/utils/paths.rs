//! String-level path helpers.
//!
//! Dropped paths and catalog paths are plain strings that may come from either
//! Windows or Unix hosts, so these helpers treat both `/` and `\` as separators
//! instead of relying on `std::path`, which only knows the host convention.

/// Replaces every backslash with a forward slash.
pub fn normalize_separators(path: &str) -> String {
    path.replace('\\', "/")
}

/// Returns the last component of a path, accepting both separator styles.
pub fn file_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Strips the last extension from a file name. Names whose only dot is the
/// first character are returned unchanged.
pub fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(idx) if idx > 0 => &name[..idx],
        _ => name,
    }
}

/// Case-insensitive, separator-normalised comparison of two basenames.
pub fn same_file_name(a: &str, b: &str) -> bool {
    let a = file_name(a);
    let b = file_name(b);
    !a.is_empty() && a.to_lowercase() == b.to_lowercase()
}
