//! Mapping of caller-supplied virtual paths onto cache keys.

/// Normalize a virtual path into the key used for both queueing and cache lookups.
///
/// Every backslash becomes a forward slash, then a single leading slash (if any) is stripped.
/// The function is total: any input maps to some key, and `"/a\\b.txt"` and `"a/b.txt"` map to
/// the same one.
#[must_use]
pub fn normalize(path: &str) -> String {
    let replaced = path.replace('\\', "/");
    match replaced.strip_prefix('/') {
        Some(stripped) => stripped.to_owned(),
        None => replaced,
    }
}
