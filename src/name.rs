//! Hierarchical key utilities.
//!
//! Keys look like POSIX paths: one or more slash-separated non-empty
//! segments, with a distinguished root `"/"`. `split` normalizes a key down
//! to its segments; `canon` renders a key in trailing-slash form, the
//! representation used to index subtree subscribers.

/// Splits `key` into its non-empty segments. The root `"/"` yields no
/// segments at all.
///
/// ```
/// # use nodecore_rs::name::split;
/// assert_eq!(split("/a/b"), vec!["a", "b"]);
/// assert_eq!(split("a/b/"), vec!["a", "b"]);
/// assert_eq!(split("/"), Vec::<&str>::new());
/// ```
pub fn split(key: &str) -> Vec<&str> {
    key.split('/').filter(|segment| !segment.is_empty()).collect()
}

/// Canonicalizes `key` to trailing-slash form: `"/" + segments.join("/") + "/"`.
/// `canon("/") == "/"`.
///
/// ```
/// # use nodecore_rs::name::canon;
/// assert_eq!(canon("/a/b"), "/a/b/");
/// assert_eq!(canon("a/b/"), "/a/b/");
/// assert_eq!(canon("/"), "/");
/// ```
pub fn canon(key: &str) -> String {
    if key == "/" {
        return "/".to_string();
    }
    let segments = split(key);
    format!("/{}/", segments.join("/"))
}

/// Strips one trailing slash from a canonical key, the inverse half of
/// `canon` used when handing a key back to a caller (`"/a/b/"` -> `"/a/b"`,
/// `"/"` stays `"/"`).
pub fn strip_trailing_slash(key: &str) -> &str {
    if key == "/" {
        key
    } else {
        key.strip_suffix('/').unwrap_or(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_normalizes_segments() {
        assert_eq!(split("/a/b"), vec!["a", "b"]);
        assert_eq!(split("a/b/"), vec!["a", "b"]);
        assert_eq!(split("//a//b//"), vec!["a", "b"]);
        assert!(split("/").is_empty());
        assert!(split("").is_empty());
    }

    #[test]
    fn canon_adds_trailing_slash() {
        assert_eq!(canon("/a/b"), "/a/b/");
        assert_eq!(canon("a/b"), "/a/b/");
        assert_eq!(canon("/a/b/"), "/a/b/");
        assert_eq!(canon("/"), "/");
    }

    #[test]
    fn strip_trailing_slash_is_canon_inverse() {
        assert_eq!(strip_trailing_slash("/a/b/"), "/a/b");
        assert_eq!(strip_trailing_slash("/"), "/");
    }
}
