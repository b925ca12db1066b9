/// Extension of every file the pipeline writes.
pub const CANONICAL_EXTENSION: &str = "jpg";

/// Slug used when a label has no usable characters.
pub const FALLBACK_SLUG: &str = "unknown";

/// Filesystem-safe stem for a free-text label: `"Rosa canina"` -> `"rosa_canina"`.
///
/// Keeps `a-z`, `0-9`, `-` and `_` (ASCII uppercase is lowercased); every run of
/// other characters, non-ASCII included, collapses into a single `_`. Never
/// returns an empty string.
pub fn slugify(label: &str) -> String {
    let mut slug = String::with_capacity(label.len());
    let mut prev_underscore = false;
    for c in label.chars() {
        let mapped = match c {
            'a'..='z' | '0'..='9' | '-' => c,
            'A'..='Z' => c.to_ascii_lowercase(),
            _ => '_',
        };
        if mapped == '_' {
            if !prev_underscore {
                slug.push('_');
            }
            prev_underscore = true;
        } else {
            slug.push(mapped);
            prev_underscore = false;
        }
    }

    let trimmed = slug.trim_matches('_');
    if trimmed.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        trimmed.to_string()
    }
}

/// `{slug}_{index}.jpg`
pub fn target_file_name(slug: &str, index: u64) -> String {
    format!("{slug}_{index}.{CANONICAL_EXTENSION}")
}
