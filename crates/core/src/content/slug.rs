use std::sync::LazyLock;

use regex::Regex;

static NON_SLUG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9-]+").expect("slug regex is valid"));

/// Fallback used when a title has no characters usable in a slug.
const EMPTY_SLUG: &str = "post";

/// Turns a title into a URL slug: runs of anything other than ASCII letters,
/// digits and `-` become a single `-`, outer dashes are trimmed, and the
/// result is lowercased.
pub fn slugify(title: &str) -> String {
    let slug = NON_SLUG.replace_all(title, "-");
    let slug = slug.trim_matches('-').to_lowercase();
    if slug.is_empty() {
        EMPTY_SLUG.to_string()
    } else {
        slug
    }
}

/// The `attempt`-th candidate for a slug that is already taken.
/// Attempt 0 is the base slug itself.
pub fn numbered_slug(base: &str, attempt: u32) -> String {
    if attempt == 0 {
        base.to_string()
    } else {
        format!("{base}-{attempt}")
    }
}
