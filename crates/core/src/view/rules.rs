const PUBLIC_CONFIG_PREFIXES: [&str; 2] = ["app.", "theme."];
const PRIVATE_CONFIG_PREFIXES: [&str; 3] = ["app.debug", "database.", "session."];

/// Whether a config key may be read from theme templates.
pub fn is_public_config_key(key: &str) -> bool {
    if PRIVATE_CONFIG_PREFIXES.iter().any(|p| key.starts_with(p)) {
        return false;
    }
    PUBLIC_CONFIG_PREFIXES.iter().any(|p| key.starts_with(p))
}

/// Matches a request URI against `pattern`.
///
/// A trailing `*` turns the pattern into a prefix match.
pub fn uri_is(uri: &str, pattern: &str) -> bool {
    if uri == pattern {
        return true;
    }
    match pattern.strip_suffix('*') {
        Some(prefix) => uri.starts_with(prefix.trim_end_matches('*')),
        None => false,
    }
}

/// Builds an absolute or root-relative URL from the configured base URL.
pub fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
