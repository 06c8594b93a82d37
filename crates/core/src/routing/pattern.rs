use std::{borrow::Cow, sync::LazyLock};

use regex::Regex;

use super::RouteError;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([a-zA-Z0-9_]+)\}").expect("placeholder regex is valid")
});

/// Joins a group prefix and a route URI into the canonical `/a/b` form.
///
/// Leading and trailing slashes are trimmed from the URI before joining and
/// the result always starts with exactly one slash.
pub fn normalize_uri(prefix: &str, uri: &str) -> String {
    let joined = format!("{prefix}/{}", uri.trim_matches('/'));
    format!("/{}", joined.trim_matches('/'))
}

/// A compiled route pattern.
///
/// `{name}` placeholders match a single, non-empty path segment. Every other
/// character matches literally.
#[derive(Debug, Clone)]
pub struct RoutePattern {
    uri: String,
    regex: Regex,
    params: Vec<String>,
}

impl RoutePattern {
    pub fn compile(uri: &str) -> Result<Self, RouteError> {
        let mut pattern = String::with_capacity(uri.len() + 8);
        let mut params: Vec<String> = Vec::new();
        let mut last = 0;

        pattern.push('^');
        for caps in PLACEHOLDER.captures_iter(uri) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };

            if params.iter().any(|p| p == name.as_str()) {
                return Err(RouteError::DuplicateParameter {
                    uri: uri.to_string(),
                    name: name.as_str().to_string(),
                });
            }

            pattern.push_str(&regex::escape(&uri[last..whole.start()]));
            pattern.push_str("([^/]+)");
            params.push(name.as_str().to_string());
            last = whole.end();
        }
        pattern.push_str(&regex::escape(&uri[last..]));
        pattern.push('$');

        let regex = Regex::new(&pattern).map_err(|e| RouteError::InvalidPattern {
            uri: uri.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            uri: uri.to_string(),
            regex,
            params,
        })
    }

    /// The URI this pattern was compiled from.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Parameter names in the order they appear.
    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Matches a request path, returning the percent-decoded parameters.
    pub fn captures(&self, path: &str) -> Option<Vec<(String, String)>> {
        let caps = self.regex.captures(path)?;

        let values = self
            .params
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let raw = caps.get(i + 1).map_or("", |m| m.as_str());
                let value = urlencoding::decode(raw)
                    .map(Cow::into_owned)
                    .unwrap_or_else(|_| raw.to_string());
                (name.clone(), value)
            })
            .collect();

        Some(values)
    }
}
