//! Filesystem side of template rendering: locating files inside a template
//! directory without escaping it, and driving minijinja.

use std::{
    collections::BTreeMap,
    fs,
    path::{Component, Path, PathBuf},
    sync::{Arc, OnceLock},
};

use minijinja::{Environment, Error, ErrorKind, Value};
use serde_json::{Map, Value as JsonValue};

use infinity_core::view::ViewError;

/// Nested `partial()` calls deeper than this are rejected.
pub(crate) const MAX_PARTIAL_DEPTH: usize = 16;

/// A directory of templates. Every file served from it must resolve, after
/// following symlinks, to a path inside the directory.
///
/// Clones share one minijinja environment, so each template is parsed once.
#[derive(Debug, Clone)]
pub(crate) struct TemplateDir {
    root: Arc<PathBuf>,
    env: Arc<OnceLock<Environment<'static>>>,
}

impl TemplateDir {
    pub(crate) fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Arc::new(root.into()),
            env: Arc::new(OnceLock::new()),
        }
    }

    /// Resolves a relative template path to a contained, existing file.
    ///
    /// `Ok(None)` means the file does not exist; `Err(InvalidPath)` means it
    /// exists but resolves outside the directory.
    pub(crate) fn resolve(&self, relative: &str) -> Result<Option<PathBuf>, ViewError> {
        resolve_in(&self.root, relative)
    }

    /// Returns the first candidate that exists and is contained.
    ///
    /// Candidates that escape the directory are skipped; if nothing else
    /// matches, the escape is reported.
    pub(crate) fn locate(&self, candidates: &[String]) -> Result<Option<String>, ViewError> {
        let mut escaped = false;
        for candidate in candidates {
            match self.resolve(candidate) {
                Ok(Some(_)) => return Ok(Some(candidate.clone())),
                Ok(None) => {}
                Err(_) => escaped = true,
            }
        }
        if escaped {
            Err(ViewError::InvalidPath)
        } else {
            Ok(None)
        }
    }

    fn environment(&self) -> &Environment<'static> {
        self.env.get_or_init(|| {
            let mut env = Environment::new();
            let root = Arc::clone(&self.root);
            env.set_loader(move |name| load(&root, name));
            env
        })
    }

    /// Renders the template at `relative` with `vars` as top-level variables
    /// plus `globals` (context objects, pre-rendered safe HTML).
    pub(crate) fn render(
        &self,
        relative: &str,
        vars: &Map<String, JsonValue>,
        globals: Vec<(&'static str, Value)>,
    ) -> Result<String, ViewError> {
        let mut ctx: BTreeMap<String, Value> = vars
            .iter()
            .map(|(key, value)| (key.clone(), Value::from_serialize(value)))
            .collect();
        for (key, value) in globals {
            ctx.insert(key.to_string(), value);
        }

        let env = self.environment();
        let render_error = |err: Error| ViewError::Render {
            name: relative.to_string(),
            reason: format!("{err:#}"),
        };
        let template = env.get_template(relative).map_err(render_error)?;
        template.render(ctx).map_err(render_error)
    }
}

fn resolve_in(root: &Path, relative: &str) -> Result<Option<PathBuf>, ViewError> {
    let relative = Path::new(relative);
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return Err(ViewError::InvalidPath);
    }

    let candidate = root.join(relative);
    if !candidate.is_file() {
        return Ok(None);
    }

    let (Ok(real), Ok(real_root)) = (candidate.canonicalize(), root.canonicalize()) else {
        return Err(ViewError::InvalidPath);
    };
    if real.starts_with(&real_root) {
        Ok(Some(real))
    } else {
        tracing::warn!(path = %candidate.display(), "template resolves outside its directory");
        Err(ViewError::InvalidPath)
    }
}

fn load(root: &Path, name: &str) -> Result<Option<String>, Error> {
    let path = match resolve_in(root, name) {
        Ok(Some(path)) => path,
        Ok(None) => return Ok(None),
        Err(err) => return Err(Error::new(ErrorKind::InvalidOperation, err.to_string())),
    };
    fs::read_to_string(&path).map(Some).map_err(|e| {
        Error::new(
            ErrorKind::InvalidOperation,
            format!("failed to read {}: {e}", path.display()),
        )
    })
}

/// Merges `layers` left to right; later keys win.
pub(crate) fn merge(layers: &[&Map<String, JsonValue>]) -> Map<String, JsonValue> {
    let mut merged = Map::new();
    for layer in layers {
        for (key, value) in layer.iter() {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

/// Looks up `key` directly, then as a dotted path into nested objects.
pub(crate) fn lookup<'a>(map: &'a Map<String, JsonValue>, key: &str) -> Option<&'a JsonValue> {
    if let Some(value) = map.get(key) {
        return Some(value);
    }
    let mut parts = key.split('.');
    let mut current = map.get(parts.next()?)?;
    for part in parts {
        current = match current {
            JsonValue::Object(object) => object.get(part)?,
            JsonValue::Array(items) => items.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Converts template-call arguments to a JSON object, ignoring non-maps.
pub(crate) fn to_json_map(value: Option<&Value>) -> Map<String, JsonValue> {
    match value.map(serde_json::to_value) {
        Some(Ok(JsonValue::Object(map))) => map,
        _ => Map::new(),
    }
}

/// Error for unknown context methods.
pub(crate) fn unknown_method(object: &str, method: &str) -> Error {
    Error::new(
        ErrorKind::UnknownMethod,
        format!("{object} has no method named {method}"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;

    fn dir_with(files: &[(&str, &str)]) -> (tempfile::TempDir, TemplateDir) {
        let tmp = tempfile::tempdir().unwrap();
        for (path, body) in files {
            let full = tmp.path().join(path);
            fs::create_dir_all(full.parent().unwrap()).unwrap();
            fs::write(full, body).unwrap();
        }
        let dir = TemplateDir::new(tmp.path());
        (tmp, dir)
    }

    #[test]
    fn test_locate_returns_first_existing_candidate() {
        let (_tmp, dir) = dir_with(&[("partials/card.html", "card"), ("card.html", "root")]);
        let found = dir
            .locate(&[
                "pages/card.html".to_string(),
                "partials/card.html".to_string(),
                "card.html".to_string(),
            ])
            .unwrap();
        assert_eq!(found.as_deref(), Some("partials/card.html"));
        assert_eq!(dir.locate(&["nope.html".to_string()]).unwrap(), None);
    }

    #[test]
    fn test_parent_components_are_rejected() {
        let (_tmp, dir) = dir_with(&[]);
        assert_eq!(dir.resolve("../secret.html"), Err(ViewError::InvalidPath));
        assert_eq!(dir.resolve("/etc/passwd"), Err(ViewError::InvalidPath));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_escape_is_rejected() {
        let outside = tempfile::tempdir().unwrap();
        fs::write(outside.path().join("secret.html"), "secret").unwrap();
        let (tmp, dir) = dir_with(&[]);
        std::os::unix::fs::symlink(
            outside.path().join("secret.html"),
            tmp.path().join("leak.html"),
        )
        .unwrap();

        assert_eq!(dir.resolve("leak.html"), Err(ViewError::InvalidPath));
        assert_eq!(
            dir.locate(&["leak.html".to_string()]),
            Err(ViewError::InvalidPath)
        );
    }

    #[test]
    fn test_render_autoescapes_variables() {
        let (_tmp, dir) = dir_with(&[("page.html", "<p>{{ title }}</p>{{ body }}")]);
        let vars = json!({ "title": "<b>Hi" }).as_object().unwrap().clone();
        let html = dir
            .render(
                "page.html",
                &vars,
                vec![("body", Value::from_safe_string("<i>ok</i>".to_string()))],
            )
            .unwrap();
        assert_eq!(html, "<p>&lt;b&gt;Hi</p><i>ok</i>");
    }

    #[test]
    fn test_include_goes_through_loader() {
        let (_tmp, dir) = dir_with(&[
            ("layouts/base.html", "[{% include \"partials/nav.html\" %}]"),
            ("partials/nav.html", "nav"),
        ]);
        let html = dir.render("layouts/base.html", &Map::new(), vec![]).unwrap();
        assert_eq!(html, "[nav]");
    }

    #[test]
    fn test_clones_share_parsed_templates() {
        let (tmp, dir) = dir_with(&[("page.html", "first")]);
        let clone = dir.clone();
        assert_eq!(dir.render("page.html", &Map::new(), vec![]).unwrap(), "first");

        fs::write(tmp.path().join("page.html"), "second").unwrap();
        assert_eq!(clone.render("page.html", &Map::new(), vec![]).unwrap(), "first");
        assert!(std::ptr::eq(dir.environment(), clone.environment()));

        let fresh = TemplateDir::new(tmp.path());
        assert_eq!(fresh.render("page.html", &Map::new(), vec![]).unwrap(), "second");
    }

    #[test]
    fn test_render_error_names_template() {
        let (_tmp, dir) = dir_with(&[("bad.html", "{% if %}")]);
        let err = dir.render("bad.html", &Map::new(), vec![]).unwrap_err();
        assert!(matches!(err, ViewError::Render { ref name, .. } if name == "bad.html"));
    }

    #[test]
    fn test_lookup_dotted_paths() {
        let map = json!({ "post": { "title": "Hello", "tags": ["a", "b"] }, "a.b": 1 })
            .as_object()
            .unwrap()
            .clone();
        assert_eq!(lookup(&map, "post.title"), Some(&json!("Hello")));
        assert_eq!(lookup(&map, "post.tags.1"), Some(&json!("b")));
        assert_eq!(lookup(&map, "a.b"), Some(&json!(1)));
        assert_eq!(lookup(&map, "post.missing"), None);
    }

    #[test]
    fn test_merge_later_wins() {
        let a = json!({ "x": 1, "y": 1 }).as_object().unwrap().clone();
        let b = json!({ "y": 2 }).as_object().unwrap().clone();
        let merged = merge(&[&a, &b]);
        assert_eq!(merged["x"], 1);
        assert_eq!(merged["y"], 2);
    }
}
