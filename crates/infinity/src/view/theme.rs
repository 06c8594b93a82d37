use std::sync::{Arc, PoisonError, RwLock};

use minijinja::Value;
use serde_json::{Map, Value as JsonValue};

use infinity_core::view::{join_url, layout_path, partial_path, theme_candidates, ViewError};

use super::context::{ContextBase, ThemeContext};
use super::engine::{merge, TemplateDir, MAX_PARTIAL_DEPTH};
use super::{Layout, RequestScope};
use crate::config::Config;

const DEFAULT_LAYOUT: &str = "base";

/// Renders templates of the active theme.
#[derive(Debug, Clone)]
pub struct View {
    inner: Arc<ViewInner>,
}

#[derive(Debug)]
struct ViewInner {
    theme: String,
    dir: TemplateDir,
    config: Arc<Config>,
    shared: RwLock<Map<String, JsonValue>>,
}

impl View {
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            inner: Arc::new(ViewInner {
                theme: config.theme.active.clone(),
                dir: TemplateDir::new(config.theme_dir()),
                config,
                shared: RwLock::new(Map::new()),
            }),
        }
    }

    /// Name of the active theme.
    pub fn theme(&self) -> &str {
        &self.inner.theme
    }

    pub(crate) fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Shares a value with every template rendered by this view.
    pub fn share(&self, key: impl Into<String>, value: impl Into<JsonValue>) {
        self.inner
            .shared
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value.into());
    }

    fn shared_with(&self, scope: &RequestScope) -> Map<String, JsonValue> {
        let global = self
            .inner
            .shared
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        merge(&[&global, &scope.shared])
    }

    pub fn url(&self, path: &str) -> String {
        join_url(&self.inner.config.app.url, path)
    }

    /// `{app.url}/themes/{theme}/assets/{path}`
    pub fn asset(&self, path: &str) -> String {
        self.url(&format!(
            "themes/{}/assets/{}",
            self.inner.theme,
            path.trim_start_matches('/')
        ))
    }

    /// Whether `name` resolves to a page template of the theme.
    pub fn exists(&self, name: &str) -> bool {
        matches!(self.inner.dir.locate(&theme_candidates(name)), Ok(Some(_)))
    }

    /// Renders a page, wrapped in a layout according to `layout`.
    pub fn render(
        &self,
        scope: &RequestScope,
        name: &str,
        data: Map<String, JsonValue>,
        layout: Layout,
    ) -> Result<String, ViewError> {
        let layout = match layout {
            Layout::Auto if scope.is_htmx => None,
            Layout::Auto => Some(DEFAULT_LAYOUT.to_string()),
            Layout::Bare => None,
            Layout::Named(layout) => Some(layout),
        };

        let content = self.render_partial(scope, name, data.clone())?;
        let Some(layout) = layout else {
            return Ok(content);
        };

        let located = match layout_path(&layout) {
            Some(path) => self.inner.dir.locate(&[path])?,
            None => None,
        };
        let path = located.ok_or_else(|| ViewError::LayoutNotFound(layout.clone()))?;

        let mut data = data;
        data.insert("content".to_string(), JsonValue::String(content.clone()));
        self.render_file(
            scope,
            &path,
            data,
            vec![("content", Value::from_safe_string(content))],
            0,
        )
    }

    /// Renders a page template without any layout.
    pub fn render_partial(
        &self,
        scope: &RequestScope,
        name: &str,
        data: Map<String, JsonValue>,
    ) -> Result<String, ViewError> {
        let path = self
            .inner
            .dir
            .locate(&theme_candidates(name))?
            .ok_or_else(|| ViewError::TemplateNotFound(name.to_string()))?;
        self.render_file(scope, &path, data, Vec::new(), 0)
    }

    /// Renders `partials/{name}`; a missing partial renders as nothing.
    pub fn partial(
        &self,
        scope: &RequestScope,
        name: &str,
        data: Map<String, JsonValue>,
    ) -> Result<String, ViewError> {
        self.partial_at_depth(scope, name, data, 0)
    }

    pub(crate) fn partial_at_depth(
        &self,
        scope: &RequestScope,
        name: &str,
        data: Map<String, JsonValue>,
        depth: usize,
    ) -> Result<String, ViewError> {
        if depth > MAX_PARTIAL_DEPTH {
            return Err(ViewError::Render {
                name: name.to_string(),
                reason: "partials nested too deeply".to_string(),
            });
        }
        let Some(path) = partial_path(name) else {
            return Ok(String::new());
        };
        match self.inner.dir.locate(&[path])? {
            Some(path) => self.render_file(scope, &path, data, Vec::new(), depth),
            None => Ok(String::new()),
        }
    }

    fn render_file(
        &self,
        scope: &RequestScope,
        path: &str,
        data: Map<String, JsonValue>,
        mut globals: Vec<(&'static str, Value)>,
        depth: usize,
    ) -> Result<String, ViewError> {
        let shared = self.shared_with(scope);
        let vars = merge(&[&shared, &data]);
        let context = ThemeContext {
            base: ContextBase {
                data,
                shared,
                scope: scope.clone(),
                depth,
            },
            view: self.clone(),
        };
        globals.push(("theme", Value::from_object(context)));
        self.inner.dir.render(path, &vars, globals)
    }
}
