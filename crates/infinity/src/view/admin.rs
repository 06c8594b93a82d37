use std::sync::Arc;

use minijinja::value::{from_args, Object, Value};
use minijinja::{Error, ErrorKind, State};
use serde_json::{Map, Value as JsonValue};

use infinity_core::view::{admin_candidates, join_url, layout_path, partial_path, ViewError};

use super::context::ContextBase;
use super::engine::{unknown_method, TemplateDir, MAX_PARTIAL_DEPTH};
use super::{Layout, RequestScope};
use crate::config::Config;

const DEFAULT_LAYOUT: &str = "admin";

/// Renders back-office templates from the admin views directory.
///
/// Pages resolve to `{name}.html` directly under the directory; layouts and
/// partials live in `layouts/` and `partials/` as for themes.
#[derive(Debug, Clone)]
pub struct AdminView {
    inner: Arc<AdminViewInner>,
}

#[derive(Debug)]
struct AdminViewInner {
    dir: TemplateDir,
    config: Arc<Config>,
}

impl AdminView {
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            inner: Arc::new(AdminViewInner {
                dir: TemplateDir::new(config.paths.admin_views.clone()),
                config,
            }),
        }
    }

    pub fn url(&self, path: &str) -> String {
        join_url(&self.inner.config.app.url, path)
    }

    /// `{app.url}/assets/admin/{path}`
    pub fn asset(&self, path: &str) -> String {
        self.url(&format!("assets/admin/{}", path.trim_start_matches('/')))
    }

    pub fn exists(&self, name: &str) -> bool {
        matches!(self.inner.dir.locate(&admin_candidates(name)), Ok(Some(_)))
    }

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

        let path = self
            .inner
            .dir
            .locate(&admin_candidates(name))?
            .ok_or_else(|| ViewError::TemplateNotFound(name.to_string()))?;
        let content = self.render_file(scope, &path, data.clone(), Vec::new(), 0)?;

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

    pub fn partial(
        &self,
        scope: &RequestScope,
        name: &str,
        data: Map<String, JsonValue>,
    ) -> Result<String, ViewError> {
        self.partial_at_depth(scope, name, data, 0)
    }

    fn partial_at_depth(
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
        let vars = super::engine::merge(&[&scope.shared, &data]);
        let context = AdminContext {
            base: ContextBase {
                data,
                shared: scope.shared.clone(),
                scope: scope.clone(),
                depth,
            },
            view: self.clone(),
        };
        globals.push(("admin", Value::from_object(context)));
        self.inner.dir.render(path, &vars, globals)
    }
}

/// The `admin` object available in admin templates.
///
/// Unlike the theme context, `get` returns values unescaped; output is still
/// escaped by the template engine unless marked safe.
#[derive(Debug)]
pub struct AdminContext {
    base: ContextBase,
    view: AdminView,
}

impl Object for AdminContext {
    fn get_value(self: &Arc<Self>, key: &Value) -> Option<Value> {
        self.base.value(key.as_str()?).map(Value::from_serialize)
    }

    fn call_method(
        self: &Arc<Self>,
        _state: &State<'_, '_>,
        method: &str,
        args: &[Value],
    ) -> Result<Value, Error> {
        if let Some(result) = self.base.call_common(method, args) {
            return result;
        }

        match method {
            "get" => {
                let (key, default) = from_args::<(String, Option<Value>)>(args)?;
                Ok(match self.base.value(&key) {
                    Some(value) => Value::from_serialize(value),
                    None => default.unwrap_or(Value::UNDEFINED),
                })
            }
            "url" => {
                let (path,) = from_args::<(Option<String>,)>(args)?;
                Ok(Value::from(self.view.url(path.as_deref().unwrap_or(""))))
            }
            "asset" => {
                let (path,) = from_args::<(String,)>(args)?;
                Ok(Value::from(self.view.asset(&path)))
            }
            "current_user" => Ok(self
                .base
                .scope
                .session
                .user()
                .map(|user| Value::from_serialize(&user))
                .unwrap_or(Value::UNDEFINED)),
            "partial" => {
                let (name, extra) = from_args::<(String, Option<Value>)>(args)?;
                let data = self.base.partial_data(extra.as_ref());
                let html = self
                    .view
                    .partial_at_depth(&self.base.scope, &name, data, self.base.depth + 1)
                    .map_err(|e| Error::new(ErrorKind::InvalidOperation, e.to_string()))?;
                Ok(Value::from_safe_string(html))
            }
            _ => Err(unknown_method("admin", method)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::page_data;
    use infinity_core::content::SessionUser;
    use serde_json::json;
    use std::fs;

    fn admin(files: &[(&str, &str)]) -> (tempfile::TempDir, AdminView) {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::with_root(tmp.path());
        for (path, body) in files {
            let full = config.paths.admin_views.join(path);
            fs::create_dir_all(full.parent().unwrap()).unwrap();
            fs::write(full, body).unwrap();
        }
        (tmp, AdminView::new(Arc::new(config)))
    }

    #[test]
    fn test_admin_layout_is_default() {
        let (_tmp, view) = admin(&[
            ("layouts/admin.html", "<div id=admin>{{ content }}</div>"),
            ("dashboard/index.html", "{{ admin.get('title') }}"),
        ]);
        let html = view
            .render(
                &RequestScope::new("/admin/dashboard"),
                "dashboard.index",
                page_data(json!({ "title": "Dash & Co" })),
                Layout::Auto,
            )
            .unwrap();
        assert_eq!(html, "<div id=admin>Dash &amp; Co</div>");
    }

    #[test]
    fn test_pages_do_not_fall_back_to_partials() {
        let (_tmp, view) = admin(&[("partials/nav.html", "nav")]);
        let result = view.render(&RequestScope::new("/"), "nav", Map::new(), Layout::Bare);
        assert_eq!(result, Err(ViewError::TemplateNotFound("nav".to_string())));
        assert!(!view.exists("nav"));
    }

    #[test]
    fn test_current_user_includes_role_and_assets() {
        let (_tmp, view) = admin(&[(
            "p.html",
            "{{ admin.current_user().role }} {{ admin.asset('/css/admin.css') }} {{ admin.partial('nav') }}",
        ), ("partials/nav.html", "<nav>{{ admin.uri_is('/admin*') }}</nav>")]);
        let scope = RequestScope::new("/admin/posts");
        scope.session.login(SessionUser {
            id: 1,
            username: "root".to_string(),
            email: "root@example.com".to_string(),
            role: "admin".to_string(),
        });

        let html = view.render(&scope, "p", Map::new(), Layout::Bare).unwrap();
        assert_eq!(html, "admin /assets/admin/css/admin.css <nav>true</nav>");
    }

    #[test]
    fn test_unknown_method_fails_render() {
        let (_tmp, view) = admin(&[("p.html", "{{ admin.config('app.name') }}")]);
        let result = view.render(&RequestScope::new("/"), "p", Map::new(), Layout::Bare);
        assert!(matches!(result, Err(ViewError::Render { .. })));
    }
}
