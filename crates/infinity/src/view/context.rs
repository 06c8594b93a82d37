use std::sync::Arc;

use minijinja::value::{from_args, Object, Value};
use minijinja::{Error, State};
use serde_json::{json, Map, Value as JsonValue};

use infinity_core::view::{escape_html, is_public_config_key, uri_is};

use super::engine::{lookup, merge, to_json_map, unknown_method};
use super::{RequestScope, View};

/// State shared by the theme and admin context objects.
#[derive(Debug)]
pub(crate) struct ContextBase {
    pub(crate) data: Map<String, JsonValue>,
    pub(crate) shared: Map<String, JsonValue>,
    pub(crate) scope: RequestScope,
    pub(crate) depth: usize,
}

impl ContextBase {
    pub(crate) fn value(&self, key: &str) -> Option<&JsonValue> {
        lookup(&self.data, key).or_else(|| lookup(&self.shared, key))
    }

    pub(crate) fn has(&self, key: &str) -> bool {
        self.value(key).is_some_and(|v| !v.is_null())
    }

    pub(crate) fn variables(&self) -> Map<String, JsonValue> {
        merge(&[&self.shared, &self.data])
    }

    /// Data handed to a nested partial: current data overlaid with `extra`.
    pub(crate) fn partial_data(&self, extra: Option<&Value>) -> Map<String, JsonValue> {
        merge(&[&self.data, &to_json_map(extra)])
    }

    pub(crate) fn csrf_field(&self) -> Value {
        Value::from_safe_string(format!(
            r#"<input type="hidden" name="_csrf_token" value="{}">"#,
            escape_html(&self.scope.session.csrf_token())
        ))
    }

    /// Methods both context objects expose identically.
    pub(crate) fn call_common(&self, method: &str, args: &[Value]) -> Option<Result<Value, Error>> {
        let result = match method {
            "has" => from_args::<(String,)>(args).map(|(key,)| Value::from(self.has(&key))),
            "e" | "escape" => from_args::<(Option<Value>,)>(args).map(|(value,)| {
                Value::from_safe_string(escape_html(&display(value.as_ref())))
            }),
            "is_logged_in" => Ok(Value::from(self.scope.session.is_logged_in())),
            "is_htmx" => Ok(Value::from(self.scope.is_htmx)),
            "csrf_field" => Ok(self.csrf_field()),
            "csrf_token" => Ok(Value::from(self.scope.session.csrf_token())),
            "flash" => from_args::<(String,)>(args).map(|(key,)| {
                self.scope
                    .session
                    .take_flash(&key)
                    .map(|v| Value::from_serialize(&v))
                    .unwrap_or(Value::UNDEFINED)
            }),
            "has_flash" => {
                from_args::<(String,)>(args).map(|(key,)| Value::from(self.scope.session.has_flash(&key)))
            }
            "uri_is" => from_args::<(String,)>(args)
                .map(|(pattern,)| Value::from(uri_is(&self.scope.uri, &pattern))),
            "variables" => Ok(Value::from_serialize(&self.variables())),
            _ => return None,
        };
        Some(result)
    }
}

/// String form of a template value; `none`/undefined become empty.
pub(crate) fn display(value: Option<&Value>) -> String {
    match value {
        None => String::new(),
        Some(v) if v.is_undefined() || v.is_none() => String::new(),
        Some(v) => match v.as_str() {
            Some(s) => s.to_string(),
            None => v.to_string(),
        },
    }
}

fn escaped(value: &JsonValue) -> Value {
    match value {
        JsonValue::String(s) => Value::from_safe_string(escape_html(s)),
        other => Value::from_serialize(other),
    }
}

fn raw(value: &JsonValue) -> Value {
    match value {
        JsonValue::String(s) => Value::from_safe_string(s.clone()),
        other => Value::from_serialize(other),
    }
}

fn fallback(default: Option<Value>, transform: fn(&JsonValue) -> Value) -> Value {
    match default.map(|d| serde_json::to_value(&d)) {
        Some(Ok(value)) => transform(&value),
        _ => Value::UNDEFINED,
    }
}

/// The `theme` object available in theme templates.
///
/// `theme.get('title')` and `theme.title` return data (then shared) values
/// with strings HTML-escaped; `theme.raw(...)` returns them untouched.
#[derive(Debug)]
pub struct ThemeContext {
    pub(crate) base: ContextBase,
    pub(crate) view: View,
}

impl ThemeContext {
    pub fn get(&self, key: &str) -> Option<Value> {
        self.base.value(key).map(escaped)
    }

    pub fn config(&self, key: &str) -> Option<JsonValue> {
        if !is_public_config_key(key) {
            tracing::debug!(key, "template asked for a private config key");
            return None;
        }
        self.view.config().lookup(key)
    }

    /// The logged-in user without anything but id, username and email.
    pub fn current_user(&self) -> Option<JsonValue> {
        self.base.scope.session.user().map(|user| {
            json!({
                "id": user.id,
                "username": user.username,
                "email": user.email,
            })
        })
    }
}

impl Object for ThemeContext {
    fn get_value(self: &Arc<Self>, key: &Value) -> Option<Value> {
        self.get(key.as_str()?)
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
                Ok(self.get(&key).unwrap_or_else(|| fallback(default, escaped)))
            }
            "raw" => {
                let (key, default) = from_args::<(String, Option<Value>)>(args)?;
                Ok(self
                    .base
                    .value(&key)
                    .map(raw)
                    .unwrap_or_else(|| fallback(default, raw)))
            }
            "url" => {
                let (path,) = from_args::<(Option<String>,)>(args)?;
                Ok(Value::from(self.view.url(path.as_deref().unwrap_or(""))))
            }
            "asset" => {
                let (path,) = from_args::<(String,)>(args)?;
                Ok(Value::from(self.view.asset(&path)))
            }
            "config" => {
                let (key, default) = from_args::<(String, Option<Value>)>(args)?;
                Ok(match self.config(&key) {
                    Some(value) => Value::from_serialize(&value),
                    None => default.unwrap_or(Value::UNDEFINED),
                })
            }
            "current_user" => Ok(self
                .current_user()
                .map(|user| Value::from_serialize(&user))
                .unwrap_or(Value::UNDEFINED)),
            "partial" => {
                let (name, extra) = from_args::<(String, Option<Value>)>(args)?;
                let data = self.base.partial_data(extra.as_ref());
                let html = self
                    .view
                    .partial_at_depth(&self.base.scope, &name, data, self.base.depth + 1)
                    .map_err(|e| Error::new(minijinja::ErrorKind::InvalidOperation, e.to_string()))?;
                Ok(Value::from_safe_string(html))
            }
            _ => Err(unknown_method("theme", method)),
        }
    }
}
