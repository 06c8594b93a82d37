use axum::{
    body::Bytes,
    http::{header, HeaderMap, Method as HttpMethod, Uri},
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use infinity_core::routing::Method;

use crate::error::HttpError;
use crate::session::Session;
use crate::view::RequestScope;

/// Form field that overrides the method of a `POST` form.
pub const METHOD_FIELD: &str = "_method";

/// An incoming request as seen by middleware and handlers.
///
/// Parameters from the query string, an urlencoded form body and a JSON
/// object body are merged into one input map, later sources winning.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    path: String,
    query: Map<String, Value>,
    input: Map<String, Value>,
    headers: HeaderMap,
    params: Vec<(String, String)>,
    session: Session,
    shared: Map<String, Value>,
}

impl Request {
    pub fn new(
        method: &HttpMethod,
        uri: &Uri,
        headers: HeaderMap,
        body: &[u8],
        session: Session,
    ) -> Result<Self, HttpError> {
        let mut method: Method = method
            .as_str()
            .parse()
            .map_err(|_| HttpError::BadRequest(format!("Unsupported method {method}")))?;

        let query = uri.query().map(parse_urlencoded).unwrap_or_default();
        let mut input = query.clone();

        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();

        let mut body_input = Map::new();
        if !body.is_empty() {
            if content_type.starts_with("application/x-www-form-urlencoded") {
                body_input = parse_urlencoded(&String::from_utf8_lossy(body));
            } else if content_type.contains("application/json") {
                match serde_json::from_slice::<Value>(body) {
                    Ok(Value::Object(json)) => body_input = json,
                    Ok(_) => {}
                    Err(e) => return Err(HttpError::BadRequest(format!("Invalid JSON body: {e}"))),
                }
            }
        }

        // Only the body may override the method; the query string never does.
        if method == Method::Post {
            let spoofed = body_input
                .get(METHOD_FIELD)
                .and_then(Value::as_str)
                .and_then(|m| m.parse::<Method>().ok());
            if let Some(spoofed @ (Method::Put | Method::Patch | Method::Delete)) = spoofed {
                method = spoofed;
            }
        }
        input.extend(body_input);

        Ok(Self {
            method,
            path: normalize_path(uri.path()),
            query,
            input,
            headers,
            params: Vec::new(),
            session,
            shared: Map::new(),
        })
    }

    pub fn method(&self) -> Method {
        self.method
    }

    /// Normalized request path, without query string or trailing slash.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn input(&self, key: &str) -> Option<&Value> {
        self.input.get(key)
    }

    /// Input value as a string; numbers and booleans are stringified.
    pub fn input_str(&self, key: &str) -> Option<String> {
        match self.input.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    pub fn input_or(&self, key: &str, default: &str) -> String {
        self.input_str(key).unwrap_or_else(|| default.to_string())
    }

    pub fn has(&self, key: &str) -> bool {
        self.input.get(key).is_some_and(|v| !v.is_null())
    }

    pub fn all(&self) -> &Map<String, Value> {
        &self.input
    }

    /// Query-string parameter only.
    pub fn query(&self, key: &str) -> Option<&str> {
        self.query.get(key).and_then(Value::as_str)
    }

    /// Deserializes the merged input into `T`.
    pub fn form<T: DeserializeOwned>(&self) -> Result<T, HttpError> {
        serde_json::from_value(Value::Object(self.input.clone()))
            .map_err(|e| HttpError::BadRequest(format!("Invalid input: {e}")))
    }

    /// Route parameter captured by `{name}`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    pub(crate) fn set_params(&mut self, params: Vec<(String, String)>) {
        self.params = params;
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn is_htmx(&self) -> bool {
        self.headers.contains_key("HX-Request")
    }

    pub fn is_ajax(&self) -> bool {
        self.header("X-Requested-With")
            .is_some_and(|v| v.eq_ignore_ascii_case("xmlhttprequest"))
    }

    /// AJAX requests and requests that accept JSON.
    pub fn wants_json(&self) -> bool {
        self.is_ajax()
            || self
                .header(header::ACCEPT.as_str())
                .is_some_and(|v| v.contains("application/json"))
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Shares a value with every template rendered for this request.
    pub fn share(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.shared.insert(key.into(), value.into());
    }

    pub fn shared(&self) -> &Map<String, Value> {
        &self.shared
    }

    /// The request state templates can see.
    pub fn scope(&self) -> RequestScope {
        RequestScope {
            uri: self.path.clone(),
            is_htmx: self.is_htmx(),
            session: self.session.clone(),
            shared: self.shared.clone(),
        }
    }
}

/// Strips a leading `/public/` and surrounding slashes: `/public/blog/` →
/// `/blog`.
pub fn normalize_path(path: &str) -> String {
    let path = match path.strip_prefix("/public/") {
        Some(rest) => rest,
        None if path == "/public" => "",
        None => path,
    };
    format!("/{}", path.trim_matches('/'))
}

fn parse_urlencoded(source: &str) -> Map<String, Value> {
    url::form_urlencoded::parse(source.as_bytes())
        .map(|(key, value)| (key.into_owned(), Value::String(value.into_owned())))
        .collect()
}
