use serde::Serialize;

use super::{normalize_uri, Method, RouteError, RoutePattern};

/// A registered route.
#[derive(Debug, Clone)]
struct Route<A> {
    method: Method,
    uri: String,
    pattern: RoutePattern,
    action: A,
    middleware: Vec<String>,
}

/// Attributes applied to every route registered inside [`RouteTable::group`].
#[derive(Debug, Clone, Default)]
pub struct Group {
    prefix: Option<String>,
    middleware: Vec<String>,
}

impl Group {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn middleware(mut self, name: impl Into<String>) -> Self {
        self.middleware.push(name.into());
        self
    }
}

/// Result of a successful route lookup.
#[derive(Debug)]
pub struct RouteMatch<'a, A> {
    pub action: &'a A,
    pub middleware: &'a [String],
    pub uri: &'a str,
    pub params: Vec<(String, String)>,
}

/// Summary of a registered route, for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteInfo {
    pub method: Method,
    pub uri: String,
    pub middleware: Vec<String>,
}

/// Ordered table of routes with group and middleware bookkeeping.
///
/// `A` is the action type; the shell stores handler trait objects here.
#[derive(Debug, Clone)]
pub struct RouteTable<A> {
    routes: Vec<Route<A>>,
    global_middleware: Vec<String>,
    group_prefix: String,
    group_middleware: Vec<String>,
}

impl<A> Default for RouteTable<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A> RouteTable<A> {
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            global_middleware: Vec::new(),
            group_prefix: String::new(),
            group_middleware: Vec::new(),
        }
    }

    pub fn get(&mut self, uri: &str, action: A) -> Result<(), RouteError> {
        self.add(Method::Get, uri, action)
    }

    pub fn post(&mut self, uri: &str, action: A) -> Result<(), RouteError> {
        self.add(Method::Post, uri, action)
    }

    pub fn put(&mut self, uri: &str, action: A) -> Result<(), RouteError> {
        self.add(Method::Put, uri, action)
    }

    pub fn delete(&mut self, uri: &str, action: A) -> Result<(), RouteError> {
        self.add(Method::Delete, uri, action)
    }

    pub fn patch(&mut self, uri: &str, action: A) -> Result<(), RouteError> {
        self.add(Method::Patch, uri, action)
    }

    /// Registers a route under the current group prefix and middleware.
    ///
    /// Registering the same method and URI again replaces the earlier route
    /// in place, so lookup order is unchanged.
    pub fn add(&mut self, method: Method, uri: &str, action: A) -> Result<(), RouteError> {
        let uri = normalize_uri(&self.group_prefix, uri);
        let middleware = self.group_middleware.clone();

        if let Some(existing) = self
            .routes
            .iter_mut()
            .find(|r| r.method == method && r.uri == uri)
        {
            existing.action = action;
            existing.middleware = middleware;
            return Ok(());
        }

        let pattern = RoutePattern::compile(&uri)?;
        self.routes.push(Route {
            method,
            uri,
            pattern,
            action,
            middleware,
        });
        Ok(())
    }

    /// Registers routes with a shared prefix and middleware.
    ///
    /// Groups nest: prefixes concatenate and middleware lists append. The
    /// previous prefix and middleware are restored afterwards, even when the
    /// closure fails.
    pub fn group<F>(&mut self, group: Group, routes: F) -> Result<(), RouteError>
    where
        F: FnOnce(&mut Self) -> Result<(), RouteError>,
    {
        let previous_prefix = self.group_prefix.clone();
        let previous_middleware = self.group_middleware.clone();

        if let Some(prefix) = &group.prefix {
            self.group_prefix = format!("{previous_prefix}/{}", prefix.trim_matches('/'));
        }
        self.group_middleware.extend(group.middleware);

        let result = routes(self);

        self.group_prefix = previous_prefix;
        self.group_middleware = previous_middleware;
        result
    }

    /// Adds middleware that runs for every request before route lookup.
    pub fn add_global_middleware(&mut self, name: impl Into<String>) {
        self.global_middleware.push(name.into());
    }

    pub fn global_middleware(&self) -> &[String] {
        &self.global_middleware
    }

    /// Finds the first route registered for `method` whose pattern matches.
    pub fn find(&self, method: Method, path: &str) -> Option<RouteMatch<'_, A>> {
        self.routes
            .iter()
            .filter(|route| route.method == method)
            .find_map(|route| {
                route.pattern.captures(path).map(|params| RouteMatch {
                    action: &route.action,
                    middleware: &route.middleware,
                    uri: &route.uri,
                    params,
                })
            })
    }

    /// Lists every route in registration order.
    pub fn routes(&self) -> Vec<RouteInfo> {
        self.routes
            .iter()
            .map(|route| RouteInfo {
                method: route.method,
                uri: route.uri.clone(),
                middleware: route.middleware.clone(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
