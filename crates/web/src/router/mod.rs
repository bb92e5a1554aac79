//! Route table: registration and resolution of `(method, path)` pairs.
//!
//! Routes are kept in registration order and resolved in two passes:
//!
//! 1. an exact pass returning the first route whose path equals the request path
//!    (one trailing slash is ignored on either side);
//! 2. a pattern pass returning the first route whose compiled [`PathPattern`] matches.
//!
//! Literal paths therefore always win over parameterized ones, and among parameterized
//! routes the first registered wins. There is no specificity scoring.
//!
//! # Example
//! ```
//! use junction_web::router::{route, Router};
//! use junction_web::{handler_fn, Responder};
//!
//! let mut router = Router::new();
//! router
//!     .get("/", route(handler_fn(|_req, resp| Box::pin(async move { "index".respond_to(resp); Ok(()) }))))
//!     .unwrap()
//!     .get("/users/:id", route(handler_fn(|req, resp| Box::pin(async move {
//!         format!("user {}", req.param("id").unwrap_or_default()).respond_to(resp);
//!         Ok(())
//!     }))))
//!     .unwrap();
//!
//! let matched = router.resolve(&http::Method::GET, "/users/7/").unwrap().unwrap();
//! assert_eq!(matched.route().path(), "/users/:id");
//! assert_eq!(matched.params().get("id"), Some("7"));
//! ```

mod error;
mod pattern;
mod route;

pub use error::RouteError;
pub use pattern::PathPattern;
pub use route::{Route, RouteBuilder, RouteMatch, route};

use crate::PathParams;
use crate::handler::RequestHandler;
use crate::middleware::Middleware;
use http::Method;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;
use std::ops::Range;
use std::sync::Arc;
use tracing::{debug, trace};

const DEFAULT_METHODS: [Method; 9] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::PATCH,
    Method::HEAD,
    Method::OPTIONS,
    Method::CONNECT,
    Method::TRACE,
];

/// Middlewares attached to a group prefix.
struct Group {
    prefix: String,
    middlewares: Vec<Arc<dyn Middleware>>,
}

/// Where [`Router::attach_group`] put a batch of middlewares.
struct Attached {
    index: usize,
    range: Range<usize>,
}

/// The route table.
///
/// A router is populated with `&mut self` methods during startup and then moved into a
/// [`Server`](crate::Server), where it is only read.
pub struct Router {
    routes: Vec<Route>,
    methods: HashSet<Method>,
    groups: Vec<Group>,
    prefix: String,
}

macro_rules! method_route {
    ($name:ident, $method:ident) => {
        #[doc = concat!("Registers a `", stringify!($method), "` route, see [`Router::register`].")]
        pub fn $name(&mut self, path: &str, builder: RouteBuilder) -> Result<&mut Self, RouteError> {
            let path = join_path(&self.prefix, path);
            self.insert(Method::$method, path, builder)
        }
    };
}

impl Router {
    /// Creates an empty router accepting the standard HTTP methods.
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            methods: DEFAULT_METHODS.into_iter().collect(),
            groups: Vec::new(),
            prefix: String::from("/"),
        }
    }

    /// Registers a route under the current group prefix.
    ///
    /// `method` is upper-cased before it is parsed. Registration fails, leaving the table
    /// unchanged, when the method is not accepted, the builder has no handler, the metadata
    /// is not a JSON object, or the path can't be compiled.
    pub fn register(&mut self, method: &str, path: &str, builder: RouteBuilder) -> Result<&mut Self, RouteError> {
        let method = parse_method(method)?;
        let path = join_path(&self.prefix, path);
        self.insert(method, path, builder)
    }

    method_route!(get, GET);
    method_route!(post, POST);
    method_route!(put, PUT);
    method_route!(delete, DELETE);
    method_route!(patch, PATCH);
    method_route!(head, HEAD);
    method_route!(options, OPTIONS);
    method_route!(connect, CONNECT);
    method_route!(trace, TRACE);

    fn insert(&mut self, method: Method, path: String, builder: RouteBuilder) -> Result<&mut Self, RouteError> {
        if !self.methods.contains(&method) {
            return Err(RouteError::UnsupportedMethod { method });
        }

        let RouteBuilder { middlewares, handler, metadata } = builder;

        let Some(handler) = handler else {
            return Err(RouteError::MissingHandler { method, path });
        };

        let metadata = match metadata {
            None => None,
            Some(Value::Object(map)) => Some(map),
            Some(_) => return Err(RouteError::InvalidMetadata { path }),
        };

        self.push_route(method, path, middlewares, handler, metadata)
    }

    /// Compiles `path` and stores the route behind the groups currently matching it.
    fn push_route(
        &mut self,
        method: Method,
        path: String,
        tail: Vec<Arc<dyn Middleware>>,
        handler: Arc<dyn RequestHandler>,
        metadata: Option<Map<String, Value>>,
    ) -> Result<&mut Self, RouteError> {
        let pattern = match PathPattern::compile(&path) {
            Ok(pattern) => pattern,
            Err(source) => return Err(RouteError::InvalidPattern { path, source }),
        };

        let mut middlewares = self.group_middlewares(&path);
        middlewares.extend(tail);

        debug!(method = %method, path = %path, middlewares = middlewares.len(), "register route");
        self.routes.push(Route { method, path, pattern, middlewares, handler, metadata });
        Ok(self)
    }

    /// Sets the prefix applied to subsequent registrations and attaches `middlewares` to it.
    ///
    /// The prefix is absolute: it replaces the current one rather than nesting into it,
    /// and `group("/", vec![])` returns to the root. Group middlewares apply to routes
    /// registered afterwards whose final path starts with the prefix, routes registered
    /// earlier are not affected.
    pub fn group(&mut self, prefix: &str, middlewares: Vec<Arc<dyn Middleware>>) -> Result<&mut Self, RouteError> {
        let prefix = normalize_path(prefix);
        validate_prefix(&prefix)?;

        self.attach_group(&prefix, middlewares);
        self.prefix = prefix;
        Ok(self)
    }

    /// Registers routes under `prefix`, joined to the current prefix, then restores it.
    ///
    /// ```
    /// use junction_web::router::{route, Router};
    /// use junction_web::NotFoundHandler;
    ///
    /// let mut router = Router::new();
    /// router
    ///     .scope("/api", vec![], |api| {
    ///         api.get("/ping", route(NotFoundHandler))?;
    ///         api.scope("/admin", vec![], |admin| admin.get("/stats", route(NotFoundHandler)).map(|_| ()))?;
    ///         Ok(())
    ///     })
    ///     .unwrap();
    ///
    /// let paths: Vec<_> = router.list_routes().iter().map(|route| route.path()).collect();
    /// assert_eq!(paths, ["/api/ping", "/api/admin/stats"]);
    /// ```
    pub fn scope<F>(
        &mut self,
        prefix: &str,
        middlewares: Vec<Arc<dyn Middleware>>,
        f: F,
    ) -> Result<&mut Self, RouteError>
    where
        F: FnOnce(&mut Router) -> Result<(), RouteError>,
    {
        let prefix = join_path(&self.prefix, prefix);
        validate_prefix(&prefix)?;

        let attached = self.attach_group(&prefix, middlewares);
        let previous = std::mem::replace(&mut self.prefix, prefix);
        let result = f(&mut *self);
        self.prefix = previous;

        if let (Err(_), Some(attached)) = (&result, attached) {
            self.detach_group(attached);
        }
        result.map(|()| self)
    }

    /// Flattens `router` into this table under `prefix`, joined to the current prefix.
    ///
    /// Mounted routes keep the middlewares they were registered with, behind the groups of
    /// this router matching their new path. The mounted router's accepted methods are
    /// merged and its groups are re-attached below `prefix`, so they apply to routes
    /// registered here afterwards.
    pub fn mount(&mut self, prefix: &str, router: Router) -> Result<&mut Self, RouteError> {
        let prefix = join_path(&self.prefix, prefix);
        validate_prefix(&prefix)?;

        let Router { routes, methods, groups, .. } = router;
        self.methods.extend(methods);

        for route in routes {
            let path = join_path(&prefix, &route.path);
            self.push_route(route.method, path, route.middlewares, route.handler, route.metadata)?;
        }

        for group in groups {
            self.attach_group(&join_path(&prefix, &group.prefix), group.middlewares);
        }

        debug!(prefix = %prefix, "mount router");
        Ok(self)
    }

    /// Resolves a request to a route.
    ///
    /// Returns `Ok(None)` when nothing matches, and [`RouteError::UnsupportedMethod`] when
    /// the method is not accepted by this router. An empty path is treated as `/`.
    pub fn resolve(&self, method: &Method, path: &str) -> Result<Option<RouteMatch<'_>>, RouteError> {
        if !self.methods.contains(method) {
            return Err(RouteError::UnsupportedMethod { method: method.clone() });
        }

        let path = if path.is_empty() { "/" } else { path };
        let candidates = || self.routes.iter().filter(|route| route.method == *method);

        if let Some(route) = candidates().find(|route| route.matches_exact(path)) {
            trace!(method = %method, path, route = %route.path, "exact match");
            return Ok(Some(RouteMatch::new(route, PathParams::empty())));
        }

        let matched =
            candidates().find_map(|route| route.match_pattern(path).map(|params| RouteMatch::new(route, params)));
        match &matched {
            Some(matched) => trace!(method = %method, path, route = %matched.route().path(), "pattern match"),
            None => trace!(method = %method, path, "no route matched"),
        }
        Ok(matched)
    }

    /// Accepts `token` as an HTTP method from now on.
    pub fn add_method(&mut self, token: &str) -> Result<&mut Self, RouteError> {
        let method = parse_method(token)?;
        debug!(method = %method, "accept custom method");
        self.methods.insert(method);
        Ok(self)
    }

    pub fn accepts(&self, method: &Method) -> bool {
        self.methods.contains(method)
    }

    /// Registered routes, in registration order.
    pub fn list_routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// The prefix applied to the next registration.
    pub fn current_prefix(&self) -> &str {
        &self.prefix
    }

    fn attach_group(&mut self, prefix: &str, middlewares: Vec<Arc<dyn Middleware>>) -> Option<Attached> {
        if middlewares.is_empty() {
            return None;
        }

        debug!(prefix, middlewares = middlewares.len(), "attach group middlewares");
        let index = match self.groups.iter().position(|group| group.prefix == prefix) {
            Some(index) => index,
            None => {
                self.groups.push(Group { prefix: prefix.to_string(), middlewares: Vec::new() });
                self.groups.len() - 1
            }
        };

        let group = &mut self.groups[index];
        let start = group.middlewares.len();
        group.middlewares.extend(middlewares);
        Some(Attached { index, range: start..group.middlewares.len() })
    }

    /// Takes back middlewares added by [`attach_group`](Self::attach_group).
    ///
    /// Groups only grow, so the slot stays valid while later attachments are undone first.
    fn detach_group(&mut self, attached: Attached) {
        if let Some(group) = self.groups.get_mut(attached.index) {
            debug!(prefix = %group.prefix, middlewares = attached.range.len(), "detach group middlewares");
            group.middlewares.drain(attached.range);
        }
    }

    /// Middlewares of every group whose prefix starts `path`, shortest prefix first.
    fn group_middlewares(&self, path: &str) -> Vec<Arc<dyn Middleware>> {
        let mut groups: Vec<&Group> = self.groups.iter().filter(|group| path.starts_with(&group.prefix)).collect();
        // stable, equal lengths keep group registration order
        groups.sort_by_key(|group| group.prefix.len());

        groups.into_iter().flat_map(|group| group.middlewares.iter().map(Arc::clone)).collect()
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let groups: Vec<&str> = self.groups.iter().map(|group| group.prefix.as_str()).collect();
        f.debug_struct("Router")
            .field("routes", &self.routes)
            .field("methods", &self.methods)
            .field("groups", &groups)
            .field("prefix", &self.prefix)
            .finish()
    }
}

fn parse_method(token: &str) -> Result<Method, RouteError> {
    Method::from_bytes(token.to_ascii_uppercase().as_bytes())
        .map_err(|source| RouteError::InvalidMethod { token: token.to_string(), source })
}

fn validate_prefix(prefix: &str) -> Result<(), RouteError> {
    if prefix.split('/').any(|segment| segment.starts_with(':')) {
        return Err(RouteError::InvalidGroupPrefix {
            prefix: prefix.to_string(),
            reason: "path parameters are not allowed in a group prefix",
        });
    }
    Ok(())
}

/// Adds the leading `/`, collapses runs of `/`, an empty path becomes `/`.
fn normalize_path(path: &str) -> String {
    let mut normalized = String::with_capacity(path.len() + 1);
    normalized.push('/');
    for c in path.chars() {
        if c == '/' && normalized.ends_with('/') {
            continue;
        }
        normalized.push(c);
    }
    normalized
}

/// Joins `path` below `prefix`, a root `path` resolves to the prefix itself.
fn join_path(prefix: &str, path: &str) -> String {
    if path.is_empty() || path == "/" {
        return normalize_path(prefix);
    }
    normalize_path(&format!("{prefix}/{path}"))
}
