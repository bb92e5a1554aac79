use crate::PathParams;
use crate::handler::RequestHandler;
use crate::middleware::Middleware;
use crate::router::pattern::PathPattern;
use http::Method;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// One registered endpoint of a [`Router`](crate::Router).
pub struct Route {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) pattern: Option<PathPattern>,
    pub(crate) middlewares: Vec<Arc<dyn Middleware>>,
    pub(crate) handler: Arc<dyn RequestHandler>,
    pub(crate) metadata: Option<Map<String, Value>>,
}

impl Route {
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The normalized path this route was registered with, group prefix included.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Group middlewares followed by the middlewares given at registration.
    pub fn middlewares(&self) -> &[Arc<dyn Middleware>] {
        &self.middlewares
    }

    pub fn handler(&self) -> &Arc<dyn RequestHandler> {
        &self.handler
    }

    pub fn metadata(&self) -> Option<&Map<String, Value>> {
        self.metadata.as_ref()
    }

    pub fn pattern(&self) -> Option<&PathPattern> {
        self.pattern.as_ref()
    }

    /// Literal comparison, ignoring one trailing slash on either side.
    ///
    /// The root only matches `/` itself, `//` is not trimmed down to it.
    pub(crate) fn matches_exact(&self, path: &str) -> bool {
        if self.path == "/" {
            return path == "/";
        }
        trim_trailing_slash(&self.path) == trim_trailing_slash(path)
    }

    pub(crate) fn match_pattern(&self, path: &str) -> Option<PathParams> {
        self.pattern.as_ref()?.matches(path)
    }
}

fn trim_trailing_slash(path: &str) -> &str {
    if path.len() > 1 { path.strip_suffix('/').unwrap_or(path) } else { path }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("middlewares", &self.middlewares.len())
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

/// Collects what a route is made of before it is registered.
///
/// ```
/// use junction_web::router::{route, RouteBuilder};
/// use junction_web::NotFoundHandler;
///
/// let builder: RouteBuilder = route(NotFoundHandler).metadata(serde_json::json!({ "summary": "always 404" }));
/// # let _ = builder;
/// ```
#[derive(Default)]
pub struct RouteBuilder {
    pub(crate) middlewares: Vec<Arc<dyn Middleware>>,
    pub(crate) handler: Option<Arc<dyn RequestHandler>>,
    pub(crate) metadata: Option<Value>,
}

impl RouteBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a route specific middleware, it runs after the group middlewares.
    pub fn with<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    pub fn with_shared(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middlewares.push(middleware);
        self
    }

    pub fn handler<H: RequestHandler + 'static>(mut self, handler: H) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Attaches documentation metadata; registration fails unless it is a JSON object.
    pub fn metadata(mut self, metadata: impl Into<Value>) -> Self {
        self.metadata = Some(metadata.into());
        self
    }
}

impl fmt::Debug for RouteBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteBuilder")
            .field("middlewares", &self.middlewares.len())
            .field("has_handler", &self.handler.is_some())
            .field("metadata", &self.metadata)
            .finish()
    }
}

/// Starts a [`RouteBuilder`] with its handler.
pub fn route<H: RequestHandler + 'static>(handler: H) -> RouteBuilder {
    RouteBuilder::new().handler(handler)
}

/// The outcome of a successful [`Router::resolve`](crate::Router::resolve).
#[derive(Debug)]
pub struct RouteMatch<'router> {
    route: &'router Route,
    params: PathParams,
}

impl<'router> RouteMatch<'router> {
    pub(crate) fn new(route: &'router Route, params: PathParams) -> Self {
        Self { route, params }
    }

    pub fn route(&self) -> &'router Route {
        self.route
    }

    pub fn params(&self) -> &PathParams {
        &self.params
    }

    pub fn into_params(self) -> PathParams {
        self.params
    }
}
