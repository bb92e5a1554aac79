use crate::handler::RequestHandler;
use crate::middleware::Middleware;
use crate::{BoxError, RequestContext, WebResponse};
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// The continuation handed to a [`Middleware`].
///
/// It borrows the immutable chain and remembers the index of the entry to invoke next.
/// Running it consumes it, and it is neither `Clone` nor `Copy`, so the rest of the chain
/// cannot be entered twice from the same middleware invocation.
pub struct Next<'chain> {
    middlewares: &'chain [Arc<dyn Middleware>],
    index: usize,
    handler: &'chain dyn RequestHandler,
}

impl<'chain> Next<'chain> {
    pub(crate) fn new(middlewares: &'chain [Arc<dyn Middleware>], handler: &'chain dyn RequestHandler) -> Self {
        Self { middlewares, index: 0, handler }
    }

    /// Invokes the entry at the current index: the next middleware, or the handler once every
    /// middleware has continued.
    pub async fn run(self, req: &mut RequestContext, resp: &mut WebResponse) -> Result<(), BoxError> {
        match self.middlewares.get(self.index) {
            Some(middleware) => {
                trace!(index = self.index, "invoke middleware");
                let next = Next { middlewares: self.middlewares, index: self.index + 1, handler: self.handler };
                middleware.handle(req, resp, next).await
            }
            None => {
                trace!("invoke handler");
                self.handler.invoke(req, resp).await
            }
        }
    }

    /// Number of middlewares left before the handler.
    pub fn remaining(&self) -> usize {
        self.middlewares.len().saturating_sub(self.index)
    }
}

impl fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next").field("index", &self.index).field("remaining", &self.remaining()).finish()
    }
}

/// An ordered list of middlewares ending with a handler.
///
/// The server builds one per request (global middlewares, then the route's middlewares) and
/// drops it once the response is produced.
pub struct MiddlewareChain {
    middlewares: Vec<Arc<dyn Middleware>>,
    handler: Arc<dyn RequestHandler>,
}

impl MiddlewareChain {
    pub fn new(handler: Arc<dyn RequestHandler>) -> Self {
        Self { middlewares: Vec::new(), handler }
    }

    /// Appends a middleware, it will run after the ones already added.
    pub fn with<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    pub fn with_shared(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middlewares.push(middleware);
        self
    }

    pub fn extend<I>(mut self, middlewares: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn Middleware>>,
    {
        self.middlewares.extend(middlewares);
        self
    }

    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Runs the chain from its first middleware.
    ///
    /// Errors raised by a middleware or the handler are returned as is.
    pub async fn run(&self, req: &mut RequestContext, resp: &mut WebResponse) -> Result<(), BoxError> {
        Next::new(&self.middlewares, self.handler.as_ref()).run(req, resp).await
    }
}

impl fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareChain").field("middlewares", &self.middlewares.len()).finish_non_exhaustive()
    }
}
