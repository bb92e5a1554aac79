//! Middleware module: the per-request chain of responsibility.
//!
//! A [`Middleware`] receives the request, the response being built and a [`Next`]
//! continuation. Running `next` hands control to the following middleware (or to the
//! route handler after the last one); returning without running it short-circuits the
//! request, which is how authentication or validation middlewares answer early.
//!
//! # Example
//! ```
//! use async_trait::async_trait;
//! use http::StatusCode;
//! use junction_web::middleware::{Middleware, Next};
//! use junction_web::{BoxError, RequestContext, Responder, WebResponse};
//!
//! struct RequireToken;
//!
//! #[async_trait]
//! impl Middleware for RequireToken {
//!     async fn handle(
//!         &self,
//!         req: &mut RequestContext,
//!         resp: &mut WebResponse,
//!         next: Next<'_>,
//!     ) -> Result<(), BoxError> {
//!         if req.headers().contains_key(http::header::AUTHORIZATION) {
//!             next.run(req, resp).await
//!         } else {
//!             (StatusCode::UNAUTHORIZED, "401 Unauthorized").respond_to(resp);
//!             Ok(())
//!         }
//!     }
//! }
//! ```

mod chain;
mod date;
mod encoding;

pub use chain::{MiddlewareChain, Next};
pub use date::{DateMiddleware, DateService};
pub use encoding::EncodingMiddleware;

#[cfg(test)]
pub(crate) use chain::tests::{Halt, Journal, JournalHandler, Recorder};

use crate::{BoxError, RequestContext, WebResponse};
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::fmt;

#[async_trait]
pub trait Middleware: Send + Sync {
    /// Processes the request; call `next.run(req, resp)` to continue the chain.
    ///
    /// `next` is consumed by running it, so the rest of the chain runs at most once per call.
    async fn handle(&self, req: &mut RequestContext, resp: &mut WebResponse, next: Next<'_>) -> Result<(), BoxError>;
}

/// A middleware that wraps a closure.
pub struct FnMiddleware<F> {
    f: F,
}

/// Creates a [`Middleware`] from a closure returning a boxed future.
///
/// # Example
/// ```
/// use junction_web::middleware::middleware_fn;
///
/// let powered_by = middleware_fn(|req, resp, next| {
///     Box::pin(async move {
///         next.run(req, resp).await?;
///         resp.headers_mut().insert("x-powered-by", http::HeaderValue::from_static("junction"));
///         Ok(())
///     })
/// });
/// # let _ = powered_by;
/// ```
pub fn middleware_fn<F>(f: F) -> FnMiddleware<F>
where
    F: for<'a> Fn(&'a mut RequestContext, &'a mut WebResponse, Next<'a>) -> BoxFuture<'a, Result<(), BoxError>>
        + Send
        + Sync,
{
    FnMiddleware { f }
}

#[async_trait]
impl<F> Middleware for FnMiddleware<F>
where
    F: for<'a> Fn(&'a mut RequestContext, &'a mut WebResponse, Next<'a>) -> BoxFuture<'a, Result<(), BoxError>>
        + Send
        + Sync,
{
    async fn handle(&self, req: &mut RequestContext, resp: &mut WebResponse, next: Next<'_>) -> Result<(), BoxError> {
        (self.f)(req, resp, next).await
    }
}

impl<F> fmt::Debug for FnMiddleware<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnMiddleware").finish_non_exhaustive()
    }
}
