use crate::responder::Responder;
use crate::{RequestContext, WebResponse};
use async_trait::async_trait;
use futures::future::BoxFuture;
use http::StatusCode;
use std::error::Error;
use std::fmt;

pub type BoxError = Box<dyn Error + Send + Sync>;

/// The terminal entry of a middleware chain, it produces the response of a matched route.
///
/// A handler writes into the response it is given and never continues the chain.
/// Any error it returns is propagated untouched through the middlewares and is turned
/// into a `500` response by the server.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RequestHandler: Send + Sync {
    async fn invoke(&self, req: &mut RequestContext, resp: &mut WebResponse) -> Result<(), BoxError>;
}

/// a closure holder which represents any handler function
pub struct FnHandler<F> {
    f: F,
}

/// Creates a [`RequestHandler`] from a closure returning a boxed future.
///
/// # Example
/// ```
/// use junction_web::{handler_fn, Responder};
///
/// let handler = handler_fn(|req, resp| {
///     Box::pin(async move {
///         format!("hello {}", req.param("name").unwrap_or("world")).respond_to(resp);
///         Ok(())
///     })
/// });
/// # let _ = handler;
/// ```
pub fn handler_fn<F>(f: F) -> FnHandler<F>
where
    F: for<'a> Fn(&'a mut RequestContext, &'a mut WebResponse) -> BoxFuture<'a, Result<(), BoxError>> + Send + Sync,
{
    FnHandler { f }
}

#[async_trait]
impl<F> RequestHandler for FnHandler<F>
where
    F: for<'a> Fn(&'a mut RequestContext, &'a mut WebResponse) -> BoxFuture<'a, Result<(), BoxError>> + Send + Sync,
{
    async fn invoke(&self, req: &mut RequestContext, resp: &mut WebResponse) -> Result<(), BoxError> {
        (self.f)(req, resp).await
    }
}

impl<F> fmt::Debug for FnHandler<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnHandler").finish_non_exhaustive()
    }
}

/// Default handler for requests no route matched.
#[derive(Debug, Default, Clone, Copy)]
pub struct NotFoundHandler;

#[async_trait]
impl RequestHandler for NotFoundHandler {
    async fn invoke(&self, _req: &mut RequestContext, resp: &mut WebResponse) -> Result<(), BoxError> {
        (StatusCode::NOT_FOUND, "404 Not Found").respond_to(resp);
        Ok(())
    }
}

/// Handler for requests whose method the router does not accept.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct MethodNotAllowedHandler;

#[async_trait]
impl RequestHandler for MethodNotAllowedHandler {
    async fn invoke(&self, _req: &mut RequestContext, resp: &mut WebResponse) -> Result<(), BoxError> {
        (StatusCode::METHOD_NOT_ALLOWED, "405 Method Not Allowed").respond_to(resp);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{NotFoundHandler, RequestHandler, handler_fn};
    use crate::{RequestContext, Responder, ResponseBody, WebResponse};
    use bytes::Bytes;
    use http::{Request, StatusCode};

    fn assert_is_handler<T: RequestHandler>(_handler: &T) {
        // no op
    }

    fn context(uri: &str) -> RequestContext {
        RequestContext::from_request(Request::builder().uri(uri).body(Bytes::new()).unwrap())
    }

    #[tokio::test]
    async fn test_handler_fn() {
        let handler = handler_fn(|req, resp| {
            Box::pin(async move {
                format!("path: {}", req.path()).respond_to(resp);
                Ok(())
            })
        });
        assert_is_handler(&handler);

        let mut req = context("/hello");
        let mut resp = WebResponse::new(ResponseBody::empty());
        handler.invoke(&mut req, &mut resp).await.unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.body().as_bytes().unwrap().as_ref(), b"path: /hello");
    }

    #[tokio::test]
    async fn test_handler_fn_error() {
        let handler = handler_fn(|_req, _resp| Box::pin(async move { Err("broken".into()) }));

        let mut req = context("/");
        let mut resp = WebResponse::new(ResponseBody::empty());
        let result = handler.invoke(&mut req, &mut resp).await;

        assert_eq!(result.unwrap_err().to_string(), "broken");
    }

    #[tokio::test]
    async fn test_not_found_handler() {
        let mut req = context("/missing");
        let mut resp = WebResponse::new(ResponseBody::empty());
        NotFoundHandler.invoke(&mut req, &mut resp).await.unwrap();

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
