//! HTTP server and request dispatcher.
//!
//! [`Server::dispatch`] is the request handling boundary: it resolves the request against
//! the router, runs the global middlewares followed by the matched route's middlewares and
//! handler, and maps the outcome to a response:
//!
//! - no route matched: the default handler runs (404 unless replaced);
//! - the method is not accepted by the router: 405;
//! - a middleware or handler returned an error: the partial response is discarded and a 500
//!   is sent.
//!
//! [`Server::start`] binds the configured address and serves HTTP/1.1 connections with hyper.

use crate::handler::{MethodNotAllowedHandler, NotFoundHandler, RequestHandler};
use crate::middleware::{Middleware, MiddlewareChain};
use crate::router::Router;
use crate::{RequestContext, Responder, ResponseBody, WebResponse};
use bytes::Bytes;
use http::{Request, StatusCode};
use http_body_util::BodyExt;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::fmt;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

pub struct ServerBuilder {
    router: Option<Router>,
    default_handler: Option<Arc<dyn RequestHandler>>,
    address: Option<io::Result<Vec<SocketAddr>>>,
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl ServerBuilder {
    fn new() -> Self {
        Self { router: None, default_handler: None, address: None, middlewares: Vec::new() }
    }

    /// Sets the listening address, resolution errors are reported by [`build`](Self::build).
    pub fn address<A: ToSocketAddrs>(mut self, address: A) -> Self {
        self.address = Some(address.to_socket_addrs().map(Iterator::collect));
        self
    }

    pub fn router(mut self, router: Router) -> Self {
        self.router = Some(router);
        self
    }

    /// Replaces the handler used when no route matches.
    pub fn default_handler(mut self, request_handler: impl RequestHandler + 'static) -> Self {
        self.default_handler = Some(Arc::new(request_handler));
        self
    }

    /// Appends a global middleware.
    ///
    /// Global middlewares run for every request, in the order they were added, ahead of the
    /// route's middlewares. They also wrap the not found and method not allowed handlers.
    pub fn middleware(mut self, middleware: impl Middleware + 'static) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    pub fn build(self) -> Result<Server, ServerBuildError> {
        let router = self.router.ok_or(ServerBuildError::MissingRouter)?;
        let address = match self.address {
            None => return Err(ServerBuildError::MissingAddress),
            Some(Err(source)) => return Err(ServerBuildError::InvalidAddress { source }),
            Some(Ok(address)) if address.is_empty() => return Err(ServerBuildError::MissingAddress),
            Some(Ok(address)) => address,
        };
        let default_handler = self.default_handler.unwrap_or_else(|| Arc::new(NotFoundHandler));

        Ok(Server { router, default_handler, address, middlewares: self.middlewares })
    }
}

impl fmt::Debug for ServerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerBuilder")
            .field("router", &self.router)
            .field("address", &self.address)
            .field("middlewares", &self.middlewares.len())
            .finish_non_exhaustive()
    }
}

pub struct Server {
    router: Router,
    default_handler: Arc<dyn RequestHandler>,
    address: Vec<SocketAddr>,
    middlewares: Vec<Arc<dyn Middleware>>,
}

#[derive(Error, Debug)]
pub enum ServerBuildError {
    #[error("router must be set")]
    MissingRouter,
    #[error("address must be set")]
    MissingAddress,
    #[error("address can't be resolved: {source}")]
    InvalidAddress {
        #[source]
        source: io::Error,
    },
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn address(&self) -> &[SocketAddr] {
        &self.address
    }

    /// Handles one request whose body has already been collected.
    pub async fn dispatch(&self, request: Request<Bytes>) -> WebResponse {
        let mut req = RequestContext::from_request(request);
        let mut resp = WebResponse::new(ResponseBody::empty());

        let chain = self.chain_for(&mut req);
        match chain.run(&mut req, &mut resp).await {
            Ok(()) => resp,
            Err(e) => {
                error!(method = %req.method(), path = req.path(), cause = %e, "request handling error");
                text_response(StatusCode::INTERNAL_SERVER_ERROR, "500 Internal Server Error")
            }
        }
    }

    /// Resolves the request and builds its chain, storing the captured path params into `req`.
    fn chain_for(&self, req: &mut RequestContext) -> MiddlewareChain {
        let global = self.middlewares.iter().map(Arc::clone);

        match self.router.resolve(req.method(), req.path()) {
            Ok(Some(matched)) => {
                let route = matched.route();
                req.set_path_params(matched.into_params());
                MiddlewareChain::new(Arc::clone(route.handler()))
                    .extend(global)
                    .extend(route.middlewares().iter().map(Arc::clone))
            }
            Ok(None) => {
                debug!(method = %req.method(), path = req.path(), "no route matched");
                MiddlewareChain::new(Arc::clone(&self.default_handler)).extend(global)
            }
            Err(e) => {
                debug!(cause = %e, "reject request");
                MiddlewareChain::new(Arc::new(MethodNotAllowedHandler)).extend(global)
            }
        }
    }

    /// Collects the request body and dispatches the request.
    async fn serve(&self, request: Request<Incoming>) -> Result<WebResponse, Infallible> {
        let (parts, body) = request.into_parts();
        let body = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                warn!(cause = %e, "read request body error");
                return Ok(text_response(StatusCode::BAD_REQUEST, "400 Bad Request"));
            }
        };

        Ok(self.dispatch(Request::from_parts(parts, body)).await)
    }

    pub async fn start(self) {
        let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
        if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
            warn!(cause = %e, "tracing subscriber already set");
        }

        info!("start listening at {:?}", self.address);
        let tcp_listener = match TcpListener::bind(self.address.as_slice()).await {
            Ok(tcp_listener) => tcp_listener,
            Err(e) => {
                error!(cause = %e, "bind server error");
                return;
            }
        };

        let server = Arc::new(self);
        loop {
            let (tcp_stream, remote_addr) = match tcp_listener.accept().await {
                Ok(stream_and_addr) => stream_and_addr,
                Err(e) => {
                    warn!(cause = %e, "failed to accept");
                    continue;
                }
            };

            let server = Arc::clone(&server);

            tokio::spawn(async move {
                let service = service_fn(move |request| {
                    let server = Arc::clone(&server);
                    async move { server.serve(request).await }
                });

                match http1::Builder::new().serve_connection(TokioIo::new(tcp_stream), service).await {
                    Ok(()) => {
                        debug!(%remote_addr, "finished process, connection shutdown");
                    }
                    Err(e) => {
                        error!(%remote_addr, cause = %e, "service has error, connection shutdown");
                    }
                }
            });
        }
    }
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server")
            .field("router", &self.router)
            .field("address", &self.address)
            .field("middlewares", &self.middlewares.len())
            .finish_non_exhaustive()
    }
}

fn text_response(status: StatusCode, text: &'static str) -> WebResponse {
    let mut resp = WebResponse::new(ResponseBody::empty());
    (status, text).respond_to(&mut resp);
    resp
}

#[cfg(test)]
mod tests {
    use super::{Server, ServerBuildError};
    use crate::handler::{MockRequestHandler, handler_fn};
    use crate::middleware::{Halt, Journal, JournalHandler, Middleware, Recorder};
    use crate::router::{Router, route};
    use crate::{Json, Responder, WebResponse};
    use bytes::Bytes;
    use http::{Method, Request, StatusCode};
    use serde::{Deserialize, Serialize};
    use std::sync::Arc;

    fn server(router: Router) -> Server {
        Server::builder().router(router).address("127.0.0.1:0").build().unwrap()
    }

    fn get(uri: &str) -> Request<Bytes> {
        Request::builder().method(Method::GET).uri(uri).body(Bytes::new()).unwrap()
    }

    fn body(resp: &WebResponse) -> &[u8] {
        resp.body().as_bytes().map_or(&[][..], |bytes| &bytes[..])
    }

    fn recorder(name: &'static str, journal: &Journal) -> Recorder {
        Recorder { name, journal: Arc::clone(journal) }
    }

    #[tokio::test]
    async fn test_route_with_params() {
        let mut router = Router::new();
        router
            .get(
                "/users/:id",
                route(handler_fn(|req, resp| {
                    Box::pin(async move {
                        format!("user {}", req.param("id").unwrap_or_default()).respond_to(resp);
                        Ok(())
                    })
                })),
            )
            .unwrap();

        let resp = server(router).dispatch(get("/users/42?verbose=true")).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body(&resp), b"user 42");
    }

    #[tokio::test]
    async fn test_not_found() {
        let resp = server(Router::new()).dispatch(get("/missing")).await;

        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body(&resp), b"404 Not Found");
    }

    #[tokio::test]
    async fn test_method_not_allowed() {
        let request = Request::builder()
            .method(Method::from_bytes(b"PURGE").unwrap())
            .uri("/cache")
            .body(Bytes::new())
            .unwrap();

        let resp = server(Router::new()).dispatch(request).await;

        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_handler_error_is_internal_server_error() {
        let mut handler = MockRequestHandler::new();
        handler.expect_invoke().times(1).returning(|_req, resp| {
            "partial".respond_to(resp);
            Err("database is down".into())
        });

        let mut router = Router::new();
        router.get("/", route(handler)).unwrap();

        let resp = server(router).dispatch(get("/")).await;

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body(&resp), b"500 Internal Server Error");
    }

    #[tokio::test]
    async fn test_global_middleware_wraps_default_handler() {
        let journal = Journal::default();
        let server = Server::builder()
            .router(Router::new())
            .address("127.0.0.1:0")
            .middleware(recorder("global", &journal))
            .default_handler(JournalHandler { journal: Arc::clone(&journal) })
            .build()
            .unwrap();

        let resp = server.dispatch(get("/missing")).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(*journal.lock().unwrap(), ["global in", "handler", "global out"]);
    }

    #[tokio::test]
    async fn test_global_before_group_middlewares() {
        let journal = Journal::default();
        let group: Arc<dyn Middleware> = Arc::new(recorder("group", &journal));

        let mut router = Router::new();
        router.group("/api", vec![group]).unwrap();
        router.get("/ping", route(JournalHandler { journal: Arc::clone(&journal) })).unwrap();

        let server = Server::builder()
            .router(router)
            .address("127.0.0.1:0")
            .middleware(recorder("first", &journal))
            .middleware(recorder("second", &journal))
            .build()
            .unwrap();

        server.dispatch(get("/api/ping/")).await;

        assert_eq!(
            *journal.lock().unwrap(),
            ["first in", "second in", "group in", "handler", "group out", "second out", "first out"]
        );
    }

    #[tokio::test]
    async fn test_global_short_circuit() {
        let mut handler = MockRequestHandler::new();
        handler.expect_invoke().times(0);

        let mut router = Router::new();
        router.get("/", route(handler)).unwrap();
        let server = Server::builder().router(router).address("127.0.0.1:0").middleware(Halt).build().unwrap();

        let resp = server.dispatch(get("/")).await;

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_json_echo() {
        #[derive(Deserialize, Serialize)]
        struct Greeting {
            name: String,
        }

        let mut router = Router::new();
        router
            .post(
                "/greetings",
                route(handler_fn(|req, resp| {
                    Box::pin(async move {
                        let greeting: Greeting = req.json()?;
                        (StatusCode::CREATED, Json(greeting)).respond_to(resp);
                        Ok(())
                    })
                })),
            )
            .unwrap();
        let server = server(router);

        let request = Request::builder()
            .method(Method::POST)
            .uri("/greetings")
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(Bytes::from_static(br#"{"name":"junction"}"#))
            .unwrap();
        let resp = server.dispatch(request).await;

        assert_eq!(resp.status(), StatusCode::CREATED);
        assert_eq!(body(&resp), br#"{"name":"junction"}"#);

        let request = Request::builder().method(Method::POST).uri("/greetings").body(Bytes::new()).unwrap();
        let resp = server.dispatch(request).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_build_errors() {
        assert!(matches!(Server::builder().address("127.0.0.1:0").build(), Err(ServerBuildError::MissingRouter)));
        assert!(matches!(Server::builder().router(Router::new()).build(), Err(ServerBuildError::MissingAddress)));
        assert!(matches!(
            Server::builder().router(Router::new()).address("not an address").build(),
            Err(ServerBuildError::InvalidAddress { .. })
        ));
    }
}
