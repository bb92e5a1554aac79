//! A micro web framework built around two pieces: an ordered route table and a
//! middleware chain.
//!
//! - [`Router`] maps `(method, path)` to a registered route. Literal paths win over
//!   `:param` patterns, and among patterns the first registered wins.
//! - [`middleware::Middleware`] implementations receive the request, the response being
//!   built and a [`middleware::Next`] continuation, and decide whether the chain goes on.
//! - [`Server`] glues them together: it serves HTTP/1.1 with hyper, runs the global
//!   middlewares, then the matched route's middlewares and handler.
//!
//! # Example
//! ```no_run
//! use junction_web::middleware::DateMiddleware;
//! use junction_web::router::{route, Router};
//! use junction_web::{handler_fn, Responder, Server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut router = Router::new();
//!     router
//!         .get("/hello/:name", route(handler_fn(|req, resp| Box::pin(async move {
//!             format!("hello {}", req.param("name").unwrap_or("world")).respond_to(resp);
//!             Ok(())
//!         }))))
//!         .unwrap();
//!
//!     Server::builder()
//!         .router(router)
//!         .address("127.0.0.1:8080")
//!         .middleware(DateMiddleware)
//!         .build()
//!         .unwrap()
//!         .start()
//!         .await;
//! }
//! ```

mod body;
mod handler;
mod request;
mod responder;
mod server;

pub mod middleware;
pub mod router;

pub use body::ResponseBody;
pub use handler::BoxError;
pub use handler::FnHandler;
pub use handler::NotFoundHandler;
pub use handler::RequestHandler;
pub use handler::handler_fn;
pub use request::ExtractError;
pub use request::PathParams;
pub use request::RequestContext;
pub use responder::Json;
pub use responder::Responder;
pub use router::Router;
pub use server::Server;
pub use server::ServerBuildError;
pub use server::ServerBuilder;

/// The response shared by every middleware and the handler of a chain.
pub type WebResponse = http::Response<ResponseBody>;
