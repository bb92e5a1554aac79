use junction_web::middleware::DateMiddleware;
use junction_web::router::{Router, route};
use junction_web::{Responder, Server, handler_fn};

#[tokio::main]
async fn main() {
    let mut router = Router::new();
    router
        .get(
            "/",
            route(handler_fn(|_req, resp| {
                Box::pin(async move {
                    "hello world".respond_to(resp);
                    Ok(())
                })
            })),
        )
        .unwrap();

    Server::builder()
        .router(router)
        .address("127.0.0.1:3000")
        .middleware(DateMiddleware)
        .build()
        .unwrap()
        .start()
        .await;
}
