use async_trait::async_trait;
use http::StatusCode;
use junction_web::middleware::{DateMiddleware, EncodingMiddleware, Middleware, Next, middleware_fn};
use junction_web::router::{Router, route};
use junction_web::{BoxError, Json, RequestContext, Responder, Server, WebResponse, handler_fn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

#[derive(Deserialize, Serialize, Debug)]
pub struct User {
    name: String,
    zip: String,
}

/// Rejects requests without an `x-api-key` header.
struct RequireApiKey;

#[async_trait]
impl Middleware for RequireApiKey {
    async fn handle(&self, req: &mut RequestContext, resp: &mut WebResponse, next: Next<'_>) -> Result<(), BoxError> {
        if req.headers().contains_key("x-api-key") {
            next.run(req, resp).await
        } else {
            (StatusCode::UNAUTHORIZED, "401 Unauthorized").respond_to(resp);
            Ok(())
        }
    }
}

// curl -v http://127.0.0.1:8080/users/42
// curl -v -H 'x-api-key: secret' -H 'Content-Type: application/json' -d '{"name":"hello","zip":"world"}' http://127.0.0.1:8080/api/users
// curl -v -H 'x-api-key: secret' -d 'name=hello&zip=world' http://127.0.0.1:8080/api/users/form
#[tokio::main]
async fn main() {
    let timing = middleware_fn(|req, resp, next| {
        Box::pin(async move {
            let start = Instant::now();
            let path = req.path().to_string();
            next.run(req, resp).await?;
            info!(path = %path, status = %resp.status(), elapsed = ?start.elapsed(), "request finished");
            Ok(())
        })
    });

    let mut router = Router::new();
    router
        .get(
            "/users/:id",
            route(handler_fn(|req, resp| {
                Box::pin(async move {
                    format!("user {}\r\n", req.param("id").unwrap_or_default()).respond_to(resp);
                    Ok(())
                })
            }))
            .metadata(serde_json::json!({ "summary": "show one user" })),
        )
        .unwrap();

    router
        .scope("/api", vec![Arc::new(RequireApiKey) as Arc<dyn Middleware>], |api| {
            api.post(
                "/users",
                route(handler_fn(|req, resp| {
                    Box::pin(async move {
                        let user: User = req.json()?;
                        (StatusCode::CREATED, Json(user)).respond_to(resp);
                        Ok(())
                    })
                })),
            )?;
            api.post(
                "/users/form",
                route(handler_fn(|req, resp| {
                    Box::pin(async move {
                        let user: User = req.form()?;
                        format!("receive user: {user:#?}\r\n").respond_to(resp);
                        Ok(())
                    })
                })),
            )?;
            Ok(())
        })
        .unwrap();

    for route in router.list_routes() {
        println!("{} {} {:?}", route.method(), route.path(), route.metadata());
    }

    Server::builder()
        .router(router)
        .address("127.0.0.1:8080")
        .middleware(timing)
        .middleware(DateMiddleware)
        .middleware(EncodingMiddleware::default())
        .build()
        .unwrap()
        .start()
        .await;
}
