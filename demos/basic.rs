//! Minimal trellis example: JSON endpoints, an auth gate and a resolver.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:8080/users/42
//!   curl http://localhost:8080/assets/css/site.css
//!   curl -X POST http://localhost:8080/users \
//!        -H 'content-type: application/json' \
//!        -d '{"name":"alice"}'
//!   curl -X DELETE http://localhost:8080/users/42                 # blocked
//!   curl -X DELETE -H 'x-admin: 1' http://localhost:8080/users/42

use serde::Deserialize;
use tracing_subscriber::EnvFilter;
use trellis::interceptor::{self, Disposition};
use trellis::{
    Config, Json, Metadata, Method, Reply, RequestContext, Response, Router, Server, StatusCode,
    resolver,
};

#[derive(Deserialize)]
struct NewUser {
    name: String,
}

#[tokio::main]
async fn main() -> Result<(), trellis::Error> {
    let config = Config::from_env();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    let app = Router::new()
        .with_config(&config)
        .get("/users/:id", get_user)
        .post("/users", create_user)
        .on_with(Method::DELETE, "/users/:id", delete_user, Metadata::new().with("admin", true))
        .get("/assets/*path", asset)
        .interceptor(interceptor::from_fn(10, |ctx, meta| {
            if meta.get_bool("admin") == Some(true) && ctx.header("x-admin").is_none() {
                return Disposition::Block(Reply::Response(Response::status(StatusCode::FORBIDDEN)));
            }
            Disposition::Continue
        }))
        // every JSON reply goes out wrapped in {"data": ...}
        .resolver(resolver::from_fn(|reply| match reply {
            Reply::Json(v) => {
                let body = serde_json::to_vec(&serde_json::json!({ "data": v }))?;
                Ok(Some(Response::json(body)))
            }
            _ => Ok(None),
        }));

    Server::from_config(&config).serve(app).await
}

// GET /users/:id
async fn get_user(ctx: RequestContext) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "id": ctx.param("id"), "name": "alice" }))
}

// POST /users
async fn create_user(ctx: RequestContext) -> Result<Response, trellis::Error> {
    let Some(user) = ctx.parse_body::<NewUser>()? else {
        return Ok(Response::status(StatusCode::UNSUPPORTED_MEDIA_TYPE));
    };

    let body = serde_json::to_vec(&serde_json::json!({ "id": "99", "name": user.name }))?;
    Ok(Response::builder()
        .status(StatusCode::CREATED)
        .header("location", "/users/99")
        .json(body))
}

// DELETE /users/:id → 204 No Content
async fn delete_user(_ctx: RequestContext) -> StatusCode {
    StatusCode::NO_CONTENT
}

// GET /assets/*path
async fn asset(ctx: RequestContext) -> String {
    format!("asset: {}", ctx.param("path").unwrap_or_default())
}
