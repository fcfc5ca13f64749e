mod ai;
mod audio;
mod auth;
mod collaboration;
mod context;
mod docs;
mod errors;
mod logging;
mod projects;
mod rate_limit;
mod schemas;
mod serialized;
mod ws;

use std::{
    net::{Ipv6Addr, SocketAddr},
    sync::Arc,
};

use axum::{http::HeaderValue, middleware, routing::get, Json};
use chrono::Utc;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracklab_collab::{Collab, Config};

pub use context::ServerContext;
pub use errors::{ServerError, ServerResult};
pub use logging::init_logger;
pub use rate_limit::RateLimiter;

pub type Router = axum::Router<ServerContext>;

/// Starts the tracklab server
pub async fn run_server(config: Config) {
    let addr: SocketAddr = (Ipv6Addr::UNSPECIFIED, config.port).into();

    let collab = Collab::init(&config)
        .await
        .expect("collab system is initialized");

    let context = ServerContext {
        collab: Arc::new(collab),
        config: Arc::new(config.clone()),
        rate_limiter: Arc::new(RateLimiter::default()),
    };

    let cors = CorsLayer::new()
        .allow_origin(
            config
                .frontend_url
                .parse::<HeaderValue>()
                .expect("frontend url is a valid origin"),
        )
        .allow_methods(Any)
        .allow_headers(Any);

    let api_router = Router::new()
        .nest("/auth", auth::router())
        .nest("/projects", projects::router())
        .nest("/ai", ai::router())
        .nest("/audio", audio::router())
        .nest("/collaboration", collaboration::router())
        .merge(ws::router())
        .layer(middleware::from_fn_with_state(
            context.clone(),
            rate_limit::rate_limit,
        ));

    let root_router = Router::new()
        .nest("/api", api_router)
        .route("/health", get(health))
        .route("/api.json", get(docs::docs))
        .layer(cors)
        .with_state(context);

    let listener = TcpListener::bind(&addr).await.expect("listens on address");

    log::info!("Listening on port {}", config.port);

    axum::serve(
        listener,
        root_router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("server runs");
}

/// The health endpoint is intentionally outside the rate limited api router
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now(),
    }))
}
