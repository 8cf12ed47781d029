// rest/mod.rs — REST API server.
//
// Axum HTTP server carrying the wizard API, the public apply link, and the
// operations-dashboard reads.
//
// Endpoints:
//   GET  /api/v1/health
//   GET  /api/v1/apply                                  (public apply link)
//   GET  /api/v1/applications
//   POST /api/v1/applications
//   GET  /api/v1/applications/{id}
//   PUT  /api/v1/applications/{id}                      (edit + rules settle)
//   POST /api/v1/applications/{id}/advance
//   POST /api/v1/applications/{id}/retreat
//   GET  /api/v1/applications/{id}/documents
//   POST /api/v1/applications/{id}/documents            (upload helper)
//   GET  /api/v1/leads          POST /api/v1/leads
//   GET  /api/v1/advisors       POST /api/v1/advisors
//   GET  /api/v1/accounts
//   GET  /api/v1/accounts/{id}/pending-tasks
//   GET  /api/v1/accounts/{id}/registration-tasks
//   GET  /api/v1/proposals      POST /api/v1/proposals

pub mod auth;
pub mod routes;

use anyhow::Result;
use axum::http::HeaderValue;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::AppContext;

pub async fn start_rest_server(ctx: Arc<AppContext>) -> Result<()> {
    let bind = format!("{}:{}", ctx.config.bind_address, ctx.config.port);
    let addr: SocketAddr = bind.parse()?;

    let router = build_router(ctx);

    info!("REST API listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}

pub fn build_router(ctx: Arc<AppContext>) -> Router {
    // Health and the apply link stay reachable without a token — the apply
    // page is public by design.
    let public = Router::new()
        .route("/api/v1/health", get(routes::health::health))
        .route("/api/v1/apply", get(routes::apply::apply_link));

    let private = Router::new()
        .route(
            "/api/v1/applications",
            get(routes::applications::list_applications)
                .post(routes::applications::create_application),
        )
        .route(
            "/api/v1/applications/{id}",
            get(routes::applications::get_application).put(routes::applications::update_application),
        )
        .route(
            "/api/v1/applications/{id}/advance",
            post(routes::applications::advance),
        )
        .route(
            "/api/v1/applications/{id}/retreat",
            post(routes::applications::retreat),
        )
        .route(
            "/api/v1/applications/{id}/documents",
            get(routes::applications::list_documents).post(routes::applications::upload_document),
        )
        .route(
            "/api/v1/leads",
            get(routes::dashboard::list_leads).post(routes::dashboard::create_lead),
        )
        .route(
            "/api/v1/advisors",
            get(routes::dashboard::list_advisors).post(routes::dashboard::upsert_advisor),
        )
        .route("/api/v1/accounts", get(routes::dashboard::list_accounts))
        .route(
            "/api/v1/accounts/{id}/pending-tasks",
            get(routes::dashboard::pending_tasks),
        )
        .route(
            "/api/v1/accounts/{id}/registration-tasks",
            get(routes::dashboard::registration_tasks),
        )
        .route(
            "/api/v1/proposals",
            get(routes::dashboard::list_proposals).post(routes::dashboard::create_proposal),
        )
        .layer(middleware::from_fn_with_state(
            Arc::clone(&ctx),
            auth::require_bearer,
        ));

    let mut router = public.merge(private);

    if let Some(origin) = &ctx.config.apply_origin {
        match origin.parse::<HeaderValue>() {
            Ok(origin) => {
                router = router.layer(
                    CorsLayer::new()
                        .allow_origin(origin)
                        .allow_methods(Any)
                        .allow_headers(Any),
                );
            }
            Err(_) => warn!(origin = %origin, "invalid apply_origin — CORS disabled"),
        }
    }

    router.with_state(ctx)
}
