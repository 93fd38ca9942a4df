// routes.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::{
    handler::{
        admin::admin_handler, chat::chat_handler, dispute::dispute_handler,
        escrow::{escrow_handler, payment_webhook},
        payout::payout_handler, project::project_handler,
    },
    middleware::{auth, role_check},
    models::usermodel::UserRole,
    AppState,
};

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "message": "Server is running"
    }))
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    let admin_routes = admin_handler()
        .layer(middleware::from_fn(|req, next| {
            role_check(req, next, vec![UserRole::Admin])
        }))
        .layer(middleware::from_fn(auth));

    let protected_routes = Router::new()
        .merge(project_handler())
        .nest("/escrows", escrow_handler())
        .nest("/disputes", dispute_handler())
        .nest("/payouts", payout_handler())
        .nest("/chat", chat_handler())
        .layer(middleware::from_fn(auth));

    // The gateway calls this without credentials; authenticity comes from the signature.
    let webhook_routes = Router::new().route("/webhooks/payment", post(payment_webhook));

    let api_route = Router::new()
        .merge(webhook_routes)
        .merge(protected_routes)
        .nest("/admin", admin_routes)
        .layer(TraceLayer::new_for_http())
        .layer(Extension(app_state));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_route)
}
