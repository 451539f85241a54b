// libs/availability-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_database::AppState;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn availability_routes(state: Arc<AppState>) -> Router {
    // All availability operations require authentication
    let protected_routes = Router::new()
        .route(
            "/slots",
            post(handlers::create_availability_slot).get(handlers::list_available_slots),
        )
        .route("/rules", post(handlers::create_recurring_rule))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new().merge(protected_routes).with_state(state)
}
