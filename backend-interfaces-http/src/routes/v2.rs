use axum::Router;

use backend_application::AppState;

use crate::handlers::{ingest_handlers, ops_handlers, query_handlers};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/v2/ingest/killmails",
            axum::routing::post(ingest_handlers::ingest_killmails),
        )
        .route(
            "/v2/query/kills/recent",
            axum::routing::get(query_handlers::recent_kills),
        )
        .route(
            "/v2/query/kills/:killmail_id",
            axum::routing::get(query_handlers::kill_by_id),
        )
        .route(
            "/v2/ops/health/live",
            axum::routing::get(ops_handlers::health_live),
        )
        .route(
            "/v2/ops/health/ready",
            axum::routing::get(ops_handlers::health_ready),
        )
        .route(
            "/v2/ops/metrics/prometheus",
            axum::routing::get(ops_handlers::metrics_prometheus),
        )
        .route("/v2/ops/tasks", axum::routing::get(ops_handlers::list_tasks))
        .route(
            "/v2/ops/alert-target/check",
            axum::routing::get(ops_handlers::alert_target_check),
        )
        .with_state(state)
}
