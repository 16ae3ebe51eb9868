use axum::{
    Router,
    body::Body,
    http::{HeaderValue, Method, Request, header},
    middleware,
    middleware::Next,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;

use super::AppState;
use super::handlers::{agents, communication, proposals, stats, tasks};

/// Mounted both at the root and under this prefix.
pub(crate) const DASHBOARD_PREFIX: &str = "/api/v3";

fn build_dashboard_cors(api_port: u16, extra_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = [
        format!("http://127.0.0.1:{}", api_port),
        format!("http://localhost:{}", api_port),
    ]
    .iter()
    .chain(extra_origins.iter())
    .filter_map(|o| o.parse().ok())
    .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(tower_http::cors::Any)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/agents", get(agents::get_agents))
        .route("/agents/reload", post(agents::reload_agents))
        .route("/agents/{agent}/proposals", post(agents::agent_propose))
        .route("/agents/{agent}/collaborate", post(agents::collaborate))
        .route("/agents/{agent}/feedback", post(agents::give_feedback))
        .route("/agents/{agent}/think", post(agents::think))
        .route(
            "/proposals",
            get(proposals::get_proposals).post(proposals::create_proposal),
        )
        .route("/proposals/approve", post(proposals::approve_proposal))
        .route("/proposals/seed", post(proposals::seed_proposals))
        .route("/tasks", get(tasks::get_tasks))
        .route("/tasks/complete", post(tasks::complete_task))
        .route("/communication", get(communication::get_communication))
        .route("/stats", get(stats::get_stats))
}

pub fn build_api_router(state: AppState) -> Router {
    Router::new()
        .merge(api_routes())
        .nest(DASHBOARD_PREFIX, api_routes())
        .layer(middleware::from_fn(security_headers))
        .layer(build_dashboard_cors(
            state.api_port,
            &state.dashboard_origins,
        ))
        .with_state(state)
}

async fn security_headers(req: Request<Body>, next: Next) -> axum::response::Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-store"),
    );
    response
}
