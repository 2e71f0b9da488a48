pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod listing;
pub mod models;
pub mod reorder;
pub mod reservation;
pub mod state;

use axum::{
    Router,
    extract::State,
    response::Html,
    routing::{get, patch, post, put},
};
use state::AppState;
use tower_http::{services::ServeDir, trace::TraceLayer};

async fn page(app_state: &AppState, file: &str) -> Html<String> {
    tokio::fs::read_to_string(app_state.config.static_dir.join(file))
        .await
        .map(Html)
        .unwrap_or_else(|e| {
            tracing::warn!(file, error = %e, "page not found");
            Html(format!("<h1>Erro: não foi possível carregar {file}</h1>"))
        })
}

async fn index_page(State(app_state): State<AppState>) -> Html<String> {
    page(&app_state, "index.html").await
}

async fn admin_page(State(app_state): State<AppState>) -> Html<String> {
    page(&app_state, "admin.html").await
}

pub fn app(app_state: AppState) -> Router {
    let assets = ServeDir::new(app_state.config.static_dir.join("assets"));

    Router::new()
        .route("/", get(index_page))
        .route("/admin", get(admin_page))
        .nest_service("/assets", assets)
        .route("/api/slots", get(handlers::get_slots))
        .route("/api/config", get(handlers::get_public_configuration))
        .route("/api/visits", post(handlers::register_visit))
        .route("/api/reservations", post(handlers::create_reservation))
        .route("/api/prizes/kill-bonus", get(handlers::kill_bonus))
        .route("/api/admin/login", post(auth::login))
        .route("/api/admin/logout", post(auth::logout))
        .route("/api/admin/session", get(auth::current_session))
        .route(
            "/api/admin/slots",
            get(handlers::admin_list_slots).post(handlers::admin_create_slot),
        )
        .route("/api/admin/slots/move", post(handlers::admin_move_slot))
        .route("/api/admin/slots/order", put(handlers::admin_set_order))
        .route(
            "/api/admin/slots/{id}",
            patch(handlers::admin_update_slot).delete(handlers::admin_delete_slot),
        )
        .route("/api/admin/slots/{id}/toggle", post(handlers::admin_toggle_slot))
        .route(
            "/api/admin/config",
            get(handlers::admin_get_configuration).put(handlers::admin_save_configuration),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
