use crate::handlers;
use crate::state::AppState;
use axum::{routing::{get, post}, Router};
use tower_http::trace::TraceLayer;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/login", get(handlers::login_page).post(handlers::login))
        .route("/register", get(handlers::register_page).post(handlers::register))
        .route("/logout", post(handlers::logout))
        .route("/dashboard", get(handlers::dashboard))
        .route("/clients", post(handlers::add_client))
        .route("/clients/:id", post(handlers::update_client))
        .route("/clients/:id/edit", get(handlers::edit_client))
        .route("/clients/:id/delete", post(handlers::delete_client))
        .route("/campaign/filter", post(handlers::campaign_filter))
        .route("/campaign/toggle/:id", post(handlers::campaign_toggle))
        .route("/campaign/select-all", post(handlers::campaign_select_all))
        .route("/campaign/send", post(handlers::campaign_send))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
