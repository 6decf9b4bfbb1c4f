mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::GithubAuth;
use crate::db::Database;

/// Shared handler state: the database plus the OAuth client.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub auth: GithubAuth,
}

pub fn create_router(db: Database, auth: GithubAuth) -> Router {
    Router::new()
        // Pages
        .route("/", get(handlers::index))
        .route("/hello", get(handlers::hello))
        .route("/add", get(handlers::add_page))
        .route("/do-add", post(handlers::do_add))
        // Search / autocomplete
        .route("/ranked", get(handlers::ranked))
        .route("/causes", get(handlers::causes))
        .route("/risks", get(handlers::risks))
        .route("/effects", get(handlers::effects))
        .route("/plans", get(handlers::plans))
        // Tasks
        .route("/tasks", get(handlers::tasks))
        .route("/tasks/{id}/postpone", post(handlers::postpone_task))
        .route("/tasks/{id}/done", post(handlers::done_task))
        // Projects
        .route("/projects", get(handlers::list_projects))
        .route("/projects", post(handlers::create_project))
        .route("/projects/{id}/enter", get(handlers::enter_project))
        // Session
        .route("/github-callback", get(handlers::github_callback))
        .route("/logout", get(handlers::logout))
        // Plumbing
        .route("/robots.txt", get(handlers::robots))
        .route("/version", get(handlers::version))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(AppState { db, auth })
}
