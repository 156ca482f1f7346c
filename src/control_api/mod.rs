//! Control API: a thin HTTP surface over the scheduler, paper store, and settings.

mod handlers;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::history::TaskHistoryStore;
use crate::scheduler::Scheduler;
use crate::store::{DbPool, PaperStore};

/// Shared state handed to every route handler.
#[derive(Clone)]
pub struct ApiState {
    pub scheduler: Arc<Scheduler>,
    pub store: Arc<dyn PaperStore>,
    pub history: Arc<TaskHistoryStore>,
    /// Pool the global-settings row is read from and upserted into, matching
    /// spec.md §6's "fetched/persisted atomically through the same diesel-async
    /// pool as the Paper Store".
    pub settings_pool: DbPool,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/tasks", post(handlers::register_task).get(handlers::list_tasks))
        .route("/tasks/:task_id/trigger", post(handlers::trigger_task))
        .route("/tasks/:task_id/cancel", post(handlers::cancel_task))
        .route("/runs/:task_id", get(handlers::list_runs))
        .route("/papers", get(handlers::list_papers))
        .route("/papers/search", get(handlers::search_papers))
        .route("/papers/:paper_id/reanalyze", post(handlers::reanalyze_paper))
        .route("/papers/:paper_id/analysis-status", get(handlers::analysis_status))
        .route("/settings", get(handlers::get_settings).put(handlers::put_settings))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
