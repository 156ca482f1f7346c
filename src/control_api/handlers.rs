//! Route handlers. Each maps a JSON request onto a scheduler/store/history call and
//! back onto a JSON response; no business logic lives here.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use crate::config::GlobalSettings;
use crate::config_version;
use crate::error::Error;
use crate::history::ListFilter;

use super::ApiState;

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            Error::InvalidConfig(_) => StatusCode::BAD_REQUEST,
            Error::Cancelled => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}

pub async fn register_task(
    State(state): State<ApiState>,
    Json(raw): Json<serde_json::Value>,
) -> Result<StatusCode, Error> {
    let config = config_version::upgrade(raw)?;
    state.scheduler.register(config).await?;
    Ok(StatusCode::CREATED)
}

pub async fn list_tasks(State(state): State<ApiState>) -> Result<Json<Vec<String>>, Error> {
    let runs = state.history.list(ListFilter::default()).await?;
    let mut ids: Vec<String> = runs.into_iter().map(|r| r.task_id).collect();
    ids.sort();
    ids.dedup();
    Ok(Json(ids))
}

pub async fn trigger_task(
    State(state): State<ApiState>,
    Path(task_id): Path<String>,
) -> Result<Json<crate::orchestrator::RunSummary>, Error> {
    let summary = state.scheduler.trigger_once(&task_id).await?;
    Ok(Json(summary))
}

pub async fn cancel_task(
    State(state): State<ApiState>,
    Path(task_id): Path<String>,
) -> StatusCode {
    if state.scheduler.cancel(&task_id).await {
        StatusCode::ACCEPTED
    } else {
        StatusCode::NOT_FOUND
    }
}

#[derive(Deserialize)]
pub struct RunsQuery {
    #[serde(default)]
    limit: usize,
}

pub async fn list_runs(
    State(state): State<ApiState>,
    Path(task_id): Path<String>,
    Query(query): Query<RunsQuery>,
) -> Result<Json<Vec<crate::history::TaskRunRecord>>, Error> {
    let limit = if query.limit == 0 { 50 } else { query.limit };
    let runs = state.scheduler.recent_runs(&task_id, limit).await?;
    Ok(Json(runs))
}

#[derive(Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    limit: i64,
    #[serde(default)]
    offset: i64,
}

pub async fn list_papers(
    State(state): State<ApiState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Vec<crate::models::StoredPaper>>, Error> {
    use crate::store::PaperStore;
    let limit = if query.limit == 0 { 50 } else { query.limit };
    let papers = state.store.list(limit, query.offset).await?;
    Ok(Json(papers))
}

#[derive(Deserialize)]
pub struct SearchQuery {
    q: String,
    #[serde(default)]
    limit: i64,
}

pub async fn search_papers(
    State(state): State<ApiState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<crate::models::StoredPaper>>, Error> {
    use crate::store::PaperStore;
    let limit = if query.limit == 0 { 50 } else { query.limit };
    let papers = state.store.search(&query.q, limit).await?;
    Ok(Json(papers))
}

#[derive(Deserialize)]
pub struct ReanalyzeRequest {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    vision_model: Option<String>,
}

pub async fn reanalyze_paper(
    State(state): State<ApiState>,
    Path(paper_id): Path<String>,
    Json(body): Json<ReanalyzeRequest>,
) -> Result<Json<String>, Error> {
    let settings = crate::store::load_global_settings(&state.settings_pool)
        .await?
        .unwrap_or_default();
    let model = body.model.unwrap_or(settings.default_deep_analysis_model);
    let vision_model = body.vision_model.unwrap_or(settings.default_vision_model);

    let markdown = state
        .scheduler
        .analyze_single(&paper_id, &model, &vision_model)
        .await?;
    Ok(Json(markdown))
}

#[derive(serde::Serialize)]
pub struct AnalysisStatusResponse {
    paper_id: String,
    deep_analysis_status: String,
}

pub async fn analysis_status(
    State(state): State<ApiState>,
    Path(paper_id): Path<String>,
) -> Result<Json<AnalysisStatusResponse>, Error> {
    use crate::store::PaperStore;
    let paper = state
        .store
        .get_by_paper_id(&paper_id)
        .await?
        .ok_or_else(|| Error::InvalidConfig(format!("no such paper: {paper_id}")))?;
    Ok(Json(AnalysisStatusResponse {
        paper_id: paper.paper_id,
        deep_analysis_status: paper.deep_analysis_status.as_str().to_string(),
    }))
}

pub async fn get_settings(State(state): State<ApiState>) -> Result<Json<GlobalSettings>, Error> {
    let settings = crate::store::load_global_settings(&state.settings_pool)
        .await?
        .unwrap_or_default();
    Ok(Json(settings))
}

pub async fn put_settings(
    State(state): State<ApiState>,
    Json(new_settings): Json<GlobalSettings>,
) -> Result<StatusCode, Error> {
    crate::store::save_global_settings(&state.settings_pool, &new_settings).await?;
    Ok(StatusCode::NO_CONTENT)
}
