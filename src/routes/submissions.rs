use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::config::get_config;
use crate::dto::quiz_set_dto::PagingQuery;
use crate::dto::submission_dto::{
    CheckAnswerRequest, CheckAnswerResponse, SubmissionHistoryResponse, TotalsResponse,
};
use crate::error::Result;
use crate::AppState;

#[axum::debug_handler]
pub async fn check_answer(
    State(state): State<AppState>,
    Path(set_id): Path<Uuid>,
    Json(req): Json<CheckAnswerRequest>,
) -> Result<Json<CheckAnswerResponse>> {
    let response = state.submission_service.check_answer(set_id, req).await?;
    Ok(Json(response))
}

#[axum::debug_handler]
pub async fn submission_history(
    State(state): State<AppState>,
    Path(set_id): Path<Uuid>,
    Query(paging): Query<PagingQuery>,
) -> Result<Json<SubmissionHistoryResponse>> {
    let paging = paging.or_default(get_config().default_page_limit);
    let response = state
        .submission_service
        .submission_history(set_id, paging)
        .await?;
    Ok(Json(response))
}

#[axum::debug_handler]
pub async fn totals(
    State(state): State<AppState>,
    Path(set_id): Path<Uuid>,
) -> Result<Json<TotalsResponse>> {
    let response = state.submission_service.totals(set_id).await?;
    Ok(Json(response))
}
