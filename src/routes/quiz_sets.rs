use axum::{
    extract::{Path, Query, State},
    Json,
};
use uuid::Uuid;

use crate::config::get_config;
use crate::dto::quiz_set_dto::{
    CreateQuizSetRequest, CreateRetryQuizSetRequest, PagingQuery, QuizSetResponse,
};
use crate::error::Result;
use crate::AppState;

#[axum::debug_handler]
pub async fn create_quiz_set(
    State(state): State<AppState>,
    Json(req): Json<CreateQuizSetRequest>,
) -> Result<Json<QuizSetResponse>> {
    let response = state.quiz_set_service.create_quiz_set(req).await?;
    Ok(Json(response))
}

#[axum::debug_handler]
pub async fn next_quiz_page(
    State(state): State<AppState>,
    Path(set_id): Path<Uuid>,
    Query(paging): Query<PagingQuery>,
) -> Result<Json<QuizSetResponse>> {
    let paging = paging.or_default(get_config().default_page_limit);
    let response = state.quiz_set_service.next_quiz_page(set_id, paging).await?;
    Ok(Json(response))
}

#[axum::debug_handler]
pub async fn create_retry_quiz_set(
    State(state): State<AppState>,
    Path(set_id): Path<Uuid>,
    Json(req): Json<CreateRetryQuizSetRequest>,
) -> Result<Json<QuizSetResponse>> {
    let response = state.retry_service.create_retry_quiz_set(set_id, req).await?;
    Ok(Json(response))
}
