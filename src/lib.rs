pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

use crate::services::{
    quiz_set_service::QuizSetService, retry_service::RetryService,
    submission_service::SubmissionService,
};
use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub quiz_set_service: QuizSetService,
    pub submission_service: SubmissionService,
    pub retry_service: RetryService,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        let quiz_set_service = QuizSetService::new(pool.clone());
        let submission_service = SubmissionService::new(pool.clone());
        let retry_service = RetryService::new(pool.clone());

        Self {
            pool,
            quiz_set_service,
            submission_service,
            retry_service,
        }
    }
}
