use axum::{
    routing::{get, post},
    Router,
};
use assessment_backend::{
    config::{get_config, init_config},
    database::pool::create_pool,
    routes, AppState,
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    init_config()?;
    let config = get_config();

    let pool = create_pool().await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let app_state = AppState::new(pool);

    let app = Router::new()
        .route("/health", get(routes::health::health))
        .route("/api/quiz-sets", post(routes::quiz_sets::create_quiz_set))
        .route(
            "/api/quiz-sets/:set_id/quizzes",
            get(routes::quiz_sets::next_quiz_page),
        )
        .route(
            "/api/quiz-sets/:set_id/retry",
            post(routes::quiz_sets::create_retry_quiz_set),
        )
        .route(
            "/api/quiz-sets/:set_id/check-answer",
            post(routes::submissions::check_answer),
        )
        .route(
            "/api/quiz-sets/:set_id/submission-history",
            get(routes::submissions::submission_history),
        )
        .route(
            "/api/quiz-sets/:set_id/totals",
            get(routes::submissions::totals),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    let listener = TcpListener::bind(&config.server_address).await?;
    info!("listening on {}", config.server_address);
    axum::serve(listener, app).await?;

    Ok(())
}
