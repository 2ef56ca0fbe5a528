//! Highlights API routes

use axum::{
    extract::Path,
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use sqlx::SqlitePool;

use crate::db::HighlightRepository;
use crate::error::{AppError, Result};
use crate::highlights::Highlight;
use crate::state::AppState;

/// Upper bound on highlights accepted in one request
const MAX_BATCH: usize = 100;

/// Extended state with database pool
#[derive(Clone)]
pub struct HighlightsState {
    pub pool: SqlitePool,
}

/// Create the highlights router
///
/// The first segment is a page hash on page routes and a highlight id on
/// vote routes.
pub fn router(pool: SqlitePool) -> Router<AppState> {
    let state = HighlightsState { pool };

    Router::new()
        .route("/:key", get(list_page_highlights).put(upsert_page_highlights))
        .route("/:key/blacklist", put(blacklist_highlight))
        .route("/:key/upvote", put(upvote_highlight))
        .layer(axum::Extension(state))
}

/// List the canonical highlights of a page
async fn list_page_highlights(
    axum::Extension(state): axum::Extension<HighlightsState>,
    Path(page): Path<u32>,
) -> Result<Json<Vec<Highlight>>> {
    let repo = HighlightRepository::new(&state.pool);
    let highlights = repo.list_for_page(page).await?;
    Ok(Json(highlights))
}

/// Store new highlights for a page and return its canonical list
async fn upsert_page_highlights(
    axum::Extension(state): axum::Extension<HighlightsState>,
    Path(page): Path<u32>,
    Json(batch): Json<Vec<Highlight>>,
) -> Result<Json<Vec<Highlight>>> {
    if batch.len() > MAX_BATCH {
        return Err(AppError::BatchTooLarge {
            received: batch.len(),
            max: MAX_BATCH,
        });
    }
    if let Some(invalid) = batch
        .iter()
        .find(|h| h.start_offset >= h.end_offset || h.text.is_empty() || h.path.is_empty())
    {
        return Err(AppError::InvalidHighlight {
            path: invalid.path.clone(),
            start: invalid.start_offset,
            end: invalid.end_offset,
        });
    }

    let repo = HighlightRepository::new(&state.pool);
    let highlights = repo.upsert_batch(page, &batch, None).await?;
    tracing::debug!(page, received = batch.len(), total = highlights.len(), "Upserted highlights");
    Ok(Json(highlights))
}

/// Count a blacklist vote
async fn blacklist_highlight(
    axum::Extension(state): axum::Extension<HighlightsState>,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    let repo = HighlightRepository::new(&state.pool);
    if repo.blacklist(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::HighlightNotFound(id))
    }
}

/// Count an upvote
async fn upvote_highlight(
    axum::Extension(state): axum::Extension<HighlightsState>,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    let repo = HighlightRepository::new(&state.pool);
    if repo.upvote(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::HighlightNotFound(id))
    }
}
