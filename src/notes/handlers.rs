use axum::{
    extract::{Path, State},
    routing::{delete, get, post, put},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::extractors::AuthUser,
    error::{ApiError, ApiResponse},
    notes::{
        dto::{CreateNoteRequest, NotesData, UpdateNoteRequest},
        repo::{self, Note},
    },
    state::AppState,
};

pub fn note_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_note))
        .route("/", get(get_notes))
        .route("/:id", put(update_note))
        .route("/:id", delete(delete_note))
}

#[instrument(skip(state, payload))]
pub async fn create_note(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateNoteRequest>,
) -> Result<ApiResponse<Note>, ApiError> {
    if payload.category.trim().is_empty()
        || payload.title.trim().is_empty()
        || payload.text.trim().is_empty()
    {
        return Err(ApiError::Validation("All fields are required".into()));
    }

    if repo::title_taken(&state.db, user_id, &payload.title, None).await? {
        return Err(ApiError::Conflict(
            "A note with this title already exists".into(),
        ));
    }

    // The pre-check above can race another create; the UNIQUE constraint
    // catches that and still surfaces as Conflict.
    let note = repo::create(
        &state.db,
        user_id,
        &payload.category,
        &payload.title,
        &payload.text,
    )
    .await
    .map_err(|e| ApiError::conflict_on_unique(e, "A note with this title already exists"))?;

    info!(note_id = %note.id, user_id = %user_id, "note created");
    Ok(ApiResponse::created("Note created successfully", note))
}

#[instrument(skip(state))]
pub async fn get_notes(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<ApiResponse<NotesData>, ApiError> {
    let notes = repo::list_by_user(&state.db, user_id).await?;
    Ok(ApiResponse::ok(
        "Notes fetched successfully",
        NotesData { notes },
    ))
}

#[instrument(skip(state, payload))]
pub async fn update_note(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateNoteRequest>,
) -> Result<ApiResponse<Note>, ApiError> {
    if payload.category.trim().is_empty()
        || payload.title.trim().is_empty()
        || payload.text.trim().is_empty()
    {
        return Err(ApiError::Validation("All fields are required".into()));
    }

    // A note outside the caller's scope reads as not found; never reveal
    // whether it exists under another owner.
    if repo::find_owned(&state.db, user_id, id).await?.is_none() {
        return Err(ApiError::NotFound(
            "Note not found or not authorized to update".into(),
        ));
    }

    if repo::title_taken(&state.db, user_id, &payload.title, Some(id)).await? {
        return Err(ApiError::Conflict(
            "A note with this title already exists".into(),
        ));
    }

    let note = repo::update(
        &state.db,
        user_id,
        id,
        &payload.category,
        &payload.title,
        &payload.text,
    )
    .await
    .map_err(|e| ApiError::conflict_on_unique(e, "A note with this title already exists"))?
    .ok_or_else(|| ApiError::NotFound("Note not found or not authorized to update".into()))?;

    info!(note_id = %note.id, user_id = %user_id, "note updated");
    Ok(ApiResponse::ok("Note updated successfully", note))
}

#[instrument(skip(state))]
pub async fn delete_note(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<()>, ApiError> {
    if !repo::delete(&state.db, user_id, id).await? {
        return Err(ApiError::NotFound(
            "Note not found or not authorized to delete".into(),
        ));
    }

    info!(note_id = %id, user_id = %user_id, "note deleted");
    Ok(ApiResponse::message("Note deleted successfully"))
}
