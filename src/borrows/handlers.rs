use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::Actor,
    borrows::{
        dto::{CreateBorrowRequest, RejectRequest},
        repo::{self, AvailableAsset, Borrow, BorrowHistory, BorrowWithRefs},
        services,
    },
    error::ApiError,
    state::AppState,
    users::repo::Role,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/borrows", get(list_borrows).post(create_borrow))
        .route("/borrows/available", get(available_assets))
        .route("/borrows/my", get(my_borrows))
        .route("/borrows/:id/history", get(borrow_history))
        .route("/borrows/:id/approve", post(approve_borrow))
        .route("/borrows/:id/reject", post(reject_borrow))
        .route("/borrows/:id/return", post(return_borrow))
}

/// Assets open for borrowing, with the caller's own open quantities already
/// subtracted as a display figure.
#[instrument(skip(state, actor), fields(actor_id = %actor.id))]
pub async fn available_assets(
    State(state): State<AppState>,
    actor: Actor,
) -> Result<Json<Vec<AvailableAsset>>, ApiError> {
    actor.require(&[Role::Employee])?;
    let assets = repo::available_for_user(&state.db, actor.id).await?;
    Ok(Json(assets))
}

#[instrument(skip(state, actor), fields(actor_id = %actor.id))]
pub async fn my_borrows(
    State(state): State<AppState>,
    actor: Actor,
) -> Result<Json<Vec<BorrowWithRefs>>, ApiError> {
    actor.require(&[Role::Employee])?;
    let borrows = Borrow::list_by_user(&state.db, actor.id).await?;
    Ok(Json(borrows))
}

#[instrument(skip(state, actor), fields(actor_id = %actor.id))]
pub async fn list_borrows(
    State(state): State<AppState>,
    actor: Actor,
) -> Result<Json<Vec<BorrowWithRefs>>, ApiError> {
    actor.require(&[Role::Superadmin, Role::Admin])?;
    let borrows = Borrow::list_all(&state.db).await?;
    Ok(Json(borrows))
}

#[instrument(skip(state, actor, payload), fields(actor_id = %actor.id))]
pub async fn create_borrow(
    State(state): State<AppState>,
    actor: Actor,
    Json(payload): Json<CreateBorrowRequest>,
) -> Result<(StatusCode, Json<Borrow>), ApiError> {
    actor.require(&[Role::Employee])?;
    let borrow = services::request(&state.db, &actor, &payload).await?;
    Ok((StatusCode::CREATED, Json(borrow)))
}

/// Audit trail of one borrow: admins see any, an employee only their own.
#[instrument(skip(state, actor), fields(actor_id = %actor.id))]
pub async fn borrow_history(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<BorrowHistory>>, ApiError> {
    let borrow = Borrow::find_by_id(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("borrow"))?;
    if !actor.is_admin_level() && borrow.user_id != actor.id {
        return Err(ApiError::Forbidden(
            "you may only view your own borrows".into(),
        ));
    }
    let history = BorrowHistory::list_for_borrow(&state.db, id).await?;
    Ok(Json(history))
}

#[instrument(skip(state, actor), fields(actor_id = %actor.id))]
pub async fn approve_borrow(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<Borrow>, ApiError> {
    actor.require(&[Role::Superadmin, Role::Admin])?;
    let borrow = services::approve(&state.db, &actor, id).await?;
    Ok(Json(borrow))
}

#[instrument(skip(state, actor, payload), fields(actor_id = %actor.id))]
pub async fn reject_borrow(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    payload: Option<Json<RejectRequest>>,
) -> Result<Json<Borrow>, ApiError> {
    actor.require(&[Role::Superadmin, Role::Admin])?;
    let notes = payload.as_ref().and_then(|p| p.notes.as_deref());
    let borrow = services::reject(&state.db, &actor, id, notes).await?;
    Ok(Json(borrow))
}

#[instrument(skip(state, actor), fields(actor_id = %actor.id))]
pub async fn return_borrow(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<Borrow>, ApiError> {
    actor.require(&[Role::Superadmin, Role::Admin])?;
    let borrow = services::mark_returned(&state.db, &actor, id).await?;
    Ok(Json(borrow))
}
