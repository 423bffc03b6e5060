use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::Actor,
    assets::{
        dto::{CreateAssetRequest, UpdateAssetRequest},
        repo::Asset,
        services,
    },
    error::ApiError,
    state::AppState,
    users::repo::Role,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/assets", get(list_assets).post(create_asset))
        .route("/assets/:id", put(update_asset).delete(delete_asset))
}

#[instrument(skip(state, actor), fields(actor_id = %actor.id))]
pub async fn list_assets(
    State(state): State<AppState>,
    actor: Actor,
) -> Result<Json<Vec<Asset>>, ApiError> {
    actor.require(&[Role::Superadmin, Role::Admin])?;
    let assets = Asset::list_all(&state.db).await?;
    Ok(Json(assets))
}

#[instrument(skip(state, actor, payload), fields(actor_id = %actor.id))]
pub async fn create_asset(
    State(state): State<AppState>,
    actor: Actor,
    Json(payload): Json<CreateAssetRequest>,
) -> Result<(StatusCode, Json<Asset>), ApiError> {
    actor.require(&[Role::Superadmin])?;
    let asset = services::create_asset(&state.db, &payload).await?;
    Ok((StatusCode::CREATED, Json(asset)))
}

#[instrument(skip(state, actor, payload), fields(actor_id = %actor.id))]
pub async fn update_asset(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateAssetRequest>,
) -> Result<Json<Asset>, ApiError> {
    actor.require(&[Role::Superadmin])?;

    let name = payload.name.trim();
    if name.is_empty() {
        return Err(ApiError::Validation("name is required".into()));
    }
    if payload.stock < 0 {
        return Err(ApiError::Validation("stock must not be negative".into()));
    }

    let asset = Asset::update(&state.db, id, name, payload.kind, payload.status, payload.stock)
        .await?
        .ok_or(ApiError::NotFound("asset"))?;

    info!(asset_id = %asset.id, "asset updated");
    Ok(Json(asset))
}

/// Permanent removal; historical borrows of this asset cascade away.
#[instrument(skip(state, actor), fields(actor_id = %actor.id))]
pub async fn delete_asset(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    actor.require(&[Role::Superadmin])?;

    if !Asset::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("asset"));
    }
    info!(asset_id = %id, "asset deleted");
    Ok(StatusCode::NO_CONTENT)
}
