use axum::{
    extract::State,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tracing::instrument;

use crate::{
    assets::repo::{Asset, AssetStatus},
    auth::{dto::PublicUser, Actor},
    borrows::repo::{self, Borrow, BorrowStatus},
    dashboard::dto::{AdminDashboard, EmployeeDashboard, SuperadminDashboard},
    error::ApiError,
    state::AppState,
    users::repo::{Role, User, UserStatus},
};

const RECENT_BORROWS: i64 = 10;

pub fn routes() -> Router<AppState> {
    Router::new().route("/dashboard", get(dashboard))
}

/// One endpoint, three shapes: the payload is assembled per the caller's role.
#[instrument(skip(state, actor), fields(actor_id = %actor.id, role = ?actor.role))]
pub async fn dashboard(
    State(state): State<AppState>,
    actor: Actor,
) -> Result<Response, ApiError> {
    match actor.role {
        Role::Superadmin => Ok(Json(superadmin_dashboard(&state).await?).into_response()),
        Role::Admin => Ok(Json(admin_dashboard(&state, &actor).await?).into_response()),
        Role::Employee => Ok(Json(employee_dashboard(&state, &actor).await?).into_response()),
    }
}

async fn superadmin_dashboard(state: &AppState) -> Result<SuperadminDashboard, ApiError> {
    let db = &state.db;
    Ok(SuperadminDashboard {
        users: User::list_all(db)
            .await?
            .into_iter()
            .map(PublicUser::from)
            .collect(),
        assets: Asset::list_all(db).await?,
        active_employees: User::count_employees(db, UserStatus::Active, None).await?,
        pending_employees: User::count_employees(db, UserStatus::Pending, None).await?,
        available_assets_count: Asset::count_by_status(db, AssetStatus::Available).await?,
        borrowed_assets_count: Asset::count_by_status(db, AssetStatus::Borrowed).await?,
        // The full-system view keeps zero-stock assets visible.
        available_assets: Asset::list_by_status(db, AssetStatus::Available).await?,
        pending_approval_users: User::list_pending(db, None)
            .await?
            .into_iter()
            .map(PublicUser::from)
            .collect(),
        recent_borrows: Borrow::recent(db, RECENT_BORROWS).await?,
    })
}

async fn admin_dashboard(state: &AppState, actor: &Actor) -> Result<AdminDashboard, ApiError> {
    let db = &state.db;
    let division = actor
        .division
        .as_deref()
        .ok_or_else(|| ApiError::Forbidden("admin has no division assigned".into()))?;

    Ok(AdminDashboard {
        active_employees: User::count_employees(db, UserStatus::Active, Some(division)).await?,
        pending_employees: User::count_employees(db, UserStatus::Pending, Some(division)).await?,
        available_assets_count: Asset::count_by_status(db, AssetStatus::Available).await?,
        borrowed_quantity: Borrow::sum_approved_quantity(db).await?,
        available_assets: Asset::list_available(db).await?,
        pending_approval_employees: User::list_pending(db, Some(division))
            .await?
            .into_iter()
            .map(PublicUser::from)
            .collect(),
        recent_borrows: Borrow::recent(db, RECENT_BORROWS).await?,
        users: User::list_division_employees(db, division)
            .await?
            .into_iter()
            .map(PublicUser::from)
            .collect(),
        assets: Asset::list_all(db).await?,
    })
}

async fn employee_dashboard(
    state: &AppState,
    actor: &Actor,
) -> Result<EmployeeDashboard, ApiError> {
    let db = &state.db;
    Ok(EmployeeDashboard {
        total_approved_borrows: Borrow::count_user_by_status(db, actor.id, BorrowStatus::Approved)
            .await?,
        total_pending_borrows: Borrow::count_user_by_status(db, actor.id, BorrowStatus::Pending)
            .await?,
        total_rejected_borrows: Borrow::count_user_by_status(db, actor.id, BorrowStatus::Rejected)
            .await?,
        available_assets: repo::available_for_user(db, actor.id).await?,
        my_borrows: Borrow::list_by_user(db, actor.id).await?,
    })
}
