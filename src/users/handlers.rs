use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{handlers::is_valid_email, password::hash_password, Actor},
    error::ApiError,
    state::AppState,
    users::{
        dto::{CreateUserRequest, UpdateUserRequest},
        repo::{Role, User, UserStatus},
    },
};

use crate::auth::dto::PublicUser;

/// Accounts created by an admin start with this password; the original system
/// expects it to be changed on first login.
const DEFAULT_PASSWORD: &str = "default123!";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/pending", get(pending_admins))
        .route("/users/:id", put(update_user).delete(delete_user))
        .route("/users/:id/approve", post(approve_user))
        .route("/users/:id/deny", post(deny_user))
}

/// Superadmin sees everyone; an admin only the employees of their own
/// division.
#[instrument(skip(state, actor), fields(actor_id = %actor.id))]
pub async fn list_users(
    State(state): State<AppState>,
    actor: Actor,
) -> Result<Json<Vec<PublicUser>>, ApiError> {
    let users = match actor.role {
        Role::Superadmin => User::list_all(&state.db).await?,
        Role::Admin => {
            let division = actor
                .division
                .as_deref()
                .ok_or_else(|| ApiError::Forbidden("admin has no division assigned".into()))?;
            User::list_division_employees(&state.db, division).await?
        }
        Role::Employee => {
            return Err(ApiError::Forbidden(
                "this action is not permitted for your role".into(),
            ))
        }
    };
    Ok(Json(users.into_iter().map(PublicUser::from).collect()))
}

#[instrument(skip(state, actor, payload), fields(actor_id = %actor.id))]
pub async fn create_user(
    State(state): State<AppState>,
    actor: Actor,
    Json(mut payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<PublicUser>), ApiError> {
    actor.require(&[Role::Superadmin, Role::Admin])?;

    match actor.role {
        Role::Superadmin => {
            // Only superadmin may create admins, and no one creates superadmins.
            if payload.role == Role::Superadmin {
                return Err(ApiError::Validation("role must be admin or employee".into()));
            }
        }
        Role::Admin => {
            // Admins create employees in their own division, nothing else.
            if payload.role != Role::Employee {
                warn!(requested_role = ?payload.role, "admin tried to create non-employee");
                return Err(ApiError::Forbidden("admins may only create employees".into()));
            }
            let division = actor
                .division
                .clone()
                .ok_or_else(|| ApiError::Forbidden("admin has no division assigned".into()))?;
            payload.division = Some(division);
        }
        Role::Employee => unreachable!("gated by require above"),
    }

    payload.email = payload.email.trim().to_lowercase();
    if payload.name.trim().is_empty() {
        return Err(ApiError::Validation("name is required".into()));
    }
    if !is_valid_email(&payload.email) {
        return Err(ApiError::Validation("invalid email".into()));
    }
    if User::find_by_email(&state.db, &payload.email).await?.is_some() {
        return Err(ApiError::Validation("email already registered".into()));
    }

    let hash = hash_password(DEFAULT_PASSWORD)?;
    let user = User::create(
        &state.db,
        payload.name.trim(),
        &payload.email,
        &hash,
        payload.role,
        UserStatus::Active,
        payload.division.as_deref(),
    )
    .await?;

    info!(user_id = %user.id, role = ?user.role, "user created");
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[instrument(skip(state, actor, payload), fields(actor_id = %actor.id))]
pub async fn update_user(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(mut payload): Json<UpdateUserRequest>,
) -> Result<Json<PublicUser>, ApiError> {
    actor.require(&[Role::Superadmin])?;
    validate_update(payload.role, payload.status)?;

    payload.email = payload.email.trim().to_lowercase();
    if payload.name.trim().is_empty() {
        return Err(ApiError::Validation("name is required".into()));
    }
    if !is_valid_email(&payload.email) {
        return Err(ApiError::Validation("invalid email".into()));
    }
    if let Some(other) = User::find_by_email(&state.db, &payload.email).await? {
        if other.id != id {
            return Err(ApiError::Validation("email already registered".into()));
        }
    }

    let user = User::update(
        &state.db,
        id,
        payload.name.trim(),
        &payload.email,
        payload.role,
        payload.status,
        payload.division.as_deref(),
    )
    .await?
    .ok_or(ApiError::NotFound("user"))?;

    info!(user_id = %user.id, "user updated");
    Ok(Json(user.into()))
}

/// Updates may move accounts between admin and employee and toggle
/// active/pending/suspended; superadmin promotion and the denied status stay
/// out of reach of this endpoint (denied is set through the approval queue).
fn validate_update(role: Role, status: UserStatus) -> Result<(), ApiError> {
    if role == Role::Superadmin {
        return Err(ApiError::Validation("role must be admin or employee".into()));
    }
    if status == UserStatus::Denied {
        return Err(ApiError::Validation(
            "status must be active, pending or suspended".into(),
        ));
    }
    Ok(())
}

#[instrument(skip(state, actor), fields(actor_id = %actor.id))]
pub async fn delete_user(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    actor.require(&[Role::Superadmin])?;

    if !User::soft_delete(&state.db, id).await? {
        return Err(ApiError::NotFound("user"));
    }
    info!(user_id = %id, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Approval queue: self-registered admins waiting on the superadmin.
#[instrument(skip(state, actor), fields(actor_id = %actor.id))]
pub async fn pending_admins(
    State(state): State<AppState>,
    actor: Actor,
) -> Result<Json<Vec<PublicUser>>, ApiError> {
    actor.require(&[Role::Superadmin])?;
    let users = User::list_pending_admins(&state.db).await?;
    Ok(Json(users.into_iter().map(PublicUser::from).collect()))
}

#[instrument(skip(state, actor), fields(actor_id = %actor.id))]
pub async fn approve_user(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<PublicUser>, ApiError> {
    actor.require(&[Role::Superadmin])?;
    let user = User::set_status(&state.db, id, UserStatus::Active)
        .await?
        .ok_or(ApiError::NotFound("user"))?;
    info!(user_id = %user.id, "user approved");
    Ok(Json(user.into()))
}

#[instrument(skip(state, actor), fields(actor_id = %actor.id))]
pub async fn deny_user(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<PublicUser>, ApiError> {
    actor.require(&[Role::Superadmin])?;
    let user = User::set_status(&state.db, id, UserStatus::Denied)
        .await?
        .ok_or(ApiError::NotFound("user"))?;
    info!(user_id = %user.id, "user denied");
    Ok(Json(user.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_validation_rejects_superadmin_promotion() {
        let err = validate_update(Role::Superadmin, UserStatus::Active).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn update_validation_rejects_denied_status() {
        let err = validate_update(Role::Employee, UserStatus::Denied).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn update_validation_accepts_admin_and_employee_changes() {
        assert!(validate_update(Role::Admin, UserStatus::Suspended).is_ok());
        assert!(validate_update(Role::Employee, UserStatus::Active).is_ok());
        assert!(validate_update(Role::Admin, UserStatus::Pending).is_ok());
    }
}
