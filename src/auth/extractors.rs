use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use uuid::Uuid;

use crate::auth::jwt::{JwtKeys, TokenKind};
use crate::error::ApiError;
use crate::state::AppState;
use crate::users::repo::{Role, User, UserStatus};

/// Authenticated actor context: who is calling, with what role, in which
/// division. Passed explicitly into every operation; nothing reads ambient
/// session state.
#[derive(Debug, Clone)]
pub struct Actor {
    pub id: Uuid,
    pub name: String,
    pub role: Role,
    pub division: Option<String>,
}

impl Actor {
    /// Role check; 403 on mismatch.
    pub fn require(&self, roles: &[Role]) -> Result<(), ApiError> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            Err(ApiError::Forbidden(
                "this action is not permitted for your role".into(),
            ))
        }
    }

    pub fn is_admin_level(&self) -> bool {
        matches!(self.role, Role::Superadmin | Role::Admin)
    }
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Actor {
            id: user.id,
            name: user.name.clone(),
            role: user.role,
            division: user.division.clone(),
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Actor {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized("missing Authorization header".into()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .or_else(|| auth_header.strip_prefix("bearer "))
            .ok_or_else(|| ApiError::Unauthorized("invalid auth scheme".into()))?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys
            .verify(token)
            .map_err(|_| ApiError::Unauthorized("invalid or expired token".into()))?;

        if claims.kind != TokenKind::Access {
            return Err(ApiError::Unauthorized("access token required".into()));
        }

        // Role and division come from the live row, not the token, so role
        // changes and suspensions take effect immediately.
        let user = User::find_by_id(&state.db, claims.sub)
            .await?
            .ok_or(ApiError::NotFound("user"))?;

        if user.status != UserStatus::Active {
            return Err(ApiError::Forbidden("account is not active".into()));
        }

        Ok(Actor::from(&user))
    }
}
