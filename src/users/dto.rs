use serde::Deserialize;

use crate::users::repo::{Role, UserStatus};

/// Create payload. Superadmin may set any role/division; admins are forced to
/// employee in their own division by the handler.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub role: Role,
    pub division: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub name: String,
    pub email: String,
    pub role: Role,
    pub status: UserStatus,
    pub division: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_rejects_unknown_role() {
        let err = serde_json::from_str::<CreateUserRequest>(
            r#"{"name":"X","email":"x@example.com","role":"owner"}"#,
        );
        assert!(err.is_err());
    }

    #[test]
    fn create_request_parses_without_division() {
        let req: CreateUserRequest = serde_json::from_str(
            r#"{"name":"X","email":"x@example.com","role":"employee"}"#,
        )
        .unwrap();
        assert_eq!(req.role, Role::Employee);
        assert!(req.division.is_none());
    }
}
