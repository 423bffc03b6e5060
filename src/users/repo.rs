use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Superadmin,
    Admin,
    Employee,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Pending,
    Active,
    Denied,
    Suspended,
}

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub status: UserStatus,
    pub division: Option<String>,
    pub created_at: OffsetDateTime,
}

const USER_COLUMNS: &str =
    "id, name, email, password_hash, role, status, division, created_at";

impl User {
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1 AND deleted_at IS NULL",
        ))
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND deleted_at IS NULL",
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn create(
        db: &PgPool,
        name: &str,
        email: &str,
        password_hash: &str,
        role: Role,
        status: UserStatus,
        division: Option<&str>,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (name, email, password_hash, role, status, division)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#,
        ))
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(role)
        .bind(status)
        .bind(division)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    pub async fn update(
        db: &PgPool,
        id: Uuid,
        name: &str,
        email: &str,
        role: Role,
        status: UserStatus,
        division: Option<&str>,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET name = $2, email = $3, role = $4, status = $5, division = $6
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {USER_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(name)
        .bind(email)
        .bind(role)
        .bind(status)
        .bind(division)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn set_status(
        db: &PgPool,
        id: Uuid,
        status: UserStatus,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET status = $2
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {USER_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(status)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn soft_delete(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query(
            "UPDATE users SET deleted_at = now() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(db)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    pub async fn list_all(db: &PgPool) -> anyhow::Result<Vec<User>> {
        let rows = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE deleted_at IS NULL ORDER BY created_at DESC",
        ))
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    /// Employees of one division, the admin-scoped listing.
    pub async fn list_division_employees(
        db: &PgPool,
        division: &str,
    ) -> anyhow::Result<Vec<User>> {
        let rows = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS} FROM users
            WHERE role = 'employee' AND division = $1 AND deleted_at IS NULL
            ORDER BY created_at DESC
            "#,
        ))
        .bind(division)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    /// Superadmin approval queue: self-registered admins awaiting a decision.
    pub async fn list_pending_admins(db: &PgPool) -> anyhow::Result<Vec<User>> {
        let rows = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS} FROM users
            WHERE role = 'admin' AND status = 'pending' AND deleted_at IS NULL
            ORDER BY created_at ASC
            "#,
        ))
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    /// Pending-approval view. The division-scoped form is the admin's list and
    /// covers only employees; the unscoped form is the superadmin's and covers
    /// every pending account.
    pub async fn list_pending(db: &PgPool, division: Option<&str>) -> anyhow::Result<Vec<User>> {
        let rows = match division {
            Some(div) => {
                sqlx::query_as::<_, User>(&format!(
                    r#"
                    SELECT {USER_COLUMNS} FROM users
                    WHERE role = 'employee' AND status = 'pending' AND division = $1
                      AND deleted_at IS NULL
                    ORDER BY created_at ASC
                    "#,
                ))
                .bind(div)
                .fetch_all(db)
                .await?
            }
            None => {
                sqlx::query_as::<_, User>(&format!(
                    r#"
                    SELECT {USER_COLUMNS} FROM users
                    WHERE status = 'pending' AND deleted_at IS NULL
                    ORDER BY created_at ASC
                    "#,
                ))
                .fetch_all(db)
                .await?
            }
        };
        Ok(rows)
    }

    pub async fn count_employees(
        db: &PgPool,
        status: UserStatus,
        division: Option<&str>,
    ) -> anyhow::Result<i64> {
        let count: i64 = match division {
            Some(div) => {
                sqlx::query_scalar(
                    r#"
                    SELECT COUNT(*) FROM users
                    WHERE role = 'employee' AND status = $1 AND division = $2
                      AND deleted_at IS NULL
                    "#,
                )
                .bind(status)
                .bind(div)
                .fetch_one(db)
                .await?
            }
            None => {
                sqlx::query_scalar(
                    r#"
                    SELECT COUNT(*) FROM users
                    WHERE role = 'employee' AND status = $1 AND deleted_at IS NULL
                    "#,
                )
                .bind(status)
                .fetch_one(db)
                .await?
            }
        };
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Superadmin).unwrap(), "\"superadmin\"");
        assert_eq!(serde_json::to_string(&Role::Employee).unwrap(), "\"employee\"");
    }

    #[test]
    fn status_parses_from_lowercase() {
        let s: UserStatus = serde_json::from_str("\"suspended\"").unwrap();
        assert_eq!(s, UserStatus::Suspended);
    }

    #[test]
    fn unknown_role_is_unrepresentable() {
        assert!(serde_json::from_str::<Role>("\"root\"").is_err());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn division_pending_list_contains_only_employees(db: PgPool) {
        // A self-registered admin sharing the division string must not leak
        // into the admin's employee approval list.
        User::create(
            &db,
            "Pending Admin",
            "pending.admin@example.com",
            "hash",
            Role::Admin,
            UserStatus::Pending,
            Some("IT"),
        )
        .await
        .unwrap();
        let employee = User::create(
            &db,
            "Pending Employee",
            "pending.employee@example.com",
            "hash",
            Role::Employee,
            UserStatus::Pending,
            Some("IT"),
        )
        .await
        .unwrap();

        let scoped = User::list_pending(&db, Some("IT")).await.unwrap();
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].id, employee.id);

        // The superadmin queue still sees both pending accounts.
        let unscoped = User::list_pending(&db, None).await.unwrap();
        assert_eq!(unscoped.len(), 2);
    }

    #[test]
    fn password_hash_is_not_serialized() {
        let user = User {
            id: Uuid::new_v4(),
            name: "Test".into(),
            email: "t@example.com".into(),
            password_hash: "secret-hash".into(),
            role: Role::Employee,
            status: UserStatus::Active,
            division: Some("IT".into()),
            created_at: OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret-hash"));
    }
}
