use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "borrow_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BorrowStatus {
    Pending,
    Approved,
    Rejected,
    Returned,
}

/// A borrow request and its lifecycle fields. Soft-deleted, never removed.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Borrow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub asset_id: Uuid,
    pub unit: Option<String>,
    pub quantity: i32,
    pub status: BorrowStatus,
    pub approved_by: Option<Uuid>,
    pub borrow_date: Option<OffsetDateTime>,
    pub approval_date: Option<OffsetDateTime>,
    pub ended_at: Option<OffsetDateTime>,
    pub notes: Option<String>,
    pub created_at: OffsetDateTime,
}

/// One audit row per lifecycle transition; append-only.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BorrowHistory {
    pub id: Uuid,
    pub borrow_id: Uuid,
    pub changed_by: Uuid,
    pub old_status: Option<BorrowStatus>,
    pub new_status: BorrowStatus,
    pub notes: Option<String>,
    pub changed_at: OffsetDateTime,
}

/// Borrow joined with requester and asset names, for admin lists and
/// dashboards.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct BorrowWithRefs {
    pub id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub asset_id: Uuid,
    pub asset_name: String,
    pub serial_number: String,
    pub unit: Option<String>,
    pub quantity: i32,
    pub status: BorrowStatus,
    pub borrow_date: Option<OffsetDateTime>,
    pub approval_date: Option<OffsetDateTime>,
    pub ended_at: Option<OffsetDateTime>,
    pub notes: Option<String>,
    pub created_at: OffsetDateTime,
}

/// Available asset with the requester's own pending+approved quantities
/// already subtracted. Display figure only; the transactional stock checks
/// are the source of truth.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AvailableAsset {
    pub id: Uuid,
    pub serial_number: String,
    pub name: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: crate::assets::repo::AssetType,
    pub stock: i32,
    pub available_for_user: i64,
}

const BORROW_COLUMNS: &str = "id, user_id, asset_id, unit, quantity, status, approved_by, \
     borrow_date, approval_date, ended_at, notes, created_at";

const REFS_SELECT: &str = r#"
    SELECT b.id, b.user_id, u.name AS user_name, b.asset_id, a.name AS asset_name,
           a.serial_number, b.unit, b.quantity, b.status, b.borrow_date,
           b.approval_date, b.ended_at, b.notes, b.created_at
    FROM borrows b
    JOIN users u ON u.id = b.user_id
    JOIN assets a ON a.id = b.asset_id
    WHERE b.deleted_at IS NULL
"#;

impl Borrow {
    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Borrow>> {
        let borrow = sqlx::query_as::<_, Borrow>(&format!(
            "SELECT {BORROW_COLUMNS} FROM borrows WHERE id = $1 AND deleted_at IS NULL",
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(borrow)
    }

    /// Row-locked fetch; serializes concurrent transitions on one borrow.
    pub async fn lock_by_id(conn: &mut PgConnection, id: Uuid) -> anyhow::Result<Option<Borrow>> {
        let borrow = sqlx::query_as::<_, Borrow>(&format!(
            "SELECT {BORROW_COLUMNS} FROM borrows WHERE id = $1 AND deleted_at IS NULL FOR UPDATE",
        ))
        .bind(id)
        .fetch_optional(conn)
        .await?;
        Ok(borrow)
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn insert(
        conn: &mut PgConnection,
        user_id: Uuid,
        asset_id: Uuid,
        quantity: i32,
        unit: Option<&str>,
        notes: Option<&str>,
        borrow_date: Option<OffsetDateTime>,
        ended_at: Option<OffsetDateTime>,
    ) -> anyhow::Result<Borrow> {
        let borrow = sqlx::query_as::<_, Borrow>(&format!(
            r#"
            INSERT INTO borrows (user_id, asset_id, quantity, unit, notes, borrow_date, ended_at, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'pending')
            RETURNING {BORROW_COLUMNS}
            "#,
        ))
        .bind(user_id)
        .bind(asset_id)
        .bind(quantity)
        .bind(unit)
        .bind(notes)
        .bind(borrow_date)
        .bind(ended_at)
        .fetch_one(conn)
        .await?;
        Ok(borrow)
    }

    pub async fn mark_approved(
        conn: &mut PgConnection,
        id: Uuid,
        approver: Uuid,
    ) -> anyhow::Result<Borrow> {
        let borrow = sqlx::query_as::<_, Borrow>(&format!(
            r#"
            UPDATE borrows
            SET status = 'approved', approved_by = $2, approval_date = now()
            WHERE id = $1
            RETURNING {BORROW_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(approver)
        .fetch_one(conn)
        .await?;
        Ok(borrow)
    }

    pub async fn mark_rejected(
        conn: &mut PgConnection,
        id: Uuid,
        approver: Uuid,
        notes: &str,
    ) -> anyhow::Result<Borrow> {
        let borrow = sqlx::query_as::<_, Borrow>(&format!(
            r#"
            UPDATE borrows
            SET status = 'rejected', approved_by = $2, approval_date = now(), notes = $3
            WHERE id = $1
            RETURNING {BORROW_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(approver)
        .bind(notes)
        .fetch_one(conn)
        .await?;
        Ok(borrow)
    }

    pub async fn mark_returned(conn: &mut PgConnection, id: Uuid) -> anyhow::Result<Borrow> {
        let borrow = sqlx::query_as::<_, Borrow>(&format!(
            r#"
            UPDATE borrows
            SET status = 'returned', ended_at = now()
            WHERE id = $1
            RETURNING {BORROW_COLUMNS}
            "#,
        ))
        .bind(id)
        .fetch_one(conn)
        .await?;
        Ok(borrow)
    }

    pub async fn list_by_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<BorrowWithRefs>> {
        let rows = sqlx::query_as::<_, BorrowWithRefs>(&format!(
            "{REFS_SELECT} AND b.user_id = $1 ORDER BY b.created_at DESC",
        ))
        .bind(user_id)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn list_all(db: &PgPool) -> anyhow::Result<Vec<BorrowWithRefs>> {
        let rows = sqlx::query_as::<_, BorrowWithRefs>(&format!(
            "{REFS_SELECT} ORDER BY b.created_at DESC",
        ))
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn recent(db: &PgPool, limit: i64) -> anyhow::Result<Vec<BorrowWithRefs>> {
        let rows = sqlx::query_as::<_, BorrowWithRefs>(&format!(
            "{REFS_SELECT} ORDER BY b.created_at DESC LIMIT $1",
        ))
        .bind(limit)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn count_user_by_status(
        db: &PgPool,
        user_id: Uuid,
        status: BorrowStatus,
    ) -> anyhow::Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM borrows
            WHERE user_id = $1 AND status = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(user_id)
        .bind(status)
        .fetch_one(db)
        .await?;
        Ok(count)
    }

    pub async fn sum_approved_quantity(db: &PgPool) -> anyhow::Result<i64> {
        let sum: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(quantity), 0) FROM borrows
            WHERE status = 'approved' AND deleted_at IS NULL
            "#,
        )
        .fetch_one(db)
        .await?;
        Ok(sum)
    }
}

impl BorrowHistory {
    pub async fn append(
        conn: &mut PgConnection,
        borrow_id: Uuid,
        changed_by: Uuid,
        old_status: Option<BorrowStatus>,
        new_status: BorrowStatus,
        notes: &str,
    ) -> anyhow::Result<BorrowHistory> {
        let row = sqlx::query_as::<_, BorrowHistory>(
            r#"
            INSERT INTO borrow_histories (borrow_id, changed_by, old_status, new_status, notes)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, borrow_id, changed_by, old_status, new_status, notes, changed_at
            "#,
        )
        .bind(borrow_id)
        .bind(changed_by)
        .bind(old_status)
        .bind(new_status)
        .bind(notes)
        .fetch_one(conn)
        .await?;
        Ok(row)
    }

    pub async fn list_for_borrow(db: &PgPool, borrow_id: Uuid) -> anyhow::Result<Vec<BorrowHistory>> {
        let rows = sqlx::query_as::<_, BorrowHistory>(
            r#"
            SELECT id, borrow_id, changed_by, old_status, new_status, notes, changed_at
            FROM borrow_histories
            WHERE borrow_id = $1
            ORDER BY changed_at ASC
            "#,
        )
        .bind(borrow_id)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }
}

/// Available assets with the caller's own open quantities subtracted.
pub async fn available_for_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<AvailableAsset>> {
    let rows = sqlx::query_as::<_, AvailableAsset>(
        r#"
        SELECT a.id, a.serial_number, a.name, a.type, a.stock,
               a.stock - COALESCE((
                   SELECT SUM(b.quantity) FROM borrows b
                   WHERE b.asset_id = a.id AND b.user_id = $1
                     AND b.status IN ('pending', 'approved')
                     AND b.deleted_at IS NULL
               ), 0) AS available_for_user
        FROM assets a
        WHERE a.status = 'available' AND a.stock > 0
        ORDER BY a.serial_number
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn borrow_status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&BorrowStatus::Pending).unwrap(), "\"pending\"");
        assert_eq!(serde_json::to_string(&BorrowStatus::Returned).unwrap(), "\"returned\"");
    }

    #[test]
    fn unknown_borrow_status_is_unrepresentable() {
        assert!(serde_json::from_str::<BorrowStatus>("\"cancelled\"").is_err());
    }

    #[test]
    fn history_serializes_null_old_status_for_creation_event() {
        let row = BorrowHistory {
            id: Uuid::new_v4(),
            borrow_id: Uuid::new_v4(),
            changed_by: Uuid::new_v4(),
            old_status: None,
            new_status: BorrowStatus::Pending,
            notes: Some("Borrow requested by user".into()),
            changed_at: OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_value(&row).unwrap();
        assert!(json["old_status"].is_null());
        assert_eq!(json["new_status"], "pending");
    }
}
