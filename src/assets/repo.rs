use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgConnection, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "asset_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    Asset,
    Room,
    Vehicle,
    Equipment,
}

impl AssetType {
    pub fn as_str(self) -> &'static str {
        match self {
            AssetType::Asset => "asset",
            AssetType::Room => "room",
            AssetType::Vehicle => "vehicle",
            AssetType::Equipment => "equipment",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "asset_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AssetStatus {
    Available,
    Borrowed,
    Maintenance,
    Retired,
}

/// Asset record. `stock` never goes negative; the database CHECK backs up the
/// application-level guards.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Asset {
    pub id: Uuid,
    pub serial_number: String,
    pub name: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: AssetType,
    pub status: AssetStatus,
    pub stock: i32,
    pub created_at: OffsetDateTime,
}

const ASSET_COLUMNS: &str = r#"id, serial_number, name, type, status, stock, created_at"#;

impl Asset {
    pub async fn list_all(db: &PgPool) -> anyhow::Result<Vec<Asset>> {
        let rows = sqlx::query_as::<_, Asset>(&format!(
            "SELECT {ASSET_COLUMNS} FROM assets ORDER BY serial_number",
        ))
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    /// Every asset in one status, zero-stock included. The borrowable listing
    /// below additionally requires stock on hand.
    pub async fn list_by_status(db: &PgPool, status: AssetStatus) -> anyhow::Result<Vec<Asset>> {
        let rows = sqlx::query_as::<_, Asset>(&format!(
            "SELECT {ASSET_COLUMNS} FROM assets WHERE status = $1 ORDER BY serial_number",
        ))
        .bind(status)
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn list_available(db: &PgPool) -> anyhow::Result<Vec<Asset>> {
        let rows = sqlx::query_as::<_, Asset>(&format!(
            r#"
            SELECT {ASSET_COLUMNS} FROM assets
            WHERE status = 'available' AND stock > 0
            ORDER BY serial_number
            "#,
        ))
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Asset>> {
        let asset = sqlx::query_as::<_, Asset>(&format!(
            "SELECT {ASSET_COLUMNS} FROM assets WHERE id = $1",
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(asset)
    }

    /// Row-locked fetch for use inside a lifecycle transaction.
    pub async fn lock_by_id(conn: &mut PgConnection, id: Uuid) -> anyhow::Result<Option<Asset>> {
        let asset = sqlx::query_as::<_, Asset>(&format!(
            "SELECT {ASSET_COLUMNS} FROM assets WHERE id = $1 FOR UPDATE",
        ))
        .bind(id)
        .fetch_optional(conn)
        .await?;
        Ok(asset)
    }

    pub async fn count_serial_prefix(db: &PgPool, prefix: &str) -> anyhow::Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM assets WHERE serial_number LIKE $1")
                .bind(format!("{prefix}-%"))
                .fetch_one(db)
                .await?;
        Ok(count)
    }

    pub async fn insert(
        db: &PgPool,
        serial_number: &str,
        name: &str,
        kind: AssetType,
        status: AssetStatus,
        stock: i32,
    ) -> Result<Asset, sqlx::Error> {
        sqlx::query_as::<_, Asset>(&format!(
            r#"
            INSERT INTO assets (serial_number, name, type, status, stock)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {ASSET_COLUMNS}
            "#,
        ))
        .bind(serial_number)
        .bind(name)
        .bind(kind)
        .bind(status)
        .bind(stock)
        .fetch_one(db)
        .await
    }

    pub async fn update(
        db: &PgPool,
        id: Uuid,
        name: &str,
        kind: AssetType,
        status: AssetStatus,
        stock: i32,
    ) -> anyhow::Result<Option<Asset>> {
        let asset = sqlx::query_as::<_, Asset>(&format!(
            r#"
            UPDATE assets
            SET name = $2, type = $3, status = $4, stock = $5
            WHERE id = $1
            RETURNING {ASSET_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(name)
        .bind(kind)
        .bind(status)
        .bind(stock)
        .fetch_optional(db)
        .await?;
        Ok(asset)
    }

    /// Hard delete; borrows referencing the asset cascade away with it.
    pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query("DELETE FROM assets WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    /// Stock mutation inside a lifecycle transaction. Negative delta on
    /// approval, positive on return.
    pub async fn adjust_stock(
        conn: &mut PgConnection,
        id: Uuid,
        delta: i32,
    ) -> anyhow::Result<()> {
        sqlx::query("UPDATE assets SET stock = stock + $2 WHERE id = $1")
            .bind(id)
            .bind(delta)
            .execute(conn)
            .await?;
        Ok(())
    }

    pub async fn count_by_status(db: &PgPool, status: AssetStatus) -> anyhow::Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM assets WHERE status = $1")
            .bind(status)
            .fetch_one(db)
            .await?;
        Ok(count)
    }
}

pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_type_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&AssetType::Vehicle).unwrap(), "\"vehicle\"");
    }

    #[test]
    fn asset_json_uses_type_key() {
        let asset = Asset {
            id: Uuid::new_v4(),
            serial_number: "Laptop-001".into(),
            name: "Laptop Dell".into(),
            kind: AssetType::Asset,
            status: AssetStatus::Available,
            stock: 5,
            created_at: OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_value(&asset).unwrap();
        assert_eq!(json["type"], "asset");
        assert_eq!(json["status"], "available");
        assert_eq!(json["stock"], 5);
    }

    #[test]
    fn unknown_asset_status_is_unrepresentable() {
        assert!(serde_json::from_str::<AssetStatus>("\"lost\"").is_err());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn zero_stock_asset_listed_by_status_but_not_borrowable(db: PgPool) {
        Asset::insert(&db, "Projector-001", "Projector", AssetType::Asset, AssetStatus::Available, 0)
            .await
            .unwrap();
        Asset::insert(&db, "Laptop-001", "Laptop Dell", AssetType::Asset, AssetStatus::Available, 2)
            .await
            .unwrap();

        let by_status = Asset::list_by_status(&db, AssetStatus::Available).await.unwrap();
        assert_eq!(by_status.len(), 2);

        let borrowable = Asset::list_available(&db).await.unwrap();
        assert_eq!(borrowable.len(), 1);
        assert_eq!(borrowable[0].serial_number, "Laptop-001");
    }
}
