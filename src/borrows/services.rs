//! Borrow lifecycle engine.
//!
//! States: `pending -> approved -> returned`, or `pending -> rejected`. Every
//! transition runs inside one transaction with row locks on the borrow and
//! asset involved, checks the current status (and stock where relevant),
//! mutates borrow and asset together, and appends exactly one audit row.

use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::assets::repo::{Asset, AssetStatus};
use crate::auth::Actor;
use crate::borrows::dto::CreateBorrowRequest;
use crate::borrows::repo::{Borrow, BorrowHistory, BorrowStatus};
use crate::error::ApiError;

const REJECT_DEFAULT_NOTES: &str = "Rejected by admin";

/// Approve and Reject are only defined out of `pending`.
pub(crate) fn ensure_pending(status: BorrowStatus) -> Result<(), ApiError> {
    if status == BorrowStatus::Pending {
        Ok(())
    } else {
        Err(ApiError::StateConflict(
            "this borrow has already been processed".into(),
        ))
    }
}

/// Return is only defined out of `approved`.
pub(crate) fn ensure_approved(status: BorrowStatus) -> Result<(), ApiError> {
    if status == BorrowStatus::Approved {
        Ok(())
    } else {
        Err(ApiError::StateConflict(
            "this borrow is not approved or has already been returned".into(),
        ))
    }
}

pub(crate) fn ensure_stock(stock: i32, quantity: i32) -> Result<(), ApiError> {
    if stock >= quantity {
        Ok(())
    } else {
        Err(ApiError::InsufficientStock(
            "asset stock is insufficient".into(),
        ))
    }
}

/// Employee submits a borrow request. The asset must be available with enough
/// stock; stock itself is not touched until approval.
pub async fn request(
    db: &PgPool,
    actor: &Actor,
    req: &CreateBorrowRequest,
) -> Result<Borrow, ApiError> {
    if req.quantity < 1 {
        return Err(ApiError::Validation("quantity must be at least 1".into()));
    }

    let mut tx = db.begin().await.map_err(ApiError::Database)?;

    let asset = Asset::lock_by_id(&mut tx, req.asset_id)
        .await?
        .ok_or(ApiError::NotFound("asset"))?;
    if asset.status != AssetStatus::Available {
        return Err(ApiError::InsufficientStock(
            "asset is not available for borrowing".into(),
        ));
    }
    ensure_stock(asset.stock, req.quantity)?;

    let borrow = Borrow::insert(
        &mut tx,
        actor.id,
        asset.id,
        req.quantity,
        req.unit.as_deref(),
        req.notes.as_deref(),
        req.borrow_date,
        req.ended_at,
    )
    .await?;
    BorrowHistory::append(
        &mut tx,
        borrow.id,
        actor.id,
        None,
        BorrowStatus::Pending,
        "Borrow requested by user",
    )
    .await?;

    tx.commit().await.map_err(ApiError::Database)?;
    info!(borrow_id = %borrow.id, user_id = %actor.id, asset_id = %asset.id,
          quantity = borrow.quantity, "borrow requested");
    Ok(borrow)
}

/// Approve a pending borrow: record the approver, decrement stock, append the
/// audit row. Status guard and stock check happen under the row locks, so a
/// concurrent approve of the same borrow hits the guard instead of
/// double-decrementing.
pub async fn approve(db: &PgPool, actor: &Actor, borrow_id: Uuid) -> Result<Borrow, ApiError> {
    let mut tx = db.begin().await.map_err(ApiError::Database)?;

    let borrow = Borrow::lock_by_id(&mut tx, borrow_id)
        .await?
        .ok_or(ApiError::NotFound("borrow"))?;
    ensure_pending(borrow.status)?;

    let asset = Asset::lock_by_id(&mut tx, borrow.asset_id)
        .await?
        .ok_or(ApiError::NotFound("asset"))?;
    ensure_stock(asset.stock, borrow.quantity)?;

    let borrow = Borrow::mark_approved(&mut tx, borrow.id, actor.id).await?;
    Asset::adjust_stock(&mut tx, asset.id, -borrow.quantity).await?;
    BorrowHistory::append(
        &mut tx,
        borrow.id,
        actor.id,
        Some(BorrowStatus::Pending),
        BorrowStatus::Approved,
        "Approved by admin",
    )
    .await?;

    tx.commit().await.map_err(ApiError::Database)?;
    info!(borrow_id = %borrow.id, approver = %actor.id, "borrow approved");
    Ok(borrow)
}

/// Reject a pending borrow. No stock was ever decremented, so none moves.
pub async fn reject(
    db: &PgPool,
    actor: &Actor,
    borrow_id: Uuid,
    reason: Option<&str>,
) -> Result<Borrow, ApiError> {
    let notes = reason
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(REJECT_DEFAULT_NOTES);

    let mut tx = db.begin().await.map_err(ApiError::Database)?;

    let borrow = Borrow::lock_by_id(&mut tx, borrow_id)
        .await?
        .ok_or(ApiError::NotFound("borrow"))?;
    ensure_pending(borrow.status)?;

    let borrow = Borrow::mark_rejected(&mut tx, borrow.id, actor.id, notes).await?;
    BorrowHistory::append(
        &mut tx,
        borrow.id,
        actor.id,
        Some(BorrowStatus::Pending),
        BorrowStatus::Rejected,
        notes,
    )
    .await?;

    tx.commit().await.map_err(ApiError::Database)?;
    info!(borrow_id = %borrow.id, approver = %actor.id, "borrow rejected");
    Ok(borrow)
}

/// Mark an approved borrow returned: stock goes back, `ended_at` is set, the
/// audit row closes the cycle.
pub async fn mark_returned(db: &PgPool, actor: &Actor, borrow_id: Uuid) -> Result<Borrow, ApiError> {
    let mut tx = db.begin().await.map_err(ApiError::Database)?;

    let borrow = Borrow::lock_by_id(&mut tx, borrow_id)
        .await?
        .ok_or(ApiError::NotFound("borrow"))?;
    ensure_approved(borrow.status)?;

    let borrow = Borrow::mark_returned(&mut tx, borrow.id).await?;
    Asset::adjust_stock(&mut tx, borrow.asset_id, borrow.quantity).await?;
    BorrowHistory::append(
        &mut tx,
        borrow.id,
        actor.id,
        Some(BorrowStatus::Approved),
        BorrowStatus::Returned,
        "Asset returned",
    )
    .await?;

    tx.commit().await.map_err(ApiError::Database)?;
    info!(borrow_id = %borrow.id, actor_id = %actor.id, "borrow returned");
    Ok(borrow)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_guard_accepts_only_pending() {
        assert!(ensure_pending(BorrowStatus::Pending).is_ok());
        for status in [
            BorrowStatus::Approved,
            BorrowStatus::Rejected,
            BorrowStatus::Returned,
        ] {
            let err = ensure_pending(status).unwrap_err();
            assert!(matches!(err, ApiError::StateConflict(_)));
        }
    }

    #[test]
    fn approved_guard_accepts_only_approved() {
        assert!(ensure_approved(BorrowStatus::Approved).is_ok());
        for status in [
            BorrowStatus::Pending,
            BorrowStatus::Rejected,
            BorrowStatus::Returned,
        ] {
            let err = ensure_approved(status).unwrap_err();
            assert!(matches!(err, ApiError::StateConflict(_)));
        }
    }

    #[test]
    fn stock_guard_allows_exact_match() {
        // stock may reach zero, never go below
        assert!(ensure_stock(3, 3).is_ok());
        assert!(ensure_stock(5, 3).is_ok());
    }

    #[test]
    fn stock_guard_rejects_shortfall() {
        let err = ensure_stock(2, 3).unwrap_err();
        assert!(matches!(err, ApiError::InsufficientStock(_)));
        assert!(ensure_stock(0, 1).is_err());
    }

    use crate::assets::repo::AssetType;
    use crate::users::repo::{Role, User, UserStatus};

    async fn seed_employee(db: &PgPool) -> Actor {
        let user = User::create(
            db,
            "Employee",
            "employee@example.com",
            "hash",
            Role::Employee,
            UserStatus::Active,
            Some("IT"),
        )
        .await
        .unwrap();
        Actor::from(&user)
    }

    async fn seed_admin(db: &PgPool) -> Actor {
        let user = User::create(
            db,
            "Admin",
            "admin@example.com",
            "hash",
            Role::Admin,
            UserStatus::Active,
            Some("IT"),
        )
        .await
        .unwrap();
        Actor::from(&user)
    }

    async fn seed_asset(db: &PgPool, stock: i32) -> crate::assets::repo::Asset {
        crate::assets::repo::Asset::insert(
            db,
            "Laptop-001",
            "Laptop Dell",
            AssetType::Asset,
            AssetStatus::Available,
            stock,
        )
        .await
        .unwrap()
    }

    fn borrow_request(asset_id: uuid::Uuid, quantity: i32) -> CreateBorrowRequest {
        CreateBorrowRequest {
            asset_id,
            quantity,
            notes: None,
            unit: None,
            borrow_date: None,
            ended_at: None,
        }
    }

    async fn stock_of(db: &PgPool, id: uuid::Uuid) -> i32 {
        crate::assets::repo::Asset::find_by_id(db, id)
            .await
            .unwrap()
            .unwrap()
            .stock
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn request_creates_pending_borrow_with_one_audit_row(db: PgPool) {
        let employee = seed_employee(&db).await;
        let asset = seed_asset(&db, 5).await;

        let borrow = request(&db, &employee, &borrow_request(asset.id, 3))
            .await
            .unwrap();
        assert_eq!(borrow.status, BorrowStatus::Pending);
        assert_eq!(borrow.quantity, 3);
        // Stock is untouched until approval.
        assert_eq!(stock_of(&db, asset.id).await, 5);

        let history = BorrowHistory::list_for_borrow(&db, borrow.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].old_status, None);
        assert_eq!(history[0].new_status, BorrowStatus::Pending);
        assert_eq!(history[0].changed_by, employee.id);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn request_beyond_stock_creates_nothing(db: PgPool) {
        let employee = seed_employee(&db).await;
        let asset = seed_asset(&db, 2).await;

        let err = request(&db, &employee, &borrow_request(asset.id, 3))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InsufficientStock(_)));

        let borrows = Borrow::list_by_user(&db, employee.id).await.unwrap();
        assert!(borrows.is_empty());
        assert_eq!(stock_of(&db, asset.id).await, 2);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn approve_then_return_restores_stock(db: PgPool) {
        let employee = seed_employee(&db).await;
        let admin = seed_admin(&db).await;
        let asset = seed_asset(&db, 5).await;

        let borrow = request(&db, &employee, &borrow_request(asset.id, 3))
            .await
            .unwrap();

        let borrow = approve(&db, &admin, borrow.id).await.unwrap();
        assert_eq!(borrow.status, BorrowStatus::Approved);
        assert_eq!(borrow.approved_by, Some(admin.id));
        assert_eq!(stock_of(&db, asset.id).await, 2);

        let borrow = mark_returned(&db, &admin, borrow.id).await.unwrap();
        assert_eq!(borrow.status, BorrowStatus::Returned);
        assert!(borrow.ended_at.is_some());
        // Back to the pre-approval figure.
        assert_eq!(stock_of(&db, asset.id).await, 5);

        // Exactly one audit row per transition, in order.
        let history = BorrowHistory::list_for_borrow(&db, borrow.id).await.unwrap();
        let transitions: Vec<_> = history
            .iter()
            .map(|h| (h.old_status, h.new_status))
            .collect();
        assert_eq!(
            transitions,
            vec![
                (None, BorrowStatus::Pending),
                (Some(BorrowStatus::Pending), BorrowStatus::Approved),
                (Some(BorrowStatus::Approved), BorrowStatus::Returned),
            ]
        );
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn failed_approve_leaves_stock_and_status_unchanged(db: PgPool) {
        let employee = seed_employee(&db).await;
        let admin = seed_admin(&db).await;
        let asset = seed_asset(&db, 5).await;

        let borrow = request(&db, &employee, &borrow_request(asset.id, 3))
            .await
            .unwrap();

        // Stock shrinks between request and approval.
        crate::assets::repo::Asset::update(
            &db,
            asset.id,
            &asset.name,
            asset.kind,
            asset.status,
            2,
        )
        .await
        .unwrap();

        let err = approve(&db, &admin, borrow.id).await.unwrap_err();
        assert!(matches!(err, ApiError::InsufficientStock(_)));

        assert_eq!(stock_of(&db, asset.id).await, 2);
        let borrow = Borrow::find_by_id(&db, borrow.id).await.unwrap().unwrap();
        assert_eq!(borrow.status, BorrowStatus::Pending);
        // No audit row beyond the creation event.
        let history = BorrowHistory::list_for_borrow(&db, borrow.id).await.unwrap();
        assert_eq!(history.len(), 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn second_approve_conflicts_and_stock_moves_once(db: PgPool) {
        let employee = seed_employee(&db).await;
        let admin = seed_admin(&db).await;
        let asset = seed_asset(&db, 3).await;

        let borrow = request(&db, &employee, &borrow_request(asset.id, 3))
            .await
            .unwrap();
        approve(&db, &admin, borrow.id).await.unwrap();

        let err = approve(&db, &admin, borrow.id).await.unwrap_err();
        assert!(matches!(err, ApiError::StateConflict(_)));

        assert_eq!(stock_of(&db, asset.id).await, 0);
        let history = BorrowHistory::list_for_borrow(&db, borrow.id).await.unwrap();
        assert_eq!(history.len(), 2);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn reject_records_reason_without_stock_change(db: PgPool) {
        let employee = seed_employee(&db).await;
        let admin = seed_admin(&db).await;
        let asset = seed_asset(&db, 5).await;

        let borrow = request(&db, &employee, &borrow_request(asset.id, 2))
            .await
            .unwrap();
        let borrow = reject(&db, &admin, borrow.id, None).await.unwrap();
        assert_eq!(borrow.status, BorrowStatus::Rejected);
        assert_eq!(borrow.notes.as_deref(), Some(REJECT_DEFAULT_NOTES));
        assert_eq!(stock_of(&db, asset.id).await, 5);

        // Returning a rejected borrow is not a defined transition.
        let err = mark_returned(&db, &admin, borrow.id).await.unwrap_err();
        assert!(matches!(err, ApiError::StateConflict(_)));
    }
}
