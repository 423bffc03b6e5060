use serde::Serialize;

use crate::assets::repo::Asset;
use crate::auth::dto::PublicUser;
use crate::borrows::repo::{AvailableAsset, BorrowWithRefs};

/// Full-system view: every user and asset, approval queue, recent activity.
#[derive(Debug, Serialize)]
pub struct SuperadminDashboard {
    pub users: Vec<PublicUser>,
    pub assets: Vec<Asset>,
    pub active_employees: i64,
    pub pending_employees: i64,
    pub available_assets_count: i64,
    pub borrowed_assets_count: i64,
    pub available_assets: Vec<Asset>,
    pub pending_approval_users: Vec<PublicUser>,
    pub recent_borrows: Vec<BorrowWithRefs>,
}

/// Division-scoped view: employee figures cover only the admin's division;
/// assets are shared across divisions.
#[derive(Debug, Serialize)]
pub struct AdminDashboard {
    pub active_employees: i64,
    pub pending_employees: i64,
    pub available_assets_count: i64,
    pub borrowed_quantity: i64,
    pub available_assets: Vec<Asset>,
    pub pending_approval_employees: Vec<PublicUser>,
    pub recent_borrows: Vec<BorrowWithRefs>,
    pub users: Vec<PublicUser>,
    pub assets: Vec<Asset>,
}

/// Personal view: own borrow counts and rows, plus what can still be
/// requested.
#[derive(Debug, Serialize)]
pub struct EmployeeDashboard {
    pub total_approved_borrows: i64,
    pub total_pending_borrows: i64,
    pub total_rejected_borrows: i64,
    pub available_assets: Vec<AvailableAsset>,
    pub my_borrows: Vec<BorrowWithRefs>,
}
