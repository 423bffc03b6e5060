use serde::Deserialize;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CreateBorrowRequest {
    pub asset_id: Uuid,
    pub quantity: i32,
    pub notes: Option<String>,
    /// Requesting department, free text.
    pub unit: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub borrow_date: Option<OffsetDateTime>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub ended_at: Option<OffsetDateTime>,
}

#[derive(Debug, Deserialize, Default)]
pub struct RejectRequest {
    pub notes: Option<String>,
}
