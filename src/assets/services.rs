use sqlx::PgPool;
use tracing::{info, warn};

use crate::assets::dto::CreateAssetRequest;
use crate::assets::repo::{is_unique_violation, Asset};
use crate::assets::serial;
use crate::error::ApiError;

/// Two concurrent creates with the same prefix can compute the same sequence
/// number; the unique constraint catches that and we re-count and try again.
const SERIAL_ATTEMPTS: i64 = 5;

pub async fn create_asset(db: &PgPool, req: &CreateAssetRequest) -> Result<Asset, ApiError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::Validation("name is required".into()));
    }
    if req.stock < 1 {
        return Err(ApiError::Validation("stock must be at least 1".into()));
    }

    let prefix = serial::derive_prefix(name, req.kind);
    for attempt in 0..SERIAL_ATTEMPTS {
        let count = Asset::count_serial_prefix(db, &prefix).await?;
        let serial_number = serial::format_serial(&prefix, count + 1 + attempt);
        match Asset::insert(db, &serial_number, name, req.kind, req.status, req.stock).await {
            Ok(asset) => {
                info!(asset_id = %asset.id, serial = %asset.serial_number, "asset created");
                return Ok(asset);
            }
            Err(e) if is_unique_violation(&e) => {
                warn!(serial = %serial_number, "serial collision, retrying");
                continue;
            }
            Err(e) => return Err(e.into()),
        }
    }
    Err(ApiError::StateConflict(
        "could not allocate a unique serial number".into(),
    ))
}
