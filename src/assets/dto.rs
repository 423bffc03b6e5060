use serde::Deserialize;

use crate::assets::repo::{AssetStatus, AssetType};

#[derive(Debug, Deserialize)]
pub struct CreateAssetRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: AssetType,
    pub status: AssetStatus,
    pub stock: i32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAssetRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: AssetType,
    pub status: AssetStatus,
    pub stock: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_parses_type_field() {
        let req: CreateAssetRequest = serde_json::from_str(
            r#"{"name":"Meeting Room A","type":"room","status":"available","stock":1}"#,
        )
        .unwrap();
        assert_eq!(req.kind, AssetType::Room);
        assert_eq!(req.status, AssetStatus::Available);
    }

    #[test]
    fn create_request_rejects_unknown_type() {
        let err = serde_json::from_str::<CreateAssetRequest>(
            r#"{"name":"X","type":"boat","status":"available","stock":1}"#,
        );
        assert!(err.is_err());
    }
}
