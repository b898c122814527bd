// handlers/protected/assets.rs - listing create, update and delete

use axum::{
    extract::{Multipart, State},
    Json,
};
use futures::future::join_all;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::database::models::Asset;
use crate::error::ApiError;
use crate::handlers::multipart::FormParts;
use crate::middleware::{ApiResponse, ApiResult, AuthorizationContext, OwnedAsset};
use crate::services::asset_service::validate_asset;
use crate::services::{AssetFields, ContactFields};

/// JSON carried in the `data` part of a create request
#[derive(Debug, Deserialize)]
pub struct CreateAssetData {
    pub asset: AssetFields,
    /// Kept loose so one malformed contact cannot reject the whole listing
    #[serde(default)]
    pub asset_contacts: Vec<Value>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAssetRequest {
    pub price: Option<i64>,
    pub detail: Option<String>,
}

/// POST /assets - multipart `data` JSON plus any number of `images` files
pub async fn create_asset(
    State(state): State<AppState>,
    ctx: AuthorizationContext,
    multipart: Multipart,
) -> ApiResult<Value> {
    let mut form = FormParts::read(multipart).await?;

    let raw = form
        .take_text("data")
        .ok_or_else(|| ApiError::bad_request("Form field 'data' is required"))?;
    let data: CreateAssetData =
        serde_json::from_str(&raw).map_err(|e| ApiError::bad_request(format!("Invalid 'data' field: {}", e)))?;

    // Unreadable entries become empty contacts and fail validation individually
    let contacts: Vec<ContactFields> = data
        .asset_contacts
        .into_iter()
        .map(|value| serde_json::from_value(value).unwrap_or_default())
        .collect();
    let images = form.take_files("images");

    let report = state.assets.create(ctx.username(), data.asset, contacts, images).await?;

    Ok(ApiResponse::created(json!({
        "asset": report.asset,
        "contacts": {
            "stored": report.contacts.succeeded.len(),
            "failed": report.contacts.failed.len(),
        },
        "images": {
            "stored": report.images.succeeded.len(),
            "failed": report.images.failed.len(),
        },
    })))
}

/// PUT /assets/:asset_id - partial update, revalidated as a whole
pub async fn update_asset(
    State(state): State<AppState>,
    OwnedAsset(asset_id): OwnedAsset,
    Json(req): Json<UpdateAssetRequest>,
) -> ApiResult<Asset> {
    let current = state.store.get_asset(asset_id).await?;

    let price = req.price.unwrap_or(current.price);
    let detail = req.detail.unwrap_or(current.detail);
    validate_asset(price, &detail).map_err(|fields| ApiError::validation_error("Invalid asset fields", Some(fields)))?;

    let updated = state.store.update_asset(asset_id, price, &detail).await?;
    tracing::info!(asset_id, "Asset updated");
    Ok(ApiResponse::success(updated))
}

/// DELETE /assets/:asset_id - blobs first (best effort), then the rows
pub async fn delete_asset(State(state): State<AppState>, OwnedAsset(asset_id): OwnedAsset) -> ApiResult<Value> {
    let images = state.store.list_images(asset_id).await?;
    join_all(images.iter().map(|image| state.media.delete(&image.image_url))).await;

    state.store.delete_asset(asset_id).await?;
    tracing::info!(asset_id, images = images.len(), "Asset deleted");

    Ok(ApiResponse::success(json!({ "id": asset_id, "deleted": true })))
}
