// handlers/protected/images.rs - owner-only image uploads and removal

use axum::extract::{Multipart, Path, State};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::database::StoreError;
use crate::error::ApiError;
use crate::handlers::multipart::FormParts;
use crate::middleware::{ApiResponse, ApiResult, OwnedAsset};

/// POST /assets/:asset_id/images - best effort, like listing creation
pub async fn add_images(
    State(state): State<AppState>,
    OwnedAsset(asset_id): OwnedAsset,
    multipart: Multipart,
) -> ApiResult<Value> {
    let uploads = FormParts::read(multipart).await?.take_files("images");
    if uploads.is_empty() {
        return Err(ApiError::bad_request("At least one 'images' file is required"));
    }

    let outcome = state.assets.add_images(asset_id, uploads).await;
    Ok(ApiResponse::created(json!({
        "images": outcome.succeeded,
        "failed": outcome.failed.len(),
    })))
}

/// DELETE /assets/:asset_id/images/:image_id - blob (best effort) then row
pub async fn delete_image(
    State(state): State<AppState>,
    OwnedAsset(asset_id): OwnedAsset,
    Path((_, image_id)): Path<(i64, i64)>,
) -> ApiResult<Value> {
    let image = match state.store.get_image(image_id).await {
        Ok(image) if image.asset_id == asset_id => image,
        Ok(_) | Err(StoreError::NotFound(_)) => return Err(ApiError::not_found("image not found")),
        Err(e) => return Err(e.into()),
    };

    state.media.delete(&image.image_url).await;
    state.store.delete_image(image_id).await?;

    Ok(ApiResponse::success(json!({ "id": image_id, "deleted": true })))
}
