// handlers/public/assets.rs - read-only listing views

use axum::extract::{Path, Query, State};

use crate::app::AppState;
use crate::database::models::{Asset, Contact, Image};
use crate::error::ApiError;
use crate::handlers::pagination::{AssetPage, PageQuery};
use crate::middleware::{ApiResponse, ApiResult};

/// GET /assets?page=N - newest first
pub async fn list_assets(State(state): State<AppState>, Query(query): Query<PageQuery>) -> ApiResult<AssetPage> {
    let limit = state.config.api.page_size;
    let assets = state.store.list_assets(limit, query.offset(limit)).await?;
    let total = state.store.count_assets().await?;

    Ok(ApiResponse::success(AssetPage {
        assets,
        page: query.page(),
        limit,
        total,
    }))
}

/// GET /assets/:asset_id
pub async fn get_asset(State(state): State<AppState>, Path(asset_id): Path<i64>) -> ApiResult<Asset> {
    let asset = state.store.get_asset(asset_id).await?;
    Ok(ApiResponse::success(asset))
}

/// GET /users/:username/assets?page=N
pub async fn list_user_assets(
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> ApiResult<AssetPage> {
    let username = username.trim();
    if username.is_empty() {
        return Err(ApiError::bad_request("username is required"));
    }

    let limit = state.config.api.page_size;
    let assets = state
        .store
        .list_assets_by_owner(username, limit, query.offset(limit))
        .await?;
    let total = state.store.count_assets_by_owner(username).await?;

    Ok(ApiResponse::success(AssetPage {
        assets,
        page: query.page(),
        limit,
        total,
    }))
}

/// GET /assets/:asset_id/contacts
pub async fn list_contacts(State(state): State<AppState>, Path(asset_id): Path<i64>) -> ApiResult<Vec<Contact>> {
    state.store.get_asset(asset_id).await?;
    let contacts = state.store.list_contacts(asset_id).await?;
    Ok(ApiResponse::success(contacts))
}

/// GET /assets/:asset_id/images
pub async fn list_images(State(state): State<AppState>, Path(asset_id): Path<i64>) -> ApiResult<Vec<Image>> {
    state.store.get_asset(asset_id).await?;
    let images = state.store.list_images(asset_id).await?;
    Ok(ApiResponse::success(images))
}
