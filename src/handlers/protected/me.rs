// handlers/protected/me.rs - the caller's own account

use axum::{
    extract::{Multipart, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::app::AppState;
use crate::auth::{hash_password, verify_password, MIN_PASSWORD_LENGTH};
use crate::database::models::Principal;
use crate::error::ApiError;
use crate::handlers::multipart::FormParts;
use crate::handlers::pagination::{AssetPage, PageQuery};
use crate::middleware::{ApiResponse, ApiResult, AuthorizationContext};

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// GET /me
pub async fn me(ctx: AuthorizationContext) -> ApiResult<Principal> {
    Ok(ApiResponse::success(ctx.principal().clone()))
}

/// GET /me/assets?page=N
pub async fn my_assets(
    State(state): State<AppState>,
    ctx: AuthorizationContext,
    Query(query): Query<PageQuery>,
) -> ApiResult<AssetPage> {
    let limit = state.config.api.page_size;
    let assets = state
        .store
        .list_assets_by_owner(ctx.username(), limit, query.offset(limit))
        .await?;
    let total = state.store.count_assets_by_owner(ctx.username()).await?;

    Ok(ApiResponse::success(AssetPage {
        assets,
        page: query.page(),
        limit,
        total,
    }))
}

/// PUT /me/password
pub async fn change_password(
    State(state): State<AppState>,
    ctx: AuthorizationContext,
    Json(req): Json<ChangePasswordRequest>,
) -> ApiResult<Value> {
    if !verify_password(&ctx.principal().password_hash, &req.current_password) {
        tracing::info!("Password change for '{}' rejected: wrong current password", ctx.username());
        return Err(ApiError::forbidden("current password is incorrect"));
    }
    if req.new_password.chars().count() < MIN_PASSWORD_LENGTH {
        let mut fields = HashMap::new();
        fields.insert(
            "new_password".to_string(),
            format!("must be at least {} characters", MIN_PASSWORD_LENGTH),
        );
        return Err(ApiError::validation_error("Invalid password", Some(fields)));
    }

    let hash = hash_password(&req.new_password)?;
    state.store.update_password(ctx.username(), &hash).await?;
    tracing::info!("User '{}' changed password", ctx.username());

    Ok(ApiResponse::success(json!({ "updated": true })))
}

/// PUT /me/profile-image - multipart `image`
pub async fn set_profile_image(
    State(state): State<AppState>,
    ctx: AuthorizationContext,
    multipart: Multipart,
) -> ApiResult<Value> {
    let upload = FormParts::read(multipart)
        .await?
        .take_files("image")
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::bad_request("Form file 'image' is required"))?;

    let store = state.store.clone();
    let username = ctx.username().to_string();
    let existing = ctx.principal().profile_image.as_deref();

    let reference = state
        .media
        .replace(existing, &upload.file_name, &upload.bytes, move |reference| async move {
            store.update_profile_image(&username, Some(&reference)).await
        })
        .await?;

    tracing::info!("User '{}' replaced profile image", ctx.username());
    Ok(ApiResponse::success(json!({ "profile_image": reference })))
}

/// DELETE /me/profile-image - clear the reference, then the blob
pub async fn clear_profile_image(State(state): State<AppState>, ctx: AuthorizationContext) -> ApiResult<Value> {
    if let Some(old) = ctx.principal().profile_image.as_deref() {
        state.store.update_profile_image(ctx.username(), None).await?;
        state.media.delete(old).await;
    }

    Ok(ApiResponse::success(json!({ "profile_image": Value::Null })))
}
