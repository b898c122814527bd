// handlers/protected/contacts.rs - owner-only contact edits

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::database::models::{Contact, NewContact};
use crate::database::StoreError;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, OwnedAsset};
use crate::services::asset_service::validate_contact;
use crate::services::ContactFields;

#[derive(Debug, Deserialize)]
pub struct UpdateContactRequest {
    pub contact_name: Option<String>,
    pub contact_detail: Option<String>,
}

/// Loads a contact and checks that it hangs off `asset_id`
async fn contact_of(state: &AppState, asset_id: i64, contact_id: i64) -> Result<Contact, ApiError> {
    match state.store.get_contact(contact_id).await {
        Ok(contact) if contact.asset_id == asset_id => Ok(contact),
        Ok(_) | Err(StoreError::NotFound(_)) => Err(ApiError::not_found("contact not found")),
        Err(e) => Err(e.into()),
    }
}

/// POST /assets/:asset_id/contacts - strict single insert
pub async fn add_contact(
    State(state): State<AppState>,
    OwnedAsset(asset_id): OwnedAsset,
    Json(req): Json<ContactFields>,
) -> ApiResult<Contact> {
    validate_contact(&req).map_err(|fields| ApiError::validation_error("Invalid contact", Some(fields)))?;

    let contact = state
        .store
        .insert_contact(NewContact {
            asset_id,
            contact_name: req.contact_name,
            contact_detail: req.contact_detail,
        })
        .await?;
    Ok(ApiResponse::created(contact))
}

/// PUT /assets/:asset_id/contacts/:contact_id
pub async fn update_contact(
    State(state): State<AppState>,
    OwnedAsset(asset_id): OwnedAsset,
    Path((_, contact_id)): Path<(i64, i64)>,
    Json(req): Json<UpdateContactRequest>,
) -> ApiResult<Contact> {
    let current = contact_of(&state, asset_id, contact_id).await?;

    let merged = ContactFields {
        contact_name: req.contact_name.unwrap_or(current.contact_name),
        contact_detail: req.contact_detail.unwrap_or(current.contact_detail),
    };
    validate_contact(&merged).map_err(|fields| ApiError::validation_error("Invalid contact", Some(fields)))?;

    let updated = state
        .store
        .update_contact(contact_id, &merged.contact_name, &merged.contact_detail)
        .await?;
    Ok(ApiResponse::success(updated))
}

/// DELETE /assets/:asset_id/contacts/:contact_id
pub async fn delete_contact(
    State(state): State<AppState>,
    OwnedAsset(asset_id): OwnedAsset,
    Path((_, contact_id)): Path<(i64, i64)>,
) -> ApiResult<Value> {
    contact_of(&state, asset_id, contact_id).await?;
    state.store.delete_contact(contact_id).await?;
    Ok(ApiResponse::success(json!({ "id": contact_id, "deleted": true })))
}
