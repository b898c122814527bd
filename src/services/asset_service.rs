use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::database::models::{Asset, Contact, Image, NewAsset, NewContact};
use crate::database::store::{Store, StoreError};
use crate::services::media::MediaManager;

#[derive(Debug, Error)]
pub enum CreateError {
    #[error("invalid asset fields")]
    Validation(HashMap<String, String>),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetFields {
    pub price: i64,
    pub detail: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactFields {
    #[serde(default)]
    pub contact_name: String,
    #[serde(default)]
    pub contact_detail: String,
}

/// An uploaded file as received from the client
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Field errors keyed by field name; empty means valid
pub fn validate_asset(price: i64, detail: &str) -> Result<(), HashMap<String, String>> {
    let mut errors = HashMap::new();
    if price < 0 {
        errors.insert("price".to_string(), "must be zero or greater".to_string());
    }
    if detail.trim().is_empty() {
        errors.insert("detail".to_string(), "must not be empty".to_string());
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Width of `asset_contacts.contact_name`
pub const MAX_CONTACT_NAME_LENGTH: usize = 255;

pub fn validate_contact(contact: &ContactFields) -> Result<(), HashMap<String, String>> {
    let mut errors = HashMap::new();
    if contact.contact_name.trim().is_empty() {
        errors.insert("contact_name".to_string(), "must not be empty".to_string());
    } else if contact.contact_name.chars().count() > MAX_CONTACT_NAME_LENGTH {
        errors.insert(
            "contact_name".to_string(),
            format!("must be at most {} characters", MAX_CONTACT_NAME_LENGTH),
        );
    }
    if contact.contact_detail.trim().is_empty() {
        errors.insert("contact_detail".to_string(), "must not be empty".to_string());
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StepFailure {
    /// Position of the failed item in the request
    pub index: usize,
    pub reason: String,
}

/// Result of a best-effort loop
#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome<T> {
    pub succeeded: Vec<T>,
    pub failed: Vec<StepFailure>,
}

impl<T> Default for StepOutcome<T> {
    fn default() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }
}

impl<T> StepOutcome<T> {
    fn fail(&mut self, index: usize, reason: impl Into<String>) {
        self.failed.push(StepFailure {
            index,
            reason: reason.into(),
        });
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreationReport {
    pub asset: Asset,
    pub contacts: StepOutcome<Contact>,
    pub images: StepOutcome<Image>,
}

/// Creates an asset together with its contacts and images.
///
/// Only the asset row is authoritative. Contacts and images are attempted
/// one by one; each failure is logged and recorded in the report and the
/// rest carry on.
#[derive(Clone)]
pub struct AssetCreator {
    store: Arc<dyn Store>,
    media: MediaManager,
}

impl AssetCreator {
    pub fn new(store: Arc<dyn Store>, media: MediaManager) -> Self {
        Self { store, media }
    }

    pub async fn create(
        &self,
        owner: &str,
        fields: AssetFields,
        contacts: Vec<ContactFields>,
        images: Vec<ImageUpload>,
    ) -> Result<CreationReport, CreateError> {
        validate_asset(fields.price, &fields.detail).map_err(CreateError::Validation)?;

        let asset = self
            .store
            .insert_asset(NewAsset {
                owner: owner.to_string(),
                price: fields.price,
                detail: fields.detail,
            })
            .await?;
        tracing::info!(asset_id = asset.id, "User '{}' created asset", owner);

        let contacts = self.add_contacts(asset.id, contacts).await;
        let images = self.add_images(asset.id, images).await;

        if !contacts.failed.is_empty() || !images.failed.is_empty() {
            tracing::warn!(
                asset_id = asset.id,
                contacts_failed = contacts.failed.len(),
                images_failed = images.failed.len(),
                "Asset created with dropped sub-resources"
            );
        }

        Ok(CreationReport { asset, contacts, images })
    }

    pub async fn add_contacts(&self, asset_id: i64, contacts: Vec<ContactFields>) -> StepOutcome<Contact> {
        let mut outcome = StepOutcome::default();

        for (index, contact) in contacts.into_iter().enumerate() {
            if let Err(errors) = validate_contact(&contact) {
                let mut fields: Vec<_> = errors.into_keys().collect();
                fields.sort();
                tracing::warn!(asset_id, index, "Skipping contact with invalid {}", fields.join(", "));
                outcome.fail(index, format!("invalid {}", fields.join(", ")));
                continue;
            }

            let new = NewContact {
                asset_id,
                contact_name: contact.contact_name,
                contact_detail: contact.contact_detail,
            };
            match self.store.insert_contact(new).await {
                Ok(row) => outcome.succeeded.push(row),
                Err(e) => {
                    tracing::warn!(asset_id, index, "Contact insert failed: {}", e);
                    outcome.fail(index, "could not be stored");
                }
            }
        }

        outcome
    }

    /// Writes each blob then inserts its row. A row failure after a
    /// successful write leaves the blob behind.
    pub async fn add_images(&self, asset_id: i64, images: Vec<ImageUpload>) -> StepOutcome<Image> {
        let mut outcome = StepOutcome::default();

        for (index, upload) in images.into_iter().enumerate() {
            let reference = match self.media.store(&upload.file_name, &upload.bytes).await {
                Ok(reference) => reference,
                Err(e) => {
                    tracing::warn!(asset_id, index, "Image write failed for '{}': {}", upload.file_name, e);
                    outcome.fail(index, "could not be written");
                    continue;
                }
            };

            match self.store.insert_image(asset_id, &reference).await {
                Ok(row) => outcome.succeeded.push(row),
                Err(e) => {
                    tracing::warn!(asset_id, index, "Image row insert failed, orphaning {}: {}", reference, e);
                    outcome.fail(index, "could not be stored");
                }
            }
        }

        outcome
    }
}
