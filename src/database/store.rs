use async_trait::async_trait;
use thiserror::Error;

use crate::database::models::{Asset, Contact, Image, NewAsset, NewContact, NewPrincipal, Principal};

/// Errors surfaced by any `Store` implementation
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Storage error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound("Record not found".to_string()),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Unavailable(err.to_string())
            }
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                StoreError::Conflict(db_err.message().to_string())
            }
            other => StoreError::Backend(other.to_string()),
        }
    }
}

/// Storage collaborator for principals, assets and their dependent rows.
///
/// Every lookup, update or delete that matches no row fails with
/// `StoreError::NotFound`. Individual statements are atomic; no method spans
/// more than one statement.
#[async_trait]
pub trait Store: Send + Sync {
    async fn ping(&self) -> Result<(), StoreError>;

    // Principals
    async fn create_principal(&self, new: NewPrincipal) -> Result<Principal, StoreError>;
    async fn get_principal(&self, username: &str) -> Result<Principal, StoreError>;
    async fn list_principals(&self, limit: i64, offset: i64) -> Result<Vec<Principal>, StoreError>;
    async fn update_password(&self, username: &str, password_hash: &str) -> Result<(), StoreError>;
    async fn update_profile_image(&self, username: &str, image: Option<&str>) -> Result<(), StoreError>;

    // Assets
    async fn insert_asset(&self, new: NewAsset) -> Result<Asset, StoreError>;
    async fn get_asset(&self, id: i64) -> Result<Asset, StoreError>;
    async fn list_assets(&self, limit: i64, offset: i64) -> Result<Vec<Asset>, StoreError>;
    async fn count_assets(&self) -> Result<i64, StoreError>;
    async fn list_assets_by_owner(&self, owner: &str, limit: i64, offset: i64) -> Result<Vec<Asset>, StoreError>;
    async fn count_assets_by_owner(&self, owner: &str) -> Result<i64, StoreError>;
    async fn update_asset(&self, id: i64, price: i64, detail: &str) -> Result<Asset, StoreError>;
    /// Deletes the asset; its contacts and images go with it
    async fn delete_asset(&self, id: i64) -> Result<(), StoreError>;

    // Contacts
    async fn insert_contact(&self, new: NewContact) -> Result<Contact, StoreError>;
    async fn get_contact(&self, id: i64) -> Result<Contact, StoreError>;
    async fn list_contacts(&self, asset_id: i64) -> Result<Vec<Contact>, StoreError>;
    async fn update_contact(&self, id: i64, name: &str, detail: &str) -> Result<Contact, StoreError>;
    async fn delete_contact(&self, id: i64) -> Result<(), StoreError>;

    // Images
    async fn insert_image(&self, asset_id: i64, image_url: &str) -> Result<Image, StoreError>;
    async fn get_image(&self, id: i64) -> Result<Image, StoreError>;
    async fn list_images(&self, asset_id: i64) -> Result<Vec<Image>, StoreError>;
    async fn delete_image(&self, id: i64) -> Result<(), StoreError>;
}
