use async_trait::async_trait;
use sqlx::PgPool;

use crate::database::models::{Asset, Contact, Image, NewAsset, NewContact, NewPrincipal, Principal};
use crate::database::store::{Store, StoreError};

const PRINCIPAL_COLUMNS: &str =
    "username, name, email, phone, password, role, profile_image, created_at";

/// PostgreSQL-backed `Store`
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn affected(rows: u64, what: &str, id: impl std::fmt::Display) -> Result<(), StoreError> {
    if rows == 0 {
        return Err(StoreError::NotFound(format!("{} {} not found", what, id)));
    }
    Ok(())
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn create_principal(&self, new: NewPrincipal) -> Result<Principal, StoreError> {
        let sql = format!(
            "INSERT INTO users (username, name, email, phone, password, role)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {}",
            PRINCIPAL_COLUMNS
        );
        let principal = sqlx::query_as::<_, Principal>(&sql)
            .bind(&new.username)
            .bind(&new.name)
            .bind(&new.email)
            .bind(&new.phone)
            .bind(&new.password_hash)
            .bind(new.role.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(principal)
    }

    async fn get_principal(&self, username: &str) -> Result<Principal, StoreError> {
        let sql = format!("SELECT {} FROM users WHERE username = $1", PRINCIPAL_COLUMNS);
        sqlx::query_as::<_, Principal>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("user {} not found", username)))
    }

    async fn list_principals(&self, limit: i64, offset: i64) -> Result<Vec<Principal>, StoreError> {
        let sql = format!(
            "SELECT {} FROM users ORDER BY created_at, username LIMIT $1 OFFSET $2",
            PRINCIPAL_COLUMNS
        );
        let rows = sqlx::query_as::<_, Principal>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn update_password(&self, username: &str, password_hash: &str) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE users SET password = $2 WHERE username = $1")
            .bind(username)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;
        affected(result.rows_affected(), "user", username)
    }

    async fn update_profile_image(&self, username: &str, image: Option<&str>) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE users SET profile_image = $2 WHERE username = $1")
            .bind(username)
            .bind(image)
            .execute(&self.pool)
            .await?;
        affected(result.rows_affected(), "user", username)
    }

    async fn insert_asset(&self, new: NewAsset) -> Result<Asset, StoreError> {
        let asset = sqlx::query_as::<_, Asset>(
            "INSERT INTO assets (owner, price, detail) VALUES ($1, $2, $3)
             RETURNING id, owner, price, detail, created_at",
        )
        .bind(&new.owner)
        .bind(new.price)
        .bind(&new.detail)
        .fetch_one(&self.pool)
        .await?;
        Ok(asset)
    }

    async fn get_asset(&self, id: i64) -> Result<Asset, StoreError> {
        sqlx::query_as::<_, Asset>(
            "SELECT id, owner, price, detail, created_at FROM assets WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("asset {} not found", id)))
    }

    async fn list_assets(&self, limit: i64, offset: i64) -> Result<Vec<Asset>, StoreError> {
        let rows = sqlx::query_as::<_, Asset>(
            "SELECT id, owner, price, detail, created_at FROM assets
             ORDER BY id DESC LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn count_assets(&self) -> Result<i64, StoreError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM assets")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn list_assets_by_owner(&self, owner: &str, limit: i64, offset: i64) -> Result<Vec<Asset>, StoreError> {
        let rows = sqlx::query_as::<_, Asset>(
            "SELECT id, owner, price, detail, created_at FROM assets
             WHERE owner = $1 ORDER BY id DESC LIMIT $2 OFFSET $3",
        )
        .bind(owner)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn count_assets_by_owner(&self, owner: &str) -> Result<i64, StoreError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM assets WHERE owner = $1")
            .bind(owner)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn update_asset(&self, id: i64, price: i64, detail: &str) -> Result<Asset, StoreError> {
        sqlx::query_as::<_, Asset>(
            "UPDATE assets SET price = $2, detail = $3 WHERE id = $1
             RETURNING id, owner, price, detail, created_at",
        )
        .bind(id)
        .bind(price)
        .bind(detail)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("asset {} not found", id)))
    }

    async fn delete_asset(&self, id: i64) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM assets WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        affected(result.rows_affected(), "asset", id)
    }

    async fn insert_contact(&self, new: NewContact) -> Result<Contact, StoreError> {
        let contact = sqlx::query_as::<_, Contact>(
            "INSERT INTO asset_contacts (asset_id, contact_name, contact_detail)
             VALUES ($1, $2, $3)
             RETURNING id, asset_id, contact_name, contact_detail",
        )
        .bind(new.asset_id)
        .bind(&new.contact_name)
        .bind(&new.contact_detail)
        .fetch_one(&self.pool)
        .await?;
        Ok(contact)
    }

    async fn get_contact(&self, id: i64) -> Result<Contact, StoreError> {
        sqlx::query_as::<_, Contact>(
            "SELECT id, asset_id, contact_name, contact_detail FROM asset_contacts WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("contact {} not found", id)))
    }

    async fn list_contacts(&self, asset_id: i64) -> Result<Vec<Contact>, StoreError> {
        let rows = sqlx::query_as::<_, Contact>(
            "SELECT id, asset_id, contact_name, contact_detail FROM asset_contacts
             WHERE asset_id = $1 ORDER BY id",
        )
        .bind(asset_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn update_contact(&self, id: i64, name: &str, detail: &str) -> Result<Contact, StoreError> {
        sqlx::query_as::<_, Contact>(
            "UPDATE asset_contacts SET contact_name = $2, contact_detail = $3 WHERE id = $1
             RETURNING id, asset_id, contact_name, contact_detail",
        )
        .bind(id)
        .bind(name)
        .bind(detail)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("contact {} not found", id)))
    }

    async fn delete_contact(&self, id: i64) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM asset_contacts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        affected(result.rows_affected(), "contact", id)
    }

    async fn insert_image(&self, asset_id: i64, image_url: &str) -> Result<Image, StoreError> {
        let image = sqlx::query_as::<_, Image>(
            "INSERT INTO asset_images (asset_id, image_url) VALUES ($1, $2)
             RETURNING id, asset_id, image_url",
        )
        .bind(asset_id)
        .bind(image_url)
        .fetch_one(&self.pool)
        .await?;
        Ok(image)
    }

    async fn get_image(&self, id: i64) -> Result<Image, StoreError> {
        sqlx::query_as::<_, Image>("SELECT id, asset_id, image_url FROM asset_images WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("image {} not found", id)))
    }

    async fn list_images(&self, asset_id: i64) -> Result<Vec<Image>, StoreError> {
        let rows = sqlx::query_as::<_, Image>(
            "SELECT id, asset_id, image_url FROM asset_images WHERE asset_id = $1 ORDER BY id",
        )
        .bind(asset_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn delete_image(&self, id: i64) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM asset_images WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        affected(result.rows_affected(), "image", id)
    }
}
