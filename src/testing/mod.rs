//! In-memory collaborators for tests: a `Store` with per-operation fault
//! injection and a `BlobStore` wrapper that fails selected writes.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashSet};
use std::io;
use tokio::sync::RwLock;

use crate::database::models::{Asset, Contact, Image, NewAsset, NewContact, NewPrincipal, Principal, Role};
use crate::database::store::{Store, StoreError};
use crate::services::media::BlobStore;

/// Store operations that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    Ping,
    CreatePrincipal,
    GetPrincipal,
    ListPrincipals,
    UpdatePassword,
    UpdateProfileImage,
    InsertAsset,
    GetAsset,
    ListAssets,
    UpdateAsset,
    DeleteAsset,
    InsertContact,
    GetContact,
    ListContacts,
    UpdateContact,
    DeleteContact,
    InsertImage,
    GetImage,
    ListImages,
    DeleteImage,
}

#[derive(Default)]
struct Tables {
    principals: Vec<Principal>,
    assets: BTreeMap<i64, Asset>,
    contacts: BTreeMap<i64, Contact>,
    images: BTreeMap<i64, Image>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn principal_mut(&mut self, username: &str) -> Result<&mut Principal, StoreError> {
        self.principals
            .iter_mut()
            .find(|p| p.username == username)
            .ok_or_else(|| not_found("user", username))
    }

    fn require_asset(&self, asset_id: i64) -> Result<(), StoreError> {
        if self.assets.contains_key(&asset_id) {
            Ok(())
        } else {
            Err(StoreError::Backend(format!("foreign key violation: asset {}", asset_id)))
        }
    }
}

fn not_found(what: &str, id: impl std::fmt::Display) -> StoreError {
    StoreError::NotFound(format!("{} {} not found", what, id))
}

fn page<T: Clone>(items: impl Iterator<Item = T>, limit: i64, offset: i64) -> Vec<T> {
    items
        .skip(offset.max(0) as usize)
        .take(limit.max(0) as usize)
        .collect()
}

/// `Store` kept in memory, with the same not-found, conflict and cascade
/// behavior as the Postgres store
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    failing: RwLock<HashSet<StoreOp>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every later call of `op` fails with `StoreError::Backend`
    pub async fn fail(&self, op: StoreOp) {
        self.failing.write().await.insert(op);
    }

    pub async fn recover(&self, op: StoreOp) {
        self.failing.write().await.remove(&op);
    }

    async fn check(&self, op: StoreOp) -> Result<(), StoreError> {
        if self.failing.read().await.contains(&op) {
            return Err(StoreError::Backend(format!("injected failure in {:?}", op)));
        }
        Ok(())
    }

    /// Inserts a principal with an unusable password hash
    pub async fn seed_user(&self, username: &str, role: Role) -> Principal {
        let principal = Principal {
            username: username.to_string(),
            name: username.to_string(),
            email: format!("{}@example.com", username),
            phone: "555-0100".to_string(),
            password_hash: "!".to_string(),
            role,
            profile_image: None,
            created_at: Utc::now(),
        };
        self.tables.write().await.principals.push(principal.clone());
        principal
    }

    pub async fn asset_total(&self) -> usize {
        self.tables.read().await.assets.len()
    }

    pub async fn contact_total(&self) -> usize {
        self.tables.read().await.contacts.len()
    }

    pub async fn image_total(&self) -> usize {
        self.tables.read().await.images.len()
    }

    pub async fn contact_count(&self, asset_id: i64) -> usize {
        self.tables.read().await.contacts.values().filter(|c| c.asset_id == asset_id).count()
    }

    pub async fn image_count(&self, asset_id: i64) -> usize {
        self.tables.read().await.images.values().filter(|i| i.asset_id == asset_id).count()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.check(StoreOp::Ping).await
    }

    async fn create_principal(&self, new: NewPrincipal) -> Result<Principal, StoreError> {
        self.check(StoreOp::CreatePrincipal).await?;
        let mut tables = self.tables.write().await;
        if tables
            .principals
            .iter()
            .any(|p| p.username == new.username || p.email == new.email)
        {
            return Err(StoreError::Conflict("username or email taken".to_string()));
        }

        let principal = Principal {
            username: new.username,
            name: new.name,
            email: new.email,
            phone: new.phone,
            password_hash: new.password_hash,
            role: new.role,
            profile_image: None,
            created_at: Utc::now(),
        };
        tables.principals.push(principal.clone());
        Ok(principal)
    }

    async fn get_principal(&self, username: &str) -> Result<Principal, StoreError> {
        self.check(StoreOp::GetPrincipal).await?;
        let tables = self.tables.read().await;
        tables
            .principals
            .iter()
            .find(|p| p.username == username)
            .cloned()
            .ok_or_else(|| not_found("user", username))
    }

    async fn list_principals(&self, limit: i64, offset: i64) -> Result<Vec<Principal>, StoreError> {
        self.check(StoreOp::ListPrincipals).await?;
        let tables = self.tables.read().await;
        Ok(page(tables.principals.iter().cloned(), limit, offset))
    }

    async fn update_password(&self, username: &str, password_hash: &str) -> Result<(), StoreError> {
        self.check(StoreOp::UpdatePassword).await?;
        let mut tables = self.tables.write().await;
        tables.principal_mut(username)?.password_hash = password_hash.to_string();
        Ok(())
    }

    async fn update_profile_image(&self, username: &str, image: Option<&str>) -> Result<(), StoreError> {
        self.check(StoreOp::UpdateProfileImage).await?;
        let mut tables = self.tables.write().await;
        tables.principal_mut(username)?.profile_image = image.map(str::to_string);
        Ok(())
    }

    async fn insert_asset(&self, new: NewAsset) -> Result<Asset, StoreError> {
        self.check(StoreOp::InsertAsset).await?;
        let mut tables = self.tables.write().await;
        let id = tables.next_id();
        let asset = Asset {
            id,
            owner: new.owner,
            price: new.price,
            detail: new.detail,
            created_at: Utc::now(),
        };
        tables.assets.insert(id, asset.clone());
        Ok(asset)
    }

    async fn get_asset(&self, id: i64) -> Result<Asset, StoreError> {
        self.check(StoreOp::GetAsset).await?;
        let tables = self.tables.read().await;
        tables.assets.get(&id).cloned().ok_or_else(|| not_found("asset", id))
    }

    async fn list_assets(&self, limit: i64, offset: i64) -> Result<Vec<Asset>, StoreError> {
        self.check(StoreOp::ListAssets).await?;
        let tables = self.tables.read().await;
        Ok(page(tables.assets.values().rev().cloned(), limit, offset))
    }

    async fn count_assets(&self) -> Result<i64, StoreError> {
        self.check(StoreOp::ListAssets).await?;
        Ok(self.tables.read().await.assets.len() as i64)
    }

    async fn list_assets_by_owner(&self, owner: &str, limit: i64, offset: i64) -> Result<Vec<Asset>, StoreError> {
        self.check(StoreOp::ListAssets).await?;
        let tables = self.tables.read().await;
        let owned = tables.assets.values().rev().filter(|a| a.owner == owner).cloned();
        Ok(page(owned, limit, offset))
    }

    async fn count_assets_by_owner(&self, owner: &str) -> Result<i64, StoreError> {
        self.check(StoreOp::ListAssets).await?;
        let tables = self.tables.read().await;
        Ok(tables.assets.values().filter(|a| a.owner == owner).count() as i64)
    }

    async fn update_asset(&self, id: i64, price: i64, detail: &str) -> Result<Asset, StoreError> {
        self.check(StoreOp::UpdateAsset).await?;
        let mut tables = self.tables.write().await;
        let asset = tables.assets.get_mut(&id).ok_or_else(|| not_found("asset", id))?;
        asset.price = price;
        asset.detail = detail.to_string();
        Ok(asset.clone())
    }

    async fn delete_asset(&self, id: i64) -> Result<(), StoreError> {
        self.check(StoreOp::DeleteAsset).await?;
        let mut tables = self.tables.write().await;
        tables.assets.remove(&id).ok_or_else(|| not_found("asset", id))?;
        tables.contacts.retain(|_, c| c.asset_id != id);
        tables.images.retain(|_, i| i.asset_id != id);
        Ok(())
    }

    async fn insert_contact(&self, new: NewContact) -> Result<Contact, StoreError> {
        self.check(StoreOp::InsertContact).await?;
        let mut tables = self.tables.write().await;
        tables.require_asset(new.asset_id)?;
        let id = tables.next_id();
        let contact = Contact {
            id,
            asset_id: new.asset_id,
            contact_name: new.contact_name,
            contact_detail: new.contact_detail,
        };
        tables.contacts.insert(id, contact.clone());
        Ok(contact)
    }

    async fn get_contact(&self, id: i64) -> Result<Contact, StoreError> {
        self.check(StoreOp::GetContact).await?;
        let tables = self.tables.read().await;
        tables.contacts.get(&id).cloned().ok_or_else(|| not_found("contact", id))
    }

    async fn list_contacts(&self, asset_id: i64) -> Result<Vec<Contact>, StoreError> {
        self.check(StoreOp::ListContacts).await?;
        let tables = self.tables.read().await;
        Ok(tables.contacts.values().filter(|c| c.asset_id == asset_id).cloned().collect())
    }

    async fn update_contact(&self, id: i64, name: &str, detail: &str) -> Result<Contact, StoreError> {
        self.check(StoreOp::UpdateContact).await?;
        let mut tables = self.tables.write().await;
        let contact = tables.contacts.get_mut(&id).ok_or_else(|| not_found("contact", id))?;
        contact.contact_name = name.to_string();
        contact.contact_detail = detail.to_string();
        Ok(contact.clone())
    }

    async fn delete_contact(&self, id: i64) -> Result<(), StoreError> {
        self.check(StoreOp::DeleteContact).await?;
        let mut tables = self.tables.write().await;
        tables.contacts.remove(&id).map(|_| ()).ok_or_else(|| not_found("contact", id))
    }

    async fn insert_image(&self, asset_id: i64, image_url: &str) -> Result<Image, StoreError> {
        self.check(StoreOp::InsertImage).await?;
        let mut tables = self.tables.write().await;
        tables.require_asset(asset_id)?;
        let id = tables.next_id();
        let image = Image {
            id,
            asset_id,
            image_url: image_url.to_string(),
        };
        tables.images.insert(id, image.clone());
        Ok(image)
    }

    async fn get_image(&self, id: i64) -> Result<Image, StoreError> {
        self.check(StoreOp::GetImage).await?;
        let tables = self.tables.read().await;
        tables.images.get(&id).cloned().ok_or_else(|| not_found("image", id))
    }

    async fn list_images(&self, asset_id: i64) -> Result<Vec<Image>, StoreError> {
        self.check(StoreOp::ListImages).await?;
        let tables = self.tables.read().await;
        Ok(tables.images.values().filter(|i| i.asset_id == asset_id).cloned().collect())
    }

    async fn delete_image(&self, id: i64) -> Result<(), StoreError> {
        self.check(StoreOp::DeleteImage).await?;
        let mut tables = self.tables.write().await;
        tables.images.remove(&id).map(|_| ()).ok_or_else(|| not_found("image", id))
    }
}

type ReferenceFilter = Box<dyn Fn(&str) -> bool + Send + Sync>;

/// Wraps a `BlobStore` and fails the writes or removals a filter selects
pub struct FlakyBlobStore<B> {
    inner: B,
    fail_put: ReferenceFilter,
    fail_remove: ReferenceFilter,
}

impl<B: BlobStore> FlakyBlobStore<B> {
    pub fn new(inner: B) -> Self {
        Self {
            inner,
            fail_put: Box::new(|_| false),
            fail_remove: Box::new(|_| false),
        }
    }

    pub fn failing_puts(mut self, filter: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        self.fail_put = Box::new(filter);
        self
    }

    pub fn failing_removes(mut self, filter: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        self.fail_remove = Box::new(filter);
        self
    }
}

#[async_trait]
impl<B: BlobStore> BlobStore for FlakyBlobStore<B> {
    async fn put(&self, reference: &str, bytes: &[u8]) -> io::Result<()> {
        if (self.fail_put)(reference) {
            return Err(io::Error::new(io::ErrorKind::Other, "injected write failure"));
        }
        self.inner.put(reference, bytes).await
    }

    async fn remove(&self, reference: &str) -> io::Result<()> {
        if (self.fail_remove)(reference) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "injected remove failure"));
        }
        self.inner.remove(reference).await
    }

    async fn exists(&self, reference: &str) -> bool {
        self.inner.exists(reference).await
    }
}
