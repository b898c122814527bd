use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;

use crate::auth::token::TokenPayload;
use crate::database::models::Principal;
use crate::database::store::{Store, StoreError};

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("invalid token")]
    InvalidToken,

    /// The token verified but its subject is gone from storage
    #[error("principal '{0}' no longer exists")]
    PrincipalNotFound(String),

    #[error(transparent)]
    Store(StoreError),
}

/// Maps a verified token payload to the stored principal
#[derive(Clone)]
pub struct IdentityResolver {
    store: Arc<dyn Store>,
}

impl IdentityResolver {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn resolve(&self, payload: &TokenPayload) -> Result<Principal, IdentityError> {
        if !payload.is_valid_at(Utc::now()) {
            return Err(IdentityError::InvalidToken);
        }

        match self.store.get_principal(&payload.username).await {
            Ok(principal) => Ok(principal),
            Err(StoreError::NotFound(_)) => Err(IdentityError::PrincipalNotFound(payload.username.clone())),
            Err(e) => Err(IdentityError::Store(e)),
        }
    }
}
