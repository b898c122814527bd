//! Authorization gates and the chain that runs them.
//!
//! A `GateChain` can only be built from an `AuthenticationGate`, and every
//! later gate receives the `AuthorizationContext` that authentication
//! produced. Ownership and role checks therefore cannot be attached to a
//! route without authentication in front of them, and they never see an
//! empty principal.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::auth::{IdentityError, IdentityResolver, TokenMaker};
use crate::database::models::Principal;
use crate::database::store::{Store, StoreError};

/// Terminal verdict of a failing gate
#[derive(Debug, Error)]
pub enum GateError {
    #[error("unauthenticated")]
    Unauthenticated,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Store(StoreError),
}

/// The request data gates are allowed to look at
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    pub token: Option<String>,
    pub path_params: HashMap<String, String>,
}

impl RequestMeta {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name).map(String::as_str)
    }
}

/// Per-request authorization result handed to handlers.
///
/// Only `AuthenticationGate` creates one, so holding a context proves the
/// request carried a valid token for an existing principal.
#[derive(Debug, Clone)]
pub struct AuthorizationContext {
    principal: Principal,
    target_asset_id: Option<i64>,
}

impl AuthorizationContext {
    fn authenticated(principal: Principal) -> Self {
        Self {
            principal,
            target_asset_id: None,
        }
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn username(&self) -> &str {
        &self.principal.username
    }

    /// Set only after `OwnershipGate` passed
    pub fn target_asset_id(&self) -> Option<i64> {
        self.target_asset_id
    }

    fn apply(&mut self, update: ContextUpdate) {
        if let Some(id) = update.target_asset_id {
            self.target_asset_id = Some(id);
        }
    }
}

/// Additions a passing gate makes to the context
#[derive(Debug, Default)]
pub struct ContextUpdate {
    pub target_asset_id: Option<i64>,
}

/// A post-authentication check. Gates only read; the chain applies updates.
#[async_trait]
pub trait Gate: Send + Sync {
    fn name(&self) -> &'static str;

    async fn check(&self, meta: &RequestMeta, ctx: &AuthorizationContext) -> Result<ContextUpdate, GateError>;
}

/// Verifies the session token and loads its principal
pub struct AuthenticationGate {
    tokens: Arc<dyn TokenMaker>,
    identities: IdentityResolver,
}

impl AuthenticationGate {
    pub fn new(tokens: Arc<dyn TokenMaker>, store: Arc<dyn Store>) -> Self {
        Self {
            tokens,
            identities: IdentityResolver::new(store),
        }
    }

    pub async fn authenticate(&self, meta: &RequestMeta) -> Result<AuthorizationContext, GateError> {
        let token = match meta.token.as_deref() {
            Some(token) if !token.is_empty() => token,
            _ => {
                tracing::debug!("Authentication failed: no session token");
                return Err(GateError::Unauthenticated);
            }
        };

        let payload = self.tokens.verify(token).map_err(|e| {
            tracing::debug!("Authentication failed: {}", e);
            GateError::Unauthenticated
        })?;

        match self.identities.resolve(&payload).await {
            Ok(principal) => Ok(AuthorizationContext::authenticated(principal)),
            Err(IdentityError::InvalidToken) => {
                tracing::debug!("Authentication failed: token expired during resolution");
                Err(GateError::Unauthenticated)
            }
            Err(IdentityError::PrincipalNotFound(username)) => {
                tracing::warn!(token_id = %payload.id, "Valid token for vanished principal '{}'", username);
                Err(GateError::Forbidden(format!("principal '{}' no longer exists", username)))
            }
            Err(IdentityError::Store(e)) => {
                tracing::error!("Authentication failed on store lookup: {}", e);
                Err(GateError::Store(e))
            }
        }
    }
}

/// Passes only when the principal owns the asset named by the `asset_id` path parameter
pub struct OwnershipGate {
    store: Arc<dyn Store>,
}

impl OwnershipGate {
    pub const PARAM: &'static str = "asset_id";

    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Gate for OwnershipGate {
    fn name(&self) -> &'static str {
        "ownership"
    }

    async fn check(&self, meta: &RequestMeta, ctx: &AuthorizationContext) -> Result<ContextUpdate, GateError> {
        let raw = meta
            .param(Self::PARAM)
            .ok_or_else(|| GateError::BadRequest(format!("{} is required", Self::PARAM)))?;
        let asset_id: i64 = raw
            .parse()
            .map_err(|_| GateError::BadRequest(format!("invalid {}", Self::PARAM)))?;

        let asset = match self.store.get_asset(asset_id).await {
            Ok(asset) => asset,
            Err(StoreError::NotFound(_)) => return Err(GateError::NotFound("asset not found".to_string())),
            Err(e) => return Err(GateError::Store(e)),
        };

        if asset.owner != ctx.username() {
            tracing::info!(asset_id, owner = %asset.owner, "User '{}' denied: not the owner", ctx.username());
            return Err(GateError::Forbidden(format!("asset {} belongs to another user", asset_id)));
        }

        Ok(ContextUpdate {
            target_asset_id: Some(asset_id),
        })
    }
}

/// Passes only for principals with the admin role
pub struct AdminGate;

#[async_trait]
impl Gate for AdminGate {
    fn name(&self) -> &'static str {
        "admin"
    }

    async fn check(&self, _meta: &RequestMeta, ctx: &AuthorizationContext) -> Result<ContextUpdate, GateError> {
        if !ctx.principal().is_admin() {
            tracing::info!("User '{}' denied: admin role required", ctx.username());
            return Err(GateError::Forbidden("admin role required".to_string()));
        }
        Ok(ContextUpdate::default())
    }
}

/// Authentication followed by zero or more gates, run left to right and
/// stopped at the first failure
pub struct GateChain {
    authentication: AuthenticationGate,
    gates: Vec<Box<dyn Gate>>,
}

impl GateChain {
    pub fn authenticated(authentication: AuthenticationGate) -> Self {
        Self {
            authentication,
            gates: Vec::new(),
        }
    }

    pub fn then(mut self, gate: impl Gate + 'static) -> Self {
        self.gates.push(Box::new(gate));
        self
    }

    pub fn require_owner(self, gate: OwnershipGate) -> Self {
        self.then(gate)
    }

    pub fn require_admin(self) -> Self {
        self.then(AdminGate)
    }

    pub fn gate_names(&self) -> Vec<&'static str> {
        std::iter::once("authentication")
            .chain(self.gates.iter().map(|g| g.name()))
            .collect()
    }

    pub async fn run(&self, meta: &RequestMeta) -> Result<AuthorizationContext, GateError> {
        let mut ctx = self.authentication.authenticate(meta).await?;
        for gate in &self.gates {
            let update = gate.check(meta, &ctx).await?;
            ctx.apply(update);
        }
        Ok(ctx)
    }
}
