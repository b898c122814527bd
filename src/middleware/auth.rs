use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, RawPathParams, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use std::sync::Arc;

use crate::auth::cookie::TOKEN_COOKIE;
use crate::error::ApiError;
use crate::middleware::gates::{AuthorizationContext, GateChain, RequestMeta};

/// Runs a gate chain and injects the resulting `AuthorizationContext`.
///
/// Attach with `from_fn_with_state(Arc<GateChain>, authorize)`; the first
/// failing gate's verdict becomes the response.
pub async fn authorize(State(chain): State<Arc<GateChain>>, request: Request, next: Next) -> Result<Response, ApiError> {
    let (mut parts, body) = request.into_parts();
    let meta = request_meta(&mut parts).await;

    let ctx = chain.run(&meta).await?;
    parts.extensions.insert(ctx);

    Ok(next.run(Request::from_parts(parts, body)).await)
}

async fn request_meta(parts: &mut Parts) -> RequestMeta {
    let token = extract_token(&parts.headers);

    // Unmatched or undecodable params leave the map empty; gates that need
    // one report it missing
    let path_params = match RawPathParams::from_request_parts(parts, &()).await {
        Ok(params) => params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        Err(_) => HashMap::new(),
    };

    RequestMeta { token, path_params }
}

/// Session token from the `token` cookie, falling back to a Bearer header
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    cookie_value(headers, TOKEN_COOKIE).or_else(|| bearer_token(headers))
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        return None;
    }
    Some(token.to_string())
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthorizationContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<AuthorizationContext>().cloned().ok_or_else(|| {
            tracing::error!("Handler requires an authorization context but no gate chain ran");
            ApiError::internal_server_error("An error occurred while processing your request")
        })
    }
}

/// Asset id confirmed by the ownership gate
#[derive(Debug, Clone, Copy)]
pub struct OwnedAsset(pub i64);

#[async_trait]
impl<S> FromRequestParts<S> for OwnedAsset
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let ctx = AuthorizationContext::from_request_parts(parts, state).await?;
        ctx.target_asset_id().map(OwnedAsset).ok_or_else(|| {
            tracing::error!("Handler requires an owned asset but no ownership gate ran");
            ApiError::internal_server_error("An error occurred while processing your request")
        })
    }
}
