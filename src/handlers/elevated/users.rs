// handlers/elevated/users.rs - GET /admin/users

use axum::extract::{Query, State};
use serde_json::{json, Value};

use crate::app::AppState;
use crate::handlers::pagination::WindowQuery;
use crate::middleware::{ApiResponse, ApiResult, AuthorizationContext};

/// GET /admin/users?limit=&offset= - every principal, oldest first
pub async fn list_users(
    State(state): State<AppState>,
    ctx: AuthorizationContext,
    Query(query): Query<WindowQuery>,
) -> ApiResult<Value> {
    let (limit, offset) = (query.limit(), query.offset());
    let users = state.store.list_principals(limit, offset).await?;
    tracing::debug!(limit, offset, "Admin '{}' listed users", ctx.username());

    Ok(ApiResponse::success(json!({
        "users": users,
        "limit": limit,
        "offset": offset,
    })))
}
