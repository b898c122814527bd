use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A stored image row. `image_url` is relative to the upload root
/// (`uploads/<name>`), never absolute.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Image {
    pub id: i64,
    pub asset_id: i64,
    pub image_url: String,
}
