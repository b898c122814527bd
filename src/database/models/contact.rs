use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Contact {
    pub id: i64,
    pub asset_id: i64,
    pub contact_name: String,
    pub contact_detail: String,
}

#[derive(Debug, Clone)]
pub struct NewContact {
    pub asset_id: i64,
    pub contact_name: String,
    pub contact_detail: String,
}
