use serde::{Deserialize, Serialize};

use crate::database::models::Asset;

/// Upper bound for `limit` on offset-windowed listings
pub const MAX_LIMIT: i64 = 100;

/// Default `limit` on offset-windowed listings
pub const DEFAULT_LIMIT: i64 = 10;

/// `?page=N`, one-based; anything below 1 reads as 1
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
}

impl PageQuery {
    pub fn page(&self) -> i64 {
        self.page.filter(|p| *p >= 1).unwrap_or(1)
    }

    pub fn offset(&self, page_size: i64) -> i64 {
        (self.page() - 1).saturating_mul(page_size)
    }
}

/// `?limit=&offset=`
#[derive(Debug, Default, Deserialize)]
pub struct WindowQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl WindowQuery {
    pub fn limit(&self) -> i64 {
        match self.limit {
            Some(limit) if limit > 0 => limit.min(MAX_LIMIT),
            _ => DEFAULT_LIMIT,
        }
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

#[derive(Debug, Serialize)]
pub struct AssetPage {
    pub assets: Vec<Asset>,
    pub page: i64,
    pub limit: i64,
    pub total: i64,
}
