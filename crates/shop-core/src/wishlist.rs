//! Wishlist entries.

use crate::product::{Product, ProductId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A product a user saved for later
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WishlistEntry {
    pub product_id: ProductId,
    pub added_at: DateTime<Utc>,
}

impl WishlistEntry {
    pub fn new(product_id: ProductId) -> Self {
        Self {
            product_id,
            added_at: Utc::now(),
        }
    }
}

/// Wishlist entry resolved against the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WishlistItem {
    pub product: Product,
    pub added_at: DateTime<Utc>,
}
