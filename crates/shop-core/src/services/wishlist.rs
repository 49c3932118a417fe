//! Wishlist service.

use crate::error::{ShopError, ShopResult};
use crate::product::ProductId;
use crate::repository::{SharedProductRepository, SharedWishlistRepository};
use crate::wishlist::WishlistItem;
use crate::UserId;
use tracing::{debug, instrument};

pub struct WishlistService {
    wishlist: SharedWishlistRepository,
    products: SharedProductRepository,
}

impl WishlistService {
    pub fn new(wishlist: SharedWishlistRepository, products: SharedProductRepository) -> Self {
        Self { wishlist, products }
    }

    /// Saved products, oldest first. Entries for deleted products are dropped.
    pub async fn list(&self, user_id: UserId) -> ShopResult<Vec<WishlistItem>> {
        let entries = self.wishlist.list(user_id).await?;
        let mut items = Vec::with_capacity(entries.len());
        for entry in entries {
            match self.products.get(entry.product_id).await? {
                Some(product) => items.push(WishlistItem {
                    product,
                    added_at: entry.added_at,
                }),
                None => debug!(product_id = entry.product_id, "Wishlist entry for missing product"),
            }
        }
        Ok(items)
    }

    /// Returns `false` if the product was already saved
    #[instrument(skip(self))]
    pub async fn add(&self, user_id: UserId, product_id: ProductId) -> ShopResult<bool> {
        if self.products.get(product_id).await?.is_none() {
            return Err(ShopError::ProductNotFound { product_id });
        }
        self.wishlist.add(user_id, product_id).await
    }

    /// Returns `false` if the product was not saved
    #[instrument(skip(self))]
    pub async fn remove(&self, user_id: UserId, product_id: ProductId) -> ShopResult<bool> {
        self.wishlist.remove(user_id, product_id).await
    }

    pub async fn contains(&self, user_id: UserId, product_id: ProductId) -> ShopResult<bool> {
        self.wishlist.contains(user_id, product_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::product::{Category, Currency, Price, Product};
    use crate::repository::ProductRepository;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_wishlist_flow() {
        let store = Arc::new(MemoryStore::new());
        store
            .bulk_create(vec![
                Product::new("Monitor Arm", Price::new(89.0, Currency::USD), Category::Office),
                Product::new("Coaster", Price::new(4.0, Currency::USD), Category::Home),
            ])
            .await
            .unwrap();
        let service = WishlistService::new(store.clone(), store.clone());

        assert!(service.add(1, 1).await.unwrap());
        assert!(!service.add(1, 1).await.unwrap());
        assert!(service.add(1, 2).await.unwrap());
        assert!(matches!(
            service.add(1, 42).await,
            Err(ShopError::ProductNotFound { product_id: 42 })
        ));

        let items = service.list(1).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].product.name, "Monitor Arm");

        store.delete(2).await.unwrap();
        assert_eq!(service.list(1).await.unwrap().len(), 1);

        assert!(service.contains(1, 1).await.unwrap());
        assert!(service.remove(1, 1).await.unwrap());
        assert!(!service.remove(1, 1).await.unwrap());
        assert!(!service.contains(1, 1).await.unwrap());
    }
}
