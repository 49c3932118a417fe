//! # Read-through Cache Decorators
//!
//! Wrap a repository and serve reads through a [`CacheLayer`]. Every
//! mutation goes to the inner repository first and then synchronously
//! deletes the keys of the entities it touched:
//!
//! | Mutation | Keys deleted |
//! |----------|--------------|
//! | product create / delete | `product:{id}`, `products:all`, `products:featured`, `products:category:{c}` |
//! | product update | as above, for both the old and the new category |
//! | any cart change | `cart:user:{uid}` |
//! | order create / update | `order:{id}`, `orders:user:{uid}` |
//! | wishlist add / remove | `wishlist:user:{uid}` |
//! | user profile save / delete | `user:{uid}` |
//!
//! Search results, wishlist membership checks, email lookups and payments
//! bypass the cache.

use crate::cache::{keys, CacheLayer};
use crate::cart::{Cart, CartItemId};
use crate::error::ShopResult;
use crate::order::{NewOrder, Order, OrderId, OrderUpdate};
use crate::product::{Category, Product, ProductId};
use crate::repository::{
    CartStore, OrderRepository, ProductRepository, SharedCartStore, SharedOrderRepository,
    SharedProductRepository, SharedUserRepository, SharedWishlistRepository, UserRepository,
    WishlistRepository,
};
use crate::user::{User, UserProfile};
use crate::wishlist::WishlistEntry;
use crate::UserId;
use async_trait::async_trait;
use std::collections::BTreeSet;

fn product_keys(id: ProductId, categories: impl IntoIterator<Item = Category>) -> Vec<String> {
    let mut stale = vec![
        keys::product(id),
        keys::PRODUCTS_ALL.to_string(),
        keys::PRODUCTS_FEATURED.to_string(),
    ];
    stale.extend(
        categories
            .into_iter()
            .map(keys::products_by_category)
            .collect::<BTreeSet<_>>(),
    );
    stale
}

pub struct CachedProductRepository {
    inner: SharedProductRepository,
    cache: CacheLayer,
}

impl CachedProductRepository {
    pub fn new(inner: SharedProductRepository, cache: CacheLayer) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl ProductRepository for CachedProductRepository {
    async fn get(&self, id: ProductId) -> ShopResult<Option<Product>> {
        self.cache
            .read_through_optional(&keys::product(id), || self.inner.get(id))
            .await
    }

    async fn list_all(&self) -> ShopResult<Vec<Product>> {
        self.cache
            .read_through(keys::PRODUCTS_ALL, || self.inner.list_all())
            .await
    }

    async fn list_featured(&self) -> ShopResult<Vec<Product>> {
        self.cache
            .read_through(keys::PRODUCTS_FEATURED, || self.inner.list_featured())
            .await
    }

    async fn list_by_category(&self, category: Category) -> ShopResult<Vec<Product>> {
        self.cache
            .read_through(&keys::products_by_category(category), || {
                self.inner.list_by_category(category)
            })
            .await
    }

    async fn search(&self, query: &str) -> ShopResult<Vec<Product>> {
        self.inner.search(query).await
    }

    async fn create(&self, product: Product) -> ShopResult<Product> {
        let created = self.inner.create(product).await?;
        self.cache
            .invalidate(&product_keys(created.id, [created.category]))
            .await;
        Ok(created)
    }

    async fn bulk_create(&self, products: Vec<Product>) -> ShopResult<Vec<Product>> {
        let created = self.inner.bulk_create(products).await?;
        let mut stale: Vec<String> = created.iter().map(|p| keys::product(p.id)).collect();
        if let Some(first) = created.first() {
            stale.extend(product_keys(first.id, created.iter().map(|p| p.category)));
        }
        self.cache.invalidate(&stale).await;
        Ok(created)
    }

    async fn update(&self, product: Product) -> ShopResult<Product> {
        let previous = self.inner.get(product.id).await?;
        let updated = self.inner.update(product).await?;

        let categories = previous
            .map(|p| p.category)
            .into_iter()
            .chain([updated.category]);
        self.cache
            .invalidate(&product_keys(updated.id, categories))
            .await;
        Ok(updated)
    }

    async fn delete(&self, id: ProductId) -> ShopResult<Product> {
        let removed = self.inner.delete(id).await?;
        self.cache
            .invalidate(&product_keys(removed.id, [removed.category]))
            .await;
        Ok(removed)
    }
}

pub struct CachedCartStore {
    inner: SharedCartStore,
    cache: CacheLayer,
}

impl CachedCartStore {
    pub fn new(inner: SharedCartStore, cache: CacheLayer) -> Self {
        Self { inner, cache }
    }

    async fn invalidate(&self, user_id: UserId) {
        self.cache.invalidate(&[keys::cart(user_id)]).await;
    }
}

#[async_trait]
impl CartStore for CachedCartStore {
    async fn get_cart(&self, user_id: UserId) -> ShopResult<Cart> {
        self.cache
            .read_through(&keys::cart(user_id), || self.inner.get_cart(user_id))
            .await
    }

    async fn add_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> ShopResult<Cart> {
        let cart = self.inner.add_item(user_id, product_id, quantity).await?;
        self.invalidate(user_id).await;
        Ok(cart)
    }

    async fn update_item_quantity(
        &self,
        user_id: UserId,
        item_id: CartItemId,
        quantity: u32,
    ) -> ShopResult<Cart> {
        let cart = self
            .inner
            .update_item_quantity(user_id, item_id, quantity)
            .await?;
        self.invalidate(user_id).await;
        Ok(cart)
    }

    async fn remove_item(&self, user_id: UserId, item_id: CartItemId) -> ShopResult<Cart> {
        let cart = self.inner.remove_item(user_id, item_id).await?;
        self.invalidate(user_id).await;
        Ok(cart)
    }

    async fn remove_items(
        &self,
        user_id: UserId,
        items: &[(CartItemId, u32)],
    ) -> ShopResult<Cart> {
        let cart = self.inner.remove_items(user_id, items).await?;
        self.invalidate(user_id).await;
        Ok(cart)
    }

    async fn clear(&self, user_id: UserId) -> ShopResult<()> {
        self.inner.clear(user_id).await?;
        self.invalidate(user_id).await;
        Ok(())
    }
}

pub struct CachedOrderRepository {
    inner: SharedOrderRepository,
    cache: CacheLayer,
}

impl CachedOrderRepository {
    pub fn new(inner: SharedOrderRepository, cache: CacheLayer) -> Self {
        Self { inner, cache }
    }

    async fn invalidate(&self, order: &Order) {
        self.cache
            .invalidate(&[keys::order(order.id), keys::user_orders(order.user_id)])
            .await;
    }
}

#[async_trait]
impl OrderRepository for CachedOrderRepository {
    async fn get(&self, id: OrderId) -> ShopResult<Option<Order>> {
        self.cache
            .read_through_optional(&keys::order(id), || self.inner.get(id))
            .await
    }

    async fn list_by_user(&self, user_id: UserId) -> ShopResult<Vec<Order>> {
        self.cache
            .read_through(&keys::user_orders(user_id), || {
                self.inner.list_by_user(user_id)
            })
            .await
    }

    async fn create(&self, order: NewOrder) -> ShopResult<Order> {
        let created = self.inner.create(order).await?;
        self.invalidate(&created).await;
        Ok(created)
    }

    async fn update(&self, id: OrderId, update: OrderUpdate) -> ShopResult<Order> {
        let updated = self.inner.update(id, update).await?;
        self.invalidate(&updated).await;
        Ok(updated)
    }
}

pub struct CachedWishlistRepository {
    inner: SharedWishlistRepository,
    cache: CacheLayer,
}

impl CachedWishlistRepository {
    pub fn new(inner: SharedWishlistRepository, cache: CacheLayer) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl WishlistRepository for CachedWishlistRepository {
    async fn list(&self, user_id: UserId) -> ShopResult<Vec<WishlistEntry>> {
        self.cache
            .read_through(&keys::wishlist(user_id), || self.inner.list(user_id))
            .await
    }

    async fn add(&self, user_id: UserId, product_id: ProductId) -> ShopResult<bool> {
        let added = self.inner.add(user_id, product_id).await?;
        self.cache.invalidate(&[keys::wishlist(user_id)]).await;
        Ok(added)
    }

    async fn remove(&self, user_id: UserId, product_id: ProductId) -> ShopResult<bool> {
        let removed = self.inner.remove(user_id, product_id).await?;
        self.cache.invalidate(&[keys::wishlist(user_id)]).await;
        Ok(removed)
    }

    async fn contains(&self, user_id: UserId, product_id: ProductId) -> ShopResult<bool> {
        self.inner.contains(user_id, product_id).await
    }
}

pub struct CachedUserRepository {
    inner: SharedUserRepository,
    cache: CacheLayer,
}

impl CachedUserRepository {
    pub fn new(inner: SharedUserRepository, cache: CacheLayer) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl UserRepository for CachedUserRepository {
    async fn get_user(&self, id: UserId) -> ShopResult<Option<User>> {
        self.cache
            .read_through_optional(&keys::user(id), || self.inner.get_user(id))
            .await
    }

    async fn find_by_email(&self, email: &str) -> ShopResult<Option<User>> {
        self.inner.find_by_email(email).await
    }

    async fn save_profile(&self, id: UserId, profile: UserProfile) -> ShopResult<(User, bool)> {
        let saved = self.inner.save_profile(id, profile).await?;
        self.cache.invalidate(&[keys::user(id)]).await;
        Ok(saved)
    }

    async fn delete_user(&self, id: UserId) -> ShopResult<User> {
        let removed = self.inner.delete_user(id).await?;
        self.cache.invalidate(&[keys::user(id)]).await;
        Ok(removed)
    }
}
