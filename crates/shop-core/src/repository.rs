//! # Repository Traits
//!
//! Persistence seams for the storefront. Every trait is object safe and
//! `Send + Sync` so services can hold them as `Arc<dyn ...>`.
//!
//! Implementations:
//! - [`MemoryStore`](crate::memory::MemoryStore): in-process backing store
//! - `Cached*` decorators in [`cached`](crate::cached): read-through cache
//!   in front of any implementation

use crate::cart::{Cart, CartItemId};
use crate::error::ShopResult;
use crate::order::{NewOrder, Order, OrderId, OrderUpdate};
use crate::payment::{NewPayment, Payment, PaymentUpdate};
use crate::product::{Category, Product, ProductId};
use crate::user::{User, UserProfile};
use crate::wishlist::WishlistEntry;
use crate::UserId;
use async_trait::async_trait;
use std::sync::Arc;

/// Product catalog persistence
#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn get(&self, id: ProductId) -> ShopResult<Option<Product>>;

    /// All products, by id
    async fn list_all(&self) -> ShopResult<Vec<Product>>;

    async fn list_featured(&self) -> ShopResult<Vec<Product>>;

    async fn list_by_category(&self, category: Category) -> ShopResult<Vec<Product>>;

    /// Case-insensitive substring search on name or description
    async fn search(&self, query: &str) -> ShopResult<Vec<Product>>;

    /// Validate and store a product, assigning its id
    async fn create(&self, product: Product) -> ShopResult<Product>;

    /// Store many products. Nothing is stored if any product is invalid.
    async fn bulk_create(&self, products: Vec<Product>) -> ShopResult<Vec<Product>>;

    /// Replace a product. Fails with `ProductNotFound` if absent.
    async fn update(&self, product: Product) -> ShopResult<Product>;

    /// Returns the removed product
    async fn delete(&self, id: ProductId) -> ShopResult<Product>;
}

/// Cart persistence (one cart per user)
#[async_trait]
pub trait CartStore: Send + Sync {
    /// The user's cart, created empty on first access
    async fn get_cart(&self, user_id: UserId) -> ShopResult<Cart>;

    /// Add a product; an existing line for the same product is increased
    async fn add_item(&self, user_id: UserId, product_id: ProductId, quantity: u32)
        -> ShopResult<Cart>;

    /// Set the quantity of one of the user's items
    async fn update_item_quantity(
        &self,
        user_id: UserId,
        item_id: CartItemId,
        quantity: u32,
    ) -> ShopResult<Cart>;

    async fn remove_item(&self, user_id: UserId, item_id: CartItemId) -> ShopResult<Cart>;

    /// Take ordered quantities out of the cart. Each row loses at most the
    /// given quantity and is dropped once it reaches zero; anything added
    /// since the order was priced stays. Unknown rows are ignored.
    async fn remove_items(
        &self,
        user_id: UserId,
        items: &[(CartItemId, u32)],
    ) -> ShopResult<Cart>;

    /// Remove every item (the cart itself is kept)
    async fn clear(&self, user_id: UserId) -> ShopResult<()>;
}

/// Order persistence
#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn get(&self, id: OrderId) -> ShopResult<Option<Order>>;

    /// The user's orders, newest first
    async fn list_by_user(&self, user_id: UserId) -> ShopResult<Vec<Order>>;

    async fn create(&self, order: NewOrder) -> ShopResult<Order>;

    async fn update(&self, id: OrderId, update: OrderUpdate) -> ShopResult<Order>;
}

/// Wishlist persistence
#[async_trait]
pub trait WishlistRepository: Send + Sync {
    /// Entries in the order they were added
    async fn list(&self, user_id: UserId) -> ShopResult<Vec<WishlistEntry>>;

    /// Returns `false` if the product was already on the list
    async fn add(&self, user_id: UserId, product_id: ProductId) -> ShopResult<bool>;

    /// Returns `false` if the product was not on the list
    async fn remove(&self, user_id: UserId, product_id: ProductId) -> ShopResult<bool>;

    async fn contains(&self, user_id: UserId, product_id: ProductId) -> ShopResult<bool>;
}

/// User profile persistence
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get_user(&self, id: UserId) -> ShopResult<Option<User>>;

    async fn find_by_email(&self, email: &str) -> ShopResult<Option<User>>;

    /// Create the profile or replace its editable fields. Returns the user
    /// and `true` if it was created. Fails with `EmailTaken` if another
    /// user already has the email.
    async fn save_profile(&self, id: UserId, profile: UserProfile) -> ShopResult<(User, bool)>;

    /// Returns the removed user
    async fn delete_user(&self, id: UserId) -> ShopResult<User>;
}

/// Payment record persistence
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn save_intent(&self, payment: NewPayment) -> ShopResult<Payment>;

    /// Fails with `PaymentNotFound` if no record exists for the intent
    async fn update_by_intent(&self, intent_id: &str, update: PaymentUpdate) -> ShopResult<Payment>;

    async fn find_by_intent(&self, intent_id: &str) -> ShopResult<Option<Payment>>;

    /// Latest payment recorded for an order
    async fn find_by_order(&self, order_id: OrderId) -> ShopResult<Option<Payment>>;

    /// The user's payments, newest first
    async fn list_by_user(&self, user_id: UserId) -> ShopResult<Vec<Payment>>;
}

pub type SharedProductRepository = Arc<dyn ProductRepository>;
pub type SharedCartStore = Arc<dyn CartStore>;
pub type SharedOrderRepository = Arc<dyn OrderRepository>;
pub type SharedWishlistRepository = Arc<dyn WishlistRepository>;
pub type SharedPaymentRepository = Arc<dyn PaymentRepository>;
pub type SharedUserRepository = Arc<dyn UserRepository>;
