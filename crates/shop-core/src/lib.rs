//! # shop-core
//!
//! Core types, pricing engine and checkout services for storefront-rs.
//!
//! This crate provides:
//! - [`compute_summary`] and [`PricingPolicy`]: the cart pricing engine
//! - `Product`, `Cart`, `Order`, `Payment`, `User` domain types
//! - Repository traits with an in-memory implementation and read-through
//!   cache decorators
//! - `PaymentGateway` trait for payment processors, plus a stub gateway
//! - `CartService`, `CheckoutOrchestrator`, `PaymentService` and friends
//! - `ShopError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use shop_core::{compute_summary, CartSnapshot, Currency, PricingPolicy};
//!
//! let snapshot = CartSnapshot::new(user_id, Currency::USD).with_product(&keyboard, 2);
//! let summary = compute_summary(&snapshot, &PricingPolicy::default());
//! println!("Total: {}", summary.total.display());
//!
//! // Or run the whole checkout
//! let receipt = checkout.checkout(user_id).await?;
//! // Hand receipt.client_secret to the client
//! ```

pub mod cache;
pub mod cached;
pub mod cart;
pub mod error;
pub mod gateway;
pub mod memory;
pub mod order;
pub mod payment;
pub mod pricing;
pub mod product;
pub mod repository;
pub mod services;
pub mod stub;
pub mod user;
pub mod wishlist;

/// User identifier, supplied by the upstream identity layer
pub type UserId = u64;

// Re-exports for convenience
pub use cache::{Cache, CacheLayer, MemoryCache};
pub use cached::{
    CachedCartStore, CachedOrderRepository, CachedProductRepository, CachedUserRepository,
    CachedWishlistRepository,
};
pub use cart::{parse_quantity, Cart, CartItem, CartSnapshot, LineItem};
pub use error::{ShopError, ShopResult};
pub use gateway::{BoxedPaymentGateway, PaymentGateway};
pub use memory::MemoryStore;
pub use order::{NewOrder, Order, OrderId, OrderItem, OrderStatus, OrderUpdate, PaymentStatus};
pub use payment::{IntentStatus, Payment, PaymentIntent, WebhookEvent, WebhookEventType};
pub use pricing::{compute_summary, PricedSummary, PricingPolicy};
pub use product::{Category, Currency, Price, Product, ProductCatalog, ProductId};
pub use repository::{
    CartStore, OrderRepository, PaymentRepository, ProductRepository, UserRepository,
    WishlistRepository,
};
pub use services::{
    CartService, CartView, CatalogService, CheckoutFailure, CheckoutOrchestrator,
    CheckoutReceipt, IntentReceipt, PaymentService, UserService, WishlistService,
};
pub use stub::StubGateway;
pub use user::{User, UserProfile, UserRole};
pub use wishlist::{WishlistEntry, WishlistItem};
