//! In-memory store implementation
//!
//! Backs every repository trait with maps behind `tokio::sync::RwLock`.
//! Used for development and tests; ids come from atomic counters
//! starting at 1.

use crate::cart::{Cart, CartItem, CartItemId};
use crate::error::{ShopError, ShopResult};
use crate::order::{NewOrder, Order, OrderId, OrderUpdate};
use crate::payment::{NewPayment, Payment, PaymentId, PaymentUpdate};
use crate::product::{Category, Product, ProductId};
use crate::repository::{
    CartStore, OrderRepository, PaymentRepository, ProductRepository, UserRepository,
    WishlistRepository,
};
use crate::user::{User, UserProfile};
use crate::wishlist::WishlistEntry;
use crate::UserId;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

/// In-memory store for all storefront entities
#[derive(Default)]
pub struct MemoryStore {
    products: RwLock<BTreeMap<ProductId, Product>>,
    carts: RwLock<HashMap<UserId, Cart>>,
    orders: RwLock<BTreeMap<OrderId, Order>>,
    wishlists: RwLock<HashMap<UserId, Vec<WishlistEntry>>>,
    payments: RwLock<BTreeMap<PaymentId, Payment>>,
    users: RwLock<BTreeMap<UserId, User>>,
    product_seq: AtomicU64,
    cart_seq: AtomicU64,
    cart_item_seq: AtomicU64,
    order_seq: AtomicU64,
    payment_seq: AtomicU64,
}

fn next_id(seq: &AtomicU64) -> u64 {
    seq.fetch_add(1, Ordering::SeqCst) + 1
}

impl MemoryStore {
    /// Create a new empty in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn product_count(&self) -> usize {
        self.products.read().await.len()
    }

    pub async fn order_count(&self) -> usize {
        self.orders.read().await.len()
    }

    pub async fn payment_count(&self) -> usize {
        self.payments.read().await.len()
    }

    fn new_cart(&self, user_id: UserId) -> Cart {
        Cart::new(next_id(&self.cart_seq), user_id)
    }
}

#[async_trait]
impl ProductRepository for MemoryStore {
    async fn get(&self, id: ProductId) -> ShopResult<Option<Product>> {
        Ok(self.products.read().await.get(&id).cloned())
    }

    async fn list_all(&self) -> ShopResult<Vec<Product>> {
        Ok(self.products.read().await.values().cloned().collect())
    }

    async fn list_featured(&self) -> ShopResult<Vec<Product>> {
        Ok(self
            .products
            .read()
            .await
            .values()
            .filter(|p| p.featured)
            .cloned()
            .collect())
    }

    async fn list_by_category(&self, category: Category) -> ShopResult<Vec<Product>> {
        Ok(self
            .products
            .read()
            .await
            .values()
            .filter(|p| p.category == category)
            .cloned()
            .collect())
    }

    async fn search(&self, query: &str) -> ShopResult<Vec<Product>> {
        Ok(self
            .products
            .read()
            .await
            .values()
            .filter(|p| p.matches(query))
            .cloned()
            .collect())
    }

    async fn create(&self, mut product: Product) -> ShopResult<Product> {
        product.validate()?;
        let now = Utc::now();
        product.id = next_id(&self.product_seq);
        product.created_at = now;
        product.updated_at = now;

        self.products.write().await.insert(product.id, product.clone());
        Ok(product)
    }

    async fn bulk_create(&self, products: Vec<Product>) -> ShopResult<Vec<Product>> {
        for (index, product) in products.iter().enumerate() {
            product.validate().map_err(|err| match err {
                ShopError::Validation(msg) => {
                    ShopError::Validation(format!("product at index {}: {}", index, msg))
                }
                other => other,
            })?;
        }

        let now = Utc::now();
        let mut stored = self.products.write().await;
        let created: Vec<Product> = products
            .into_iter()
            .map(|mut product| {
                product.id = next_id(&self.product_seq);
                product.created_at = now;
                product.updated_at = now;
                stored.insert(product.id, product.clone());
                product
            })
            .collect();

        Ok(created)
    }

    async fn update(&self, mut product: Product) -> ShopResult<Product> {
        product.validate()?;
        let mut products = self.products.write().await;
        let existing = products
            .get(&product.id)
            .ok_or(ShopError::ProductNotFound {
                product_id: product.id,
            })?;

        product.created_at = existing.created_at;
        product.updated_at = Utc::now();
        products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn delete(&self, id: ProductId) -> ShopResult<Product> {
        self.products
            .write()
            .await
            .remove(&id)
            .ok_or(ShopError::ProductNotFound { product_id: id })
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn get_cart(&self, user_id: UserId) -> ShopResult<Cart> {
        if let Some(cart) = self.carts.read().await.get(&user_id) {
            return Ok(cart.clone());
        }

        let mut carts = self.carts.write().await;
        let cart = carts
            .entry(user_id)
            .or_insert_with(|| self.new_cart(user_id));
        Ok(cart.clone())
    }

    async fn add_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: u32,
    ) -> ShopResult<Cart> {
        let mut carts = self.carts.write().await;
        let cart = carts
            .entry(user_id)
            .or_insert_with(|| self.new_cart(user_id));
        let now = Utc::now();

        match cart.items.iter_mut().find(|i| i.product_id == product_id) {
            Some(item) => {
                item.quantity = item.quantity.saturating_add(quantity);
                item.updated_at = now;
            }
            None => cart.items.push(CartItem {
                id: next_id(&self.cart_item_seq),
                product_id,
                quantity,
                created_at: now,
                updated_at: now,
            }),
        }
        cart.updated_at = now;
        Ok(cart.clone())
    }

    async fn update_item_quantity(
        &self,
        user_id: UserId,
        item_id: CartItemId,
        quantity: u32,
    ) -> ShopResult<Cart> {
        let mut carts = self.carts.write().await;
        let cart = carts
            .get_mut(&user_id)
            .ok_or(ShopError::CartItemNotFound { item_id })?;
        let item = cart
            .items
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or(ShopError::CartItemNotFound { item_id })?;

        let now = Utc::now();
        item.quantity = quantity;
        item.updated_at = now;
        cart.updated_at = now;
        Ok(cart.clone())
    }

    async fn remove_item(&self, user_id: UserId, item_id: CartItemId) -> ShopResult<Cart> {
        let mut carts = self.carts.write().await;
        let cart = carts
            .get_mut(&user_id)
            .ok_or(ShopError::CartItemNotFound { item_id })?;

        let before = cart.items.len();
        cart.items.retain(|i| i.id != item_id);
        if cart.items.len() == before {
            return Err(ShopError::CartItemNotFound { item_id });
        }
        cart.updated_at = Utc::now();
        Ok(cart.clone())
    }

    async fn remove_items(
        &self,
        user_id: UserId,
        items: &[(CartItemId, u32)],
    ) -> ShopResult<Cart> {
        let mut carts = self.carts.write().await;
        let cart = carts
            .entry(user_id)
            .or_insert_with(|| self.new_cart(user_id));
        let now = Utc::now();

        for &(item_id, quantity) in items {
            if let Some(item) = cart.items.iter_mut().find(|i| i.id == item_id) {
                item.quantity = item.quantity.saturating_sub(quantity);
                item.updated_at = now;
            }
        }
        cart.items.retain(|i| i.quantity > 0);
        cart.updated_at = now;
        Ok(cart.clone())
    }

    async fn clear(&self, user_id: UserId) -> ShopResult<()> {
        if let Some(cart) = self.carts.write().await.get_mut(&user_id) {
            cart.items.clear();
            cart.updated_at = Utc::now();
        }
        Ok(())
    }
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn get(&self, id: OrderId) -> ShopResult<Option<Order>> {
        Ok(self.orders.read().await.get(&id).cloned())
    }

    async fn list_by_user(&self, user_id: UserId) -> ShopResult<Vec<Order>> {
        Ok(self
            .orders
            .read()
            .await
            .values()
            .rev()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn create(&self, order: NewOrder) -> ShopResult<Order> {
        let order = Order::from_new(next_id(&self.order_seq), order);
        self.orders.write().await.insert(order.id, order.clone());
        Ok(order)
    }

    async fn update(&self, id: OrderId, update: OrderUpdate) -> ShopResult<Order> {
        let mut orders = self.orders.write().await;
        let order = orders
            .get_mut(&id)
            .ok_or(ShopError::OrderNotFound { order_id: id })?;
        order.apply(&update);
        Ok(order.clone())
    }
}

#[async_trait]
impl WishlistRepository for MemoryStore {
    async fn list(&self, user_id: UserId) -> ShopResult<Vec<WishlistEntry>> {
        Ok(self
            .wishlists
            .read()
            .await
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn add(&self, user_id: UserId, product_id: ProductId) -> ShopResult<bool> {
        let mut wishlists = self.wishlists.write().await;
        let entries = wishlists.entry(user_id).or_default();
        if entries.iter().any(|e| e.product_id == product_id) {
            return Ok(false);
        }
        entries.push(WishlistEntry::new(product_id));
        Ok(true)
    }

    async fn remove(&self, user_id: UserId, product_id: ProductId) -> ShopResult<bool> {
        let mut wishlists = self.wishlists.write().await;
        let Some(entries) = wishlists.get_mut(&user_id) else {
            return Ok(false);
        };
        let before = entries.len();
        entries.retain(|e| e.product_id != product_id);
        Ok(entries.len() != before)
    }

    async fn contains(&self, user_id: UserId, product_id: ProductId) -> ShopResult<bool> {
        Ok(self
            .wishlists
            .read()
            .await
            .get(&user_id)
            .is_some_and(|entries| entries.iter().any(|e| e.product_id == product_id)))
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn get_user(&self, id: UserId) -> ShopResult<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> ShopResult<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn save_profile(&self, id: UserId, profile: UserProfile) -> ShopResult<(User, bool)> {
        let mut users = self.users.write().await;
        if users
            .values()
            .any(|u| u.id != id && u.email.eq_ignore_ascii_case(&profile.email))
        {
            return Err(ShopError::EmailTaken {
                email: profile.email,
            });
        }

        match users.get_mut(&id) {
            Some(user) => {
                user.name = profile.name;
                user.email = profile.email;
                user.updated_at = Utc::now();
                Ok((user.clone(), false))
            }
            None => {
                let user = User::new(id, profile);
                users.insert(id, user.clone());
                Ok((user, true))
            }
        }
    }

    async fn delete_user(&self, id: UserId) -> ShopResult<User> {
        self.users
            .write()
            .await
            .remove(&id)
            .ok_or(ShopError::UserNotFound { user_id: id })
    }
}

#[async_trait]
impl PaymentRepository for MemoryStore {
    async fn save_intent(&self, payment: NewPayment) -> ShopResult<Payment> {
        let payment = Payment::from_new(next_id(&self.payment_seq), payment);
        self.payments
            .write()
            .await
            .insert(payment.id, payment.clone());
        Ok(payment)
    }

    async fn update_by_intent(&self, intent_id: &str, update: PaymentUpdate) -> ShopResult<Payment> {
        let mut payments = self.payments.write().await;
        let payment = payments
            .values_mut()
            .find(|p| p.payment_intent_id == intent_id)
            .ok_or_else(|| ShopError::PaymentNotFound {
                reference: intent_id.to_string(),
            })?;
        payment.apply(&update);
        Ok(payment.clone())
    }

    async fn find_by_intent(&self, intent_id: &str) -> ShopResult<Option<Payment>> {
        Ok(self
            .payments
            .read()
            .await
            .values()
            .find(|p| p.payment_intent_id == intent_id)
            .cloned())
    }

    async fn find_by_order(&self, order_id: OrderId) -> ShopResult<Option<Payment>> {
        Ok(self
            .payments
            .read()
            .await
            .values()
            .rev()
            .find(|p| p.order_id == order_id)
            .cloned())
    }

    async fn list_by_user(&self, user_id: UserId) -> ShopResult<Vec<Payment>> {
        Ok(self
            .payments
            .read()
            .await
            .values()
            .rev()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect())
    }
}
