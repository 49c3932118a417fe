//! Cart service: mutations at the validation boundary, reads priced by
//! the pricing engine.

use crate::cart::{parse_quantity, Cart, CartItemId, CartSnapshot, LineItem};
use crate::error::{ShopError, ShopResult};
use crate::pricing::{compute_summary, PricedSummary, PricingPolicy};
use crate::product::{Currency, ProductId};
use crate::repository::{SharedCartStore, SharedProductRepository};
use crate::UserId;
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

/// A cart together with its priced lines and summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartView {
    pub cart: Cart,
    pub line_items: Vec<LineItem>,
    pub summary: PricedSummary,
}

pub struct CartService {
    carts: SharedCartStore,
    products: SharedProductRepository,
    policy: PricingPolicy,
    currency: Currency,
}

impl CartService {
    pub fn new(
        carts: SharedCartStore,
        products: SharedProductRepository,
        policy: PricingPolicy,
        currency: Currency,
    ) -> Self {
        Self {
            carts,
            products,
            policy,
            currency,
        }
    }

    pub fn policy(&self) -> &PricingPolicy {
        &self.policy
    }

    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Resolve the stored cart against the catalog at current prices.
    ///
    /// Items whose product is gone (or priced in another currency) are
    /// left out of the snapshot.
    pub async fn snapshot(&self, user_id: UserId) -> ShopResult<(Cart, CartSnapshot)> {
        let cart = self.carts.get_cart(user_id).await?;
        let mut snapshot = CartSnapshot::new(user_id, self.currency);

        for item in &cart.items {
            match self.products.get(item.product_id).await? {
                Some(product) if product.price.currency == self.currency => {
                    snapshot.push(LineItem::from_product(&product, item.quantity).for_cart_item(item.id));
                }
                Some(product) => {
                    warn!(
                        product_id = product.id,
                        currency = %product.price.currency,
                        "Skipping cart item priced in a different currency"
                    );
                }
                None => {
                    warn!(product_id = item.product_id, "Skipping cart item for missing product");
                }
            }
        }

        Ok((cart, snapshot))
    }

    /// The user's cart with line items and a freshly computed summary
    #[instrument(skip(self))]
    pub async fn view(&self, user_id: UserId) -> ShopResult<CartView> {
        let (cart, snapshot) = self.snapshot(user_id).await?;
        let summary = compute_summary(&snapshot, &self.policy);
        Ok(CartView {
            cart,
            line_items: snapshot.line_items,
            summary,
        })
    }

    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i64,
    ) -> ShopResult<CartView> {
        let quantity = parse_quantity(quantity)?;
        if self.products.get(product_id).await?.is_none() {
            return Err(ShopError::ProductNotFound { product_id });
        }

        self.carts.add_item(user_id, product_id, quantity).await?;
        self.view(user_id).await
    }

    #[instrument(skip(self))]
    pub async fn update_quantity(
        &self,
        user_id: UserId,
        item_id: CartItemId,
        quantity: i64,
    ) -> ShopResult<CartView> {
        let quantity = parse_quantity(quantity)?;
        self.carts
            .update_item_quantity(user_id, item_id, quantity)
            .await?;
        self.view(user_id).await
    }

    #[instrument(skip(self))]
    pub async fn remove_item(&self, user_id: UserId, item_id: CartItemId) -> ShopResult<CartView> {
        self.carts.remove_item(user_id, item_id).await?;
        self.view(user_id).await
    }

    #[instrument(skip(self))]
    pub async fn clear(&self, user_id: UserId) -> ShopResult<()> {
        self.carts.clear(user_id).await
    }

    /// Take the lines of a priced snapshot out of the stored cart.
    pub async fn remove_ordered(&self, user_id: UserId, snapshot: &CartSnapshot) -> ShopResult<Cart> {
        let ordered: Vec<(CartItemId, u32)> = snapshot
            .line_items
            .iter()
            .filter_map(|line| line.cart_item_id.map(|id| (id, line.quantity)))
            .collect();
        self.carts.remove_items(user_id, &ordered).await
    }
}
