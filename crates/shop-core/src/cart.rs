//! # Cart Types
//!
//! A stored [`Cart`] only records which products a user picked and how
//! many. Prices are attached when the cart is read: the cart service
//! resolves every item against the catalog and hands the resulting
//! [`CartSnapshot`] to the pricing engine.

use crate::error::{ShopError, ShopResult};
use crate::product::{Currency, Price, Product, ProductId};
use crate::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type CartId = u64;
pub type CartItemId = u64;

/// Validate a client-supplied quantity and narrow it to `u32`.
///
/// Zero and negative quantities are rejected here so they never reach
/// the pricing engine.
pub fn parse_quantity(quantity: i64) -> ShopResult<u32> {
    if quantity < 1 {
        return Err(ShopError::InvalidQuantity { quantity });
    }
    u32::try_from(quantity).map_err(|_| ShopError::InvalidQuantity { quantity })
}

/// One stored cart row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A user's cart as persisted by the cart store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub id: CartId,
    pub user_id: UserId,
    /// Items in insertion order
    pub items: Vec<CartItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    /// Create an empty cart for a user
    pub fn new(id: CartId, user_id: UserId) -> Self {
        let now = Utc::now();
        Self {
            id,
            user_id,
            items: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item(&self, item_id: CartItemId) -> Option<&CartItem> {
        self.items.iter().find(|i| i.id == item_id)
    }

    pub fn item_for_product(&self, product_id: ProductId) -> Option<&CartItem> {
        self.items.iter().find(|i| i.product_id == product_id)
    }
}

/// A product-quantity pairing priced at evaluation time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Cart row this line was built from, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cart_item_id: Option<CartItemId>,

    pub product_id: ProductId,

    /// Product name (denormalized for display)
    pub name: String,

    /// Authoritative unit price at the time the snapshot was taken
    pub unit_price: Price,

    pub quantity: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl LineItem {
    /// Create a line item from a product
    pub fn from_product(product: &Product, quantity: u32) -> Self {
        Self {
            cart_item_id: None,
            product_id: product.id,
            name: product.name.clone(),
            unit_price: product.price.clone(),
            quantity,
            image_url: product.image_url.clone(),
        }
    }

    /// Attach the originating cart row
    pub fn for_cart_item(mut self, item_id: CartItemId) -> Self {
        self.cart_item_id = Some(item_id);
        self
    }

    /// Calculate the total price for this line item
    pub fn total(&self) -> Price {
        Price {
            amount: self.unit_price.amount * self.quantity as i64,
            currency: self.unit_price.currency,
        }
    }
}

/// The priced input to the pricing engine: one user's line items
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartSnapshot {
    pub user_id: UserId,
    pub currency: Currency,
    pub line_items: Vec<LineItem>,
}

impl CartSnapshot {
    pub fn new(user_id: UserId, currency: Currency) -> Self {
        Self {
            user_id,
            currency,
            line_items: Vec::new(),
        }
    }

    /// Add a line item
    pub fn push(&mut self, item: LineItem) {
        debug_assert_eq!(item.unit_price.currency, self.currency, "currency mismatch");
        self.line_items.push(item);
    }

    /// Builder: add a product with quantity
    pub fn with_product(mut self, product: &Product, quantity: u32) -> Self {
        self.push(LineItem::from_product(product, quantity));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.line_items.is_empty()
    }

    /// Total number of units across all lines
    pub fn item_count(&self) -> u32 {
        self.line_items.iter().map(|i| i.quantity).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::Category;

    fn product(id: ProductId, dollars: f64) -> Product {
        let mut p = Product::new(format!("P{}", id), Price::new(dollars, Currency::USD), Category::Home);
        p.id = id;
        p
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity(1).unwrap(), 1);
        assert_eq!(parse_quantity(42).unwrap(), 42);
        assert!(matches!(
            parse_quantity(0),
            Err(ShopError::InvalidQuantity { quantity: 0 })
        ));
        assert!(matches!(
            parse_quantity(-3),
            Err(ShopError::InvalidQuantity { quantity: -3 })
        ));
        assert!(parse_quantity(i64::from(u32::MAX) + 1).is_err());
    }

    #[test]
    fn test_line_item_total() {
        let item = LineItem::from_product(&product(1, 10.0), 3);
        assert_eq!(item.total().amount, 3000);
        assert_eq!(item.cart_item_id, None);
        assert_eq!(item.for_cart_item(9).cart_item_id, Some(9));
    }

    #[test]
    fn test_snapshot_item_count() {
        let snapshot = CartSnapshot::new(1, Currency::USD)
            .with_product(&product(1, 10.0), 2)
            .with_product(&product(2, 25.0), 1);

        assert_eq!(snapshot.item_count(), 3);
        assert!(!snapshot.is_empty());
        assert!(CartSnapshot::new(1, Currency::USD).is_empty());
    }

    #[test]
    fn test_cart_lookup() {
        let mut cart = Cart::new(1, 7);
        let now = Utc::now();
        cart.items.push(CartItem {
            id: 11,
            product_id: 3,
            quantity: 2,
            created_at: now,
            updated_at: now,
        });

        assert_eq!(cart.item(11).map(|i| i.product_id), Some(3));
        assert_eq!(cart.item_for_product(3).map(|i| i.id), Some(11));
        assert!(cart.item(12).is_none());
    }
}
