//! # Pricing Engine
//!
//! Turns a [`CartSnapshot`] into a [`PricedSummary`] under a
//! [`PricingPolicy`]:
//!
//! ```text
//! subtotal     = Σ unit_price × quantity
//! shipping_fee = flat_shipping_cost   if 0 < subtotal <= free_shipping_threshold
//!                0                    otherwise
//! tax_amount   = round(subtotal × tax_rate)
//! total        = subtotal + shipping_fee + tax_amount
//! ```
//!
//! All arithmetic happens in the currency's smallest unit, so the
//! `total` identity holds exactly. The engine is a pure function: no I/O,
//! no shared state, safe to call from any number of tasks.
//!
//! Callers must only pass line items with `quantity >= 1` and a
//! non-negative unit price; both are enforced at the cart mutation
//! boundary and only asserted here in debug builds.

use crate::cart::CartSnapshot;
use crate::error::{ShopError, ShopResult};
use crate::product::{Currency, Price};
use serde::{Deserialize, Serialize};

/// Tax and shipping constants applied to every cart
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricingPolicy {
    /// Fraction of the subtotal charged as tax (0.18 = 18%)
    pub tax_rate: f64,
    /// Shipping charged on non-empty carts at or below the threshold
    pub flat_shipping_cost: f64,
    /// Subtotals strictly above this ship for free
    pub free_shipping_threshold: f64,
}

impl PricingPolicy {
    pub const DEFAULT_TAX_RATE: f64 = 0.18;
    pub const DEFAULT_FLAT_SHIPPING_COST: f64 = 5.99;
    pub const DEFAULT_FREE_SHIPPING_THRESHOLD: f64 = 100.0;

    pub fn new(tax_rate: f64, flat_shipping_cost: f64, free_shipping_threshold: f64) -> Self {
        Self {
            tax_rate,
            flat_shipping_cost,
            free_shipping_threshold,
        }
    }

    /// Builder: override the tax rate
    pub fn with_tax_rate(mut self, tax_rate: f64) -> Self {
        self.tax_rate = tax_rate;
        self
    }

    /// Builder: override the flat shipping cost
    pub fn with_flat_shipping_cost(mut self, cost: f64) -> Self {
        self.flat_shipping_cost = cost;
        self
    }

    /// Builder: override the free shipping threshold
    pub fn with_free_shipping_threshold(mut self, threshold: f64) -> Self {
        self.free_shipping_threshold = threshold;
        self
    }

    /// Reject policies the engine cannot apply meaningfully.
    pub fn validate(&self) -> ShopResult<()> {
        if !self.tax_rate.is_finite() || !(0.0..=1.0).contains(&self.tax_rate) {
            return Err(ShopError::Configuration(format!(
                "tax rate must be between 0 and 1, got {}",
                self.tax_rate
            )));
        }
        if !self.flat_shipping_cost.is_finite() || self.flat_shipping_cost < 0.0 {
            return Err(ShopError::Configuration(format!(
                "flat shipping cost must be non-negative, got {}",
                self.flat_shipping_cost
            )));
        }
        if !self.free_shipping_threshold.is_finite() || self.free_shipping_threshold < 0.0 {
            return Err(ShopError::Configuration(format!(
                "free shipping threshold must be non-negative, got {}",
                self.free_shipping_threshold
            )));
        }
        Ok(())
    }

    /// Shipping fee for a subtotal (in smallest units)
    pub fn shipping_for(&self, subtotal: i64, currency: Currency) -> Price {
        let threshold = currency.to_smallest_unit(self.free_shipping_threshold);
        if subtotal > 0 && subtotal <= threshold {
            Price::from_cents(currency.to_smallest_unit(self.flat_shipping_cost), currency)
        } else {
            Price::zero(currency)
        }
    }

    /// Tax on a subtotal, rounded half away from zero to the smallest unit
    pub fn tax_for(&self, subtotal: i64, currency: Currency) -> Price {
        Price::from_cents((subtotal as f64 * self.tax_rate).round() as i64, currency)
    }

    /// Price a cart under this policy
    pub fn summarize(&self, cart: &CartSnapshot) -> PricedSummary {
        compute_summary(cart, self)
    }
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_TAX_RATE,
            Self::DEFAULT_FLAT_SHIPPING_COST,
            Self::DEFAULT_FREE_SHIPPING_THRESHOLD,
        )
    }
}

/// Derived monetary breakdown of a cart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricedSummary {
    pub subtotal: Price,
    pub shipping_fee: Price,
    pub tax_amount: Price,
    /// Rate the tax was computed with
    pub tax_rate: f64,
    pub total: Price,
}

impl PricedSummary {
    pub fn currency(&self) -> Currency {
        self.total.currency
    }
}

/// Compute subtotal, shipping, tax and total for a cart snapshot.
pub fn compute_summary(cart: &CartSnapshot, policy: &PricingPolicy) -> PricedSummary {
    let currency = cart.currency;

    let subtotal: i64 = cart
        .line_items
        .iter()
        .map(|item| {
            debug_assert!(item.quantity >= 1, "line item quantity must be >= 1");
            debug_assert!(item.unit_price.amount >= 0, "unit price must be >= 0");
            item.total().amount
        })
        .sum();

    let shipping_fee = policy.shipping_for(subtotal, currency);
    let tax_amount = policy.tax_for(subtotal, currency);
    let subtotal = Price::from_cents(subtotal, currency);
    let total = subtotal.plus(&shipping_fee).plus(&tax_amount);

    PricedSummary {
        subtotal,
        shipping_fee,
        tax_amount,
        tax_rate: policy.tax_rate,
        total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::LineItem;
    use crate::product::{Category, Product};

    fn product(id: u64, cents: i64) -> Product {
        let mut p = Product::new(
            format!("Product {}", id),
            Price::from_cents(cents, Currency::USD),
            Category::Electronics,
        );
        p.id = id;
        p
    }

    fn cart(lines: &[(i64, u32)]) -> CartSnapshot {
        lines
            .iter()
            .enumerate()
            .fold(CartSnapshot::new(1, Currency::USD), |cart, (i, (cents, qty))| {
                cart.with_product(&product(i as u64 + 1, *cents), *qty)
            })
    }

    #[test]
    fn test_empty_cart_is_all_zero() {
        let summary = compute_summary(&cart(&[]), &PricingPolicy::default());

        assert!(summary.subtotal.is_zero());
        assert!(summary.shipping_fee.is_zero());
        assert!(summary.tax_amount.is_zero());
        assert!(summary.total.is_zero());
        assert_eq!(summary.tax_rate, 0.18);
    }

    #[test]
    fn test_reference_cart() {
        // 2 × $50 at 18%
        let summary = compute_summary(&cart(&[(5000, 2)]), &PricingPolicy::default());

        assert_eq!(summary.subtotal.amount, 10000);
        assert_eq!(summary.tax_amount.amount, 1800);
        assert_eq!(summary.shipping_fee.amount, 599);
        assert_eq!(summary.total.amount, 12399);
        assert_eq!(summary.total.display(), "$123.99");
    }

    #[test]
    fn test_threshold_is_inclusive_on_charge_side() {
        let policy = PricingPolicy::default();

        let at = compute_summary(&cart(&[(10000, 1)]), &policy);
        assert_eq!(at.shipping_fee.amount, 599);

        let above = compute_summary(&cart(&[(10001, 1)]), &policy);
        assert_eq!(above.shipping_fee.amount, 0);
    }

    #[test]
    fn test_multiple_lines() {
        // $10 × 2 + $25 × 1 = $45
        let summary = compute_summary(&cart(&[(1000, 2), (2500, 1)]), &PricingPolicy::default());

        assert_eq!(summary.subtotal.amount, 4500);
        assert_eq!(summary.tax_amount.amount, 810);
        assert_eq!(summary.shipping_fee.amount, 599);
        assert_eq!(summary.total.amount, 4500 + 810 + 599);
    }

    #[test]
    fn test_tax_rounds_to_nearest_cent() {
        // 333 × 0.18 = 59.94 → 60
        let summary = compute_summary(&cart(&[(333, 1)]), &PricingPolicy::default());
        assert_eq!(summary.tax_amount.amount, 60);

        // 1 × 0.18 = 0.18 → 0
        let summary = compute_summary(&cart(&[(1, 1)]), &PricingPolicy::default());
        assert_eq!(summary.tax_amount.amount, 0);
    }

    #[test]
    fn test_policy_is_injectable() {
        let policy = PricingPolicy::default()
            .with_tax_rate(0.0)
            .with_flat_shipping_cost(10.0)
            .with_free_shipping_threshold(50.0);

        let summary = policy.summarize(&cart(&[(2000, 2)]));
        assert_eq!(summary.tax_amount.amount, 0);
        assert_eq!(summary.shipping_fee.amount, 1000);
        assert_eq!(summary.total.amount, 5000);

        let summary = policy.summarize(&cart(&[(2000, 3)]));
        assert_eq!(summary.shipping_fee.amount, 0);
        assert_eq!(summary.total.amount, 6000);
    }

    #[test]
    fn test_zero_priced_item_ships_free() {
        let summary = compute_summary(&cart(&[(0, 3)]), &PricingPolicy::default());
        assert!(summary.shipping_fee.is_zero());
        assert!(summary.total.is_zero());
    }

    #[test]
    fn test_crossing_free_shipping_can_lower_total() {
        // $99 + $1 = $100 still pays shipping; one more $1 unit drops it.
        let policy = PricingPolicy::default();
        let mut snapshot = cart(&[(9900, 1)]);
        snapshot.push(LineItem::from_product(&product(2, 100), 1));
        let before = compute_summary(&snapshot, &policy);

        snapshot.line_items[1].quantity = 2;
        let after = compute_summary(&snapshot, &policy);

        assert_eq!(before.total.amount, 10000 + 599 + 1800);
        assert_eq!(after.total.amount, 10100 + 1818);
        assert!(after.total.amount < before.total.amount);
    }

    #[test]
    fn test_policy_validation() {
        assert!(PricingPolicy::default().validate().is_ok());
        assert!(PricingPolicy::default().with_tax_rate(-0.1).validate().is_err());
        assert!(PricingPolicy::default().with_tax_rate(1.5).validate().is_err());
        assert!(PricingPolicy::default().with_tax_rate(f64::NAN).validate().is_err());
        assert!(PricingPolicy::default()
            .with_flat_shipping_cost(-1.0)
            .validate()
            .is_err());
        assert!(PricingPolicy::default()
            .with_free_shipping_threshold(f64::INFINITY)
            .validate()
            .is_err());
    }

    #[test]
    fn test_jpy_has_no_minor_unit() {
        let mut snapshot = CartSnapshot::new(1, Currency::JPY);
        let mut p = Product::new("Tea", Price::from_cents(1200, Currency::JPY), Category::Home);
        p.id = 1;
        snapshot.push(LineItem::from_product(&p, 1));

        let policy = PricingPolicy::new(0.1, 500.0, 5000.0);
        let summary = compute_summary(&snapshot, &policy);

        assert_eq!(summary.tax_amount.amount, 120);
        assert_eq!(summary.shipping_fee.amount, 500);
        assert_eq!(summary.total.amount, 1820);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn lines() -> impl Strategy<Value = Vec<(i64, u32)>> {
            prop::collection::vec((0i64..50_000, 1u32..20), 0..8)
        }

        fn policy() -> impl Strategy<Value = PricingPolicy> {
            (0.0f64..=0.5, 0.0f64..50.0, 0.0f64..500.0)
                .prop_map(|(rate, ship, threshold)| PricingPolicy::new(rate, ship, threshold))
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(256))]

            #[test]
            fn total_is_sum_of_parts(lines in lines(), policy in policy()) {
                let s = compute_summary(&cart(&lines), &policy);
                prop_assert_eq!(
                    s.total.amount,
                    s.subtotal.amount + s.shipping_fee.amount + s.tax_amount.amount
                );
            }

            #[test]
            fn tax_is_rounded_subtotal_times_rate(lines in lines(), policy in policy()) {
                let s = compute_summary(&cart(&lines), &policy);
                let exact = s.subtotal.amount as f64 * policy.tax_rate;
                prop_assert!((s.tax_amount.amount as f64 - exact).abs() <= 0.5 + 1e-6);
            }

            #[test]
            fn shipping_follows_threshold(lines in lines(), policy in policy()) {
                let s = compute_summary(&cart(&lines), &policy);
                let threshold = Currency::USD.to_smallest_unit(policy.free_shipping_threshold);
                if s.subtotal.amount == 0 || s.subtotal.amount > threshold {
                    prop_assert_eq!(s.shipping_fee.amount, 0);
                } else {
                    prop_assert_eq!(
                        s.shipping_fee.amount,
                        Currency::USD.to_smallest_unit(policy.flat_shipping_cost)
                    );
                }
            }

            #[test]
            fn summary_is_idempotent(lines in lines(), policy in policy()) {
                let snapshot = cart(&lines);
                prop_assert_eq!(
                    compute_summary(&snapshot, &policy),
                    compute_summary(&snapshot, &policy)
                );
            }

            #[test]
            fn more_quantity_never_lowers_total_on_same_side_of_threshold(
                lines in prop::collection::vec((0i64..50_000, 1u32..20), 1..8),
                pick in any::<prop::sample::Index>(),
                extra in 1u32..10,
                policy in policy(),
            ) {
                let before_cart = cart(&lines);
                let mut after_cart = before_cart.clone();
                let idx = pick.index(after_cart.line_items.len());
                after_cart.line_items[idx].quantity += extra;

                let before = compute_summary(&before_cart, &policy);
                let after = compute_summary(&after_cart, &policy);

                let threshold = Currency::USD.to_smallest_unit(policy.free_shipping_threshold);
                let crossed = before.subtotal.amount <= threshold && after.subtotal.amount > threshold;
                if !crossed {
                    prop_assert!(after.total.amount >= before.total.amount);
                }
            }
        }
    }
}
