//! Application services composed from the repositories, the pricing
//! engine and the payment gateway.

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod payments;
pub mod users;
pub mod wishlist;

pub use cart::{CartService, CartView};
pub use catalog::CatalogService;
pub use checkout::{CheckoutFailure, CheckoutOrchestrator, CheckoutReceipt};
pub use payments::{IntentReceipt, PaymentService};
pub use users::UserService;
pub use wishlist::WishlistService;
