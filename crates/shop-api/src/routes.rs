//! # Routes
//!
//! Axum router configuration for the store API.

use crate::handlers::{self, cart, orders, payments, products, users, webhooks, wishlist};
use crate::state::AppState;
use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;

/// Create the main application router
///
/// Routes:
/// - Catalog (public): `/api/v1/products[/featured|/category/{category}|/search|/{id}]`
/// - Cart: `/api/v1/cart`, `/api/v1/cart/items[/{id}]`
/// - Orders: `/api/v1/orders`, `/api/v1/orders/checkout`, `/api/v1/orders/{id}`
/// - Wishlist: `/api/v1/wishlist[/{product_id}]`
/// - Profile: `/api/v1/user`
/// - Payments: `/api/v1/payments/...`
/// - Webhooks: `POST /webhooks/{provider}`
///
/// Everything except the catalog, health and webhooks requires `X-User-Id`.
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    let product_routes = Router::new()
        .route("/", get(products::list_products))
        .route("/featured", get(products::featured_products))
        .route("/category/{category}", get(products::products_by_category))
        .route("/search", get(products::search_products))
        .route("/{product_id}", get(products::get_product));

    let cart_routes = Router::new()
        .route("/", get(cart::view_cart).delete(cart::clear_cart))
        .route("/items", post(cart::add_item))
        .route(
            "/items/{item_id}",
            put(cart::update_item).delete(cart::remove_item),
        );

    let order_routes = Router::new()
        .route("/", get(orders::list_orders).post(orders::place_order))
        .route("/checkout", post(orders::checkout))
        .route("/{order_id}", get(orders::get_order));

    let wishlist_routes = Router::new()
        .route(
            "/",
            get(wishlist::list_wishlist).post(wishlist::add_to_wishlist),
        )
        .route(
            "/{product_id}",
            get(wishlist::wishlist_contains).delete(wishlist::remove_from_wishlist),
        );

    let payment_routes = Router::new()
        .route("/intents", post(payments::create_intent))
        .route("/intents/{intent_id}", get(payments::intent_status))
        .route("/intents/{intent_id}/confirm", post(payments::confirm_intent))
        .route("/intents/{intent_id}/cancel", post(payments::cancel_intent))
        .route("/orders/{order_id}", get(payments::payment_for_order))
        .route(
            "/orders/{order_id}/confirm",
            post(payments::confirm_order_payment),
        )
        .route("/history", get(payments::payment_history));

    let api_routes = Router::new()
        .nest("/products", product_routes)
        .nest("/cart", cart_routes)
        .nest("/orders", order_routes)
        .nest("/wishlist", wishlist_routes)
        .nest("/payments", payment_routes)
        .route(
            "/user",
            get(users::get_user)
                .put(users::put_user)
                .delete(users::delete_user),
        );

    // Webhook routes (no CORS, must accept raw body)
    let webhook_routes = Router::new().route("/{provider}", post(webhooks::payment_webhook));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/", get(handlers::health))
        .nest("/api/v1", api_routes.layer(cors))
        .nest("/webhooks", webhook_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(crate::extract::USER_ID_HEADER),
        ])
}
