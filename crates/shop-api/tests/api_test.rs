use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::{json, Value};
use shop_api::{create_router, AppConfig, AppState, PaymentProvider};
use shop_core::{Category, Currency, Price, Product, ProductCatalog, StubGateway};
use std::sync::Arc;

const USER_HEADER: HeaderName = HeaderName::from_static("x-user-id");

struct TestApp {
    server: TestServer,
    gateway: Arc<StubGateway>,
}

fn user(id: &'static str) -> HeaderValue {
    HeaderValue::from_static(id)
}

async fn app() -> TestApp {
    let config = AppConfig {
        payment_provider: PaymentProvider::Stub,
        ..AppConfig::default()
    };
    let gateway = Arc::new(StubGateway::new());
    let state = AppState::with_gateway(config, gateway.clone());

    let mut catalog = ProductCatalog::new();
    catalog.add(
        Product::new(
            "Wireless Headphones",
            Price::new(50.0, Currency::USD),
            Category::Electronics,
        )
        .with_description("Noise cancelling")
        .featured(),
    );
    catalog.add(Product::new(
        "Desk Lamp",
        Price::new(1.0, Currency::USD),
        Category::Home,
    ));
    state.catalog.seed(catalog).await.unwrap();

    TestApp {
        server: TestServer::new(create_router(state)).unwrap(),
        gateway,
    }
}

impl TestApp {
    async fn add_to_cart(&self, user_id: &'static str, product_id: u64, quantity: i64) -> Value {
        let response = self
            .server
            .post("/api/v1/cart/items")
            .add_header(USER_HEADER, user(user_id))
            .json(&json!({ "product_id": product_id, "quantity": quantity }))
            .await;
        response.assert_status(StatusCode::CREATED);
        response.json::<Value>()
    }

    async fn webhook(&self, signature: &'static str, event: Value) -> axum_test::TestResponse {
        self.server
            .post("/webhooks/stub")
            .add_header(
                HeaderName::from_static("x-stub-signature"),
                HeaderValue::from_static(signature),
            )
            .bytes(serde_json::to_vec(&event).unwrap().into())
            .await
    }
}

#[tokio::test]
async fn test_health() {
    let app = app().await;
    let response = app.server.get("/health").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["status"], "healthy");
}

#[tokio::test]
async fn test_catalog_endpoints() {
    let app = app().await;

    let all = app.server.get("/api/v1/products").await.json::<Value>();
    assert_eq!(all["count"], 2);

    let featured = app.server.get("/api/v1/products/featured").await.json::<Value>();
    assert_eq!(featured["count"], 1);
    assert_eq!(featured["products"][0]["name"], "Wireless Headphones");

    let home = app
        .server
        .get("/api/v1/products/category/home")
        .await
        .json::<Value>();
    assert_eq!(home["count"], 1);

    let found = app
        .server
        .get("/api/v1/products/search")
        .add_query_param("query", "NOISE")
        .await
        .json::<Value>();
    assert_eq!(found["count"], 1);

    app.server
        .get("/api/v1/products/search")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    app.server
        .get("/api/v1/products/category/garden")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    app.server
        .get("/api/v1/products/99")
        .await
        .assert_status(StatusCode::NOT_FOUND);
    app.server.get("/api/v1/products/1").await.assert_status_ok();
}

#[tokio::test]
async fn test_cart_requires_user() {
    let app = app().await;

    app.server
        .get("/api/v1/cart")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    app.server
        .get("/api/v1/cart")
        .add_header(USER_HEADER, user("alice"))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_cart_is_priced() {
    let app = app().await;

    let view = app.add_to_cart("1", 1, 2).await;
    assert_eq!(view["summary"]["subtotal"]["amount"], 10000);
    assert_eq!(view["summary"]["shipping_fee"]["amount"], 599);
    assert_eq!(view["summary"]["tax_amount"]["amount"], 1800);
    assert_eq!(view["summary"]["total"]["amount"], 12399);

    // Crossing the threshold drops shipping
    let view = app.add_to_cart("1", 2, 1).await;
    assert_eq!(view["summary"]["subtotal"]["amount"], 10100);
    assert_eq!(view["summary"]["shipping_fee"]["amount"], 0);
    assert_eq!(view["summary"]["total"]["amount"], 11918);

    let item_id = view["cart"]["items"][1]["id"].as_u64().unwrap();
    let updated = app
        .server
        .put(&format!("/api/v1/cart/items/{}", item_id))
        .add_header(USER_HEADER, user("1"))
        .json(&json!({ "quantity": 0 }))
        .await;
    updated.assert_status(StatusCode::BAD_REQUEST);

    let removed = app
        .server
        .delete(&format!("/api/v1/cart/items/{}", item_id))
        .add_header(USER_HEADER, user("1"))
        .await;
    removed.assert_status_ok();
    assert_eq!(removed.json::<Value>()["summary"]["total"]["amount"], 12399);

    // Another user's item id is not found
    app.server
        .delete(&format!("/api/v1/cart/items/{}", item_id))
        .add_header(USER_HEADER, user("2"))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_add_invalid_items() {
    let app = app().await;

    app.server
        .post("/api/v1/cart/items")
        .add_header(USER_HEADER, user("1"))
        .json(&json!({ "product_id": 1, "quantity": -1 }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    app.server
        .post("/api/v1/cart/items")
        .add_header(USER_HEADER, user("1"))
        .json(&json!({ "product_id": 42, "quantity": 1 }))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_checkout_and_webhook() {
    let app = app().await;
    app.add_to_cart("1", 1, 2).await;

    let response = app
        .server
        .post("/api/v1/orders/checkout")
        .add_header(USER_HEADER, user("1"))
        .await;
    response.assert_status(StatusCode::CREATED);
    let receipt = response.json::<Value>();
    assert_eq!(receipt["order"]["total"]["amount"], 12399);
    assert_eq!(receipt["order"]["status"], "pending");
    assert_eq!(receipt["client_secret"], "pi_stub_1_secret_stub");
    let order_id = receipt["order"]["id"].as_u64().unwrap();

    let cart = app
        .server
        .get("/api/v1/cart")
        .add_header(USER_HEADER, user("1"))
        .await
        .json::<Value>();
    assert_eq!(cart["cart"]["items"].as_array().unwrap().len(), 0);
    assert_eq!(cart["summary"]["total"]["amount"], 0);

    let event = json!({
        "event_id": "evt_1",
        "event_type": "payment_intent.succeeded",
        "payment_intent_id": "pi_stub_1",
        "order_id": order_id,
    });
    app.webhook("wrong", event.clone())
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    let ack = app.webhook("whsec_stub", event).await;
    ack.assert_status_ok();
    assert_eq!(ack.json::<Value>()["event_id"], "evt_1");

    let order = app
        .server
        .get(&format!("/api/v1/orders/{}", order_id))
        .add_header(USER_HEADER, user("1"))
        .await
        .json::<Value>();
    assert_eq!(order["status"], "processing");
    assert_eq!(order["payment_status"], "succeeded");

    // A late failure does not undo the success
    app.webhook(
        "whsec_stub",
        json!({
            "event_id": "evt_2",
            "event_type": "payment_intent.payment_failed",
            "payment_intent_id": "pi_stub_1",
            "failure_code": "card_declined",
        }),
    )
    .await
    .assert_status_ok();
    let payment = app
        .server
        .get(&format!("/api/v1/payments/orders/{}", order_id))
        .add_header(USER_HEADER, user("1"))
        .await
        .json::<Value>();
    assert_eq!(payment["status"], "succeeded");

    // Orders are private to their owner
    app.server
        .get(&format!("/api/v1/orders/{}", order_id))
        .add_header(USER_HEADER, user("2"))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_checkout_empty_cart() {
    let app = app().await;

    let response = app
        .server
        .post("/api/v1/orders/checkout")
        .add_header(USER_HEADER, user("1"))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert!(response.json::<Value>().get("order").is_none());

    let orders = app
        .server
        .get("/api/v1/orders")
        .add_header(USER_HEADER, user("1"))
        .await
        .json::<Value>();
    assert_eq!(orders.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_failed_intent_keeps_order_for_retry() {
    let app = app().await;
    app.add_to_cart("1", 1, 1).await;
    app.gateway.set_fail_next(true);

    let response = app
        .server
        .post("/api/v1/orders/checkout")
        .add_header(USER_HEADER, user("1"))
        .await;
    response.assert_status(StatusCode::BAD_GATEWAY);
    let body = response.json::<Value>();
    assert_eq!(body["code"], 502);
    assert_eq!(body["order"]["payment_status"], "failed");
    let order_id = body["order"]["id"].as_u64().unwrap();

    // The cart still holds the items
    let cart = app
        .server
        .get("/api/v1/cart")
        .add_header(USER_HEADER, user("1"))
        .await
        .json::<Value>();
    assert_eq!(cart["cart"]["items"].as_array().unwrap().len(), 1);

    let retry = app
        .server
        .post("/api/v1/payments/intents")
        .add_header(USER_HEADER, user("1"))
        .json(&json!({ "order_id": order_id }))
        .await;
    retry.assert_status(StatusCode::CREATED);
    let receipt = retry.json::<Value>();
    assert_eq!(receipt["order"]["id"], order_id);
    assert_eq!(receipt["order"]["payment_intent_id"], "pi_stub_1");

    let confirmed = app
        .server
        .post("/api/v1/payments/intents/pi_stub_1/confirm")
        .add_header(USER_HEADER, user("1"))
        .await;
    confirmed.assert_status_ok();
    assert_eq!(confirmed.json::<Value>()["status"], "succeeded");

    let history = app
        .server
        .get("/api/v1/payments/history")
        .add_header(USER_HEADER, user("1"))
        .await
        .json::<Value>();
    assert_eq!(history.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_place_order_without_payment() {
    let app = app().await;
    app.add_to_cart("3", 2, 4).await;

    let response = app
        .server
        .post("/api/v1/orders")
        .add_header(USER_HEADER, user("3"))
        .await;
    response.assert_status(StatusCode::CREATED);
    let order = response.json::<Value>();
    assert_eq!(order["subtotal"]["amount"], 400);
    assert_eq!(order["shipping"]["amount"], 599);
    assert_eq!(order["tax"]["amount"], 72);
    assert_eq!(order["total"]["amount"], 1071);
    assert!(order.get("payment_intent_id").is_none());
    assert_eq!(app.gateway.intent_count().await, 0);
}

#[tokio::test]
async fn test_unknown_webhook_provider() {
    let app = app().await;
    app.server
        .post("/webhooks/paypal")
        .text("{}")
        .await
        .assert_status(StatusCode::NOT_FOUND);
    app.server
        .post("/webhooks/stub")
        .text("{}")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_wishlist() {
    let app = app().await;

    let added = app
        .server
        .post("/api/v1/wishlist")
        .add_header(USER_HEADER, user("1"))
        .json(&json!({ "product_id": 2 }))
        .await;
    added.assert_status(StatusCode::CREATED);
    app.server
        .post("/api/v1/wishlist")
        .add_header(USER_HEADER, user("1"))
        .json(&json!({ "product_id": 2 }))
        .await
        .assert_status_ok();
    app.server
        .post("/api/v1/wishlist")
        .add_header(USER_HEADER, user("1"))
        .json(&json!({ "product_id": 99 }))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let list = app
        .server
        .get("/api/v1/wishlist")
        .add_header(USER_HEADER, user("1"))
        .await
        .json::<Value>();
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["product"]["name"], "Desk Lamp");

    let contains = app
        .server
        .get("/api/v1/wishlist/2")
        .add_header(USER_HEADER, user("1"))
        .await
        .json::<Value>();
    assert_eq!(contains["in_wishlist"], true);

    app.server
        .delete("/api/v1/wishlist/2")
        .add_header(USER_HEADER, user("1"))
        .await
        .assert_status(StatusCode::NO_CONTENT);
    app.server
        .delete("/api/v1/wishlist/2")
        .add_header(USER_HEADER, user("1"))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_user_profile() {
    let app = app().await;

    app.server
        .get("/api/v1/user")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    app.server
        .get("/api/v1/user")
        .add_header(USER_HEADER, user("1"))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let created = app
        .server
        .put("/api/v1/user")
        .add_header(USER_HEADER, user("1"))
        .json(&json!({ "name": "Ada", "email": "Ada@Example.com" }))
        .await;
    created.assert_status(StatusCode::CREATED);
    let body = created.json::<Value>();
    assert_eq!(body["id"], 1);
    assert_eq!(body["email"], "ada@example.com");
    assert_eq!(body["role"], "customer");

    let updated = app
        .server
        .put("/api/v1/user")
        .add_header(USER_HEADER, user("1"))
        .json(&json!({ "name": "Ada Lovelace", "email": "ada@example.com" }))
        .await;
    updated.assert_status_ok();

    let fetched = app
        .server
        .get("/api/v1/user")
        .add_header(USER_HEADER, user("1"))
        .await
        .json::<Value>();
    assert_eq!(fetched["name"], "Ada Lovelace");

    app.server
        .put("/api/v1/user")
        .add_header(USER_HEADER, user("2"))
        .json(&json!({ "name": "Bob", "email": "ada@example.com" }))
        .await
        .assert_status(StatusCode::CONFLICT);
    app.server
        .put("/api/v1/user")
        .add_header(USER_HEADER, user("2"))
        .json(&json!({ "name": "Bob", "email": "bob" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    app.server
        .delete("/api/v1/user")
        .add_header(USER_HEADER, user("1"))
        .await
        .assert_status(StatusCode::NO_CONTENT);
    app.server
        .get("/api/v1/user")
        .add_header(USER_HEADER, user("1"))
        .await
        .assert_status(StatusCode::NOT_FOUND);
    app.server
        .delete("/api/v1/user")
        .add_header(USER_HEADER, user("1"))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}
