//! # Storefront RS
//!
//! Online store backend: catalog, cart pricing and checkout.
//!
//! ## Usage
//!
//! ```bash
//! # Set environment variables
//! export STRIPE_SECRET_KEY=sk_test_...
//! export STRIPE_WEBHOOK_SECRET=whsec_...
//! # or run without a payment processor
//! export PAYMENT_PROVIDER=stub
//!
//! # Run the server
//! storefront
//! ```

use shop_api::{routes, AppConfig, AppState, LogFormat};
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;

    // Initialize logging
    let (text, json) = match config.log_format {
        LogFormat::Text => (Some(fmt::layer()), None),
        LogFormat::Json => (None, Some(fmt::layer().json())),
    };
    tracing_subscriber::registry()
        .with(text)
        .with(json)
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Print banner
    print_banner();

    let addr = config.socket_addr()?;
    let is_prod = config.is_production();

    info!("Environment: {}", config.environment);
    info!(
        "Pricing: tax={} shipping={} free over {} ({})",
        config.pricing.tax_rate,
        config.pricing.flat_shipping_cost,
        config.pricing.free_shipping_threshold,
        config.currency
    );

    // Initialize application state
    let state = AppState::from_config(config).await?;
    let provider = state.payments.gateway().provider_name();
    info!("Products loaded: {}", state.catalog.list_all().await?.len());
    info!("Payment provider: {}", provider);

    let webhook_path = state.payments.gateway().webhook_path();

    // Create router
    let app = routes::create_router(state);

    // Start server
    info!("Storefront starting on http://{}", addr);

    if !is_prod {
        info!("Health: http://{}/health", addr);
        info!("Checkout: POST http://{}/api/v1/orders/checkout", addr);
        info!("Webhook: POST http://{}{}", addr, webhook_path);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
  Storefront RS
  ━━━━━━━━━━━━━━━━━━━━━━━
  Catalog, cart & checkout
  Version: {}

"#,
        env!("CARGO_PKG_VERSION")
    );
}
