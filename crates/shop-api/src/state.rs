//! # Application State
//!
//! Shared state for the Axum application: configuration plus the store
//! services, wired over the in-memory store behind read-through caches.

use shop_core::{
    BoxedPaymentGateway, CacheLayer, CachedCartStore, CachedOrderRepository,
    CachedProductRepository, CachedUserRepository, CachedWishlistRepository, CartService,
    CatalogService, CheckoutOrchestrator, Currency, MemoryCache, MemoryStore, PaymentService,
    PricingPolicy, ProductCatalog, ShopError, StubGateway, UserService, WishlistService,
};
use shop_stripe::StripePaymentGateway;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Which gateway processes payments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentProvider {
    Stripe,
    /// In-process gateway for development
    Stub,
}

impl FromStr for PaymentProvider {
    type Err = ShopError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stripe" => Ok(PaymentProvider::Stripe),
            "stub" => Ok(PaymentProvider::Stub),
            other => Err(ShopError::Configuration(format!(
                "Unknown PAYMENT_PROVIDER '{}' (expected stripe or stub)",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = ShopError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(ShopError::Configuration(format!(
                "Unknown LOG_FORMAT '{}' (expected text or json)",
                other
            ))),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Environment (development, staging, production)
    pub environment: String,
    /// Store currency
    pub currency: Currency,
    pub pricing: PricingPolicy,
    pub cache_ttl: Duration,
    /// Seed catalog location
    pub products_path: PathBuf,
    pub payment_provider: PaymentProvider,
    /// Allowed CORS origins
    pub cors_origins: Vec<String>,
    pub log_format: LogFormat,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            environment: "development".to_string(),
            currency: Currency::USD,
            pricing: PricingPolicy::default(),
            cache_ttl: shop_core::cache::DEFAULT_TTL,
            products_path: PathBuf::from("config/products.toml"),
            payment_provider: PaymentProvider::Stripe,
            cors_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:5173".to_string(),
            ],
            log_format: LogFormat::Text,
        }
    }
}

impl AppConfig {
    /// Load from environment variables (and `.env` if present)
    pub fn from_env() -> Result<Self, ShopError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key/value source; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ShopError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let pricing = PricingPolicy::new(
            parse_var(&lookup, "TAX_RATE", defaults.pricing.tax_rate)?,
            parse_var(&lookup, "FLAT_SHIPPING_COST", defaults.pricing.flat_shipping_cost)?,
            parse_var(
                &lookup,
                "FREE_SHIPPING_THRESHOLD",
                defaults.pricing.free_shipping_threshold,
            )?,
        );
        pricing.validate()?;

        let cors_origins = match lookup("CORS_ORIGINS") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect(),
            None => defaults.cors_origins,
        };

        Ok(Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_var(&lookup, "PORT", defaults.port)?,
            environment: lookup("ENVIRONMENT").unwrap_or(defaults.environment),
            currency: parse_var(&lookup, "CURRENCY", defaults.currency)?,
            pricing,
            cache_ttl: Duration::from_secs(parse_var(
                &lookup,
                "CACHE_TTL_SECS",
                defaults.cache_ttl.as_secs(),
            )?),
            products_path: lookup("PRODUCTS_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.products_path),
            payment_provider: parse_var(&lookup, "PAYMENT_PROVIDER", defaults.payment_provider)?,
            cors_origins,
            log_format: parse_var(&lookup, "LOG_FORMAT", defaults.log_format)?,
        })
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> Result<SocketAddr, ShopError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| ShopError::Configuration(format!("Invalid socket address: {}", e)))
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn parse_var<T, F>(lookup: &F, key: &str, default: T) -> Result<T, ShopError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ShopError::Configuration(format!("Invalid {}: '{}'", key, raw))),
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub catalog: Arc<CatalogService>,
    pub carts: Arc<CartService>,
    pub checkout: Arc<CheckoutOrchestrator>,
    pub payments: Arc<PaymentService>,
    pub wishlist: Arc<WishlistService>,
    pub users: Arc<UserService>,
}

impl AppState {
    /// Build state from the environment and seed the catalog
    pub async fn new() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;
        Self::from_config(config).await
    }

    pub async fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let gateway: BoxedPaymentGateway = match config.payment_provider {
            PaymentProvider::Stripe => {
                let stripe = StripePaymentGateway::from_env()
                    .map_err(|e| anyhow::anyhow!("Failed to initialize Stripe: {}", e))?;
                if stripe.config().is_live_mode() && !config.is_production() {
                    warn!("Using live Stripe keys outside production");
                }
                Arc::new(stripe)
            }
            PaymentProvider::Stub => {
                warn!("Using stub payment gateway; no real payments will be taken");
                Arc::new(StubGateway::new())
            }
        };

        let catalog = load_product_catalog(&config.products_path)?;
        let state = Self::with_gateway(config, gateway);
        state.catalog.seed(catalog).await?;
        Ok(state)
    }

    /// Wire the services over a fresh in-memory store.
    pub fn with_gateway(config: AppConfig, gateway: BoxedPaymentGateway) -> Self {
        let store = Arc::new(MemoryStore::new());
        let cache = CacheLayer::new(Arc::new(MemoryCache::new(config.cache_ttl)));

        let products = Arc::new(CachedProductRepository::new(store.clone(), cache.clone()));
        let carts = Arc::new(CachedCartStore::new(store.clone(), cache.clone()));
        let orders = Arc::new(CachedOrderRepository::new(store.clone(), cache.clone()));
        let wishlist = Arc::new(CachedWishlistRepository::new(store.clone(), cache.clone()));
        let users = Arc::new(CachedUserRepository::new(store.clone(), cache));

        let cart_service = Arc::new(CartService::new(
            carts,
            products.clone(),
            config.pricing,
            config.currency,
        ));
        let payments = Arc::new(PaymentService::new(gateway, store, orders.clone()));
        let checkout = Arc::new(CheckoutOrchestrator::new(
            cart_service.clone(),
            orders,
            payments.clone(),
        ));

        Self {
            config: Arc::new(config),
            catalog: Arc::new(CatalogService::new(products.clone())),
            carts: cart_service,
            checkout,
            payments,
            wishlist: Arc::new(WishlistService::new(wishlist, products)),
            users: Arc::new(UserService::new(users)),
        }
    }
}

/// Load the seed catalog; a missing file yields an empty catalog.
pub fn load_product_catalog(path: &Path) -> anyhow::Result<ProductCatalog> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("No product catalog at {}, using empty catalog", path.display());
            return Ok(ProductCatalog::new());
        }
        Err(e) => return Err(anyhow::anyhow!("Failed to read {}: {}", path.display(), e)),
    };

    let catalog = ProductCatalog::from_toml(&content)
        .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path.display(), e))?;
    info!("Loaded {} products from {}", catalog.products.len(), path.display());
    Ok(catalog)
}
