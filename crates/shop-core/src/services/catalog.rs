//! Catalog service: read access to products plus startup seeding.

use crate::error::{ShopError, ShopResult};
use crate::product::{Category, Product, ProductCatalog, ProductId};
use crate::repository::SharedProductRepository;
use tracing::info;

pub struct CatalogService {
    products: SharedProductRepository,
}

impl CatalogService {
    pub fn new(products: SharedProductRepository) -> Self {
        Self { products }
    }

    pub async fn get(&self, product_id: ProductId) -> ShopResult<Product> {
        self.products
            .get(product_id)
            .await?
            .ok_or(ShopError::ProductNotFound { product_id })
    }

    pub async fn list_all(&self) -> ShopResult<Vec<Product>> {
        self.products.list_all().await
    }

    pub async fn featured(&self) -> ShopResult<Vec<Product>> {
        self.products.list_featured().await
    }

    /// `category` is matched case-insensitively
    pub async fn by_category(&self, category: &str) -> ShopResult<Vec<Product>> {
        let category: Category = category.parse()?;
        self.products.list_by_category(category).await
    }

    pub async fn search(&self, query: &str) -> ShopResult<Vec<Product>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(ShopError::InvalidRequest(
                "Search query is required".to_string(),
            ));
        }
        self.products.search(query).await
    }

    /// Store every product of a seed catalog
    pub async fn seed(&self, catalog: ProductCatalog) -> ShopResult<usize> {
        if catalog.products.is_empty() {
            return Ok(0);
        }
        let created = self.products.bulk_create(catalog.products).await?;
        info!("Seeded {} products", created.len());
        Ok(created.len())
    }
}
