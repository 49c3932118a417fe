//! Catalog endpoints (public).

use super::{shop_error_to_response, ApiError};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use shop_core::{Product, ProductId};

#[derive(Debug, Serialize)]
pub struct ProductList {
    pub products: Vec<Product>,
    pub count: usize,
}

impl From<Vec<Product>> for ProductList {
    fn from(products: Vec<Product>) -> Self {
        Self {
            count: products.len(),
            products,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: String,
}

pub async fn list_products(State(state): State<AppState>) -> Result<Json<ProductList>, ApiError> {
    let products = state
        .catalog
        .list_all()
        .await
        .map_err(shop_error_to_response)?;
    Ok(Json(products.into()))
}

pub async fn featured_products(
    State(state): State<AppState>,
) -> Result<Json<ProductList>, ApiError> {
    let products = state
        .catalog
        .featured()
        .await
        .map_err(shop_error_to_response)?;
    Ok(Json(products.into()))
}

pub async fn products_by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Result<Json<ProductList>, ApiError> {
    let products = state
        .catalog
        .by_category(&category)
        .await
        .map_err(shop_error_to_response)?;
    Ok(Json(products.into()))
}

pub async fn search_products(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<ProductList>, ApiError> {
    let products = state
        .catalog
        .search(&params.query)
        .await
        .map_err(shop_error_to_response)?;
    Ok(Json(products.into()))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<ProductId>,
) -> Result<Json<Product>, ApiError> {
    let product = state
        .catalog
        .get(product_id)
        .await
        .map_err(shop_error_to_response)?;
    Ok(Json(product))
}
