use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{
    BrowseParams, HomeProducts, ProductForm, ProductPage, SearchParams, FEATURED_LIMIT,
    NEW_ARRIVALS_LIMIT, PAGE_SIZE,
};
use super::repo::{self, Product, ProductFilter};
use super::services;
use crate::auth::extractors::AdminUser;
use crate::error::ApiError;
use crate::state::AppState;

fn active_only() -> ProductFilter {
    ProductFilter {
        active_only: true,
        ..Default::default()
    }
}

fn window(page: i64, per_page: i64) -> (i64, i64, i64) {
    let page = page.max(1);
    let per_page = per_page.clamp(1, 100);
    (page, per_page, (page - 1) * per_page)
}

/// Two fixed-size reads for the landing page, both newest first.
#[instrument(skip(state))]
pub async fn home(State(state): State<AppState>) -> Result<Json<HomeProducts>, ApiError> {
    let (featured, _) = repo::list(&state.db, &active_only(), FEATURED_LIMIT, 0).await?;
    let (new_arrivals, _) = repo::list(&state.db, &active_only(), NEW_ARRIVALS_LIMIT, 0).await?;
    Ok(Json(HomeProducts {
        featured,
        new_arrivals,
    }))
}

#[instrument(skip(state))]
pub async fn browse(
    State(state): State<AppState>,
    Query(params): Query<BrowseParams>,
) -> Result<Json<ProductPage>, ApiError> {
    let (page, per_page, offset) = window(params.page, params.per_page);
    let filter = ProductFilter {
        category: params.category.filter(|c| !c.is_empty()),
        name_query: params.q.filter(|q| !q.trim().is_empty()),
        tags: params
            .tags
            .map(|t| services::normalize_tags(&t))
            .unwrap_or_default(),
        ..active_only()
    };
    let (products, total) = repo::list(&state.db, &filter, per_page, offset).await?;
    Ok(Json(ProductPage::new(products, total, page, per_page)))
}

/// OR-combined substring search across name, description and category. An
/// empty query answers an empty page without touching the database.
#[instrument(skip(state))]
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<ProductPage>, ApiError> {
    let q = params.q.trim();
    if q.is_empty() {
        return Ok(Json(ProductPage::empty()));
    }

    let (page, per_page, offset) = window(params.page, PAGE_SIZE);
    let filter = ProductFilter {
        search: Some(q.to_string()),
        ..active_only()
    };
    let (products, total) = repo::list(&state.db, &filter, per_page, offset).await?;
    Ok(Json(ProductPage::new(products, total, page, per_page)))
}

#[instrument(skip(state))]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Product>, ApiError> {
    let product = repo::get_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("product not found".into()))?;
    Ok(Json(product))
}

#[instrument(skip(state))]
pub async fn categories(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    let cats = repo::distinct_categories(&state.db, true).await?;
    Ok(Json(cats))
}

// --- admin ---

#[instrument(skip_all)]
pub async fn create_product(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Json(form): Json<ProductForm>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let product = services::create_product(&state, form).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

#[instrument(skip_all, fields(%id))]
pub async fn update_product(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(form): Json<ProductForm>,
) -> Result<Json<Product>, ApiError> {
    let product = services::update_product(&state, id, form).await?;
    Ok(Json(product))
}

#[instrument(skip_all, fields(%id))]
pub async fn delete_product(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    services::delete_product(&state, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
