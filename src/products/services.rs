use uuid::Uuid;

use super::dto::ProductForm;
use super::repo::{self, Product, ProductData};
use crate::error::ApiError;
use crate::images;
use crate::state::AppState;

const DEFAULT_BUCKET: &str = "products";

/// Comma-split, trimmed, empties dropped; order preserved.
pub fn normalize_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

fn validate(form: ProductForm) -> Result<ProductData, ApiError> {
    let name = form.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::BadRequest("name is required".into()));
    }
    let affiliate_url = form.affiliate_url.trim().to_string();
    if affiliate_url.is_empty() {
        return Err(ApiError::BadRequest("affiliate_url is required".into()));
    }

    Ok(ProductData {
        name,
        description: form.description.filter(|v| !v.trim().is_empty()),
        category: form.category.filter(|v| !v.trim().is_empty()),
        affiliate_url,
        image_url: form.image_url.filter(|v| !v.trim().is_empty()),
        tags: normalize_tags(&form.tags),
        active: form.active,
    })
}

pub async fn create_product(state: &AppState, form: ProductForm) -> Result<Product, ApiError> {
    let data = validate(form)?;
    Ok(repo::insert(&state.db, &data).await?)
}

/// Full-row replace. When the stored image is managed and the form points
/// elsewhere, the old blob is removed best-effort before the row write.
/// Last write wins; there is no version check.
pub async fn update_product(
    state: &AppState,
    id: Uuid,
    form: ProductForm,
) -> Result<Product, ApiError> {
    let data = validate(form)?;

    let existing = repo::get_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("product not found".into()))?;

    if let Some(old_url) = &existing.image_url {
        if data.image_url.as_deref() != Some(old_url.as_str()) {
            images::services::remove_image_best_effort(state, old_url, DEFAULT_BUCKET).await;
        }
    }

    repo::update(&state.db, id, &data)
        .await?
        .ok_or_else(|| ApiError::NotFound("product not found".into()))
}

/// Removes the managed image best-effort, then the row. A failed blob
/// removal is logged and never blocks the row delete.
pub async fn delete_product(state: &AppState, id: Uuid) -> Result<(), ApiError> {
    let existing = repo::get_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("product not found".into()))?;

    if let Some(url) = &existing.image_url {
        images::services::remove_image_best_effort(state, url, DEFAULT_BUCKET).await;
    }

    if !repo::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("product not found".into()));
    }
    Ok(())
}
