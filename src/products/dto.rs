use serde::{Deserialize, Serialize};

use super::repo::Product;

pub const PAGE_SIZE: i64 = 12;
pub const FEATURED_LIMIT: i64 = 6;
pub const NEW_ARRIVALS_LIMIT: i64 = 3;

#[derive(Debug, Deserialize)]
pub struct BrowseParams {
    pub category: Option<String>,
    /// Substring match on the product name.
    pub q: Option<String>,
    /// Comma-separated list; matches rows sharing at least one tag.
    pub tags: Option<String>,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_per_page")]
    pub per_page: i64,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    #[serde(default = "default_page")]
    pub page: i64,
}

fn default_page() -> i64 {
    1
}

fn default_per_page() -> i64 {
    PAGE_SIZE
}

#[derive(Debug, Serialize)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub total_count: i64,
    pub page: i64,
    pub total_pages: i64,
}

impl ProductPage {
    pub fn new(products: Vec<Product>, total_count: i64, page: i64, per_page: i64) -> Self {
        let total_pages = if total_count == 0 {
            0
        } else {
            (total_count + per_page - 1) / per_page
        };
        Self {
            products,
            total_count,
            page,
            total_pages,
        }
    }

    pub fn empty() -> Self {
        Self {
            products: Vec::new(),
            total_count: 0,
            page: 1,
            total_pages: 0,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HomeProducts {
    pub featured: Vec<Product>,
    pub new_arrivals: Vec<Product>,
}

/// Admin create/update payload. `tags` arrives as one comma-separated string
/// and is normalized server-side.
#[derive(Debug, Deserialize)]
pub struct ProductForm {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    pub affiliate_url: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub tags: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}
