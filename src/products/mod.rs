pub mod dto;
pub mod handlers;
pub mod repo;
pub mod services;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/home", get(handlers::home))
        .route("/products", get(handlers::browse))
        .route("/products/search", get(handlers::search))
        .route("/products/:id", get(handlers::get_product))
        .route("/categories", get(handlers::categories))
        .route("/admin/products", post(handlers::create_product))
        .route(
            "/admin/products/:id",
            put(handlers::update_product).delete(handlers::delete_product),
        )
}
