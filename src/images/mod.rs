pub mod handlers;
pub mod services;

use axum::{extract::DefaultBodyLimit, routing::any, Router};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/upload-image", any(handlers::upload_image))
        .route("/delete-image", any(handlers::delete_image))
        // base64 payloads run ~4/3 of the raw image size
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024))
}
