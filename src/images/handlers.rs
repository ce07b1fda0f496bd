use axum::{
    extract::State,
    http::{HeaderMap, Method},
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::services;
use crate::auth::gate;
use crate::error::ApiError;
use crate::state::AppState;
use crate::storage::RemoveOutcome;

fn default_bucket() -> String {
    "products".into()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadRequest {
    #[serde(default)]
    file_data: String,
    #[serde(default)]
    file_name: String,
    content_type: Option<String>,
    #[serde(default = "default_bucket")]
    bucket: String,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub url: String,
    pub path: String,
}

#[derive(Debug, Deserialize)]
struct DeleteRequest {
    #[serde(default)]
    url: String,
    #[serde(default = "default_bucket")]
    bucket: String,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
}

/// POST /upload-image. Registered for any method so the gate's own 405
/// branch answers wrong methods, like the serverless handler it replaces.
#[instrument(skip(state, headers, body))]
pub async fn upload_image(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<UploadResponse>, ApiError> {
    let identity = gate::authorize(
        &method,
        &headers,
        &state.config.jwt,
        state.config.admin_email.as_deref(),
    )?;

    let req: UploadRequest = serde_json::from_slice(&body)
        .map_err(|_| ApiError::BadRequest("invalid request body".into()))?;
    if req.file_data.is_empty() || req.file_name.is_empty() {
        return Err(ApiError::BadRequest("missing file data".into()));
    }

    let bytes = services::decode_data_url(&req.file_data)?;
    let content_type = req.content_type.as_deref().unwrap_or("image/jpeg");

    let stored = services::store_image(
        &state,
        &req.bucket,
        &req.file_name,
        content_type,
        Bytes::from(bytes),
    )
    .await?;

    tracing::info!(user = %identity.email, path = %stored.path, "image uploaded");
    Ok(Json(UploadResponse {
        success: true,
        url: stored.url,
        path: stored.path,
    }))
}

/// POST /delete-image. Unmanaged URLs are a successful no-op; a missing
/// object also counts as deleted.
#[instrument(skip(state, headers, body))]
pub async fn delete_image(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<DeleteResponse>, ApiError> {
    let identity = gate::authorize(
        &method,
        &headers,
        &state.config.jwt,
        state.config.admin_email.as_deref(),
    )?;

    let req: DeleteRequest = serde_json::from_slice(&body)
        .map_err(|_| ApiError::BadRequest("invalid request body".into()))?;
    if req.url.is_empty() {
        return Err(ApiError::BadRequest("missing url".into()));
    }

    let outcome = services::remove_image(&state, &req.url, &req.bucket).await?;
    let message = match outcome {
        RemoveOutcome::Skipped => "not a managed image; nothing to delete",
        RemoveOutcome::Removed | RemoveOutcome::NotFound => "image deleted",
    };

    tracing::info!(user = %identity.email, url = %req.url, ?outcome, "image delete");
    Ok(Json(DeleteResponse {
        success: true,
        message: message.into(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_request_defaults_bucket() {
        let req: UploadRequest =
            serde_json::from_str(r#"{"fileData":"aGk=","fileName":"a.png"}"#).unwrap();
        assert_eq!(req.bucket, "products");
        assert_eq!(req.content_type, None);
    }

    #[test]
    fn delete_request_defaults_bucket() {
        let req: DeleteRequest = serde_json::from_str(r#"{"url":"https://x/y"}"#).unwrap();
        assert_eq!(req.bucket, "products");
    }

    #[test]
    fn camel_case_field_names_are_honored() {
        let req: UploadRequest = serde_json::from_str(
            r#"{"fileData":"aGk=","fileName":"a.png","contentType":"image/png","bucket":"banners"}"#,
        )
        .unwrap();
        assert_eq!(req.file_name, "a.png");
        assert_eq!(req.content_type.as_deref(), Some("image/png"));
        assert_eq!(req.bucket, "banners");
    }
}
