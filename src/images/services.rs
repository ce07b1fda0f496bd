use std::time::{SystemTime, UNIX_EPOCH};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use lazy_static::lazy_static;
use rand::Rng;
use regex::Regex;

use crate::error::ApiError;
use crate::state::AppState;
use crate::storage::RemoveOutcome;

lazy_static! {
    static ref DATA_URL_PREFIX: Regex = Regex::new(r"^data:image/\w+;base64,").unwrap();
}

#[derive(Debug, Clone)]
pub struct StoredImage {
    pub url: String,
    pub path: String,
}

/// Strips an optional `data:image/...;base64,` prefix and decodes the rest.
pub fn decode_data_url(file_data: &str) -> Result<Vec<u8>, ApiError> {
    let encoded = DATA_URL_PREFIX.replace(file_data, "");
    STANDARD
        .decode(encoded.as_bytes())
        .map_err(|_| ApiError::BadRequest("invalid base64 file data".into()))
}

const SUFFIX_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const SUFFIX_LEN: usize = 6;

/// Collision-resistant object name: `<millis>-<random>.<ext>`, with the
/// extension taken after the last `.` of the original filename, case kept.
pub fn unique_file_name(original: &str) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let mut rng = rand::thread_rng();
    let suffix: String = (0..SUFFIX_LEN)
        .map(|_| SUFFIX_CHARSET[rng.gen_range(0..SUFFIX_CHARSET.len())] as char)
        .collect();
    let ext = original.rsplit('.').next().unwrap_or("bin");
    format!("{millis}-{suffix}.{ext}")
}

pub fn public_url(base: &str, bucket: &str, key: &str) -> String {
    format!("{}/{}/{}", base.trim_end_matches('/'), bucket, key)
}

/// A URL is managed when it points into this deployment's public storage
/// base; anything else (external sellers' CDNs) must never be deleted.
pub fn is_managed(url: &str, public_base: &str) -> bool {
    !url.is_empty() && url.contains(public_base)
}

/// Object key from a public URL: the suffix after the last `<bucket>/`.
pub fn object_key_from_url(url: &str, bucket: &str) -> Option<String> {
    let marker = format!("{bucket}/");
    url.rfind(&marker)
        .map(|i| url[i + marker.len()..].to_string())
        .filter(|key| !key.is_empty())
}

/// Writes the image under a fresh name and returns its public URL and key.
/// A storage failure here is fatal to the calling mutation.
pub async fn store_image(
    state: &AppState,
    bucket: &str,
    file_name: &str,
    content_type: &str,
    body: Bytes,
) -> Result<StoredImage, ApiError> {
    let cfg = state
        .config
        .storage
        .as_ref()
        .ok_or(ApiError::Misconfigured("storage"))?;
    let storage = state
        .storage
        .as_ref()
        .ok_or(ApiError::Misconfigured("storage"))?;

    let key = unique_file_name(file_name);
    storage.put_object(bucket, &key, body, content_type).await?;

    Ok(StoredImage {
        url: public_url(&cfg.public_base_url, bucket, &key),
        path: key,
    })
}

/// Deletes the object a managed URL points at. Empty or unmanaged URLs are
/// skipped without a storage call; a missing object counts as success.
pub async fn remove_image(
    state: &AppState,
    url: &str,
    bucket: &str,
) -> Result<RemoveOutcome, ApiError> {
    if url.is_empty() {
        return Ok(RemoveOutcome::Skipped);
    }
    let cfg = state
        .config
        .storage
        .as_ref()
        .ok_or(ApiError::Misconfigured("storage"))?;
    if !is_managed(url, &cfg.public_base_url) {
        return Ok(RemoveOutcome::Skipped);
    }
    let storage = state
        .storage
        .as_ref()
        .ok_or(ApiError::Misconfigured("storage"))?;

    let key = object_key_from_url(url, bucket).ok_or_else(|| {
        ApiError::BadRequest("could not derive storage path from url".into())
    })?;

    Ok(storage.delete_object(bucket, &key).await?)
}

/// Removal used inside product delete/replace flows: the outcome is logged
/// and a failure never propagates to the row mutation.
pub async fn remove_image_best_effort(state: &AppState, url: &str, bucket: &str) {
    match remove_image(state, url, bucket).await {
        Ok(outcome) => {
            tracing::debug!(?outcome, url, "image removal");
        }
        Err(e) => {
            tracing::warn!(error = %e, url, "image removal failed; continuing");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::async_trait;

    use super::*;
    use crate::storage::StorageClient;

    struct RecordingStorage {
        puts: Mutex<Vec<(String, String, String)>>,
        deletes: Mutex<Vec<(String, String)>>,
        fail_deletes: bool,
    }

    impl RecordingStorage {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                puts: Mutex::new(Vec::new()),
                deletes: Mutex::new(Vec::new()),
                fail_deletes: false,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                puts: Mutex::new(Vec::new()),
                deletes: Mutex::new(Vec::new()),
                fail_deletes: true,
            })
        }
    }

    #[async_trait]
    impl StorageClient for RecordingStorage {
        async fn put_object(
            &self,
            bucket: &str,
            key: &str,
            _body: Bytes,
            content_type: &str,
        ) -> anyhow::Result<()> {
            self.puts
                .lock()
                .unwrap()
                .push((bucket.into(), key.into(), content_type.into()));
            Ok(())
        }

        async fn delete_object(&self, bucket: &str, key: &str) -> anyhow::Result<RemoveOutcome> {
            if self.fail_deletes {
                anyhow::bail!("storage unavailable");
            }
            self.deletes.lock().unwrap().push((bucket.into(), key.into()));
            Ok(RemoveOutcome::Removed)
        }
    }

    fn state_with(storage: Arc<RecordingStorage>) -> AppState {
        AppState::fake(Some(storage as Arc<dyn StorageClient>))
    }

    #[test]
    fn unique_name_keeps_extension_case() {
        let name = unique_file_name("photo.JPG");
        let re = Regex::new(r"^\d+-[a-z0-9]+\.JPG$").unwrap();
        assert!(re.is_match(&name), "unexpected name: {name}");
    }

    #[test]
    fn unique_name_uses_last_dot() {
        let name = unique_file_name("archive.tar.gz");
        assert!(name.ends_with(".gz"));
    }

    #[test]
    fn decode_strips_data_url_prefix() {
        let bytes = decode_data_url("data:image/png;base64,aGVsbG8=").unwrap();
        assert_eq!(bytes, b"hello");
        // plain base64 without the prefix is accepted too
        let bytes = decode_data_url("aGVsbG8=").unwrap();
        assert_eq!(bytes, b"hello");
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(
            decode_data_url("data:image/png;base64,not base64!").unwrap_err(),
            ApiError::BadRequest(_)
        ));
    }

    #[test]
    fn key_is_suffix_after_last_bucket_marker() {
        let url = "https://host/storage/v1/object/public/products/abc.png";
        assert_eq!(object_key_from_url(url, "products").unwrap(), "abc.png");

        let nested = "https://host/public/products/products/x.png";
        assert_eq!(object_key_from_url(nested, "products").unwrap(), "x.png");

        assert_eq!(object_key_from_url("https://elsewhere/img.png", "products"), None);
        assert_eq!(object_key_from_url("https://host/products/", "products"), None);
    }

    #[test]
    fn managed_check_matches_public_base() {
        let base = "https://cdn.example.com/storage/v1/object/public";
        assert!(is_managed(
            "https://cdn.example.com/storage/v1/object/public/products/a.png",
            base
        ));
        assert!(!is_managed("https://images.unsplash.com/a.png", base));
        assert!(!is_managed("", base));
    }

    #[tokio::test]
    async fn store_writes_and_returns_public_url() {
        let rec = RecordingStorage::new();
        let state = state_with(rec.clone());

        let stored = store_image(&state, "products", "photo.JPG", "image/jpeg", Bytes::from("x"))
            .await
            .unwrap();

        let puts = rec.puts.lock().unwrap();
        assert_eq!(puts.len(), 1);
        assert_eq!(puts[0].0, "products");
        assert_eq!(puts[0].1, stored.path);
        assert_eq!(puts[0].2, "image/jpeg");
        assert_eq!(
            stored.url,
            format!(
                "https://cdn.example.com/storage/v1/object/public/products/{}",
                stored.path
            )
        );
    }

    #[tokio::test]
    async fn remove_skips_empty_and_external_urls() {
        let rec = RecordingStorage::new();
        let state = state_with(rec.clone());

        let outcome = remove_image(&state, "", "products").await.unwrap();
        assert_eq!(outcome, RemoveOutcome::Skipped);

        let outcome = remove_image(&state, "https://images.unsplash.com/a.png", "products")
            .await
            .unwrap();
        assert_eq!(outcome, RemoveOutcome::Skipped);

        assert!(rec.deletes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn remove_targets_derived_key() {
        let rec = RecordingStorage::new();
        let state = state_with(rec.clone());

        let url = "https://cdn.example.com/storage/v1/object/public/products/abc.png";
        let outcome = remove_image(&state, url, "products").await.unwrap();
        assert_eq!(outcome, RemoveOutcome::Removed);

        let deletes = rec.deletes.lock().unwrap();
        assert_eq!(deletes.as_slice(), &[("products".to_string(), "abc.png".to_string())]);
    }

    #[tokio::test]
    async fn best_effort_removal_swallows_failures() {
        let rec = RecordingStorage::failing();
        let state = state_with(rec);

        let url = "https://cdn.example.com/storage/v1/object/public/products/abc.png";
        remove_image_best_effort(&state, url, "products").await;
    }

    #[tokio::test]
    async fn store_without_storage_config_is_misconfigured() {
        let state = AppState::fake(None);
        let err = store_image(&state, "products", "a.png", "image/png", Bytes::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Misconfigured(_)));
    }
}
