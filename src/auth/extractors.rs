use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use super::gate::{self, Identity};
use crate::error::ApiError;
use crate::state::AppState;

/// Extracts a verified admin identity from the bearer token. Method dispatch
/// is left to the router; the function-style image endpoints run the full
/// gate themselves instead.
pub struct AdminUser(pub Identity);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = gate::bearer_token(&parts.headers)?;
        let identity = gate::decode_identity(token, &state.config.jwt)?;
        gate::check_admin(&identity, state.config.admin_email.as_deref())?;
        Ok(AdminUser(identity))
    }
}
