use axum::http::{header, HeaderMap, Method};
use jsonwebtoken::{decode, DecodingKey, Validation};

use super::claims::Claims;
use crate::config::JwtConfig;
use crate::error::ApiError;

/// Verified caller identity. Nothing beyond the token is consulted.
#[derive(Debug, Clone)]
pub struct Identity {
    pub id: String,
    pub email: String,
}

pub fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| ApiError::Unauthenticated("missing Authorization header".into()))?;

    auth.strip_prefix("Bearer ")
        .or_else(|| auth.strip_prefix("bearer "))
        .ok_or_else(|| ApiError::Unauthenticated("invalid auth scheme".into()))
}

pub fn decode_identity(token: &str, jwt: &JwtConfig) -> Result<Identity, ApiError> {
    // Provider tokens set their own audience; only signature and expiry
    // matter here.
    let mut validation = Validation::default();
    validation.validate_aud = false;
    let decoding = DecodingKey::from_secret(jwt.secret.as_bytes());

    let data = decode::<Claims>(token, &decoding, &validation)
        .map_err(|_| ApiError::Unauthenticated("invalid or expired token".into()))?;

    Ok(Identity {
        id: data.claims.sub,
        email: data.claims.email,
    })
}

pub fn check_admin(identity: &Identity, admin_email: Option<&str>) -> Result<(), ApiError> {
    if let Some(admin) = admin_email {
        if identity.email != admin {
            return Err(ApiError::Forbidden("admin privileges required".into()));
        }
    }
    Ok(())
}

/// Full request gate for the function-style image endpoints, re-run on every
/// request: POST only, then bearer extraction, token verification and the
/// admin identity comparison, in that order.
pub fn authorize(
    method: &Method,
    headers: &HeaderMap,
    jwt: &JwtConfig,
    admin_email: Option<&str>,
) -> Result<Identity, ApiError> {
    if method != Method::POST {
        return Err(ApiError::MethodNotAllowed);
    }
    let token = bearer_token(headers)?;
    let identity = decode_identity(token, jwt)?;
    check_admin(&identity, admin_email)?;
    Ok(identity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn jwt_config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret".into(),
        }
    }

    fn token_for(email: &str, secret: &str) -> String {
        let claims = Claims {
            sub: "user-1".into(),
            email: email.into(),
            exp: 4_102_444_800, // 2100-01-01
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn headers_with_bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        headers
    }

    #[test]
    fn rejects_non_post() {
        let token = token_for("admin@example.com", "test-secret");
        let err = authorize(
            &Method::GET,
            &headers_with_bearer(&token),
            &jwt_config(),
            Some("admin@example.com"),
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::MethodNotAllowed));
    }

    #[test]
    fn rejects_missing_bearer() {
        let err = authorize(
            &Method::POST,
            &HeaderMap::new(),
            &jwt_config(),
            Some("admin@example.com"),
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::Unauthenticated(_)));
    }

    #[test]
    fn rejects_token_signed_with_wrong_secret() {
        let token = token_for("admin@example.com", "other-secret");
        let err = authorize(
            &Method::POST,
            &headers_with_bearer(&token),
            &jwt_config(),
            Some("admin@example.com"),
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::Unauthenticated(_)));
    }

    #[test]
    fn rejects_non_admin_identity() {
        let token = token_for("visitor@example.com", "test-secret");
        let err = authorize(
            &Method::POST,
            &headers_with_bearer(&token),
            &jwt_config(),
            Some("admin@example.com"),
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[test]
    fn accepts_admin_identity() {
        let token = token_for("admin@example.com", "test-secret");
        let identity = authorize(
            &Method::POST,
            &headers_with_bearer(&token),
            &jwt_config(),
            Some("admin@example.com"),
        )
        .unwrap();
        assert_eq!(identity.email, "admin@example.com");
        assert_eq!(identity.id, "user-1");
    }

    #[test]
    fn skips_admin_check_when_unconfigured() {
        let token = token_for("whoever@example.com", "test-secret");
        let identity =
            authorize(&Method::POST, &headers_with_bearer(&token), &jwt_config(), None).unwrap();
        assert_eq!(identity.email, "whoever@example.com");
    }

    #[test]
    fn lowercase_bearer_scheme_is_accepted() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            HeaderValue::from_static("bearer abc"),
        );
        assert_eq!(bearer_token(&headers).unwrap(), "abc");
    }
}
