use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
}

/// S3-compatible storage settings. Absent as a whole when any required
/// variable is missing; the privileged image endpoints then answer 500
/// instead of the process refusing to start.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    /// Public base under which objects are reachable, e.g.
    /// `https://cdn.example.com/storage/v1/object/public`. Also the
    /// substring that marks an image URL as managed by this deployment.
    pub public_base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    /// Single admin identity. `None` disables the admin check entirely
    /// (fail-open); setting ADMIN_EMAIL is a deployment requirement.
    pub admin_email: Option<String>,
    pub storage: Option<StorageConfig>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
        };
        let admin_email = std::env::var("ADMIN_EMAIL").ok().filter(|v| !v.is_empty());
        if admin_email.is_none() {
            tracing::warn!("ADMIN_EMAIL not set; admin identity check is disabled");
        }
        let storage = Self::storage_from_env();
        if storage.is_none() {
            tracing::warn!("storage not fully configured; image endpoints will answer 500");
        }
        Ok(Self {
            database_url,
            jwt,
            admin_email,
            storage,
        })
    }

    fn storage_from_env() -> Option<StorageConfig> {
        Some(StorageConfig {
            endpoint: std::env::var("STORAGE_ENDPOINT").ok()?,
            access_key: std::env::var("STORAGE_ACCESS_KEY").ok()?,
            secret_key: std::env::var("STORAGE_SECRET_KEY").ok()?,
            region: std::env::var("STORAGE_REGION").unwrap_or_else(|_| "us-east-1".into()),
            public_base_url: std::env::var("STORAGE_PUBLIC_URL").ok()?,
        })
    }
}
