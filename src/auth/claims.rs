use serde::{Deserialize, Serialize};

/// Claims carried by tokens the external identity provider issues. The
/// provider signs with a shared secret; this service only ever verifies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub exp: usize,
}
