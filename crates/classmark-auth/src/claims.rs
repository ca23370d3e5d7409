//! Access token claims.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Which kind of principal an access token was minted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PrincipalKind {
    Teacher,
    Student,
}

/// JWT claims for access tokens.
///
/// Access tokens are short lived and never stored; the refresh cookie is
/// what survives between page loads.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AccessClaims {
    /// Teacher or student id (subject claim)
    pub sub: String,
    pub kind: PrincipalKind,
    /// Token expiration timestamp (Unix timestamp)
    pub exp: usize,
    /// Token issued-at timestamp (Unix timestamp)
    pub iat: usize,
}
