//! # Classmark Auth
//!
//! The token primitive behind every credential in Classmark.
//!
//! - [`token`]: [`TokenType`] grouped by principal kind, the persisted [`Token`]
//!   row and the [`UniquenessPolicy`] applied at issuance
//! - [`store`]: the [`TokenStore`] persistence contract and its Postgres
//!   implementation
//! - [`service`]: [`TokenService`] issuance, validation, revocation and sweep,
//!   plus [`ScopedTokens`] handles restricted to one principal kind
//! - [`transport`]: the `!-!` session-only marker and the refresh cookie policy
//! - [`sweeper`]: the periodic expired-token sweep
//! - [`claims`] and [`jwt`]: short-lived access tokens
//!
//! # Example
//!
//! ```ignore
//! use classmark_auth::{IssueOptions, TeacherTokenKind, TokenService, UniquenessPolicy};
//!
//! let tokens = TokenService::new(store).scoped::<TeacherTokenKind>();
//! let value = tokens
//!     .issue(
//!         TeacherTokenKind::Refresh,
//!         &teacher_id.to_string(),
//!         &IssueOptions::new(UniquenessPolicy::DeleteExisting, 32, 10080),
//!     )
//!     .await?;
//! ```

pub mod claims;
pub mod error;
pub mod jwt;
pub mod service;
pub mod store;
pub mod sweeper;
pub mod token;
pub mod transport;

pub use claims::{AccessClaims, PrincipalKind};
pub use error::TokenError;
pub use jwt::{create_access_token, verify_access_token};
pub use service::{IssueOptions, ScopedTokens, TokenService, generate_token_value};
#[cfg(any(test, feature = "test-utils"))]
pub use store::InMemoryTokenStore;
pub use store::{PgTokenStore, TokenStore};
pub use sweeper::spawn_expiry_sweeper;
pub use token::{
    SelfSignTokenKind, StudentTokenKind, TeacherTokenKind, Token, TokenKind, TokenType,
    UniquenessPolicy,
};
pub use transport::{
    CookiePolicy, SESSION_ONLY_PREFIX, STUDENT_REFRESH_COOKIE, TEACHER_REFRESH_COOKIE,
    unwrap_from_transport, wrap_for_transport,
};
