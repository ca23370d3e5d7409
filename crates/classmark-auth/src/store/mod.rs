//! Token persistence.
//!
//! [`TokenStore`] is the contract every consumer of tokens goes through. Rows
//! are never updated: they are inserted by issuance and deleted by
//! consumption, revocation or the expiry sweep.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::TokenError;
use crate::token::{Token, TokenType, UniquenessPolicy};

#[cfg(any(test, feature = "test-utils"))]
mod memory;
mod postgres;

#[cfg(any(test, feature = "test-utils"))]
pub use memory::InMemoryTokenStore;
pub use postgres::PgTokenStore;

#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Inserts a row. A taken `value` yields [`TokenError::ValueCollision`].
    async fn insert(&self, token: &Token) -> Result<(), TokenError>;

    async fn find_by_value(&self, value: &str) -> Result<Option<Token>, TokenError>;

    /// Rows for `(type, key)` that have not expired at `now`.
    async fn find_live_by_type_and_key(
        &self,
        token_type: TokenType,
        key: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<Token>, TokenError>;

    /// Returns whether a row was removed.
    async fn delete_by_id(&self, id: Uuid) -> Result<bool, TokenError>;

    async fn delete_by_value(&self, value: &str) -> Result<u64, TokenError>;

    async fn delete_by_type_and_key(
        &self,
        token_type: TokenType,
        key: &str,
    ) -> Result<u64, TokenError>;

    /// Removes rows with `expires_at < now`.
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, TokenError>;

    /// Applies `policy` for the token's `(type, key)` and inserts it.
    ///
    /// This default composes the primitives above and is not atomic; stores
    /// that can fence concurrent issuance override it.
    async fn issue(
        &self,
        token: &Token,
        policy: UniquenessPolicy,
        now: DateTime<Utc>,
    ) -> Result<(), TokenError> {
        match policy {
            UniquenessPolicy::NoCheck => {}
            UniquenessPolicy::DeleteExisting => {
                self.delete_by_type_and_key(token.token_type, &token.key)
                    .await?;
            }
            UniquenessPolicy::ThrowIfExists => {
                let live = self
                    .find_live_by_type_and_key(token.token_type, &token.key, now)
                    .await?;
                if !live.is_empty() {
                    return Err(TokenError::DuplicateActiveToken);
                }
            }
        }
        self.insert(token).await
    }
}
