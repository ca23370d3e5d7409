use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::TokenStore;
use crate::error::TokenError;
use crate::token::{Token, TokenType, UniquenessPolicy};

/// Token store kept in process memory, for tests.
///
/// Every operation, including [`TokenStore::issue`], runs under one lock.
#[derive(Default)]
pub struct InMemoryTokenStore {
    tokens: Mutex<Vec<Token>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Token>> {
        self.tokens.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of every stored row.
    pub fn all(&self) -> Vec<Token> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

fn insert_locked(tokens: &mut Vec<Token>, token: &Token) -> Result<(), TokenError> {
    if tokens.iter().any(|t| t.value == token.value) {
        return Err(TokenError::ValueCollision);
    }
    tokens.push(token.clone());
    Ok(())
}

fn remove_where(tokens: &mut Vec<Token>, pred: impl Fn(&Token) -> bool) -> u64 {
    let before = tokens.len();
    tokens.retain(|t| !pred(t));
    (before - tokens.len()) as u64
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn insert(&self, token: &Token) -> Result<(), TokenError> {
        insert_locked(&mut self.lock(), token)
    }

    async fn find_by_value(&self, value: &str) -> Result<Option<Token>, TokenError> {
        Ok(self.lock().iter().find(|t| t.value == value).cloned())
    }

    async fn find_live_by_type_and_key(
        &self,
        token_type: TokenType,
        key: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<Token>, TokenError> {
        Ok(self
            .lock()
            .iter()
            .filter(|t| t.token_type == token_type && t.key == key && !t.is_expired_at(now))
            .cloned()
            .collect())
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<bool, TokenError> {
        Ok(remove_where(&mut self.lock(), |t| t.id == id) > 0)
    }

    async fn delete_by_value(&self, value: &str) -> Result<u64, TokenError> {
        Ok(remove_where(&mut self.lock(), |t| t.value == value))
    }

    async fn delete_by_type_and_key(
        &self,
        token_type: TokenType,
        key: &str,
    ) -> Result<u64, TokenError> {
        Ok(remove_where(&mut self.lock(), |t| {
            t.token_type == token_type && t.key == key
        }))
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, TokenError> {
        Ok(remove_where(&mut self.lock(), |t| t.expires_at < now))
    }

    async fn issue(
        &self,
        token: &Token,
        policy: UniquenessPolicy,
        now: DateTime<Utc>,
    ) -> Result<(), TokenError> {
        let mut tokens = self.lock();
        let same_subject = |t: &Token| t.token_type == token.token_type && t.key == token.key;

        // Checked before deleting so a collision leaves existing rows alone.
        if tokens.iter().any(|t| t.value == token.value) {
            return Err(TokenError::ValueCollision);
        }

        match policy {
            UniquenessPolicy::NoCheck => {}
            UniquenessPolicy::DeleteExisting => {
                remove_where(&mut tokens, same_subject);
            }
            UniquenessPolicy::ThrowIfExists => {
                if tokens.iter().any(|t| same_subject(t) && !t.is_expired_at(now)) {
                    return Err(TokenError::DuplicateActiveToken);
                }
            }
        }
        insert_locked(&mut tokens, token)
    }
}
