//! Token issuance, validation and revocation.

use std::marker::PhantomData;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use data_encoding::BASE64URL_NOPAD;
use rand::RngCore;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::error::TokenError;
use crate::store::TokenStore;
use crate::token::{Token, TokenKind, TokenType, UniquenessPolicy};

/// How many times issuance draws a fresh value after a collision.
const MAX_REGENERATIONS: usize = 3;

/// Random token value: `length_bytes` bytes from the thread CSPRNG,
/// base64url encoded without padding.
pub fn generate_token_value(length_bytes: usize) -> String {
    let mut rng = rand::thread_rng();
    let mut bytes = vec![0u8; length_bytes];
    rng.fill_bytes(&mut bytes);
    BASE64URL_NOPAD.encode(&bytes)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueOptions {
    pub policy: UniquenessPolicy,
    pub length_bytes: usize,
    pub ttl_minutes: i64,
    pub tag: Option<String>,
}

impl IssueOptions {
    pub fn new(policy: UniquenessPolicy, length_bytes: usize, ttl_minutes: i64) -> Self {
        Self {
            policy,
            length_bytes,
            ttl_minutes,
            tag: None,
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }
}

#[derive(Clone)]
pub struct TokenService {
    store: Arc<dyn TokenStore>,
}

impl TokenService {
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self { store }
    }

    /// A handle that can only name token types of family `K`.
    pub fn scoped<K: TokenKind>(&self) -> ScopedTokens<K> {
        ScopedTokens {
            service: self.clone(),
            _kind: PhantomData,
        }
    }

    pub async fn issue(
        &self,
        token_type: TokenType,
        key: &str,
        options: &IssueOptions,
    ) -> Result<String, TokenError> {
        self.issue_at(token_type, key, options, Utc::now()).await
    }

    /// Issues a token and returns its raw value.
    #[instrument(skip(self, options), fields(token_type = %token_type, policy = ?options.policy))]
    pub async fn issue_at(
        &self,
        token_type: TokenType,
        key: &str,
        options: &IssueOptions,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        if options.length_bytes == 0 {
            return Err(TokenError::InvalidTokenParameters("length must be positive"));
        }
        if options.ttl_minutes <= 0 {
            return Err(TokenError::InvalidTokenParameters("ttl must be positive"));
        }

        let expires_at = Duration::try_minutes(options.ttl_minutes)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or(TokenError::InvalidTokenParameters("ttl out of range"))?;
        let mut attempt = 0;
        loop {
            let token = Token {
                id: Uuid::new_v4(),
                value: generate_token_value(options.length_bytes),
                token_type,
                key: key.to_string(),
                tag: options.tag.clone(),
                created_at: now,
                expires_at,
            };

            match self.store.issue(&token, options.policy, now).await {
                Ok(()) => {
                    metrics::counter!("auth_tokens_issued_total", "type" => token_type.as_code())
                        .increment(1);
                    debug!(token_id = %token.id, "Token issued");
                    return Ok(token.value);
                }
                Err(TokenError::ValueCollision) if attempt < MAX_REGENERATIONS => {
                    attempt += 1;
                    warn!(attempt, "Token value collision, regenerating");
                }
                Err(e) => return Err(e),
            }
        }
    }

    pub async fn validate(
        &self,
        value: &str,
        token_type: TokenType,
        expected_key: Option<&str>,
        delete_on_retrieval: bool,
    ) -> Result<Token, TokenError> {
        self.validate_at(value, token_type, expected_key, delete_on_retrieval, Utc::now())
            .await
    }

    /// Looks a token up by value and checks type, expiry and owner.
    ///
    /// With `delete_on_retrieval` the row is removed as soon as it is read, so
    /// an expired, foreign or wrongly typed token is still consumed by the
    /// attempt. A row of another type is reported as `NotFound`.
    #[instrument(skip(self, value, expected_key), fields(token_type = %token_type))]
    pub async fn validate_at(
        &self,
        value: &str,
        token_type: TokenType,
        expected_key: Option<&str>,
        delete_on_retrieval: bool,
        now: DateTime<Utc>,
    ) -> Result<Token, TokenError> {
        let result = self
            .check(value, token_type, expected_key, delete_on_retrieval, now)
            .await;
        if let Err(e) = &result {
            metrics::counter!(
                "auth_token_validation_failures_total",
                "type" => token_type.as_code(),
                "reason" => e.reason()
            )
            .increment(1);
            debug!(reason = e.reason(), "Token validation failed");
        }
        result
    }

    async fn check(
        &self,
        value: &str,
        token_type: TokenType,
        expected_key: Option<&str>,
        delete_on_retrieval: bool,
        now: DateTime<Utc>,
    ) -> Result<Token, TokenError> {
        let token = self
            .store
            .find_by_value(value)
            .await?
            .ok_or(TokenError::NotFound)?;

        // Losing the delete race means another request consumed it first.
        if delete_on_retrieval && !self.store.delete_by_id(token.id).await? {
            return Err(TokenError::NotFound);
        }

        if token.token_type != token_type {
            return Err(TokenError::NotFound);
        }

        if token.is_expired_at(now) {
            return Err(TokenError::Expired);
        }

        if let Some(expected) = expected_key {
            if expected != token.key {
                return Err(TokenError::OwnerMismatch);
            }
        }

        Ok(token)
    }

    /// Deletes the token with `value`, if any. Returns whether one existed.
    #[instrument(skip(self, value))]
    pub async fn revoke_by_value(&self, value: &str) -> Result<bool, TokenError> {
        Ok(self.store.delete_by_value(value).await? > 0)
    }

    #[instrument(skip(self))]
    pub async fn revoke_all_by_key(
        &self,
        token_type: TokenType,
        key: &str,
    ) -> Result<u64, TokenError> {
        self.store.delete_by_type_and_key(token_type, key).await
    }

    pub async fn sweep_expired(&self) -> Result<u64, TokenError> {
        self.sweep_expired_at(Utc::now()).await
    }

    #[instrument(skip(self))]
    pub async fn sweep_expired_at(&self, now: DateTime<Utc>) -> Result<u64, TokenError> {
        let removed = self.store.delete_expired(now).await?;
        metrics::counter!("auth_tokens_swept_total").increment(removed);
        Ok(removed)
    }
}

/// [`TokenService`] restricted to one principal kind's token types.
pub struct ScopedTokens<K> {
    service: TokenService,
    _kind: PhantomData<fn() -> K>,
}

impl<K> Clone for ScopedTokens<K> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            _kind: PhantomData,
        }
    }
}

impl<K: TokenKind> ScopedTokens<K> {
    pub async fn issue(
        &self,
        kind: K,
        key: &str,
        options: &IssueOptions,
    ) -> Result<String, TokenError> {
        self.service.issue(kind.into(), key, options).await
    }

    pub async fn validate(
        &self,
        value: &str,
        kind: K,
        expected_key: Option<&str>,
        delete_on_retrieval: bool,
    ) -> Result<Token, TokenError> {
        self.service
            .validate(value, kind.into(), expected_key, delete_on_retrieval)
            .await
    }

    /// Deletes the token with `value` only if it is of type `kind`.
    pub async fn revoke(&self, value: &str, kind: K) -> Result<bool, TokenError> {
        let token_type = kind.into();
        match self.service.store.find_by_value(value).await? {
            Some(token) if token.token_type == token_type => {
                self.service.store.delete_by_id(token.id).await
            }
            _ => Ok(false),
        }
    }

    pub async fn revoke_all_by_key(&self, kind: K, key: &str) -> Result<u64, TokenError> {
        self.service.revoke_all_by_key(kind.into(), key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryTokenStore;
    use crate::token::{SelfSignTokenKind, StudentTokenKind, TeacherTokenKind};

    fn service() -> (TokenService, Arc<InMemoryTokenStore>) {
        let store = Arc::new(InMemoryTokenStore::new());
        (TokenService::new(store.clone()), store)
    }

    fn options(policy: UniquenessPolicy) -> IssueOptions {
        IssueOptions::new(policy, 32, 60)
    }

    const REFRESH: TokenType = TokenType::Teacher(TeacherTokenKind::Refresh);
    const RESET: TokenType = TokenType::Teacher(TeacherTokenKind::PasswordReset);

    #[test]
    fn test_generated_value_charset_and_length() {
        for n in [1, 2, 3, 6, 16, 32, 33] {
            let value = generate_token_value(n);
            assert_eq!(value.len(), (4 * n).div_ceil(3));
            assert!(
                value
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
            );
        }
    }

    #[tokio::test]
    async fn test_issue_then_validate() {
        let (service, _) = service();
        let now = Utc::now();
        let value = service
            .issue_at(REFRESH, "teacher-1", &options(UniquenessPolicy::NoCheck), now)
            .await
            .unwrap();

        let token = service
            .validate_at(&value, REFRESH, Some("teacher-1"), false, now)
            .await
            .unwrap();
        assert_eq!(token.key, "teacher-1");
        assert_eq!(token.expires_at, now + Duration::minutes(60));
    }

    #[tokio::test]
    async fn test_issue_rejects_bad_parameters() {
        let (service, store) = service();
        let zero_length = IssueOptions::new(UniquenessPolicy::NoCheck, 0, 60);
        let zero_ttl = IssueOptions::new(UniquenessPolicy::NoCheck, 32, 0);

        assert!(matches!(
            service.issue(REFRESH, "k", &zero_length).await,
            Err(TokenError::InvalidTokenParameters(_))
        ));
        assert!(matches!(
            service.issue(REFRESH, "k", &zero_ttl).await,
            Err(TokenError::InvalidTokenParameters(_))
        ));
        let huge_ttl = IssueOptions::new(UniquenessPolicy::NoCheck, 32, i64::MAX);
        assert!(matches!(
            service.issue(REFRESH, "k", &huge_ttl).await,
            Err(TokenError::InvalidTokenParameters(_))
        ));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_delete_existing_leaves_one_live_token() {
        let (service, store) = service();
        let opts = options(UniquenessPolicy::DeleteExisting);
        let first = service.issue(REFRESH, "teacher-1", &opts).await.unwrap();
        let second = service.issue(REFRESH, "teacher-1", &opts).await.unwrap();

        assert_eq!(store.len(), 1);
        assert!(matches!(
            service.validate(&first, REFRESH, None, false).await,
            Err(TokenError::NotFound)
        ));
        assert!(service.validate(&second, REFRESH, None, false).await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_existing_scoped_to_type_and_key() {
        let (service, store) = service();
        let opts = options(UniquenessPolicy::DeleteExisting);
        service.issue(REFRESH, "teacher-1", &opts).await.unwrap();
        service.issue(REFRESH, "teacher-2", &opts).await.unwrap();
        service.issue(RESET, "teacher-1", &opts).await.unwrap();
        service.issue(REFRESH, "teacher-1", &opts).await.unwrap();

        assert_eq!(store.len(), 3);
    }

    #[tokio::test]
    async fn test_throw_if_exists_inserts_nothing() {
        let (service, store) = service();
        let opts = options(UniquenessPolicy::ThrowIfExists);
        service.issue(RESET, "teacher-1", &opts).await.unwrap();

        let result = service.issue(RESET, "teacher-1", &opts).await;
        assert!(matches!(result, Err(TokenError::DuplicateActiveToken)));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_throw_if_exists_ignores_expired() {
        let (service, store) = service();
        let opts = options(UniquenessPolicy::ThrowIfExists);
        let now = Utc::now();
        service
            .issue_at(RESET, "teacher-1", &opts, now - Duration::minutes(61))
            .await
            .unwrap();

        service.issue_at(RESET, "teacher-1", &opts, now).await.unwrap();
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_no_check_allows_many_sessions() {
        let (service, _) = service();
        let access: TokenType = StudentTokenKind::Access.into();
        let opts = options(UniquenessPolicy::NoCheck);
        let a = service.issue(access, "student-1", &opts).await.unwrap();
        let b = service.issue(access, "student-1", &opts).await.unwrap();

        assert_ne!(a, b);
        assert!(service.validate(&a, access, None, false).await.is_ok());
        assert!(service.validate(&b, access, None, false).await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_on_retrieval_is_single_use() {
        let (service, _) = service();
        let value = service
            .issue(RESET, "teacher-1", &options(UniquenessPolicy::NoCheck))
            .await
            .unwrap();

        assert!(service.validate(&value, RESET, None, true).await.is_ok());
        assert!(matches!(
            service.validate(&value, RESET, None, true).await,
            Err(TokenError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_without_deletion_token_is_reusable() {
        let (service, _) = service();
        let value = service
            .issue(REFRESH, "teacher-1", &options(UniquenessPolicy::NoCheck))
            .await
            .unwrap();

        for _ in 0..3 {
            assert!(service.validate(&value, REFRESH, None, false).await.is_ok());
        }
    }

    #[tokio::test]
    async fn test_expired_at_exact_boundary() {
        let (service, _) = service();
        let now = Utc::now();
        let value = service
            .issue_at(REFRESH, "teacher-1", &options(UniquenessPolicy::NoCheck), now)
            .await
            .unwrap();
        let expiry = now + Duration::minutes(60);

        assert!(
            service
                .validate_at(&value, REFRESH, None, false, expiry - Duration::seconds(1))
                .await
                .is_ok()
        );
        assert!(matches!(
            service.validate_at(&value, REFRESH, None, false, expiry).await,
            Err(TokenError::Expired)
        ));
    }

    #[tokio::test]
    async fn test_expired_token_consumed_when_deleting() {
        let (service, store) = service();
        let now = Utc::now();
        let value = service
            .issue_at(RESET, "teacher-1", &options(UniquenessPolicy::NoCheck), now)
            .await
            .unwrap();

        let later = now + Duration::minutes(90);
        assert!(matches!(
            service.validate_at(&value, RESET, None, true, later).await,
            Err(TokenError::Expired)
        ));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_owner_mismatch_consumes_when_deleting() {
        let (service, store) = service();
        let value = service
            .issue(RESET, "teacher-1", &options(UniquenessPolicy::NoCheck))
            .await
            .unwrap();

        assert!(matches!(
            service.validate(&value, RESET, Some("teacher-2"), true).await,
            Err(TokenError::OwnerMismatch)
        ));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_wrong_type_is_not_found_but_consumed_when_deleting() {
        let (service, store) = service();
        let login: TokenType = StudentTokenKind::Login.into();
        let value = service
            .issue(login, "42", &options(UniquenessPolicy::NoCheck))
            .await
            .unwrap();

        assert!(matches!(
            service.validate(&value, REFRESH, Some("42"), true).await,
            Err(TokenError::NotFound)
        ));
        assert!(store.is_empty());
        assert!(matches!(
            service.validate(&value, login, Some("42"), true).await,
            Err(TokenError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_wrong_type_without_deletion_leaves_token() {
        let (service, store) = service();
        let value = service
            .issue(RESET, "teacher-1", &options(UniquenessPolicy::NoCheck))
            .await
            .unwrap();

        assert!(matches!(
            service.validate(&value, REFRESH, None, false).await,
            Err(TokenError::NotFound)
        ));
        assert_eq!(store.len(), 1);
        assert!(service.validate(&value, RESET, None, true).await.is_ok());
    }

    #[tokio::test]
    async fn test_revoke_is_idempotent() {
        let (service, _) = service();
        let value = service
            .issue(REFRESH, "teacher-1", &options(UniquenessPolicy::NoCheck))
            .await
            .unwrap();

        assert!(service.revoke_by_value(&value).await.unwrap());
        assert!(!service.revoke_by_value(&value).await.unwrap());
        assert_eq!(service.revoke_all_by_key(REFRESH, "teacher-1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_sweep_removes_only_expired() {
        let (service, store) = service();
        let now = Utc::now();
        let short = IssueOptions::new(UniquenessPolicy::NoCheck, 16, 1);
        let long = IssueOptions::new(UniquenessPolicy::NoCheck, 16, 120);
        service.issue_at(REFRESH, "a", &short, now).await.unwrap();
        service.issue_at(REFRESH, "b", &short, now).await.unwrap();
        let survivor = service.issue_at(REFRESH, "c", &long, now).await.unwrap();

        let removed = service
            .sweep_expired_at(now + Duration::minutes(2))
            .await
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(store.len(), 1);
        assert_eq!(store.all()[0].value, survivor);
    }

    #[tokio::test]
    async fn test_tag_is_stored_but_not_checked() {
        let (service, _) = service();
        let opts = options(UniquenessPolicy::NoCheck).with_tag("Mozilla/5.0");
        let value = service.issue(REFRESH, "teacher-1", &opts).await.unwrap();

        let token = service.validate(&value, REFRESH, None, false).await.unwrap();
        assert_eq!(token.tag.as_deref(), Some("Mozilla/5.0"));
    }

    #[tokio::test]
    async fn test_scoped_revoke_checks_kind() {
        let (service, store) = service();
        let students = service.scoped::<StudentTokenKind>();
        let self_sign = service.scoped::<SelfSignTokenKind>();
        let opts = options(UniquenessPolicy::NoCheck);
        let login = students
            .issue(StudentTokenKind::Login, "student-1", &opts)
            .await
            .unwrap();
        self_sign
            .issue(SelfSignTokenKind::AttendanceSelfSign, "day-1", &opts)
            .await
            .unwrap();

        assert!(!students.revoke(&login, StudentTokenKind::Access).await.unwrap());
        assert!(students.revoke(&login, StudentTokenKind::Login).await.unwrap());
        assert_eq!(store.len(), 1);
    }
}
