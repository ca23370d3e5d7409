use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, postgres::PgExecutor};
use tracing::instrument;
use uuid::Uuid;

use super::TokenStore;
use crate::error::TokenError;
use crate::token::{Token, TokenType, UniquenessPolicy};

const TOKEN_COLUMNS: &str = "id, value, token_type, key, tag, created_at, expires_at";

#[derive(FromRow)]
struct TokenRow {
    id: Uuid,
    value: String,
    token_type: String,
    key: String,
    tag: Option<String>,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl TryFrom<TokenRow> for Token {
    type Error = TokenError;

    fn try_from(row: TokenRow) -> Result<Self, Self::Error> {
        Ok(Token {
            id: row.id,
            value: row.value,
            token_type: TokenType::from_code(&row.token_type)?,
            key: row.key,
            tag: row.tag,
            created_at: row.created_at,
            expires_at: row.expires_at,
        })
    }
}

/// Token store over the `tokens` table.
#[derive(Clone)]
pub struct PgTokenStore {
    pool: PgPool,
}

impl PgTokenStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

async fn insert_row<'e, E: PgExecutor<'e>>(executor: E, token: &Token) -> Result<(), TokenError> {
    let result = sqlx::query(
        r#"
        INSERT INTO tokens (id, value, token_type, key, tag, created_at, expires_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(token.id)
    .bind(&token.value)
    .bind(token.token_type.as_code())
    .bind(&token.key)
    .bind(&token.tag)
    .bind(token.created_at)
    .bind(token.expires_at)
    .execute(executor)
    .await;

    match result {
        Ok(_) => Ok(()),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            Err(TokenError::ValueCollision)
        }
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl TokenStore for PgTokenStore {
    #[instrument(skip(self, token), fields(token_type = %token.token_type))]
    async fn insert(&self, token: &Token) -> Result<(), TokenError> {
        insert_row(&self.pool, token).await
    }

    #[instrument(skip(self, value))]
    async fn find_by_value(&self, value: &str) -> Result<Option<Token>, TokenError> {
        let row = sqlx::query_as::<_, TokenRow>(&format!(
            "SELECT {TOKEN_COLUMNS} FROM tokens WHERE value = $1"
        ))
        .bind(value)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Token::try_from).transpose()
    }

    #[instrument(skip(self))]
    async fn find_live_by_type_and_key(
        &self,
        token_type: TokenType,
        key: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<Token>, TokenError> {
        let rows = sqlx::query_as::<_, TokenRow>(&format!(
            "SELECT {TOKEN_COLUMNS} FROM tokens \
             WHERE token_type = $1 AND key = $2 AND expires_at > $3 \
             ORDER BY created_at"
        ))
        .bind(token_type.as_code())
        .bind(key)
        .bind(now)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Token::try_from).collect()
    }

    #[instrument(skip(self))]
    async fn delete_by_id(&self, id: Uuid) -> Result<bool, TokenError> {
        let result = sqlx::query("DELETE FROM tokens WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, value))]
    async fn delete_by_value(&self, value: &str) -> Result<u64, TokenError> {
        let result = sqlx::query("DELETE FROM tokens WHERE value = $1")
            .bind(value)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    #[instrument(skip(self))]
    async fn delete_by_type_and_key(
        &self,
        token_type: TokenType,
        key: &str,
    ) -> Result<u64, TokenError> {
        let result = sqlx::query("DELETE FROM tokens WHERE token_type = $1 AND key = $2")
            .bind(token_type.as_code())
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    #[instrument(skip(self))]
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, TokenError> {
        let result = sqlx::query("DELETE FROM tokens WHERE expires_at < $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Runs the policy and the insert in one transaction serialized on an
    /// advisory lock for `(type, key)`, so two concurrent `DeleteExisting`
    /// issuances cannot both leave a live row.
    #[instrument(skip(self, token), fields(token_type = %token.token_type))]
    async fn issue(
        &self,
        token: &Token,
        policy: UniquenessPolicy,
        now: DateTime<Utc>,
    ) -> Result<(), TokenError> {
        let mut tx = self.pool.begin().await?;

        if policy != UniquenessPolicy::NoCheck {
            sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
                .bind(format!("{}:{}", token.token_type.as_code(), token.key))
                .execute(&mut *tx)
                .await?;
        }

        match policy {
            UniquenessPolicy::NoCheck => {}
            UniquenessPolicy::DeleteExisting => {
                sqlx::query("DELETE FROM tokens WHERE token_type = $1 AND key = $2")
                    .bind(token.token_type.as_code())
                    .bind(&token.key)
                    .execute(&mut *tx)
                    .await?;
            }
            UniquenessPolicy::ThrowIfExists => {
                let exists: bool = sqlx::query_scalar(
                    "SELECT EXISTS(SELECT 1 FROM tokens \
                     WHERE token_type = $1 AND key = $2 AND expires_at > $3)",
                )
                .bind(token.token_type.as_code())
                .bind(&token.key)
                .bind(now)
                .fetch_one(&mut *tx)
                .await?;
                if exists {
                    return Err(TokenError::DuplicateActiveToken);
                }
            }
        }

        insert_row(&mut *tx, token).await?;
        tx.commit().await?;
        Ok(())
    }
}
