//! Token types and the persisted token row.
//!
//! Every credential in the system is a [`Token`]: refresh sessions, mailed
//! login and reset links, and generated self-sign keys. What a token grants is
//! decided by its [`TokenType`], which is grouped by the principal kind that
//! may hold it.

use std::fmt;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::TokenError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TeacherTokenKind {
    PasswordReset,
    Refresh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StudentTokenKind {
    /// Mailed one-shot login link.
    Login,
    /// Refresh session created from a login link.
    Access,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelfSignTokenKind {
    AttendanceSelfSign,
}

/// The closed set of token types, grouped by principal kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    Teacher(TeacherTokenKind),
    Student(StudentTokenKind),
    SelfSign(SelfSignTokenKind),
}

impl TokenType {
    pub const ALL: [TokenType; 5] = [
        TokenType::Teacher(TeacherTokenKind::PasswordReset),
        TokenType::Teacher(TeacherTokenKind::Refresh),
        TokenType::Student(StudentTokenKind::Login),
        TokenType::Student(StudentTokenKind::Access),
        TokenType::SelfSign(SelfSignTokenKind::AttendanceSelfSign),
    ];

    /// Stable text code used in storage, logs and metric labels.
    pub fn as_code(&self) -> &'static str {
        match self {
            TokenType::Teacher(TeacherTokenKind::PasswordReset) => "teacher_password_reset",
            TokenType::Teacher(TeacherTokenKind::Refresh) => "teacher_refresh",
            TokenType::Student(StudentTokenKind::Login) => "student_login",
            TokenType::Student(StudentTokenKind::Access) => "student_access",
            TokenType::SelfSign(SelfSignTokenKind::AttendanceSelfSign) => {
                "student_attendance_self_sign"
            }
        }
    }

    pub fn from_code(code: &str) -> Result<Self, TokenError> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_code() == code)
            .ok_or_else(|| TokenError::UnknownType(code.to_string()))
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

impl From<TeacherTokenKind> for TokenType {
    fn from(kind: TeacherTokenKind) -> Self {
        TokenType::Teacher(kind)
    }
}

impl From<StudentTokenKind> for TokenType {
    fn from(kind: StudentTokenKind) -> Self {
        TokenType::Student(kind)
    }
}

impl From<SelfSignTokenKind> for TokenType {
    fn from(kind: SelfSignTokenKind) -> Self {
        TokenType::SelfSign(kind)
    }
}

/// A principal-scoped family of token types.
///
/// Code holding a [`crate::ScopedTokens<K>`] can only name types of family `K`.
pub trait TokenKind: Copy + Into<TokenType> + Send + Sync + 'static {}

impl TokenKind for TeacherTokenKind {}
impl TokenKind for StudentTokenKind {}
impl TokenKind for SelfSignTokenKind {}

/// What issuance does about tokens already held under the same `(type, key)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniquenessPolicy {
    NoCheck,
    /// Remove every token for `(type, key)` before inserting.
    DeleteExisting,
    /// Fail with [`TokenError::DuplicateActiveToken`] while a live one exists.
    ThrowIfExists,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub id: Uuid,
    pub value: String,
    pub token_type: TokenType,
    /// Subject the token belongs to: a teacher, student or day id.
    pub key: String,
    /// Free annotation, never consulted during validation.
    pub tag: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Token {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
