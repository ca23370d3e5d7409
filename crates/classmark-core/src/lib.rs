//! # Classmark Core
//!
//! Foundational types shared by every Classmark crate:
//!
//! - [`errors`]: [`AppError`], an HTTP status paired with an [`anyhow::Error`]
//! - [`password`]: bcrypt hashing and verification
//!
//! # Example
//!
//! ```ignore
//! use classmark_core::{AppError, hash_password, verify_password};
//!
//! let hash = hash_password("correct horse battery staple")?;
//! if !verify_password("guess", &hash)? {
//!     return Err(AppError::unauthorized("Invalid email or password".to_string()));
//! }
//! ```

pub mod errors;
pub mod password;

pub use errors::{AppError, ErrorResponse, HttpError};
pub use password::{dummy_password_hash, hash_password, verify_password};
