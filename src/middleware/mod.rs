//! Request extractors for cross-cutting concerns.
//!
//! - [`auth`]: bearer access token extractors, one per principal kind
//! - [`client_ip`]: best-effort caller address for audit fields and CAPTCHA
//!
//! # Example
//!
//! ```ignore
//! use crate::middleware::auth::AuthStudent;
//!
//! async fn submit(auth: AuthStudent) -> Result<impl IntoResponse, AppError> {
//!     let student_id = auth.student_id()?;
//!     // ...
//! }
//! ```

pub mod auth;
pub mod client_ip;
