//! Student self-sign attendance.
//!
//! A teacher puts a key on an attendance day (typed or generated), students
//! who know it sign themselves in, and the teacher resolves each pending
//! self-sign into a real attendance record.

pub mod controller;
pub mod router;
pub mod service;
