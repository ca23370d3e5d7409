//! Passwordless student sign-in: emailed link tokens traded for long-lived
//! sessions, one per device.

pub mod controller;
pub mod router;
pub mod service;
