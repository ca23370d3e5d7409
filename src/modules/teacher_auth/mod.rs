//! Teacher login, refresh rotation, logout and password reset.

pub mod controller;
pub mod router;
pub mod service;
