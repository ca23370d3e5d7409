//! Refresh and logout endpoints shared by both principal kinds.
//!
//! The request says who it is by which refresh cookie it carries.

pub mod controller;
pub mod model;
pub mod router;
pub mod service;
