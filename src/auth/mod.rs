//! Authentication system
//!
//! Checks USER/PASS exchanges against the configured user table.

pub mod validator;

pub use validator::{validate_password, validate_user};
