//! HTTP request handlers.

pub mod darkness;
pub mod health;
pub mod status;
