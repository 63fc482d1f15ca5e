//! Darkness API Service Library
//!
//! HTTP server for night sky brightness lookups over VIIRS composites.

pub mod app;
pub mod config;
pub mod error;
pub mod handlers;
pub mod rate_limit;
pub mod state;
