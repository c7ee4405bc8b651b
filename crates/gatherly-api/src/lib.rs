//! # gatherly-api
//!
//! HTTP API layer for Gatherly built on Axum.
//!
//! Provides the session middleware (mandatory and optional auth), the
//! identity extractors, the verification and presence endpoints, and the
//! error-to-response mapping shared by every protected route.

pub mod app;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::{build_app, serve};
pub use error::ApiError;
pub use state::AppState;
