//! Middleware stack for the HTTP server.
//!
//! - `RequestIdLayer`: generates or propagates `x-request-id`
//! - `LoggingLayer`: structured request logging
//! - `require_token`: token check on the job API

mod auth;
mod logging;
mod request_id;

pub use auth::require_token;
pub use logging::{LoggingLayer, LoggingMiddleware};
pub use request_id::{REQUEST_ID_HEADER, RequestIdLayer, RequestIdMiddleware};
