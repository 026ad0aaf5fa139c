//! Middleware module
//!
//! Contains Tower middleware for request signing and rate limiting.

pub mod rate_limiter;
pub mod signature;
