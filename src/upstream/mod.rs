//! Upstream provider integration module
//!
//! One HTTP caller parametrized by provider descriptors, with overload retry.
//! Adding a provider is a data addition in `provider.rs`, not new code.

pub mod client;
pub mod provider;

pub use client::UpstreamClient;
pub use provider::{Credential, ProviderDescriptor, RetryPolicy};
