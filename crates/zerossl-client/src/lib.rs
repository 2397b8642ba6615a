//! HTTP client for the ZeroSSL REST API.
//!
//! This crate provides [`ZeroSslClient`], a thin typed wrapper over the
//! certificate endpoints. It performs no retries of its own: callers own the
//! retry and polling policy.

#![doc(html_root_url = "https://docs.rs/zerossl-client/0.3.0")]

mod client;
pub mod api;

pub use client::{ZeroSslClient, ZeroSslClientBuilder};
pub use zerossl_core::{Result, ZeroSslError};
