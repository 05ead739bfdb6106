//! Core types and trait definitions for the globus country aggregator.
//!
//! This crate is deliberately free of HTTP and database dependencies. The
//! store, the external sources and the summary renderer are all reached
//! through the traits defined here.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod country;
pub mod error;
pub mod gdp;
pub mod query;
pub mod refresh;
pub mod render;
pub mod source;
pub mod store;

pub use error::{Error, Result};
