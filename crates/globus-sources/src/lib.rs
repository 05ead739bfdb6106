//! HTTP clients for the two upstream datasets: the country directory and the
//! USD exchange-rate table.

pub mod client;
pub mod error;

pub use client::{HttpSource, SourceConfig};
pub use error::{Error, Result};

#[cfg(test)]
mod tests;
