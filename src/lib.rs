//! Hoard - a caching DNS forwarder.
//!
//! Answers UDP DNS queries from an in-memory TTL cache and forwards misses
//! to upstream resolvers.

pub mod cache;
pub mod dns;
pub mod error;
pub mod handler;
pub mod proxy;
pub mod stats;
pub mod transport;
pub mod upstream;

pub use error::Error;
