//! Key-Value Registry
//!
//! Holds the values written by set queries and read by get queries.
//! Entries live for as long as the process: there is no expiry, no capacity
//! bound and no persistence.

mod memory;

pub use memory::MemoryRegistry;

use async_trait::async_trait;

/// Store behind the responder, shared by every in-flight query
#[async_trait]
pub trait Registry: Send + Sync {
    /// Store `value` under `key`, replacing any previous value
    async fn set(&self, key: &str, value: &str);

    /// Look up the value stored under `key`
    async fn get(&self, key: &str) -> Option<String>;

    /// Summary for status reporting
    async fn stats(&self) -> RegistryStats;
}

/// Snapshot of registry size
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    /// Number of stored keys
    pub entries: usize,

    /// Total bytes held in values
    pub value_bytes: usize,
}
