//! In-memory registry
//!
//! A `HashMap` behind a tokio `RwLock`. Readers never observe a half-written
//! value; a get racing a set on the same key sees either the old or the new value.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::{Registry, RegistryStats};

/// Registry kept entirely in memory
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Registry for MemoryRegistry {
    async fn set(&self, key: &str, value: &str) {
        let mut entries = self.entries.write().await;
        if let Some(previous) = entries.insert(key.to_string(), value.to_string()) {
            debug!("Registry: replaced previous value for {} ({} bytes)", key, previous.len());
        }
    }

    async fn get(&self, key: &str) -> Option<String> {
        self.entries.read().await.get(key).cloned()
    }

    async fn stats(&self) -> RegistryStats {
        let entries = self.entries.read().await;
        RegistryStats {
            entries: entries.len(),
            value_bytes: entries.values().map(String::len).sum(),
        }
    }
}
