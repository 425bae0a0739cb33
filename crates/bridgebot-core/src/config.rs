//! Runtime assistant configuration store.
//!
//! The admin API writes the configuration; every dispatch reads a snapshot.
//! Last writer wins, and a change takes effect on the next dispatch.

use std::sync::Arc;

use bridgebot_types::config::AiConfig;
use tokio::sync::RwLock;
use tracing::info;

/// Shared, cloneable handle to the current [`AiConfig`].
#[derive(Debug, Clone, Default)]
pub struct ConfigStore {
    inner: Arc<RwLock<AiConfig>>,
}

impl ConfigStore {
    pub fn new(initial: AiConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(initial.normalized())),
        }
    }

    /// A copy of the current configuration.
    pub async fn snapshot(&self) -> AiConfig {
        self.inner.read().await.clone()
    }

    /// Replace the configuration, returning the stored (normalized) value.
    pub async fn update(&self, config: AiConfig) -> AiConfig {
        let config = config.normalized();
        *self.inner.write().await = config.clone();
        info!(
            business_name = %config.business_name,
            industry = %config.industry,
            "assistant configuration updated"
        );
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_store_is_incomplete() {
        let store = ConfigStore::default();
        assert!(!store.snapshot().await.is_complete());
    }

    #[tokio::test]
    async fn test_update_is_visible_to_existing_clones() {
        let store = ConfigStore::default();
        let reader = store.clone();

        let stored = store
            .update(AiConfig {
                business_name: " Sunrise Bakery ".to_string(),
                industry: "food".to_string(),
                instructions: "Be brief.".to_string(),
            })
            .await;

        assert_eq!(stored.business_name, "Sunrise Bakery");
        assert_eq!(reader.snapshot().await, stored);
    }

    #[tokio::test]
    async fn test_last_writer_wins() {
        let store = ConfigStore::default();
        for name in ["first", "second", "third"] {
            store
                .update(AiConfig {
                    business_name: name.to_string(),
                    ..Default::default()
                })
                .await;
        }
        assert_eq!(store.snapshot().await.business_name, "third");
    }
}
