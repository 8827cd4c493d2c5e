//! Preferences persistence layer
//!
//! Per-client display settings (theme, font size).
//! Currently in-memory only; nothing survives a restart.

use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FontSize {
    Small,
    #[default]
    Medium,
    Large,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Preferences {
    pub theme: Theme,
    pub font_size: FontSize,
}

/// Trait for preferences persistence
#[async_trait::async_trait]
pub trait PreferencesStore: Send + Sync {
    /// Unknown clients get the defaults.
    async fn load(&self, client_id: Uuid) -> Result<Preferences>;
    async fn save(&self, client_id: Uuid, preferences: Preferences) -> Result<()>;
}

/// In-memory preferences store for development
pub struct InMemoryPreferencesStore {
    by_client: Arc<RwLock<HashMap<Uuid, Preferences>>>,
}

impl InMemoryPreferencesStore {
    pub fn new() -> Self {
        Self {
            by_client: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryPreferencesStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl PreferencesStore for InMemoryPreferencesStore {
    async fn load(&self, client_id: Uuid) -> Result<Preferences> {
        let by_client = self.by_client.read().await;
        Ok(by_client.get(&client_id).copied().unwrap_or_default())
    }

    async fn save(&self, client_id: Uuid, preferences: Preferences) -> Result<()> {
        debug!(client_id = %client_id, ?preferences, "Saving preferences");
        let mut by_client = self.by_client.write().await;
        by_client.insert(client_id, preferences);
        Ok(())
    }
}
