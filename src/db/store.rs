use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::warn;
use serde_json::Value;

use crate::timer::FocusState;

/// Durable key to JSON mapping supplied by the host.
#[async_trait]
pub trait PersistentState: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Must not return before the value is durably committed.
    async fn set(&self, key: &str, value: Value) -> Result<()>;
}

/// Process-local store for hosts without durable storage.
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, Value>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl PersistentState for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.entries().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        self.entries().insert(key.to_string(), value);
        Ok(())
    }
}

/// Reads the engine record stored under `key`.
///
/// A missing record yields `None`. A record that no longer parses is logged and
/// also treated as missing, so a corrupt value never blocks startup.
pub async fn load_focus_state(
    store: &dyn PersistentState,
    key: &str,
) -> Result<Option<FocusState>> {
    let Some(value) = store
        .get(key)
        .await
        .with_context(|| format!("failed to read persisted state '{key}'"))?
    else {
        return Ok(None);
    };

    match serde_json::from_value::<FocusState>(value) {
        Ok(state) => Ok(Some(state)),
        Err(err) => {
            warn!("Discarding unreadable persisted state '{key}': {err}");
            Ok(None)
        }
    }
}

pub async fn save_focus_state(
    store: &dyn PersistentState,
    key: &str,
    state: &FocusState,
) -> Result<()> {
    let value = serde_json::to_value(state).context("failed to serialize focus state")?;
    store
        .set(key, value)
        .await
        .with_context(|| format!("failed to write persisted state '{key}'"))
}
