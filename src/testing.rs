//! Test doubles shared by the unit tests.

use std::{
    collections::BTreeSet,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Mutex,
    },
};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use serde_json::Value;

use crate::db::{MemoryStore, PersistentState};
use crate::models::AppIdentifier;
use crate::monitoring::MonitoringGateway;
use crate::safety::{DohLookup, DohResponse};

pub struct StaticLookup {
    answer: Result<DohResponse, String>,
    calls: AtomicUsize,
    last_hostname: Mutex<Option<String>>,
}

impl StaticLookup {
    pub fn answering(json: &str) -> Self {
        Self::with(Ok(serde_json::from_str(json).unwrap()))
    }

    pub fn failing(message: &str) -> Self {
        Self::with(Err(message.to_string()))
    }

    fn with(answer: Result<DohResponse, String>) -> Self {
        Self {
            answer,
            calls: AtomicUsize::new(0),
            last_hostname: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_hostname(&self) -> Option<String> {
        self.last_hostname.lock().unwrap().clone()
    }
}

#[async_trait]
impl DohLookup for StaticLookup {
    async fn resolve_a(&self, hostname: &str) -> Result<DohResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_hostname.lock().unwrap() = Some(hostname.to_string());
        self.answer.clone().map_err(|message| anyhow!(message))
    }
}

/// Gateway double recording every call. Optionally peeks at the store on
/// `start` so tests can check what was persisted before the call.
#[derive(Default)]
pub struct RecordingGateway {
    starts: Mutex<Vec<BTreeSet<AppIdentifier>>>,
    stops: AtomicUsize,
    fail: AtomicBool,
    probe: Option<(MemoryStore, String)>,
    persisted_at_start: Mutex<Vec<Option<Value>>>,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let gateway = Self::default();
        gateway.fail.store(true, Ordering::SeqCst);
        gateway
    }

    pub fn probing(store: MemoryStore, key: &str) -> Self {
        Self {
            probe: Some((store, key.to_string())),
            ..Self::default()
        }
    }

    pub fn starts(&self) -> Vec<BTreeSet<AppIdentifier>> {
        self.starts.lock().unwrap().clone()
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn persisted_at_start(&self) -> Vec<Option<Value>> {
        self.persisted_at_start.lock().unwrap().clone()
    }
}

#[async_trait]
impl MonitoringGateway for RecordingGateway {
    async fn start(&self, app_ids: &BTreeSet<AppIdentifier>) -> Result<()> {
        self.starts.lock().unwrap().push(app_ids.clone());
        if let Some((store, key)) = &self.probe {
            let persisted = store.get(key).await?;
            self.persisted_at_start.lock().unwrap().push(persisted);
        }
        if self.fail.load(Ordering::SeqCst) {
            bail!("accessibility service unavailable");
        }
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            bail!("accessibility service unavailable");
        }
        Ok(())
    }
}

/// Store whose writes can be made to fail.
#[derive(Default)]
pub struct FailingStore {
    inner: MemoryStore,
    fail_writes: AtomicBool,
}

impl FailingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl PersistentState for FailingStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            bail!("disk full");
        }
        self.inner.set(key, value).await
    }
}
