//! Device-level app blocking.
//!
//! The engine never blocks anything itself; it tells a [`MonitoringGateway`]
//! when to start and stop, and which applications to keep closed.

use std::collections::BTreeSet;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::AppIdentifier;

mod process;

pub use process::ProcessWatchGateway;

#[async_trait]
pub trait MonitoringGateway: Send + Sync {
    /// Begin blocking `app_ids`. Replaces any block-list from an earlier call.
    async fn start(&self, app_ids: &BTreeSet<AppIdentifier>) -> Result<()>;

    async fn stop(&self) -> Result<()>;
}

/// Gateway for platforms without a blocking mechanism.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopGateway;

#[async_trait]
impl MonitoringGateway for NoopGateway {
    async fn start(&self, app_ids: &BTreeSet<AppIdentifier>) -> Result<()> {
        log::debug!("NoopGateway: ignoring start for {} apps", app_ids.len());
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        Ok(())
    }
}
