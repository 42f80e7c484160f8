use std::{collections::BTreeSet, path::Path, time::Duration};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};
use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::models::AppIdentifier;

use super::MonitoringGateway;

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

struct Watcher {
    handle: JoinHandle<()>,
    cancel_token: CancellationToken,
}

/// Desktop gateway: while active, scans running processes once per poll and
/// terminates any whose name matches a blocked identifier.
pub struct ProcessWatchGateway {
    poll_interval: Duration,
    watcher: Mutex<Option<Watcher>>,
}

impl Default for ProcessWatchGateway {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

impl ProcessWatchGateway {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            poll_interval,
            watcher: Mutex::new(None),
        }
    }

    pub async fn is_watching(&self) -> bool {
        self.watcher
            .lock()
            .await
            .as_ref()
            .is_some_and(|watcher| !watcher.handle.is_finished())
    }

    async fn shutdown_watcher(&self) -> Result<()> {
        let Some(watcher) = self.watcher.lock().await.take() else {
            return Ok(());
        };
        watcher.cancel_token.cancel();
        watcher
            .handle
            .await
            .context("process watch task failed to join")
    }
}

#[async_trait]
impl MonitoringGateway for ProcessWatchGateway {
    async fn start(&self, app_ids: &BTreeSet<AppIdentifier>) -> Result<()> {
        if self.poll_interval.is_zero() {
            bail!("process watch poll interval must be greater than zero");
        }

        self.shutdown_watcher().await?;

        let blocked: BTreeSet<String> = app_ids.iter().map(|id| id.to_lowercase()).collect();
        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(watch_loop(
            blocked,
            self.poll_interval,
            cancel_token.clone(),
        ));

        *self.watcher.lock().await = Some(Watcher {
            handle,
            cancel_token,
        });
        log_info!("Process watch started for {} apps", app_ids.len());
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.shutdown_watcher().await?;
        log_info!("Process watch stopped");
        Ok(())
    }
}

impl Drop for ProcessWatchGateway {
    fn drop(&mut self) {
        if let Some(watcher) = self.watcher.get_mut().take() {
            watcher.cancel_token.cancel();
        }
    }
}

async fn watch_loop(blocked: BTreeSet<String>, poll_interval: Duration, cancel_token: CancellationToken) {
    if blocked.is_empty() {
        log_info!("Process watch has an empty block-list; idling until stopped");
        cancel_token.cancelled().await;
        return;
    }

    let mut system = System::new();
    let own_pid = Pid::from_u32(std::process::id());
    let mut ticker = time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => sweep(&mut system, own_pid, &blocked),
            _ = cancel_token.cancelled() => break,
        }
    }
}

fn sweep(system: &mut System, own_pid: Pid, blocked: &BTreeSet<String>) {
    system.refresh_processes_specifics(ProcessesToUpdate::All, ProcessRefreshKind::everything());

    for (pid, process) in system.processes() {
        if *pid == own_pid {
            continue;
        }

        let name = process.name().to_string_lossy();
        let Some(app_id) = blocked_match(&name, process.exe(), blocked) else {
            continue;
        };

        if process.kill() {
            log_info!("Closed blocked app {} (pid {})", app_id, pid);
        } else {
            log_warn!("Failed to close blocked app {} (pid {})", app_id, pid);
        }
    }
}

/// Returns the blocked identifier matching a process, comparing the process
/// name and executable file stem case-insensitively. `blocked` must already be
/// lower-cased.
fn blocked_match<'a>(
    name: &str,
    exe: Option<&Path>,
    blocked: &'a BTreeSet<String>,
) -> Option<&'a String> {
    let name = name.to_lowercase();
    if let Some(hit) = blocked.get(&name) {
        return Some(hit);
    }

    let stem = exe?.file_stem()?.to_string_lossy().to_lowercase();
    blocked.get(&stem)
}
