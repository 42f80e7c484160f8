use std::{collections::BTreeSet, sync::Arc};

use chrono::{DateTime, Utc};
use log::{error, info, warn};
use tokio::sync::{watch, Mutex};
use uuid::Uuid;

use crate::{
    db::{load_focus_state, save_focus_state, PersistentState},
    error::{FocusError, FocusResult},
    models::{AppIdentifier, SessionStatus},
    monitoring::MonitoringGateway,
    settings::FocusConfig,
};

use super::{FocusState, SessionSnapshot};

/// Owns the focus session: start, stop, expiry, duration and block-list edits.
///
/// Transitions hold the state lock until persistence and the gateway call have
/// both completed, so they never interleave. State is always written before the
/// gateway hears about it.
#[derive(Clone)]
pub struct SessionController {
    state: Arc<Mutex<FocusState>>,
    store: Arc<dyn PersistentState>,
    gateway: Arc<dyn MonitoringGateway>,
    storage_key: Arc<str>,
    updates: Arc<watch::Sender<SessionSnapshot>>,
}

impl SessionController {
    /// Builds a controller from whatever `store` holds under the configured key.
    ///
    /// First launch writes the defaults. A record breaking the `active` /
    /// `endTime` pairing is reset to idle. A session whose end time has already
    /// passed is left as-is; the next `tick` expires it.
    pub async fn load(
        store: Arc<dyn PersistentState>,
        gateway: Arc<dyn MonitoringGateway>,
        config: &FocusConfig,
    ) -> FocusResult<Self> {
        let storage_key: Arc<str> = Arc::from(config.storage_key.as_str());
        let loaded = load_focus_state(store.as_ref(), &storage_key)
            .await
            .map_err(FocusError::Storage)?;

        let (state, dirty) = match loaded {
            Some(mut state) => {
                let repaired = state.normalize();
                if repaired {
                    warn!("Persisted focus session was inconsistent; reset to idle");
                }
                (state, repaired)
            }
            None => (FocusState::new(config.default_duration_secs), true),
        };

        if dirty {
            if let Err(err) = save_focus_state(store.as_ref(), &storage_key, &state).await {
                warn!("Failed to write initial focus state: {err:#}");
            }
        }

        info!(
            "Focus session loaded: status={}, duration={}s, blocked apps={}",
            state.status().as_str(),
            state.session.duration_seconds,
            state.block_list.len()
        );

        let (updates, _) = watch::channel(state.snapshot(Utc::now()));

        Ok(Self {
            state: Arc::new(Mutex::new(state)),
            store,
            gateway,
            storage_key,
            updates: Arc::new(updates),
        })
    }

    pub async fn start(&self, duration_secs: u64) -> FocusResult<SessionSnapshot> {
        self.start_at(duration_secs, Utc::now()).await
    }

    /// Starts a session ending `duration_secs` after `now`.
    ///
    /// A gateway failure is logged and the session keeps running: the timer
    /// still counts down even if nothing is being blocked.
    pub async fn start_at(
        &self,
        duration_secs: u64,
        now: DateTime<Utc>,
    ) -> FocusResult<SessionSnapshot> {
        if duration_secs == 0 {
            return Err(FocusError::invalid_argument(
                "duration must be greater than zero",
            ));
        }

        let mut state = self.state.lock().await;
        if state.status() != SessionStatus::Idle {
            return Err(FocusError::invalid_state("focus session already running"));
        }

        let mut next = state.clone();
        let session_id = Uuid::new_v4().to_string();
        let end_time = next.begin_session(duration_secs, now, session_id.clone())?;
        self.persist(&next).await?;
        *state = next;

        let apps = state.block_list.snapshot();
        info!(
            "Focus session {session_id} started for {duration_secs}s (ends {end_time}), blocking {} apps",
            apps.len()
        );

        if let Err(err) = self.gateway.start(&apps).await {
            let err = FocusError::Gateway(err);
            error!("Session {session_id} running without app blocking: {err:#}");
        }

        let snapshot = state.snapshot(now);
        self.updates.send_replace(snapshot.clone());
        Ok(snapshot)
    }

    /// Ends the running session. Idle is a no-op.
    ///
    /// The gateway is told to stop even if persisting fails; the storage error
    /// is still returned.
    pub async fn stop(&self) -> FocusResult<()> {
        let mut state = self.state.lock().await;
        self.end_locked(&mut state, Utc::now(), "stopped").await
    }

    /// Seconds left at `now`, or the selected duration while idle.
    ///
    /// Reaching zero while running ends the session before returning, so
    /// callers must re-read `is_active` after every tick.
    pub async fn tick(&self, now: DateTime<Utc>) -> u64 {
        let mut state = self.state.lock().await;
        let remaining = state.remaining_secs(now);

        if remaining == 0 && state.status() == SessionStatus::Running {
            // storage failures are logged inside; the session is over either way
            let _ = self.end_locked(&mut state, now, "expired").await;
        } else {
            self.updates.send_replace(state.snapshot(now));
        }

        remaining
    }

    pub async fn set_duration(&self, duration_secs: u64) -> FocusResult<()> {
        if duration_secs == 0 {
            return Err(FocusError::invalid_argument(
                "duration must be greater than zero",
            ));
        }

        let mut state = self.state.lock().await;
        if state.status() == SessionStatus::Running {
            return Err(FocusError::invalid_state(
                "duration cannot change while a session is running",
            ));
        }

        let mut next = state.clone();
        next.session.duration_seconds = duration_secs;
        self.persist(&next).await?;
        *state = next;

        self.updates.send_replace(state.snapshot(Utc::now()));
        Ok(())
    }

    /// Adds or removes `app_id` from the block-list. Returns whether the app is
    /// blocked afterwards.
    pub async fn toggle_app(&self, app_id: &str) -> FocusResult<bool> {
        let app_id = app_id.trim();
        if app_id.is_empty() {
            return Err(FocusError::invalid_argument("app identifier is required"));
        }

        let mut state = self.state.lock().await;
        if state.status() == SessionStatus::Running {
            return Err(FocusError::invalid_state(
                "block-list is locked while a session is running",
            ));
        }

        let mut next = state.clone();
        let blocked = next.block_list.toggle(app_id);
        self.persist(&next).await?;
        *state = next;

        self.updates.send_replace(state.snapshot(Utc::now()));
        Ok(blocked)
    }

    pub async fn blocked_apps(&self) -> BTreeSet<AppIdentifier> {
        self.state.lock().await.block_list.snapshot()
    }

    pub async fn is_active(&self) -> bool {
        self.state.lock().await.status() == SessionStatus::Running
    }

    pub async fn snapshot(&self, now: DateTime<Utc>) -> SessionSnapshot {
        self.state.lock().await.snapshot(now)
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.updates.subscribe()
    }

    /// Re-issues the gateway start for a session that survived a restart.
    /// Returns false when no session is running.
    pub async fn resume_monitoring(&self) -> bool {
        let state = self.state.lock().await;
        if state.status() != SessionStatus::Running {
            return false;
        }

        let apps = state.block_list.snapshot();
        info!("Resuming app blocking for {} apps after restart", apps.len());
        if let Err(err) = self.gateway.start(&apps).await {
            let err = FocusError::Gateway(err);
            error!("Resumed session running without app blocking: {err:#}");
        }
        true
    }

    async fn end_locked(
        &self,
        state: &mut FocusState,
        now: DateTime<Utc>,
        reason: &str,
    ) -> FocusResult<()> {
        let session_id = state.session.session_id.clone().unwrap_or_default();
        if !state.end_session() {
            return Ok(());
        }
        info!("Focus session {session_id} {reason}");

        let persisted = self.persist(state).await;
        if let Err(err) = &persisted {
            error!("Failed to persist end of session {session_id}: {err:#}");
        }

        if let Err(err) = self.gateway.stop().await {
            let err = FocusError::Gateway(err);
            error!("Failed to release app blocking for session {session_id}: {err:#}");
        }

        self.updates.send_replace(state.snapshot(now));
        persisted
    }

    async fn persist(&self, state: &FocusState) -> FocusResult<()> {
        save_focus_state(self.store.as_ref(), &self.storage_key, state)
            .await
            .map_err(FocusError::Storage)
    }
}
