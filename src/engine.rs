use std::{collections::BTreeSet, sync::Arc};

use chrono::Utc;
use log::{info, warn};
use tokio::sync::{watch, Mutex};

use crate::{
    db::PersistentState,
    error::{FocusError, FocusResult},
    models::AppIdentifier,
    monitoring::MonitoringGateway,
    safety::{DohClient, DohLookup, NavigationGuard, NavigationVerdict, SafetyClassifier},
    settings::FocusConfig,
    timer::{CountdownClock, SessionController, SessionSnapshot},
};

/// Entry point for a UI shell: one session controller, its countdown, and the
/// navigation guard, wired from a [`FocusConfig`].
pub struct FocusEngine {
    controller: SessionController,
    clock: Mutex<CountdownClock>,
    guard: NavigationGuard,
}

impl FocusEngine {
    pub async fn new(
        config: &FocusConfig,
        store: Arc<dyn PersistentState>,
        gateway: Arc<dyn MonitoringGateway>,
        lookup: Arc<dyn DohLookup>,
    ) -> FocusResult<Self> {
        config
            .validate()
            .map_err(|err| FocusError::invalid_argument(format!("{err:#}")))?;

        let controller = SessionController::load(store, gateway, config).await?;
        let classifier = SafetyClassifier::new(lookup, config.deny_keywords.clone());

        Ok(Self {
            controller,
            clock: Mutex::new(CountdownClock::new(config.tick_interval(), config.debug)),
            guard: NavigationGuard::new(Arc::new(classifier)),
        })
    }

    /// Like [`FocusEngine::new`], resolving through the configured DoH endpoint.
    pub async fn with_resolver(
        config: &FocusConfig,
        store: Arc<dyn PersistentState>,
        gateway: Arc<dyn MonitoringGateway>,
    ) -> FocusResult<Self> {
        let client = DohClient::from_config(config)
            .map_err(|err| FocusError::invalid_argument(format!("{err:#}")))?;
        Self::new(config, store, gateway, Arc::new(client)).await
    }

    /// Reconciles persisted state with the wall clock after a launch.
    ///
    /// An expired session is ended right away. A live one gets its blocking
    /// re-issued and its countdown restarted.
    pub async fn restore(&self) -> FocusResult<SessionSnapshot> {
        let now = Utc::now();
        self.controller.tick(now).await;

        if self.controller.resume_monitoring().await {
            self.start_clock().await?;
        }

        Ok(self.controller.snapshot(now).await)
    }

    pub async fn start_session(&self, duration_secs: u64) -> FocusResult<SessionSnapshot> {
        let snapshot = self.controller.start(duration_secs).await?;
        self.start_clock().await?;
        Ok(snapshot)
    }

    pub async fn stop_session(&self) -> FocusResult<()> {
        self.stop_clock().await;
        self.controller.stop().await
    }

    /// Current remaining seconds. May end an expired session.
    pub async fn remaining(&self) -> u64 {
        self.controller.tick(Utc::now()).await
    }

    pub async fn set_duration(&self, duration_secs: u64) -> FocusResult<()> {
        self.controller.set_duration(duration_secs).await
    }

    pub async fn toggle_blocked_app(&self, app_id: &str) -> FocusResult<bool> {
        self.controller.toggle_app(app_id).await
    }

    pub async fn blocked_apps(&self) -> BTreeSet<AppIdentifier> {
        self.controller.blocked_apps().await
    }

    pub async fn is_active(&self) -> bool {
        self.controller.is_active().await
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.controller.snapshot(Utc::now()).await
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.controller.subscribe()
    }

    /// Screens a navigation while a session runs. Outside a session every
    /// navigation is allowed without a lookup.
    pub async fn screen_navigation(&self, url: &str) -> NavigationVerdict {
        if !self.controller.is_active().await {
            return NavigationVerdict::allow(url);
        }
        self.guard.check(url).await
    }

    pub fn guard(&self) -> &NavigationGuard {
        &self.guard
    }

    pub fn controller(&self) -> &SessionController {
        &self.controller
    }

    /// Cancels the countdown for teardown of the owning context. The session
    /// itself keeps running and is picked up again by [`FocusEngine::restore`].
    pub async fn shutdown(&self) {
        self.stop_clock().await;
        info!("Focus engine shut down");
    }

    async fn start_clock(&self) -> FocusResult<()> {
        let mut clock = self.clock.lock().await;
        if let Err(err) = clock.stop().await {
            warn!("Previous countdown ended abnormally: {err:#}");
        }
        clock
            .start(self.controller.clone())
            .map_err(|err| FocusError::invalid_state(format!("{err:#}")))
    }

    async fn stop_clock(&self) {
        if let Err(err) = self.clock.lock().await.stop().await {
            warn!("Countdown ended abnormally: {err:#}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::safety::NavigationDecision;
    use crate::testing::{RecordingGateway, StaticLookup};

    async fn engine(lookup: Arc<StaticLookup>) -> (FocusEngine, Arc<RecordingGateway>) {
        let gateway = Arc::new(RecordingGateway::new());
        let engine = FocusEngine::new(
            &FocusConfig::default(),
            Arc::new(MemoryStore::new()),
            gateway.clone(),
            lookup,
        )
        .await
        .unwrap();
        (engine, gateway)
    }

    #[tokio::test]
    async fn navigation_is_only_screened_during_a_session() {
        let lookup = Arc::new(StaticLookup::answering(r#"{"Answer":[{"data":"0.0.0.0"}]}"#));
        let (engine, _) = engine(lookup.clone()).await;

        let idle = engine.screen_navigation("https://blocked.example").await;
        assert_eq!(idle.decision, NavigationDecision::Allow);
        assert_eq!(lookup.calls(), 0);

        engine.start_session(1500).await.unwrap();
        let running = engine.screen_navigation("https://blocked.example").await;
        assert!(running.is_blocked());
        assert_eq!(lookup.calls(), 1);

        engine.stop_session().await.unwrap();
    }

    #[tokio::test]
    async fn start_and_stop_drive_gateway_once_each() {
        let (engine, gateway) = engine(Arc::new(StaticLookup::failing("offline"))).await;
        engine.toggle_blocked_app("com.social.app").await.unwrap();

        let snapshot = engine.start_session(1500).await.unwrap();
        assert!(snapshot.active);
        assert!(snapshot.session_id.is_some());

        engine.stop_session().await.unwrap();
        engine.stop_session().await.unwrap();

        assert_eq!(gateway.starts().len(), 1);
        assert_eq!(gateway.stops(), 1);
        assert!(!engine.is_active().await);
    }

    #[tokio::test]
    async fn invalid_config_is_rejected() {
        let config = FocusConfig {
            tick_interval_ms: 0,
            ..FocusConfig::default()
        };
        let result = FocusEngine::new(
            &config,
            Arc::new(MemoryStore::new()),
            Arc::new(RecordingGateway::new()),
            Arc::new(StaticLookup::failing("unused")),
        )
        .await;
        assert!(matches!(result, Err(FocusError::InvalidArgument(_))));
    }
}
