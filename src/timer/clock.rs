use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use tokio::{
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use super::SessionController;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info};

const HEARTBEAT_EVERY_TICKS: u32 = 10;

/// Periodic driver of [`SessionController::tick`].
///
/// Every firing reads the wall clock and asks the controller for the remaining
/// time, so a process that was suspended for minutes lands on the right value
/// at its next tick. The task ends by itself once the session is over and is
/// cancelled on `stop` or when the clock is dropped.
pub struct CountdownClock {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
    tick_interval: Duration,
    heartbeat_every_ticks: u32,
}

impl CountdownClock {
    pub fn new(tick_interval: Duration, debug_mode: bool) -> Self {
        Self {
            handle: None,
            cancel_token: None,
            tick_interval,
            heartbeat_every_ticks: if debug_mode { 1 } else { HEARTBEAT_EVERY_TICKS },
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn start(&mut self, controller: SessionController) -> Result<()> {
        if self.is_running() {
            bail!("countdown already running");
        }
        if self.tick_interval.is_zero() {
            bail!("tick interval must be greater than zero");
        }

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(countdown_loop(
            controller,
            self.tick_interval,
            self.heartbeat_every_ticks,
            cancel_token.clone(),
        ));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("countdown task failed to join")
        } else {
            Ok(())
        }
    }
}

impl Drop for CountdownClock {
    fn drop(&mut self) {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
    }
}

async fn countdown_loop(
    controller: SessionController,
    tick_interval: Duration,
    heartbeat_every: u32,
    cancel_token: CancellationToken,
) {
    let mut ticker = time::interval(tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut ticks: u32 = 0;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let remaining = controller.tick(Utc::now()).await;
                if !controller.is_active().await {
                    log_info!("Countdown finished");
                    break;
                }

                ticks = ticks.wrapping_add(1);
                if ticks % heartbeat_every == 0 {
                    log_debug!("Countdown heartbeat: {}s remaining", remaining);
                }
            }
            _ = cancel_token.cancelled() => {
                log_info!("Countdown cancelled");
                break;
            }
        }
    }
}
