use std::collections::BTreeSet;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{FocusError, FocusResult};
use crate::models::{AppIdentifier, BlockList, Session, SessionStatus};

/// Everything the engine persists under its namespaced key.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FocusState {
    #[serde(default)]
    pub session: Session,
    #[serde(default)]
    pub block_list: BlockList,
}

/// Read-only view of the engine, published after every transition and tick.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub status: SessionStatus,
    pub active: bool,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_seconds: u64,
    pub remaining_seconds: u64,
    pub session_id: Option<String>,
    pub blocked_apps: BTreeSet<AppIdentifier>,
}

impl FocusState {
    pub fn new(default_duration_secs: u64) -> Self {
        Self {
            session: Session::idle(default_duration_secs),
            block_list: BlockList::new(),
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.session.status()
    }

    /// Whole seconds left, rounded up. Idle sessions report the selected duration.
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> u64 {
        match (self.session.status(), self.session.end_time) {
            (SessionStatus::Running, Some(end_time)) => {
                let remaining_ms = (end_time - now).num_milliseconds();
                if remaining_ms <= 0 {
                    0
                } else {
                    ((remaining_ms + 999) / 1000) as u64
                }
            }
            _ => self.session.duration_seconds,
        }
    }

    pub fn begin_session(
        &mut self,
        duration_secs: u64,
        now: DateTime<Utc>,
        session_id: String,
    ) -> FocusResult<DateTime<Utc>> {
        let end_time = end_time_after(now, duration_secs)?;
        self.session = Session {
            active: true,
            end_time: Some(end_time),
            duration_seconds: duration_secs,
            session_id: Some(session_id),
        };
        Ok(end_time)
    }

    /// Returns false when there was nothing to end.
    pub fn end_session(&mut self) -> bool {
        if !self.session.is_running() {
            return false;
        }
        self.session.active = false;
        self.session.end_time = None;
        self.session.session_id = None;
        true
    }

    /// Repairs a record that breaks the `active` / `end_time` pairing. Returns
    /// true if anything changed.
    pub fn normalize(&mut self) -> bool {
        let consistent = self.session.active == self.session.end_time.is_some();
        if consistent && (self.session.active || self.session.session_id.is_none()) {
            return false;
        }
        self.session.active = false;
        self.session.end_time = None;
        self.session.session_id = None;
        true
    }

    pub fn snapshot(&self, now: DateTime<Utc>) -> SessionSnapshot {
        SessionSnapshot {
            status: self.status(),
            active: self.session.active,
            end_time: self.session.end_time,
            duration_seconds: self.session.duration_seconds,
            remaining_seconds: self.remaining_secs(now),
            session_id: self.session.session_id.clone(),
            blocked_apps: self.block_list.snapshot(),
        }
    }
}

fn end_time_after(now: DateTime<Utc>, duration_secs: u64) -> FocusResult<DateTime<Utc>> {
    i64::try_from(duration_secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .and_then(|delta| now.checked_add_signed(delta))
        .ok_or_else(|| {
            FocusError::invalid_argument(format!("duration {duration_secs}s is out of range"))
        })
}
