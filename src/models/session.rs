use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Duration offered on first launch, 25 minutes.
pub const DEFAULT_DURATION_SECS: u64 = 25 * 60;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    #[default]
    Idle,
    Running,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Idle => "Idle",
            SessionStatus::Running => "Running",
        }
    }
}

/// Persisted session record.
///
/// `active` and `end_time` move together: a running session always carries its
/// absolute end time, an idle one never does.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default = "default_duration")]
    pub duration_seconds: u64,
    #[serde(default)]
    pub session_id: Option<String>,
}

fn default_duration() -> u64 {
    DEFAULT_DURATION_SECS
}

impl Default for Session {
    fn default() -> Self {
        Self::idle(DEFAULT_DURATION_SECS)
    }
}

impl Session {
    pub fn idle(duration_seconds: u64) -> Self {
        Self {
            active: false,
            end_time: None,
            duration_seconds,
            session_id: None,
        }
    }

    pub fn status(&self) -> SessionStatus {
        if self.active {
            SessionStatus::Running
        } else {
            SessionStatus::Idle
        }
    }

    pub fn is_running(&self) -> bool {
        self.status() == SessionStatus::Running
    }
}
