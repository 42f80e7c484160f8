//! Focus session engine.
//!
//! A session blocks a chosen set of apps until its absolute end time passes and
//! screens browser navigation against a family-safe DNS resolver meanwhile.
//! Storage, the device-level blocker and the resolver are injected, so the
//! same engine runs behind a mobile shell, a desktop app or a test.

pub mod db;
pub mod engine;
pub mod error;
pub mod models;
pub mod monitoring;
pub mod safety;
pub mod settings;
pub mod timer;
pub mod utils;

#[cfg(test)]
mod testing;

pub use db::{MemoryStore, PersistentState, SqliteStore};
pub use engine::FocusEngine;
pub use error::{FocusError, FocusResult};
pub use models::{AppIdentifier, BlockList, Session, SessionStatus};
pub use monitoring::{MonitoringGateway, NoopGateway, ProcessWatchGateway};
pub use safety::{
    DohClient, DohLookup, NavigationDecision, NavigationGuard, NavigationVerdict,
    SafetyClassifier, UrlSafetyVerdict, Verdict,
};
pub use settings::FocusConfig;
pub use timer::{CountdownClock, SessionController, SessionSnapshot};
pub use utils::logging::init_logging;
