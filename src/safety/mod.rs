//! Content-safety screening for the in-app browser.

mod classifier;
mod doh;
mod guard;

pub use classifier::{SafetyClassifier, UrlSafetyVerdict, Verdict, VerdictReason};
pub use doh::{DohAnswer, DohClient, DohLookup, DohResponse};
pub use guard::{NavigationDecision, NavigationGuard, NavigationVerdict};
