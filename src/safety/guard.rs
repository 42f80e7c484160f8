use std::sync::Arc;

use log::info;
use serde::Serialize;

use super::classifier::{SafetyClassifier, UrlSafetyVerdict, Verdict};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum NavigationDecision {
    Allow,
    /// Stop rendering and show the blocking interstitial.
    Block,
}

/// Decision for one navigation, tagged with the URL it was computed for.
///
/// Lookups are not cancelled when the user navigates on; compare `url` with
/// what is displayed now and drop the verdict if they differ.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationVerdict {
    pub url: String,
    pub hostname: String,
    pub decision: NavigationDecision,
}

impl NavigationVerdict {
    pub fn allow(url: &str) -> Self {
        Self {
            url: url.to_string(),
            hostname: String::new(),
            decision: NavigationDecision::Allow,
        }
    }

    pub fn is_blocked(&self) -> bool {
        self.decision == NavigationDecision::Block
    }

    pub fn is_current(&self, displayed_url: &str) -> bool {
        self.url == displayed_url
    }
}

/// Screens every navigation event, redirects included, with no memoization.
#[derive(Clone)]
pub struct NavigationGuard {
    classifier: Arc<SafetyClassifier>,
}

impl NavigationGuard {
    pub fn new(classifier: Arc<SafetyClassifier>) -> Self {
        Self { classifier }
    }

    pub async fn check(&self, url: &str) -> NavigationVerdict {
        let UrlSafetyVerdict {
            hostname,
            verdict,
            reason,
        } = self.classifier.classify(url).await;

        let decision = match verdict {
            Verdict::Safe => NavigationDecision::Allow,
            Verdict::Unsafe => {
                info!("Blocking navigation to {hostname} ({reason:?})");
                NavigationDecision::Block
            }
        };

        NavigationVerdict {
            url: url.to_string(),
            hostname,
            decision,
        }
    }
}
