use std::sync::Arc;

use log::{debug, warn};
use serde::Serialize;
use url::Url;

use crate::error::FocusError;

use super::doh::DohLookup;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Safe,
    Unsafe,
}

/// Why a verdict came out the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum VerdictReason {
    /// Empty or unparsable URL, or one without a host.
    NotScreened,
    KeywordMatch,
    Sinkholed,
    ResolverAllowed,
    /// The resolver could not be reached or answered badly; allowed anyway.
    LookupFailed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UrlSafetyVerdict {
    pub hostname: String,
    pub verdict: Verdict,
    pub reason: VerdictReason,
}

impl UrlSafetyVerdict {
    fn new(hostname: impl Into<String>, verdict: Verdict, reason: VerdictReason) -> Self {
        Self {
            hostname: hostname.into(),
            verdict,
            reason,
        }
    }

    pub fn is_safe(&self) -> bool {
        self.verdict == Verdict::Safe
    }
}

/// Classifies URLs by asking a family-safe DNS resolver about their host.
///
/// Every path that cannot reach a verdict resolves to `Safe`: malformed input,
/// resolver outages and unreadable answers all let the page through. Screening
/// is best-effort and never gets in the way of browsing when the resolver is
/// down.
#[derive(Clone)]
pub struct SafetyClassifier {
    lookup: Arc<dyn DohLookup>,
    deny_keywords: Vec<String>,
}

impl SafetyClassifier {
    pub fn new(lookup: Arc<dyn DohLookup>, deny_keywords: Vec<String>) -> Self {
        let deny_keywords = deny_keywords
            .into_iter()
            .map(|keyword| keyword.trim().to_lowercase())
            .filter(|keyword| !keyword.is_empty())
            .collect();
        Self {
            lookup,
            deny_keywords,
        }
    }

    pub async fn classify(&self, url: &str) -> UrlSafetyVerdict {
        let Some(hostname) = hostname_of(url) else {
            debug!("Not screening unparsable url {url:?}");
            return UrlSafetyVerdict::new("", Verdict::Safe, VerdictReason::NotScreened);
        };

        if self
            .deny_keywords
            .iter()
            .any(|keyword| hostname.contains(keyword.as_str()))
        {
            return UrlSafetyVerdict::new(hostname, Verdict::Unsafe, VerdictReason::KeywordMatch);
        }

        match self.lookup.resolve_a(&hostname).await {
            Ok(response) if response.is_sinkholed() => {
                UrlSafetyVerdict::new(hostname, Verdict::Unsafe, VerdictReason::Sinkholed)
            }
            Ok(_) => UrlSafetyVerdict::new(hostname, Verdict::Safe, VerdictReason::ResolverAllowed),
            Err(err) => {
                let err = FocusError::Classifier(err);
                warn!("Allowing {hostname} after failed safety lookup: {err:#}");
                UrlSafetyVerdict::new(hostname, Verdict::Safe, VerdictReason::LookupFailed)
            }
        }
    }
}

fn hostname_of(url: &str) -> Option<String> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return None;
    }
    let parsed = Url::parse(trimmed).ok()?;
    let host = parsed.host_str()?.trim_end_matches('.').to_lowercase();
    (!host.is_empty()).then_some(host)
}
