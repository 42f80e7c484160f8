use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Opaque application identifier (package name, bundle id, process name).
pub type AppIdentifier = String;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BlockList {
    #[serde(default)]
    pub members: BTreeSet<AppIdentifier>,
}

impl BlockList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `app_id` if absent, removes it if present. Returns whether the app
    /// is blocked afterwards.
    pub fn toggle(&mut self, app_id: &str) -> bool {
        if self.members.remove(app_id) {
            false
        } else {
            self.members.insert(app_id.to_string());
            true
        }
    }

    pub fn contains(&self, app_id: &str) -> bool {
        self.members.contains(app_id)
    }

    /// Copy of the members, handed to the monitoring gateway at session start.
    pub fn snapshot(&self) -> BTreeSet<AppIdentifier> {
        self.members.clone()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggle_adds_then_removes() {
        let mut list = BlockList::new();
        assert!(list.toggle("com.social.app"));
        assert!(list.contains("com.social.app"));
        assert!(!list.toggle("com.social.app"));
        assert!(list.is_empty());
    }

    #[test]
    fn snapshot_is_detached_from_later_edits() {
        let mut list = BlockList::new();
        list.toggle("com.video.app");
        let snapshot = list.snapshot();
        list.toggle("com.chat.app");

        assert_eq!(snapshot.len(), 1);
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn members_serialize_as_sorted_array() {
        let mut list = BlockList::new();
        list.toggle("b.app");
        list.toggle("a.app");
        let json = serde_json::to_value(&list).unwrap();
        assert_eq!(json, serde_json::json!({ "members": ["a.app", "b.app"] }));
    }
}
