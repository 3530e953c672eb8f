use std::collections::{BTreeMap, BTreeSet};

/// A row discovered on a listing page, before its detail record is fetched
///
/// The display name is kept exactly as it appears in the markup; character
/// entities are decoded only when the record is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentStub {
    pub uid: String,
    pub name: String,
}

/// Crawl progress that survives across runs
///
/// Reloaded at startup and rewritten at shutdown. A page or uid listed here
/// as pending is re-attempted by the next run; anything absent from both
/// pending collections has either been completed or never been discovered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressState {
    /// Page numbers known to exist
    pub known_pages: BTreeSet<u32>,

    /// Page numbers not yet successfully scanned
    pub pending_pages: BTreeSet<u32>,

    /// Discovered rows (uid -> display name) whose detail record is still missing
    pub pending_uids: BTreeMap<String, String>,

    /// URLs whose body needed a lossy re-decode
    pub decode_errors: Vec<String>,
}

impl ProgressState {
    /// Starting point for a run with no persisted history: page 1 pending
    pub fn initial() -> Self {
        Self {
            known_pages: BTreeSet::from([1]),
            pending_pages: BTreeSet::from([1]),
            pending_uids: BTreeMap::new(),
            decode_errors: Vec::new(),
        }
    }

    /// Returns true when nothing is left to fetch
    pub fn is_settled(&self) -> bool {
        self.pending_pages.is_empty() && self.pending_uids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_pends_page_one() {
        let progress = ProgressState::initial();
        assert!(progress.pending_pages.contains(&1));
        assert!(progress.known_pages.contains(&1));
        assert!(progress.pending_uids.is_empty());
        assert!(!progress.is_settled());
    }

    #[test]
    fn test_settled_when_nothing_pending() {
        let mut progress = ProgressState::initial();
        progress.pending_pages.clear();
        assert!(progress.is_settled());

        progress
            .pending_uids
            .insert("7".to_string(), "someone".to_string());
        assert!(!progress.is_settled());
    }
}
