//! Shared crawl state and its transitions
//!
//! All mutable state - persisted progress, the dataset, and the in-flight
//! markers - lives in one [`CrawlState`] behind a single mutex. Every state
//! transition is one method call under that lock, so concurrent fetch
//! completions can never interleave partial updates.

mod dataset;
mod progress;

pub use dataset::{AgentRecord, Dataset};
pub use progress::{AgentStub, ProgressState};

use std::collections::BTreeSet;

/// Outcome of asking to start a detail fetch for a uid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailAdmission {
    /// No record and no running attempt: go fetch
    Admitted,
    /// Another attempt for this uid is still outstanding
    InFlight,
    /// The dataset already holds this uid; no network call needed
    AlreadyRecorded,
}

/// The single mutation-owning object for one crawl run
#[derive(Debug, Default)]
pub struct CrawlState {
    pub progress: ProgressState,
    pub dataset: Dataset,
    total_pages: Option<u32>,
    listing_in_flight: BTreeSet<u32>,
    detail_in_flight: BTreeSet<String>,
}

impl CrawlState {
    /// Combines freshly loaded progress and dataset into a consistent state
    ///
    /// Reconciles the two files: pending pages are always known pages, and
    /// every pending uid counts as discovered for dedup purposes.
    pub fn new(progress: ProgressState, dataset: Dataset) -> Self {
        let mut state = Self {
            progress,
            dataset,
            total_pages: None,
            listing_in_flight: BTreeSet::new(),
            detail_in_flight: BTreeSet::new(),
        };

        let pending: Vec<u32> = state.progress.pending_pages.iter().copied().collect();
        state.progress.known_pages.extend(pending);

        let pending_uids: Vec<String> = state.progress.pending_uids.keys().cloned().collect();
        for uid in pending_uids {
            state.dataset.mark_discovered(&uid);
        }

        state
    }

    /// Admits a listing scan for `page`
    ///
    /// Returns false when the page is not pending (already done) or when an
    /// attempt for it is still running; a retry must never start while the
    /// prior attempt for the same page is outstanding.
    pub fn admit_listing(&mut self, page: u32) -> bool {
        self.progress.pending_pages.contains(&page) && self.listing_in_flight.insert(page)
    }

    /// Records the authoritative total page count
    ///
    /// Only the first learning materializes work: returns the page numbers
    /// newly added to the pending set, in [2, total], skipping anything
    /// already known (and therefore already done or already queued). Later
    /// learnings are no-ops.
    pub fn learn_total_pages(&mut self, total: u32) -> Vec<u32> {
        if self.total_pages.is_some() {
            return Vec::new();
        }
        self.total_pages = Some(total);

        let mut materialized = Vec::new();
        for page in 2..=total {
            if self.progress.known_pages.insert(page) {
                self.progress.pending_pages.insert(page);
                materialized.push(page);
            }
        }
        materialized
    }

    /// The authoritative page count, if any page has carried it yet
    pub fn total_pages(&self) -> Option<u32> {
        self.total_pages
    }

    /// Completes a listing scan, deduplicating its stubs
    ///
    /// The page leaves the pending set for good. Returns only the stubs whose
    /// uid has never been seen before; those enter the pending-uid set.
    pub fn finish_listing(&mut self, page: u32, stubs: Vec<AgentStub>) -> Vec<AgentStub> {
        self.listing_in_flight.remove(&page);
        self.progress.pending_pages.remove(&page);
        self.progress.known_pages.insert(page);

        let mut fresh = Vec::new();
        for stub in stubs {
            if self.dataset.mark_discovered(&stub.uid) {
                self.progress
                    .pending_uids
                    .insert(stub.uid.clone(), stub.name.clone());
                fresh.push(stub);
            }
        }
        fresh
    }

    /// Admits a detail fetch for `uid`
    pub fn admit_detail(&mut self, uid: &str) -> DetailAdmission {
        if self.dataset.is_recorded(uid) {
            // A rerun may re-issue work it already completed; drop the
            // leftover pending entry so the run can settle.
            self.progress.pending_uids.remove(uid);
            return DetailAdmission::AlreadyRecorded;
        }
        if !self.detail_in_flight.insert(uid.to_string()) {
            return DetailAdmission::InFlight;
        }
        DetailAdmission::Admitted
    }

    /// Completes a detail fetch: the record enters the dataset and the uid
    /// leaves the pending set
    pub fn finish_detail(&mut self, record: AgentRecord) {
        self.detail_in_flight.remove(&record.uid);
        self.progress.pending_uids.remove(&record.uid);
        self.dataset.insert(record);
    }

    /// Logs a URL whose body needed a lossy re-decode
    pub fn record_decode_error(&mut self, url: &str) {
        if !self.progress.decode_errors.iter().any(|u| u == url) {
            self.progress.decode_errors.push(url.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn stub(uid: &str, name: &str) -> AgentStub {
        AgentStub {
            uid: uid.to_string(),
            name: name.to_string(),
        }
    }

    fn fresh_state() -> CrawlState {
        CrawlState::new(ProgressState::initial(), Dataset::new())
    }

    #[test]
    fn test_admit_listing_guards_in_flight() {
        let mut state = fresh_state();

        assert!(state.admit_listing(1));
        // Same page, attempt still running: refused.
        assert!(!state.admit_listing(1));
        // Unknown page: refused.
        assert!(!state.admit_listing(2));
    }

    #[test]
    fn test_learn_total_pages_materializes_once() {
        let mut state = fresh_state();

        let first = state.learn_total_pages(4);
        assert_eq!(first, vec![2, 3, 4]);
        assert_eq!(state.total_pages(), Some(4));

        // Redundant learnings from later pages must not re-expand the set.
        let second = state.learn_total_pages(4);
        assert!(second.is_empty());
        let conflicting = state.learn_total_pages(9);
        assert!(conflicting.is_empty());
        assert_eq!(state.total_pages(), Some(4));
    }

    #[test]
    fn test_learn_total_pages_skips_completed_pages() {
        let mut progress = ProgressState::initial();
        // Pages 1 and 2 finished in an earlier run; 3 is still pending.
        progress.known_pages.extend([2, 3]);
        progress.pending_pages = BTreeSet::from([3]);
        let mut state = CrawlState::new(progress, Dataset::new());

        let materialized = state.learn_total_pages(3);
        assert!(materialized.is_empty());
        assert_eq!(state.progress.pending_pages, BTreeSet::from([3]));
    }

    #[test]
    fn test_finish_listing_dedups_stubs() {
        let mut state = fresh_state();
        state.admit_listing(1);

        let fresh = state.finish_listing(1, vec![stub("1", "A"), stub("2", "B"), stub("1", "A")]);
        assert_eq!(fresh.len(), 2);
        assert!(state.progress.pending_uids.contains_key("1"));
        assert!(state.progress.pending_uids.contains_key("2"));
        assert!(!state.progress.pending_pages.contains(&1));

        // A later page listing the same rows discovers nothing new.
        state.learn_total_pages(2);
        state.admit_listing(2);
        let fresh = state.finish_listing(2, vec![stub("2", "B"), stub("3", "C")]);
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].uid, "3");
    }

    #[test]
    fn test_finished_page_cannot_be_readmitted() {
        let mut state = fresh_state();
        state.admit_listing(1);
        state.finish_listing(1, vec![stub("1", "A")]);

        assert!(!state.admit_listing(1));
    }

    #[test]
    fn test_admit_detail_short_circuits_recorded_uid() {
        let mut state = fresh_state();
        state
            .progress
            .pending_uids
            .insert("7".to_string(), "seven".to_string());
        state.dataset.insert(AgentRecord::new(
            "7".to_string(),
            "seven".to_string(),
            BTreeMap::new(),
        ));

        assert_eq!(state.admit_detail("7"), DetailAdmission::AlreadyRecorded);
        // The stale pending entry is cleared so the run can settle.
        assert!(!state.progress.pending_uids.contains_key("7"));
    }

    #[test]
    fn test_admit_detail_guards_in_flight() {
        let mut state = fresh_state();

        assert_eq!(state.admit_detail("9"), DetailAdmission::Admitted);
        assert_eq!(state.admit_detail("9"), DetailAdmission::InFlight);

        state.finish_detail(AgentRecord::new(
            "9".to_string(),
            "nine".to_string(),
            BTreeMap::new(),
        ));
        assert_eq!(state.admit_detail("9"), DetailAdmission::AlreadyRecorded);
    }

    #[test]
    fn test_finish_detail_clears_pending() {
        let mut state = fresh_state();
        state.admit_listing(1);
        state.finish_listing(1, vec![stub("4", "D")]);
        assert_eq!(state.admit_detail("4"), DetailAdmission::Admitted);

        state.finish_detail(AgentRecord::new(
            "4".to_string(),
            "D".to_string(),
            BTreeMap::new(),
        ));

        assert!(!state.progress.pending_uids.contains_key("4"));
        assert!(state.dataset.is_recorded("4"));
    }

    #[test]
    fn test_new_reconciles_loaded_files() {
        let mut progress = ProgressState::initial();
        progress.pending_pages.insert(5);
        progress
            .pending_uids
            .insert("11".to_string(), "eleven".to_string());
        let state = CrawlState::new(progress, Dataset::new());

        assert!(state.progress.known_pages.contains(&5));
        assert!(state.dataset.is_discovered("11"));
    }

    #[test]
    fn test_record_decode_error_dedups() {
        let mut state = fresh_state();
        state.record_decode_error("http://example.com/a");
        state.record_decode_error("http://example.com/a");
        state.record_decode_error("http://example.com/b");

        assert_eq!(state.progress.decode_errors.len(), 2);
    }
}
