use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One collected detail record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub uid: String,
    pub name: String,
    #[serde(flatten)]
    pub fields: BTreeMap<String, String>,
}

impl AgentRecord {
    /// Builds a record from a detail page's field map
    ///
    /// The uid and name discovered on the listing page win over any field of
    /// the same key scraped from the detail form.
    pub fn new(uid: String, name: String, mut fields: BTreeMap<String, String>) -> Self {
        fields.remove("uid");
        fields.remove("name");
        Self { uid, name, fields }
    }
}

/// The accumulated, uid-unique collection of records
///
/// Also tracks every uid ever discovered, recorded or not, so listing scans
/// can cheaply skip rows seen in any earlier run.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    discovered: BTreeSet<String>,
    records: BTreeMap<String, AgentRecord>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notes a uid as discovered; returns false if it was already known
    pub fn mark_discovered(&mut self, uid: &str) -> bool {
        self.discovered.insert(uid.to_string())
    }

    /// Returns true if this uid has been seen on any listing page, ever
    pub fn is_discovered(&self, uid: &str) -> bool {
        self.discovered.contains(uid)
    }

    /// Returns true if a full record exists for this uid
    pub fn is_recorded(&self, uid: &str) -> bool {
        self.records.contains_key(uid)
    }

    /// Merges a record in; a second record for the same uid is ignored
    pub fn insert(&mut self, record: AgentRecord) -> bool {
        self.discovered.insert(record.uid.clone());
        if self.records.contains_key(&record.uid) {
            return false;
        }
        self.records.insert(record.uid.clone(), record);
        true
    }

    pub fn get(&self, uid: &str) -> Option<&AgentRecord> {
        self.records.get(uid)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Every uid ever discovered, in stable order
    pub fn discovered_uids(&self) -> impl Iterator<Item = &String> {
        self.discovered.iter()
    }

    /// Every collected record, in stable uid order
    pub fn records(&self) -> impl Iterator<Item = &AgentRecord> {
        self.records.values()
    }
}
