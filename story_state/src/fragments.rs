//! Memory fragments - collectibles whose unlock state survives across
//! sessions and story resets.
//!
//! The unlocked set is persisted on every mutation as
//! `{"fragments": [...], "timestamp": <unix millis>}`. Loading never fails:
//! missing or malformed data is an empty set.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

use crate::storage::{SharedStore, StorageResult};

/// Fragment identifiers used by the story.
pub mod fragment_ids {
    pub const INTRO_DREAM: &str = "intro_dream";
    pub const CAT_MEMORY: &str = "cat_memory";
    pub const BRIDGE_MEMORY: &str = "bridge_memory";
    pub const FLOWERS_MEMORY: &str = "flowers_memory";
}

/// Static description of a collectible fragment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentRecord {
    pub id: String,
    /// Title shown in the fragment viewer.
    pub label: String,
    /// Asset key of the fragment artwork.
    pub asset_key: String,
    /// Short hint shown under the artwork.
    pub hint: String,
}

impl FragmentRecord {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        asset_key: impl Into<String>,
        hint: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            asset_key: asset_key.into(),
            hint: hint.into(),
        }
    }
}

/// The ordered catalog of every fragment that can be collected.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FragmentCatalog {
    records: Vec<FragmentRecord>,
}

impl FragmentCatalog {
    pub fn new(records: Vec<FragmentRecord>) -> Self {
        Self { records }
    }

    /// The fragments of the story, in display order.
    pub fn story() -> Self {
        use fragment_ids::*;

        Self::new(vec![
            FragmentRecord::new(INTRO_DREAM, "THE DREAM", "frag_intro_dream", "Recovered at start"),
            FragmentRecord::new(CAT_MEMORY, "THE STRAY", "frag_cat_memory", "A new friend"),
            FragmentRecord::new(BRIDGE_MEMORY, "RECONNECTION", "frag_bridge_memory", "Path restored"),
            FragmentRecord::new(FLOWERS_MEMORY, "BLOOM", "frag_flowers_memory", "Nature's gift"),
        ])
    }

    pub fn get(&self, id: &str) -> Option<&FragmentRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn records(&self) -> &[FragmentRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Persisted form of the unlocked set.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedFragments {
    #[serde(default)]
    fragments: Vec<String>,
    #[serde(default)]
    timestamp: i64,
}

/// Registry of unlocked fragments, persisted independently of story flags.
pub struct MemoryRegistry {
    store: SharedStore,
    key: String,
    unlocked: BTreeSet<String>,
}

impl std::fmt::Debug for MemoryRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryRegistry")
            .field("key", &self.key)
            .field("unlocked", &self.unlocked)
            .finish()
    }
}

impl MemoryRegistry {
    /// Load the registry from storage. Missing or malformed data is empty.
    pub fn load(store: SharedStore, key: impl Into<String>) -> Self {
        let key = key.into();
        let unlocked = match read_unlocked(&store, &key) {
            Ok(unlocked) => unlocked,
            Err(e) => {
                warn!(key = %key, error = %e, "memory load failed; starting empty");
                BTreeSet::new()
            }
        };
        debug!(key = %key, count = unlocked.len(), "memory data loaded");
        Self {
            store,
            key,
            unlocked,
        }
    }

    /// Unlock a fragment. Returns `true` only the first time.
    pub fn unlock(&mut self, id: &str) -> bool {
        if self.unlocked.contains(id) {
            return false;
        }
        self.unlocked.insert(id.to_string());
        info!(fragment = id, "fragment unlocked");
        self.persist();
        true
    }

    pub fn is_unlocked(&self, id: &str) -> bool {
        self.unlocked.contains(id)
    }

    /// All unlocked ids, sorted.
    pub fn all(&self) -> Vec<String> {
        self.unlocked.iter().cloned().collect()
    }

    pub fn unlocked_count(&self) -> usize {
        self.unlocked.len()
    }

    /// Forget every unlocked fragment and delete the persisted record.
    pub fn reset(&mut self) {
        self.unlocked.clear();
        if let Err(e) = self.store.borrow_mut().remove(&self.key) {
            warn!(key = %self.key, error = %e, "memory wipe failed to remove storage");
        }
        info!("memory wiped");
    }

    fn persist(&self) {
        let record = PersistedFragments {
            fragments: self.all(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        };
        let result = serde_json::to_string(&record)
            .map_err(Into::into)
            .and_then(|json| self.store.borrow_mut().save(&self.key, &json));
        if let Err(e) = result {
            warn!(key = %self.key, error = %e, "memory save failed");
        }
    }
}

fn read_unlocked(store: &SharedStore, key: &str) -> StorageResult<BTreeSet<String>> {
    let Some(raw) = store.borrow().load(key)? else {
        return Ok(BTreeSet::new());
    };
    let record: PersistedFragments = serde_json::from_str(&raw)?;
    Ok(record.fragments.into_iter().collect())
}
