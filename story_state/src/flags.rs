//! Story flags - the named booleans and counters that track progress.
//!
//! Every flag must be declared in a [`FlagSchema`] before it can be written.
//! Writes to undeclared names (or with a value of the wrong kind) are
//! rejected with a diagnostic and leave the store untouched.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, warn};

/// Names of the flags declared by the story schema.
pub mod names {
    pub const GAME_STARTED: &str = "game_started";
    pub const INTRO_TALKED: &str = "intro_talked";
    pub const BLUE_TALKED: &str = "blue_talked";
    pub const ORANGE_TALKED: &str = "orange_talked";
    pub const BRIDGE_SEEN: &str = "bridge_seen";
    pub const QUEST_STARTED: &str = "quest_started";
    pub const CAT_FOUND: &str = "cat_found";
    pub const KEY_COLLECTED: &str = "key_collected";
    pub const CHEST_OPENED: &str = "chest_opened";
    pub const TOOLS_COLLECTED: &str = "tools_collected";
    pub const BRIDGE_REPAIRED: &str = "bridge_repaired";
    pub const FAILED_BRIDGE: &str = "failed_bridge";
    pub const WOOD_COLLECTED: &str = "wood_collected";
    pub const NORTH_VILLAGER_TALKED: &str = "north_villager_talked";
    pub const FLOWERS_COLLECTED: &str = "flowers_collected";
    pub const HAS_BOUQUET: &str = "has_bouquet";
    pub const MET_GIRL: &str = "met_girl";
}

/// Logs needed to rebuild the bridge.
pub const WOOD_TARGET: i64 = 2;

/// Flowers needed for the bouquet.
pub const FLOWER_TARGET: i64 = 3;

/// The value of a single flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagValue {
    Bool(bool),
    Int(i64),
}

impl FlagValue {
    /// Truthiness: `true`, or any non-zero counter.
    pub fn as_bool(&self) -> bool {
        match self {
            FlagValue::Bool(b) => *b,
            FlagValue::Int(n) => *n != 0,
        }
    }

    /// Counter value; booleans read as 0 or 1.
    pub fn as_int(&self) -> i64 {
        match self {
            FlagValue::Bool(b) => i64::from(*b),
            FlagValue::Int(n) => *n,
        }
    }

    fn same_kind(&self, other: &FlagValue) -> bool {
        matches!(
            (self, other),
            (FlagValue::Bool(_), FlagValue::Bool(_)) | (FlagValue::Int(_), FlagValue::Int(_))
        )
    }
}

impl From<bool> for FlagValue {
    fn from(value: bool) -> Self {
        FlagValue::Bool(value)
    }
}

impl From<i64> for FlagValue {
    fn from(value: i64) -> Self {
        FlagValue::Int(value)
    }
}

impl std::fmt::Display for FlagValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlagValue::Bool(b) => write!(f, "{}", b),
            FlagValue::Int(n) => write!(f, "{}", n),
        }
    }
}

/// A declared flag: its default and what it means.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagDecl {
    pub default: FlagValue,
    pub description: String,
}

/// The fixed set of flags a store accepts.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FlagSchema {
    decls: BTreeMap<String, FlagDecl>,
}

impl FlagSchema {
    /// Create an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a flag with its default value.
    pub fn declare(
        mut self,
        name: impl Into<String>,
        default: impl Into<FlagValue>,
        description: impl Into<String>,
    ) -> Self {
        self.decls.insert(
            name.into(),
            FlagDecl {
                default: default.into(),
                description: description.into(),
            },
        );
        self
    }

    /// The schema used by the story.
    pub fn story() -> Self {
        use names::*;

        Self::new()
            .declare(GAME_STARTED, false, "Opening monologue has played")
            .declare(INTRO_TALKED, false, "First villager conversation done")
            .declare(BLUE_TALKED, false, "River villager conversation done")
            .declare(ORANGE_TALKED, false, "South villager conversation done")
            .declare(BRIDGE_SEEN, false, "Broken bridge inspected; reveals the injured man")
            .declare(QUEST_STARTED, false, "Injured man asked for help; reveals the cat")
            .declare(CAT_FOUND, false, "Cat picked up")
            .declare(KEY_COLLECTED, false, "Injured man handed over the key")
            .declare(CHEST_OPENED, false, "Chest opened (one-time pickup guard)")
            .declare(TOOLS_COLLECTED, false, "Axe taken from the chest")
            .declare(BRIDGE_REPAIRED, false, "Bridge rebuilt and crossable")
            .declare(FAILED_BRIDGE, false, "Reserved: a failed repair attempt")
            .declare(WOOD_COLLECTED, 0i64, "Logs chopped (counter, target 2)")
            .declare(NORTH_VILLAGER_TALKED, false, "Island villager gave the flower quest")
            .declare(FLOWERS_COLLECTED, 0i64, "Flowers picked (counter, target 3)")
            .declare(HAS_BOUQUET, false, "Bouquet is being carried")
            .declare(MET_GIRL, false, "The main branch concluded with \"yes\"")
    }

    /// Check whether a flag is declared.
    pub fn contains(&self, name: &str) -> bool {
        self.decls.contains_key(name)
    }

    /// Get the declaration of a flag.
    pub fn get(&self, name: &str) -> Option<&FlagDecl> {
        self.decls.get(name)
    }

    /// Iterate over all declarations in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FlagDecl)> {
        self.decls.iter().map(|(name, decl)| (name.as_str(), decl))
    }

    /// Number of declared flags.
    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }
}

/// A copy of flag values, used to seed a store (e.g. the post-game state).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FlagSnapshot {
    pub values: BTreeMap<String, FlagValue>,
}

impl FlagSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value to the snapshot.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FlagValue>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// The late-game state loaded by "LOAD GAME" once the story is completed.
    pub fn post_game() -> Self {
        use names::*;

        Self::new()
            .with(MET_GIRL, true)
            .with(HAS_BOUQUET, false)
            .with(GAME_STARTED, true)
            .with(QUEST_STARTED, true)
            .with(CAT_FOUND, true)
            .with(KEY_COLLECTED, true)
            .with(CHEST_OPENED, true)
            .with(TOOLS_COLLECTED, true)
            .with(BRIDGE_REPAIRED, true)
            .with(WOOD_COLLECTED, WOOD_TARGET)
            .with(FLOWERS_COLLECTED, FLOWER_TARGET)
            .with(NORTH_VILLAGER_TALKED, true)
    }
}

/// Named story flags, restricted to a declared schema.
#[derive(Debug, Clone)]
pub struct FlagStore {
    schema: FlagSchema,
    values: HashMap<String, FlagValue>,
}

impl FlagStore {
    /// Create a store with every declared flag at its default.
    pub fn new(schema: FlagSchema) -> Self {
        let mut store = Self {
            schema,
            values: HashMap::new(),
        };
        store.reset_to_defaults();
        store
    }

    /// Create a store for the story schema.
    pub fn story() -> Self {
        Self::new(FlagSchema::story())
    }

    pub fn schema(&self) -> &FlagSchema {
        &self.schema
    }

    /// Write a flag.
    ///
    /// Returns `false` (and logs) when the name is undeclared or the value
    /// kind does not match the declared default.
    pub fn set(&mut self, name: &str, value: impl Into<FlagValue>) -> bool {
        let value = value.into();
        let Some(decl) = self.schema.get(name) else {
            warn!(flag = name, %value, "flag not declared; write ignored");
            return false;
        };
        if !decl.default.same_kind(&value) {
            warn!(flag = name, %value, expected = %decl.default, "flag kind mismatch; write ignored");
            return false;
        }
        debug!(flag = name, %value, "flag updated");
        self.values.insert(name.to_string(), value);
        true
    }

    /// Read a flag. Undeclared names yield `None`.
    pub fn get(&self, name: &str) -> Option<FlagValue> {
        self.values.get(name).copied()
    }

    /// Read a flag as a boolean; undeclared names read as `false`.
    pub fn get_bool(&self, name: &str) -> bool {
        self.get(name).map(|v| v.as_bool()).unwrap_or(false)
    }

    /// Read a flag as a counter; undeclared names read as 0.
    pub fn get_int(&self, name: &str) -> i64 {
        self.get(name).map(|v| v.as_int()).unwrap_or(0)
    }

    /// Increment a counter flag and return its new value.
    pub fn increment(&mut self, name: &str) -> Option<i64> {
        match self.get(name) {
            Some(FlagValue::Int(n)) => {
                let next = n + 1;
                self.set(name, next).then_some(next)
            }
            Some(FlagValue::Bool(_)) => {
                warn!(flag = name, "cannot increment a boolean flag");
                None
            }
            None => {
                warn!(flag = name, "flag not declared; increment ignored");
                None
            }
        }
    }

    /// Put every declared flag back to its default.
    pub fn reset_to_defaults(&mut self) {
        self.values = self
            .schema
            .iter()
            .map(|(name, decl)| (name.to_string(), decl.default))
            .collect();
    }

    /// Copy the current values.
    pub fn snapshot(&self) -> FlagSnapshot {
        FlagSnapshot {
            values: self.values.iter().map(|(k, v)| (k.clone(), *v)).collect(),
        }
    }

    /// Apply a snapshot on top of the current values.
    ///
    /// Returns how many entries were accepted by the schema.
    pub fn apply(&mut self, snapshot: &FlagSnapshot) -> usize {
        snapshot
            .values
            .iter()
            .filter(|(name, value)| self.set(name, **value))
            .count()
    }
}

impl Default for FlagStore {
    fn default() -> Self {
        Self::story()
    }
}
