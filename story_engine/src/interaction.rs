//! Proximity interaction zones.
//!
//! Each tick the dispatcher selects the single nearest active zone whose
//! radius contains the player. An interact signal then yields that zone's
//! action for the caller to run.

use serde::{Deserialize, Serialize};
use story_state::Position;
use tracing::debug;
use uuid::Uuid;

/// Vertical offset of the prompt above its zone.
const PROMPT_OFFSET_Y: f32 = -20.0;

/// Unique identifier for interaction zones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ZoneId(pub Uuid);

impl ZoneId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ZoneId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ZoneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A world-positioned trigger bound to an action.
#[derive(Debug, Clone)]
pub struct InteractionZone<A> {
    pub id: ZoneId,
    pub position: Position,
    pub radius: f32,
    /// Inactive zones are never selected or prompted.
    pub active: bool,
    /// Prompt text, e.g. "Talk" or "Pick Up".
    pub label: String,
    pub action: A,
}

impl<A> InteractionZone<A> {
    /// Distance from the player if the player is within this zone's radius.
    fn reach(&self, player: Position) -> Option<f32> {
        let dist = self.position.distance(player);
        (dist <= self.radius).then_some(dist)
    }
}

/// The on-screen prompt for the selected zone.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub position: Position,
    pub label: String,
}

/// Registry of interaction zones and the current selection.
#[derive(Debug, Clone)]
pub struct InteractionDispatcher<A> {
    /// Zones in registration order; ties resolve to the earliest.
    zones: Vec<InteractionZone<A>>,
    selected: Option<ZoneId>,
}

impl<A> Default for InteractionDispatcher<A> {
    fn default() -> Self {
        Self {
            zones: Vec::new(),
            selected: None,
        }
    }
}

impl<A: Clone> InteractionDispatcher<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a zone. It starts active.
    pub fn register(
        &mut self,
        position: Position,
        radius: f32,
        action: A,
        label: impl Into<String>,
    ) -> ZoneId {
        let id = ZoneId::new();
        self.zones.push(InteractionZone {
            id,
            position,
            radius,
            active: true,
            label: label.into(),
            action,
        });
        id
    }

    /// Remove a zone entirely.
    pub fn remove(&mut self, id: ZoneId) -> Option<InteractionZone<A>> {
        let index = self.zones.iter().position(|z| z.id == id)?;
        if self.selected == Some(id) {
            self.selected = None;
        }
        Some(self.zones.remove(index))
    }

    pub fn zone(&self, id: ZoneId) -> Option<&InteractionZone<A>> {
        self.zones.iter().find(|z| z.id == id)
    }

    /// Mutable handle for relabelling, moving or toggling a zone.
    pub fn zone_mut(&mut self, id: ZoneId) -> Option<&mut InteractionZone<A>> {
        self.zones.iter_mut().find(|z| z.id == id)
    }

    pub fn zones(&self) -> impl Iterator<Item = &InteractionZone<A>> {
        self.zones.iter()
    }

    /// Set `active` on every zone whose action matches.
    ///
    /// Returns how many zones were touched.
    pub fn set_active_where<F>(&mut self, predicate: F, active: bool) -> usize
    where
        F: Fn(&A) -> bool,
    {
        let mut touched = 0;
        for zone in self.zones.iter_mut().filter(|z| predicate(&z.action)) {
            zone.active = active;
            touched += 1;
        }
        touched
    }

    /// Find the first zone whose action matches.
    pub fn find<F>(&self, predicate: F) -> Option<ZoneId>
    where
        F: Fn(&A) -> bool,
    {
        self.zones.iter().find(|z| predicate(&z.action)).map(|z| z.id)
    }

    /// Select the nearest active zone in range of the player.
    pub fn recompute(&mut self, player: Position) -> Option<ZoneId> {
        let mut best: Option<(ZoneId, f32)> = None;
        for zone in self.zones.iter().filter(|z| z.active) {
            if let Some(dist) = zone.reach(player) {
                // Strict comparison keeps the earliest zone on ties.
                if best.map_or(true, |(_, best_dist)| dist < best_dist) {
                    best = Some((zone.id, dist));
                }
            }
        }
        self.selected = best.map(|(id, _)| id);
        self.selected
    }

    /// The zone chosen by the last `recompute`, if still active.
    pub fn selected(&self) -> Option<&InteractionZone<A>> {
        self.selected
            .and_then(|id| self.zone(id))
            .filter(|z| z.active)
    }

    /// Trigger the selected zone, yielding its action.
    pub fn interact(&self) -> Option<A> {
        match self.selected() {
            Some(zone) => {
                debug!(label = %zone.label, zone = %zone.id, "interacting");
                Some(zone.action.clone())
            }
            None => {
                debug!("no zone close enough to interact");
                None
            }
        }
    }

    /// Prompt to display for the current selection.
    pub fn prompt(&self) -> Option<Prompt> {
        self.selected().map(|zone| Prompt {
            position: zone.position.offset(0.0, PROMPT_OFFSET_Y),
            label: zone.label.clone(),
        })
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}
