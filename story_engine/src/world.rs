//! The host engine boundary.
//!
//! [`HostWorld`] is everything the story needs from a game engine: bodies,
//! tile layers and sound cues. [`GridWorld`] is a plain in-memory version
//! used by tests and headless hosts.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use story_state::{Actor, LayerId, Position, TileCoord};
use tracing::debug;

use crate::input::Velocity;

/// Named sound cues. Hosts without a matching sound skip the cue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cue {
    Chop,
    Repair,
    Meow,
    Death,
    /// The song that plays after a "yes".
    Celebration,
}

impl Cue {
    /// Asset key of the cue.
    pub fn key(&self) -> &'static str {
        match self {
            Cue::Chop => "chop",
            Cue::Repair => "repair",
            Cue::Meow => "meow",
            Cue::Death => "died",
            Cue::Celebration => "bg3-music",
        }
    }
}

/// What the story reads from and writes to the engine.
pub trait HostWorld {
    fn player_position(&self) -> Position;

    /// Teleport the player, e.g. to a spawn point.
    fn place_player(&mut self, position: Position);

    fn set_player_velocity(&mut self, velocity: Velocity);

    /// Position of an actor, if the host placed it.
    fn actor_position(&self, actor: Actor) -> Option<Position>;

    fn set_actor_position(&mut self, actor: Actor, position: Position);

    fn set_actor_visible(&mut self, actor: Actor, visible: bool);

    fn set_actor_velocity(&mut self, actor: Actor, velocity: Velocity);

    fn has_tile(&self, layer: LayerId, tile: TileCoord) -> bool;

    /// Remove a tile. Returns `false` if there was none.
    fn remove_tile(&mut self, layer: LayerId, tile: TileCoord) -> bool;

    /// World position of a tile's center.
    fn tile_center(&self, tile: TileCoord) -> Position {
        tile.center()
    }

    /// Every tile present on a layer.
    fn tiles(&self, layer: LayerId) -> Vec<TileCoord>;

    fn set_layer_visible(&mut self, layer: LayerId, visible: bool);

    /// Toggle whether a tile blocks movement.
    fn set_collision(&mut self, layer: LayerId, tile: TileCoord, collides: bool);

    fn play_cue(&mut self, cue: Cue);
}

/// A body tracked by [`GridWorld`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Body {
    pub position: Position,
    pub velocity: Velocity,
    pub visible: bool,
}

impl Body {
    fn step(&mut self, elapsed_ms: u64) {
        let secs = elapsed_ms as f32 / 1000.0;
        self.position = self
            .position
            .offset(self.velocity.x * secs, self.velocity.y * secs);
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Layer {
    tiles: BTreeSet<TileCoord>,
    visible: bool,
    blocked: BTreeSet<TileCoord>,
}

/// In-memory world: no rendering, no collision response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GridWorld {
    player: Body,
    actors: HashMap<Actor, Body>,
    layers: HashMap<LayerId, Layer>,
    cues: Vec<Cue>,
}

impl GridWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// The story map: the chest, two tree groves, three island flowers,
    /// a mushroom patch and the river crossing.
    pub fn story_map() -> Self {
        let grove = |center: TileCoord| center.square(1).collect::<Vec<_>>();
        let river = (15..=25).flat_map(|x| (17..=20).map(move |y| TileCoord::new(x, y)));

        let mut world = Self::new()
            .with_layer(LayerId::Chest, [TileCoord::new(6, 30)])
            .with_layer(
                LayerId::Trees,
                grove(TileCoord::new(3, 24))
                    .into_iter()
                    .chain(grove(TileCoord::new(10, 26))),
            )
            .with_layer(
                LayerId::Flowers,
                [
                    TileCoord::new(30, 6),
                    TileCoord::new(33, 4),
                    TileCoord::new(36, 7),
                ],
            )
            .with_layer(LayerId::Mushrooms, [TileCoord::new(8, 12), TileCoord::new(9, 12)])
            .with_layer(LayerId::Water, river)
            .with_layer(LayerId::BridgeBroken, (18..=22).map(|x| TileCoord::new(x, 18)))
            .with_layer(LayerId::BridgeFixed, (18..=22).map(|x| TileCoord::new(x, 18)));
        world.set_layer_visible(LayerId::BridgeFixed, false);
        for layer in [LayerId::Water, LayerId::Trees] {
            for tile in world.tiles(layer) {
                world.set_collision(layer, tile, true);
            }
        }
        world
    }

    /// Add tiles to a layer, creating it visible if needed.
    pub fn with_layer(mut self, layer: LayerId, tiles: impl IntoIterator<Item = TileCoord>) -> Self {
        let entry = self.layers.entry(layer).or_insert_with(|| Layer {
            visible: true,
            ..Layer::default()
        });
        entry.tiles.extend(tiles);
        self
    }

    pub fn player(&self) -> &Body {
        &self.player
    }

    pub fn actor(&self, actor: Actor) -> Option<&Body> {
        self.actors.get(&actor)
    }

    pub fn layer_visible(&self, layer: LayerId) -> bool {
        self.layers.get(&layer).is_some_and(|l| l.visible)
    }

    pub fn collides(&self, layer: LayerId, tile: TileCoord) -> bool {
        self.layers
            .get(&layer)
            .is_some_and(|l| l.blocked.contains(&tile))
    }

    /// Cues played so far, oldest first.
    pub fn cues(&self) -> &[Cue] {
        &self.cues
    }

    pub fn take_cues(&mut self) -> Vec<Cue> {
        std::mem::take(&mut self.cues)
    }

    /// Integrate every body's velocity.
    pub fn step(&mut self, elapsed_ms: u64) {
        self.player.step(elapsed_ms);
        for body in self.actors.values_mut() {
            body.step(elapsed_ms);
        }
    }
}

impl HostWorld for GridWorld {
    fn player_position(&self) -> Position {
        self.player.position
    }

    fn place_player(&mut self, position: Position) {
        self.player.position = position;
    }

    fn set_player_velocity(&mut self, velocity: Velocity) {
        self.player.velocity = velocity;
    }

    fn actor_position(&self, actor: Actor) -> Option<Position> {
        self.actors.get(&actor).map(|b| b.position)
    }

    fn set_actor_position(&mut self, actor: Actor, position: Position) {
        self.actors.entry(actor).or_default().position = position;
    }

    fn set_actor_visible(&mut self, actor: Actor, visible: bool) {
        self.actors.entry(actor).or_default().visible = visible;
    }

    fn set_actor_velocity(&mut self, actor: Actor, velocity: Velocity) {
        if let Some(body) = self.actors.get_mut(&actor) {
            body.velocity = velocity;
        }
    }

    fn has_tile(&self, layer: LayerId, tile: TileCoord) -> bool {
        self.layers
            .get(&layer)
            .is_some_and(|l| l.tiles.contains(&tile))
    }

    fn remove_tile(&mut self, layer: LayerId, tile: TileCoord) -> bool {
        let removed = self.layers.get_mut(&layer).is_some_and(|l| {
            l.blocked.remove(&tile);
            l.tiles.remove(&tile)
        });
        if removed {
            debug!(?layer, %tile, "tile removed");
        }
        removed
    }

    fn tiles(&self, layer: LayerId) -> Vec<TileCoord> {
        self.layers
            .get(&layer)
            .map(|l| l.tiles.iter().copied().collect())
            .unwrap_or_default()
    }

    fn set_layer_visible(&mut self, layer: LayerId, visible: bool) {
        if let Some(l) = self.layers.get_mut(&layer) {
            l.visible = visible;
        }
    }

    fn set_collision(&mut self, layer: LayerId, tile: TileCoord, collides: bool) {
        let Some(l) = self.layers.get_mut(&layer) else {
            return;
        };
        if !l.tiles.contains(&tile) {
            return;
        }
        if collides {
            l.blocked.insert(tile);
        } else {
            l.blocked.remove(&tile);
        }
    }

    fn play_cue(&mut self, cue: Cue) {
        debug!(cue = cue.key(), "cue");
        self.cues.push(cue);
    }
}
