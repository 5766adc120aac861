//! Shared world-facing types: positions, tiles, actors, layers and items.

use serde::{Deserialize, Serialize};

/// Size of one map tile in world units.
pub const TILE_SIZE: f32 = 32.0;

/// A point in world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: Position) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Offset this point by the given amounts.
    pub fn offset(&self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// A tile coordinate on the map grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    pub x: i32,
    pub y: i32,
}

impl TileCoord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// World-space center of this tile.
    pub fn center(&self) -> Position {
        Position::new(
            self.x as f32 * TILE_SIZE + TILE_SIZE / 2.0,
            self.y as f32 * TILE_SIZE + TILE_SIZE / 2.0,
        )
    }

    /// All tiles in the square of the given radius around this one, row by row.
    pub fn square(&self, radius: i32) -> impl Iterator<Item = TileCoord> {
        let (cx, cy) = (self.x, self.y);
        (-radius..=radius)
            .flat_map(move |dx| (-radius..=radius).map(move |dy| TileCoord::new(cx + dx, cy + dy)))
    }
}

impl std::fmt::Display for TileCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

/// Characters placed in the world by the host engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Actor {
    /// The first villager, near the start.
    Villager,
    /// The villager by the river, north-east.
    RiverVillager,
    /// The villager to the south.
    SouthVillager,
    /// The villager on the far side of the bridge.
    IslandVillager,
    InjuredMan,
    Cat,
    /// The girl from the dream; becomes the companion in post-game.
    Girl,
}

impl Actor {
    /// Speaker name used in dialogue lines.
    pub fn speaker(&self) -> &'static str {
        match self {
            Actor::Villager => "Villager 1",
            Actor::RiverVillager => "Villager 2",
            Actor::SouthVillager => "Villager 3",
            Actor::IslandVillager => "Island Villager",
            Actor::InjuredMan => "Injured Man",
            Actor::Cat => "Cat",
            Actor::Girl => "Nishi",
        }
    }
}

/// Tile layers the story logic reads or mutates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayerId {
    Water,
    Chest,
    Flowers,
    Mushrooms,
    Trees,
    BridgeBroken,
    BridgeFixed,
}

/// Item identifiers held in the inventory.
pub mod items {
    pub const KEY: &str = "Key";
    pub const OLD_AXE: &str = "Old Axe";
    pub const BOUQUET: &str = "Bouquet";
}
