//! Per-tick input as abstract signals.

use serde::{Deserialize, Serialize};

/// A velocity in world units per second.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Velocity {
    pub x: f32,
    pub y: f32,
}

impl Velocity {
    pub const ZERO: Velocity = Velocity { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

/// Held direction keys for one walker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Movement {
    pub left: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
}

impl Movement {
    pub fn left() -> Self {
        Self {
            left: true,
            ..Self::default()
        }
    }

    pub fn right() -> Self {
        Self {
            right: true,
            ..Self::default()
        }
    }

    pub fn up() -> Self {
        Self {
            up: true,
            ..Self::default()
        }
    }

    pub fn down() -> Self {
        Self {
            down: true,
            ..Self::default()
        }
    }

    /// Velocity for these keys at `speed`.
    ///
    /// Left beats right and up beats down. Diagonals are scaled so the
    /// overall speed stays the same.
    pub fn velocity(&self, speed: f32) -> Velocity {
        let x = if self.left {
            -speed
        } else if self.right {
            speed
        } else {
            0.0
        };
        let y = if self.up {
            -speed
        } else if self.down {
            speed
        } else {
            0.0
        };
        if x != 0.0 && y != 0.0 {
            let scale = std::f32::consts::FRAC_1_SQRT_2;
            Velocity::new(x * scale, y * scale)
        } else {
            Velocity::new(x, y)
        }
    }
}

/// Everything the host reports for one tick.
///
/// Movement fields are held keys; every other field is true only on the
/// tick the key went down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InputFrame {
    pub player: Movement,
    /// Second walker, used once the companion joins.
    pub companion: Movement,
    pub interact: bool,
    pub cancel: bool,
    pub confirm: bool,
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub yes: bool,
    pub no: bool,
}

impl InputFrame {
    /// No keys at all.
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn interact() -> Self {
        Self {
            interact: true,
            ..Self::default()
        }
    }

    pub fn yes() -> Self {
        Self {
            yes: true,
            ..Self::default()
        }
    }

    pub fn no() -> Self {
        Self {
            no: true,
            ..Self::default()
        }
    }

    pub fn cancel() -> Self {
        Self {
            cancel: true,
            ..Self::default()
        }
    }

    pub fn confirm() -> Self {
        Self {
            confirm: true,
            ..Self::default()
        }
    }

    pub fn with_player(mut self, movement: Movement) -> Self {
        self.player = movement;
        self
    }

    pub fn with_companion(mut self, movement: Movement) -> Self {
        self.companion = movement;
        self
    }
}
