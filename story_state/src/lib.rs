//! # Story State
//!
//! The persistent and per-session state of Memory Device: story flags, the
//! inventory, unlocked memory fragments and the game-completion record.
//! This crate knows nothing about the engine, dialogue, or interaction zones;
//! it is the single source of truth those layers read and write.

pub mod completion;
pub mod config;
pub mod entities;
pub mod flags;
pub mod fragments;
pub mod inventory;
pub mod storage;

pub use completion::*;
pub use config::*;
pub use entities::*;
pub use flags::*;
pub use fragments::*;
pub use inventory::*;
pub use storage::*;
