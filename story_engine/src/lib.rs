//! # Story Engine
//!
//! The playable layer of Memory Device, built on `story_state`. It decides
//! what happens when the player walks up to something and presses interact,
//! plays the resulting dialogue, and runs the timed sequences that follow.
//!
//! ## Core Components
//!
//! - **interaction**: Proximity zones and nearest-zone selection
//! - **dialogue**: Typewriter dialogue with conversation chains and yes/no choices
//! - **quest**: Pure branch table from zone and story state to lines and effects
//! - **session**: One playthrough; owns all per-run state and the tick loop
//! - **scene**: Boot, title, pause and fragment viewer screens
//! - **world**: The host engine boundary and an in-memory grid world
//!
//! The engine never renders, plays audio or simulates physics. Hosts do that
//! behind [`HostWorld`] and read toasts, prompts and UI events between ticks.

pub mod dialogue;
pub mod events;
pub mod game;
pub mod hint;
pub mod input;
pub mod interaction;
pub mod quest;
pub mod scene;
pub mod scheduler;
pub mod session;
pub mod world;

pub use dialogue::*;
pub use events::*;
pub use game::*;
pub use hint::*;
pub use input::*;
pub use interaction::*;
pub use quest::*;
pub use scene::*;
pub use scheduler::*;
pub use session::*;
pub use world::*;
