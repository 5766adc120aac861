//! One playthrough of the story.
//!
//! A [`StorySession`] owns every piece of per-run state: flags, inventory,
//! zones, dialogue, delayed steps and toasts. The host drives it with
//! [`StorySession::tick`] once per frame and reads observers between ticks.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use story_state::{
    fragment_ids, names, Actor, CompletionRecord, FlagSnapshot, FlagStore, Inventory, LayerId,
    MemoryRegistry, Position, SharedStore, StoryConfig, TileCoord, FLOWER_TARGET,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::dialogue::{Advance, DialogueMode, DialogueSequencer};
use crate::events::{ScreenEffect, ToastFeed, UiEvent};
use crate::hint;
use crate::input::{InputFrame, Velocity};
use crate::interaction::{InteractionDispatcher, Prompt};
use crate::quest::{
    self, places, Beat, Branch, Choice, Effect, StoryStep, StoryView, ZoneKind, CHOP_DURATION_MS,
};
use crate::scheduler::StepScheduler;
use crate::world::{Cue, HostWorld};

/// Unique identifier for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a session begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StartMode {
    /// Fresh flags at their defaults.
    NewGame,
    /// Flags seeded with the post-game snapshot.
    LoadGame,
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionExit {
    /// Poisoned: start over with a fresh session.
    RestartSession,
    /// The twist ending: back to the boot screen.
    ReturnToBoot,
}

/// Bridge tiles whose water collision is cleared once the bridge is fixed.
const BRIDGE_CROSSING_X: std::ops::RangeInclusive<i32> = 17..=23;
const BRIDGE_CROSSING_Y: std::ops::RangeInclusive<i32> = 18..=19;

/// Radius of the grove felled by one chop.
const TREE_CLUSTER_RADIUS: i32 = 2;

const POISON_GASP_DELAY_MS: u64 = 2000;
const POISON_BLACKOUT_DELAY_MS: u64 = 5000;
const RESTART_DELAY_MS: u64 = 3000;
const MEMORIES_ERASED_DELAY_MS: u64 = 3000;
const RETURN_TO_BOOT_DELAY_MS: u64 = 4000;

/// Retry delay for a monologue that came due over another conversation.
const MONOLOGUE_RETRY_MS: u64 = 500;

/// Per-playthrough context.
#[derive(Debug)]
pub struct StorySession {
    id: SessionId,
    mode: StartMode,
    config: StoryConfig,
    flags: FlagStore,
    inventory: Inventory,
    memories: MemoryRegistry,
    completion: CompletionRecord,
    dialogue: DialogueSequencer<Vec<Effect>>,
    zones: InteractionDispatcher<ZoneKind>,
    scheduler: StepScheduler<StoryStep>,
    toasts: ToastFeed,
    events: Vec<UiEvent>,
    rng: StdRng,
    dying: bool,
    chopping: Option<TileCoord>,
    companion: bool,
    exit: Option<SessionExit>,
}

impl StorySession {
    /// Build a session and set up `world` for it.
    pub fn start(
        config: &StoryConfig,
        store: SharedStore,
        mode: StartMode,
        world: &mut dyn HostWorld,
    ) -> Self {
        let memories = MemoryRegistry::load(store.clone(), config.storage.fragments_key.clone());
        let completion = CompletionRecord::new(store, config.storage.completion_key.clone());
        let mut session = Self {
            id: SessionId::new(),
            mode,
            config: config.clone(),
            flags: FlagStore::new(config.flag_schema()),
            inventory: Inventory::new(),
            memories,
            completion,
            dialogue: DialogueSequencer::new(config.dialogue.reveal_interval_ms),
            zones: InteractionDispatcher::new(),
            scheduler: StepScheduler::new(),
            toasts: ToastFeed::new(config.toast.duration_ms),
            events: Vec::new(),
            rng: StdRng::seed_from_u64(config.session.seed),
            dying: false,
            chopping: None,
            companion: false,
            exit: None,
        };
        session.setup(world);
        session
    }

    /// Throw away all progress and start again in place.
    ///
    /// Steps queued by the old run are invalidated and never fire.
    pub fn restart(&mut self, world: &mut dyn HostWorld) {
        let old = self.id;
        self.id = SessionId::new();
        self.flags.reset_to_defaults();
        self.inventory.clear();
        self.dialogue.dismiss();
        self.zones = InteractionDispatcher::new();
        self.scheduler.invalidate();
        self.toasts = ToastFeed::new(self.config.toast.duration_ms);
        self.events.clear();
        self.rng = StdRng::seed_from_u64(self.config.session.seed);
        self.dying = false;
        self.chopping = None;
        self.companion = false;
        self.exit = None;
        info!(old = %old, session = %self.id, "session restarted");
        self.setup(world);
    }

    fn setup(&mut self, world: &mut dyn HostWorld) {
        if self.mode == StartMode::LoadGame {
            self.flags.apply(&FlagSnapshot::post_game());
        }
        let post_game = self.flags.get_bool(names::MET_GIRL);

        world.place_player(if post_game {
            places::POST_GAME_SPAWN
        } else {
            places::SPAWN
        });

        for (actor, at) in [
            (Actor::Villager, places::VILLAGER),
            (Actor::RiverVillager, places::RIVER_VILLAGER),
            (Actor::SouthVillager, places::SOUTH_VILLAGER),
            (Actor::IslandVillager, places::ISLAND_VILLAGER),
        ] {
            self.place_actor(world, actor, at, true);
        }

        let man_visible = post_game || self.flags.get_bool(names::BRIDGE_SEEN);
        self.place_actor(world, Actor::InjuredMan, places::INJURED_MAN, man_visible);

        if post_game {
            self.place_actor(world, Actor::Cat, places::CAT_POST_GAME, true);
            self.relabel(ZoneKind::Cat, "Pet");
            self.place_actor(world, Actor::Girl, places::GIRL_POST_GAME, true);
            self.relabel(ZoneKind::Girl, "Talk");
            self.companion = true;
        } else {
            let cat_waiting = self.flags.get_bool(names::QUEST_STARTED)
                && !self.flags.get_bool(names::CAT_FOUND);
            self.place_actor(world, Actor::Cat, places::CAT, cat_waiting);
            let girl_waiting = self.flags.get_bool(names::HAS_BOUQUET);
            self.place_actor(world, Actor::Girl, places::GIRL, girl_waiting);
        }

        let bridge = ZoneKind::Bridge;
        self.zones
            .register(places::BRIDGE, bridge.radius(), bridge, bridge.label());

        let flowers_open = self.flags.get_bool(names::NORTH_VILLAGER_TALKED)
            && self.flags.get_int(names::FLOWERS_COLLECTED) < FLOWER_TARGET;
        let trees_open = !self.flags.get_bool(names::BRIDGE_REPAIRED);
        let tile_zones: [(LayerId, fn(TileCoord) -> ZoneKind, bool); 4] = [
            (LayerId::Chest, ZoneKind::Chest, true),
            (LayerId::Trees, ZoneKind::Tree, trees_open),
            (LayerId::Flowers, ZoneKind::Flower, flowers_open),
            (LayerId::Mushrooms, ZoneKind::Mushroom, true),
        ];
        for (layer, kind_for, active) in tile_zones {
            for tile in world.tiles(layer) {
                let kind = kind_for(tile);
                let id = self
                    .zones
                    .register(world.tile_center(tile), kind.radius(), kind, kind.label());
                if let Some(zone) = self.zones.zone_mut(id) {
                    zone.active = active;
                }
            }
        }

        let chest_visible = post_game || self.flags.get_bool(names::KEY_COLLECTED);
        world.set_layer_visible(LayerId::Chest, chest_visible);
        if self.flags.get_bool(names::BRIDGE_REPAIRED) {
            self.apply_one(world, Effect::SetLayerVisible(LayerId::BridgeBroken, false));
            self.apply_one(world, Effect::SetLayerVisible(LayerId::BridgeFixed, true));
            self.apply_one(world, Effect::OpenBridgeCrossing);
        }

        self.scheduler
            .schedule(self.config.session.intro_delay_ms, StoryStep::OpeningMonologue);

        // Completed runs from before the bloom fragment existed get it now.
        if post_game && self.memories.unlock(fragment_ids::FLOWERS_MEMORY) {
            self.toast("Memory Fragment: Bloom", "💐");
        }

        info!(
            session = %self.id,
            mode = ?self.mode,
            zones = self.zones.len(),
            "session started"
        );
    }

    fn place_actor(&mut self, world: &mut dyn HostWorld, actor: Actor, at: Position, visible: bool) {
        world.set_actor_position(actor, at);
        world.set_actor_visible(actor, visible);
        let kind = ZoneKind::for_actor(actor);
        let id = match self.zones.find(|k| *k == kind) {
            Some(id) => id,
            None => self.zones.register(at, kind.radius(), kind, kind.label()),
        };
        if let Some(zone) = self.zones.zone_mut(id) {
            zone.position = at;
            zone.active = visible;
        }
    }

    fn relabel(&mut self, kind: ZoneKind, label: &str) {
        if let Some(zone) = self
            .zones
            .find(|k| *k == kind)
            .and_then(|id| self.zones.zone_mut(id))
        {
            zone.label = label.to_string();
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn mode(&self) -> StartMode {
        self.mode
    }

    pub fn flags(&self) -> &FlagStore {
        &self.flags
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub fn memories(&self) -> &MemoryRegistry {
        &self.memories
    }

    pub fn dialogue(&self) -> &DialogueSequencer<Vec<Effect>> {
        &self.dialogue
    }

    pub fn zones(&self) -> &InteractionDispatcher<ZoneKind> {
        &self.zones
    }

    pub fn toasts(&self) -> &ToastFeed {
        &self.toasts
    }

    /// Session clock in milliseconds.
    pub fn now_ms(&self) -> u64 {
        self.scheduler.now_ms()
    }

    /// Steps still queued.
    pub fn pending_steps(&self) -> usize {
        self.scheduler.pending_len()
    }

    /// Drain UI events raised since the last call.
    pub fn take_events(&mut self) -> Vec<UiEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn quest_hint(&self) -> String {
        hint::quest_hint(&self.flags)
    }

    pub fn inventory_line(&self) -> Option<String> {
        hint::inventory_line(&self.inventory)
    }

    /// Interaction prompt for the selected zone, hidden during dialogue.
    pub fn prompt(&self) -> Option<Prompt> {
        if self.dialogue.is_active() || self.dying {
            return None;
        }
        self.zones.prompt()
    }

    /// A death or ending sequence has taken over.
    pub fn is_dying(&self) -> bool {
        self.dying
    }

    pub fn is_chopping(&self) -> bool {
        self.chopping.is_some()
    }

    /// The girl walks alongside the player.
    pub fn has_companion(&self) -> bool {
        self.companion
    }

    /// Whether the story has ever been completed on this store.
    pub fn is_game_completed(&self) -> bool {
        self.completion.is_completed()
    }

    /// Advance the session by one frame.
    ///
    /// Returns an exit once an ending sequence asks to leave the session.
    pub fn tick(
        &mut self,
        world: &mut dyn HostWorld,
        input: &InputFrame,
        elapsed_ms: u64,
    ) -> Option<SessionExit> {
        if self.exit.is_some() {
            return self.exit;
        }

        for step in self.scheduler.advance(elapsed_ms) {
            self.run_step(world, step);
        }
        self.dialogue.update(elapsed_ms);
        self.toasts.update(elapsed_ms);

        let speed = self.config.session.walk_speed;
        let player_velocity = input.player.velocity(speed);
        let companion_velocity = input.companion.velocity(speed);

        if self.companion {
            if let Some(at) = world.actor_position(Actor::Girl) {
                if let Some(zone) = self
                    .zones
                    .find(|k| *k == ZoneKind::Girl)
                    .and_then(|id| self.zones.zone_mut(id))
                {
                    zone.position = at;
                }
            }
        }
        self.zones.recompute(world.player_position());

        self.handle_input(world, input);

        let frozen = self.dialogue.is_active() || self.dying || self.chopping.is_some();
        world.set_player_velocity(if frozen { Velocity::ZERO } else { player_velocity });
        if self.companion {
            world.set_actor_velocity(
                Actor::Girl,
                if frozen { Velocity::ZERO } else { companion_velocity },
            );
        }

        self.exit
    }

    fn handle_input(&mut self, world: &mut dyn HostWorld, input: &InputFrame) {
        if self.dialogue.is_awaiting_choice() {
            let answer = if input.yes {
                Some(true)
            } else if input.no {
                Some(false)
            } else {
                None
            };
            if let Some(yes) = answer {
                debug!(yes, "choice answered");
                if let Some(effects) = self.dialogue.answer(yes) {
                    self.apply(world, effects);
                }
            }
            return;
        }

        if !input.interact {
            return;
        }
        match self.dialogue.mode() {
            DialogueMode::PlayingLine => {
                self.dialogue.skip();
            }
            DialogueMode::AwaitingAdvance => {
                if let Advance::Finished(Some(effects)) = self.dialogue.advance() {
                    self.apply(world, effects);
                }
            }
            DialogueMode::AwaitingBinaryChoice => {}
            DialogueMode::Idle => {
                if self.dying || self.chopping.is_some() {
                    return;
                }
                if let Some(kind) = self.zones.interact() {
                    debug!(?kind, "interaction");
                    let branch = self.resolve(&*world, kind);
                    self.play(world, branch);
                }
            }
        }
    }

    fn resolve(&mut self, world: &dyn HostWorld, kind: ZoneKind) -> Branch {
        let view = StoryView {
            flags: &self.flags,
            inventory: &self.inventory,
            world,
            poison_chance: self.config.session.poison_chance,
        };
        quest::resolve(kind, &view, &mut self.rng)
    }

    fn resolve_beat(&mut self, world: &dyn HostWorld, beat: Beat) -> Branch {
        let view = StoryView {
            flags: &self.flags,
            inventory: &self.inventory,
            world,
            poison_chance: self.config.session.poison_chance,
        };
        quest::resolve_beat(beat, &view, &mut self.rng)
    }

    /// Apply a branch's immediate effects and start its dialogue.
    ///
    /// A branch with lines is refused whole while other dialogue is up, so
    /// none of its effects land. Returns `false` when refused.
    fn play(&mut self, world: &mut dyn HostWorld, branch: Branch) -> bool {
        let Branch {
            lines,
            immediate,
            on_complete,
            choice,
        } = branch;
        if !lines.is_empty() && self.dialogue.is_active() {
            warn!(session = %self.id, "dialogue busy; branch refused");
            return false;
        }
        self.apply(world, immediate);
        if lines.is_empty() {
            self.apply(world, on_complete);
            return true;
        }
        let started = match choice {
            Some(Choice { yes, no }) => self.dialogue.show_choice(
                lines,
                [on_complete.clone(), yes].concat(),
                [on_complete, no].concat(),
            ),
            None => self
                .dialogue
                .show_conversation(lines, (!on_complete.is_empty()).then_some(on_complete)),
        };
        if !started {
            warn!(session = %self.id, "dialogue rejected branch lines");
        }
        started
    }

    fn apply(&mut self, world: &mut dyn HostWorld, effects: Vec<Effect>) {
        for effect in effects {
            self.apply_one(world, effect);
        }
    }

    fn apply_one(&mut self, world: &mut dyn HostWorld, effect: Effect) {
        match effect {
            Effect::SetFlag(name, value) => {
                self.flags.set(name, value);
            }
            Effect::AddItem(item) => self.inventory.add(item),
            Effect::RemoveItem(item) => {
                self.inventory.remove(item);
            }
            Effect::Unlock {
                fragment,
                toast,
                icon,
            } => {
                if self.memories.unlock(fragment) {
                    self.toast(toast, icon);
                }
            }
            Effect::Toast { message, icon } => self.toast(message, icon),
            Effect::RevealActor { actor, at } => self.place_actor(world, actor, at, true),
            Effect::HideActor(actor) => world.set_actor_visible(actor, false),
            Effect::SetZoneActive(kind, active) => {
                self.zones.set_active_where(|k| *k == kind, active);
            }
            Effect::SetGroupActive(group, active) => {
                let changed = self.zones.set_active_where(|k| group.contains(k), active);
                debug!(?group, active, changed, "zone group toggled");
            }
            Effect::RelabelZone(kind, label) => self.relabel(kind, label),
            Effect::RemoveTile(layer, tile) => {
                world.remove_tile(layer, tile);
            }
            Effect::RemoveTreeCluster(center) => {
                for tile in center.square(TREE_CLUSTER_RADIUS) {
                    if world.remove_tile(LayerId::Trees, tile) {
                        self.zones
                            .set_active_where(|k| *k == ZoneKind::Tree(tile), false);
                    }
                }
            }
            Effect::SetLayerVisible(layer, visible) => world.set_layer_visible(layer, visible),
            Effect::OpenBridgeCrossing => {
                for x in BRIDGE_CROSSING_X {
                    for y in BRIDGE_CROSSING_Y {
                        world.set_collision(LayerId::Water, TileCoord::new(x, y), false);
                    }
                }
            }
            Effect::PlayCue(cue) => world.play_cue(cue),
            Effect::StartChopping(tile) => {
                self.chopping = Some(tile);
                world.set_player_velocity(Velocity::ZERO);
                world.play_cue(Cue::Chop);
                self.scheduler
                    .schedule(CHOP_DURATION_MS, StoryStep::FinishChop(tile));
            }
            Effect::FollowUp(beat) => {
                let branch = self.resolve_beat(&*world, beat);
                if !self.play(world, branch) {
                    debug!(?beat, "follow-up dropped");
                }
            }
            Effect::Schedule { delay_ms, step } => {
                self.scheduler.schedule(delay_ms, step);
            }
            Effect::Run(step) => self.run_step(world, step),
            Effect::JoinCompanion => {
                self.companion = true;
                info!(session = %self.id, "companion joined");
            }
            Effect::CompleteGame => {
                self.completion.set_completed(true);
                info!(session = %self.id, "story completed");
            }
        }
    }

    fn run_step(&mut self, world: &mut dyn HostWorld, step: StoryStep) {
        debug!(session = %self.id, ?step, "running step");
        match step {
            StoryStep::OpeningMonologue => {
                if self.dying {
                    return;
                }
                let branch = self.resolve_beat(&*world, Beat::OpeningMonologue);
                if !self.play(world, branch) {
                    self.scheduler
                        .schedule(MONOLOGUE_RETRY_MS, StoryStep::OpeningMonologue);
                }
            }
            StoryStep::FinishChop(tile) => {
                self.chopping = None;
                if self.dying {
                    return;
                }
                self.dialogue.dismiss();
                let branch = self.resolve_beat(&*world, Beat::Timber(tile));
                self.play(world, branch);
            }
            StoryStep::Poisoned => {
                self.dying = true;
                self.dialogue.dismiss();
                world.set_player_velocity(Velocity::ZERO);
                world.play_cue(Cue::Death);
                self.events.push(UiEvent::Effect(ScreenEffect::PoisonFlash));
                self.scheduler
                    .schedule(POISON_GASP_DELAY_MS, StoryStep::PoisonGasp);
                self.scheduler
                    .schedule(POISON_BLACKOUT_DELAY_MS, StoryStep::PoisonBlackout);
            }
            StoryStep::PoisonGasp => {
                self.dialogue.dismiss();
                let branch = self.resolve_beat(&*world, Beat::PoisonGasp);
                self.play(world, branch);
            }
            StoryStep::PoisonBlackout => {
                self.dialogue.dismiss();
                self.events.push(UiEvent::Effect(ScreenEffect::FadeToBlack));
                self.events.push(UiEvent::Banner {
                    title: "YOU DIED".to_string(),
                    subtitle: Some("Poisoned by mushrooms".to_string()),
                });
                self.scheduler
                    .schedule(RESTART_DELAY_MS, StoryStep::RestartSession);
            }
            StoryStep::RestartSession => {
                info!(session = %self.id, "poisoned; restarting");
                self.exit = Some(SessionExit::RestartSession);
            }
            StoryStep::Stabbed => {
                self.dying = true;
                self.dialogue.dismiss();
                world.set_player_velocity(Velocity::ZERO);
                world.play_cue(Cue::Death);
                self.memories.reset();
                self.events.push(UiEvent::Effect(ScreenEffect::StabFlash));
                self.scheduler
                    .schedule(MEMORIES_ERASED_DELAY_MS, StoryStep::MemoriesErased);
            }
            StoryStep::MemoriesErased => {
                self.dialogue.dismiss();
                self.events.push(UiEvent::Effect(ScreenEffect::FadeToBlack));
                self.events.push(UiEvent::Banner {
                    title: "MEMORIES ERASED".to_string(),
                    subtitle: None,
                });
                self.scheduler
                    .schedule(RETURN_TO_BOOT_DELAY_MS, StoryStep::ReturnToBoot);
            }
            StoryStep::ReturnToBoot => {
                info!(session = %self.id, "memories erased; returning to boot");
                self.exit = Some(SessionExit::ReturnToBoot);
            }
        }
    }

    fn toast(&mut self, message: &str, icon: &str) {
        let event = self.toasts.push(message, Some(icon));
        self.events.push(event);
    }
}
