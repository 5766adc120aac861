//! Branch resolution for every interaction in the story.
//!
//! [`resolve`] maps a zone and the current story state to a [`Branch`]: the
//! lines to play and the effects to apply before and after them. Nothing
//! here mutates state, so every branch can be checked without wiring zones.
//! Preconditions are tested most-progressed first.

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use story_state::{
    fragment_ids, items, names, Actor, FlagStore, FlagValue, Inventory, LayerId, Position,
    TileCoord, FLOWER_TARGET, WOOD_TARGET,
};

use crate::events::DEFAULT_TOAST_ICON;
use crate::world::{Cue, HostWorld};

/// Prompt line shown while a yes/no answer is pending.
pub const CHOICE_PROMPT: &str = "Press Y for Yes, N for No";

/// How long one tree takes to chop.
pub const CHOP_DURATION_MS: u64 = 3000;

/// Delay between eating a bad mushroom and the poison taking hold.
pub const POISON_DELAY_MS: u64 = 4000;

/// Where things stand on the story map.
pub mod places {
    use story_state::Position;

    pub const SPAWN: Position = Position::new(16.0, 304.0);
    pub const POST_GAME_SPAWN: Position = Position::new(640.0, 608.0);
    pub const VILLAGER: Position = Position::new(400.0, 270.0);
    pub const RIVER_VILLAGER: Position = Position::new(900.0, 200.0);
    pub const SOUTH_VILLAGER: Position = Position::new(340.0, 600.0);
    pub const BRIDGE: Position = Position::new(640.0, 576.0);
    pub const INJURED_MAN: Position = Position::new(200.0, 800.0);
    pub const CAT: Position = Position::new(420.0, 930.0);
    pub const CAT_POST_GAME: Position = Position::new(300.0, 750.0);
    pub const ISLAND_VILLAGER: Position = Position::new(900.0, 550.0);
    pub const GIRL: Position = Position::new(1100.0, 900.0);
    pub const GIRL_POST_GAME: Position = Position::new(672.0, 608.0);
}

/// The action bound to an interaction zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ZoneKind {
    Villager,
    RiverVillager,
    SouthVillager,
    Bridge,
    InjuredMan,
    Cat,
    Chest(TileCoord),
    Tree(TileCoord),
    Flower(TileCoord),
    Mushroom(TileCoord),
    IslandVillager,
    Girl,
}

impl ZoneKind {
    /// The actor this zone belongs to, if any.
    pub fn actor(&self) -> Option<Actor> {
        match self {
            ZoneKind::Villager => Some(Actor::Villager),
            ZoneKind::RiverVillager => Some(Actor::RiverVillager),
            ZoneKind::SouthVillager => Some(Actor::SouthVillager),
            ZoneKind::InjuredMan => Some(Actor::InjuredMan),
            ZoneKind::Cat => Some(Actor::Cat),
            ZoneKind::IslandVillager => Some(Actor::IslandVillager),
            ZoneKind::Girl => Some(Actor::Girl),
            _ => None,
        }
    }

    /// The zone for an actor.
    pub fn for_actor(actor: Actor) -> ZoneKind {
        match actor {
            Actor::Villager => ZoneKind::Villager,
            Actor::RiverVillager => ZoneKind::RiverVillager,
            Actor::SouthVillager => ZoneKind::SouthVillager,
            Actor::IslandVillager => ZoneKind::IslandVillager,
            Actor::InjuredMan => ZoneKind::InjuredMan,
            Actor::Cat => ZoneKind::Cat,
            Actor::Girl => ZoneKind::Girl,
        }
    }

    /// Prompt label a zone starts with.
    pub fn label(&self) -> &'static str {
        match self {
            ZoneKind::Bridge | ZoneKind::Mushroom(_) => "Inspect",
            ZoneKind::Cat => "Pick Up",
            ZoneKind::Chest(_) => "Open",
            ZoneKind::Tree(_) => "Chop",
            ZoneKind::Flower(_) => "Pick",
            ZoneKind::Girl => "?",
            _ => "Talk",
        }
    }

    /// Trigger radius.
    pub fn radius(&self) -> f32 {
        match self {
            ZoneKind::Bridge => 60.0,
            ZoneKind::Chest(_) | ZoneKind::Tree(_) => 40.0,
            ZoneKind::Flower(_) | ZoneKind::Mushroom(_) => 32.0,
            _ => 50.0,
        }
    }
}

/// Families of tile zones toggled together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ZoneGroup {
    Chests,
    Trees,
    Flowers,
    Mushrooms,
}

impl ZoneGroup {
    pub fn contains(&self, kind: &ZoneKind) -> bool {
        matches!(
            (self, kind),
            (ZoneGroup::Chests, ZoneKind::Chest(_))
                | (ZoneGroup::Trees, ZoneKind::Tree(_))
                | (ZoneGroup::Flowers, ZoneKind::Flower(_))
                | (ZoneGroup::Mushrooms, ZoneKind::Mushroom(_))
        )
    }
}

/// Named continuations that play after another conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Beat {
    OpeningMonologue,
    BridgeHammering,
    BridgeRepaired,
    Timber(TileCoord),
    GiftReaction,
    ValentineQuestion,
    ValentineYes,
    ValentineNo,
    EatMushroom(TileCoord),
    LeaveMushroom,
    PoisonGasp,
}

/// Delayed work queued on the session scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StoryStep {
    OpeningMonologue,
    FinishChop(TileCoord),
    /// The poison takes hold.
    Poisoned,
    PoisonGasp,
    PoisonBlackout,
    RestartSession,
    /// The twist ending begins.
    Stabbed,
    MemoriesErased,
    ReturnToBoot,
}

/// A single state change requested by a branch.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    SetFlag(&'static str, FlagValue),
    AddItem(&'static str),
    RemoveItem(&'static str),
    /// Unlock a fragment, toasting only on the first unlock.
    Unlock {
        fragment: &'static str,
        toast: &'static str,
        icon: &'static str,
    },
    Toast {
        message: &'static str,
        icon: &'static str,
    },
    /// Move an actor and its zone, and show it.
    RevealActor { actor: Actor, at: Position },
    HideActor(Actor),
    SetZoneActive(ZoneKind, bool),
    SetGroupActive(ZoneGroup, bool),
    RelabelZone(ZoneKind, &'static str),
    RemoveTile(LayerId, TileCoord),
    /// Fell the 5x5 grove around a tree.
    RemoveTreeCluster(TileCoord),
    SetLayerVisible(LayerId, bool),
    /// Make the repaired bridge walkable.
    OpenBridgeCrossing,
    PlayCue(Cue),
    /// Freeze the player and chop for [`CHOP_DURATION_MS`].
    StartChopping(TileCoord),
    FollowUp(Beat),
    Schedule { delay_ms: u64, step: StoryStep },
    Run(StoryStep),
    /// The girl becomes a second controllable walker.
    JoinCompanion,
    /// Persist that the story has been completed.
    CompleteGame,
}

/// The two outcomes of a yes/no prompt.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Choice {
    pub yes: Vec<Effect>,
    pub no: Vec<Effect>,
}

/// One resolved branch of the story.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Branch {
    pub lines: Vec<String>,
    /// Applied before the first line plays.
    pub immediate: Vec<Effect>,
    /// Applied when the conversation ends.
    pub on_complete: Vec<Effect>,
    /// Present when the last line is a yes/no prompt.
    pub choice: Option<Choice>,
}

impl Branch {
    /// A branch with no lines and no effects.
    pub fn nothing() -> Self {
        Self::default()
    }

    /// A single line.
    pub fn say(line: impl Into<String>) -> Self {
        Self {
            lines: vec![line.into()],
            ..Self::default()
        }
    }

    pub fn conversation<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_immediate(mut self, effects: Vec<Effect>) -> Self {
        self.immediate.extend(effects);
        self
    }

    pub fn then(mut self, effects: Vec<Effect>) -> Self {
        self.on_complete.extend(effects);
        self
    }

    pub fn with_choice(mut self, yes: Vec<Effect>, no: Vec<Effect>) -> Self {
        self.choice = Some(Choice { yes, no });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty() && self.immediate.is_empty() && self.on_complete.is_empty()
    }
}

/// Read-only view of the state a branch depends on.
pub struct StoryView<'a> {
    pub flags: &'a FlagStore,
    pub inventory: &'a Inventory,
    pub world: &'a dyn HostWorld,
    /// Chance that an eaten mushroom is poisonous.
    pub poison_chance: f64,
}

impl StoryView<'_> {
    fn flag(&self, name: &str) -> bool {
        self.flags.get_bool(name)
    }

    fn count(&self, name: &str) -> i64 {
        self.flags.get_int(name)
    }

    fn has(&self, item: &str) -> bool {
        self.inventory.has(item)
    }
}

fn set(name: &'static str, value: impl Into<FlagValue>) -> Effect {
    Effect::SetFlag(name, value.into())
}

fn pick<'a, T: ?Sized>(rng: &mut StdRng, options: &[&'a T]) -> &'a T {
    options[rng.random_range(0..options.len())]
}

/// Resolve the branch for interacting with a zone.
pub fn resolve(kind: ZoneKind, view: &StoryView<'_>, rng: &mut StdRng) -> Branch {
    match kind {
        ZoneKind::Villager => villager(view, rng),
        ZoneKind::RiverVillager => river_villager(view, rng),
        ZoneKind::SouthVillager => south_villager(view, rng),
        ZoneKind::Bridge => bridge(view),
        ZoneKind::InjuredMan => injured_man(view, rng),
        ZoneKind::Cat => cat(view),
        ZoneKind::Chest(_) => chest(view),
        ZoneKind::Tree(tile) => tree(view, tile),
        ZoneKind::Flower(tile) => flower(view, tile),
        ZoneKind::Mushroom(tile) => mushroom(view, tile),
        ZoneKind::IslandVillager => island_villager(view, rng),
        ZoneKind::Girl => girl(view, rng),
    }
}

/// Resolve a follow-up beat.
pub fn resolve_beat(beat: Beat, view: &StoryView<'_>, rng: &mut StdRng) -> Branch {
    match beat {
        Beat::OpeningMonologue => {
            if view.flag(names::GAME_STARTED) {
                return Branch::nothing();
            }
            Branch::conversation([
                "(That dream again...)",
                "(The river. The flowers.)",
                "(And her.)",
                "(I don't even know who she is.)",
                "(But it felt... real.)",
            ])
            .with_immediate(vec![set(names::GAME_STARTED, true)])
            .then(vec![Effect::Unlock {
                fragment: fragment_ids::INTRO_DREAM,
                toast: "Daydream Recovered",
                icon: DEFAULT_TOAST_ICON,
            }])
        }
        Beat::BridgeHammering => Branch::say("*hammering and fixing*")
            .with_immediate(vec![Effect::PlayCue(Cue::Repair)])
            .then(vec![Effect::FollowUp(Beat::BridgeRepaired)]),
        Beat::BridgeRepaired => Branch::conversation([
            "(Funny...)",
            "(Some things only break so you can rebuild them.)",
        ])
        .with_immediate(vec![
            set(names::BRIDGE_REPAIRED, true),
            Effect::SetLayerVisible(LayerId::BridgeBroken, false),
            Effect::SetLayerVisible(LayerId::BridgeFixed, true),
            Effect::OpenBridgeCrossing,
            Effect::RemoveItem(items::OLD_AXE),
            Effect::SetGroupActive(ZoneGroup::Trees, false),
        ])
        .then(vec![Effect::Unlock {
            fragment: fragment_ids::BRIDGE_MEMORY,
            toast: "Memory Fragment: Reconnection",
            icon: "🌉",
        }]),
        Beat::Timber(tile) => {
            let wood = view.count(names::WOOD_COLLECTED) + 1;
            let mut lines = vec!["(Timber!)", "Collected 1 Wood Log 🪵"];
            if wood == WOOD_TARGET {
                lines.push("(That's enough wood to fix the bridge.)");
            }
            Branch::conversation(lines).with_immediate(vec![
                Effect::RemoveTreeCluster(tile),
                set(names::WOOD_COLLECTED, wood),
            ])
        }
        Beat::GiftReaction => Branch::conversation([
            "*You hand over the bouquet*",
            "Nishi: It's beautiful...but why?",
            "Sahil: Its cause..",
            "Sahil: I love you so much and i want to spend the rest of my life with you.",
            "Sahil: Will you be my valentine nishi?",
        ])
        .then(vec![Effect::FollowUp(Beat::ValentineQuestion)]),
        Beat::ValentineQuestion => Branch::say(CHOICE_PROMPT).with_choice(
            vec![Effect::FollowUp(Beat::ValentineYes)],
            vec![Effect::FollowUp(Beat::ValentineNo)],
        ),
        Beat::ValentineYes => Branch::conversation([
            "Nishi: YESSSSSS!!",
            "(She smiles brightly.)",
            "Sahil: You made me the happiest person ever.",
        ])
        .with_immediate(vec![Effect::PlayCue(Cue::Celebration)])
        .then(vec![
            set(names::MET_GIRL, true),
            Effect::RevealActor {
                actor: Actor::Cat,
                at: places::CAT_POST_GAME,
            },
            Effect::RelabelZone(ZoneKind::Cat, "Pet"),
            Effect::SetZoneActive(ZoneKind::Cat, true),
            Effect::JoinCompanion,
            Effect::Unlock {
                fragment: fragment_ids::FLOWERS_MEMORY,
                toast: "Memory Fragment: Bloom",
                icon: "💐",
            },
            Effect::Toast {
                message: "Dream Completed!",
                icon: "❤️",
            },
            Effect::CompleteGame,
            Effect::RelabelZone(ZoneKind::Girl, "Talk"),
        ]),
        Beat::ValentineNo => Branch::conversation([
            "Nishi: bkl..",
            "Nishi: After searching for me all this time...",
            "Nishi: This is all you have to offer?",
            "Sahil: I... I thought you'd like them.",
            "Nishi: I don't like flowers, Sahil.",
            "Nishi: I like memories.",
            "Nishi: And I think I'll take yours.",
        ])
        .then(vec![Effect::Run(StoryStep::Stabbed)]),
        Beat::EatMushroom(tile) => {
            let eaten = vec![
                Effect::RemoveTile(LayerId::Mushrooms, tile),
                Effect::SetZoneActive(ZoneKind::Mushroom(tile), false),
            ];
            if rng.random_bool(view.poison_chance.clamp(0.0, 1.0)) {
                Branch::conversation([
                    "(I take a bite...)",
                    "(Hmm, tastes a bit strange...)",
                    "(Wait... something's wrong...)",
                ])
                .with_immediate(eaten)
                .with_immediate(vec![Effect::Schedule {
                    delay_ms: POISON_DELAY_MS,
                    step: StoryStep::Poisoned,
                }])
            } else {
                Branch::conversation([
                    "(I take a bite...)",
                    "(It tastes somewhat earthy...)",
                    "(But I feel fine.)",
                    "(Not bad.)",
                ])
                .with_immediate(eaten)
            }
        }
        Beat::LeaveMushroom => {
            Branch::conversation(["(Better not risk it.)", "(I'll leave them alone.)"])
        }
        Beat::PoisonGasp => {
            Branch::conversation(["(The world is spinning...)", "(I can't... breathe...)"])
        }
    }
}

fn villager(view: &StoryView<'_>, rng: &mut StdRng) -> Branch {
    if view.flag(names::MET_GIRL) {
        return Branch::say(pick(
            rng,
            &[
                "Villager 1: You two look amazing together.",
                "Villager 1: Seems like your dream came true.",
                "Villager 1: That smile on your face says it all.",
            ],
        ));
    }
    if !view.flag(names::INTRO_TALKED) {
        return Branch::conversation([
            "Villager 1: You look like someone who didn't sleep much.",
            "Sahil: Yeah... I keep having this strange dream.",
            "Villager 1: Dreams have a habit of returning when they're unfinished.",
            "Sahil: Unfinished how?",
            "Villager 1: That part... you usually find out yourself.",
        ])
        .with_immediate(vec![set(names::INTRO_TALKED, true)]);
    }
    Branch::conversation([
        "Sahil: Do you think dreams actually mean something?",
        "Villager 1: Some don't.\nThe ones that stay?",
        "Villager 1: ...",
        "Villager 1: Those usually do.",
    ])
}

fn river_villager(view: &StoryView<'_>, rng: &mut StdRng) -> Branch {
    if view.flag(names::MET_GIRL) {
        return Branch::say(pick(
            rng,
            &[
                "Villager 2: Found what the river was hiding, huh?",
                "Villager 2: You two make a lovely pair.",
                "Villager 2: Love looks good on you both.",
            ],
        ));
    }
    if !view.flag(names::BLUE_TALKED) {
        return Branch::conversation([
            "Villager 2: You seem distracted.",
            "Sahil: Ever feel like you've been somewhere before... without actually going there?",
            "Villager 2: Hah. All the time.\nThe river's like that for me.",
            "Sahil: The river?",
            "Villager 2: Yeah. Feels like it's hiding something.",
        ])
        .with_immediate(vec![set(names::BLUE_TALKED, true)]);
    }
    Branch::say(pick(
        rng,
        &[
            "Villager 2: The water is calm today.",
            "Villager 2: I saw a fish jump earlier!",
            "Villager 2: sometimes I wonder where the river flows to.",
        ],
    ))
}

fn south_villager(view: &StoryView<'_>, rng: &mut StdRng) -> Branch {
    if view.flag(names::MET_GIRL) {
        return Branch::say(pick(
            rng,
            &[
                "Villager 3: You two look perfect together!",
                "Villager 3: Guess you found what you were looking for.",
                "Villager 3: That's the kind of ending I like to see.",
            ],
        ));
    }
    if !view.flag(names::ORANGE_TALKED) {
        return Branch::conversation([
            "Villager 3: You pacing around again?",
            "Sahil: Just thinking.",
            "Villager 3: Careful. That's how people end up somewhere unexpected.",
            "*smiles*",
            "Villager 3: If you're curious, go take a walk east.",
        ])
        .with_immediate(vec![set(names::ORANGE_TALKED, true)]);
    }
    Branch::say(pick(
        rng,
        &[
            "Villager 3: That bridge to the east looks dangerous.",
            "Villager 3: Don't get lost in the woods!",
            "Villager 3: Lovely weather for a mystery, eh?",
        ],
    ))
}

fn bridge(view: &StoryView<'_>) -> Branch {
    if view.flag(names::BRIDGE_REPAIRED) {
        return Branch::say("The bridge is sturdy now.\nTime to cross.");
    }
    if !view.flag(names::BRIDGE_SEEN) {
        return Branch::conversation([
            "(This place...)",
            "(I've seen this before.)",
            "(It was in my dream.)",
            "(I couldn't cross it then either.)",
        ])
        .with_immediate(vec![
            set(names::BRIDGE_SEEN, true),
            Effect::RevealActor {
                actor: Actor::InjuredMan,
                at: places::INJURED_MAN,
            },
            Effect::SetZoneActive(ZoneKind::InjuredMan, true),
        ]);
    }
    let wood = view.count(names::WOOD_COLLECTED);
    if wood >= WOOD_TARGET {
        return Branch::conversation([
            "Sahil: I have enough wood now.",
            "(I'll use the axe to shape the planks.)",
        ])
        .then(vec![Effect::FollowUp(Beat::BridgeHammering)]);
    }
    Branch::conversation([
        "(The bridge is out.)".to_string(),
        format!("(I need wood to fix it. Wood: {}/{})", wood, WOOD_TARGET),
        "(I should find an axe and chop some trees.)".to_string(),
    ])
}

fn injured_man(view: &StoryView<'_>, rng: &mut StdRng) -> Branch {
    if view.flag(names::MET_GIRL) {
        return Branch::say(pick(
            rng,
            &[
                "Injured Man: Thanks for the help earlier.",
                "Injured Man: You two are adorable together!",
                "Injured Man: Glad to see you found happiness.",
            ],
        ));
    }
    if !view.flag(names::QUEST_STARTED) {
        return Branch::conversation([
            "Injured Man: Hey—wait.",
            "Sahil: Are you okay?",
            "Injured Man: Could be better.\nLeg's messed up pretty bad.",
            "Sahil: What happened?",
            "Injured Man: Tried crossing the bridge before it gave out.",
            "*sighs*",
            "Injured Man: My cat bolted when I fell.\nRan into the bushes.",
            "Sahil: I can help you find him.",
            "Injured Man: You'd do that?",
            "*soft smile*",
            "Injured Man: Thank you. He ran toward the trees to the south.",
        ])
        .with_immediate(vec![
            set(names::QUEST_STARTED, true),
            Effect::RevealActor {
                actor: Actor::Cat,
                at: places::CAT,
            },
            Effect::SetZoneActive(ZoneKind::Cat, true),
        ]);
    }
    if !view.flag(names::CAT_FOUND) {
        return Branch::say("Injured Man: I hope she's away from the river.\nPlease hurry!");
    }
    if view.flag(names::KEY_COLLECTED) {
        return Branch::say("Injured Man: I hope that key was useful.");
    }
    Branch::conversation([
        "Injured Man: You found him...",
        "*kneels slightly*",
        "Injured Man: I don't know how to thank you.",
        "Sahil: I'm just glad he's okay.",
        "Injured Man: Here, take this.",
        "*hands you a key*",
        "Injured Man: I found it near the river bank.",
        "Injured Man: Rumor has it there's a hidden chest nearby.",
        "Injured Man: But with my leg like this... I can't go looking for it.",
        "Injured Man: Maybe you can find use for it.",
    ])
    .then(vec![
        set(names::KEY_COLLECTED, true),
        Effect::AddItem(items::KEY),
        Effect::SetLayerVisible(LayerId::Chest, true),
        Effect::SetGroupActive(ZoneGroup::Chests, true),
    ])
}

fn cat(view: &StoryView<'_>) -> Branch {
    if view.flag(names::MET_GIRL) {
        return Branch::say("*Meow~*").with_immediate(vec![Effect::PlayCue(Cue::Meow)]);
    }
    Branch::conversation([
        "Sahil: Hey... it's okay.",
        "Cat: Meow...",
        "Sahil: Your owner's worried about you.",
        "*The cat follows you*",
    ])
    .with_immediate(vec![
        Effect::PlayCue(Cue::Meow),
        Effect::HideActor(Actor::Cat),
        Effect::SetZoneActive(ZoneKind::Cat, false),
        set(names::CAT_FOUND, true),
    ])
    .then(vec![Effect::Unlock {
        fragment: fragment_ids::CAT_MEMORY,
        toast: "Memory Fragment: The Stray",
        icon: "🐱",
    }])
}

fn chest(view: &StoryView<'_>) -> Branch {
    if view.flag(names::CHEST_OPENED) {
        return Branch::say("Empty.");
    }
    if !view.has(items::KEY) {
        return Branch::say("It's locked.\n(I need a key.)");
    }
    Branch::conversation([
        "Sahil: an old axe...",
        "*You picked up the Old Axe*",
        "(This looks sharp enough.)",
        "(I can use this to cut some trees for wood.)",
        "(I just need 2 logs to fix the bridge.)",
    ])
    .with_immediate(vec![
        set(names::CHEST_OPENED, true),
        Effect::AddItem(items::OLD_AXE),
        Effect::RemoveItem(items::KEY),
        set(names::TOOLS_COLLECTED, true),
    ])
}

fn tree(view: &StoryView<'_>, tile: TileCoord) -> Branch {
    if !view.world.has_tile(LayerId::Trees, tile) {
        return Branch::nothing();
    }
    if !view.has(items::OLD_AXE) {
        return Branch::say("(A sturdy tree. I'd need an axe to cut this.)");
    }
    if view.count(names::WOOD_COLLECTED) >= WOOD_TARGET {
        return Branch::say("(I have enough wood. I should fix the bridge now.)");
    }
    Branch::say("*Chopping tree...*").with_immediate(vec![Effect::StartChopping(tile)])
}

fn island_villager(view: &StoryView<'_>, rng: &mut StdRng) -> Branch {
    if view.flag(names::MET_GIRL) {
        return Branch::say(pick(
            rng,
            &[
                "Island Villager: I see you found her by the flowers.",
                "Island Villager: Dreams do come true, don't they?",
                "Island Villager: You two look wonderful together.",
            ],
        ));
    }
    if !view.flag(names::NORTH_VILLAGER_TALKED) {
        return Branch::conversation([
            "Island Villager: I didn't expect to see anyone cross that bridge.",
            "Sahil: I almost didn't.",
            "Island Villager: You look like you're searching for something.",
            "Sahil: Someone, actually.",
            "Sahil: (from a dream.)",
            "Island Villager: ...Dreams bring people here for different reasons.",
            "Island Villager: Who is she?",
            "Sahil: I keep seeing her in dreams shes always surrounded by flowers.\nQuiet type.",
            "Island Villager: Hmm.. If thats the case then you should pick some flowers for her.",
            "Sahil: That would be good.",
            "Island Villager: Try looking in the north.",
        ])
        .with_immediate(vec![
            set(names::NORTH_VILLAGER_TALKED, true),
            Effect::SetGroupActive(ZoneGroup::Flowers, true),
        ]);
    }
    if view.flag(names::HAS_BOUQUET) {
        return Branch::say("Villager: That is a beautiful bouquet.\nSomeone will be very happy.");
    }
    Branch::say(format!(
        "Villager: Search the island.\nYou have found {}/{}.",
        view.count(names::FLOWERS_COLLECTED),
        FLOWER_TARGET
    ))
}

fn flower(view: &StoryView<'_>, tile: TileCoord) -> Branch {
    if !view.world.has_tile(LayerId::Flowers, tile) {
        return Branch::nothing();
    }
    let count = view.count(names::FLOWERS_COLLECTED) + 1;
    let picked = vec![
        Effect::RemoveTile(LayerId::Flowers, tile),
        Effect::SetZoneActive(ZoneKind::Flower(tile), false),
        set(names::FLOWERS_COLLECTED, count),
    ];
    let milestone = format!("Picked a Flower 🌹 ({}/{})", count, FLOWER_TARGET);
    let branch = match count {
        1 => Branch::conversation(["(These look familiar.)".to_string(), milestone]),
        2 => Branch::conversation(["(Just like in my dream...)".to_string(), milestone]),
        n if n == FLOWER_TARGET => Branch::conversation([
            "(I think this is enough.)",
            "(I carefully tie them together.)",
            "(It feels... important.)",
            "You made a beautiful Bouquet! 💐",
        ])
        .with_immediate(vec![
            set(names::HAS_BOUQUET, true),
            Effect::AddItem(items::BOUQUET),
            Effect::RevealActor {
                actor: Actor::Girl,
                at: places::GIRL,
            },
            Effect::SetZoneActive(ZoneKind::Girl, true),
        ]),
        _ => Branch::say("Found another Flower! 🌹\n(Added to collection)"),
    };
    Branch {
        immediate: [picked, branch.immediate].concat(),
        ..branch
    }
}

fn mushroom(view: &StoryView<'_>, tile: TileCoord) -> Branch {
    if !view.world.has_tile(LayerId::Mushrooms, tile) {
        return Branch::nothing();
    }
    Branch::conversation([
        "(These mushrooms look... edible?)",
        "(Should I eat them?)",
        CHOICE_PROMPT,
    ])
    .with_choice(
        vec![Effect::FollowUp(Beat::EatMushroom(tile))],
        vec![Effect::FollowUp(Beat::LeaveMushroom)],
    )
}

const GIRL_CONVERSATIONS: &[&[&str]] = &[
    &[
        "Nishi: The flowers are still beautiful.",
        "Sahil: Just like you.",
        "Nishi: Smooth talker.",
    ],
    &["Sahil: Want to explore more?", "Nishi: Sure! Lead the way."],
    &["Nishi: I'm glad you found me.", "Sahil: Me too."],
    &[
        "Sahil: This place is peaceful.",
        "Nishi: It really is.",
        "Nishi: I could stay here forever.",
    ],
    &[
        "Nishi: Remember when we first met?",
        "Sahil: How could I forget?",
        "Nishi: Those were good times.",
    ],
    &[
        "Sahil: What should we do now?",
        "Nishi: Let's just walk around.",
        "Sahil: Sounds perfect.",
    ],
    &["Nishi: I love this.", "Sahil: Love what?", "Nishi: Being with you."],
    &[
        "Sahil: Are you happy?",
        "Nishi: Very.",
        "Sahil: Good. That's all I wanted.",
    ],
    &["Sahil: Hi baby", "Nishi: hie baby"],
    &["Nishi: Saley", "Sahil: ...."],
    &["Nishi: Hijde", "Sahil: ...."],
];

fn girl(view: &StoryView<'_>, rng: &mut StdRng) -> Branch {
    if view.flag(names::MET_GIRL) {
        return Branch::conversation(pick(rng, GIRL_CONVERSATIONS).iter().copied());
    }
    Branch::conversation([
        "Sahil: Hi..",
        "Nishi: Nepali Hijde.",
        "Sahil: Youre much more beautiful than I imagined.",
        "Nishi: heh.",
        "Sahil: I been looking for you from so long.",
        "Nishi: Were you now...",
        "Sahil: Never thought I'd see you outside dreams.",
        "Sahil: I picked up some flowers for you.",
    ])
    .then(vec![
        set(names::HAS_BOUQUET, false),
        Effect::RemoveItem(items::BOUQUET),
        Effect::FollowUp(Beat::GiftReaction),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::GridWorld;
    use rand::SeedableRng;
    use story_state::FlagSnapshot;

    struct Fixture {
        flags: FlagStore,
        inventory: Inventory,
        world: GridWorld,
        rng: StdRng,
        poison_chance: f64,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                flags: FlagStore::story(),
                inventory: Inventory::new(),
                world: GridWorld::story_map(),
                rng: StdRng::seed_from_u64(7),
                poison_chance: 0.7,
            }
        }

        fn resolve(&mut self, kind: ZoneKind) -> Branch {
            let view = StoryView {
                flags: &self.flags,
                inventory: &self.inventory,
                world: &self.world,
                poison_chance: self.poison_chance,
            };
            resolve(kind, &view, &mut self.rng)
        }

        fn beat(&mut self, beat: Beat) -> Branch {
            let view = StoryView {
                flags: &self.flags,
                inventory: &self.inventory,
                world: &self.world,
                poison_chance: self.poison_chance,
            };
            resolve_beat(beat, &view, &mut self.rng)
        }

        /// Apply flag and item effects the way the session does.
        fn apply(&mut self, effects: &[Effect]) {
            for effect in effects {
                match effect {
                    Effect::SetFlag(name, value) => {
                        self.flags.set(name, *value);
                    }
                    Effect::AddItem(item) => self.inventory.add(*item),
                    Effect::RemoveItem(item) => {
                        self.inventory.remove(item);
                    }
                    Effect::RemoveTile(layer, tile) => {
                        self.world.remove_tile(*layer, *tile);
                    }
                    _ => {}
                }
            }
        }
    }

    #[test]
    fn test_villager_first_talk_then_repeat() {
        let mut fx = Fixture::new();
        let first = fx.resolve(ZoneKind::Villager);
        assert_eq!(first.lines.len(), 5);
        assert!(first
            .immediate
            .contains(&Effect::SetFlag(names::INTRO_TALKED, FlagValue::Bool(true))));

        fx.apply(&first.immediate);
        let repeat = fx.resolve(ZoneKind::Villager);
        assert_eq!(repeat.lines[0], "Sahil: Do you think dreams actually mean something?");
        assert!(repeat.immediate.is_empty());
    }

    #[test]
    fn test_post_game_lines_win() {
        let mut fx = Fixture::new();
        fx.flags.apply(&FlagSnapshot::post_game());

        let branch = fx.resolve(ZoneKind::InjuredMan);
        assert_eq!(branch.lines.len(), 1);
        assert!(branch.lines[0].starts_with("Injured Man: "));
        assert!(branch.immediate.is_empty());

        let girl = fx.resolve(ZoneKind::Girl);
        assert!(girl.on_complete.is_empty());
        assert!(GIRL_CONVERSATIONS
            .iter()
            .any(|convo| convo.iter().copied().eq(girl.lines.iter().map(String::as_str))));
    }

    #[test]
    fn test_bridge_first_inspection_reveals_injured_man() {
        let mut fx = Fixture::new();
        let branch = fx.resolve(ZoneKind::Bridge);
        assert!(branch.immediate.contains(&Effect::RevealActor {
            actor: Actor::InjuredMan,
            at: places::INJURED_MAN,
        }));
        assert!(branch
            .immediate
            .contains(&Effect::SetZoneActive(ZoneKind::InjuredMan, true)));

        fx.apply(&branch.immediate);
        let again = fx.resolve(ZoneKind::Bridge);
        assert_eq!(again.lines[1], "(I need wood to fix it. Wood: 0/2)");
    }

    #[test]
    fn test_bridge_repair_chain() {
        let mut fx = Fixture::new();
        fx.flags.set(names::BRIDGE_SEEN, true);
        fx.flags.set(names::WOOD_COLLECTED, 2i64);

        let branch = fx.resolve(ZoneKind::Bridge);
        assert_eq!(branch.on_complete, vec![Effect::FollowUp(Beat::BridgeHammering)]);

        let hammering = fx.beat(Beat::BridgeHammering);
        assert_eq!(hammering.immediate, vec![Effect::PlayCue(Cue::Repair)]);
        assert_eq!(hammering.on_complete, vec![Effect::FollowUp(Beat::BridgeRepaired)]);

        let repaired = fx.beat(Beat::BridgeRepaired);
        assert!(repaired.immediate.contains(&Effect::OpenBridgeCrossing));
        assert!(repaired
            .immediate
            .contains(&Effect::SetGroupActive(ZoneGroup::Trees, false)));
        assert!(matches!(
            repaired.on_complete.as_slice(),
            [Effect::Unlock { fragment, .. }] if *fragment == fragment_ids::BRIDGE_MEMORY
        ));

        fx.apply(&repaired.immediate);
        assert_eq!(
            fx.resolve(ZoneKind::Bridge).lines,
            vec!["The bridge is sturdy now.\nTime to cross.".to_string()]
        );
    }

    #[test]
    fn test_key_handed_over_once() {
        let mut fx = Fixture::new();
        for flag in [names::BRIDGE_SEEN, names::QUEST_STARTED] {
            fx.flags.set(flag, true);
        }
        assert_eq!(
            fx.resolve(ZoneKind::InjuredMan).lines,
            vec!["Injured Man: I hope she's away from the river.\nPlease hurry!".to_string()]
        );

        fx.flags.set(names::CAT_FOUND, true);
        let handover = fx.resolve(ZoneKind::InjuredMan);
        assert!(handover.immediate.is_empty());
        assert!(handover.on_complete.contains(&Effect::AddItem(items::KEY)));

        fx.apply(&handover.on_complete);
        let after = fx.resolve(ZoneKind::InjuredMan);
        assert_eq!(after.lines, vec!["Injured Man: I hope that key was useful.".to_string()]);
    }

    #[test]
    fn test_chest_opens_once_with_key() {
        let mut fx = Fixture::new();
        let chest = ZoneKind::Chest(TileCoord::new(6, 30));
        assert_eq!(fx.resolve(chest).lines, vec!["It's locked.\n(I need a key.)".to_string()]);

        fx.inventory.add(items::KEY);
        let open = fx.resolve(chest);
        fx.apply(&open.immediate);
        assert!(fx.inventory.has(items::OLD_AXE));
        assert!(!fx.inventory.has(items::KEY));
        assert!(fx.flags.get_bool(names::TOOLS_COLLECTED));

        let empty = fx.resolve(chest);
        assert_eq!(empty.lines, vec!["Empty.".to_string()]);
        assert!(empty.immediate.is_empty());
    }

    #[test]
    fn test_tree_needs_axe_and_stops_at_target() {
        let mut fx = Fixture::new();
        let tree = ZoneKind::Tree(TileCoord::new(3, 24));
        assert_eq!(
            fx.resolve(tree).lines,
            vec!["(A sturdy tree. I'd need an axe to cut this.)".to_string()]
        );

        fx.inventory.add(items::OLD_AXE);
        let chop = fx.resolve(tree);
        assert_eq!(chop.immediate, vec![Effect::StartChopping(TileCoord::new(3, 24))]);

        let timber = fx.beat(Beat::Timber(TileCoord::new(3, 24)));
        assert_eq!(timber.lines.len(), 2);
        fx.apply(&timber.immediate);

        let second = fx.beat(Beat::Timber(TileCoord::new(10, 26)));
        assert_eq!(second.lines[2], "(That's enough wood to fix the bridge.)");
        fx.apply(&second.immediate);

        let enough = fx.resolve(ZoneKind::Tree(TileCoord::new(10, 26)));
        assert_eq!(
            enough.lines,
            vec!["(I have enough wood. I should fix the bridge now.)".to_string()]
        );
    }

    #[test]
    fn test_felled_tree_does_nothing() {
        let mut fx = Fixture::new();
        fx.inventory.add(items::OLD_AXE);
        assert!(fx.resolve(ZoneKind::Tree(TileCoord::new(50, 50))).is_empty());
    }

    #[test]
    fn test_flower_counter_milestones() {
        let mut fx = Fixture::new();
        let tiles = [
            TileCoord::new(30, 6),
            TileCoord::new(33, 4),
            TileCoord::new(36, 7),
        ];
        let mut messages = Vec::new();
        for tile in tiles {
            let branch = fx.resolve(ZoneKind::Flower(tile));
            assert!(branch
                .immediate
                .contains(&Effect::SetZoneActive(ZoneKind::Flower(tile), false)));
            messages.push(branch.lines.last().cloned().unwrap());
            fx.apply(&branch.immediate);
        }

        assert_eq!(
            messages,
            vec![
                "Picked a Flower 🌹 (1/3)".to_string(),
                "Picked a Flower 🌹 (2/3)".to_string(),
                "You made a beautiful Bouquet! 💐".to_string(),
            ]
        );
        assert!(fx.inventory.has(items::BOUQUET));
        assert!(fx.flags.get_bool(names::HAS_BOUQUET));
        assert_eq!(fx.flags.get_int(names::FLOWERS_COLLECTED), 3);

        // Every picked tile is gone, so nothing fires again.
        assert!(fx.resolve(ZoneKind::Flower(tiles[0])).is_empty());
    }

    #[test]
    fn test_mushroom_offers_choice() {
        let mut fx = Fixture::new();
        let tile = TileCoord::new(8, 12);
        let branch = fx.resolve(ZoneKind::Mushroom(tile));

        assert_eq!(branch.lines.last().map(String::as_str), Some(CHOICE_PROMPT));
        let choice = branch.choice.unwrap();
        assert_eq!(choice.yes, vec![Effect::FollowUp(Beat::EatMushroom(tile))]);
        assert_eq!(choice.no, vec![Effect::FollowUp(Beat::LeaveMushroom)]);
    }

    #[test]
    fn test_mushroom_poison_roll() {
        let tile = TileCoord::new(8, 12);
        let poisoned_step = Effect::Schedule {
            delay_ms: POISON_DELAY_MS,
            step: StoryStep::Poisoned,
        };

        let mut fx = Fixture::new();
        fx.poison_chance = 1.0;
        let bad = fx.beat(Beat::EatMushroom(tile));
        assert!(bad.immediate.contains(&poisoned_step));
        assert!(bad.immediate.contains(&Effect::RemoveTile(LayerId::Mushrooms, tile)));

        fx.poison_chance = 0.0;
        let fine = fx.beat(Beat::EatMushroom(tile));
        assert!(!fine.immediate.contains(&poisoned_step));
        assert_eq!(fine.lines.last().map(String::as_str), Some("(Not bad.)"));
    }

    #[test]
    fn test_girl_gift_chain() {
        let mut fx = Fixture::new();
        fx.flags.set(names::HAS_BOUQUET, true);
        fx.inventory.add(items::BOUQUET);

        let gift = fx.resolve(ZoneKind::Girl);
        assert_eq!(gift.on_complete.last(), Some(&Effect::FollowUp(Beat::GiftReaction)));
        fx.apply(&gift.on_complete);
        assert!(!fx.inventory.has(items::BOUQUET));

        let reaction = fx.beat(Beat::GiftReaction);
        assert_eq!(reaction.on_complete, vec![Effect::FollowUp(Beat::ValentineQuestion)]);

        let question = fx.beat(Beat::ValentineQuestion);
        assert_eq!(question.lines, vec![CHOICE_PROMPT.to_string()]);
        assert!(question.choice.is_some());

        let yes = fx.beat(Beat::ValentineYes);
        assert!(yes.on_complete.contains(&Effect::CompleteGame));
        assert!(yes.on_complete.contains(&Effect::JoinCompanion));

        let no = fx.beat(Beat::ValentineNo);
        assert_eq!(no.on_complete, vec![Effect::Run(StoryStep::Stabbed)]);
    }

    #[test]
    fn test_opening_monologue_plays_once() {
        let mut fx = Fixture::new();
        let opening = fx.beat(Beat::OpeningMonologue);
        assert_eq!(opening.lines[0], "(That dream again...)");
        fx.apply(&opening.immediate);
        assert!(fx.beat(Beat::OpeningMonologue).is_empty());
    }

    #[test]
    fn test_zone_groups() {
        assert!(ZoneGroup::Trees.contains(&ZoneKind::Tree(TileCoord::new(0, 0))));
        assert!(!ZoneGroup::Trees.contains(&ZoneKind::Flower(TileCoord::new(0, 0))));
        assert_eq!(ZoneKind::for_actor(Actor::Girl).actor(), Some(Actor::Girl));
        assert_eq!(ZoneKind::Bridge.actor(), None);
    }
}
