//! Whole-story walks on the in-memory grid world.

use story_engine::{
    places, Game, GridWorld, HostWorld, InputFrame, Scene, SessionExit, StartMode, StorySession,
    UiEvent, ZoneKind,
};
use story_state::{
    fragment_ids, items, names, shared, CompletionRecord, LayerId, MemoryRegistry, MemoryStore,
    Position, SharedStore, StoryConfig, TileCoord,
};

const FRAGMENTS_KEY: &str = "memory_device_fragments_v1";
const COMPLETION_KEY: &str = "memory_device_completed";

fn config() -> StoryConfig {
    StoryConfig::default()
        .with_reveal_interval(1)
        .with_poison_chance(0.0)
}

/// Advance until no dialogue is up, stopping early at a yes/no prompt.
fn settle(session: &mut StorySession, world: &mut GridWorld) {
    for _ in 0..500 {
        let dialogue = session.dialogue();
        if !dialogue.is_active() || dialogue.is_awaiting_choice() {
            return;
        }
        session.tick(world, &InputFrame::idle(), 500);
        session.tick(world, &InputFrame::interact(), 0);
    }
    panic!("dialogue never settled");
}

fn interact(session: &mut StorySession, world: &mut GridWorld, at: Position) {
    world.place_player(at);
    session.tick(world, &InputFrame::interact(), 0);
}

fn talk(session: &mut StorySession, world: &mut GridWorld, at: Position) {
    interact(session, world, at);
    settle(session, world);
}

fn chop(session: &mut StorySession, world: &mut GridWorld, tree: TileCoord) {
    let at = world.tile_center(tree);
    interact(session, world, at);
    assert!(session.is_chopping());
    session.tick(world, &InputFrame::idle(), 3000);
    settle(session, world);
}

/// Play from a fresh start up to the valentine question.
fn play_to_question(store: SharedStore) -> (StorySession, GridWorld) {
    let mut world = GridWorld::story_map();
    let mut session = StorySession::start(&config(), store, StartMode::NewGame, &mut world);

    session.tick(&mut world, &InputFrame::idle(), 1000);
    settle(&mut session, &mut world);
    assert!(session.memories().is_unlocked(fragment_ids::INTRO_DREAM));

    talk(&mut session, &mut world, places::VILLAGER);
    assert_eq!(session.quest_hint(), "Explore the river to the East");

    talk(&mut session, &mut world, places::BRIDGE);
    assert!(world.actor(story_state::Actor::InjuredMan).unwrap().visible);

    talk(&mut session, &mut world, places::INJURED_MAN);
    assert_eq!(session.quest_hint(), "Find the Cat (Search bushes)");

    talk(&mut session, &mut world, places::CAT);
    assert!(session.flags().get_bool(names::CAT_FOUND));
    assert!(session.memories().is_unlocked(fragment_ids::CAT_MEMORY));

    talk(&mut session, &mut world, places::INJURED_MAN);
    assert!(session.inventory().has(items::KEY));
    assert!(world.layer_visible(LayerId::Chest));

    let chest = world.tile_center(TileCoord::new(6, 30));
    talk(&mut session, &mut world, chest);
    assert_eq!(session.inventory_line().as_deref(), Some("Inv: Old Axe 🪓"));
    assert_eq!(session.quest_hint(), "Repair the Bridge");

    chop(&mut session, &mut world, TileCoord::new(3, 24));
    chop(&mut session, &mut world, TileCoord::new(10, 26));
    assert_eq!(session.flags().get_int(names::WOOD_COLLECTED), 2);

    talk(&mut session, &mut world, places::BRIDGE);
    assert!(session.flags().get_bool(names::BRIDGE_REPAIRED));
    assert!(world.layer_visible(LayerId::BridgeFixed));
    assert!(!world.collides(LayerId::Water, TileCoord::new(20, 19)));
    assert!(session.memories().is_unlocked(fragment_ids::BRIDGE_MEMORY));
    assert!(session.inventory().is_empty());

    talk(&mut session, &mut world, places::ISLAND_VILLAGER);
    assert_eq!(session.quest_hint(), "Find Roses (0/3)");

    for flower in [
        TileCoord::new(30, 6),
        TileCoord::new(33, 4),
        TileCoord::new(36, 7),
    ] {
        let at = world.tile_center(flower);
        talk(&mut session, &mut world, at);
    }
    assert!(session.inventory().has(items::BOUQUET));
    assert_eq!(session.quest_hint(), "Find the Girl (Flower Field)");
    assert!(session
        .zones()
        .zones()
        .filter(|z| matches!(z.action, ZoneKind::Flower(_)))
        .all(|z| !z.active));
    assert_eq!(session.flags().get_int(names::FLOWERS_COLLECTED), 3);

    talk(&mut session, &mut world, places::GIRL);
    assert!(session.dialogue().is_awaiting_choice());
    assert!(!session.inventory().has(items::BOUQUET));

    (session, world)
}

#[test]
fn test_full_story_yes_ending() {
    let store = shared(MemoryStore::new());
    let (mut session, mut world) = play_to_question(store.clone());

    session.tick(&mut world, &InputFrame::yes(), 0);
    settle(&mut session, &mut world);

    assert!(session.flags().get_bool(names::MET_GIRL));
    assert!(session.has_companion());
    assert_eq!(session.memories().unlocked_count(), 4);
    assert_eq!(session.quest_hint(), "Happy Valentine's Day! ❤️");
    assert!(session
        .toasts()
        .visible()
        .iter()
        .any(|t| t.message == "Dream Completed!"));
    assert!(CompletionRecord::new(store, COMPLETION_KEY).is_completed());
}

#[test]
fn test_full_story_no_ending_wipes_memories() {
    let store = shared(MemoryStore::new());
    let (mut session, mut world) = play_to_question(store.clone());

    session.tick(&mut world, &InputFrame::no(), 0);
    settle(&mut session, &mut world);

    assert!(session.is_dying());
    assert_eq!(session.memories().unlocked_count(), 0);
    assert_eq!(
        MemoryRegistry::load(store.clone(), FRAGMENTS_KEY).unlocked_count(),
        0
    );

    assert_eq!(session.tick(&mut world, &InputFrame::idle(), 3000), None);
    assert!(session.take_events().iter().any(
        |e| matches!(e, UiEvent::Banner { title, .. } if title == "MEMORIES ERASED")
    ));
    assert_eq!(
        session.tick(&mut world, &InputFrame::idle(), 4000),
        Some(SessionExit::ReturnToBoot)
    );
    assert!(!CompletionRecord::new(store, COMPLETION_KEY).is_completed());
}

fn settle_game(game: &mut Game<GridWorld>) {
    for _ in 0..500 {
        let Some(session) = game.session() else {
            return;
        };
        let dialogue = session.dialogue();
        if !dialogue.is_active() || dialogue.is_awaiting_choice() {
            return;
        }
        game.tick(&InputFrame::idle(), 500);
        game.tick(&InputFrame::interact(), 0);
    }
    panic!("dialogue never settled");
}

#[test]
fn test_load_game_after_completion() {
    let store = shared(MemoryStore::new());
    CompletionRecord::new(store.clone(), COMPLETION_KEY).set_completed(true);

    let mut game = Game::new(config(), store.clone(), GridWorld::story_map);
    game.tick(&InputFrame::idle(), 3800);
    assert_eq!(game.scene(), Scene::Title);

    let mut down = InputFrame::idle();
    down.down = true;
    game.tick(&down, 16);
    game.tick(&InputFrame::confirm(), 16);

    let session = game.session().unwrap();
    assert_eq!(session.mode(), StartMode::LoadGame);
    assert!(session.has_companion());
    assert_eq!(game.world().player_position(), places::POST_GAME_SPAWN);
    assert!(MemoryRegistry::load(store, FRAGMENTS_KEY).is_unlocked(fragment_ids::FLOWERS_MEMORY));
}

#[test]
fn test_poison_restarts_with_fresh_world() {
    let store = shared(MemoryStore::new());
    let mut game = Game::new(
        config().with_poison_chance(1.0),
        store,
        GridWorld::story_map,
    );
    game.tick(&InputFrame::idle(), 3800);
    game.tick(&InputFrame::confirm(), 16);
    assert_eq!(game.scene(), Scene::Playing);

    game.tick(&InputFrame::idle(), 1000);
    settle_game(&mut game);

    let mushroom = TileCoord::new(8, 12);
    let at = game.world().tile_center(mushroom);
    game.world_mut().place_player(at);
    game.tick(&InputFrame::interact(), 0);
    settle_game(&mut game);
    game.tick(&InputFrame::yes(), 0);
    assert!(!game.world().has_tile(LayerId::Mushrooms, mushroom));
    settle_game(&mut game);

    game.tick(&InputFrame::idle(), 4000);
    assert!(game.session().unwrap().is_dying());
    game.tick(&InputFrame::idle(), 5000);
    game.tick(&InputFrame::idle(), 3000);

    let events = game.take_events();
    assert!(events
        .iter()
        .any(|e| matches!(e, UiEvent::Banner { title, .. } if title == "YOU DIED")));

    let session = game.session().unwrap();
    assert!(!session.is_dying());
    assert!(!session.flags().get_bool(names::GAME_STARTED));
    assert!(game.world().has_tile(LayerId::Mushrooms, mushroom));
    assert_eq!(game.scene(), Scene::Playing);
}
