//! Top level: scenes, the running session and persistence.

use story_state::{CompletionRecord, FragmentCatalog, MemoryRegistry, SharedStore, StoryConfig};
use tracing::info;

use crate::events::UiEvent;
use crate::input::InputFrame;
use crate::scene::{FragmentViewer, Scene, SceneCommand, SceneDirector};
use crate::session::{SessionExit, StartMode, StorySession};
use crate::world::HostWorld;

/// The whole game for one host.
///
/// `new_world` builds a fresh map whenever a session begins, so every run
/// starts from untouched tiles.
pub struct Game<W: HostWorld> {
    config: StoryConfig,
    store: SharedStore,
    catalog: FragmentCatalog,
    director: SceneDirector,
    new_world: Box<dyn Fn() -> W>,
    world: W,
    session: Option<StorySession>,
    events: Vec<UiEvent>,
}

impl<W: HostWorld> Game<W> {
    pub fn new(config: StoryConfig, store: SharedStore, new_world: impl Fn() -> W + 'static) -> Self {
        let world = new_world();
        let director = SceneDirector::new(config.session.boot_duration_ms);
        Self {
            config,
            store,
            catalog: FragmentCatalog::story(),
            director,
            new_world: Box::new(new_world),
            world,
            session: None,
            events: Vec::new(),
        }
    }

    pub fn scene(&self) -> Scene {
        self.director.scene()
    }

    pub fn director(&self) -> &SceneDirector {
        &self.director
    }

    pub fn session(&self) -> Option<&StorySession> {
        self.session.as_ref()
    }

    pub fn world(&self) -> &W {
        &self.world
    }

    /// Mutable world access for hosts that step physics themselves.
    pub fn world_mut(&mut self) -> &mut W {
        &mut self.world
    }

    pub fn catalog(&self) -> &FragmentCatalog {
        &self.catalog
    }

    /// Drain UI events from menus and the session.
    pub fn take_events(&mut self) -> Vec<UiEvent> {
        if let Some(session) = self.session.as_mut() {
            self.events.extend(session.take_events());
        }
        std::mem::take(&mut self.events)
    }

    /// Advance one frame.
    pub fn tick(&mut self, input: &InputFrame, elapsed_ms: u64) {
        if let Some(command) = self.director.update(elapsed_ms) {
            self.execute(command);
            return;
        }
        if let Some(command) = self.director.handle_input(input) {
            self.execute(command);
            return;
        }
        if self.director.scene() != Scene::Playing {
            return;
        }
        let Some(session) = self.session.as_mut() else {
            return;
        };
        match session.tick(&mut self.world, input, elapsed_ms) {
            Some(SessionExit::RestartSession) => {
                self.events.extend(session.take_events());
                self.world = (self.new_world)();
                session.restart(&mut self.world);
            }
            Some(SessionExit::ReturnToBoot) => {
                self.events.extend(session.take_events());
                self.session = None;
                self.director.reboot();
            }
            None => {}
        }
    }

    fn execute(&mut self, command: SceneCommand) {
        match command {
            SceneCommand::ShowTitle => {
                let completed = self.completion().is_completed();
                let fragments = self.memories().unlocked_count();
                self.director.show_title(completed, fragments);
            }
            SceneCommand::StartSession(mode) => self.start_session(mode),
            SceneCommand::OpenFragments { from_pause } => {
                let viewer = FragmentViewer::new(&self.catalog, &self.memories(), from_pause);
                self.director.open_viewer(viewer);
            }
            SceneCommand::EndSession => {
                if let Some(mut session) = self.session.take() {
                    self.events.extend(session.take_events());
                    info!(session = %session.id(), "session ended from the pause menu");
                }
                self.execute(SceneCommand::ShowTitle);
            }
            SceneCommand::MenuLocked => self.events.push(UiEvent::MenuLocked),
        }
    }

    fn start_session(&mut self, mode: StartMode) {
        self.world = (self.new_world)();
        let session = StorySession::start(&self.config, self.store.clone(), mode, &mut self.world);
        self.session = Some(session);
        self.director.start_playing();
    }

    fn memories(&self) -> MemoryRegistry {
        MemoryRegistry::load(self.store.clone(), self.config.storage.fragments_key.clone())
    }

    fn completion(&self) -> CompletionRecord {
        CompletionRecord::new(self.store.clone(), self.config.storage.completion_key.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::GridWorld;
    use story_state::{fragment_ids, shared, MemoryStore};

    fn game() -> Game<GridWorld> {
        Game::new(
            StoryConfig::default(),
            shared(MemoryStore::new()),
            GridWorld::story_map,
        )
    }

    fn boot(game: &mut Game<GridWorld>) {
        game.tick(&InputFrame::idle(), 3800);
        assert_eq!(game.scene(), Scene::Title);
    }

    #[test]
    fn test_begin_memory_starts_session() {
        let mut game = game();
        boot(&mut game);
        assert!(game.session().is_none());

        game.tick(&InputFrame::confirm(), 16);
        assert_eq!(game.scene(), Scene::Playing);
        let session = game.session().unwrap();
        assert_eq!(session.mode(), StartMode::NewGame);
    }

    #[test]
    fn test_pause_freezes_session_clock() {
        let mut game = game();
        boot(&mut game);
        game.tick(&InputFrame::confirm(), 16);
        game.tick(&InputFrame::idle(), 100);
        let before = game.session().unwrap().now_ms();

        game.tick(&InputFrame::cancel(), 16);
        game.tick(&InputFrame::idle(), 5000);
        assert_eq!(game.scene(), Scene::Paused);
        assert_eq!(game.session().unwrap().now_ms(), before);
    }

    #[test]
    fn test_exit_returns_to_title() {
        let mut game = game();
        boot(&mut game);
        game.tick(&InputFrame::confirm(), 16);
        game.tick(&InputFrame::cancel(), 16);

        let mut up = InputFrame::idle();
        up.up = true;
        game.tick(&up, 16);
        game.tick(&InputFrame::confirm(), 16);

        assert_eq!(game.scene(), Scene::Title);
        assert!(game.session().is_none());
    }

    #[test]
    fn test_title_reflects_unlocked_fragments() {
        let store = shared(MemoryStore::new());
        MemoryRegistry::load(store.clone(), "memory_device_fragments_v1")
            .unlock(fragment_ids::CAT_MEMORY);

        let mut game = Game::new(StoryConfig::default(), store, GridWorld::story_map);
        boot(&mut game);
        let labels: Vec<_> = game
            .director()
            .title_menu()
            .items()
            .iter()
            .map(|i| i.label.clone())
            .collect();
        assert_eq!(labels, vec!["BEGIN MEMORY", "FRAGMENTS (1)"]);
    }

    #[test]
    fn test_locked_fragments_raise_event() {
        let mut game = game();
        boot(&mut game);
        let mut down = InputFrame::idle();
        down.down = true;
        game.tick(&down, 16);
        game.tick(&InputFrame::confirm(), 16);
        assert_eq!(game.take_events(), vec![UiEvent::MenuLocked]);
        assert_eq!(game.scene(), Scene::Title);
    }
}
