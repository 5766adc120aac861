//! Boot screen, title menu, pause menu and the fragment viewer.
//!
//! The [`SceneDirector`] only tracks which screen is up and what is
//! selected on it. Anything that needs storage or a session is returned as
//! a [`SceneCommand`] for the owner to carry out.

use serde::{Deserialize, Serialize};
use story_state::{FragmentCatalog, FragmentRecord, MemoryRegistry};
use tracing::debug;

use crate::input::InputFrame;
use crate::session::StartMode;

/// Columns in the fragment grid.
pub const VIEWER_COLUMNS: i32 = 2;

/// The screen currently shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scene {
    Boot,
    Title,
    Playing,
    Paused,
    FragmentViewer,
}

/// What confirming a menu entry does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MenuAction {
    BeginMemory,
    LoadGame,
    Fragments,
    Resume,
    Exit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuItem {
    pub label: String,
    pub action: MenuAction,
    pub locked: bool,
}

impl MenuItem {
    fn new(label: impl Into<String>, action: MenuAction) -> Self {
        Self {
            label: label.into(),
            action,
            locked: false,
        }
    }
}

/// A vertical menu with a wrapping cursor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Menu {
    items: Vec<MenuItem>,
    selected: usize,
}

impl Menu {
    pub fn new(items: Vec<MenuItem>) -> Self {
        Self { items, selected: 0 }
    }

    /// The title menu. `LOAD GAME` only appears once the story was completed.
    pub fn title(completed: bool, unlocked_fragments: usize) -> Self {
        let mut items = vec![MenuItem::new("BEGIN MEMORY", MenuAction::BeginMemory)];
        if completed {
            items.push(MenuItem::new("LOAD GAME", MenuAction::LoadGame));
        }
        items.push(if unlocked_fragments > 0 {
            MenuItem::new(format!("FRAGMENTS ({})", unlocked_fragments), MenuAction::Fragments)
        } else {
            MenuItem {
                locked: true,
                ..MenuItem::new("FRAGMENTS (LOCKED)", MenuAction::Fragments)
            }
        });
        Self::new(items)
    }

    pub fn pause() -> Self {
        Self::new(vec![
            MenuItem::new("RESUME", MenuAction::Resume),
            MenuItem::new("FRAGMENTS", MenuAction::Fragments),
            MenuItem::new("EXIT", MenuAction::Exit),
        ])
    }

    pub fn items(&self) -> &[MenuItem] {
        &self.items
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn selected(&self) -> Option<&MenuItem> {
        self.items.get(self.selected)
    }

    /// Move the cursor by one, wrapping at both ends.
    pub fn move_selection(&mut self, down: bool) {
        if self.items.is_empty() {
            return;
        }
        let len = self.items.len();
        self.selected = if down {
            (self.selected + 1) % len
        } else {
            (self.selected + len - 1) % len
        };
    }

    fn navigate(&mut self, input: &InputFrame) {
        if input.up {
            self.move_selection(false);
        } else if input.down {
            self.move_selection(true);
        }
    }
}

/// One cell of the fragment grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentCard {
    pub record: FragmentRecord,
    pub unlocked: bool,
}

/// Grid of every fragment in the catalog, locked ones included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentViewer {
    cards: Vec<FragmentCard>,
    selected: usize,
    full_view: bool,
    from_pause: bool,
}

impl FragmentViewer {
    pub fn new(catalog: &FragmentCatalog, memories: &MemoryRegistry, from_pause: bool) -> Self {
        let cards = catalog
            .records()
            .iter()
            .map(|record| FragmentCard {
                unlocked: memories.is_unlocked(&record.id),
                record: record.clone(),
            })
            .collect();
        Self {
            cards,
            selected: 0,
            full_view: false,
            from_pause,
        }
    }

    pub fn cards(&self) -> &[FragmentCard] {
        &self.cards
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    /// Grid cell of the selection as (row, column).
    pub fn selected_cell(&self) -> (usize, usize) {
        let columns = VIEWER_COLUMNS as usize;
        (self.selected / columns, self.selected % columns)
    }

    /// The fragment shown full screen, if any.
    pub fn full_view(&self) -> Option<&FragmentRecord> {
        if self.full_view {
            self.cards.get(self.selected).map(|c| &c.record)
        } else {
            None
        }
    }

    pub fn opened_from_pause(&self) -> bool {
        self.from_pause
    }

    /// Move the selection. Past either end it jumps to the other end.
    pub fn move_selection(&mut self, delta: i32) {
        if self.full_view || self.cards.is_empty() {
            return;
        }
        let last = self.cards.len() as i32 - 1;
        let next = self.selected as i32 + delta;
        self.selected = if next < 0 {
            last as usize
        } else if next > last {
            0
        } else {
            next as usize
        };
    }

    /// Toggle the full view. Returns `false` when the selection is locked.
    pub fn confirm(&mut self) -> bool {
        if self.full_view {
            self.full_view = false;
            return true;
        }
        match self.cards.get(self.selected) {
            Some(card) if card.unlocked => {
                self.full_view = true;
                true
            }
            _ => false,
        }
    }

    /// Close the full view. Returns `true` when the viewer itself should close.
    pub fn back(&mut self) -> bool {
        if self.full_view {
            self.full_view = false;
            false
        } else {
            true
        }
    }
}

/// Work the director hands back to its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SceneCommand {
    /// Build the title menu from persisted state.
    ShowTitle,
    StartSession(StartMode),
    /// Build the fragment viewer from persisted state.
    OpenFragments { from_pause: bool },
    /// Drop the running session and go to the title.
    EndSession,
    MenuLocked,
}

/// Which screen is up and the state of its menu.
#[derive(Debug, Clone)]
pub struct SceneDirector {
    scene: Scene,
    boot_duration_ms: u64,
    boot_elapsed_ms: u64,
    title: Menu,
    pause: Menu,
    viewer: Option<FragmentViewer>,
}

impl SceneDirector {
    /// Start on the boot screen.
    pub fn new(boot_duration_ms: u64) -> Self {
        Self {
            scene: Scene::Boot,
            boot_duration_ms,
            boot_elapsed_ms: 0,
            title: Menu::title(false, 0),
            pause: Menu::pause(),
            viewer: None,
        }
    }

    pub fn scene(&self) -> Scene {
        self.scene
    }

    pub fn title_menu(&self) -> &Menu {
        &self.title
    }

    pub fn pause_menu(&self) -> &Menu {
        &self.pause
    }

    pub fn viewer(&self) -> Option<&FragmentViewer> {
        self.viewer.as_ref()
    }

    /// Count down the boot screen.
    pub fn update(&mut self, elapsed_ms: u64) -> Option<SceneCommand> {
        if self.scene != Scene::Boot {
            return None;
        }
        self.boot_elapsed_ms = self.boot_elapsed_ms.saturating_add(elapsed_ms);
        (self.boot_elapsed_ms >= self.boot_duration_ms).then_some(SceneCommand::ShowTitle)
    }

    pub fn reboot(&mut self) {
        self.viewer = None;
        self.boot_elapsed_ms = 0;
        self.transition(Scene::Boot);
    }

    pub fn show_title(&mut self, completed: bool, unlocked_fragments: usize) {
        self.title = Menu::title(completed, unlocked_fragments);
        self.viewer = None;
        self.transition(Scene::Title);
    }

    pub fn start_playing(&mut self) {
        self.transition(Scene::Playing);
    }

    pub fn open_viewer(&mut self, viewer: FragmentViewer) {
        self.viewer = Some(viewer);
        self.transition(Scene::FragmentViewer);
    }

    /// Route one frame of input to the current screen.
    ///
    /// While playing, only `cancel` is consumed; everything else belongs to
    /// the session.
    pub fn handle_input(&mut self, input: &InputFrame) -> Option<SceneCommand> {
        match self.scene {
            Scene::Boot => None,
            Scene::Title => {
                self.title.navigate(input);
                if !input.confirm {
                    return None;
                }
                let item = self.title.selected()?;
                match item.action {
                    _ if item.locked => Some(SceneCommand::MenuLocked),
                    MenuAction::BeginMemory => Some(SceneCommand::StartSession(StartMode::NewGame)),
                    MenuAction::LoadGame => Some(SceneCommand::StartSession(StartMode::LoadGame)),
                    MenuAction::Fragments => Some(SceneCommand::OpenFragments { from_pause: false }),
                    MenuAction::Resume | MenuAction::Exit => None,
                }
            }
            Scene::Playing => {
                if input.cancel {
                    self.pause = Menu::pause();
                    self.transition(Scene::Paused);
                }
                None
            }
            Scene::Paused => {
                if input.cancel {
                    self.transition(Scene::Playing);
                    return None;
                }
                self.pause.navigate(input);
                if !input.confirm {
                    return None;
                }
                match self.pause.selected()?.action {
                    MenuAction::Resume => {
                        self.transition(Scene::Playing);
                        None
                    }
                    MenuAction::Fragments => Some(SceneCommand::OpenFragments { from_pause: true }),
                    MenuAction::Exit => Some(SceneCommand::EndSession),
                    MenuAction::BeginMemory | MenuAction::LoadGame => None,
                }
            }
            Scene::FragmentViewer => self.handle_viewer(input),
        }
    }

    fn handle_viewer(&mut self, input: &InputFrame) -> Option<SceneCommand> {
        let viewer = self.viewer.as_mut()?;
        if input.cancel {
            if !viewer.back() {
                return None;
            }
            let from_pause = viewer.opened_from_pause();
            self.viewer = None;
            if from_pause {
                self.transition(Scene::Paused);
                return None;
            }
            return Some(SceneCommand::ShowTitle);
        }
        if input.confirm {
            return (!viewer.confirm()).then_some(SceneCommand::MenuLocked);
        }
        if input.left {
            viewer.move_selection(-1);
        } else if input.right {
            viewer.move_selection(1);
        } else if input.up {
            viewer.move_selection(-VIEWER_COLUMNS);
        } else if input.down {
            viewer.move_selection(VIEWER_COLUMNS);
        }
        None
    }

    fn transition(&mut self, to: Scene) {
        if self.scene != to {
            debug!(from = ?self.scene, ?to, "scene change");
            self.scene = to;
        }
    }
}
