//! The launcher actor owns the item tree, the navigation stack and any open
//! edit session. Every input (toggle requests from other instances, the
//! global hotkey, frontend callbacks, finished launches) arrives as an
//! [`Event`] on one channel and is handled in order.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace, warn};

use crate::actor;
use crate::common::config::Config;
use crate::common::store::TreeStore;
use crate::model::item::{ItemStyle, KindTag};
use crate::model::navigation::{NavError, NavigationStack};
use crate::model::reconcile::reconcile;
use crate::model::session::{EditCommand, EditOutcome, EditSession};
use crate::model::tree::{ItemTree, NodeId};
use crate::sys::exec::{Executor, RunAs};
use crate::sys::hotkey::{Hotkey, HotkeyRegistrar, KeyCode, Modifiers};

pub type Sender = actor::Sender<Event>;
pub type Receiver = actor::Receiver<Event>;

#[derive(Debug)]
pub enum Event {
    /// From another instance or the global hotkey.
    Toggle,
    /// The view lost foreground activation.
    Deactivated,
    /// An item in the current view was clicked, with the modifiers held.
    Activate { node: NodeId, modifiers: Modifiers },
    /// A key chord pressed while the view has focus.
    KeyPressed(Hotkey),
    GoUp,
    BeginEdit,
    Edit(EditCommand),
    CommitEdit,
    CancelEdit,
    /// A program started with `close_on_run = false` has exited.
    LaunchExited { item: String, code: Option<i32> },
    Quit,
}

/// One button in the launcher view.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ViewItem {
    pub id: NodeId,
    pub name: String,
    pub description: String,
    pub kind: KindTag,
    pub shortcut: Option<Hotkey>,
    pub style: ItemStyle,
    pub button_color: u32,
    pub font_color: u32,
}

/// One row of the editor's tree view, in pre-order.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EditorRow {
    pub id: NodeId,
    pub depth: usize,
    pub name: String,
    pub kind: KindTag,
    pub expanded: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EditorView {
    pub rows: Vec<EditorRow>,
    pub selection: Option<NodeId>,
}

/// What the frontend is told to do.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    Show {
        path: Vec<String>,
        items: Vec<ViewItem>,
        focus: Option<NodeId>,
    },
    Hide,
    Warning(String),
    EditorOpened(EditorView),
    EditorUpdated { view: EditorView, outcome: EditOutcome },
    EditorClosed,
    Quit,
}

/// The launcher's boundaries to the outside world.
pub struct Services {
    pub hotkeys: Box<dyn HotkeyRegistrar>,
    pub executor: Box<dyn Executor>,
    pub store: Box<dyn TreeStore>,
}

pub struct Launcher {
    config: Config,
    config_path: Option<PathBuf>,
    tree: ItemTree,
    nav: NavigationStack,
    visible: bool,
    pending_launches: usize,
    session: Option<EditSession>,
    services: Services,
    events_tx: Sender,
    view_tx: actor::Sender<ViewEvent>,
    quitting: bool,
}

impl Launcher {
    pub fn new(
        config: Config,
        config_path: Option<PathBuf>,
        tree: ItemTree,
        services: Services,
        events_tx: Sender,
        view_tx: actor::Sender<ViewEvent>,
    ) -> Self {
        Launcher {
            config,
            config_path,
            tree,
            nav: NavigationStack::new(),
            visible: false,
            pending_launches: 0,
            session: None,
            services,
            events_tx,
            view_tx,
            quitting: false,
        }
    }

    /// Registers the global hotkey and shows the root view.
    pub fn start(&mut self) {
        self.services.executor.update_settings(&self.config.settings.exec);
        self.register_hotkey();
        self.show();
    }

    pub async fn run(mut self, mut events: Receiver) {
        self.start();
        while let Some((span, event)) = events.recv().await {
            let _guard = span.enter();
            self.handle_event(event);
            if self.quitting {
                break;
            }
        }
        self.shutdown();
    }

    pub fn is_visible(&self) -> bool { self.visible }

    pub fn is_editing(&self) -> bool { self.session.is_some() }

    pub fn tree(&self) -> &ItemTree { &self.tree }

    pub fn navigation(&self) -> &NavigationStack { &self.nav }

    pub fn config(&self) -> &Config { &self.config }

    #[instrument(name = "launcher::handle_event", skip(self))]
    pub fn handle_event(&mut self, event: Event) {
        use self::Event::*;
        match event {
            Toggle => self.toggle(),
            Deactivated => self.deactivated(),
            Activate { node, modifiers } => self.activate(node, modifiers),
            KeyPressed(hotkey) => self.key_pressed(hotkey),
            GoUp => self.go_up(),
            BeginEdit => self.begin_edit(),
            Edit(command) => self.edit(command),
            CommitEdit => self.commit_edit(),
            CancelEdit => self.cancel_edit(),
            LaunchExited { item, code } => self.launch_exited(&item, code),
            Quit => {
                info!("Quitting");
                self.quitting = true;
                self.view_tx.send(ViewEvent::Quit);
            }
        }
    }

    fn toggle(&mut self) {
        if self.session.is_some() {
            debug!("Toggle ignored while the editor is open");
            return;
        }
        if !self.visible {
            // The tree may have been replaced since the view was last shown.
            self.nav = self.nav.reconciled(&self.tree, &self.tree);
            self.show();
        } else if !self.config.settings.close_instead_of_navigate && !self.nav.is_empty() {
            self.go_up();
        } else {
            self.dismiss();
        }
    }

    fn deactivated(&mut self) {
        if !self.visible {
            return;
        }
        if self.pending_launches > 0 || self.session.is_some() {
            trace!(pending = self.pending_launches, "Auto-hide suppressed");
            return;
        }
        self.dismiss();
    }

    fn go_up(&mut self) {
        match self.nav.leave() {
            Ok(_) => self.show(),
            Err(NavError::AtRoot) => self.dismiss(),
            Err(e) => debug!("{e}"),
        }
    }

    /// Runs or enters `node`, which must be in the current view.
    pub fn activate(&mut self, node: NodeId, modifiers: Modifiers) {
        let current = self.nav.current(&self.tree);
        if self.tree.parent(node) != Some(current) {
            debug!(?node, "Activated item is not in the current view");
            return;
        }
        let Ok(item) = self.tree.item(node) else { return };

        if item.is_container() {
            match self.nav.enter(&self.tree, node) {
                Ok(()) => self.show(),
                Err(e) => debug!("{e}"),
            }
            return;
        }

        let run_as = item.kind.launch_spec().and(RunAs::from_modifiers(modifiers));
        let name = item.name.clone();
        let close_on_run = item.close_on_run;
        match self.services.executor.execute(item, run_as) {
            Ok(launch) if close_on_run => {
                info!(item = %name, ?run_as, "Launched");
                launch.on_exit(|_| {});
                self.dismiss();
            }
            Ok(launch) => {
                info!(item = %name, ?run_as, "Launched; waiting for exit");
                self.pending_launches += 1;
                self.hide();
                let events_tx = self.events_tx.clone();
                launch.on_exit(move |status| {
                    events_tx.send(Event::LaunchExited {
                        item: name,
                        code: status.and_then(|s| s.code()),
                    })
                });
            }
            Err(e) => {
                self.warn(format!("Could not run \"{name}\": {e}"));
                self.show();
            }
        }
    }

    fn launch_exited(&mut self, item: &str, code: Option<i32>) {
        debug!(item, ?code, "Launched program exited");
        self.pending_launches = self.pending_launches.saturating_sub(1);
        if !self.visible && self.session.is_none() {
            self.show();
        }
    }

    fn key_pressed(&mut self, hotkey: Hotkey) {
        if !self.visible {
            return;
        }
        if hotkey == Hotkey::key(KeyCode::Escape) {
            self.go_up();
            return;
        }
        if hotkey == self.config.settings.editor_hotkey {
            self.begin_edit();
            return;
        }
        let current = self.nav.current(&self.tree);
        let target = self.tree.children(current).find(|&c| {
            self.tree.item(c).is_ok_and(|item| item.shortcut == Some(hotkey))
        });
        match target {
            Some(node) => self.activate(node, Modifiers::empty()),
            None => trace!(%hotkey, "No item bound to chord"),
        }
    }

    fn begin_edit(&mut self) {
        if self.session.is_some() {
            debug!("Editor already open");
            return;
        }
        let path = self.nav.path_names(&self.tree);
        match EditSession::begin(&self.tree, &self.config.settings, &path) {
            Ok(session) => {
                self.hide();
                let view = editor_view(&session);
                self.session = Some(session);
                self.view_tx.send(ViewEvent::EditorOpened(view));
            }
            Err(e) => self.warn(format!("Could not open the editor: {e}")),
        }
    }

    fn edit(&mut self, command: EditCommand) {
        let Some(session) = self.session.as_mut() else {
            debug!(?command, "No edit session");
            return;
        };
        match session.apply(command) {
            Ok(outcome) => {
                let view = editor_view(session);
                self.view_tx.send(ViewEvent::EditorUpdated { view, outcome });
            }
            Err(e) => self.warn(e.to_string()),
        }
    }

    fn commit_edit(&mut self) {
        let Some(session) = self.session.take() else {
            debug!("No edit session to commit");
            return;
        };
        let path = self.nav.path_names(&self.tree);
        session.commit(&mut self.tree, &mut self.config.settings);
        self.nav = reconcile(&path, &self.tree);
        self.view_tx.send(ViewEvent::EditorClosed);

        if let Err(e) = self.services.store.save_tree(&self.tree) {
            self.warn(format!("Could not save items: {e}"));
        }
        if let Some(path) = &self.config_path {
            if let Err(e) = self.config.save(path) {
                self.warn(format!("Could not save settings: {e}"));
            }
        }
        self.services.executor.update_settings(&self.config.settings.exec);
        self.services.hotkeys.unregister();
        self.register_hotkey();
        self.show();
    }

    fn cancel_edit(&mut self) {
        let Some(session) = self.session.take() else { return };
        session.cancel();
        self.view_tx.send(ViewEvent::EditorClosed);
        self.show();
    }

    fn register_hotkey(&mut self) {
        if !self.config.settings.stay_resident {
            debug!("Not resident; global hotkey not registered");
            return;
        }
        let hotkey = self.config.settings.global_hotkey;
        let (modifiers, key) = hotkey.registration_parts();
        if let Err(e) = self.services.hotkeys.register(modifiers, key) {
            self.warn(format!("Global hotkey {hotkey} is unavailable: {e}"));
        }
    }

    fn show(&mut self) {
        let current = self.nav.current(&self.tree);
        let items: Vec<ViewItem> =
            self.tree.children(current).filter_map(|c| self.view_item(c)).collect();
        let focus = items.first().map(|i| i.id);
        self.visible = true;
        self.view_tx.send(ViewEvent::Show {
            path: self.nav.path_names(&self.tree),
            items,
            focus,
        });
    }

    fn hide(&mut self) {
        if self.visible {
            self.visible = false;
            self.view_tx.send(ViewEvent::Hide);
        }
    }

    /// Hides the view at the user's request. A non-resident launcher exits.
    fn dismiss(&mut self) {
        self.hide();
        if !self.config.settings.stay_resident && self.pending_launches == 0 {
            self.handle_event(Event::Quit);
        }
    }

    fn warn(&self, message: String) {
        warn!("{message}");
        self.view_tx.send(ViewEvent::Warning(message));
    }

    fn view_item(&self, id: NodeId) -> Option<ViewItem> {
        let item = self.tree.item(id).ok()?;
        Some(ViewItem {
            id,
            name: item.name.clone(),
            description: item.description.clone(),
            kind: item.tag(),
            shortcut: item.shortcut,
            style: item.style.clone(),
            button_color: item.style.button_color_for(item.tag()),
            font_color: item.style.font_color(),
        })
    }

    fn shutdown(&mut self) {
        self.services.hotkeys.unregister();
        if let Some(session) = self.session.take() {
            session.cancel();
        }
        debug!("Launcher stopped");
    }
}

fn editor_view(session: &EditSession) -> EditorView {
    let tree = session.working();
    let root = tree.root();
    let rows = tree
        .traverse_preorder(root)
        .filter(|&id| id != root)
        .filter_map(|id| {
            let item = tree.item(id).ok()?;
            Some(EditorRow {
                id,
                depth: tree.ancestors(id).count().saturating_sub(2),
                name: item.name.clone(),
                kind: item.tag(),
                expanded: session.expanded().contains(&id),
            })
        })
        .collect();
    EditorView { rows, selection: session.selection() }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use test_log::test;

    use super::*;
    use crate::actor::drag_drop::Bounds;
    use crate::common::store::testing::MemoryStore;
    use crate::model::document::default_tree;
    use crate::model::item::{Item, ItemKind, default_button_color};
    use crate::sys::exec::testing::RecordingExecutor;
    use crate::sys::hotkey::testing::RecordingRegistrar;

    struct Harness {
        launcher: Launcher,
        events_rx: Receiver,
        view_rx: actor::Receiver<ViewEvent>,
        hotkeys: RecordingRegistrar,
        exec: RecordingExecutor,
        store: MemoryStore,
    }

    impl Harness {
        fn new(config: Config) -> Self {
            let hotkeys = RecordingRegistrar::default();
            let exec = RecordingExecutor::default();
            let store = MemoryStore::default();
            let (events_tx, events_rx) = actor::channel();
            let (view_tx, view_rx) = actor::channel();
            let services = Services {
                hotkeys: Box::new(hotkeys.clone()),
                executor: Box::new(exec.clone()),
                store: Box::new(store.clone()),
            };
            let mut launcher =
                Launcher::new(config, None, default_tree(), services, events_tx, view_tx);
            launcher.start();
            let mut harness = Harness { launcher, events_rx, view_rx, hotkeys, exec, store };
            harness.views();
            harness
        }

        fn with_defaults() -> Self { Self::new(Config::default()) }

        fn send(&mut self, event: Event) {
            self.launcher.handle_event(event);
            while let Ok((_, event)) = self.events_rx.try_recv() {
                self.launcher.handle_event(event);
            }
        }

        fn views(&mut self) -> Vec<ViewEvent> {
            let mut out = Vec::new();
            while let Ok((_, event)) = self.view_rx.try_recv() {
                out.push(event);
            }
            out
        }

        fn shown_names(&mut self) -> Option<Vec<String>> {
            self.views().into_iter().rev().find_map(|v| match v {
                ViewEvent::Show { items, .. } => Some(items.into_iter().map(|i| i.name).collect()),
                _ => None,
            })
        }

        fn node(&self, path: &[&str]) -> NodeId {
            let tree = self.launcher.tree();
            path.iter().fold(tree.root(), |parent, name| tree.find_child(parent, name).unwrap())
        }

        fn working_node(&self, path: &[&str]) -> NodeId {
            let tree = self.launcher.session.as_ref().unwrap().working();
            path.iter().fold(tree.root(), |parent, name| tree.find_child(parent, name).unwrap())
        }
    }

    fn root_names() -> Vec<String> {
        ["Notepad", "Calculator", "Command Prompt", "Utilities"].map(String::from).to_vec()
    }

    #[test]
    fn start_registers_hotkey_and_shows_root() {
        let hotkeys = RecordingRegistrar::default();
        let (events_tx, _events_rx) = actor::channel();
        let (view_tx, mut view_rx) = actor::channel();
        let services = Services {
            hotkeys: Box::new(hotkeys.clone()),
            executor: Box::new(RecordingExecutor::default()),
            store: Box::new(MemoryStore::default()),
        };
        let mut launcher =
            Launcher::new(Config::default(), None, default_tree(), services, events_tx, view_tx);
        launcher.start();

        assert_eq!(
            hotkeys.state.borrow().current,
            Some((Modifiers::CONTROL.union(Modifiers::ALT), KeyCode::KeyL))
        );
        let (_, event) = view_rx.try_recv().unwrap();
        let ViewEvent::Show { items, focus, path } = event else {
            panic!("expected Show, got {event:?}");
        };
        assert!(path.is_empty());
        assert_eq!(focus, Some(items[0].id));
        assert_eq!(items[0].button_color, default_button_color(KindTag::App));
        assert_eq!(items[0].font_color, ItemStyle::DEFAULT_FONT_COLOR);
        assert_eq!(items.into_iter().map(|i| i.name).collect::<Vec<_>>(), root_names());
    }

    #[test]
    fn toggle_hides_and_shows() {
        let mut h = Harness::with_defaults();
        h.send(Event::Toggle);
        assert!(!h.launcher.is_visible());
        assert_eq!(h.views(), vec![ViewEvent::Hide]);
        h.send(Event::Toggle);
        assert!(h.launcher.is_visible());
        assert_eq!(h.shown_names(), Some(root_names()));
    }

    #[test]
    fn toggle_navigates_up_before_hiding() {
        let mut h = Harness::with_defaults();
        let utilities = h.node(&["Utilities"]);
        h.send(Event::Activate { node: utilities, modifiers: Modifiers::empty() });
        assert_eq!(h.shown_names().unwrap(), ["Paint", "WordPad", "System Info"]);

        h.send(Event::Toggle);
        assert!(h.launcher.is_visible());
        assert_eq!(h.shown_names(), Some(root_names()));
        h.send(Event::Toggle);
        assert!(!h.launcher.is_visible());
    }

    #[test]
    fn close_instead_of_navigate_hides_immediately() {
        let mut config = Config::default();
        config.settings.close_instead_of_navigate = true;
        let mut h = Harness::new(config);
        let utilities = h.node(&["Utilities"]);
        h.send(Event::Activate { node: utilities, modifiers: Modifiers::empty() });
        h.send(Event::Toggle);
        assert!(!h.launcher.is_visible());
        assert_eq!(h.launcher.navigation().depth(), 1);

        // Showing again keeps the folder that was open.
        h.send(Event::Toggle);
        assert_eq!(h.shown_names().unwrap(), ["Paint", "WordPad", "System Info"]);
    }

    #[test]
    fn escape_leaves_folder_then_hides() {
        let mut h = Harness::with_defaults();
        let utilities = h.node(&["Utilities"]);
        h.send(Event::Activate { node: utilities, modifiers: Modifiers::empty() });
        h.send(Event::KeyPressed(Hotkey::key(KeyCode::Escape)));
        assert!(h.launcher.navigation().is_empty());
        assert!(h.launcher.is_visible());
        h.send(Event::KeyPressed(Hotkey::key(KeyCode::Escape)));
        assert!(!h.launcher.is_visible());
    }

    #[test]
    fn activation_passes_modifier_override() {
        let mut h = Harness::with_defaults();
        let notepad = h.node(&["Notepad"]);
        h.send(Event::Activate { node: notepad, modifiers: Modifiers::SHIFT });
        assert_eq!(h.exec.state.borrow().runs, vec![("Notepad".to_string(), Some(RunAs::Command))]);
        assert!(!h.launcher.is_visible());
    }

    #[test]
    fn override_is_ignored_without_launch_spec() {
        let mut tree = ItemTree::new(Item::folder("Root"));
        tree.push_back(tree.root(), Item::new("Backup", ItemKind::Task { task_name: "b".into() }))
            .unwrap();
        let mut h = Harness::with_defaults();
        h.launcher.tree = tree;
        let backup = h.node(&["Backup"]);
        h.send(Event::Activate { node: backup, modifiers: Modifiers::CONTROL });
        assert_eq!(h.exec.state.borrow().runs, vec![("Backup".to_string(), None)]);
    }

    #[test]
    fn chord_activates_first_match_in_current_view() {
        let mut h = Harness::with_defaults();
        h.send(Event::KeyPressed(Hotkey::key(KeyCode::KeyC)));
        assert_eq!(h.exec.state.borrow().runs, vec![("Calculator".to_string(), None)]);

        // Paint's chord only works inside Utilities.
        h.send(Event::Toggle);
        h.send(Event::KeyPressed(Hotkey::key(KeyCode::KeyP)));
        assert_eq!(h.exec.state.borrow().runs.len(), 1);
    }

    #[test]
    fn waiting_launch_hides_then_shows_again() {
        let mut h = Harness::with_defaults();
        let notepad = h.node(&["Notepad"]);
        h.launcher.tree.item_mut(notepad).unwrap().close_on_run = false;
        h.send(Event::Activate { node: notepad, modifiers: Modifiers::empty() });

        let views = h.views();
        assert_eq!(views[0], ViewEvent::Hide);
        assert!(matches!(views[1], ViewEvent::Show { .. }));
        assert!(h.launcher.is_visible());
        assert_eq!(h.launcher.pending_launches, 0);
    }

    #[test]
    fn deactivation_hides_unless_suppressed() {
        let mut h = Harness::with_defaults();
        h.launcher.pending_launches = 1;
        h.send(Event::Deactivated);
        assert!(h.launcher.is_visible());
        h.launcher.pending_launches = 0;
        h.send(Event::Deactivated);
        assert!(!h.launcher.is_visible());
    }

    #[test]
    fn launch_failure_warns_and_shows() {
        let mut h = Harness::with_defaults();
        h.exec.state.borrow_mut().fail = true;
        let notepad = h.node(&["Notepad"]);
        h.send(Event::Activate { node: notepad, modifiers: Modifiers::empty() });
        let views = h.views();
        assert!(matches!(&views[0], ViewEvent::Warning(m) if m.contains("Notepad")));
        assert!(matches!(views[1], ViewEvent::Show { .. }));
        assert!(h.launcher.is_visible());
    }

    #[test]
    fn hotkey_conflict_is_a_warning() {
        let hotkeys = RecordingRegistrar::default();
        let chord = (Modifiers::CONTROL.union(Modifiers::ALT), KeyCode::KeyL);
        hotkeys.state.borrow_mut().taken.push(chord);
        let (events_tx, _events_rx) = actor::channel();
        let (view_tx, mut view_rx) = actor::channel();
        let services = Services {
            hotkeys: Box::new(hotkeys.clone()),
            executor: Box::new(RecordingExecutor::default()),
            store: Box::new(MemoryStore::default()),
        };
        let mut launcher =
            Launcher::new(Config::default(), None, default_tree(), services, events_tx, view_tx);
        launcher.start();
        let (_, first) = view_rx.try_recv().unwrap();
        assert!(matches!(first, ViewEvent::Warning(m) if m.contains("Ctrl + Alt + L")));
        assert!(launcher.is_visible());
        assert_eq!(hotkeys.state.borrow().current, None);
    }

    #[test]
    fn not_resident_skips_hotkey_and_quits_on_hide() {
        let mut config = Config::default();
        config.settings.stay_resident = false;
        let mut h = Harness::new(config);
        assert_eq!(h.hotkeys.state.borrow().register_calls, 0);
        h.send(Event::Toggle);
        assert!(h.launcher.quitting);
        assert_eq!(h.views(), vec![ViewEvent::Hide, ViewEvent::Quit]);
    }

    #[test]
    fn editor_opens_at_current_folder() {
        let mut h = Harness::with_defaults();
        let utilities = h.node(&["Utilities"]);
        h.send(Event::Activate { node: utilities, modifiers: Modifiers::empty() });
        h.views();
        h.send(Event::KeyPressed(h.launcher.config().settings.editor_hotkey));
        assert!(h.launcher.is_editing());
        let views = h.views();
        assert_eq!(views[0], ViewEvent::Hide);
        let ViewEvent::EditorOpened(view) = &views[1] else {
            panic!("expected editor, got {:?}", views[1]);
        };
        assert_eq!(view.rows.len(), 7);
        let selected = view.rows.iter().find(|r| Some(r.id) == view.selection).unwrap();
        assert_eq!(selected.name, "Utilities");
        assert!(selected.expanded);
        assert_eq!(view.rows.iter().filter(|r| r.depth == 1).count(), 3);

        h.send(Event::Toggle);
        assert!(h.launcher.is_editing());
        assert!(!h.launcher.is_visible());
    }

    #[test]
    fn commit_saves_reconciles_and_reregisters() {
        let mut h = Harness::with_defaults();
        let utilities = h.node(&["Utilities"]);
        h.send(Event::Activate { node: utilities, modifiers: Modifiers::empty() });
        h.send(Event::BeginEdit);

        let paint = h.working_node(&["Utilities", "Paint"]);
        h.send(Event::Edit(EditCommand::Select(paint)));
        h.send(Event::Edit(EditCommand::Rename("Krita".into())));
        let new_hotkey: Hotkey = "Alt + Space".parse().unwrap();
        h.send(Event::Edit(EditCommand::SetGlobalHotkey(new_hotkey)));
        h.views();
        h.send(Event::CommitEdit);

        assert!(!h.launcher.is_editing());
        assert_eq!(h.launcher.config().settings.global_hotkey, new_hotkey);
        assert_eq!(h.launcher.navigation().path_names(h.launcher.tree()), ["Utilities"]);
        assert_eq!(h.store.state.borrow().save_count, 1);
        let saved = h.store.state.borrow().saved.clone().unwrap();
        assert_eq!(saved, h.launcher.tree().to_document());
        {
            let hotkeys = h.hotkeys.state.borrow();
            assert_eq!(hotkeys.current, Some((Modifiers::ALT, KeyCode::Space)));
            assert_eq!(hotkeys.unregister_calls, 1);
        }
        let views = h.views();
        assert_eq!(views[0], ViewEvent::EditorClosed);
        let ViewEvent::Show { items, path, .. } = &views[1] else {
            panic!("expected Show, got {:?}", views[1]);
        };
        assert_eq!(path, &["Utilities"]);
        assert_eq!(items[0].name, "Krita");
    }

    #[test]
    fn commit_of_deleted_folder_falls_back_to_root() {
        let mut h = Harness::with_defaults();
        let utilities = h.node(&["Utilities"]);
        h.send(Event::Activate { node: utilities, modifiers: Modifiers::empty() });
        h.send(Event::BeginEdit);
        h.send(Event::Edit(EditCommand::Delete));
        h.send(Event::CommitEdit);
        assert!(h.launcher.navigation().is_empty());
        assert_eq!(h.shown_names().unwrap(), ["Notepad", "Calculator", "Command Prompt"]);
    }

    #[test]
    fn save_failure_is_a_warning() {
        let mut h = Harness::with_defaults();
        h.store.state.borrow_mut().fail_save = true;
        h.send(Event::BeginEdit);
        h.send(Event::CommitEdit);
        let views = h.views();
        assert!(views.iter().any(|v| matches!(v, ViewEvent::Warning(m) if m.contains("save items"))));
        assert!(h.launcher.is_visible());
    }

    #[test]
    fn cancel_leaves_live_state_untouched() {
        let mut h = Harness::with_defaults();
        let before = h.launcher.tree().to_document();
        h.send(Event::BeginEdit);
        let notepad = h.working_node(&["Notepad"]);
        h.send(Event::Edit(EditCommand::BeginDrag(notepad)));
        h.send(Event::Edit(EditCommand::Drop { target: None, y: 500.0 }));
        h.send(Event::Edit(EditCommand::SetStayResident(false)));
        h.send(Event::CancelEdit);

        assert_eq!(h.launcher.tree().to_document(), before);
        assert!(h.launcher.config().settings.stay_resident);
        assert_eq!(h.store.state.borrow().save_count, 0);
        assert!(h.launcher.is_visible());
    }

    #[test]
    fn drag_in_editor_reports_outcome() {
        let mut h = Harness::with_defaults();
        h.send(Event::BeginEdit);
        let notepad = h.working_node(&["Notepad"]);
        let utilities = h.working_node(&["Utilities"]);
        h.send(Event::Edit(EditCommand::BeginDrag(notepad)));
        h.views();
        h.send(Event::Edit(EditCommand::Drop {
            target: Some((utilities, Bounds::new(0.0, 40.0))),
            y: 20.0,
        }));
        let views = h.views();
        let ViewEvent::EditorUpdated { view, .. } = &views[0] else {
            panic!("expected editor update, got {:?}", views[0]);
        };
        assert_eq!(view.selection, Some(notepad));
        let row = view.rows.iter().find(|r| r.id == notepad).unwrap();
        assert_eq!(row.depth, 1);

        h.send(Event::Edit(EditCommand::BeginDrag(utilities)));
        assert!(matches!(&h.views()[..], [ViewEvent::EditorUpdated { .. }]));
        h.send(Event::Edit(EditCommand::Drop {
            target: Some((notepad, Bounds::new(0.0, 40.0))),
            y: 20.0,
        }));
        let views = h.views();
        assert!(
            matches!(&views[..], [ViewEvent::Warning(m)] if m.contains("own ancestor")),
            "{views:?}"
        );
    }

    #[test]
    fn quit_unregisters_hotkey() {
        let mut h = Harness::with_defaults();
        h.send(Event::Quit);
        assert!(h.launcher.quitting);
        h.launcher.shutdown();
        assert_eq!(h.hotkeys.state.borrow().current, None);
    }
}
