//! Editing happens on a private copy of the item tree. Nothing reaches the
//! live tree until [`EditSession::commit`] swaps the copy in.

use tracing::{debug, info};

use crate::actor::drag_drop::{Bounds, DragManager, DropError, DropOutcome, ScrollHint};
use crate::common::config::Settings;
use crate::model::item::{Item, ItemKind, ItemStyle, KindTag, LaunchSpec};
use crate::model::reconcile::reconcile;
use crate::model::tree::{ItemTree, NodeId, TreeError};
use crate::sys::hotkey::Hotkey;

pub const NEW_ITEM_NAME: &str = "New Item";

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("could not copy the item tree: {0}")]
    CloneFailed(TreeError),
    #[error("item names cannot be blank")]
    InvalidName,
    #[error("no item is selected")]
    NoSelection,
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error(transparent)]
    Drop(#[from] DropError),
}

/// One editor interaction. Item edits apply to the current selection.
#[derive(Debug, Clone, PartialEq)]
pub enum EditCommand {
    Select(NodeId),
    Add,
    Delete,
    Rename(String),
    SetDescription(String),
    SetKind(KindTag),
    SetLaunch(LaunchSpec),
    SetTaskName(String),
    SetKeys(String),
    SetShortcut(Option<Hotkey>),
    SetCloseOnRun(bool),
    SetStyle(ItemStyle),
    SetGlobalHotkey(Hotkey),
    SetStayResident(bool),
    SetCloseInsteadOfNavigate(bool),
    BeginDrag(NodeId),
    DragOver {
        target: Option<NodeId>,
        y: f64,
        viewport_height: f64,
    },
    Drop {
        target: Option<(NodeId, Bounds)>,
        y: f64,
    },
    CancelDrag,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EditOutcome {
    Changed,
    Selected(Option<NodeId>),
    Added(NodeId),
    Deleted { selection: Option<NodeId> },
    Dropped(DropOutcome),
    DragFeedback {
        accept: bool,
        scroll: Option<ScrollHint>,
    },
    Unchanged,
}

pub struct EditSession {
    working: ItemTree,
    settings: Settings,
    org_root: NodeId,
    selection: Option<NodeId>,
    expanded: Vec<NodeId>,
    drag: DragManager,
    dirty: bool,
}

impl EditSession {
    /// Starts a session on a deep copy of `live`. `path` is the navigation
    /// path (names, root first) whose folders are expanded and whose deepest
    /// folder is selected.
    pub fn begin<S: AsRef<str>>(
        live: &ItemTree,
        settings: &Settings,
        path: &[S],
    ) -> Result<EditSession, SessionError> {
        let working = live.deep_copy().map_err(SessionError::CloneFailed)?;
        let expanded = reconcile(path, &working).entries().to_vec();
        let selection = expanded.last().copied();
        debug!(nodes = working.len(), ?selection, "Edit session started");
        Ok(EditSession {
            working,
            settings: settings.clone(),
            org_root: live.root(),
            selection,
            expanded,
            drag: DragManager::new(settings.editor.clone()),
            dirty: false,
        })
    }

    pub fn working(&self) -> &ItemTree { &self.working }

    pub fn settings(&self) -> &Settings { &self.settings }

    /// Root of the live tree this session was started from.
    pub fn org_root(&self) -> NodeId { self.org_root }

    pub fn selection(&self) -> Option<NodeId> { self.selection }

    pub fn expanded(&self) -> &[NodeId] { &self.expanded }

    pub fn is_dirty(&self) -> bool { self.dirty }

    pub fn apply(&mut self, command: EditCommand) -> Result<EditOutcome, SessionError> {
        use EditCommand::*;
        let outcome = match command {
            Select(node) => self.select(node)?,
            Add => EditOutcome::Added(self.add_item()?),
            Delete => self.delete_selected()?,
            Rename(name) => self.rename(&name)?,
            SetDescription(description) => {
                self.selected_item_mut()?.description = description;
                EditOutcome::Changed
            }
            SetKind(tag) => {
                let item = self.selected_item_mut()?;
                let kind = std::mem::replace(&mut item.kind, ItemKind::Folder);
                item.kind = kind.convert(tag);
                EditOutcome::Changed
            }
            SetLaunch(spec) => {
                let item = self.selected_item_mut()?;
                match item.kind.launch_spec_mut() {
                    Some(existing) => *existing = spec,
                    None => return Ok(EditOutcome::Unchanged),
                }
                EditOutcome::Changed
            }
            SetTaskName(name) => {
                let item = self.selected_item_mut()?;
                match &mut item.kind {
                    ItemKind::Task { task_name } => *task_name = name,
                    _ => return Ok(EditOutcome::Unchanged),
                }
                EditOutcome::Changed
            }
            SetKeys(new_keys) => {
                let item = self.selected_item_mut()?;
                match &mut item.kind {
                    ItemKind::Shortcut { keys } | ItemKind::GlobalShortcut { keys } => {
                        *keys = new_keys
                    }
                    _ => return Ok(EditOutcome::Unchanged),
                }
                EditOutcome::Changed
            }
            SetShortcut(shortcut) => {
                self.selected_item_mut()?.shortcut = shortcut;
                EditOutcome::Changed
            }
            SetCloseOnRun(close) => {
                self.selected_item_mut()?.close_on_run = close;
                EditOutcome::Changed
            }
            SetStyle(style) => {
                self.selected_item_mut()?.style = style;
                EditOutcome::Changed
            }
            SetGlobalHotkey(hotkey) => {
                self.settings.global_hotkey = hotkey;
                EditOutcome::Changed
            }
            SetStayResident(resident) => {
                self.settings.stay_resident = resident;
                EditOutcome::Changed
            }
            SetCloseInsteadOfNavigate(close) => {
                self.settings.close_instead_of_navigate = close;
                EditOutcome::Changed
            }
            BeginDrag(node) => {
                if !self.working.contains(node) {
                    return Err(TreeError::NodeNotFound(node).into());
                }
                self.drag.begin(node);
                EditOutcome::Unchanged
            }
            DragOver { target, y, viewport_height } => EditOutcome::DragFeedback {
                accept: self.drag.accepts(&self.working, target),
                scroll: self.drag.scroll_hint(&self.working, target, y, viewport_height),
            },
            Drop { target, y } => EditOutcome::Dropped(self.finish_drag(target, y)?),
            CancelDrag => {
                self.drag.reset();
                EditOutcome::Unchanged
            }
        };
        if matches!(
            outcome,
            EditOutcome::Changed
                | EditOutcome::Added(_)
                | EditOutcome::Deleted { .. }
                | EditOutcome::Dropped(_)
        ) {
            self.dirty = true;
        }
        Ok(outcome)
    }

    pub fn select(&mut self, node: NodeId) -> Result<EditOutcome, SessionError> {
        if !self.working.contains(node) {
            return Err(TreeError::NodeNotFound(node).into());
        }
        self.selection = Some(node).filter(|&n| n != self.working.root());
        Ok(EditOutcome::Selected(self.selection))
    }

    /// Adds a "New Item" app under the selected folder, or at the end of the
    /// root when the selection is not a folder. The new item is selected.
    pub fn add_item(&mut self) -> Result<NodeId, SessionError> {
        let parent = self
            .selection
            .filter(|&s| self.working.is_container(s))
            .unwrap_or(self.working.root());
        let id = self.working.push_back(parent, Item::app(NEW_ITEM_NAME, ""))?;
        if parent != self.working.root() && !self.expanded.contains(&parent) {
            self.expanded.push(parent);
        }
        self.selection = Some(id);
        debug!(?id, ?parent, "Added item");
        Ok(id)
    }

    /// Removes the selected item and its subtree. The selection moves to a
    /// neighbouring sibling, or the parent when there is none.
    pub fn delete_selected(&mut self) -> Result<EditOutcome, SessionError> {
        let node = self.selection.ok_or(SessionError::NoSelection)?;
        let next = node
            .next_sibling(&self.working.map)
            .or_else(|| node.prev_sibling(&self.working.map))
            .or_else(|| self.working.parent(node))
            .filter(|&n| n != self.working.root());
        self.working.remove(node)?;
        self.expanded.retain(|&e| self.working.contains(e));
        self.selection = next;
        Ok(EditOutcome::Deleted { selection: next })
    }

    pub fn rename(&mut self, name: &str) -> Result<EditOutcome, SessionError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SessionError::InvalidName);
        }
        self.selected_item_mut()?.name = name.to_string();
        Ok(EditOutcome::Changed)
    }

    fn finish_drag(
        &mut self,
        target: Option<(NodeId, Bounds)>,
        y: f64,
    ) -> Result<DropOutcome, SessionError> {
        let outcome = self.drag.drop(&mut self.working, target, y)?;
        if let DropOutcome::Into { target, .. } = outcome {
            if !self.expanded.contains(&target) {
                self.expanded.push(target);
            }
        }
        self.selection = Some(outcome.node());
        Ok(outcome)
    }

    fn selected_item_mut(&mut self) -> Result<&mut Item, SessionError> {
        let node = self.selection.ok_or(SessionError::NoSelection)?;
        Ok(self.working.item_mut(node)?)
    }

    /// Replaces the live tree and settings with the session's working copies
    /// and returns the new root. The previous tree is dropped.
    pub fn commit(self, live: &mut ItemTree, live_settings: &mut Settings) -> NodeId {
        if live.root() != self.org_root {
            debug!("Live tree was replaced while editing; committing over it");
        }
        let EditSession { working, settings, dirty, .. } = self;
        let old = std::mem::replace(live, working);
        *live_settings = settings;
        info!(nodes = live.len(), replaced = old.len(), dirty, "Edit session committed");
        live.root()
    }

    /// Discards the working copy. The live tree was never touched.
    pub fn cancel(self) {
        debug!(dirty = self.dirty, "Edit session cancelled");
    }
}
