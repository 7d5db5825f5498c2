use tracing::debug;

use crate::common::config::EditorSettings;
use crate::model::tree::{ItemTree, NodeId, TreeError};

/// Vertical extent of a row on screen, in pixels from the top of the view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub top: f64,
    pub height: f64,
}

impl Bounds {
    pub fn new(top: f64, height: f64) -> Self { Bounds { top, height } }

    pub fn bottom(&self) -> f64 { self.top + self.height }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropZone {
    Before,
    Into,
    After,
}

/// What a completed drop did to the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropOutcome {
    ToRootEnd { node: NodeId },
    Before { node: NodeId, target: NodeId },
    After { node: NodeId, target: NodeId },
    /// `target` should be expanded so the moved node is visible.
    Into { node: NodeId, target: NodeId },
}

impl DropOutcome {
    pub fn node(&self) -> NodeId {
        match *self {
            DropOutcome::ToRootEnd { node }
            | DropOutcome::Before { node, .. }
            | DropOutcome::After { node, .. }
            | DropOutcome::Into { node, .. } => node,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollHint {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DropError {
    #[error("no drag is in progress")]
    NotDragging,
    #[error(transparent)]
    Tree(#[from] TreeError),
}

#[derive(Debug, Clone)]
pub struct DragManager {
    dragged: Option<NodeId>,
    config: EditorSettings,
}

impl Default for DragManager {
    fn default() -> Self { Self::new(EditorSettings::default()) }
}

impl DragManager {
    pub fn new(config: EditorSettings) -> Self {
        let mut manager = Self { dragged: None, config: EditorSettings::default() };
        manager.update_config(config);
        manager
    }

    pub fn begin(&mut self, source: NodeId) { self.dragged = Some(source); }

    pub fn reset(&mut self) { self.dragged = None; }

    pub fn dragged(&self) -> Option<NodeId> { self.dragged }

    pub fn update_config(&mut self, config: EditorSettings) {
        let defaults = EditorSettings::default();
        self.config.drop_margin =
            if config.drop_margin < 0.0 { defaults.drop_margin } else { config.drop_margin };
        self.config.scroll_margin =
            if config.scroll_margin < 0.0 { defaults.scroll_margin } else { config.scroll_margin };
    }

    /// Which part of `bounds` the pointer at `y` falls in. The top margin is
    /// checked first, so rows shorter than two margins never accept `Into`.
    pub fn classify(&self, bounds: Bounds, y: f64) -> DropZone {
        if y < bounds.top + self.config.drop_margin {
            DropZone::Before
        } else if y > bounds.bottom() - self.config.drop_margin {
            DropZone::After
        } else {
            DropZone::Into
        }
    }

    /// Whether a drop on `target` would be accepted. Empty space always is.
    pub fn accepts(&self, tree: &ItemTree, target: Option<NodeId>) -> bool {
        match (self.dragged, target) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(source), Some(target)) => !tree.is_within(target, source),
        }
    }

    /// Auto-scroll request while hovering a valid target near the edge of a
    /// viewport `viewport_height` pixels tall.
    pub fn scroll_hint(
        &self,
        tree: &ItemTree,
        target: Option<NodeId>,
        y: f64,
        viewport_height: f64,
    ) -> Option<ScrollHint> {
        if target.is_none() || !self.accepts(tree, target) {
            return None;
        }
        if y < self.config.scroll_margin {
            Some(ScrollHint::Up)
        } else if y > viewport_height - self.config.scroll_margin {
            Some(ScrollHint::Down)
        } else {
            None
        }
    }

    /// Finishes the drag. `target` is the row under the pointer, if any. The
    /// drag ends whether or not the drop is accepted; a rejected drop leaves
    /// the tree as it was.
    pub fn drop(
        &mut self,
        tree: &mut ItemTree,
        target: Option<(NodeId, Bounds)>,
        y: f64,
    ) -> Result<DropOutcome, DropError> {
        let node = self.dragged.take().ok_or(DropError::NotDragging)?;

        let Some((target, bounds)) = target else {
            tree.move_node(node, tree.root(), usize::MAX)?;
            debug!(?node, "Dropped on empty space; moved to end of root");
            return Ok(DropOutcome::ToRootEnd { node });
        };

        if tree.is_within(target, node) {
            return Err(TreeError::CyclicMove { node, target }.into());
        }

        let zone = self.classify(bounds, y);
        let outcome = match zone {
            DropZone::Before => {
                tree.move_beside(node, target, false)?;
                DropOutcome::Before { node, target }
            }
            DropZone::After => {
                tree.move_beside(node, target, true)?;
                DropOutcome::After { node, target }
            }
            DropZone::Into => {
                tree.move_into(node, target)?;
                DropOutcome::Into { node, target }
            }
        };
        debug!(?node, ?target, ?zone, "Dropped");
        Ok(outcome)
    }
}
