use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::model::tree::{ItemTree, NodeId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum NavError {
    #[error("{0:?} is not a folder inside the current view")]
    InvalidNavigation(NodeId),
    #[error("already at the root view")]
    AtRoot,
}

/// Path of open folders from the root down to the one in view. Each entry is
/// a child of the entry below it; the bottom entry is a child of the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationStack {
    stack: Vec<NodeId>,
}

impl NavigationStack {
    pub fn new() -> Self { Self::default() }

    /// The container in view: the top of the stack, or the root when empty.
    pub fn current(&self, tree: &ItemTree) -> NodeId {
        self.stack.last().copied().unwrap_or(tree.root())
    }

    pub fn enter(&mut self, tree: &ItemTree, container: NodeId) -> Result<(), NavError> {
        let current = self.current(tree);
        if tree.parent(container) != Some(current) || !tree.is_container(container) {
            return Err(NavError::InvalidNavigation(container));
        }
        trace!(?container, depth = self.stack.len() + 1, "enter");
        self.stack.push(container);
        Ok(())
    }

    pub fn leave(&mut self) -> Result<NodeId, NavError> {
        let left = self.stack.pop().ok_or(NavError::AtRoot)?;
        trace!(?left, depth = self.stack.len(), "leave");
        Ok(left)
    }

    pub fn is_empty(&self) -> bool { self.stack.is_empty() }

    pub fn depth(&self) -> usize { self.stack.len() }

    pub fn clear(&mut self) { self.stack.clear(); }

    /// Entries from the bottom (nearest the root) to the top.
    pub fn entries(&self) -> &[NodeId] { &self.stack }

    /// Names along the path, bottom to top. Entries no longer in `tree` are
    /// skipped.
    pub fn path_names(&self, tree: &ItemTree) -> Vec<String> {
        self.stack.iter().filter_map(|&id| tree.name(id)).map(str::to_owned).collect()
    }

    pub(crate) fn push_unchecked(&mut self, container: NodeId) { self.stack.push(container); }
}
