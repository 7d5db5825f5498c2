//! Rebuilds a navigation stack against a tree whose node ids changed.
//!
//! Matching is by name along the old path, taking the first child with a
//! matching name at each level. With duplicate sibling names this may land in
//! a different branch than before; that is accepted.

use tracing::debug;

use crate::model::navigation::NavigationStack;
use crate::model::tree::ItemTree;

/// Follows `path` (bottom to top) from the root of `tree` for as long as each
/// name resolves to a folder. The result is the longest such prefix.
pub fn reconcile<S: AsRef<str>>(path: &[S], tree: &ItemTree) -> NavigationStack {
    let mut nav = NavigationStack::new();
    let mut parent = tree.root();
    for name in path {
        let name = name.as_ref();
        let Some(child) = tree.find_child(parent, name) else {
            debug!(name, depth = nav.depth(), "Navigation path no longer resolves");
            break;
        };
        if !tree.is_container(child) {
            debug!(name, depth = nav.depth(), "Navigation path hits a non-folder");
            break;
        }
        nav.push_unchecked(child);
        parent = child;
    }
    nav
}

impl NavigationStack {
    /// Re-derives this stack, which points into `old`, against `new`.
    pub fn reconciled(&self, old: &ItemTree, new: &ItemTree) -> NavigationStack {
        reconcile(&self.path_names(old), new)
    }
}
