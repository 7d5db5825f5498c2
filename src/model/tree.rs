use std::ops::{Index, IndexMut};

use slotmap::SlotMap;
use tracing::trace;

use crate::model::item::Item;

slotmap::new_key_type! {
    /// Represents a node somewhere in the tree. Stays valid across moves.
    pub struct NodeId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    #[error("node {0:?} is not attached to a parent")]
    NotAttached(NodeId),
    #[error("node {0:?} is not a container")]
    NotAContainer(NodeId),
    #[error("moving {node:?} under {target:?} would make it its own ancestor")]
    CyclicMove { node: NodeId, target: NodeId },
    #[error("node {0:?} is still attached; detach it first")]
    AlreadyAttached(NodeId),
    #[error("node {0:?} does not exist")]
    NodeNotFound(NodeId),
    #[error("the root node cannot be moved or removed")]
    RootImmovable,
}

/// Map that holds the structure of the tree.
pub struct NodeMap {
    map: SlotMap<NodeId, Node>,
}

impl NodeMap {
    fn new() -> NodeMap { NodeMap { map: SlotMap::default() } }

    pub fn contains(&self, id: NodeId) -> bool { self.map.contains_key(id) }

    pub fn len(&self) -> usize { self.map.len() }
}

impl Index<NodeId> for NodeMap {
    type Output = Node;

    fn index(&self, index: NodeId) -> &Self::Output { &self.map[index] }
}

impl IndexMut<NodeId> for NodeMap {
    fn index_mut(&mut self, index: NodeId) -> &mut Self::Output { &mut self.map[index] }
}

#[derive(Debug, Clone)]
pub struct Node {
    parent: Option<NodeId>,
    prev_sibling: Option<NodeId>,
    next_sibling: Option<NodeId>,
    first_child: Option<NodeId>,
    last_child: Option<NodeId>,
    pub item: Item,
}

impl Node {
    fn new(item: Item) -> Node {
        Node {
            parent: None,
            prev_sibling: None,
            next_sibling: None,
            first_child: None,
            last_child: None,
            item,
        }
    }
}

/// The item hierarchy. One root container owns everything; nodes that have
/// been detached and not yet reattached are the only other parentless nodes.
pub struct ItemTree {
    pub(crate) map: NodeMap,
    root: NodeId,
}

impl ItemTree {
    pub fn new(root: Item) -> ItemTree {
        let mut map = NodeMap::new();
        let root = map.map.insert(Node::new(root));
        ItemTree { map, root }
    }

    pub fn root(&self) -> NodeId { self.root }

    pub fn contains(&self, id: NodeId) -> bool { self.map.contains(id) }

    /// Number of nodes including the root.
    pub fn len(&self) -> usize { self.map.len() }

    pub fn item(&self, id: NodeId) -> Result<&Item, TreeError> {
        self.map.map.get(id).map(|n| &n.item).ok_or(TreeError::NodeNotFound(id))
    }

    pub fn item_mut(&mut self, id: NodeId) -> Result<&mut Item, TreeError> {
        self.map.map.get_mut(id).map(|n| &mut n.item).ok_or(TreeError::NodeNotFound(id))
    }

    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.map.map.get(id).map(|n| n.item.name.as_str())
    }

    pub fn is_container(&self, id: NodeId) -> bool {
        self.map.map.get(id).is_some_and(|n| n.item.is_container())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> { id.parent(&self.map) }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.children(&self.map)
    }

    pub fn children_rev(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.children_rev(&self.map)
    }

    pub fn child_count(&self, id: NodeId) -> usize { self.children(id).count() }

    pub fn child_at(&self, id: NodeId, index: usize) -> Option<NodeId> {
        self.children(id).nth(index)
    }

    /// Position of `id` within its parent's children.
    pub fn index_of(&self, id: NodeId) -> Result<usize, TreeError> {
        let parent = self.parent(id).ok_or(TreeError::NotAttached(id))?;
        self.children(parent).position(|c| c == id).ok_or(TreeError::NotAttached(id))
    }

    /// Returns an iterator over all ancestors of the node, including itself.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.ancestors(&self.map)
    }

    pub fn traverse_preorder(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.traverse_preorder(&self.map)
    }

    pub fn traverse_postorder(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.traverse_postorder(&self.map)
    }

    /// True if `node` is `ancestor` or lies somewhere below it.
    pub fn is_within(&self, node: NodeId, ancestor: NodeId) -> bool {
        self.ancestors(node).any(|a| a == ancestor)
    }

    /// Creates a detached node. It must be attached or removed by the caller.
    pub fn create(&mut self, item: Item) -> NodeId { self.map.map.insert(Node::new(item)) }

    /// Creates a node and appends it to `parent`'s children.
    pub fn push_back(&mut self, parent: NodeId, item: Item) -> Result<NodeId, TreeError> {
        let index = self.child_count(parent);
        self.insert(parent, index, item)
    }

    pub fn insert(&mut self, parent: NodeId, index: usize, item: Item) -> Result<NodeId, TreeError> {
        if !self.is_container(parent) {
            return Err(self.missing_or(parent, TreeError::NotAContainer(parent)));
        }
        let id = self.create(item);
        self.link_at(id, parent, index);
        Ok(id)
    }

    /// Removes `id` from its parent's children. The node and its subtree stay
    /// in the arena with the same ids.
    pub fn detach(&mut self, id: NodeId) -> Result<(), TreeError> {
        if !self.contains(id) {
            return Err(TreeError::NodeNotFound(id));
        }
        if id == self.root || self.parent(id).is_none() {
            return Err(TreeError::NotAttached(id));
        }
        trace!(?id, "detach");
        self.map.unlink(id);
        Ok(())
    }

    /// Inserts a detached node as child number `index` of `container`.
    /// Indices past the end append.
    pub fn attach(&mut self, id: NodeId, container: NodeId, index: usize) -> Result<(), TreeError> {
        self.check_attach(id, container, true)?;
        self.link_at(id, container, index);
        Ok(())
    }

    /// Like [`ItemTree::attach`] but accepts any node kind as the new parent.
    /// Used by drag and drop, which lets items be dropped onto non-folders.
    pub fn attach_any(
        &mut self,
        id: NodeId,
        parent: NodeId,
        index: usize,
    ) -> Result<(), TreeError> {
        self.check_attach(id, parent, false)?;
        self.link_at(id, parent, index);
        Ok(())
    }

    /// Detaches `id` and attaches it under `container` at `index`, where
    /// `index` is interpreted after the detach. Fails without changing
    /// anything if either half would fail.
    pub fn move_node(&mut self, id: NodeId, container: NodeId, index: usize) -> Result<(), TreeError> {
        self.check_move(id, container, true)?;
        self.detach(id)?;
        self.link_at(id, container, index);
        Ok(())
    }

    /// Moves `id` next to `sibling`, after computing `sibling`'s index once
    /// `id` has left its old position.
    pub fn move_beside(&mut self, id: NodeId, sibling: NodeId, after: bool) -> Result<(), TreeError> {
        let parent = self.parent(sibling).ok_or(TreeError::NotAttached(sibling))?;
        if id == sibling {
            return Err(TreeError::CyclicMove { node: id, target: sibling });
        }
        self.check_move(id, parent, false)?;
        self.detach(id)?;
        let index = self.index_of(sibling)? + usize::from(after);
        self.link_at(id, parent, index);
        Ok(())
    }

    /// Moves `id` to the end of `parent`'s children, whatever `parent`'s kind.
    pub fn move_into(&mut self, id: NodeId, parent: NodeId) -> Result<(), TreeError> {
        self.check_move(id, parent, false)?;
        self.detach(id)?;
        let index = self.child_count(parent);
        self.link_at(id, parent, index);
        Ok(())
    }

    /// Deletes `id` and everything below it.
    pub fn remove(&mut self, id: NodeId) -> Result<Item, TreeError> {
        if id == self.root {
            return Err(TreeError::RootImmovable);
        }
        if !self.contains(id) {
            return Err(TreeError::NodeNotFound(id));
        }
        self.map.unlink(id);
        let doomed: Vec<NodeId> = self.traverse_postorder(id).collect();
        let mut removed = None;
        for node in doomed {
            if let Some(n) = self.map.map.remove(node) {
                removed = Some(n.item);
            }
        }
        // Postorder ends at `id` itself.
        removed.ok_or(TreeError::NodeNotFound(id))
    }

    /// Creates an independent copy of the whole tree in a fresh arena.
    /// Ids in the copy are unrelated to ids in `self`.
    pub fn deep_copy(&self) -> Result<ItemTree, TreeError> {
        let mut copy = ItemTree::new(self.item(self.root)?.clone());
        let mut stack = vec![(self.root, copy.root)];
        for old in self.traverse_preorder(self.root).skip(1) {
            while old.parent(&self.map) != stack.last().map(|(oldp, _newp)| *oldp) {
                if stack.pop().is_none() {
                    return Err(TreeError::NotAttached(old));
                }
            }
            let Some(&(_, parent)) = stack.last() else {
                return Err(TreeError::NotAttached(old));
            };
            let new = copy.create(self.item(old)?.clone());
            let index = copy.child_count(parent);
            copy.link_at(new, parent, index);
            stack.push((old, new));
        }
        Ok(copy)
    }

    /// First child of `parent` (in order) with the given name.
    pub fn find_child(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.children(parent).find(|&c| self.name(c) == Some(name))
    }

    pub fn draw_tree(&self) -> String {
        let tree = self.get_ascii_tree(self.root);
        let mut out = String::new();
        // Writing into a String cannot fail.
        _ = ascii_tree::write_tree(&mut out, &tree);
        out
    }

    fn get_ascii_tree(&self, node: NodeId) -> ascii_tree::Tree {
        let desc = match self.map.map.get(node) {
            Some(n) => match &n.item.shortcut {
                Some(hk) => format!("{} [{}] ({})", n.item.name, n.item.tag(), hk),
                None => format!("{} [{}]", n.item.name, n.item.tag()),
            },
            None => format!("{node:?}"),
        };
        let children: Vec<_> = self.children(node).map(|c| self.get_ascii_tree(c)).collect();
        if children.is_empty() {
            ascii_tree::Tree::Leaf(vec![desc])
        } else {
            ascii_tree::Tree::Node(desc, children)
        }
    }

    fn check_attach(&self, id: NodeId, parent: NodeId, require_container: bool) -> Result<(), TreeError> {
        if !self.contains(id) {
            return Err(TreeError::NodeNotFound(id));
        }
        if id == self.root {
            return Err(TreeError::RootImmovable);
        }
        if self.parent(id).is_some() {
            return Err(TreeError::AlreadyAttached(id));
        }
        self.check_target(id, parent, require_container)
    }

    fn check_move(&self, id: NodeId, parent: NodeId, require_container: bool) -> Result<(), TreeError> {
        if !self.contains(id) {
            return Err(TreeError::NodeNotFound(id));
        }
        if id == self.root {
            return Err(TreeError::RootImmovable);
        }
        if self.parent(id).is_none() {
            return Err(TreeError::NotAttached(id));
        }
        self.check_target(id, parent, require_container)
    }

    fn check_target(&self, id: NodeId, parent: NodeId, require_container: bool) -> Result<(), TreeError> {
        if !self.contains(parent) {
            return Err(TreeError::NodeNotFound(parent));
        }
        if self.is_within(parent, id) {
            return Err(TreeError::CyclicMove { node: id, target: parent });
        }
        if require_container && !self.is_container(parent) {
            return Err(TreeError::NotAContainer(parent));
        }
        // A detached subtree is not reachable from the root; attaching under
        // it would leave `id` unreachable as well.
        if !self.is_within(parent, self.root) {
            return Err(TreeError::NotAttached(parent));
        }
        Ok(())
    }

    fn missing_or(&self, id: NodeId, err: TreeError) -> TreeError {
        if self.contains(id) { err } else { TreeError::NodeNotFound(id) }
    }

    fn link_at(&mut self, id: NodeId, parent: NodeId, index: usize) {
        match self.child_at(parent, index) {
            Some(sibling) => id.link_before(sibling, &mut self.map),
            None => id.link_under_back(parent, &mut self.map),
        }
    }
}

impl PartialEq for ItemTree {
    /// Structural equality: same items in the same shape, regardless of ids.
    fn eq(&self, other: &Self) -> bool {
        let shape = |t: &ItemTree| -> Vec<(usize, Item)> {
            t.traverse_preorder(t.root)
                .map(|n| (t.ancestors(n).count(), t.map[n].item.clone()))
                .collect()
        };
        shape(self) == shape(other)
    }
}

impl std::fmt::Debug for ItemTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.draw_tree())
    }
}

impl NodeId {
    pub fn parent(self, map: &NodeMap) -> Option<NodeId> { map.map.get(self).and_then(|n| n.parent) }

    pub fn children(self, map: &NodeMap) -> impl Iterator<Item = NodeId> + '_ {
        ChildIterator {
            cur: map.map.get(self).and_then(|n| n.first_child),
            map,
        }
    }

    pub fn children_rev(self, map: &NodeMap) -> impl Iterator<Item = NodeId> + '_ {
        ChildRevIterator {
            cur: map.map.get(self).and_then(|n| n.last_child),
            map,
        }
    }

    pub fn traverse_postorder(self, map: &NodeMap) -> impl Iterator<Item = NodeId> + '_ {
        PostorderTraversal::new(map, self)
    }

    pub fn traverse_preorder(self, map: &NodeMap) -> impl Iterator<Item = NodeId> + '_ {
        PreorderTraversal::new(map, self)
    }

    /// Returns an iterator over all ancestors of the current node, including itself.
    pub fn ancestors(self, map: &NodeMap) -> impl Iterator<Item = NodeId> + '_ {
        let mut next = Some(self).filter(|n| map.contains(*n));
        std::iter::from_fn(move || {
            let node = next;
            next = node.and_then(|n| map.map.get(n).and_then(|nd| nd.parent));
            node
        })
    }

    pub fn next_sibling(self, map: &NodeMap) -> Option<NodeId> {
        map.map.get(self).and_then(|n| n.next_sibling)
    }

    pub fn prev_sibling(self, map: &NodeMap) -> Option<NodeId> {
        map.map.get(self).and_then(|n| n.prev_sibling)
    }

    pub fn first_child(self, map: &NodeMap) -> Option<NodeId> {
        map.map.get(self).and_then(|n| n.first_child)
    }

    pub fn last_child(self, map: &NodeMap) -> Option<NodeId> {
        map.map.get(self).and_then(|n| n.last_child)
    }

    fn link_under_back(self, parent: NodeId, map: &mut NodeMap) {
        if self == parent || !map.contains(self) || !map.contains(parent) {
            return;
        }

        let prev_child = {
            let parent_node = &mut map[parent];
            parent_node.first_child.get_or_insert(self);
            parent_node.last_child.replace(self)
        };
        map[self].parent = Some(parent);

        if let Some(prev) = prev_child {
            self.hlink_after(prev, map);
        }
    }

    fn link_before(self, next: NodeId, map: &mut NodeMap) {
        let Some(parent) = next.parent(map) else {
            return;
        };
        let Some(self_node) = map.map.get_mut(self) else {
            return;
        };
        self_node.parent = Some(parent);
        let parent_node = &mut map[parent];
        debug_assert!(parent_node.first_child.is_some());
        if parent_node.first_child == Some(next) {
            parent_node.first_child.replace(self);
        }
        self.hlink_before(next, map);
    }

    fn hlink_after(self, prev: NodeId, map: &mut NodeMap) {
        if self == prev || !map.contains(self) || !map.contains(prev) {
            return;
        }

        debug_assert_eq!(map[self].prev_sibling, None);
        map[self].prev_sibling.replace(prev);

        let next = map[prev].next_sibling.replace(self);
        if let Some(next) = next {
            map[next].prev_sibling.replace(self);
            map[self].next_sibling.replace(next);
        }
    }

    fn hlink_before(self, next: NodeId, map: &mut NodeMap) {
        if self == next || !map.contains(self) || !map.contains(next) {
            return;
        }

        debug_assert_eq!(map[self].next_sibling, None);
        map[self].next_sibling.replace(next);

        let prev = map[next].prev_sibling.replace(self);
        if let Some(prev) = prev {
            map[prev].next_sibling.replace(self);
            map[self].prev_sibling.replace(prev);
        }
    }
}

impl NodeMap {
    fn unlink(&mut self, id: NodeId) {
        let Some((prev_sibling, next_sibling, parent)) =
            self.map.get(id).map(|n| (n.prev_sibling, n.next_sibling, n.parent))
        else {
            return;
        };
        if let Some(prev) = prev_sibling {
            self[prev].next_sibling = next_sibling;
        }
        if let Some(next) = next_sibling {
            self[next].prev_sibling = prev_sibling;
        }
        if let Some(parent) = parent {
            let parent_node = &mut self[parent];
            if parent_node.first_child == Some(id) {
                parent_node.first_child = next_sibling;
            }
            if parent_node.last_child == Some(id) {
                parent_node.last_child = prev_sibling;
            }
        }

        let node = &mut self[id];
        node.prev_sibling = None;
        node.next_sibling = None;
        node.parent = None;
    }
}

struct ChildIterator<'a> {
    cur: Option<NodeId>,
    map: &'a NodeMap,
}

impl<'a> Iterator for ChildIterator<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cur?;
        self.cur = id.next_sibling(self.map);
        Some(id)
    }
}

struct ChildRevIterator<'a> {
    cur: Option<NodeId>,
    map: &'a NodeMap,
}

impl<'a> Iterator for ChildRevIterator<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cur?;
        self.cur = id.prev_sibling(self.map);
        Some(id)
    }
}

struct PostorderTraversal<'a> {
    cur: Option<NodeId>,
    top: NodeId,
    map: &'a NodeMap,
}

impl<'a> PostorderTraversal<'a> {
    fn new(map: &'a NodeMap, root: NodeId) -> Self {
        Self {
            top: root,
            cur: Some(root).filter(|r| map.contains(*r)).map(|r| Self::descend_left(r, map)),
            map,
        }
    }

    fn descend_left(mut node: NodeId, map: &'a NodeMap) -> NodeId {
        while let Some(child) = node.first_child(map) {
            node = child;
        }
        node
    }
}

impl<'a> Iterator for PostorderTraversal<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.cur?;
        self.cur = None;
        if node != self.top {
            if let Some(next) = node.next_sibling(self.map) {
                self.cur = Some(Self::descend_left(next, self.map));
            } else {
                self.cur = node.parent(self.map);
            }
        }
        Some(node)
    }
}

struct PreorderTraversal<'a> {
    top: NodeId,
    cur: Option<NodeId>,
    map: &'a NodeMap,
}

impl<'a> PreorderTraversal<'a> {
    fn new(map: &'a NodeMap, root: NodeId) -> Self {
        Self {
            top: root,
            cur: Some(root).filter(|r| map.contains(*r)),
            map,
        }
    }
}

impl<'a> Iterator for PreorderTraversal<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.cur?;
        if let Some(child) = node.first_child(self.map) {
            self.cur = Some(child);
        } else {
            self.cur = None;
            for ancestor in node.ancestors(self.map) {
                if ancestor == self.top {
                    break;
                }
                if let Some(sibling) = ancestor.next_sibling(self.map) {
                    self.cur = Some(sibling);
                    break;
                }
            }
        }
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    /// A tree with the following structure:
    /// ```text
    ///          __root__
    ///         /   |    \
    ///   child1  child2  child3
    ///   (app)   (folder) (folder)
    ///             |
    ///            gc1
    /// ```
    struct TestTree {
        tree: ItemTree,
        root: NodeId,
        child1: NodeId,
        child2: NodeId,
        child3: NodeId,
        gc1: NodeId,
    }

    impl TestTree {
        #[rustfmt::skip]
        fn new() -> Self {
            let mut tree = ItemTree::new(Item::folder("root"));
            let root = tree.root();
            let child1 = tree.push_back(root, Item::app("child1", "/bin/true")).unwrap();
            let child2 = tree.push_back(root, Item::folder("child2")).unwrap();
            let child3 = tree.push_back(root, Item::folder("child3")).unwrap();
            let gc1 = tree.push_back(child2, Item::app("gc1", "/bin/false")).unwrap();
            TestTree { tree, root, child1, child2, child3, gc1 }
        }

        fn get_children(&self, node: NodeId) -> Vec<NodeId> { self.tree.children(node).collect() }

        fn get_children_rev(&self, node: NodeId) -> Vec<NodeId> {
            let mut children: Vec<_> = self.tree.children_rev(node).collect();
            children.reverse();
            children
        }

        #[track_caller]
        fn assert_children_are<const N: usize>(&self, children: [NodeId; N], parent: NodeId) {
            let expected = children.to_vec();
            assert_eq!(expected, self.get_children(parent), "children of {parent:?}");
            assert_eq!(expected, self.get_children_rev(parent), "reverse children of {parent:?}");
            for child in children {
                assert_eq!(Some(parent), self.tree.parent(child));
            }
        }
    }

    #[test]
    fn iterators() {
        let t = TestTree::new();
        t.assert_children_are([t.child1, t.child2, t.child3], t.root);
        t.assert_children_are([t.gc1], t.child2);
        assert_eq!(
            vec![t.root, t.child1, t.child2, t.gc1, t.child3],
            t.tree.traverse_preorder(t.root).collect::<Vec<_>>()
        );
        assert_eq!(
            vec![t.child1, t.gc1, t.child2, t.child3, t.root],
            t.tree.traverse_postorder(t.root).collect::<Vec<_>>()
        );
        assert_eq!(
            vec![t.gc1, t.child2, t.root],
            t.tree.ancestors(t.gc1).collect::<Vec<_>>()
        );
    }

    #[test]
    fn detach_then_attach_preserves_identity() {
        let mut t = TestTree::new();
        t.tree.detach(t.child1).unwrap();
        t.assert_children_are([t.child2, t.child3], t.root);
        assert_eq!(None, t.tree.parent(t.child1));

        t.tree.attach(t.child1, t.child3, 0).unwrap();
        t.assert_children_are([t.child1], t.child3);
        assert_eq!(0, t.tree.index_of(t.child1).unwrap());
        assert_eq!("child1", t.tree.item(t.child1).unwrap().name);

        t.tree.detach(t.child1).unwrap();
        t.tree.attach(t.child1, t.child2, 1).unwrap();
        t.assert_children_are([t.gc1, t.child1], t.child2);

        t.tree.detach(t.child1).unwrap();
        t.tree.attach(t.child1, t.root, 1).unwrap();
        t.assert_children_are([t.child2, t.child1, t.child3], t.root);
    }

    #[test]
    fn attach_clamps_index_past_the_end() {
        let mut t = TestTree::new();
        t.tree.detach(t.child1).unwrap();
        t.tree.attach(t.child1, t.root, 99).unwrap();
        t.assert_children_are([t.child2, t.child3, t.child1], t.root);
    }

    #[test]
    fn detach_fails_for_root_and_detached_nodes() {
        let mut t = TestTree::new();
        assert_eq!(Err(TreeError::NotAttached(t.root)), t.tree.detach(t.root));
        t.tree.detach(t.gc1).unwrap();
        assert_eq!(Err(TreeError::NotAttached(t.gc1)), t.tree.detach(t.gc1));
    }

    #[test]
    fn attach_rejects_non_containers() {
        let mut t = TestTree::new();
        t.tree.detach(t.gc1).unwrap();
        assert_eq!(
            Err(TreeError::NotAContainer(t.child1)),
            t.tree.attach(t.gc1, t.child1, 0)
        );
        t.assert_children_are([], t.child1);
        t.tree.attach_any(t.gc1, t.child1, 0).unwrap();
        t.assert_children_are([t.gc1], t.child1);
    }

    #[test]
    fn attach_rejects_cycles() {
        let mut t = TestTree::new();
        t.tree.detach(t.child2).unwrap();
        assert_eq!(
            Err(TreeError::CyclicMove { node: t.child2, target: t.child2 }),
            t.tree.attach(t.child2, t.child2, 0)
        );
        // A detached subtree is still a subtree: gc1 remains below child2.
        let inner = t.tree.push_back(t.child2, Item::folder("inner")).unwrap();
        assert_eq!(
            Err(TreeError::CyclicMove { node: t.child2, target: inner }),
            t.tree.attach(t.child2, inner, 0)
        );
        t.tree.attach(t.child2, t.root, 1).unwrap();
        t.assert_children_are([t.child1, t.child2, t.child3], t.root);
    }

    #[test]
    fn cycles_are_reported_before_container_checks() {
        let mut t = TestTree::new();
        t.tree.detach(t.child1).unwrap();
        assert_eq!(
            Err(TreeError::CyclicMove { node: t.child1, target: t.child1 }),
            t.tree.attach(t.child1, t.child1, 0)
        );
        // gc1 is an app below child2.
        assert_eq!(
            Err(TreeError::CyclicMove { node: t.child2, target: t.gc1 }),
            t.tree.move_node(t.child2, t.gc1, 0)
        );
        t.tree.detach(t.child2).unwrap();
        assert_eq!(
            Err(TreeError::CyclicMove { node: t.child2, target: t.gc1 }),
            t.tree.attach(t.child2, t.gc1, 0)
        );
    }

    #[test]
    fn move_node_rejects_cycles_without_detaching() {
        let mut t = TestTree::new();
        let inner = t.tree.push_back(t.child2, Item::folder("inner")).unwrap();
        assert_eq!(
            Err(TreeError::CyclicMove { node: t.child2, target: inner }),
            t.tree.move_node(t.child2, inner, 0)
        );
        t.assert_children_are([t.child1, t.child2, t.child3], t.root);
        t.assert_children_are([t.gc1, inner], t.child2);
    }

    #[test]
    fn attach_requires_a_detached_node() {
        let mut t = TestTree::new();
        assert_eq!(
            Err(TreeError::AlreadyAttached(t.child1)),
            t.tree.attach(t.child1, t.child3, 0)
        );
    }

    #[test]
    fn move_beside_recomputes_index_after_detach() {
        let mut t = TestTree::new();
        // child1 sits before child3, so child3's index drops by one once
        // child1 leaves.
        t.tree.move_beside(t.child1, t.child3, false).unwrap();
        t.assert_children_are([t.child2, t.child1, t.child3], t.root);
        t.tree.move_beside(t.child1, t.child3, true).unwrap();
        t.assert_children_are([t.child2, t.child3, t.child1], t.root);
        t.tree.move_beside(t.child1, t.gc1, false).unwrap();
        t.assert_children_are([t.child1, t.gc1], t.child2);
    }

    #[test]
    fn remove_deletes_subtree() {
        let mut t = TestTree::new();
        let removed = t.tree.remove(t.child2).unwrap();
        assert_eq!("child2", removed.name);
        t.assert_children_are([t.child1, t.child3], t.root);
        assert!(!t.tree.contains(t.child2));
        assert!(!t.tree.contains(t.gc1));
        assert_eq!(Err(TreeError::RootImmovable), t.tree.remove(t.root));
    }

    #[test]
    fn deep_copy_is_structurally_equal_and_independent() {
        let t = TestTree::new();
        let mut copy = t.tree.deep_copy().unwrap();
        assert_eq!(t.tree, copy);
        assert_eq!(t.tree.len(), copy.len());

        let copied_child2 = copy.child_at(copy.root(), 1).unwrap();
        copy.item_mut(copied_child2).unwrap().name = "renamed".into();
        assert_eq!("child2", t.tree.item(t.child2).unwrap().name);
        assert_ne!(t.tree, copy);
    }

    #[test]
    fn draw_tree_lists_items() {
        let t = TestTree::new();
        let drawn = t.tree.draw_tree();
        assert!(drawn.contains("root [folder]"));
        assert!(drawn.contains("gc1 [app]"));
    }
}
