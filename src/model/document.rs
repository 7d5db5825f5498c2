//! Nested, id-free form of an [`ItemTree`] used for persistence.

use serde::{Deserialize, Serialize};

use crate::model::item::{Item, LaunchSpec};
use crate::model::tree::{ItemTree, NodeId, TreeError};
use crate::sys::hotkey::{Hotkey, KeyCode};

pub const DOCUMENT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ItemDocument {
    #[serde(default = "current_version")]
    pub version: u32,
    pub root: ItemNode,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ItemNode {
    pub item: Item,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ItemNode>,
}

fn current_version() -> u32 { DOCUMENT_VERSION }

impl ItemNode {
    pub fn leaf(item: Item) -> Self { ItemNode { item, children: Vec::new() } }

    pub fn with_children(item: Item, children: Vec<ItemNode>) -> Self { ItemNode { item, children } }
}

impl ItemTree {
    pub fn to_document(&self) -> ItemDocument {
        ItemDocument {
            version: DOCUMENT_VERSION,
            root: self.node_to_document(self.root()),
        }
    }

    fn node_to_document(&self, id: NodeId) -> ItemNode {
        ItemNode {
            item: self.map[id].item.clone(),
            children: self.children(id).map(|c| self.node_to_document(c)).collect(),
        }
    }

    pub fn from_document(doc: ItemDocument) -> Result<ItemTree, TreeError> {
        let ItemNode { item, children } = doc.root;
        let mut tree = ItemTree::new(item);
        if !tree.is_container(tree.root()) {
            return Err(TreeError::NotAContainer(tree.root()));
        }
        let mut pending: Vec<(NodeId, Vec<ItemNode>)> = vec![(tree.root(), children)];
        while let Some((parent, children)) = pending.pop() {
            for child in children {
                let id = tree.create(child.item);
                tree.attach_any(id, parent, usize::MAX)?;
                if !child.children.is_empty() {
                    pending.push((id, child.children));
                }
            }
        }
        Ok(tree)
    }
}

/// The tree used when nothing has been saved yet.
pub fn default_document() -> ItemDocument {
    let with_key = |item: Item, code| item.with_shortcut(Hotkey::key(code));
    let system_info = Item::command("System Info", LaunchSpec::new("uname").with_args("-a"));

    ItemDocument {
        version: DOCUMENT_VERSION,
        root: ItemNode::with_children(Item::folder("Root"), vec![
            ItemNode::leaf(with_key(Item::app("Notepad", "notepad"), KeyCode::KeyN)),
            ItemNode::leaf(with_key(Item::app("Calculator", "calc"), KeyCode::KeyC)),
            ItemNode::leaf(with_key(Item::app("Command Prompt", "cmd"), KeyCode::KeyD)),
            ItemNode::with_children(Item::folder("Utilities"), vec![
                ItemNode::leaf(with_key(Item::app("Paint", "mspaint"), KeyCode::KeyP)),
                ItemNode::leaf(with_key(Item::app("WordPad", "write"), KeyCode::KeyW)),
                ItemNode::leaf(with_key(system_info, KeyCode::KeyI)),
            ]),
        ]),
    }
}

pub fn default_tree() -> ItemTree {
    // The default document only contains folders as parents.
    match ItemTree::from_document(default_document()) {
        Ok(tree) => tree,
        Err(_) => ItemTree::new(Item::folder("Root")),
    }
}
