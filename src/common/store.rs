//! Persistence for the item tree.

use std::path::PathBuf;

use ron::ser::PrettyConfig;
use tracing::{info, warn};

use crate::model::document::{ItemDocument, default_tree};
use crate::model::tree::ItemTree;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("loading {}: {reason}", path.display())]
    Load { path: PathBuf, reason: String },
    #[error("saving {}: {reason}", path.display())]
    Save { path: PathBuf, reason: String },
}

pub trait TreeStore {
    /// Reads the saved tree. `Ok(None)` means nothing has been saved yet.
    fn load_tree(&mut self) -> Result<Option<ItemTree>, StoreError>;

    fn save_tree(&mut self, tree: &ItemTree) -> Result<(), StoreError>;
}

/// Stores the tree as a RON [`ItemDocument`].
#[derive(Debug, Clone)]
pub struct RonTreeStore {
    path: PathBuf,
}

impl RonTreeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self { RonTreeStore { path: path.into() } }

    pub fn path(&self) -> &PathBuf { &self.path }

    fn load_err(&self, reason: impl ToString) -> StoreError {
        StoreError::Load { path: self.path.clone(), reason: reason.to_string() }
    }

    fn save_err(&self, reason: impl ToString) -> StoreError {
        StoreError::Save { path: self.path.clone(), reason: reason.to_string() }
    }
}

impl TreeStore for RonTreeStore {
    fn load_tree(&mut self) -> Result<Option<ItemTree>, StoreError> {
        let buf = match std::fs::read_to_string(&self.path) {
            Ok(buf) => buf,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.load_err(e)),
        };
        let doc: ItemDocument = ron::from_str(&buf).map_err(|e| self.load_err(e))?;
        ItemTree::from_document(doc).map(Some).map_err(|e| self.load_err(e))
    }

    fn save_tree(&mut self, tree: &ItemTree) -> Result<(), StoreError> {
        let buf = ron::ser::to_string_pretty(&tree.to_document(), PrettyConfig::default())
            .map_err(|e| self.save_err(e))?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| self.save_err(e))?;
        }
        std::fs::write(&self.path, buf).map_err(|e| self.save_err(e))
    }
}

/// Loads the saved tree. With nothing saved the default tree is written out
/// and returned; an unreadable file is left alone and the default is used
/// for this run only.
pub fn load_or_default(store: &mut dyn TreeStore) -> ItemTree {
    match store.load_tree() {
        Ok(Some(tree)) => tree,
        Ok(None) => {
            let tree = default_tree();
            match store.save_tree(&tree) {
                Ok(()) => info!("Wrote default items"),
                Err(e) => warn!("Could not write default items: {e}"),
            }
            tree
        }
        Err(e) => {
            warn!("{e}; using default items");
            default_tree()
        }
    }
}
