pub mod actor;
pub mod ipc;

pub mod common {
    pub mod config;
    pub mod log;
    pub mod store;
    pub mod util;
}

pub mod model {
    pub mod document;
    pub mod item;
    pub mod navigation;
    pub mod reconcile;
    pub mod session;
    pub mod tree;
}

pub mod sys {
    pub mod exec;
    pub mod hotkey;
}
