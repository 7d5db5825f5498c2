use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString, VariantNames};

use crate::sys::hotkey::Hotkey;

/// How an `App` or `Command` item is started.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct LaunchSpec {
    pub path: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub args: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,
    #[serde(default)]
    pub run_as_admin: bool,
    #[serde(default)]
    pub use_shell: bool,
    #[serde(default)]
    pub no_window: bool,
}

impl LaunchSpec {
    pub fn new(path: impl Into<String>) -> Self {
        LaunchSpec { path: path.into(), ..Default::default() }
    }

    pub fn with_args(mut self, args: impl Into<String>) -> Self {
        self.args = args.into();
        self
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Folder,
    App(LaunchSpec),
    Command(LaunchSpec),
    Shortcut { keys: String },
    GlobalShortcut { keys: String },
    Task { task_name: String },
}

#[derive(
    Serialize,
    Deserialize,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    VariantNames
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum KindTag {
    Folder,
    App,
    Command,
    Shortcut,
    GlobalShortcut,
    Task,
}

impl ItemKind {
    pub fn tag(&self) -> KindTag {
        match self {
            ItemKind::Folder => KindTag::Folder,
            ItemKind::App(_) => KindTag::App,
            ItemKind::Command(_) => KindTag::Command,
            ItemKind::Shortcut { .. } => KindTag::Shortcut,
            ItemKind::GlobalShortcut { .. } => KindTag::GlobalShortcut,
            ItemKind::Task { .. } => KindTag::Task,
        }
    }

    pub fn is_container(&self) -> bool { matches!(self, ItemKind::Folder) }

    pub fn launch_spec(&self) -> Option<&LaunchSpec> {
        match self {
            ItemKind::App(spec) | ItemKind::Command(spec) => Some(spec),
            _ => None,
        }
    }

    pub fn launch_spec_mut(&mut self) -> Option<&mut LaunchSpec> {
        match self {
            ItemKind::App(spec) | ItemKind::Command(spec) => Some(spec),
            _ => None,
        }
    }

    /// Converts to another kind, carrying over whatever payload the two kinds
    /// share (launch spec between App and Command, keys between the shortcut
    /// kinds).
    pub fn convert(self, tag: KindTag) -> ItemKind {
        if self.tag() == tag {
            return self;
        }
        let spec = self.launch_spec().cloned().unwrap_or_default();
        let keys = match &self {
            ItemKind::Shortcut { keys } | ItemKind::GlobalShortcut { keys } => keys.clone(),
            _ => String::new(),
        };
        match tag {
            KindTag::Folder => ItemKind::Folder,
            KindTag::App => ItemKind::App(spec),
            KindTag::Command => ItemKind::Command(spec),
            KindTag::Shortcut => ItemKind::Shortcut { keys },
            KindTag::GlobalShortcut => ItemKind::GlobalShortcut { keys },
            KindTag::Task => ItemKind::Task { task_name: String::new() },
        }
    }
}

/// Presentation attributes. The core only stores them.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ItemStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_color: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button_color: Option<u32>,
}

impl ItemStyle {
    pub const DEFAULT_FONT_COLOR: u32 = 0xFFFF_FFFF;

    pub fn button_color_for(&self, tag: KindTag) -> u32 {
        self.button_color.unwrap_or_else(|| default_button_color(tag))
    }

    pub fn font_color(&self) -> u32 { self.font_color.unwrap_or(Self::DEFAULT_FONT_COLOR) }

    pub fn is_default(&self) -> bool { *self == Self::default() }
}

/// ARGB button colour used when an item has none configured.
pub fn default_button_color(tag: KindTag) -> u32 {
    let (r, g, b) = match tag {
        KindTag::App => (50, 100, 50),
        KindTag::Command => (100, 50, 50),
        KindTag::Shortcut => (50, 50, 100),
        KindTag::Folder => (100, 100, 50),
        KindTag::GlobalShortcut | KindTag::Task => (50, 50, 50),
    };
    0xFF00_0000 | (r << 16) | (g << 8) | b
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Item {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub kind: ItemKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shortcut: Option<Hotkey>,
    #[serde(default = "yes")]
    pub close_on_run: bool,
    #[serde(default, skip_serializing_if = "ItemStyle::is_default")]
    pub style: ItemStyle,
}

fn yes() -> bool { true }

impl Item {
    pub fn new(name: impl Into<String>, kind: ItemKind) -> Self {
        Item {
            name: name.into(),
            description: String::new(),
            kind,
            shortcut: None,
            close_on_run: true,
            style: ItemStyle::default(),
        }
    }

    pub fn folder(name: impl Into<String>) -> Self { Self::new(name, ItemKind::Folder) }

    pub fn app(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(name, ItemKind::App(LaunchSpec::new(path)))
    }

    pub fn command(name: impl Into<String>, spec: LaunchSpec) -> Self {
        Self::new(name, ItemKind::Command(spec))
    }

    pub fn with_shortcut(mut self, shortcut: Hotkey) -> Self {
        self.shortcut = Some(shortcut);
        self
    }

    pub fn is_container(&self) -> bool { self.kind.is_container() }

    pub fn tag(&self) -> KindTag { self.kind.tag() }
}
