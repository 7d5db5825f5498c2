use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};

use crate::sys::hotkey::{Hotkey, KeyCode, Modifiers};

pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".config")))
        .unwrap_or_else(std::env::temp_dir)
        .join("quicklaunch")
}

pub fn config_file() -> PathBuf { config_dir().join("config.toml") }

pub fn data_dir() -> PathBuf {
    dirs::data_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".local").join("share")))
        .unwrap_or_else(std::env::temp_dir)
        .join("quicklaunch")
}

pub fn items_file() -> PathBuf { data_dir().join("items.ron") }

/// Directory for the instance lock and toggle socket.
pub fn runtime_dir() -> PathBuf {
    dirs::runtime_dir().map(|d| d.join("quicklaunch")).unwrap_or_else(data_dir)
}

pub fn lock_file() -> PathBuf { runtime_dir().join("quicklaunch.lock") }

pub fn socket_file() -> PathBuf { runtime_dir().join("quicklaunch.sock") }

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default = "default_global_hotkey")]
    pub global_hotkey: Hotkey,
    #[serde(default = "default_editor_hotkey")]
    pub editor_hotkey: Hotkey,
    #[serde(default = "yes")]
    pub stay_resident: bool,
    #[serde(default = "no")]
    pub close_instead_of_navigate: bool,
    #[serde(default)]
    pub editor: EditorSettings,
    #[serde(default)]
    pub exec: ExecSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            global_hotkey: default_global_hotkey(),
            editor_hotkey: default_editor_hotkey(),
            stay_resident: true,
            close_instead_of_navigate: false,
            editor: EditorSettings::default(),
            exec: ExecSettings::default(),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.global_hotkey == self.editor_hotkey {
            issues.push(format!(
                "editor_hotkey must differ from global_hotkey (both are {})",
                self.global_hotkey
            ));
        }
        if self.global_hotkey.modifiers.registrable().is_empty() {
            issues.push(format!(
                "global_hotkey {} needs at least one of Ctrl, Alt or Shift",
                self.global_hotkey
            ));
        }
        issues.extend(self.editor.validate());
        issues.extend(self.exec.validate());
        issues
    }
}

/// Tunables for the item editor's drag and drop.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct EditorSettings {
    #[serde(default = "default_drop_margin")]
    pub drop_margin: f64,
    #[serde(default = "default_scroll_margin")]
    pub scroll_margin: f64,
}

impl Default for EditorSettings {
    fn default() -> Self {
        EditorSettings {
            drop_margin: default_drop_margin(),
            scroll_margin: default_scroll_margin(),
        }
    }
}

impl EditorSettings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if !(0.0..=100.0).contains(&self.drop_margin) {
            issues.push(format!(
                "editor.drop_margin must be between 0 and 100 pixels, got {}",
                self.drop_margin
            ));
        }
        if !(0.0..=500.0).contains(&self.scroll_margin) {
            issues.push(format!(
                "editor.scroll_margin must be between 0 and 500 pixels, got {}",
                self.scroll_margin
            ));
        }
        issues
    }
}

/// How non-App items are run.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ExecSettings {
    #[serde(default = "default_shell")]
    pub shell: Vec<String>,
    #[serde(default = "default_task_runner")]
    pub task_runner: Vec<String>,
}

impl Default for ExecSettings {
    fn default() -> Self {
        ExecSettings {
            shell: default_shell(),
            task_runner: default_task_runner(),
        }
    }
}

impl ExecSettings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.shell.first().is_none_or(|s| s.trim().is_empty()) {
            issues.push("exec.shell must name a program".to_string());
        }
        if self.task_runner.first().is_none_or(|s| s.trim().is_empty()) {
            issues.push("exec.task_runner must name a program".to_string());
        }
        issues
    }
}

fn yes() -> bool { true }

fn no() -> bool { false }

fn default_global_hotkey() -> Hotkey {
    Hotkey::new(Modifiers::CONTROL.union(Modifiers::ALT), KeyCode::KeyL)
}

fn default_editor_hotkey() -> Hotkey {
    Hotkey::new(Modifiers::CONTROL.union(Modifiers::SHIFT), KeyCode::KeyL)
}

fn default_drop_margin() -> f64 { 5.0 }

fn default_scroll_margin() -> f64 { 20.0 }

fn default_shell() -> Vec<String> { vec!["sh".to_string(), "-c".to_string()] }

fn default_task_runner() -> Vec<String> {
    vec!["systemctl".to_string(), "--user".to_string(), "start".to_string()]
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
}

impl Config {
    pub fn read(path: &Path) -> anyhow::Result<Config> {
        let buf = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::parse(&buf)
    }

    /// The settings shipped in `quicklaunch.default.toml`.
    pub fn bundled() -> anyhow::Result<Config> {
        Self::parse(include_str!("../../quicklaunch.default.toml"))
    }

    /// Reads `path` if it exists, otherwise the bundled defaults.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Config> {
        if path.exists() {
            Self::read(path)
        } else {
            Ok(Self::bundled().unwrap_or_default())
        }
    }

    pub fn parse(buf: &str) -> anyhow::Result<Config> {
        match toml::from_str::<Config>(buf) {
            Ok(c) => Ok(c),
            Err(e) => {
                let msg = e.to_string();
                if msg.contains("unknown field") {
                    bail!("{msg}\nSee quicklaunch.default.toml for the supported settings.");
                }
                bail!("{msg}");
            }
        }
    }

    /// Save the current config to a file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let toml_string = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, toml_string.as_bytes())?;

        Ok(())
    }

    /// Validates the entire configuration and returns a list of issues found.
    pub fn validate(&self) -> Vec<String> { self.settings.validate() }
}
