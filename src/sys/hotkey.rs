use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct Modifiers(u8);

impl Modifiers {
    pub const ALT: Modifiers = Modifiers(0b0000_0010);
    pub const CONTROL: Modifiers = Modifiers(0b0000_0001);
    pub const META: Modifiers = Modifiers(0b0000_1000);
    pub const SHIFT: Modifiers = Modifiers(0b0000_0100);

    pub fn empty() -> Self { Modifiers(0) }

    pub fn is_empty(&self) -> bool { self.0 == 0 }

    pub fn contains(&self, other: Modifiers) -> bool { (self.0 & other.0) == other.0 }

    pub fn intersects(&self, other: Modifiers) -> bool { (self.0 & other.0) != 0 }

    pub fn insert(&mut self, other: Modifiers) { self.0 |= other.0; }

    pub fn remove(&mut self, other: Modifiers) { self.0 &= !other.0; }

    pub fn union(self, other: Modifiers) -> Modifiers { Modifiers(self.0 | other.0) }

    /// The subset the OS is asked to grab. Meta is reserved by most desktops
    /// and is never part of a registration.
    pub fn registrable(self) -> Modifiers {
        let mut mods = self;
        mods.remove(Modifiers::META);
        mods
    }

    pub fn insert_from_token(&mut self, token: &str) -> bool {
        match token.to_lowercase().as_str() {
            "alt" | "option" => {
                self.insert(Modifiers::ALT);
                true
            }
            "ctrl" | "control" => {
                self.insert(Modifiers::CONTROL);
                true
            }
            "shift" => {
                self.insert(Modifiers::SHIFT);
                true
            }
            "meta" | "super" | "win" | "cmd" | "command" => {
                self.insert(Modifiers::META);
                true
            }
            _ => false,
        }
    }
}

impl fmt::Display for Modifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<&str> = Vec::new();
        if self.contains(Modifiers::CONTROL) {
            parts.push("Ctrl");
        }
        if self.contains(Modifiers::ALT) {
            parts.push("Alt");
        }
        if self.contains(Modifiers::SHIFT) {
            parts.push("Shift");
        }
        if self.contains(Modifiers::META) {
            parts.push("Meta");
        }
        write!(f, "{}", parts.join(" + "))
    }
}

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum KeyCode {
    KeyA,
    KeyB,
    KeyC,
    KeyD,
    KeyE,
    KeyF,
    KeyG,
    KeyH,
    KeyI,
    KeyJ,
    KeyK,
    KeyL,
    KeyM,
    KeyN,
    KeyO,
    KeyP,
    KeyQ,
    KeyR,
    KeyS,
    KeyT,
    KeyU,
    KeyV,
    KeyW,
    KeyX,
    KeyY,
    KeyZ,
    Digit0,
    Digit1,
    Digit2,
    Digit3,
    Digit4,
    Digit5,
    Digit6,
    Digit7,
    Digit8,
    Digit9,
    F1,
    F2,
    F3,
    F4,
    F5,
    F6,
    F7,
    F8,
    F9,
    F10,
    F11,
    F12,
    Minus,
    Equal,
    Comma,
    Period,
    Slash,
    Semicolon,
    Quote,
    Backquote,
    Backslash,
    BracketLeft,
    BracketRight,
    Enter,
    Tab,
    Space,
    Backspace,
    Escape,
    Insert,
    Delete,
    Home,
    End,
    PageUp,
    PageDown,
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
}

impl fmt::Display for KeyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use KeyCode::*;
        let s = match self {
            KeyA => "A",
            KeyB => "B",
            KeyC => "C",
            KeyD => "D",
            KeyE => "E",
            KeyF => "F",
            KeyG => "G",
            KeyH => "H",
            KeyI => "I",
            KeyJ => "J",
            KeyK => "K",
            KeyL => "L",
            KeyM => "M",
            KeyN => "N",
            KeyO => "O",
            KeyP => "P",
            KeyQ => "Q",
            KeyR => "R",
            KeyS => "S",
            KeyT => "T",
            KeyU => "U",
            KeyV => "V",
            KeyW => "W",
            KeyX => "X",
            KeyY => "Y",
            KeyZ => "Z",
            Digit0 => "0",
            Digit1 => "1",
            Digit2 => "2",
            Digit3 => "3",
            Digit4 => "4",
            Digit5 => "5",
            Digit6 => "6",
            Digit7 => "7",
            Digit8 => "8",
            Digit9 => "9",
            F1 => "F1",
            F2 => "F2",
            F3 => "F3",
            F4 => "F4",
            F5 => "F5",
            F6 => "F6",
            F7 => "F7",
            F8 => "F8",
            F9 => "F9",
            F10 => "F10",
            F11 => "F11",
            F12 => "F12",
            Minus => "Minus",
            Equal => "Equal",
            Comma => "Comma",
            Period => "Period",
            Slash => "Slash",
            Semicolon => "Semicolon",
            Quote => "Quote",
            Backquote => "Backquote",
            Backslash => "Backslash",
            BracketLeft => "BracketLeft",
            BracketRight => "BracketRight",
            Enter => "Enter",
            Tab => "Tab",
            Space => "Space",
            Backspace => "Backspace",
            Escape => "Escape",
            Insert => "Insert",
            Delete => "Delete",
            Home => "Home",
            End => "End",
            PageUp => "PageUp",
            PageDown => "PageDown",
            ArrowLeft => "Left",
            ArrowRight => "Right",
            ArrowUp => "Up",
            ArrowDown => "Down",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for KeyCode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use KeyCode::*;
        match s.to_uppercase().as_str() {
            "A" => Ok(KeyA),
            "B" => Ok(KeyB),
            "C" => Ok(KeyC),
            "D" => Ok(KeyD),
            "E" => Ok(KeyE),
            "F" => Ok(KeyF),
            "G" => Ok(KeyG),
            "H" => Ok(KeyH),
            "I" => Ok(KeyI),
            "J" => Ok(KeyJ),
            "K" => Ok(KeyK),
            "L" => Ok(KeyL),
            "M" => Ok(KeyM),
            "N" => Ok(KeyN),
            "O" => Ok(KeyO),
            "P" => Ok(KeyP),
            "Q" => Ok(KeyQ),
            "R" => Ok(KeyR),
            "S" => Ok(KeyS),
            "T" => Ok(KeyT),
            "U" => Ok(KeyU),
            "V" => Ok(KeyV),
            "W" => Ok(KeyW),
            "X" => Ok(KeyX),
            "Y" => Ok(KeyY),
            "Z" => Ok(KeyZ),
            "0" => Ok(Digit0),
            "1" => Ok(Digit1),
            "2" => Ok(Digit2),
            "3" => Ok(Digit3),
            "4" => Ok(Digit4),
            "5" => Ok(Digit5),
            "6" => Ok(Digit6),
            "7" => Ok(Digit7),
            "8" => Ok(Digit8),
            "9" => Ok(Digit9),
            "F1" => Ok(F1),
            "F2" => Ok(F2),
            "F3" => Ok(F3),
            "F4" => Ok(F4),
            "F5" => Ok(F5),
            "F6" => Ok(F6),
            "F7" => Ok(F7),
            "F8" => Ok(F8),
            "F9" => Ok(F9),
            "F10" => Ok(F10),
            "F11" => Ok(F11),
            "F12" => Ok(F12),
            "-" | "MINUS" | "HYPHEN" => Ok(Minus),
            "=" | "EQUAL" | "EQUALS" => Ok(Equal),
            "," | "COMMA" => Ok(Comma),
            "." | "DOT" | "PERIOD" => Ok(Period),
            "/" | "SLASH" => Ok(Slash),
            ";" | "SEMICOLON" => Ok(Semicolon),
            "'" | "QUOTE" | "APOSTROPHE" => Ok(Quote),
            "`" | "BACKQUOTE" | "GRAVE" | "TILDE" => Ok(Backquote),
            "\\" | "BACKSLASH" => Ok(Backslash),
            "[" | "BRACKETLEFT" | "LEFTBRACKET" => Ok(BracketLeft),
            "]" | "BRACKETRIGHT" | "RIGHTBRACKET" => Ok(BracketRight),
            "ENTER" | "RETURN" => Ok(Enter),
            "TAB" => Ok(Tab),
            "SPACE" => Ok(Space),
            "BACKSPACE" => Ok(Backspace),
            "ESC" | "ESCAPE" => Ok(Escape),
            "INSERT" | "INS" => Ok(Insert),
            "DELETE" | "DEL" => Ok(Delete),
            "HOME" => Ok(Home),
            "END" => Ok(End),
            "PAGEUP" => Ok(PageUp),
            "PAGEDOWN" => Ok(PageDown),
            "LEFT" | "ARROWLEFT" => Ok(ArrowLeft),
            "RIGHT" | "ARROWRIGHT" => Ok(ArrowRight),
            "UP" | "ARROWUP" => Ok(ArrowUp),
            "DOWN" | "ARROWDOWN" => Ok(ArrowDown),
            _ => Err(anyhow!("Unrecognized key token: {}", s.to_lowercase())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Hotkey {
    pub modifiers: Modifiers,
    pub key_code: KeyCode,
}

impl Hotkey {
    pub fn new(modifiers: Modifiers, key_code: KeyCode) -> Self { Self { modifiers, key_code } }

    pub fn key(key_code: KeyCode) -> Self { Self::new(Modifiers::empty(), key_code) }

    /// Splits the chord into what is handed to the OS registration call.
    pub fn registration_parts(&self) -> (Modifiers, KeyCode) {
        (self.modifiers.registrable(), self.key_code)
    }
}

impl fmt::Display for Hotkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers == Modifiers::empty() {
            write!(f, "{}", self.key_code)
        } else {
            write!(f, "{} + {}", self.modifiers, self.key_code)
        }
    }
}

fn parse_mods_and_optional_key(s: &str) -> Result<(Modifiers, Option<KeyCode>), anyhow::Error> {
    let parts: Vec<&str> = s.split('+').map(|p| p.trim()).filter(|p| !p.is_empty()).collect();

    let mut mods = Modifiers::empty();
    let mut key_opt: Option<KeyCode> = None;

    for part in parts {
        if mods.insert_from_token(part) {
            continue;
        }
        let code = KeyCode::from_str(part)?;
        if key_opt.replace(code).is_some() {
            return Err(anyhow!("More than one key specified in hotkey: {}", s));
        }
    }

    Ok((mods, key_opt))
}

impl FromStr for Hotkey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (mods, key_opt) = parse_mods_and_optional_key(s)?;
        let key_code = key_opt.ok_or_else(|| anyhow!("No key specified in hotkey: {}", s))?;
        Ok(Hotkey::new(mods, key_code))
    }
}

impl Serialize for Hotkey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where S: serde::Serializer {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Hotkey {
    fn deserialize<D>(deserializer: D) -> Result<Hotkey, D::Error>
    where D: serde::Deserializer<'de> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum HotkeyRepr {
            Str(String),
            Map {
                modifiers: Modifiers,
                key_code: KeyCode,
            },
        }

        let repr = HotkeyRepr::deserialize(deserializer)?;
        match repr {
            HotkeyRepr::Str(s) => Hotkey::from_str(&s).map_err(serde::de::Error::custom),
            HotkeyRepr::Map { modifiers, key_code } => Ok(Hotkey::new(modifiers, key_code)),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HotkeyError {
    #[error("hotkey {0} is already in use by another application")]
    AlreadyInUse(Hotkey),
    #[error("hotkey {0} cannot be registered on this platform")]
    Unsupported(Hotkey),
    #[error("hotkey backend error: {0}")]
    Backend(String),
}

/// Boundary to the OS global-hotkey facility. At most one chord is owned at a
/// time; registering again replaces the previous one only on success.
pub trait HotkeyRegistrar {
    fn register(&mut self, modifiers: Modifiers, key: KeyCode) -> Result<(), HotkeyError>;
    fn unregister(&mut self);
}

/// Used when no OS backend is compiled in, and when the launcher is not
/// resident.
#[derive(Debug, Default)]
pub struct NoopRegistrar;

impl HotkeyRegistrar for NoopRegistrar {
    fn register(&mut self, modifiers: Modifiers, key: KeyCode) -> Result<(), HotkeyError> {
        debug!(%modifiers, %key, "No hotkey backend available; skipping registration");
        Ok(())
    }

    fn unregister(&mut self) {}
}

/// Registers the chord through the `global-hotkey` crate and forwards presses
/// to a callback on a listener thread.
#[cfg(feature = "global-hotkey")]
pub struct GlobalHotkeyRegistrar {
    manager: global_hotkey::GlobalHotKeyManager,
    current: Option<global_hotkey::hotkey::HotKey>,
}

#[cfg(feature = "global-hotkey")]
impl GlobalHotkeyRegistrar {
    pub fn new(on_press: impl Fn() + Send + 'static) -> Result<Self, HotkeyError> {
        use global_hotkey::{GlobalHotKeyEvent, HotKeyState};

        let manager = global_hotkey::GlobalHotKeyManager::new()
            .map_err(|e| HotkeyError::Backend(e.to_string()))?;
        std::thread::spawn(move || {
            let receiver = GlobalHotKeyEvent::receiver();
            while let Ok(event) = receiver.recv() {
                if event.state == HotKeyState::Pressed {
                    on_press();
                }
            }
        });
        Ok(Self { manager, current: None })
    }

    fn to_native(
        modifiers: Modifiers,
        key: KeyCode,
    ) -> Option<global_hotkey::hotkey::HotKey> {
        use global_hotkey::hotkey::{Code, HotKey, Modifiers as Native};

        let mut native = Native::empty();
        if modifiers.contains(Modifiers::CONTROL) {
            native |= Native::CONTROL;
        }
        if modifiers.contains(Modifiers::ALT) {
            native |= Native::ALT;
        }
        if modifiers.contains(Modifiers::SHIFT) {
            native |= Native::SHIFT;
        }
        // KeyCode variant names follow the same W3C naming as `Code`.
        let code = Code::from_str(&format!("{key:?}")).ok()?;
        Some(HotKey::new(Some(native), code))
    }
}

#[cfg(feature = "global-hotkey")]
impl HotkeyRegistrar for GlobalHotkeyRegistrar {
    fn register(&mut self, modifiers: Modifiers, key: KeyCode) -> Result<(), HotkeyError> {
        let chord = Hotkey::new(modifiers, key);
        let native = Self::to_native(modifiers, key).ok_or(HotkeyError::Unsupported(chord))?;
        if let Err(e) = self.manager.register(native) {
            return Err(match e {
                global_hotkey::Error::AlreadyRegistered(_) => HotkeyError::AlreadyInUse(chord),
                other => HotkeyError::Backend(other.to_string()),
            });
        }
        if let Some(previous) = self.current.replace(native) {
            if previous != native {
                _ = self.manager.unregister(previous);
            }
        }
        tracing::info!(hotkey = %chord, "Registered global hotkey");
        Ok(())
    }

    fn unregister(&mut self) {
        if let Some(previous) = self.current.take() {
            if let Err(e) = self.manager.unregister(previous) {
                debug!("Failed to unregister global hotkey: {e}");
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    /// Records registrations; chords listed in `taken` fail with `AlreadyInUse`.
    #[derive(Clone, Default)]
    pub struct RecordingRegistrar {
        pub state: Rc<RefCell<RegistrarState>>,
    }

    #[derive(Default, Debug)]
    pub struct RegistrarState {
        pub current: Option<(Modifiers, KeyCode)>,
        pub taken: Vec<(Modifiers, KeyCode)>,
        pub register_calls: usize,
        pub unregister_calls: usize,
    }

    impl HotkeyRegistrar for RecordingRegistrar {
        fn register(&mut self, modifiers: Modifiers, key: KeyCode) -> Result<(), HotkeyError> {
            let mut state = self.state.borrow_mut();
            state.register_calls += 1;
            if state.taken.contains(&(modifiers, key)) {
                return Err(HotkeyError::AlreadyInUse(Hotkey::new(modifiers, key)));
            }
            state.current = Some((modifiers, key));
            Ok(())
        }

        fn unregister(&mut self) {
            let mut state = self.state.borrow_mut();
            state.unregister_calls += 1;
            state.current = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn parses_chords_in_any_modifier_order() {
        let a: Hotkey = "Ctrl + Alt + L".parse().unwrap();
        let b: Hotkey = "alt+ctrl+l".parse().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.modifiers, Modifiers::CONTROL.union(Modifiers::ALT));
        assert_eq!(a.key_code, KeyCode::KeyL);
    }

    #[test]
    fn display_round_trips() {
        for s in ["Ctrl + Shift + L", "N", "Alt + F4", "Ctrl + Alt + Shift + Meta + Up"] {
            let hk: Hotkey = s.parse().unwrap();
            assert_eq!(hk.to_string(), s);
            assert_eq!(hk.to_string().parse::<Hotkey>().unwrap(), hk);
        }
    }

    #[test]
    fn rejects_modifier_only_and_double_keys() {
        assert!("Ctrl + Alt".parse::<Hotkey>().is_err());
        assert!("A + B".parse::<Hotkey>().is_err());
        assert!("Ctrl + Bogus".parse::<Hotkey>().is_err());
    }

    #[test]
    fn meta_is_excluded_from_registration() {
        let hk: Hotkey = "Meta + Ctrl + Space".parse().unwrap();
        let (mods, key) = hk.registration_parts();
        assert!(mods.contains(Modifiers::CONTROL));
        assert!(!mods.intersects(Modifiers::META));
        assert_eq!(key, KeyCode::Space);
    }

    #[test]
    fn deserializes_from_string_or_map() {
        #[derive(Deserialize)]
        struct Holder {
            key: Hotkey,
        }
        let from_str: Holder = toml::from_str(r#"key = "Ctrl + N""#).unwrap();
        assert_eq!(from_str.key, Hotkey::new(Modifiers::CONTROL, KeyCode::KeyN));

        let from_map: Holder =
            toml::from_str("key = { modifiers = 4, key_code = \"KeyP\" }").unwrap();
        assert_eq!(from_map.key, Hotkey::new(Modifiers::SHIFT, KeyCode::KeyP));
    }
}
