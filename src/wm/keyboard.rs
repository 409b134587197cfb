//! Keyboard Module
//!
//! Key bindings: parsing `Mod1+F4` style strings, the actions they
//! trigger, and the handful of keysyms the interactive move/resize loop
//! understands.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Modifier masks (X11 KeyButMask bits)
pub mod modifiers {
    pub const SHIFT: u16 = 1 << 0;
    pub const LOCK: u16 = 1 << 1;
    pub const CONTROL: u16 = 1 << 2;
    /// Alt
    pub const MOD1: u16 = 1 << 3;
    /// NumLock on most layouts
    pub const MOD2: u16 = 1 << 4;
    /// Super
    pub const MOD4: u16 = 1 << 6;

    /// Modifiers that never distinguish one binding from another
    pub const IGNORED: u16 = LOCK | MOD2;

    pub fn clean(state: u16) -> u16 {
        state & (SHIFT | CONTROL | MOD1 | MOD4)
    }
}

/// Keysyms used directly by the core
pub mod keysym {
    pub const ESCAPE: u32 = 0xff1b;
    pub const RETURN: u32 = 0xff0d;
    pub const KP_ENTER: u32 = 0xff8d;
    pub const LEFT: u32 = 0xff51;
    pub const UP: u32 = 0xff52;
    pub const RIGHT: u32 = 0xff53;
    pub const DOWN: u32 = 0xff54;
    pub const TAB: u32 = 0xff09;
    pub const SPACE: u32 = 0x0020;
    pub const F1: u32 = 0xffbe;
    pub const DELETE: u32 = 0xffff;
    pub const BACKSPACE: u32 = 0xff08;
    pub const HOME: u32 = 0xff50;
    pub const END: u32 = 0xff57;
    pub const PAGE_UP: u32 = 0xff55;
    pub const PAGE_DOWN: u32 = 0xff56;
}

/// Something a key binding can do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Close,
    Kill,
    Minimize,
    Maximize,
    MaximizeHorizontal,
    MaximizeVertical,
    Shade,
    Fullscreen,
    Stick,
    Move,
    Resize,
    Raise,
    Lower,
    NextDesktop,
    PreviousDesktop,
    /// Zero-based desktop index
    Desktop(u32),
    SendToNextDesktop,
    SendToPreviousDesktop,
    ShowDesktop,
}

/// Error for unparseable binding text
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BindingError {
    #[error("unknown action '{0}'")]
    UnknownAction(String),
    #[error("unknown key '{0}'")]
    UnknownKey(String),
    #[error("unknown modifier '{0}'")]
    UnknownModifier(String),
}

impl FromStr for Action {
    type Err = BindingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let action = match lower.as_str() {
            "close" => Self::Close,
            "kill" => Self::Kill,
            "minimize" => Self::Minimize,
            "maximize" => Self::Maximize,
            "maxh" | "maximize-horizontal" => Self::MaximizeHorizontal,
            "maxv" | "maximize-vertical" => Self::MaximizeVertical,
            "shade" => Self::Shade,
            "fullscreen" => Self::Fullscreen,
            "stick" => Self::Stick,
            "move" => Self::Move,
            "resize" => Self::Resize,
            "raise" => Self::Raise,
            "lower" => Self::Lower,
            "next-desktop" | "rdesktop" => Self::NextDesktop,
            "previous-desktop" | "ldesktop" => Self::PreviousDesktop,
            "send-next" | "sendr" => Self::SendToNextDesktop,
            "send-previous" | "sendl" => Self::SendToPreviousDesktop,
            "showdesktop" | "show-desktop" => Self::ShowDesktop,
            other => {
                // "desktop#N", one-based like the user sees it
                let index = other
                    .strip_prefix("desktop#")
                    .or_else(|| other.strip_prefix("desktop"))
                    .and_then(|n| n.parse::<u32>().ok())
                    .filter(|&n| n > 0)
                    .ok_or_else(|| BindingError::UnknownAction(s.to_string()))?;
                Self::Desktop(index - 1)
            }
        };
        Ok(action)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Desktop(d) => write!(f, "desktop#{}", d + 1),
            other => write!(f, "{:?}", other),
        }
    }
}

/// One key binding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyBinding {
    /// Modifier mask (see [`modifiers`])
    pub modifiers: u16,
    pub keysym: u32,
    pub action: Action,
}

impl KeyBinding {
    /// Parse `"Mod1+Shift+F4"` into modifiers and keysym.
    pub fn parse(text: &str, action: Action) -> Result<Self, BindingError> {
        let mut parts: Vec<&str> = text.split('+').map(str::trim).collect();
        let key = parts.pop().unwrap_or_default();
        let mut mask = 0u16;
        for part in parts {
            mask |= match part.to_ascii_lowercase().as_str() {
                "shift" | "s" => modifiers::SHIFT,
                "control" | "ctrl" | "c" => modifiers::CONTROL,
                "mod1" | "alt" | "a" => modifiers::MOD1,
                "mod4" | "super" | "win" | "4" => modifiers::MOD4,
                _ => return Err(BindingError::UnknownModifier(part.to_string())),
            };
        }
        let keysym = keysym_from_name(key).ok_or_else(|| BindingError::UnknownKey(key.to_string()))?;
        Ok(Self {
            modifiers: mask,
            keysym,
            action,
        })
    }

    /// Does a key event match this binding?
    pub fn matches(&self, keysym: u32, state: u16) -> bool {
        self.keysym == keysym && self.modifiers == modifiers::clean(state)
    }
}

/// Keysym for a key name (Latin-1 letters and digits, function keys and
/// the common named keys).
pub fn keysym_from_name(name: &str) -> Option<u32> {
    if name.chars().count() == 1 {
        let c = name.chars().next()?;
        if c.is_ascii_alphanumeric() {
            return Some(c.to_ascii_lowercase() as u32);
        }
    }
    let lower = name.to_ascii_lowercase();
    if let Some(n) = lower.strip_prefix('f').and_then(|n| n.parse::<u32>().ok()) {
        if (1..=24).contains(&n) {
            return Some(keysym::F1 + n - 1);
        }
    }
    let sym = match lower.as_str() {
        "escape" | "esc" => keysym::ESCAPE,
        "return" | "enter" => keysym::RETURN,
        "tab" => keysym::TAB,
        "space" => keysym::SPACE,
        "left" => keysym::LEFT,
        "right" => keysym::RIGHT,
        "up" => keysym::UP,
        "down" => keysym::DOWN,
        "delete" => keysym::DELETE,
        "backspace" => keysym::BACKSPACE,
        "home" => keysym::HOME,
        "end" => keysym::END,
        "prior" | "pageup" => keysym::PAGE_UP,
        "next" | "pagedown" => keysym::PAGE_DOWN,
        "minus" => 0x2d,
        "equal" => 0x3d,
        _ => return None,
    };
    Some(sym)
}

/// Bindings used when the configuration has none
pub fn default_bindings() -> Vec<(String, String)> {
    [
        ("Mod1+F4", "close"),
        ("Mod1+F9", "minimize"),
        ("Mod1+F10", "maximize"),
        ("Mod1+F11", "fullscreen"),
        ("Mod1+F7", "move"),
        ("Mod1+F8", "resize"),
        ("Mod1+F5", "shade"),
        ("Mod4+Right", "next-desktop"),
        ("Mod4+Left", "previous-desktop"),
        ("Mod4+Shift+Right", "send-next"),
        ("Mod4+Shift+Left", "send-previous"),
        ("Mod4+d", "showdesktop"),
        ("Mod4+1", "desktop#1"),
        ("Mod4+2", "desktop#2"),
        ("Mod4+3", "desktop#3"),
        ("Mod4+4", "desktop#4"),
    ]
    .iter()
    .map(|(k, a)| (k.to_string(), a.to_string()))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_binding() {
        let binding = KeyBinding::parse("Mod1+Shift+F4", Action::Close).unwrap();
        assert_eq!(binding.modifiers, modifiers::MOD1 | modifiers::SHIFT);
        assert_eq!(binding.keysym, keysym::F1 + 3);
    }

    #[test]
    fn test_match_ignores_lock_modifiers() {
        let binding = KeyBinding::parse("Mod4+d", Action::ShowDesktop).unwrap();
        assert!(binding.matches('d' as u32, modifiers::MOD4 | modifiers::MOD2 | modifiers::LOCK));
        assert!(!binding.matches('d' as u32, modifiers::MOD1));
    }

    #[test]
    fn test_parse_actions() {
        assert_eq!("desktop#3".parse::<Action>(), Ok(Action::Desktop(2)));
        assert_eq!("maxv".parse::<Action>(), Ok(Action::MaximizeVertical));
        assert!("desktop#0".parse::<Action>().is_err());
        assert!("launch".parse::<Action>().is_err());
    }

    #[test]
    fn test_unknown_key_and_modifier() {
        assert_eq!(
            KeyBinding::parse("Hyper+a", Action::Close),
            Err(BindingError::UnknownModifier("Hyper".into()))
        );
        assert_eq!(
            KeyBinding::parse("Mod1+Foo", Action::Close),
            Err(BindingError::UnknownKey("Foo".into()))
        );
    }

    #[test]
    fn test_default_bindings_parse() {
        for (key, action) in default_bindings() {
            let action: Action = action.parse().unwrap();
            assert!(KeyBinding::parse(&key, action).is_ok(), "{}", key);
        }
    }
}
