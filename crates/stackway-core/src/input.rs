//! Input bindings
//!
//! Key and mouse bindings resolved to action lists. Combos use the
//! `W-`/`A-`/`C-`/`S-` prefix notation, e.g. `W-S-Return` or `A-Left`;
//! `+`-separated names such as `Super+Shift+Return` are accepted too.

use bitflags::bitflags;
use thiserror::Error;
use tracing::error;

use crate::action::ActionList;
use crate::config::{KeybindConfig, MousebindConfig};
use crate::ssd::SsdPartType;

/// Input handling errors
#[derive(Debug, Error)]
pub enum InputError {
    #[error("Invalid key: {0}")]
    Key(String),
    #[error("Invalid modifier: {0}")]
    Modifier(String),
    #[error("Invalid button: {0}")]
    Button(String),
    #[error("Invalid mouse context: {0}")]
    Context(String),
    #[error("Invalid mouse event: {0}")]
    Event(String),
}

bitflags! {
    /// Keyboard modifiers
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0000_0001;
        const CTRL  = 0b0000_0010;
        const ALT   = 0b0000_0100;
        const SUPER = 0b0000_1000;
    }
}

impl Modifiers {
    /// Parse a single modifier token.
    pub fn from_token(token: &str) -> Result<Self, InputError> {
        match token.to_lowercase().as_str() {
            "s" | "shift" => Ok(Self::SHIFT),
            "c" | "ctrl" | "control" => Ok(Self::CTRL),
            "a" | "alt" | "mod1" => Ok(Self::ALT),
            "w" | "super" | "mod4" | "logo" => Ok(Self::SUPER),
            _ => Err(InputError::Modifier(token.to_string())),
        }
    }
}

/// Split `W-S-Return` into its modifiers and the final name.
fn split_combo(s: &str) -> Result<(Modifiers, &str), InputError> {
    let separator = if s.contains('+') { '+' } else { '-' };
    let mut parts: Vec<&str> = s.split(separator).map(str::trim).collect();
    // "A--" binds the minus key.
    if s.ends_with("--") {
        parts.truncate(parts.len().saturating_sub(2));
        parts.push("minus");
    }
    let Some(name) = parts.pop().filter(|name| !name.is_empty()) else {
        return Err(InputError::Key(s.to_string()));
    };

    let mut modifiers = Modifiers::empty();
    for part in parts {
        modifiers |= Modifiers::from_token(part)?;
    }
    Ok((modifiers, name))
}

/// A key combination; the key is a case-folded keysym name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyCombo {
    pub modifiers: Modifiers,
    pub key: String,
}

impl KeyCombo {
    pub fn parse(s: &str) -> Result<Self, InputError> {
        let (modifiers, key) = split_combo(s)?;
        Ok(Self {
            modifiers,
            key: key.to_lowercase(),
        })
    }

    pub fn matches(&self, modifiers: Modifiers, key: &str) -> bool {
        self.modifiers == modifiers && self.key.eq_ignore_ascii_case(key)
    }
}

/// Mouse button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
    Extra1,
    Extra2,
}

impl MouseButton {
    pub fn from_name(name: &str) -> Result<Self, InputError> {
        match name.to_lowercase().as_str() {
            "button1" | "left" => Ok(Self::Left),
            "button2" | "middle" => Ok(Self::Middle),
            "button3" | "right" => Ok(Self::Right),
            "button8" | "side" | "extra1" => Ok(Self::Extra1),
            "button9" | "extra" | "extra2" => Ok(Self::Extra2),
            _ => Err(InputError::Button(name.to_string())),
        }
    }

    /// Map a Linux input event code.
    pub const fn from_code(code: u32) -> Option<Self> {
        match code {
            0x110 => Some(Self::Left),
            0x111 => Some(Self::Right),
            0x112 => Some(Self::Middle),
            0x113 => Some(Self::Extra1),
            0x114 => Some(Self::Extra2),
            _ => None,
        }
    }

    pub const fn code(self) -> u32 {
        match self {
            Self::Left => 0x110,
            Self::Right => 0x111,
            Self::Middle => 0x112,
            Self::Extra1 => 0x113,
            Self::Extra2 => 0x114,
        }
    }
}

/// Pointer gesture a mousebind reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseEvent {
    Press,
    Release,
    /// Press and release over the same part without dragging.
    Click,
    /// First pointer motion while the button is held.
    Drag,
}

impl MouseEvent {
    pub fn from_name(name: &str) -> Result<Self, InputError> {
        match name.to_lowercase().as_str() {
            "press" => Ok(Self::Press),
            "release" => Ok(Self::Release),
            "click" => Ok(Self::Click),
            "drag" => Ok(Self::Drag),
            _ => Err(InputError::Event(name.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Keybind {
    pub combo: KeyCombo,
    pub actions: ActionList,
}

#[derive(Debug, Clone)]
pub struct Mousebind {
    pub context: SsdPartType,
    pub modifiers: Modifiers,
    pub button: MouseButton,
    pub event: MouseEvent,
    pub actions: ActionList,
}

impl Mousebind {
    pub fn parse(config: &MousebindConfig) -> Result<Self, InputError> {
        let context = SsdPartType::from_context_name(&config.context)
            .ok_or_else(|| InputError::Context(config.context.clone()))?;
        let (modifiers, button) = split_combo(&config.button)?;
        Ok(Self {
            context,
            modifiers,
            button: MouseButton::from_name(button)?,
            event: MouseEvent::from_name(&config.event)?,
            actions: ActionList::from_config(&config.actions),
        })
    }

    pub fn matches(
        &self,
        part: SsdPartType,
        modifiers: Modifiers,
        button: MouseButton,
        event: MouseEvent,
    ) -> bool {
        self.event == event
            && self.button == button
            && self.modifiers == modifiers
            && self.context.contains(part)
    }
}

/// All bindings built from the configuration.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    pub keybinds: Vec<Keybind>,
    pub mousebinds: Vec<Mousebind>,
}

impl Bindings {
    /// Build bindings, logging and skipping the ones that do not parse.
    pub fn from_config(keybinds: &[KeybindConfig], mousebinds: &[MousebindConfig]) -> Self {
        let keybinds = keybinds
            .iter()
            .filter_map(|bind| match KeyCombo::parse(&bind.key) {
                Ok(combo) => Some(Keybind {
                    combo,
                    actions: ActionList::from_config(&bind.actions),
                }),
                Err(e) => {
                    error!("Skipping keybind '{}': {}", bind.key, e);
                    None
                }
            })
            .collect();

        let mousebinds = mousebinds
            .iter()
            .filter_map(|bind| match Mousebind::parse(bind) {
                Ok(mousebind) => Some(mousebind),
                Err(e) => {
                    error!("Skipping mousebind '{}' on {}: {}", bind.button, bind.context, e);
                    None
                }
            })
            .collect();

        Self {
            keybinds,
            mousebinds,
        }
    }

    pub fn keybind(&self, modifiers: Modifiers, key: &str) -> Option<&Keybind> {
        self.keybinds
            .iter()
            .find(|bind| bind.combo.matches(modifiers, key))
    }

    pub fn mousebinds_for(
        &self,
        part: SsdPartType,
        modifiers: Modifiers,
        button: MouseButton,
        event: MouseEvent,
    ) -> impl Iterator<Item = &Mousebind> {
        self.mousebinds
            .iter()
            .filter(move |bind| bind.matches(part, modifiers, button, event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ActionConfig, Config};

    #[test]
    fn test_key_combo_prefix_notation() {
        let combo = KeyCombo::parse("W-S-Return").unwrap();
        assert_eq!(combo.modifiers, Modifiers::SUPER | Modifiers::SHIFT);
        assert_eq!(combo.key, "return");
        assert!(combo.matches(Modifiers::SUPER | Modifiers::SHIFT, "Return"));
        assert!(!combo.matches(Modifiers::SUPER, "Return"));
    }

    #[test]
    fn test_key_combo_plus_notation() {
        let combo = KeyCombo::parse("Alt+Tab").unwrap();
        assert_eq!(combo.modifiers, Modifiers::ALT);
        assert_eq!(combo.key, "tab");
    }

    #[test]
    fn test_key_combo_minus_key() {
        let combo = KeyCombo::parse("C--").unwrap();
        assert_eq!(combo.modifiers, Modifiers::CTRL);
        assert_eq!(combo.key, "minus");
    }

    #[test]
    fn test_key_combo_errors() {
        assert!(matches!(KeyCombo::parse("X-a"), Err(InputError::Modifier(_))));
        assert!(matches!(KeyCombo::parse(""), Err(InputError::Key(_))));
    }

    #[test]
    fn test_mousebind_parse_and_match() {
        let bind = Mousebind::parse(&MousebindConfig {
            context: "Titlebar".into(),
            button: "A-Left".into(),
            event: "Drag".into(),
            actions: vec![ActionConfig::new("Move")],
        })
        .unwrap();
        assert!(bind.matches(
            SsdPartType::Title,
            Modifiers::ALT,
            MouseButton::Left,
            MouseEvent::Drag
        ));
        assert!(!bind.matches(
            SsdPartType::Client,
            Modifiers::ALT,
            MouseButton::Left,
            MouseEvent::Drag
        ));
    }

    #[test]
    fn test_invalid_bindings_are_skipped() {
        let keybinds = vec![
            KeybindConfig {
                key: "Q-x".into(),
                actions: vec![ActionConfig::new("Close")],
            },
            KeybindConfig {
                key: "W-x".into(),
                actions: vec![ActionConfig::new("Close")],
            },
        ];
        let bindings = Bindings::from_config(&keybinds, &[]);
        assert_eq!(bindings.keybinds.len(), 1);
        assert!(bindings.keybind(Modifiers::SUPER, "x").is_some());
    }

    #[test]
    fn test_default_bindings_all_parse() {
        let config = Config::default();
        let bindings = Bindings::from_config(&config.keybinds, &config.mousebinds);
        assert_eq!(bindings.keybinds.len(), config.keybinds.len());
        assert_eq!(bindings.mousebinds.len(), config.mousebinds.len());
    }
}
