//! Configuration system
//!
//! TOML configuration covering theme metrics, workspaces, bindings and
//! menus. Bindings and menu entries carry action lists in the same
//! `{ name, arg }` form the action engine consumes.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Decoration metrics
    pub theme: ThemeConfig,

    /// Workspace names and navigation
    pub workspaces: WorkspacesConfig,

    /// Key bindings
    #[serde(rename = "keybind")]
    pub keybinds: Vec<KeybindConfig>,

    /// Mouse bindings
    #[serde(rename = "mousebind")]
    pub mousebinds: Vec<MousebindConfig>,

    /// Menus
    #[serde(rename = "menu")]
    pub menus: Vec<MenuConfig>,

    /// Startup commands
    pub startup: Vec<StartupCommand>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            theme: ThemeConfig::default(),
            workspaces: WorkspacesConfig::default(),
            keybinds: default_keybinds(),
            mousebinds: default_mousebinds(),
            menus: default_menus(),
            startup: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: Option<&str>) -> Result<Self> {
        let config_path = path.map(PathBuf::from).or_else(Self::find_config_file);

        match config_path {
            Some(path) if path.exists() => {
                info!("Loading configuration from {:?}", path);
                let content = fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read config file: {path:?}"))?;
                Self::from_toml(&content)
                    .with_context(|| format!("Failed to parse config file: {path:?}"))
            }
            Some(path) => {
                warn!("Config file not found at {:?}, using defaults", path);
                Ok(Self::default())
            }
            None => {
                info!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Find the configuration file
    fn find_config_file() -> Option<PathBuf> {
        let candidates = [
            dirs::config_dir().map(|p| p.join("stackway/config.toml")),
            dirs::home_dir().map(|p| p.join(".config/stackway/config.toml")),
            Some(PathBuf::from("/etc/stackway/config.toml")),
        ];

        candidates.into_iter().flatten().find(|p| p.exists())
    }

    /// Generate default configuration as a string
    pub fn default_config_string() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Error generating config"))
    }
}

/// General settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Focus the view under the pointer as it moves
    pub focus_follows_mouse: bool,

    /// Raise views focused by the pointer
    pub raise_on_focus: bool,

    /// Gap kept between views and output edges by MoveToEdge/SnapToEdge
    pub gap: i32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            focus_follows_mouse: false,
            raise_on_focus: false,
            gap: 0,
        }
    }
}

/// Server-side decoration metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeConfig {
    pub titlebar_height: i32,
    pub border_width: i32,
    pub button_width: i32,
    /// Invisible area around the frame that still starts a resize
    pub resize_extents: i32,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            titlebar_height: 24,
            border_width: 1,
            button_width: 26,
            resize_extents: 8,
        }
    }
}

/// Workspace configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspacesConfig {
    /// Workspace names, in order
    pub names: Vec<String>,

    /// Whether `left`/`right` wrap around at the ends
    pub wrap: bool,
}

impl Default for WorkspacesConfig {
    fn default() -> Self {
        Self {
            names: (1..=4).map(|i| i.to_string()).collect(),
            wrap: false,
        }
    }
}

/// One entry of an action list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionConfig {
    pub name: String,
    #[serde(
        default,
        alias = "command",
        alias = "direction",
        alias = "menu",
        alias = "to",
        skip_serializing_if = "Option::is_none"
    )]
    pub arg: Option<String>,
}

impl ActionConfig {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            arg: None,
        }
    }

    pub fn with_arg(name: &str, arg: &str) -> Self {
        Self {
            name: name.to_string(),
            arg: Some(arg.to_string()),
        }
    }
}

/// Key binding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeybindConfig {
    /// Key combination (e.g., "W-Return", "A-S-Tab")
    pub key: String,
    pub actions: Vec<ActionConfig>,
}

/// Mouse binding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MousebindConfig {
    /// Decoration part the pointer must be over (e.g., "Titlebar", "Frame")
    pub context: String,
    /// Button with optional modifiers (e.g., "Left", "A-Right")
    pub button: String,
    /// Press, Release, Click or Drag
    #[serde(default = "default_mouse_event")]
    pub event: String,
    pub actions: Vec<ActionConfig>,
}

fn default_mouse_event() -> String {
    "Press".to_string()
}

/// Menu configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuConfig {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub items: Vec<MenuItemConfig>,
}

/// Menu item configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MenuItemConfig {
    pub label: String,
    #[serde(default)]
    pub actions: Vec<ActionConfig>,
}

/// Startup command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartupCommand {
    /// Command to run
    pub command: String,
}

fn keybind(key: &str, actions: Vec<ActionConfig>) -> KeybindConfig {
    KeybindConfig {
        key: key.to_string(),
        actions,
    }
}

fn default_keybinds() -> Vec<KeybindConfig> {
    vec![
        keybind("A-Tab", vec![ActionConfig::new("NextWindow")]),
        keybind("A-S-Tab", vec![ActionConfig::new("PreviousWindow")]),
        keybind("W-Return", vec![ActionConfig::with_arg("Execute", "foot")]),
        keybind("A-F3", vec![ActionConfig::with_arg("Execute", "bemenu-run")]),
        keybind("A-F4", vec![ActionConfig::new("Close")]),
        keybind("W-a", vec![ActionConfig::new("ToggleMaximize")]),
        keybind("A-Left", vec![ActionConfig::with_arg("MoveToEdge", "left")]),
        keybind("A-Right", vec![ActionConfig::with_arg("MoveToEdge", "right")]),
        keybind("A-Up", vec![ActionConfig::with_arg("MoveToEdge", "up")]),
        keybind("A-Down", vec![ActionConfig::with_arg("MoveToEdge", "down")]),
        keybind("W-Left", vec![ActionConfig::with_arg("SnapToEdge", "left")]),
        keybind("W-Right", vec![ActionConfig::with_arg("SnapToEdge", "right")]),
        keybind("C-A-Left", vec![ActionConfig::with_arg("GoToDesktop", "left")]),
        keybind("C-A-Right", vec![ActionConfig::with_arg("GoToDesktop", "right")]),
        keybind("S-C-A-Left", vec![ActionConfig::with_arg("SendToDesktop", "left")]),
        keybind("S-C-A-Right", vec![ActionConfig::with_arg("SendToDesktop", "right")]),
        keybind("A-Space", vec![ActionConfig::with_arg("ShowMenu", "client-menu")]),
    ]
}

fn mousebind(context: &str, button: &str, event: &str, actions: &[&str]) -> MousebindConfig {
    MousebindConfig {
        context: context.to_string(),
        button: button.to_string(),
        event: event.to_string(),
        actions: actions.iter().map(|name| ActionConfig::new(name)).collect(),
    }
}

fn default_mousebinds() -> Vec<MousebindConfig> {
    let mut binds = vec![
        mousebind("Frame", "A-Left", "Press", &["Focus", "Raise"]),
        mousebind("Frame", "A-Left", "Drag", &["Move"]),
        mousebind("Frame", "A-Right", "Press", &["Focus", "Raise"]),
        mousebind("Frame", "A-Right", "Drag", &["Resize"]),
        mousebind("Titlebar", "Left", "Press", &["Focus", "Raise"]),
        mousebind("Title", "Left", "Drag", &["Move"]),
        mousebind("Client", "Left", "Press", &["Focus", "Raise"]),
        mousebind("Close", "Left", "Click", &["Close"]),
        mousebind("Maximize", "Left", "Click", &["ToggleMaximize"]),
        mousebind("Iconify", "Left", "Click", &["Iconify"]),
    ];
    for edge in ["Top", "Bottom", "Left", "Right"] {
        binds.push(mousebind(edge, "Left", "Press", &["Focus", "Raise"]));
        binds.push(mousebind(edge, "Left", "Drag", &["Resize"]));
    }

    let mut show_client_menu = mousebind("Titlebar", "Right", "Press", &["Focus", "Raise"]);
    show_client_menu
        .actions
        .push(ActionConfig::with_arg("ShowMenu", "client-menu"));
    binds.push(show_client_menu);

    let mut window_menu = mousebind("WindowMenu", "Left", "Click", &[]);
    window_menu
        .actions
        .push(ActionConfig::with_arg("ShowMenu", "client-menu"));
    binds.push(window_menu);

    let mut root_menu = mousebind("Root", "Right", "Press", &[]);
    root_menu
        .actions
        .push(ActionConfig::with_arg("ShowMenu", "root-menu"));
    binds.push(root_menu);

    binds
}

fn menu_item(label: &str, actions: Vec<ActionConfig>) -> MenuItemConfig {
    MenuItemConfig {
        label: label.to_string(),
        actions,
    }
}

/// Entries of the built-in window menu.
pub fn default_client_menu() -> MenuConfig {
    MenuConfig {
        id: "client-menu".to_string(),
        label: "Window".to_string(),
        items: vec![
            menu_item("Minimize", vec![ActionConfig::new("Iconify")]),
            menu_item("Maximize", vec![ActionConfig::new("ToggleMaximize")]),
            menu_item("Fullscreen", vec![ActionConfig::new("ToggleFullscreen")]),
            menu_item("Decorations", vec![ActionConfig::new("ToggleDecorations")]),
            menu_item("Always on Top", vec![ActionConfig::new("ToggleAlwaysOnTop")]),
            menu_item("Move right", vec![ActionConfig::with_arg("SendToDesktop", "right")]),
            menu_item("Move left", vec![ActionConfig::with_arg("SendToDesktop", "left")]),
            menu_item("Close", vec![ActionConfig::new("Close")]),
        ],
    }
}

fn default_menus() -> Vec<MenuConfig> {
    vec![
        MenuConfig {
            id: "root-menu".to_string(),
            label: "Stackway".to_string(),
            items: vec![
                menu_item("Terminal", vec![ActionConfig::with_arg("Execute", "foot")]),
                menu_item("Reconfigure", vec![ActionConfig::new("Reconfigure")]),
                menu_item("Exit", vec![ActionConfig::new("Exit")]),
            ],
        },
        default_client_menu(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.theme.titlebar_height, 24);
        assert_eq!(config.workspaces.names, vec!["1", "2", "3", "4"]);
        assert!(!config.keybinds.is_empty());
        assert!(config.menus.iter().any(|m| m.id == "client-menu"));
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.keybinds.len(), config.keybinds.len());
        assert_eq!(parsed.menus.len(), config.menus.len());
        assert_eq!(parsed.keybinds[2].actions, config.keybinds[2].actions);
    }

    #[test]
    fn test_action_arg_aliases() {
        let config = Config::from_toml(
            r#"
            [[keybind]]
            key = "W-Return"
            actions = [{ name = "Execute", command = "foot --server" }]

            [[keybind]]
            key = "A-Left"
            actions = [{ name = "MoveToEdge", direction = "left" }]
            "#,
        )
        .unwrap();
        assert_eq!(
            config.keybinds[0].actions[0],
            ActionConfig::with_arg("Execute", "foot --server")
        );
        assert_eq!(config.keybinds[1].actions[0].arg.as_deref(), Some("left"));
        // Sections that were not given keep their defaults.
        assert_eq!(config.theme.border_width, 1);
    }

    #[test]
    fn test_mousebind_event_defaults_to_press() {
        let config = Config::from_toml(
            r#"
            [[mousebind]]
            context = "Client"
            button = "Left"
            actions = [{ name = "Focus" }]
            "#,
        )
        .unwrap();
        assert_eq!(config.mousebinds[0].event, "Press");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[workspaces]\nnames = [\"web\", \"mail\"]\nwrap = true").unwrap();
        let config = Config::load(file.path().to_str()).unwrap();
        assert_eq!(config.workspaces.names, vec!["web", "mail"]);
        assert!(config.workspaces.wrap);
    }

    #[test]
    fn test_load_rejects_malformed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[theme]\ntitlebar_height = \"tall\"").unwrap();
        assert!(Config::load(file.path().to_str()).is_err());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let config = Config::load(path.to_str()).unwrap();
        assert_eq!(config.workspaces.names.len(), 4);
    }
}
