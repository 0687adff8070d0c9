//! Actions and action lists.
//!
//! An action is created from a case-insensitive name. Names outside the
//! known set produce [`ActionType::Invalid`], which runs as a no-op, so a
//! typo in the config never takes a binding or menu down with it.

use std::fmt;

use tracing::error;

use crate::config::ActionConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionType {
    /// Unrecognized name.
    Invalid,
    /// The explicit `None` action.
    NoOp,
    Close,
    Debug,
    Execute,
    Exit,
    MoveToEdge,
    SnapToEdge,
    NextWindow,
    PreviousWindow,
    Reconfigure,
    ShowMenu,
    ToggleMaximize,
    ToggleFullscreen,
    ToggleDecorations,
    ToggleAlwaysOnTop,
    Focus,
    Iconify,
    Move,
    Raise,
    Resize,
    GoToDesktop,
    SendToDesktop,
}

const ACTION_NAMES: [(&str, ActionType); 22] = [
    ("None", ActionType::NoOp),
    ("Close", ActionType::Close),
    ("Debug", ActionType::Debug),
    ("Execute", ActionType::Execute),
    ("Exit", ActionType::Exit),
    ("MoveToEdge", ActionType::MoveToEdge),
    ("SnapToEdge", ActionType::SnapToEdge),
    ("NextWindow", ActionType::NextWindow),
    ("PreviousWindow", ActionType::PreviousWindow),
    ("Reconfigure", ActionType::Reconfigure),
    ("ShowMenu", ActionType::ShowMenu),
    ("ToggleMaximize", ActionType::ToggleMaximize),
    ("ToggleFullscreen", ActionType::ToggleFullscreen),
    ("ToggleDecorations", ActionType::ToggleDecorations),
    ("ToggleAlwaysOnTop", ActionType::ToggleAlwaysOnTop),
    ("Focus", ActionType::Focus),
    ("Iconify", ActionType::Iconify),
    ("Move", ActionType::Move),
    ("Raise", ActionType::Raise),
    ("Resize", ActionType::Resize),
    ("GoToDesktop", ActionType::GoToDesktop),
    ("SendToDesktop", ActionType::SendToDesktop),
];

impl ActionType {
    /// Look an action up by name, ignoring case. Unknown and empty names
    /// are logged and yield [`ActionType::Invalid`].
    pub fn from_name(name: &str) -> Self {
        if name.is_empty() {
            error!("Action name not specified");
            return Self::Invalid;
        }
        ACTION_NAMES
            .iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
            .map_or_else(
                || {
                    error!("Invalid action name '{}'", name);
                    Self::Invalid
                },
                |&(_, kind)| kind,
            )
    }

    pub fn name(self) -> &'static str {
        ACTION_NAMES
            .iter()
            .find(|&&(_, kind)| kind == self)
            .map_or("INVALID", |&(name, _)| name)
    }

    /// Whether the action does nothing without an argument.
    pub const fn requires_arg(self) -> bool {
        matches!(
            self,
            Self::Execute
                | Self::MoveToEdge
                | Self::SnapToEdge
                | Self::ShowMenu
                | Self::GoToDesktop
                | Self::SendToDesktop
        )
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub kind: ActionType,
    pub arg: Option<String>,
}

impl Action {
    pub fn new(name: &str, arg: Option<&str>) -> Self {
        Self {
            kind: ActionType::from_name(name),
            arg: arg.map(str::to_string),
        }
    }

    pub fn from_config(config: &ActionConfig) -> Self {
        Self::new(&config.name, config.arg.as_deref())
    }
}

/// Ordered actions run by one trigger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionList(Vec<Action>);

impl ActionList {
    pub fn from_config(configs: &[ActionConfig]) -> Self {
        configs.iter().map(Action::from_config).collect()
    }

    pub fn push(&mut self, action: Action) {
        self.0.push(action);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Action> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Action> for ActionList {
    fn from_iter<I: IntoIterator<Item = Action>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a ActionList {
    type Item = &'a Action;
    type IntoIter = std::slice::Iter<'a, Action>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
