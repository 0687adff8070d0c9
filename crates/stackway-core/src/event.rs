//! Protocol-agnostic events and actions.
//!
//! [`CoreEvent`] represents what the host tells core about outputs and
//! input. Surface lifecycle arrives through the XWayland entry points on
//! [`Core`](crate::Core) instead, since it carries surface handles.
//! [`CoreAction`] represents what core tells the host to do.

use crate::input::Modifiers;
use crate::state::{Geometry, OutputId};

/// Events that a host sends to the core engine.
#[derive(Debug, Clone, PartialEq)]
pub enum CoreEvent {
    /// A new output (monitor) was connected.
    OutputAdded {
        id: OutputId,
        name: String,
        geometry: Geometry,
        /// Area not covered by panels; the whole output if `None`.
        usable_area: Option<Geometry>,
    },

    /// An output was disconnected.
    OutputRemoved { id: OutputId },

    /// Pointer moved to absolute position.
    PointerMotion { x: f64, y: f64 },

    /// Pointer button press/release. `button` uses Linux event codes.
    PointerButton { button: u32, pressed: bool },

    /// Key press/release, by keysym name.
    Key { key: String, pressed: bool },

    /// The set of held modifiers changed.
    Modifiers { modifiers: Modifiers },

    /// The user picked an item of the open menu.
    MenuItemSelected { index: usize },

    /// The open menu was dismissed.
    MenuClosed,
}

/// Actions that core returns to the host for execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreAction {
    /// Spawn a detached child process. `argv` is ready for exec, no shell.
    SpawnProcess { command: String, argv: Vec<String> },

    /// Reload the configuration file and hand it to
    /// [`Core::reload_config`](crate::Core::reload_config).
    ReloadConfig,

    /// Stop the event loop.
    Exit,
}
