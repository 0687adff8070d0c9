//! Stackway Core — stacking window manager policy engine
//!
//! This crate decides what happens to windows (placement, focus,
//! decorations, workspace membership) and leaves drawing and protocol
//! framing to the compositing library, which it reaches only through the
//! [`SceneGraph`](scene::SceneGraph), [`XwaylandSurface`](surface::XwaylandSurface)
//! and [`WlSurface`](surface::WlSurface) traits.
//!
//! Hosts feed input and output changes as [`CoreEvent`]s, deliver surface
//! signals through [`Core::xwayland_notify`] and [`Core::surface_commit`],
//! and apply the returned [`CoreAction`]s.
//!
//! # Quick Start
//! ```
//! use std::rc::Rc;
//!
//! use stackway_core::config::Config;
//! use stackway_core::headless::{HeadlessScene, HeadlessXSurface};
//! use stackway_core::surface::{SurfaceId, XwaylandEvent, XwaylandSurface};
//! use stackway_core::{Core, CoreEvent, Geometry, OutputId};
//!
//! let mut core = Core::new(Config::default(), Box::new(HeadlessScene::default()));
//! core.handle_event(CoreEvent::OutputAdded {
//!     id: OutputId(1),
//!     name: "HDMI-A-1".into(),
//!     geometry: Geometry::new(0, 0, 1920, 1080),
//!     usable_area: None,
//! });
//!
//! // An X client creates and maps a window
//! let window: Rc<dyn XwaylandSurface> = Rc::new(HeadlessXSurface::new(
//!     SurfaceId(1),
//!     Geometry::new(0, 0, 640, 480),
//! ));
//! core.xwayland_new_surface(Rc::clone(&window));
//! core.xwayland_notify(&window, XwaylandEvent::Map);
//!
//! assert!(core.focused_view().is_some());
//! ```

pub mod action;
pub mod config;
pub mod debug;
pub mod desktop;
pub mod engine;
pub mod event;
pub mod headless;
pub mod input;
pub mod interactive;
pub mod invariants;
pub mod menu;
pub mod osd;
pub mod pending;
pub mod scene;
pub mod signal;
pub mod spawn;
pub mod ssd;
pub mod state;
pub mod surface;
pub mod view;
pub mod workspace;
pub mod xwayland;

// Re-export primary API types at crate root
pub use action::{Action, ActionList, ActionType};
pub use event::{CoreAction, CoreEvent};
pub use state::{Geometry, OutputId};
pub use view::ViewId;
pub use workspace::WorkspaceId;

use tracing::{debug, info, warn};

use config::Config;
use input::{Bindings, Modifiers, MouseButton, MouseEvent};
use interactive::ResizeEdges;
use scene::SceneGraph;
use ssd::SsdPartType;
use state::{Output, State};
use view::View;
use xwayland::UnmanagedId;

/// A pointer button held down since it was pressed over `part`.
#[derive(Debug, Clone, Copy)]
struct ButtonPress {
    button: MouseButton,
    view: Option<ViewId>,
    part: SsdPartType,
    dragged: bool,
}

/// The protocol-agnostic window manager engine.
///
/// Owns all WM state and the scene graph handle. Every entry point runs
/// to completion; side effects on views are immediate.
pub struct Core {
    /// All window-manager state
    pub state: State,
    /// Scene graph of the compositing library
    pub scene: Box<dyn SceneGraph>,
    bindings: Bindings,
    press: Option<ButtonPress>,
    /// Host actions queued by the entry point currently running
    actions: Vec<CoreAction>,
    next_view: u64,
    next_unmanaged: u64,
    /// Exit requested
    pub should_exit: bool,
}

impl Core {
    /// Create a new core engine with the given configuration.
    pub fn new(config: Config, mut scene: Box<dyn SceneGraph>) -> Self {
        let state = State::new(config, scene.as_mut());
        let bindings = Bindings::from_config(&state.config.keybinds, &state.config.mousebinds);

        Self {
            state,
            scene,
            bindings,
            press: None,
            actions: Vec::new(),
            next_view: 1,
            next_unmanaged: 1,
            should_exit: false,
        }
    }

    pub(crate) fn next_view_id(&mut self) -> ViewId {
        let id = ViewId(self.next_view);
        self.next_view += 1;
        id
    }

    pub(crate) fn next_unmanaged_id(&mut self) -> UnmanagedId {
        let id = UnmanagedId(self.next_unmanaged);
        self.next_unmanaged += 1;
        id
    }

    /// Spawn the configured startup commands.
    pub fn startup(&mut self) -> Vec<CoreAction> {
        let commands: Vec<String> = self
            .state
            .config
            .startup
            .iter()
            .map(|startup| startup.command.clone())
            .collect();
        for command in commands {
            self.spawn_command(&command);
        }
        self.finish("startup")
    }

    // ── Event handling (host → core) ─────────────────────────────────

    /// Process a host event. Returns actions the host must apply.
    pub fn handle_event(&mut self, event: CoreEvent) -> Vec<CoreAction> {
        match event {
            CoreEvent::OutputAdded {
                id,
                name,
                geometry,
                usable_area,
            } => self.on_output_added(id, name, geometry, usable_area),

            CoreEvent::OutputRemoved { id } => self.on_output_removed(id),

            CoreEvent::PointerMotion { x, y } => self.on_pointer_motion(x, y),

            CoreEvent::PointerButton { button, pressed } => {
                self.on_pointer_button(button, pressed);
            }

            CoreEvent::Key { key, pressed } => self.on_key(&key, pressed),

            CoreEvent::Modifiers { modifiers } => self.on_modifiers(modifiers),

            CoreEvent::MenuItemSelected { index } => self.menu_item_select(index),

            CoreEvent::MenuClosed => self.menu_close(),
        }

        self.finish("handle_event")
    }

    /// Validate invariants in debug builds and hand out queued actions.
    pub(crate) fn finish(&mut self, context: &str) -> Vec<CoreAction> {
        self.check_invariants(context);
        std::mem::take(&mut self.actions)
    }

    pub(crate) fn check_invariants(&self, context: &str) {
        #[cfg(debug_assertions)]
        if let Err(e) = self.state.validate_invariants() {
            warn!("Invariant violation after {}: {}", context, e);
        }
        #[cfg(not(debug_assertions))]
        let _ = (self, context);
    }

    // ── Event handlers ───────────────────────────────────────────────

    fn on_output_added(
        &mut self,
        id: OutputId,
        name: String,
        geometry: Geometry,
        usable_area: Option<Geometry>,
    ) {
        info!("Output {} ({}) added: {:?}", name, id, geometry);
        self.state.outputs.insert(
            id,
            Output {
                id,
                name,
                geometry,
                usable_area: usable_area.unwrap_or(geometry),
            },
        );

        let homeless: Vec<ViewId> = self
            .state
            .views
            .values()
            .filter(|toplevel| toplevel.view.output.is_none())
            .map(|toplevel| toplevel.view.id)
            .collect();
        for view in homeless {
            self.view_discover_output(view);
        }
    }

    fn on_output_removed(&mut self, id: OutputId) {
        if self.state.outputs.shift_remove(&id).is_none() {
            return;
        }
        info!("Output {} removed", id);

        let stranded: Vec<ViewId> = self
            .state
            .views
            .values()
            .filter(|toplevel| toplevel.view.output == Some(id))
            .map(|toplevel| toplevel.view.id)
            .collect();
        for view in stranded {
            self.view_discover_output(view);
        }
    }

    fn on_pointer_motion(&mut self, x: f64, y: f64) {
        self.state.cursor = (x, y);

        // Handle grab (move/resize in progress)
        if self.state.grab.is_some() {
            self.interactive_motion();
            return;
        }

        if let Some(press) = self.press.as_mut() {
            if !press.dragged {
                press.dragged = true;
                let press = *press;
                self.run_mousebinds(press.view, press.part, press.button, MouseEvent::Drag);
            }
            return;
        }

        // Focus-follows-mouse
        if self.state.config.general.focus_follows_mouse {
            if let Some((id, _)) = self.desktop_view_at(x, y) {
                if self.state.focus.focused_view != Some(id) {
                    self.desktop_focus_and_activate_view(Some(id));
                    if self.state.config.general.raise_on_focus {
                        self.desktop_move_to_front(id);
                    }
                }
            }
        }
    }

    fn on_pointer_button(&mut self, code: u32, pressed: bool) {
        let Some(button) = MouseButton::from_code(code) else {
            debug!("Ignoring pointer button {:#x}", code);
            return;
        };
        let (x, y) = self.state.cursor;
        let (view, part) = self
            .desktop_view_at(x, y)
            .map_or((None, SsdPartType::Root), |(id, part)| (Some(id), part));

        if pressed {
            // A click anywhere dismisses an open menu.
            if self.state.menus.close().is_some() {
                return;
            }
            self.press = Some(ButtonPress {
                button,
                view,
                part,
                dragged: false,
            });
            self.run_mousebinds(view, part, button, MouseEvent::Press);
            return;
        }

        let press = self.press.take();
        if self.state.grab.is_some() {
            self.interactive_end();
            return;
        }
        self.run_mousebinds(view, part, button, MouseEvent::Release);

        if let Some(press) = press {
            if press.button == button && !press.dragged && press.view == view && press.part == part {
                self.run_mousebinds(view, part, button, MouseEvent::Click);
            }
        }
    }

    fn run_mousebinds(
        &mut self,
        view: Option<ViewId>,
        part: SsdPartType,
        button: MouseButton,
        event: MouseEvent,
    ) {
        let lists: Vec<ActionList> = self
            .bindings
            .mousebinds_for(part, self.state.modifiers, button, event)
            .map(|bind| bind.actions.clone())
            .collect();
        let edges = part.resize_edges();
        for actions in &lists {
            self.dispatch_actions(view, actions, edges);
        }
    }

    fn on_key(&mut self, key: &str, pressed: bool) {
        if !pressed {
            return;
        }
        let Some(actions) = self
            .bindings
            .keybind(self.state.modifiers, key)
            .map(|bind| bind.actions.clone())
        else {
            return;
        };
        self.dispatch_actions(None, &actions, ResizeEdges::empty());
    }

    fn on_modifiers(&mut self, modifiers: Modifiers) {
        self.state.modifiers = modifiers;
        // Releasing every modifier ends window cycling.
        if modifiers.is_empty() && self.state.cycle_view.is_some() {
            self.desktop_cycle_finish();
        }
    }

    // ── Configuration ────────────────────────────────────────────────

    /// Reload configuration from the given config value.
    ///
    /// Bindings, menus and theme are rebuilt; views and workspaces stay.
    pub fn reload_config(&mut self, config: Config) {
        self.bindings = Bindings::from_config(&config.keybinds, &config.mousebinds);
        self.state.menus = menu::MenuRegistry::from_config(&config.menus);
        self.state.workspaces.set_wrap(config.workspaces.wrap);
        self.state.config = config;
        info!("Configuration reloaded");
        self.check_invariants("reload_config");
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Access the focused view ID.
    pub fn focused_view(&self) -> Option<ViewId> {
        self.state.focus.focused_view
    }

    pub fn view(&self, id: ViewId) -> Option<&View> {
        self.state.view(id)
    }

    pub fn current_workspace(&self) -> WorkspaceId {
        self.state.workspaces.current()
    }
}
