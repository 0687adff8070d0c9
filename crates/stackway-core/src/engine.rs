//! Action dispatch.
//!
//! The target view is resolved again before every action of a list:
//! earlier actions may focus, close or destroy views, and later actions
//! must act on the state they left behind.

use tracing::{debug, error, info};

use crate::action::{Action, ActionList, ActionType};
use crate::desktop::CycleDir;
use crate::event::CoreAction;
use crate::interactive::{GrabMode, ResizeEdges};
use crate::spawn;
use crate::view::ViewId;
use crate::Core;

impl Core {
    /// Run an action list and return what the host has to do.
    ///
    /// `activator` is the view the trigger originated from, if any;
    /// `resize_edges` is used by `Resize`.
    pub fn run_actions(
        &mut self,
        activator: Option<ViewId>,
        actions: &ActionList,
        resize_edges: ResizeEdges,
    ) -> Vec<CoreAction> {
        self.dispatch_actions(activator, actions, resize_edges);
        self.finish("run_actions")
    }

    pub(crate) fn dispatch_actions(
        &mut self,
        activator: Option<ViewId>,
        actions: &ActionList,
        resize_edges: ResizeEdges,
    ) {
        for action in actions {
            let view = self.action_target(activator);
            debug!("Handling action {} with arg {:?}", action.kind, action.arg);
            self.run_action(view, action, resize_edges);
        }
    }

    /// The activator while it still exists, otherwise the focused view.
    /// An activator that has been destroyed resolves to no view at all.
    fn action_target(&self, activator: Option<ViewId>) -> Option<ViewId> {
        match activator {
            Some(id) => self.state.views.contains_key(&id).then_some(id),
            None => self.state.focus.focused_view,
        }
    }

    fn view_under_cursor(&self) -> Option<ViewId> {
        let (x, y) = self.state.cursor;
        self.desktop_view_at(x, y).map(|(id, _)| id)
    }

    fn run_action(&mut self, view: Option<ViewId>, action: &Action, resize_edges: ResizeEdges) {
        let arg = action.arg.as_deref();
        if action.kind.requires_arg() && arg.is_none() {
            error!("Missing argument for {}", action.kind);
            return;
        }

        match action.kind {
            ActionType::Invalid => {
                error!("Not executing unknown action with arg {:?}", arg);
            }
            ActionType::NoOp => {}
            ActionType::Close => {
                if let Some(id) = view {
                    self.view_close(id);
                }
            }
            ActionType::Debug => self.debug_dump(),
            ActionType::Execute => {
                if let Some(command) = arg {
                    self.spawn_command(command);
                }
            }
            ActionType::Exit => {
                self.should_exit = true;
                self.actions.push(CoreAction::Exit);
            }
            ActionType::MoveToEdge => {
                if let (Some(id), Some(direction)) = (view, arg) {
                    self.view_move_to_edge(id, direction);
                }
            }
            ActionType::SnapToEdge => {
                if let (Some(id), Some(direction)) = (view, arg) {
                    self.view_snap_to_edge(id, direction);
                }
            }
            ActionType::NextWindow => {
                self.state.cycle_view = self.desktop_cycle_view(self.state.cycle_view, CycleDir::Forward);
                self.osd_update();
            }
            ActionType::PreviousWindow => {
                self.state.cycle_view = self.desktop_cycle_view(self.state.cycle_view, CycleDir::Backward);
                self.osd_update();
            }
            ActionType::Reconfigure => self.actions.push(CoreAction::ReloadConfig),
            ActionType::ShowMenu => self.show_menu(view, arg),
            ActionType::ToggleMaximize => {
                if let Some(id) = view {
                    self.view_toggle_maximize(id);
                }
            }
            ActionType::ToggleFullscreen => {
                if let Some(id) = view {
                    self.view_toggle_fullscreen(id);
                }
            }
            ActionType::ToggleDecorations => {
                if let Some(id) = view {
                    self.view_toggle_decorations(id);
                }
            }
            ActionType::ToggleAlwaysOnTop => {
                if let Some(id) = view {
                    self.view_toggle_always_on_top(id);
                }
            }
            ActionType::Focus => {
                if let Some(id) = self.view_under_cursor() {
                    self.desktop_focus_and_activate_view(Some(id));
                }
            }
            ActionType::Iconify => {
                if let Some(id) = view {
                    self.view_minimize(id, true);
                }
            }
            ActionType::Move => {
                if let Some(id) = self.view_under_cursor() {
                    self.interactive_begin(id, GrabMode::Move, ResizeEdges::empty());
                }
            }
            ActionType::Raise => {
                if let Some(id) = view {
                    self.desktop_move_to_front(id);
                }
            }
            ActionType::Resize => {
                if let Some(id) = self.view_under_cursor() {
                    self.interactive_begin(id, GrabMode::Resize, resize_edges);
                }
            }
            ActionType::GoToDesktop => {
                let current = self.state.workspaces.current();
                if let Some(target) = arg.and_then(|name| self.state.workspaces.find(current, name)) {
                    self.workspaces_switch_to(target);
                }
            }
            ActionType::SendToDesktop => {
                let anchor = view.and_then(|id| self.state.view(id)).map(|v| v.workspace);
                let target = anchor.zip(arg).and_then(|(anchor, name)| {
                    self.state.workspaces.find(anchor, name)
                });
                if let (Some(id), Some(target)) = (view, target) {
                    self.workspaces_send_to(id, target);
                }
            }
        }
    }

    /// Queue a detached spawn of `command` for the host.
    pub(crate) fn spawn_command(&mut self, command: &str) {
        let expanded = spawn::expand_shell_variables(command);
        match spawn::parse_argv(&expanded) {
            Ok(argv) => {
                info!("Spawning: {}", expanded);
                self.actions.push(CoreAction::SpawnProcess {
                    command: expanded,
                    argv,
                });
            }
            Err(e) => error!("Failed to parse command '{}': {}", command, e),
        }
    }

    fn debug_dump(&self) {
        match self.dump_state() {
            Ok(json) => info!("State dump:\n{}", json),
            Err(e) => error!("Failed to dump state: {}", e),
        }
    }
}
