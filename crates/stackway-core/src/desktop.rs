//! Focus, stacking and window cycling.

use tracing::debug;

use crate::ssd::{self, SsdPartType};
use crate::view::{ViewFlags, ViewId};
use crate::Core;

/// Direction of a window-cycling step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleDir {
    /// Down the stack, away from the topmost view.
    Forward,
    Backward,
}

impl Core {
    /// Give keyboard focus to a view and activate it.
    ///
    /// A minimized view is restored instead; mapping it focuses it again.
    /// Views on other workspaces are never focused. `None` clears focus.
    pub fn desktop_focus_and_activate_view(&mut self, id: Option<ViewId>) {
        let Some(id) = id else {
            self.desktop_unfocus();
            return;
        };
        let Some(view) = self.state.view(id) else {
            return;
        };
        if view.is_minimized() {
            self.view_minimize(id, false);
            return;
        }
        if !self.state.is_view_visible(id) || self.state.focus.focused_view == Some(id) {
            return;
        }

        if let Some(previous) = self.state.focus.focused_view {
            self.view_set_activated(previous, false);
        }
        self.view_set_activated(id, true);
        self.state.focus.set_focused(Some(id));
        debug!("Focused {}", id);
    }

    pub fn desktop_unfocus(&mut self) {
        if let Some(previous) = self.state.focus.focused_view {
            self.view_set_activated(previous, false);
        }
        self.state.focus.set_focused(None);
    }

    fn view_set_activated(&mut self, id: ViewId, activated: bool) {
        self.with_toplevel(id, |view, imp, _| {
            imp.set_activated(activated);
            view.flags.set(ViewFlags::ACTIVATED, activated);
            view.ssd.active = activated;
        });
    }

    /// Focus the topmost visible view, or nothing if there is none.
    pub fn desktop_focus_topmost_mapped_view(&mut self) {
        let topmost = self.state.visible_views_topmost_first().first().copied();
        self.desktop_focus_and_activate_view(topmost);
    }

    /// Raise a view above every other view of its layer.
    pub fn desktop_move_to_front(&mut self, id: ViewId) {
        let Some(index) = self.state.views.get_index_of(&id) else {
            return;
        };
        let top = self.state.views.len() - 1;
        self.state.views.move_index(index, top);
        if let Some(view) = self.state.view(id) {
            self.scene.raise_to_top(view.scene_tree);
        }
    }

    /// Topmost visible view under a layout point and the part of it hit.
    pub fn desktop_view_at(&self, x: f64, y: f64) -> Option<(ViewId, SsdPartType)> {
        let theme = &self.state.config.theme;
        self.state
            .visible_views_topmost_first()
            .into_iter()
            .find_map(|id| {
                let view = self.state.view(id)?;
                let part = ssd::part_at(view, theme, x, y);
                (part != SsdPartType::None).then_some((id, part))
            })
    }

    /// Views window cycling can select, topmost first: those on the
    /// current workspace or pinned, mapped or minimized.
    pub(crate) fn cycle_candidates(&self) -> Vec<ViewId> {
        let current = self.state.workspaces.current();
        let mut pinned = Vec::new();
        let mut normal = Vec::new();
        for (&id, toplevel) in self.state.views.iter().rev() {
            let view = &toplevel.view;
            if !view.is_mapped() && !view.is_minimized() {
                continue;
            }
            if view.flags.contains(ViewFlags::ALWAYS_ON_TOP) {
                pinned.push(id);
            } else if view.workspace == current {
                normal.push(id);
            }
        }
        pinned.extend(normal);
        pinned
    }

    /// Next view to select when cycling from `start`.
    ///
    /// Without a start, the first step selects the topmost view unless it
    /// already has focus, in which case it steps on from there. Both
    /// directions wrap.
    pub fn desktop_cycle_view(&self, start: Option<ViewId>, dir: CycleDir) -> Option<ViewId> {
        let candidates = self.cycle_candidates();
        let &topmost = candidates.first()?;
        let index = match start.and_then(|id| candidates.iter().position(|&c| c == id)) {
            Some(index) => index,
            None if self.state.focus.focused_view != Some(topmost) => return Some(topmost),
            None => 0,
        };
        let len = candidates.len();
        let next = match dir {
            CycleDir::Forward => (index + 1) % len,
            CycleDir::Backward => (index + len - 1) % len,
        };
        candidates.get(next).copied()
    }

    /// Stop cycling: focus and raise the selected view, hide the overlay.
    pub fn desktop_cycle_finish(&mut self) {
        let Some(id) = self.state.cycle_view.take() else {
            return;
        };
        self.osd_update();
        self.desktop_focus_and_activate_view(Some(id));
        self.desktop_move_to_front(id);
    }
}
