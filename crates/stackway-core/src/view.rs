//! Managed views.
//!
//! A [`View`] is the protocol-independent record of a top-level window;
//! everything protocol specific sits behind the [`ViewImpl`] it is paired
//! with in a [`Toplevel`]. The `view_*` operations on [`Core`] implement the
//! window policy on top of those two halves.

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::pending::{PendingMoveResize, Reconcile};
use crate::scene::{NodeId, SceneGraph};
use crate::ssd::{self, Ssd};
use crate::state::{Border, Geometry, OutputId};
use crate::workspace::WorkspaceId;
use crate::Core;

/// Smallest size a view may be configured to.
pub const MIN_VIEW_WIDTH: i32 = 100;
pub const MIN_VIEW_HEIGHT: i32 = 60;

/// Unique, opaque identifier for a managed view.
///
/// Backends keep their own mapping from protocol handles to this ID; the
/// core never stores protocol pointers for lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ViewId(pub u64);

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "view:{}", self.0)
    }
}

bitflags! {
    /// View state flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ViewFlags: u16 {
        const MAPPED        = 0b0000_0001;
        /// Set on the first map and never cleared.
        const BEEN_MAPPED   = 0b0000_0010;
        const MAXIMIZED     = 0b0000_0100;
        const FULLSCREEN    = 0b0000_1000;
        const MINIMIZED     = 0b0001_0000;
        const ALWAYS_ON_TOP = 0b0010_0000;
        const ACTIVATED     = 0b0100_0000;
    }
}

/// Output edge named by `MoveToEdge` / `SnapToEdge`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Edge {
    Left,
    Right,
    Up,
    Down,
}

impl Edge {
    pub fn parse(direction: &str) -> Option<Self> {
        match direction.to_lowercase().as_str() {
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            _ => None,
        }
    }
}

/// Protocol-independent state of a managed view.
#[derive(Debug, Clone)]
pub struct View {
    pub id: ViewId,
    /// Client area in layout coordinates, excluding decorations.
    pub geometry: Geometry,
    /// Floating geometry to return to after maximize, fullscreen or snap.
    pub natural_geometry: Geometry,
    pub flags: ViewFlags,
    pub workspace: WorkspaceId,
    pub output: Option<OutputId>,
    pub pending: PendingMoveResize,
    pub ssd: Ssd,
    /// Edge the view is snapped to, if any.
    pub tiled: Option<Edge>,
    pub scene_tree: NodeId,
    /// Drawable subtree of the client surface; present exactly while mapped.
    pub surface_tree: Option<NodeId>,
    pub title: String,
    pub app_id: String,
}

impl View {
    pub fn new(id: ViewId, workspace: WorkspaceId, scene_tree: NodeId) -> Self {
        Self {
            id,
            geometry: Geometry::default(),
            natural_geometry: Geometry::default(),
            flags: ViewFlags::empty(),
            workspace,
            output: None,
            pending: PendingMoveResize::default(),
            ssd: Ssd::default(),
            tiled: None,
            scene_tree,
            surface_tree: None,
            title: String::new(),
            app_id: String::new(),
        }
    }

    pub const fn is_mapped(&self) -> bool {
        self.flags.contains(ViewFlags::MAPPED)
    }

    pub const fn is_maximized(&self) -> bool {
        self.flags.contains(ViewFlags::MAXIMIZED)
    }

    pub const fn is_fullscreen(&self) -> bool {
        self.flags.contains(ViewFlags::FULLSCREEN)
    }

    pub const fn is_minimized(&self) -> bool {
        self.flags.contains(ViewFlags::MINIMIZED)
    }

    fn store_natural_geometry(&mut self) {
        if self.tiled.is_none() && !self.is_maximized() && !self.is_fullscreen() {
            self.natural_geometry = self.geometry;
        }
    }
}

/// Clamp a requested size to the minimum view size.
pub fn adjust_size(width: i32, height: i32) -> (i32, i32) {
    (width.max(MIN_VIEW_WIDTH), height.max(MIN_VIEW_HEIGHT))
}

/// Result of asking a backend to map a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapOutcome {
    /// The view was already mapped; nothing happened.
    AlreadyMapped,
    Mapped,
    /// The drawable subtree could not be created; the view stays unmapped.
    Failed,
}

/// Protocol-specific half of a view.
///
/// Each client protocol (currently only legacy X through XWayland)
/// provides one implementation. `map` and `unmap` must be idempotent.
pub trait ViewImpl: fmt::Debug {
    /// Ask the client to take `geo`. The view geometry follows on commit.
    fn configure(&mut self, view: &mut View, geo: Geometry);

    /// Reposition without changing the size.
    fn move_to(&mut self, view: &mut View, x: i32, y: i32);

    /// Request `geo`, as a plain move when only the position differs.
    ///
    /// A client that is asked for its current size commits nothing new,
    /// so such a request is applied as a move instead of a configure.
    fn move_resize(&mut self, view: &mut View, geo: Geometry) {
        if view.geometry.width == geo.width && view.geometry.height == geo.height {
            self.move_to(view, geo.x, geo.y);
        } else {
            self.configure(view, geo);
        }
    }

    fn close(&mut self);

    fn map(&mut self, view: &mut View, scene: &mut dyn SceneGraph) -> MapOutcome;

    /// Returns whether the view went from mapped to unmapped.
    fn unmap(&mut self, view: &mut View, scene: &mut dyn SceneGraph) -> bool;

    /// Fold a surface commit into the view geometry.
    fn commit(&mut self, view: &mut View) -> Reconcile;

    fn set_activated(&mut self, activated: bool);

    fn set_fullscreen(&mut self, fullscreen: bool);

    fn maximize(&mut self, maximized: bool);

    /// Named string property (`title`, `class`, `app_id`); empty if unknown.
    fn get_string_prop(&self, prop: &str) -> String;

    fn wants_decorations(&self) -> bool;

    fn wants_fullscreen(&self) -> bool;

    /// Whether the commit listener is registered.
    fn is_observing_commits(&self) -> bool;
}

/// A view together with its backend.
#[derive(Debug)]
pub struct Toplevel {
    pub view: View,
    pub(crate) imp: Box<dyn ViewImpl>,
}

impl Toplevel {
    pub fn new(view: View, imp: Box<dyn ViewImpl>) -> Self {
        Self { view, imp }
    }

    pub fn backend(&self) -> &dyn ViewImpl {
        self.imp.as_ref()
    }
}

// ── View operations ──────────────────────────────────────────────────

impl Core {
    /// Run `f` on a view, its backend and the scene. `None` if the view
    /// does not exist.
    pub(crate) fn with_toplevel<R>(
        &mut self,
        id: ViewId,
        f: impl FnOnce(&mut View, &mut dyn ViewImpl, &mut dyn SceneGraph) -> R,
    ) -> Option<R> {
        let toplevel = self.state.views.get_mut(&id)?;
        Some(f(
            &mut toplevel.view,
            toplevel.imp.as_mut(),
            self.scene.as_mut(),
        ))
    }

    /// Map the view and apply first-map policy. Idempotent.
    pub fn view_map(&mut self, id: ViewId) {
        match self.with_toplevel(id, |view, imp, scene| imp.map(view, scene)) {
            Some(MapOutcome::Mapped) => {}
            Some(MapOutcome::Failed) => {
                error!("Failed to map {}", id);
                return;
            }
            Some(MapOutcome::AlreadyMapped) | None => return,
        }

        let wants_fullscreen = self
            .state
            .views
            .get(&id)
            .is_some_and(|t| t.imp.wants_fullscreen() && !t.view.is_fullscreen());
        if wants_fullscreen {
            self.view_set_fullscreen(id, true);
        }

        let first_map = self
            .state
            .view(id)
            .is_some_and(|view| !view.flags.contains(ViewFlags::BEEN_MAPPED));
        if first_map {
            self.view_first_map(id);
        }

        let needs_boundary_check = self.state.view(id).is_some_and(|view| {
            view.ssd.enabled && !view.is_fullscreen() && !view.is_maximized()
        });
        if needs_boundary_check {
            self.view_top_left_edge_boundary_check(id);
        }

        if let Some(view) = self.state.view(id) {
            self.scene
                .set_position(view.scene_tree, view.geometry.x, view.geometry.y);
        }
        self.view_update_title(id);
        self.view_update_app_id(id);

        info!("Mapped {}", id);
        self.desktop_focus_and_activate_view(Some(id));
        self.desktop_move_to_front(id);
    }

    /// One-time setup: decorations, placement and output discovery.
    fn view_first_map(&mut self, id: ViewId) {
        let theme = self.state.config.theme.clone();
        let area = self.state.usable_area_at_cursor();
        let Some(toplevel) = self.state.views.get_mut(&id) else {
            return;
        };
        let wants_decorations = toplevel.imp.wants_decorations();
        let view = &mut toplevel.view;
        view.ssd.enabled = wants_decorations;
        view.ssd.margin = if wants_decorations {
            ssd::thickness(&theme)
        } else {
            Border::default()
        };
        let place = !view.is_maximized() && !view.is_fullscreen();
        view.flags.insert(ViewFlags::BEEN_MAPPED);

        if place {
            if let Some(area) = area {
                self.view_center_in(id, area);
            }
        }
        self.view_discover_output(id);

        if let Some(view) = self.state.view_mut(id) {
            if view.ssd.enabled {
                view.ssd.create(view.scene_tree, view.geometry, self.scene.as_mut());
                if view.is_fullscreen() {
                    view.ssd.set_visible(false, self.scene.as_mut());
                }
            }
        }
    }

    /// Keep the decorations from ending up off the top-left of the layout.
    fn view_top_left_edge_boundary_check(&mut self, id: ViewId) {
        let Some(view) = self.state.view(id) else {
            return;
        };
        let deco = ssd::max_extents(view);
        let mut x = view.geometry.x;
        let mut y = view.geometry.y;
        if deco.x < 0 {
            x -= deco.x;
        }
        if deco.y < 0 {
            y -= deco.y;
        }
        if (x, y) != (view.geometry.x, view.geometry.y) {
            self.view_move(id, x, y);
        }
    }

    /// Unmap the view; focus moves on if it had it. Idempotent.
    pub fn view_unmap(&mut self, id: ViewId) {
        let unmapped = self
            .with_toplevel(id, |view, imp, scene| imp.unmap(view, scene))
            .unwrap_or(false);
        if !unmapped {
            return;
        }
        info!("Unmapped {}", id);

        if self.state.grab.is_some_and(|grab| grab.view == id) {
            self.interactive_end();
        }
        if self.state.cycle_view == Some(id) {
            self.state.cycle_view = None;
            self.osd_update();
        }
        if self.state.focus.focused_view == Some(id) {
            if let Some(view) = self.state.view_mut(id) {
                view.flags.remove(ViewFlags::ACTIVATED);
                view.ssd.active = false;
            }
            self.state.focus.set_focused(None);
            self.desktop_focus_topmost_mapped_view();
        }
    }

    /// Fold a surface commit into the view and move its scene node.
    pub fn view_commit(&mut self, id: ViewId) {
        let outcome = self.with_toplevel(id, |view, imp, scene| {
            let outcome = imp.commit(view);
            if outcome == Reconcile::Moved {
                scene.set_position(view.scene_tree, view.geometry.x, view.geometry.y);
            }
            if outcome != Reconcile::Unchanged {
                view.ssd.update_geometry(view.geometry, scene);
            }
            outcome
        });
        if outcome == Some(Reconcile::Moved) {
            self.view_discover_output(id);
        }
    }

    /// Tear the view down. Unmaps first if needed; afterwards nothing in
    /// the core refers to `id` any more.
    pub fn view_destroy(&mut self, id: ViewId) {
        if self.state.view(id).is_some_and(View::is_mapped) {
            self.view_unmap(id);
        }
        let Some(mut toplevel) = self.state.views.shift_remove(&id) else {
            return;
        };

        self.state.menus.forget_view(id);
        self.state.focus.forget(id);
        if self.state.cycle_view == Some(id) {
            self.state.cycle_view = None;
            self.osd_update();
        }
        if self.state.grab.is_some_and(|grab| grab.view == id) {
            self.state.grab = None;
        }

        toplevel.view.ssd.destroy(self.scene.as_mut());
        self.scene.destroy(toplevel.view.scene_tree);
        debug!("Destroyed {}", id);
    }

    pub fn view_move_resize(&mut self, id: ViewId, geo: Geometry) {
        self.with_toplevel(id, |view, imp, scene| {
            imp.move_resize(view, geo);
            scene.set_position(view.scene_tree, view.geometry.x, view.geometry.y);
            view.ssd.update_geometry(view.geometry, scene);
        });
    }

    pub fn view_move(&mut self, id: ViewId, x: i32, y: i32) {
        self.with_toplevel(id, |view, imp, scene| {
            imp.move_to(view, x, y);
            scene.set_position(view.scene_tree, view.geometry.x, view.geometry.y);
            view.ssd.update_geometry(view.geometry, scene);
        });
        self.view_discover_output(id);
    }

    /// Center the view (including its decorations) in `area`.
    pub fn view_center_in(&mut self, id: ViewId, area: Geometry) {
        let Some(view) = self.state.view(id) else {
            return;
        };
        let margin = view.ssd.margin;
        let frame_width = view.geometry.width + margin.left + margin.right;
        let frame_height = view.geometry.height + margin.top + margin.bottom;
        let x = area.x + (area.width - frame_width) / 2 + margin.left;
        let y = area.y + (area.height - frame_height) / 2 + margin.top;
        self.view_move(id, x, y);
    }

    pub fn view_center(&mut self, id: ViewId) {
        if let Some(area) = self.view_usable_area(id) {
            self.view_center_in(id, area);
        }
    }

    /// Remember the output the view's center lies on.
    pub fn view_discover_output(&mut self, id: ViewId) {
        let Some(view) = self.state.view(id) else {
            return;
        };
        let geometry = view.geometry;
        let (cx, cy) = geometry.center();
        let output = self
            .state
            .outputs
            .values()
            .find(|output| output.geometry.contains(cx, cy))
            .or_else(|| {
                self.state
                    .outputs
                    .values()
                    .find(|output| output.geometry.intersects(geometry))
            })
            .or_else(|| self.state.outputs.values().next())
            .map(|output| output.id);
        if let Some(view) = self.state.view_mut(id) {
            view.output = output;
        }
    }

    fn view_output(&self, id: ViewId) -> Option<&crate::state::Output> {
        let view = self.state.view(id)?;
        view.output
            .and_then(|output| self.state.outputs.get(&output))
            .or_else(|| self.state.outputs.values().next())
    }

    pub fn view_usable_area(&self, id: ViewId) -> Option<Geometry> {
        self.view_output(id).map(|output| output.usable_area)
    }

    pub fn view_output_geometry(&self, id: ViewId) -> Option<Geometry> {
        self.view_output(id).map(|output| output.geometry)
    }

    /// Minimizing unmaps the view; restoring maps it again.
    pub fn view_minimize(&mut self, id: ViewId, minimized: bool) {
        let Some(view) = self.state.view_mut(id) else {
            return;
        };
        if view.is_minimized() == minimized {
            return;
        }
        view.flags.set(ViewFlags::MINIMIZED, minimized);
        if minimized {
            self.view_unmap(id);
        } else {
            self.view_map(id);
        }
    }

    pub fn view_toggle_maximize(&mut self, id: ViewId) {
        if let Some(view) = self.state.view(id) {
            let maximized = view.is_maximized();
            self.view_maximize(id, !maximized);
        }
    }

    pub fn view_maximize(&mut self, id: ViewId, maximize: bool) {
        let Some(view) = self.state.view(id) else {
            return;
        };
        if view.is_fullscreen() || view.is_maximized() == maximize {
            return;
        }
        let margin = view.ssd.margin;
        let target = if maximize {
            let Some(area) = self.view_usable_area(id) else {
                debug!("Not maximizing {}: no output", id);
                return;
            };
            area.shrink(margin)
        } else {
            view.natural_geometry
        };

        self.with_toplevel(id, |view, imp, scene| {
            if maximize {
                view.store_natural_geometry();
                view.tiled = None;
            }
            imp.maximize(maximize);
            view.flags.set(ViewFlags::MAXIMIZED, maximize);
            view.ssd.squared_corners = maximize;
            if !target.is_empty() {
                imp.move_resize(view, target);
                scene.set_position(view.scene_tree, view.geometry.x, view.geometry.y);
            }
        });
    }

    pub fn view_toggle_fullscreen(&mut self, id: ViewId) {
        if let Some(view) = self.state.view(id) {
            let fullscreen = view.is_fullscreen();
            self.view_set_fullscreen(id, !fullscreen);
        }
    }

    pub fn view_set_fullscreen(&mut self, id: ViewId, fullscreen: bool) {
        let Some(view) = self.state.view(id) else {
            return;
        };
        if view.is_fullscreen() == fullscreen {
            return;
        }
        let target = if fullscreen {
            let Some(output) = self.view_output_geometry(id) else {
                debug!("Not making {} fullscreen: no output", id);
                return;
            };
            output
        } else if view.is_maximized() {
            self.view_usable_area(id)
                .map_or(view.natural_geometry, |area| area.shrink(view.ssd.margin))
        } else {
            view.natural_geometry
        };

        self.with_toplevel(id, |view, imp, scene| {
            if fullscreen {
                view.store_natural_geometry();
            }
            imp.set_fullscreen(fullscreen);
            view.flags.set(ViewFlags::FULLSCREEN, fullscreen);
            view.ssd.set_visible(!fullscreen && view.ssd.enabled, scene);
            if !target.is_empty() {
                imp.move_resize(view, target);
                scene.set_position(view.scene_tree, view.geometry.x, view.geometry.y);
            }
        });
    }

    pub fn view_toggle_decorations(&mut self, id: ViewId) {
        if let Some(view) = self.state.view(id) {
            let enabled = view.ssd.enabled;
            self.view_set_decorations(id, !enabled);
        }
    }

    pub fn view_set_decorations(&mut self, id: ViewId, decorations: bool) {
        let theme = self.state.config.theme.clone();
        let changed = self.with_toplevel(id, |view, _, scene| {
            if view.ssd.enabled == decorations || view.is_fullscreen() {
                return false;
            }
            view.ssd.enabled = decorations;
            if decorations {
                view.ssd.margin = ssd::thickness(&theme);
                if view.flags.contains(ViewFlags::BEEN_MAPPED) {
                    view.ssd.create(view.scene_tree, view.geometry, scene);
                }
            } else {
                view.ssd.destroy(scene);
                view.ssd.margin = Border::default();
            }
            true
        });
        if changed != Some(true) {
            return;
        }
        debug!("Decorations of {} set to {}", id, decorations);

        let maximized_area = self
            .state
            .view(id)
            .filter(|view| view.is_maximized())
            .and_then(|view| {
                self.view_usable_area(id)
                    .map(|area| area.shrink(view.ssd.margin))
            });
        if let Some(area) = maximized_area {
            self.view_move_resize(id, area);
        }
    }

    pub fn view_toggle_always_on_top(&mut self, id: ViewId) {
        let layer = self.state.layers.always_on_top;
        let current = self.state.workspaces.current();
        let Some(view) = self.state.view_mut(id) else {
            return;
        };
        view.flags.toggle(ViewFlags::ALWAYS_ON_TOP);
        let pinned = view.flags.contains(ViewFlags::ALWAYS_ON_TOP);
        if !pinned {
            // Unpinned views land on the workspace they are seen on.
            view.workspace = current;
        }
        let tree = view.scene_tree;
        let parent = if pinned {
            Some(layer)
        } else {
            self.state.workspaces.get(current).map(|ws| ws.tree)
        };
        if let Some(parent) = parent {
            self.scene.reparent(tree, parent);
        }
    }

    pub fn view_move_to_edge(&mut self, id: ViewId, direction: &str) {
        let Some(view) = self.state.view(id) else {
            return;
        };
        let Some(edge) = Edge::parse(direction) else {
            error!("Invalid edge '{}' for MoveToEdge", direction);
            return;
        };
        let Some(area) = self.view_usable_area(id) else {
            return;
        };
        let gap = self.state.config.general.gap;
        let margin = view.ssd.margin;
        let geo = view.geometry;
        let (x, y) = match edge {
            Edge::Left => (area.x + margin.left + gap, geo.y),
            Edge::Right => (area.x + area.width - geo.width - margin.right - gap, geo.y),
            Edge::Up => (geo.x, area.y + margin.top + gap),
            Edge::Down => (geo.x, area.y + area.height - geo.height - margin.bottom - gap),
        };
        self.view_move(id, x, y);
    }

    pub fn view_snap_to_edge(&mut self, id: ViewId, direction: &str) {
        let Some(view) = self.state.view(id) else {
            return;
        };
        let Some(edge) = Edge::parse(direction) else {
            error!("Invalid edge '{}' for SnapToEdge", direction);
            return;
        };
        if view.is_fullscreen() {
            return;
        }
        let Some(area) = self.view_usable_area(id) else {
            return;
        };
        let half_width = area.width / 2;
        let half_height = area.height / 2;
        let frame = match edge {
            Edge::Left => Geometry::new(area.x, area.y, half_width, area.height),
            Edge::Right => Geometry::new(
                area.x + half_width,
                area.y,
                area.width - half_width,
                area.height,
            ),
            Edge::Up => Geometry::new(area.x, area.y, area.width, half_height),
            Edge::Down => Geometry::new(
                area.x,
                area.y + half_height,
                area.width,
                area.height - half_height,
            ),
        };
        let gap = Border::uniform(self.state.config.general.gap);
        let target = frame.shrink(gap).shrink(view.ssd.margin);

        self.with_toplevel(id, |view, imp, scene| {
            if view.is_maximized() {
                imp.maximize(false);
                view.flags.remove(ViewFlags::MAXIMIZED);
                view.ssd.squared_corners = false;
            } else {
                view.store_natural_geometry();
            }
            view.tiled = Some(edge);
            imp.move_resize(view, target);
            scene.set_position(view.scene_tree, view.geometry.x, view.geometry.y);
        });
    }

    pub fn view_update_title(&mut self, id: ViewId) {
        self.with_toplevel(id, |view, imp, _| {
            let title = imp.get_string_prop("title");
            view.ssd.title.clone_from(&title);
            view.title = title;
        });
    }

    pub fn view_update_app_id(&mut self, id: ViewId) {
        self.with_toplevel(id, |view, imp, _| {
            view.app_id = imp.get_string_prop("app_id");
        });
    }

    pub fn view_close(&mut self, id: ViewId) {
        self.with_toplevel(id, |_, imp, _| imp.close());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adjust_size() {
        assert_eq!(adjust_size(10, 10), (MIN_VIEW_WIDTH, MIN_VIEW_HEIGHT));
        assert_eq!(adjust_size(640, 480), (640, 480));
    }

    #[test]
    fn test_edge_parse_is_case_insensitive() {
        assert_eq!(Edge::parse("LEFT"), Some(Edge::Left));
        assert_eq!(Edge::parse("Down"), Some(Edge::Down));
        assert_eq!(Edge::parse("sideways"), None);
    }

    #[test]
    fn test_natural_geometry_only_stored_when_floating() {
        let mut view = View::new(ViewId(1), WorkspaceId(1), NodeId(1));
        view.geometry = Geometry::new(10, 10, 300, 200);
        view.store_natural_geometry();
        assert_eq!(view.natural_geometry, Geometry::new(10, 10, 300, 200));

        view.flags.insert(ViewFlags::MAXIMIZED);
        view.geometry = Geometry::new(0, 0, 1920, 1080);
        view.store_natural_geometry();
        assert_eq!(view.natural_geometry, Geometry::new(10, 10, 300, 200));
    }

    #[test]
    fn test_view_id_display() {
        assert_eq!(ViewId(7).to_string(), "view:7");
    }
}
