//! Legacy X clients through XWayland.
//!
//! Managed X windows become views backed by [`XwaylandView`]. Override-
//! redirect windows (menus, tooltips, drag icons) bypass window
//! management and are tracked as [`Unmanaged`] surfaces that are only
//! drawn. A window can switch between the two at any time.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, trace};

use crate::interactive::{GrabMode, ResizeEdges};
use crate::pending::Reconcile;
use crate::scene::{NodeId, SceneGraph};
use crate::signal::Subscription;
use crate::state::Geometry;
use crate::surface::{
    SurfaceOwner, WlSurface, XDecorations, XwaylandEvent, XwaylandEventKind, XwaylandSurface,
};
use crate::view::{adjust_size, MapOutcome, Toplevel, View, ViewFlags, ViewId, ViewImpl};
use crate::Core;

/// Identifier of an override-redirect surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnmanagedId(pub u64);

impl fmt::Display for UnmanagedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unmanaged:{}", self.0)
    }
}

/// Signals an unmanaged surface listens to.
const UNMANAGED_EVENTS: [XwaylandEventKind; 5] = [
    XwaylandEventKind::Map,
    XwaylandEventKind::Unmap,
    XwaylandEventKind::Destroy,
    XwaylandEventKind::RequestConfigure,
    XwaylandEventKind::SetOverrideRedirect,
];

fn clamp_i16(value: i32) -> i16 {
    i16::try_from(value).unwrap_or(if value < 0 { i16::MIN } else { i16::MAX })
}

fn clamp_u16(value: i32) -> u16 {
    u16::try_from(value.max(0)).unwrap_or(u16::MAX)
}

fn send_configure(xsurface: &dyn XwaylandSurface, geo: Geometry) {
    xsurface.configure(
        clamp_i16(geo.x),
        clamp_i16(geo.y),
        clamp_u16(geo.width),
        clamp_u16(geo.height),
    );
}

// ── Managed views ────────────────────────────────────────────────────

/// View backend for a managed X window.
#[derive(Debug)]
pub struct XwaylandView {
    xsurface: Rc<dyn XwaylandSurface>,
    /// Lifecycle and request signals, held until the view is destroyed.
    _listeners: Vec<Subscription<SurfaceOwner>>,
    /// Commit signal of the wl_surface, held exactly while mapped.
    commit: Option<Subscription<SurfaceOwner>>,
}

impl XwaylandView {
    pub fn new(id: ViewId, xsurface: Rc<dyn XwaylandSurface>) -> Self {
        let owner = SurfaceOwner::View(id);
        let listeners = XwaylandEventKind::ALL
            .iter()
            .map(|&kind| xsurface.events().source(kind).subscribe(owner))
            .collect();
        Self {
            xsurface,
            _listeners: listeners,
            commit: None,
        }
    }
}

impl ViewImpl for XwaylandView {
    fn configure(&mut self, view: &mut View, geo: Geometry) {
        view.pending.request(view.geometry, geo);
        send_configure(self.xsurface.as_ref(), geo);
    }

    fn move_to(&mut self, view: &mut View, x: i32, y: i32) {
        view.pending
            .translate(x - view.geometry.x, y - view.geometry.y);
        view.geometry.x = x;
        view.geometry.y = y;
        let current = self.xsurface.geometry();
        send_configure(
            self.xsurface.as_ref(),
            Geometry::new(x, y, current.width, current.height),
        );
    }

    fn close(&mut self) {
        self.xsurface.close();
    }

    fn map(&mut self, view: &mut View, scene: &mut dyn SceneGraph) -> MapOutcome {
        if view.is_mapped() {
            return MapOutcome::AlreadyMapped;
        }
        let Some(surface) = self.xsurface.surface() else {
            error!("{} has no surface to map", view.id);
            return MapOutcome::Failed;
        };
        let Some(tree) = scene.create_surface_tree(view.scene_tree, surface.id()) else {
            self.xsurface.post_no_memory();
            return MapOutcome::Failed;
        };

        view.surface_tree = Some(tree);
        view.flags.insert(ViewFlags::MAPPED);
        if !view.is_maximized() && !view.is_fullscreen() {
            view.geometry = self.xsurface.geometry();
        }
        self.commit = Some(surface.commit_source().subscribe(SurfaceOwner::View(view.id)));
        scene.set_enabled(view.scene_tree, true);
        MapOutcome::Mapped
    }

    fn unmap(&mut self, view: &mut View, scene: &mut dyn SceneGraph) -> bool {
        if !view.is_mapped() {
            return false;
        }
        view.flags.remove(ViewFlags::MAPPED);
        self.commit = None;
        if let Some(tree) = view.surface_tree.take() {
            scene.destroy(tree);
        }
        scene.set_enabled(view.scene_tree, false);
        true
    }

    fn commit(&mut self, view: &mut View) -> Reconcile {
        let Some(surface) = self.xsurface.surface() else {
            return Reconcile::Unchanged;
        };
        let (width, height) = surface.current_size();
        view.pending.reconcile(&mut view.geometry, width, height)
    }

    fn set_activated(&mut self, activated: bool) {
        if activated && self.xsurface.is_minimized() {
            self.xsurface.set_minimized(false);
        }
        self.xsurface.activate(activated);
        if activated {
            self.xsurface.restack_above();
        }
    }

    fn set_fullscreen(&mut self, fullscreen: bool) {
        self.xsurface.set_fullscreen(fullscreen);
    }

    fn maximize(&mut self, maximized: bool) {
        self.xsurface.set_maximized(maximized);
    }

    fn get_string_prop(&self, prop: &str) -> String {
        match prop {
            "title" => self.xsurface.title(),
            "class" | "app_id" => self.xsurface.class(),
            _ => None,
        }
        .unwrap_or_default()
    }

    fn wants_decorations(&self) -> bool {
        self.xsurface.decorations() == XDecorations::All
    }

    fn wants_fullscreen(&self) -> bool {
        self.xsurface.is_fullscreen()
    }

    fn is_observing_commits(&self) -> bool {
        self.commit.is_some()
    }
}

// ── Unmanaged surfaces ───────────────────────────────────────────────

/// An override-redirect surface, drawn at the position the client picks.
#[derive(Debug)]
pub struct Unmanaged {
    pub id: UnmanagedId,
    xsurface: Rc<dyn XwaylandSurface>,
    _listeners: Vec<Subscription<SurfaceOwner>>,
    commit: Option<Subscription<SurfaceOwner>>,
    /// Surface subtree in the unmanaged layer; present exactly while mapped.
    pub node: Option<NodeId>,
}

impl Unmanaged {
    fn new(id: UnmanagedId, xsurface: Rc<dyn XwaylandSurface>) -> Self {
        let owner = SurfaceOwner::Unmanaged(id);
        let listeners = UNMANAGED_EVENTS
            .iter()
            .map(|&kind| xsurface.events().source(kind).subscribe(owner))
            .collect();
        Self {
            id,
            xsurface,
            _listeners: listeners,
            commit: None,
            node: None,
        }
    }

    pub const fn is_mapped(&self) -> bool {
        self.node.is_some()
    }

    pub fn geometry(&self) -> Geometry {
        self.xsurface.geometry()
    }

    pub fn is_observing_commits(&self) -> bool {
        self.commit.is_some()
    }
}

// ── Event routing ────────────────────────────────────────────────────

impl Core {
    /// Adopt a new XWayland surface and return who now owns it.
    pub fn xwayland_new_surface(&mut self, xsurface: Rc<dyn XwaylandSurface>) -> SurfaceOwner {
        xsurface.ping();
        let owner = if xsurface.is_override_redirect() {
            SurfaceOwner::Unmanaged(self.unmanaged_create(xsurface))
        } else {
            SurfaceOwner::View(self.xwayland_view_create(xsurface))
        };
        self.check_invariants("xwayland_new_surface");
        owner
    }

    fn xwayland_view_create(&mut self, xsurface: Rc<dyn XwaylandSurface>) -> ViewId {
        let id = self.next_view_id();
        let workspace = self.state.workspaces.current();
        let parent = self.state.workspaces.get(workspace).map(|ws| ws.tree);
        let tree = self.scene.create_tree(parent);
        self.scene.set_enabled(tree, false);

        let view = View::new(id, workspace, tree);
        let imp = XwaylandView::new(id, xsurface);
        self.state
            .views
            .insert(id, Toplevel::new(view, Box::new(imp)));
        debug!("New XWayland {} on {}", id, workspace);
        id
    }

    /// Deliver an event raised by `xsurface` to its current listeners.
    pub fn xwayland_notify(&mut self, xsurface: &Rc<dyn XwaylandSurface>, event: XwaylandEvent) {
        trace!("XWayland event {:?}", event);
        for owner in xsurface.events().source(event.kind()).listeners() {
            match owner {
                SurfaceOwner::View(id) => self.xwayland_view_event(id, xsurface, event),
                SurfaceOwner::Unmanaged(id) => self.unmanaged_event(id, xsurface, event),
            }
        }
        self.check_invariants("xwayland_notify");
    }

    /// Deliver a commit of `surface` to whoever observes it.
    pub fn surface_commit(&mut self, surface: &dyn WlSurface) {
        for owner in surface.commit_source().listeners() {
            match owner {
                SurfaceOwner::View(id) => self.view_commit(id),
                SurfaceOwner::Unmanaged(id) => self.unmanaged_commit(id),
            }
        }
        self.check_invariants("surface_commit");
    }

    fn xwayland_view_event(
        &mut self,
        id: ViewId,
        xsurface: &Rc<dyn XwaylandSurface>,
        event: XwaylandEvent,
    ) {
        match event {
            XwaylandEvent::Map => {
                // A client mapping itself again is no longer iconified.
                if let Some(view) = self.state.view_mut(id) {
                    view.flags.remove(ViewFlags::MINIMIZED);
                }
                self.view_map(id);
            }
            XwaylandEvent::Unmap => self.view_unmap(id),
            XwaylandEvent::Destroy => self.view_destroy(id),
            XwaylandEvent::RequestConfigure(geo) => {
                // Through the pending state: X commits carry no position.
                let (width, height) = adjust_size(geo.width, geo.height);
                self.view_move_resize(id, Geometry::new(geo.x, geo.y, width, height));
            }
            XwaylandEvent::RequestActivate => {
                self.desktop_focus_and_activate_view(Some(id));
                self.desktop_move_to_front(id);
            }
            XwaylandEvent::RequestMinimize { minimize } => self.view_minimize(id, minimize),
            XwaylandEvent::RequestMaximize => self.view_toggle_maximize(id),
            XwaylandEvent::RequestFullscreen => {
                self.view_set_fullscreen(id, xsurface.is_fullscreen());
            }
            XwaylandEvent::RequestMove => {
                self.interactive_begin(id, GrabMode::Move, ResizeEdges::empty());
            }
            XwaylandEvent::RequestResize { edges } => {
                self.interactive_begin(id, GrabMode::Resize, ResizeEdges::from_bits_truncate(edges));
            }
            XwaylandEvent::SetTitle => self.view_update_title(id),
            XwaylandEvent::SetClass => self.view_update_app_id(id),
            XwaylandEvent::SetDecorations => {
                self.view_set_decorations(id, xsurface.decorations() == XDecorations::All);
            }
            XwaylandEvent::SetOverrideRedirect => {
                if xsurface.is_override_redirect() {
                    self.xwayland_view_to_unmanaged(id, xsurface);
                }
            }
        }
    }

    /// The window turned override-redirect: drop the view and track the
    /// surface as unmanaged, visible if the view was.
    fn xwayland_view_to_unmanaged(&mut self, id: ViewId, xsurface: &Rc<dyn XwaylandSurface>) {
        let mapped = self.state.view(id).is_some_and(View::is_mapped);
        debug!("{} became override-redirect", id);
        self.view_destroy(id);
        let unmanaged = self.unmanaged_create(Rc::clone(xsurface));
        if mapped {
            self.unmanaged_map(unmanaged);
        }
    }

    // ── Unmanaged ────────────────────────────────────────────────────

    fn unmanaged_create(&mut self, xsurface: Rc<dyn XwaylandSurface>) -> UnmanagedId {
        let id = self.next_unmanaged_id();
        self.state.unmanaged.insert(id, Unmanaged::new(id, xsurface));
        debug!("New {}", id);
        id
    }

    fn unmanaged_event(
        &mut self,
        id: UnmanagedId,
        xsurface: &Rc<dyn XwaylandSurface>,
        event: XwaylandEvent,
    ) {
        match event {
            XwaylandEvent::Map => self.unmanaged_map(id),
            XwaylandEvent::Unmap => self.unmanaged_unmap(id),
            XwaylandEvent::Destroy => {
                self.unmanaged_unmap(id);
                self.state.unmanaged.shift_remove(&id);
                debug!("Destroyed {}", id);
            }
            XwaylandEvent::RequestConfigure(geo) => {
                send_configure(xsurface.as_ref(), geo);
                self.unmanaged_commit(id);
            }
            XwaylandEvent::SetOverrideRedirect => {
                if !xsurface.is_override_redirect() {
                    self.unmanaged_to_view(id, xsurface);
                }
            }
            _ => {}
        }
    }

    fn unmanaged_map(&mut self, id: UnmanagedId) {
        let layer = self.state.layers.unmanaged;
        let Some(unmanaged) = self.state.unmanaged.get_mut(&id) else {
            return;
        };
        if unmanaged.is_mapped() {
            return;
        }
        let Some(surface) = unmanaged.xsurface.surface() else {
            error!("{} has no surface to map", id);
            return;
        };
        let Some(node) = self.scene.create_surface_tree(layer, surface.id()) else {
            error!("Failed to map {}", id);
            unmanaged.xsurface.post_no_memory();
            return;
        };
        let geo = unmanaged.xsurface.geometry();
        self.scene.set_position(node, geo.x, geo.y);
        unmanaged.node = Some(node);
        unmanaged.commit = Some(surface.commit_source().subscribe(SurfaceOwner::Unmanaged(id)));
    }

    fn unmanaged_unmap(&mut self, id: UnmanagedId) {
        let Some(unmanaged) = self.state.unmanaged.get_mut(&id) else {
            return;
        };
        unmanaged.commit = None;
        if let Some(node) = unmanaged.node.take() {
            self.scene.destroy(node);
        }
    }

    fn unmanaged_commit(&mut self, id: UnmanagedId) {
        let Some(unmanaged) = self.state.unmanaged.get(&id) else {
            return;
        };
        if let Some(node) = unmanaged.node {
            let geo = unmanaged.xsurface.geometry();
            self.scene.set_position(node, geo.x, geo.y);
        }
    }

    /// The window stopped being override-redirect: manage it as a view,
    /// visible if the unmanaged surface was.
    fn unmanaged_to_view(&mut self, id: UnmanagedId, xsurface: &Rc<dyn XwaylandSurface>) {
        let mapped = self
            .state
            .unmanaged
            .get(&id)
            .is_some_and(Unmanaged::is_mapped);
        debug!("{} is no longer override-redirect", id);
        self.unmanaged_unmap(id);
        self.state.unmanaged.shift_remove(&id);

        let view = self.xwayland_view_create(Rc::clone(xsurface));
        if mapped {
            self.view_map(view);
        }
    }
}
