//! In-memory stand-ins for the compositing library.
//!
//! [`HeadlessScene`] keeps a plain node tree, [`HeadlessSurface`] and
//! [`HeadlessXSurface`] play the client side. The headless host drives the
//! core with them, and tests use them to observe what the core asked for.

use std::cell::{Cell, Ref, RefCell};
use std::rc::Rc;

use indexmap::IndexMap;

use crate::scene::{NodeId, SceneGraph};
use crate::signal::EventSource;
use crate::state::Geometry;
use crate::surface::{
    SurfaceId, SurfaceOwner, WlSurface, XDecorations, XwaylandSignals, XwaylandSurface,
};

// ── Scene ────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    enabled: bool,
    position: (i32, i32),
    surface: Option<SurfaceId>,
}

#[derive(Debug, Default)]
pub struct HeadlessScene {
    nodes: IndexMap<NodeId, Node>,
    roots: Vec<NodeId>,
    next_id: u64,
    /// Make surface subtree creation fail, like a library out of memory.
    pub fail_surface_trees: bool,
}

impl HeadlessScene {
    fn alloc(&mut self, parent: Option<NodeId>, surface: Option<SurfaceId>) -> NodeId {
        self.next_id += 1;
        let id = NodeId(self.next_id);
        let parent = parent.filter(|p| self.nodes.contains_key(p));
        self.nodes.insert(
            id,
            Node {
                parent,
                children: Vec::new(),
                enabled: true,
                position: (0, 0),
                surface,
            },
        );
        self.siblings_mut(parent).push(id);
        id
    }

    fn siblings_mut(&mut self, parent: Option<NodeId>) -> &mut Vec<NodeId> {
        match parent.and_then(|p| self.nodes.get_mut(&p)) {
            Some(node) => &mut node.children,
            None => &mut self.roots,
        }
    }

    fn detach(&mut self, node: NodeId) {
        let parent = self.nodes.get(&node).and_then(|n| n.parent);
        self.siblings_mut(parent).retain(|&child| child != node);
    }

    fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Top-level trees, bottom first.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Number of drawable subtrees showing `surface`.
    pub fn surface_tree_count(&self, surface: SurfaceId) -> usize {
        self.nodes
            .values()
            .filter(|node| node.surface == Some(surface))
            .count()
    }
}

impl SceneGraph for HeadlessScene {
    fn create_tree(&mut self, parent: Option<NodeId>) -> NodeId {
        self.alloc(parent, None)
    }

    fn create_surface_tree(&mut self, parent: NodeId, surface: SurfaceId) -> Option<NodeId> {
        if self.fail_surface_trees || !self.exists(parent) {
            return None;
        }
        Some(self.alloc(Some(parent), Some(surface)))
    }

    fn set_enabled(&mut self, node: NodeId, enabled: bool) {
        if let Some(node) = self.nodes.get_mut(&node) {
            node.enabled = enabled;
        }
    }

    fn set_position(&mut self, node: NodeId, x: i32, y: i32) {
        if let Some(node) = self.nodes.get_mut(&node) {
            node.position = (x, y);
        }
    }

    fn reparent(&mut self, node: NodeId, new_parent: NodeId) {
        if !self.exists(node) || !self.exists(new_parent) || self.is_ancestor(node, new_parent) {
            return;
        }
        self.detach(node);
        if let Some(n) = self.nodes.get_mut(&node) {
            n.parent = Some(new_parent);
        }
        self.siblings_mut(Some(new_parent)).push(node);
    }

    fn raise_to_top(&mut self, node: NodeId) {
        if !self.exists(node) {
            return;
        }
        self.detach(node);
        let parent = self.parent(node);
        self.siblings_mut(parent).push(node);
    }

    fn destroy(&mut self, node: NodeId) {
        if !self.exists(node) {
            return;
        }
        self.detach(node);
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            if let Some(removed) = self.nodes.shift_remove(&id) {
                stack.extend(removed.children);
            }
        }
    }

    fn exists(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    fn is_enabled(&self, node: NodeId) -> bool {
        self.nodes.get(&node).is_some_and(|n| n.enabled)
    }

    fn position(&self, node: NodeId) -> Option<(i32, i32)> {
        self.nodes.get(&node).map(|n| n.position)
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(&node).and_then(|n| n.parent)
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes
            .get(&node)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    fn surface_of(&self, node: NodeId) -> Option<SurfaceId> {
        self.nodes.get(&node).and_then(|n| n.surface)
    }
}

// ── Surfaces ─────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct HeadlessSurface {
    id: SurfaceId,
    size: Cell<(i32, i32)>,
    commit: EventSource<SurfaceOwner>,
}

impl HeadlessSurface {
    pub fn new(id: SurfaceId) -> Self {
        Self {
            id,
            size: Cell::new((0, 0)),
            commit: EventSource::default(),
        }
    }

    /// Attach a buffer of the given size; the next commit reports it.
    pub fn set_size(&self, width: i32, height: i32) {
        self.size.set((width, height));
    }
}

impl WlSurface for HeadlessSurface {
    fn id(&self) -> SurfaceId {
        self.id
    }

    fn current_size(&self) -> (i32, i32) {
        self.size.get()
    }

    fn commit_source(&self) -> &EventSource<SurfaceOwner> {
        &self.commit
    }
}

/// Everything a [`HeadlessXSurface`] was told, plus its X-side state.
#[derive(Debug, Clone, Default)]
pub struct XState {
    pub geometry: Geometry,
    pub title: Option<String>,
    pub class: Option<String>,
    pub decorations: XDecorations,
    pub mapped: bool,
    pub override_redirect: bool,
    pub fullscreen: bool,
    pub minimized: bool,
    pub maximized: bool,
    pub activated: bool,
    pub configures: Vec<Geometry>,
    pub closes: usize,
    pub restacks: usize,
    pub pings: usize,
    pub no_memory: usize,
}

/// A scripted X window.
#[derive(Debug)]
pub struct HeadlessXSurface {
    events: XwaylandSignals,
    surface: Option<Rc<HeadlessSurface>>,
    state: RefCell<XState>,
}

impl HeadlessXSurface {
    pub fn new(surface: SurfaceId, geometry: Geometry) -> Self {
        Self {
            events: XwaylandSignals::default(),
            surface: Some(Rc::new(HeadlessSurface::new(surface))),
            state: RefCell::new(XState {
                geometry,
                ..XState::default()
            }),
        }
    }

    /// A window whose wl_surface has not been associated yet.
    pub fn without_surface(geometry: Geometry) -> Self {
        Self {
            events: XwaylandSignals::default(),
            surface: None,
            state: RefCell::new(XState {
                geometry,
                ..XState::default()
            }),
        }
    }

    #[must_use]
    pub fn with_title(self, title: &str) -> Self {
        self.state.borrow_mut().title = Some(title.to_string());
        self
    }

    #[must_use]
    pub fn with_class(self, class: &str) -> Self {
        self.state.borrow_mut().class = Some(class.to_string());
        self
    }

    #[must_use]
    pub fn with_decorations(self, decorations: XDecorations) -> Self {
        self.state.borrow_mut().decorations = decorations;
        self
    }

    #[must_use]
    pub fn with_override_redirect(self, override_redirect: bool) -> Self {
        self.state.borrow_mut().override_redirect = override_redirect;
        self
    }

    #[must_use]
    pub fn with_fullscreen(self, fullscreen: bool) -> Self {
        self.state.borrow_mut().fullscreen = fullscreen;
        self
    }

    pub fn wl_surface(&self) -> Option<&Rc<HeadlessSurface>> {
        self.surface.as_ref()
    }

    pub fn state(&self) -> Ref<'_, XState> {
        self.state.borrow()
    }

    pub fn last_configure(&self) -> Option<Geometry> {
        self.state.borrow().configures.last().copied()
    }

    /// Client-side changes the host scripts before raising the matching
    /// event.
    pub fn update(&self, f: impl FnOnce(&mut XState)) {
        f(&mut self.state.borrow_mut());
    }

    /// Take the most recently configured size, as a well-behaved client
    /// would. Returns whether the buffer size changed.
    pub fn ack_configure(&self) -> bool {
        let Some(surface) = &self.surface else {
            return false;
        };
        let geo = self.state.borrow().geometry;
        let changed = surface.current_size() != (geo.width, geo.height);
        surface.set_size(geo.width, geo.height);
        changed
    }
}

impl XwaylandSurface for HeadlessXSurface {
    fn events(&self) -> &XwaylandSignals {
        &self.events
    }

    fn surface(&self) -> Option<Rc<dyn WlSurface>> {
        self.surface
            .as_ref()
            .map(|surface| Rc::clone(surface) as Rc<dyn WlSurface>)
    }

    fn geometry(&self) -> Geometry {
        self.state.borrow().geometry
    }

    fn title(&self) -> Option<String> {
        self.state.borrow().title.clone()
    }

    fn class(&self) -> Option<String> {
        self.state.borrow().class.clone()
    }

    fn decorations(&self) -> XDecorations {
        self.state.borrow().decorations
    }

    fn is_mapped(&self) -> bool {
        self.state.borrow().mapped
    }

    fn is_override_redirect(&self) -> bool {
        self.state.borrow().override_redirect
    }

    fn is_fullscreen(&self) -> bool {
        self.state.borrow().fullscreen
    }

    fn is_minimized(&self) -> bool {
        self.state.borrow().minimized
    }

    fn configure(&self, x: i16, y: i16, width: u16, height: u16) {
        let geo = Geometry::new(x.into(), y.into(), width.into(), height.into());
        let mut state = self.state.borrow_mut();
        state.geometry = geo;
        state.configures.push(geo);
    }

    fn close(&self) {
        self.state.borrow_mut().closes += 1;
    }

    fn activate(&self, activated: bool) {
        self.state.borrow_mut().activated = activated;
    }

    fn restack_above(&self) {
        self.state.borrow_mut().restacks += 1;
    }

    fn set_minimized(&self, minimized: bool) {
        self.state.borrow_mut().minimized = minimized;
    }

    fn set_maximized(&self, maximized: bool) {
        self.state.borrow_mut().maximized = maximized;
    }

    fn set_fullscreen(&self, fullscreen: bool) {
        self.state.borrow_mut().fullscreen = fullscreen;
    }

    fn ping(&self) {
        self.state.borrow_mut().pings += 1;
    }

    fn post_no_memory(&self) {
        self.state.borrow_mut().no_memory += 1;
    }
}
