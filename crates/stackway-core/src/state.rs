//! Core compositor state.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::input::Modifiers;
use crate::interactive::Grab;
use crate::menu::MenuRegistry;
use crate::osd::Osd;
use crate::scene::{NodeId, SceneGraph};
use crate::view::{Toplevel, View, ViewFlags, ViewId};
use crate::workspace::Workspaces;
use crate::xwayland::{Unmanaged, UnmanagedId};

/// Geometry of a rectangular region in layout coordinates.
///
/// Width and height are signed to keep the edge arithmetic of the
/// reconciliation code free of casts; they are never negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Geometry {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub const fn contains(self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }

    pub fn contains_point(self, x: f64, y: f64) -> bool {
        x >= f64::from(self.x)
            && x < f64::from(self.x + self.width)
            && y >= f64::from(self.y)
            && y < f64::from(self.y + self.height)
    }

    pub const fn intersects(self, other: Self) -> bool {
        self.x < other.x + other.width
            && self.x + self.width > other.x
            && self.y < other.y + other.height
            && self.y + self.height > other.y
    }

    pub const fn is_empty(self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    pub const fn center(self) -> (i32, i32) {
        (self.x + self.width / 2, self.y + self.height / 2)
    }

    /// Grow the box outwards by `border` on each side.
    pub const fn expand(self, border: Border) -> Self {
        Self {
            x: self.x - border.left,
            y: self.y - border.top,
            width: self.width + border.left + border.right,
            height: self.height + border.top + border.bottom,
        }
    }

    /// Shrink the box inwards by `border` on each side.
    pub const fn shrink(self, border: Border) -> Self {
        Self {
            x: self.x + border.left,
            y: self.y + border.top,
            width: self.width - border.left - border.right,
            height: self.height - border.top - border.bottom,
        }
    }
}

/// Per-edge thickness, used for decoration margins and gaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Border {
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
    pub left: i32,
}

impl Border {
    pub const fn uniform(width: i32) -> Self {
        Self {
            top: width,
            right: width,
            bottom: width,
            left: width,
        }
    }
}

/// Identifier of an output, chosen by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutputId(pub u64);

impl std::fmt::Display for OutputId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "output:{}", self.0)
    }
}

/// Output (monitor) information.
#[derive(Debug, Clone)]
pub struct Output {
    pub id: OutputId,
    pub name: String,
    pub geometry: Geometry,
    /// Area left over once panels and other exclusive zones are removed.
    pub usable_area: Geometry,
}

/// Focus tracking.
#[derive(Debug, Clone, Default)]
pub struct FocusState {
    pub focused_view: Option<ViewId>,
}

impl FocusState {
    pub fn set_focused(&mut self, view: Option<ViewId>) {
        self.focused_view = view;
    }

    /// Drop every reference to a view that is going away.
    pub fn forget(&mut self, view: ViewId) {
        if self.focused_view == Some(view) {
            self.focused_view = None;
        }
    }
}

/// Scene trees that exist for the whole lifetime of the core, above the
/// per-workspace trees.
#[derive(Debug, Clone, Copy)]
pub struct Layers {
    pub always_on_top: NodeId,
    pub unmanaged: NodeId,
}

/// The central compositor state.
pub struct State {
    pub config: Config,
    /// Managed views in stacking order, bottom first.
    pub views: IndexMap<ViewId, Toplevel>,
    pub unmanaged: IndexMap<UnmanagedId, Unmanaged>,
    pub workspaces: Workspaces,
    pub outputs: IndexMap<OutputId, Output>,
    pub menus: MenuRegistry,
    pub focus: FocusState,
    pub layers: Layers,
    pub cursor: (f64, f64),
    pub modifiers: Modifiers,
    /// View currently highlighted by window cycling.
    pub cycle_view: Option<ViewId>,
    pub osd: Osd,
    pub grab: Option<Grab>,
}

impl State {
    pub fn new(config: Config, scene: &mut dyn SceneGraph) -> Self {
        let workspaces = Workspaces::new(&config.workspaces, scene);
        // Created after the workspace trees so they stack above them.
        let layers = Layers {
            always_on_top: scene.create_tree(None),
            unmanaged: scene.create_tree(None),
        };
        let menus = MenuRegistry::from_config(&config.menus);

        Self {
            config,
            views: IndexMap::new(),
            unmanaged: IndexMap::new(),
            workspaces,
            outputs: IndexMap::new(),
            menus,
            focus: FocusState::default(),
            layers,
            cursor: (0.0, 0.0),
            modifiers: Modifiers::empty(),
            cycle_view: None,
            osd: Osd::default(),
            grab: None,
        }
    }

    pub fn view(&self, id: ViewId) -> Option<&View> {
        self.views.get(&id).map(|toplevel| &toplevel.view)
    }

    pub fn view_mut(&mut self, id: ViewId) -> Option<&mut View> {
        self.views.get_mut(&id).map(|toplevel| &mut toplevel.view)
    }

    pub fn focused_view(&self) -> Option<&View> {
        self.focus.focused_view.and_then(|id| self.view(id))
    }

    /// Whether the view is currently drawn: mapped, and either on the
    /// current workspace or pinned above all of them.
    pub fn is_view_visible(&self, id: ViewId) -> bool {
        self.view(id).is_some_and(|view| {
            view.flags.contains(ViewFlags::MAPPED)
                && (view.workspace == self.workspaces.current()
                    || view.flags.contains(ViewFlags::ALWAYS_ON_TOP))
        })
    }

    /// Visible views, topmost first. Always-on-top views stack above the
    /// workspace layer.
    pub fn visible_views_topmost_first(&self) -> Vec<ViewId> {
        let mut pinned = Vec::new();
        let mut normal = Vec::new();
        for (&id, toplevel) in self.views.iter().rev() {
            if !self.is_view_visible(id) {
                continue;
            }
            if toplevel.view.flags.contains(ViewFlags::ALWAYS_ON_TOP) {
                pinned.push(id);
            } else {
                normal.push(id);
            }
        }
        pinned.extend(normal);
        pinned
    }

    pub fn output_at(&self, x: f64, y: f64) -> Option<&Output> {
        self.outputs
            .values()
            .find(|output| output.geometry.contains_point(x, y))
    }

    /// Usable area of the output under the cursor, falling back to the
    /// first output.
    pub fn usable_area_at_cursor(&self) -> Option<Geometry> {
        let (x, y) = self.cursor;
        self.output_at(x, y)
            .or_else(|| self.outputs.values().next())
            .map(|output| output.usable_area)
    }

    /// Validate core invariants. See `invariants` module.
    pub fn validate_invariants(&self) -> Result<(), crate::invariants::InvariantError> {
        crate::invariants::validate(self)
    }
}
