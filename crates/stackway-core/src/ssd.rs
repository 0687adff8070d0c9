//! Server-side decorations.
//!
//! Only geometry lives here: which part of the frame a point hits, how
//! thick the frame is and how far it reaches. Drawing the parts is up to
//! the renderer, which finds the decoration tree under the view's tree.

use tracing::trace;

use crate::config::ThemeConfig;
use crate::interactive::ResizeEdges;
use crate::scene::{NodeId, SceneGraph};
use crate::state::{Border, Geometry};
use crate::view::{View, ViewFlags};

/// Parts of a decorated view, plus the root for hits outside any view.
///
/// The order matters: [`SsdPartType::contains`] relies on the buttons and
/// title sitting between `ButtonClose` and `Title`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SsdPartType {
    None,
    ButtonClose,
    ButtonMaximize,
    ButtonIconify,
    ButtonWindowMenu,
    Titlebar,
    Title,
    CornerTopLeft,
    CornerTopRight,
    CornerBottomRight,
    CornerBottomLeft,
    Top,
    Right,
    Bottom,
    Left,
    Client,
    Frame,
    Root,
}

impl SsdPartType {
    /// Whether a hit on `candidate` counts as a hit on `self`.
    pub fn contains(self, candidate: Self) -> bool {
        if self == candidate {
            return true;
        }
        match self {
            Self::Titlebar => (Self::ButtonClose..=Self::Title).contains(&candidate),
            Self::Title => candidate == Self::Titlebar,
            Self::Frame => (Self::ButtonClose..=Self::Client).contains(&candidate),
            Self::Top => matches!(candidate, Self::CornerTopLeft | Self::CornerTopRight),
            Self::Right => matches!(candidate, Self::CornerTopRight | Self::CornerBottomRight),
            Self::Bottom => {
                matches!(candidate, Self::CornerBottomLeft | Self::CornerBottomRight)
            }
            Self::Left => matches!(candidate, Self::CornerTopLeft | Self::CornerBottomLeft),
            _ => false,
        }
    }

    /// Parse a mousebind context name.
    pub fn from_context_name(name: &str) -> Option<Self> {
        let part = match name.to_lowercase().as_str() {
            "close" => Self::ButtonClose,
            "maximize" => Self::ButtonMaximize,
            "iconify" => Self::ButtonIconify,
            "windowmenu" => Self::ButtonWindowMenu,
            "titlebar" => Self::Titlebar,
            "title" => Self::Title,
            "tlcorner" => Self::CornerTopLeft,
            "trcorner" => Self::CornerTopRight,
            "brcorner" => Self::CornerBottomRight,
            "blcorner" => Self::CornerBottomLeft,
            "top" => Self::Top,
            "right" => Self::Right,
            "bottom" => Self::Bottom,
            "left" => Self::Left,
            "client" => Self::Client,
            "frame" => Self::Frame,
            "root" => Self::Root,
            _ => return None,
        };
        Some(part)
    }

    /// Edges an interactive resize started on this part should move.
    pub fn resize_edges(self) -> ResizeEdges {
        match self {
            Self::Top => ResizeEdges::TOP,
            Self::Right => ResizeEdges::RIGHT,
            Self::Bottom => ResizeEdges::BOTTOM,
            Self::Left => ResizeEdges::LEFT,
            Self::CornerTopLeft => ResizeEdges::TOP | ResizeEdges::LEFT,
            Self::CornerTopRight => ResizeEdges::TOP | ResizeEdges::RIGHT,
            Self::CornerBottomRight => ResizeEdges::BOTTOM | ResizeEdges::RIGHT,
            Self::CornerBottomLeft => ResizeEdges::BOTTOM | ResizeEdges::LEFT,
            _ => ResizeEdges::empty(),
        }
    }

    pub const fn is_button(self) -> bool {
        matches!(
            self,
            Self::ButtonClose | Self::ButtonMaximize | Self::ButtonIconify | Self::ButtonWindowMenu
        )
    }
}

/// Frame thickness around the client area.
pub const fn thickness(theme: &ThemeConfig) -> Border {
    Border {
        top: theme.titlebar_height + theme.border_width,
        right: theme.border_width,
        bottom: theme.border_width,
        left: theme.border_width,
    }
}

/// Box covering the view including its decoration margin.
pub const fn max_extents(view: &View) -> Geometry {
    view.geometry.expand(view.ssd.margin)
}

/// Decoration state of a view.
#[derive(Debug, Clone, Default)]
pub struct Ssd {
    pub enabled: bool,
    /// Space the frame takes on each side; zero when disabled.
    pub margin: Border,
    pub tree: Option<NodeId>,
    /// Last geometry the frame was laid out for.
    pub geometry: Geometry,
    pub active: bool,
    pub squared_corners: bool,
    pub title: String,
}

impl Ssd {
    pub fn create(&mut self, view_tree: NodeId, view_geometry: Geometry, scene: &mut dyn SceneGraph) {
        if self.tree.is_some() {
            return;
        }
        let tree = scene.create_tree(Some(view_tree));
        scene.set_position(tree, -self.margin.left, -self.margin.top);
        self.tree = Some(tree);
        self.geometry = view_geometry;
    }

    pub fn destroy(&mut self, scene: &mut dyn SceneGraph) {
        if let Some(tree) = self.tree.take() {
            scene.destroy(tree);
        }
    }

    pub fn set_visible(&self, visible: bool, scene: &mut dyn SceneGraph) {
        if let Some(tree) = self.tree {
            scene.set_enabled(tree, visible);
        }
    }

    /// Re-layout the frame if the view geometry changed since last time.
    pub fn update_geometry(&mut self, view_geometry: Geometry, scene: &mut dyn SceneGraph) {
        let Some(tree) = self.tree else {
            return;
        };
        if self.geometry == view_geometry {
            return;
        }
        trace!("ssd: {:?} -> {:?}", self.geometry, view_geometry);
        scene.set_position(tree, -self.margin.left, -self.margin.top);
        self.geometry = view_geometry;
    }
}

/// Which part of `view` the point hits, or [`SsdPartType::None`].
pub fn part_at(view: &View, theme: &ThemeConfig, x: f64, y: f64) -> SsdPartType {
    let geo = view.geometry;
    if geo.contains_point(x, y) {
        return SsdPartType::Client;
    }
    if !view.ssd.enabled || view.flags.contains(ViewFlags::FULLSCREEN) {
        return SsdPartType::None;
    }

    let frame = max_extents(view);
    let extents = frame.expand(Border::uniform(theme.resize_extents));
    if !extents.contains_point(x, y) {
        return SsdPartType::None;
    }

    let titlebar = Geometry::new(geo.x, geo.y - theme.titlebar_height, geo.width, theme.titlebar_height);
    if titlebar.contains_point(x, y) {
        return titlebar_part_at(titlebar, theme, x);
    }

    // Borders and the invisible resize area around the frame.
    let corner = theme.titlebar_height.max(theme.resize_extents);
    let (fx, fy) = (f64::from(frame.x), f64::from(frame.y));
    let (fr, fb) = (f64::from(frame.x + frame.width), f64::from(frame.y + frame.height));
    let near_left = x < fx + f64::from(corner);
    let near_right = x >= fr - f64::from(corner);
    let near_top = y < fy + f64::from(corner);
    let near_bottom = y >= fb - f64::from(corner);
    let left = x < f64::from(geo.x);
    let right = x >= f64::from(geo.x + geo.width);
    let top = y < f64::from(geo.y - theme.titlebar_height);
    let bottom = y >= f64::from(geo.y + geo.height);

    match (left || (near_left && (top || bottom)), right || (near_right && (top || bottom))) {
        (true, _) if top || (near_top && left) => SsdPartType::CornerTopLeft,
        (true, _) if bottom || (near_bottom && left) => SsdPartType::CornerBottomLeft,
        (_, true) if top || (near_top && right) => SsdPartType::CornerTopRight,
        (_, true) if bottom || (near_bottom && right) => SsdPartType::CornerBottomRight,
        (true, _) => SsdPartType::Left,
        (_, true) => SsdPartType::Right,
        _ if top => SsdPartType::Top,
        _ => SsdPartType::Bottom,
    }
}

fn titlebar_part_at(titlebar: Geometry, theme: &ThemeConfig, x: f64) -> SsdPartType {
    let offset = x - f64::from(titlebar.x);
    let from_right = f64::from(titlebar.x + titlebar.width) - x;
    let button = f64::from(theme.button_width);

    if offset < button {
        SsdPartType::ButtonWindowMenu
    } else if from_right <= button {
        SsdPartType::ButtonClose
    } else if from_right <= 2.0 * button {
        SsdPartType::ButtonMaximize
    } else if from_right <= 3.0 * button {
        SsdPartType::ButtonIconify
    } else {
        SsdPartType::Title
    }
}
