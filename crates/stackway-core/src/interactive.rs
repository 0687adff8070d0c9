//! Pointer-driven move and resize.

use bitflags::bitflags;
use tracing::debug;

use crate::state::Geometry;
use crate::view::{adjust_size, ViewFlags, ViewId};
use crate::Core;

bitflags! {
    /// Edges an interactive resize moves.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ResizeEdges: u8 {
        const TOP    = 0b0001;
        const BOTTOM = 0b0010;
        const LEFT   = 0b0100;
        const RIGHT  = 0b1000;
    }
}

impl ResizeEdges {
    /// Edges closest to a point inside `geo`, by thirds. The center third
    /// resizes from the bottom-right corner.
    pub fn from_point(px: f64, py: f64, geo: Geometry) -> Self {
        let x = px - f64::from(geo.x);
        let y = py - f64::from(geo.y);
        let width = f64::from(geo.width);
        let height = f64::from(geo.height);

        let mut edges = Self::empty();
        if x < width / 3.0 {
            edges |= Self::LEFT;
        } else if x > width * 2.0 / 3.0 {
            edges |= Self::RIGHT;
        }
        if y < height / 3.0 {
            edges |= Self::TOP;
        } else if y > height * 2.0 / 3.0 {
            edges |= Self::BOTTOM;
        }

        if edges.is_empty() {
            Self::BOTTOM | Self::RIGHT
        } else {
            edges
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrabMode {
    Move,
    Resize,
}

/// An interactive operation in progress.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grab {
    pub view: ViewId,
    pub mode: GrabMode,
    pub cursor_start: (f64, f64),
    pub geometry_start: Geometry,
    pub edges: ResizeEdges,
}

/// New client box for a resize that moved the cursor by `dx`,`dy` since
/// the grab started. The edges opposite to the dragged ones stay put.
pub fn resize_box(start: Geometry, edges: ResizeEdges, dx: i32, dy: i32) -> Geometry {
    let mut width = start.width;
    let mut height = start.height;
    if edges.contains(ResizeEdges::LEFT) {
        width -= dx;
    } else if edges.contains(ResizeEdges::RIGHT) {
        width += dx;
    }
    if edges.contains(ResizeEdges::TOP) {
        height -= dy;
    } else if edges.contains(ResizeEdges::BOTTOM) {
        height += dy;
    }
    let (width, height) = adjust_size(width, height);

    let mut geo = Geometry::new(start.x, start.y, width, height);
    if edges.contains(ResizeEdges::LEFT) {
        geo.x = start.x + start.width - width;
    }
    if edges.contains(ResizeEdges::TOP) {
        geo.y = start.y + start.height - height;
    }
    geo
}

impl Core {
    /// Start moving or resizing a view with the pointer.
    ///
    /// Fullscreen views never start a grab and maximized views do not
    /// resize. Moving a maximized or snapped view restores its natural
    /// size first, keeping the cursor at the same relative position.
    pub fn interactive_begin(&mut self, id: ViewId, mode: GrabMode, edges: ResizeEdges) {
        if self.state.grab.is_some() {
            return;
        }
        let Some(view) = self.state.view(id) else {
            return;
        };
        if !view.is_mapped() || view.is_fullscreen() {
            return;
        }
        if mode == GrabMode::Resize && view.is_maximized() {
            return;
        }

        let cursor = self.state.cursor;
        let mut geometry = view.geometry;
        let edges = match mode {
            GrabMode::Move => ResizeEdges::empty(),
            GrabMode::Resize if edges.is_empty() => {
                ResizeEdges::from_point(cursor.0, cursor.1, geometry)
            }
            GrabMode::Resize => edges,
        };

        if mode == GrabMode::Move && (view.is_maximized() || view.tiled.is_some()) {
            let natural = view.natural_geometry;
            if !natural.is_empty() {
                let relative = (cursor.0 - f64::from(geometry.x)) / f64::from(geometry.width.max(1));
                let x = cursor.0 - relative * f64::from(natural.width);
                geometry = Geometry::new(x as i32, geometry.y, natural.width, natural.height);
            }
            self.with_toplevel(id, |view, imp, scene| {
                if view.is_maximized() {
                    imp.maximize(false);
                    view.flags.remove(ViewFlags::MAXIMIZED);
                    view.ssd.squared_corners = false;
                }
                view.tiled = None;
                imp.move_resize(view, geometry);
                scene.set_position(view.scene_tree, view.geometry.x, view.geometry.y);
            });
        }

        debug!("Begin interactive {:?} of {} ({:?})", mode, id, edges);
        self.state.grab = Some(Grab {
            view: id,
            mode,
            cursor_start: cursor,
            geometry_start: geometry,
            edges,
        });
    }

    /// Follow the cursor with the grabbed view.
    pub fn interactive_motion(&mut self) {
        let Some(grab) = self.state.grab else {
            return;
        };
        let (cx, cy) = self.state.cursor;
        let dx = (cx - grab.cursor_start.0).round() as i32;
        let dy = (cy - grab.cursor_start.1).round() as i32;
        let start = grab.geometry_start;

        match grab.mode {
            GrabMode::Move => self.view_move(grab.view, start.x + dx, start.y + dy),
            GrabMode::Resize => {
                let geo = resize_box(start, grab.edges, dx, dy);
                self.view_move_resize(grab.view, geo);
            }
        }
    }

    pub fn interactive_end(&mut self) {
        if let Some(grab) = self.state.grab.take() {
            debug!("End interactive {:?} of {}", grab.mode, grab.view);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::{MIN_VIEW_HEIGHT, MIN_VIEW_WIDTH};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_edges_from_point() {
        let geo = Geometry::new(0, 0, 300, 300);
        assert_eq!(
            ResizeEdges::from_point(10.0, 10.0, geo),
            ResizeEdges::TOP | ResizeEdges::LEFT
        );
        assert_eq!(ResizeEdges::from_point(290.0, 150.0, geo), ResizeEdges::RIGHT);
        assert_eq!(
            ResizeEdges::from_point(150.0, 150.0, geo),
            ResizeEdges::BOTTOM | ResizeEdges::RIGHT
        );
    }

    #[test]
    fn test_resize_bottom_right_keeps_origin() {
        let start = Geometry::new(100, 100, 400, 300);
        let geo = resize_box(start, ResizeEdges::BOTTOM | ResizeEdges::RIGHT, 50, -20);
        assert_eq!(geo, Geometry::new(100, 100, 450, 280));
    }

    #[test]
    fn test_resize_top_left_keeps_opposite_corner() {
        let start = Geometry::new(100, 100, 400, 300);
        let geo = resize_box(start, ResizeEdges::TOP | ResizeEdges::LEFT, 30, 40);
        assert_eq!(geo, Geometry::new(130, 140, 370, 260));
        assert_eq!(geo.x + geo.width, start.x + start.width);
        assert_eq!(geo.y + geo.height, start.y + start.height);
    }

    #[test]
    fn test_resize_clamps_to_minimum() {
        let start = Geometry::new(100, 100, 400, 300);
        let geo = resize_box(start, ResizeEdges::LEFT, 1000, 0);
        assert_eq!(geo.width, MIN_VIEW_WIDTH);
        assert_eq!(geo.x + geo.width, 500);

        let geo = resize_box(start, ResizeEdges::BOTTOM, 0, -1000);
        assert_eq!(geo.height, MIN_VIEW_HEIGHT);
        assert_eq!(geo.y, 100);
    }
}
