//! Pending move/resize reconciliation.
//!
//! Legacy-X clients acknowledge a configure whenever they get round to it,
//! and the size they finally commit may differ from the one requested (size
//! increments, minimum sizes). When a request moves the left or top edge,
//! the opposite edge must stay where it was requested, so the position is
//! derived from the committed size on every commit until the client has
//! caught up.

use crate::state::Geometry;

/// Outstanding configure request of a view.
///
/// A newer request simply overwrites an older one: only the latest target
/// is tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PendingMoveResize {
    pub update_x: bool,
    pub update_y: bool,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// What a commit changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconcile {
    /// Neither a move nor a size change was outstanding.
    Unchanged,
    /// Size was adopted; position untouched.
    Resized,
    /// Size was adopted and at least one coordinate was recomputed.
    Moved,
}

impl PendingMoveResize {
    /// Record a configure request against the view's current geometry.
    pub fn request(&mut self, current: Geometry, requested: Geometry) {
        self.update_x = requested.x != current.x;
        self.update_y = requested.y != current.y;
        self.x = requested.x;
        self.y = requested.y;
        self.width = requested.width;
        self.height = requested.height;
    }

    pub const fn is_moving(&self) -> bool {
        self.update_x || self.update_y
    }

    /// Shift an outstanding request along with a view that was moved
    /// while the client had not caught up yet.
    pub fn translate(&mut self, dx: i32, dy: i32) {
        if self.update_x {
            self.x += dx;
        }
        if self.update_y {
            self.y += dy;
        }
    }

    pub const fn target(&self) -> Geometry {
        Geometry::new(self.x, self.y, self.width, self.height)
    }

    /// Fold a commit of size `committed_width` x `committed_height` into
    /// `view`.
    ///
    /// The pending flags clear once the committed size equals the requested
    /// one; until then every commit re-anchors the moved edges.
    pub fn reconcile(
        &mut self,
        view: &mut Geometry,
        committed_width: i32,
        committed_height: i32,
    ) -> Reconcile {
        let moving = self.is_moving();
        let size_changed = view.width != committed_width || view.height != committed_height;
        if !moving && !size_changed {
            return Reconcile::Unchanged;
        }

        view.width = committed_width;
        view.height = committed_height;

        if self.update_x {
            view.x = self.x + self.width - committed_width;
        }
        if self.update_y {
            view.y = self.y + self.height - committed_height;
        }

        if self.width == committed_width && self.height == committed_height {
            self.update_x = false;
            self.update_y = false;
        }

        if moving {
            Reconcile::Moved
        } else {
            Reconcile::Resized
        }
    }
}
