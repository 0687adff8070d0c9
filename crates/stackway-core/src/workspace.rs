//! Workspace management — virtual desktops.
//!
//! Workspaces form an ordered list. Each owns a scene tree holding the
//! trees of its views; only the current workspace's tree is enabled.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::WorkspacesConfig;
use crate::scene::{NodeId, SceneGraph};
use crate::view::{ViewFlags, ViewId};
use crate::Core;

/// Unique identifier for workspaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkspaceId(pub u32);

impl std::fmt::Display for WorkspaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ws:{}", self.0)
    }
}

/// A virtual workspace/desktop.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub id: WorkspaceId,
    pub name: String,
    pub tree: NodeId,
}

/// Ordered workspace registry.
#[derive(Debug, Clone)]
pub struct Workspaces {
    list: IndexMap<WorkspaceId, Workspace>,
    current: WorkspaceId,
    last: Option<WorkspaceId>,
    wrap: bool,
}

impl Workspaces {
    /// Create one workspace per configured name (at least one), each with
    /// its own scene tree. The first one starts out current.
    pub fn new(config: &WorkspacesConfig, scene: &mut dyn SceneGraph) -> Self {
        let mut names = config.names.clone();
        if names.is_empty() {
            names.push("1".to_string());
        }

        let mut list = IndexMap::new();
        for (index, name) in names.into_iter().enumerate() {
            let id = WorkspaceId(index as u32 + 1);
            let tree = scene.create_tree(None);
            scene.set_enabled(tree, index == 0);
            list.insert(id, Workspace { id, name, tree });
        }

        Self {
            list,
            current: WorkspaceId(1),
            last: None,
            wrap: config.wrap,
        }
    }

    pub const fn current(&self) -> WorkspaceId {
        self.current
    }

    pub const fn last(&self) -> Option<WorkspaceId> {
        self.last
    }

    pub fn get(&self, id: WorkspaceId) -> Option<&Workspace> {
        self.list.get(&id)
    }

    pub fn contains(&self, id: WorkspaceId) -> bool {
        self.list.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Workspace> {
        self.list.values()
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn set_wrap(&mut self, wrap: bool) {
        self.wrap = wrap;
    }

    fn set_current(&mut self, id: WorkspaceId) {
        if self.current != id {
            self.last = Some(self.current);
            self.current = id;
        }
    }

    /// Resolve `name` relative to `anchor`.
    ///
    /// Accepts a 1-based index, `left`/`right` (neighbours of the anchor,
    /// wrapping only if configured), `last` (previously current
    /// workspace) or a case-insensitive workspace name.
    pub fn find(&self, anchor: WorkspaceId, name: &str) -> Option<WorkspaceId> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }

        if let Ok(index) = name.parse::<usize>() {
            if (1..=self.list.len()).contains(&index) {
                return self.list.get_index(index - 1).map(|(&id, _)| id);
            }
        }

        match name.to_lowercase().as_str() {
            "left" => self.neighbour(anchor, false),
            "right" => self.neighbour(anchor, true),
            "last" => self.last,
            lower => self
                .list
                .values()
                .find(|ws| ws.name.to_lowercase() == lower)
                .map(|ws| ws.id),
        }
    }

    fn neighbour(&self, anchor: WorkspaceId, forward: bool) -> Option<WorkspaceId> {
        let index = self.list.get_index_of(&anchor)?;
        let len = self.list.len();
        let target = match (forward, self.wrap) {
            (true, _) if index + 1 < len => index + 1,
            (true, true) => 0,
            (false, _) if index > 0 => index - 1,
            (false, true) => len - 1,
            _ => return None,
        };
        self.list.get_index(target).map(|(&id, _)| id)
    }
}

// ── Workspace operations ─────────────────────────────────────────────

impl Core {
    /// Make `target` current and focus its topmost mapped view.
    pub fn workspaces_switch_to(&mut self, target: WorkspaceId) {
        let current = self.state.workspaces.current();
        if target == current {
            return;
        }
        let (Some(old), Some(new)) = (
            self.state.workspaces.get(current),
            self.state.workspaces.get(target),
        ) else {
            return;
        };
        let (old_tree, new_tree) = (old.tree, new.tree);
        info!("Switching to workspace '{}'", new.name);

        self.scene.set_enabled(old_tree, false);
        self.scene.set_enabled(new_tree, true);
        self.state.workspaces.set_current(target);

        if self
            .state
            .cycle_view
            .is_some_and(|id| !self.state.is_view_visible(id))
        {
            self.state.cycle_view = None;
            self.osd_update();
        }
        self.desktop_focus_topmost_mapped_view();
    }

    /// Move a view to another workspace.
    pub fn workspaces_send_to(&mut self, id: ViewId, target: WorkspaceId) {
        let Some(target_tree) = self.state.workspaces.get(target).map(|ws| ws.tree) else {
            return;
        };
        let Some(view) = self.state.view_mut(id) else {
            return;
        };
        if view.workspace == target {
            return;
        }
        view.workspace = target;
        let pinned = view.flags.contains(ViewFlags::ALWAYS_ON_TOP);
        let tree = view.scene_tree;
        debug!("Sending {} to {}", id, target);

        if pinned {
            return;
        }
        self.scene.reparent(tree, target_tree);
        if self.state.focus.focused_view == Some(id) && target != self.state.workspaces.current() {
            self.desktop_unfocus();
            self.desktop_focus_topmost_mapped_view();
        }
    }
}
