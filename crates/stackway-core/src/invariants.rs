//! Invariant validation for the core state.
//!
//! Called after every entry point in debug builds.

use crate::state::State;

/// Error indicating which invariant was violated.
#[derive(Debug, thiserror::Error)]
pub enum InvariantError {
    #[error("Focused view {0} does not exist")]
    FocusedViewMissing(String),

    #[error("Focused view {0} is not mapped")]
    FocusedViewUnmapped(String),

    #[error("Focused view {0} is not on the current workspace")]
    FocusedViewHidden(String),

    #[error("Current workspace does not exist")]
    CurrentWorkspaceMissing,

    #[error("View {0} belongs to a workspace that does not exist")]
    ViewWorkspaceMissing(String),

    #[error("View {0} mapped state disagrees with its surface tree")]
    SurfaceTreeMismatch(String),

    #[error("View {0} mapped state disagrees with its commit listener")]
    CommitListenerMismatch(String),

    #[error("Unmanaged surface {0} mapped state disagrees with its commit listener")]
    UnmanagedCommitMismatch(String),

    #[error("Menu '{0}' was triggered by a view that no longer exists")]
    MenuTriggerMissing(String),

    #[error("Cycled view {0} does not exist")]
    CycleViewMissing(String),

    #[error("Grabbed view {0} does not exist")]
    GrabViewMissing(String),
}

/// Validate all core invariants. Returns the first violation found.
pub fn validate(state: &State) -> Result<(), InvariantError> {
    // 1. Focused view must exist and be mapped
    if let Some(id) = state.focus.focused_view {
        let view = state
            .view(id)
            .ok_or_else(|| InvariantError::FocusedViewMissing(format!("{id}")))?;
        if !view.is_mapped() {
            return Err(InvariantError::FocusedViewUnmapped(format!("{id}")));
        }
        if !state.is_view_visible(id) {
            return Err(InvariantError::FocusedViewHidden(format!("{id}")));
        }
    }

    // 2. Workspaces referenced by the registry and by views exist
    if !state.workspaces.contains(state.workspaces.current()) {
        return Err(InvariantError::CurrentWorkspaceMissing);
    }

    for (&id, toplevel) in &state.views {
        let view = &toplevel.view;
        if !state.workspaces.contains(view.workspace) {
            return Err(InvariantError::ViewWorkspaceMissing(format!("{id}")));
        }

        // 3. Mapped exactly while drawable and observing commits
        if view.is_mapped() != view.surface_tree.is_some() {
            return Err(InvariantError::SurfaceTreeMismatch(format!("{id}")));
        }
        if view.is_mapped() != toplevel.imp.is_observing_commits() {
            return Err(InvariantError::CommitListenerMismatch(format!("{id}")));
        }
    }

    for (&id, unmanaged) in &state.unmanaged {
        if unmanaged.is_mapped() != unmanaged.is_observing_commits() {
            return Err(InvariantError::UnmanagedCommitMismatch(format!("{id}")));
        }
    }

    // 4. Nothing refers to destroyed views
    for (menu, view) in state.menus.triggering_views() {
        if !state.views.contains_key(&view) {
            return Err(InvariantError::MenuTriggerMissing(menu.to_string()));
        }
    }
    if let Some(id) = state.cycle_view {
        if !state.views.contains_key(&id) {
            return Err(InvariantError::CycleViewMissing(format!("{id}")));
        }
    }
    if let Some(grab) = state.grab {
        if !state.views.contains_key(&grab.view) {
            return Err(InvariantError::GrabViewMissing(format!("{}", grab.view)));
        }
    }

    Ok(())
}
