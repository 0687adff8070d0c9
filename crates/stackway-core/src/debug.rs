//! JSON snapshot of the core state, emitted by the `Debug` action.

use serde::Serialize;

use crate::osd::Osd;
use crate::state::{Geometry, OutputId};
use crate::view::{ViewFlags, ViewId};
use crate::workspace::WorkspaceId;
use crate::xwayland::UnmanagedId;
use crate::Core;

#[derive(Debug, Serialize)]
struct ViewSnapshot<'a> {
    id: ViewId,
    title: &'a str,
    app_id: &'a str,
    geometry: Geometry,
    natural_geometry: Geometry,
    workspace: WorkspaceId,
    output: Option<OutputId>,
    mapped: bool,
    minimized: bool,
    maximized: bool,
    fullscreen: bool,
    always_on_top: bool,
    decorated: bool,
    tiled: Option<String>,
    pending_resize: bool,
}

#[derive(Debug, Serialize)]
struct WorkspaceSnapshot<'a> {
    id: WorkspaceId,
    name: &'a str,
    current: bool,
}

#[derive(Debug, Serialize)]
struct UnmanagedSnapshot {
    id: UnmanagedId,
    mapped: bool,
    geometry: Geometry,
}

#[derive(Debug, Serialize)]
struct StateSnapshot<'a> {
    /// Bottom-most first, as stacked
    views: Vec<ViewSnapshot<'a>>,
    workspaces: Vec<WorkspaceSnapshot<'a>>,
    unmanaged: Vec<UnmanagedSnapshot>,
    focused_view: Option<ViewId>,
    cycle_view: Option<ViewId>,
    open_menu: Option<&'a str>,
    osd: &'a Osd,
    cursor: (f64, f64),
}

impl Core {
    /// Serialize views, workspaces and focus into pretty-printed JSON.
    pub fn dump_state(&self) -> serde_json::Result<String> {
        let state = &self.state;
        let current = state.workspaces.current();

        let views = state
            .views
            .values()
            .map(|toplevel| {
                let view = &toplevel.view;
                ViewSnapshot {
                    id: view.id,
                    title: &view.title,
                    app_id: &view.app_id,
                    geometry: view.geometry,
                    natural_geometry: view.natural_geometry,
                    workspace: view.workspace,
                    output: view.output,
                    mapped: view.is_mapped(),
                    minimized: view.flags.contains(ViewFlags::MINIMIZED),
                    maximized: view.flags.contains(ViewFlags::MAXIMIZED),
                    fullscreen: view.flags.contains(ViewFlags::FULLSCREEN),
                    always_on_top: view.flags.contains(ViewFlags::ALWAYS_ON_TOP),
                    decorated: view.ssd.enabled,
                    tiled: view.tiled.map(|edge| format!("{edge:?}")),
                    pending_resize: view.pending.is_moving(),
                }
            })
            .collect();

        let workspaces = state
            .workspaces
            .iter()
            .map(|workspace| WorkspaceSnapshot {
                id: workspace.id,
                name: &workspace.name,
                current: workspace.id == current,
            })
            .collect();

        let unmanaged = state
            .unmanaged
            .values()
            .map(|surface| UnmanagedSnapshot {
                id: surface.id,
                mapped: surface.is_mapped(),
                geometry: surface.geometry(),
            })
            .collect();

        let snapshot = StateSnapshot {
            views,
            workspaces,
            unmanaged,
            focused_view: state.focus.focused_view,
            cycle_view: state.cycle_view,
            open_menu: state.menus.open_menu().map(|open| open.id.as_str()),
            osd: &state.osd,
            cursor: state.cursor,
        };

        serde_json::to_string_pretty(&snapshot)
    }
}

#[cfg(test)]
mod tests {
    use crate::config::Config;
    use crate::headless::HeadlessScene;
    use crate::Core;

    #[test]
    fn test_dump_empty_state() {
        let core = Core::new(Config::default(), Box::new(HeadlessScene::default()));
        let json = core.dump_state().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["views"].as_array().map(Vec::len), Some(0));
        assert!(value["focused_view"].is_null());
        assert_eq!(value["workspaces"][0]["current"], true);
    }
}
