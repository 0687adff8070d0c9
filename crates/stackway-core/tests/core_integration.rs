//! Core-only integration tests.
//!
//! These tests drive stackway-core through its public entry points with
//! the headless scene and scripted X surfaces standing in for the
//! compositing library and the clients.

use std::rc::Rc;

use pretty_assertions::assert_eq;
use proptest::prelude::*;

use stackway_core::config::Config;
use stackway_core::headless::{HeadlessScene, HeadlessXSurface};
use stackway_core::input::Modifiers;
use stackway_core::menu::CLIENT_MENU;
use stackway_core::scene::NodeId;
use stackway_core::surface::{SurfaceId, SurfaceOwner, XwaylandEvent, XwaylandSurface};
use stackway_core::{Action, ActionList, Core, CoreAction, CoreEvent, Geometry, OutputId};
use stackway_core::{ViewId, WorkspaceId};

/// Helper: create a core with default config and a 1920×1080 output.
fn test_core() -> Core {
    core_with_scene(HeadlessScene::default())
}

fn core_with_scene(scene: HeadlessScene) -> Core {
    let mut core = Core::new(Config::default(), Box::new(scene));
    core.handle_event(CoreEvent::OutputAdded {
        id: OutputId(1),
        name: "test-output".into(),
        geometry: Geometry::new(0, 0, 1920, 1080),
        usable_area: None,
    });
    core
}

/// A client window, both as the scripted surface and as the core sees it.
struct Window {
    client: Rc<HeadlessXSurface>,
    handle: Rc<dyn XwaylandSurface>,
    id: ViewId,
}

impl Window {
    fn closes(&self) -> usize {
        self.client.state().closes
    }
}

/// Helper: create and map a managed window, then let it ack the
/// placement configure.
fn map_window(core: &mut Core, surface: u64, width: i32, height: i32) -> Window {
    let window = new_window(core, surface, width, height);
    core.xwayland_notify(&window.handle, XwaylandEvent::Map);
    window.client.ack_configure();
    window
}

fn new_window(core: &mut Core, surface: u64, width: i32, height: i32) -> Window {
    let client = Rc::new(HeadlessXSurface::new(
        SurfaceId(surface),
        Geometry::new(0, 0, width, height),
    ));
    let handle: Rc<dyn XwaylandSurface> = client.clone();
    let SurfaceOwner::View(id) = core.xwayland_new_surface(Rc::clone(&handle)) else {
        panic!("managed window was not adopted as a view");
    };
    Window { client, handle, id }
}

fn actions(list: &[(&str, Option<&str>)]) -> ActionList {
    list.iter().map(|&(name, arg)| Action::new(name, arg)).collect()
}

fn commit(core: &mut Core, window: &Window) {
    let surface = window.client.wl_surface().expect("window has a surface");
    core.surface_commit(surface.as_ref());
}

/// Number of nodes under `root` (inclusive) that draw `surface`.
fn surface_nodes(core: &Core, root: NodeId, surface: SurfaceId) -> usize {
    let own = usize::from(core.scene.surface_of(root) == Some(surface));
    own + core
        .scene
        .children(root)
        .into_iter()
        .map(|child| surface_nodes(core, child, surface))
        .sum::<usize>()
}

// ── Test 1: unknown actions ──────────────────────────────────────

#[test]
fn unknown_action_is_a_no_op() {
    let mut core = test_core();
    let window = map_window(&mut core, 1, 400, 300);
    let before = core.view(window.id).unwrap().geometry;

    let result = core.run_actions(
        None,
        &actions(&[("Frobnicate", None), ("", None)]),
        Default::default(),
    );

    assert!(result.is_empty());
    assert_eq!(core.focused_view(), Some(window.id));
    assert_eq!(core.view(window.id).unwrap().geometry, before);
    assert_eq!(window.closes(), 0);
}

// ── Test 2: stale activators ─────────────────────────────────────

proptest! {
    #[test]
    fn destroyed_activator_targets_nothing(count in 2usize..6, victim in 0usize..6) {
        let mut core = test_core();
        let windows: Vec<Window> = (0..count)
            .map(|i| map_window(&mut core, i as u64 + 1, 300 + 10 * i as i32, 200))
            .collect();
        let victim = &windows[victim % count];

        core.xwayland_notify(&victim.handle, XwaylandEvent::Destroy);
        prop_assert!(core.view(victim.id).is_none());

        core.run_actions(
            Some(victim.id),
            &actions(&[("Close", None), ("ToggleMaximize", None)]),
            Default::default(),
        );

        for window in &windows {
            prop_assert_eq!(window.closes(), 0);
            prop_assert!(!window.client.state().maximized);
        }
    }
}

#[test]
fn missing_activator_targets_focused_view() {
    let mut core = test_core();
    let below = map_window(&mut core, 1, 400, 300);
    let focused = map_window(&mut core, 2, 400, 300);

    core.run_actions(None, &actions(&[("Close", None)]), Default::default());

    assert_eq!(focused.closes(), 1);
    assert_eq!(below.closes(), 0);
}

// ── Test 3: pending move/resize ──────────────────────────────────

#[test]
fn left_edge_resize_keeps_right_edge_until_client_catches_up() {
    let mut core = test_core();
    let window = map_window(&mut core, 1, 400, 300);
    let start = core.view(window.id).unwrap().geometry;
    let right_edge = start.x + start.width;

    core.view_move_resize(
        window.id,
        Geometry::new(start.x - 100, start.y, start.width + 100, start.height),
    );
    // Nothing moves before the client commits the new size.
    assert_eq!(core.view(window.id).unwrap().geometry, start);
    assert!(core.view(window.id).unwrap().pending.update_x);

    // The client rounds to its size increment first.
    let surface = Rc::clone(window.client.wl_surface().unwrap());
    surface.set_size(start.width + 60, start.height);
    commit(&mut core, &window);

    let view = core.view(window.id).unwrap();
    assert_eq!(view.geometry.x + view.geometry.width, right_edge);
    assert_eq!(view.geometry.width, start.width + 60);
    assert!(view.pending.update_x);
    assert!(!view.pending.update_y);

    // Then it commits exactly what was asked for.
    assert!(window.client.ack_configure());
    commit(&mut core, &window);

    let view = core.view(window.id).unwrap();
    assert_eq!(
        view.geometry,
        Geometry::new(start.x - 100, start.y, start.width + 100, start.height)
    );
    assert!(!view.pending.is_moving());
    assert_eq!(core.scene.position(view.scene_tree), Some((start.x - 100, start.y)));
}

#[test]
fn position_only_request_is_a_move() {
    let mut core = test_core();
    let window = map_window(&mut core, 1, 400, 300);
    let start = core.view(window.id).unwrap().geometry;

    core.view_move_resize(window.id, Geometry::new(10, 20, start.width, start.height));

    let view = core.view(window.id).unwrap();
    assert_eq!((view.geometry.x, view.geometry.y), (10, 20));
    assert!(!view.pending.is_moving());
    assert_eq!(core.scene.position(view.scene_tree), Some((10, 20)));
    assert_eq!(
        window.client.last_configure(),
        Some(Geometry::new(10, 20, start.width, start.height))
    );
}

#[test]
fn resize_waits_for_the_client_commit() {
    let mut core = test_core();
    let window = map_window(&mut core, 1, 400, 300);
    let start = core.view(window.id).unwrap().geometry;
    let requested = Geometry::new(start.x + 77, start.y, start.width + 20, start.height);

    core.view_move_resize(window.id, requested);
    assert_eq!(core.view(window.id).unwrap().geometry, start);
    assert_eq!(window.client.last_configure(), Some(requested));

    window.client.ack_configure();
    commit(&mut core, &window);
    assert_eq!(core.view(window.id).unwrap().geometry, requested);
}

#[test]
fn request_configure_is_clamped_to_minimum_size() {
    let mut core = test_core();
    let window = map_window(&mut core, 1, 400, 300);

    core.xwayland_notify(
        &window.handle,
        XwaylandEvent::RequestConfigure(Geometry::new(50, 60, 10, 10)),
    );

    let sent = window.client.last_configure().unwrap();
    assert_eq!((sent.x, sent.y), (50, 60));
    assert!(sent.width >= stackway_core::view::MIN_VIEW_WIDTH);
    assert!(sent.height >= stackway_core::view::MIN_VIEW_HEIGHT);
}

#[test]
fn request_configure_position_applies_on_commit() {
    let mut core = test_core();
    let window = map_window(&mut core, 1, 400, 300);
    let start = core.view(window.id).unwrap().geometry;

    core.xwayland_notify(
        &window.handle,
        XwaylandEvent::RequestConfigure(Geometry::new(50, 60, 500, 400)),
    );

    // Nothing moves before the client draws the new size.
    let view = core.view(window.id).unwrap();
    assert_eq!(view.geometry, start);
    assert_eq!(core.scene.position(view.scene_tree), Some((start.x, start.y)));

    window.client.ack_configure();
    commit(&mut core, &window);
    let view = core.view(window.id).unwrap();
    assert_eq!(view.geometry, Geometry::new(50, 60, 500, 400));
    assert!(!view.pending.is_moving());
    assert_eq!(core.scene.position(view.scene_tree), Some((50, 60)));
}

// ── Test 4: map/unmap lifecycle ──────────────────────────────────

#[test]
fn map_is_idempotent() {
    let mut core = test_core();
    let window = map_window(&mut core, 7, 400, 300);
    core.xwayland_notify(&window.handle, XwaylandEvent::Map);

    let tree = core.view(window.id).unwrap().scene_tree;
    assert_eq!(surface_nodes(&core, tree, SurfaceId(7)), 1);

    core.xwayland_notify(&window.handle, XwaylandEvent::Unmap);
    assert_eq!(surface_nodes(&core, tree, SurfaceId(7)), 0);
    assert!(!core.view(window.id).unwrap().is_mapped());
    assert_eq!(core.focused_view(), None);

    core.xwayland_notify(&window.handle, XwaylandEvent::Map);
    assert_eq!(surface_nodes(&core, tree, SurfaceId(7)), 1);
    assert_eq!(core.focused_view(), Some(window.id));
}

#[test]
fn failed_map_posts_no_memory_and_stays_unmapped() {
    let mut scene = HeadlessScene::default();
    scene.fail_surface_trees = true;
    let mut core = core_with_scene(scene);
    let window = new_window(&mut core, 1, 400, 300);

    core.xwayland_notify(&window.handle, XwaylandEvent::Map);

    assert_eq!(window.client.state().no_memory, 1);
    assert!(!core.view(window.id).unwrap().is_mapped());
    assert_eq!(core.focused_view(), None);
    assert!(core.state.validate_invariants().is_ok());
}

#[test]
fn unmapping_focused_view_focuses_next_topmost() {
    let mut core = test_core();
    let below = map_window(&mut core, 1, 400, 300);
    let top = map_window(&mut core, 2, 400, 300);
    assert_eq!(core.focused_view(), Some(top.id));

    core.xwayland_notify(&top.handle, XwaylandEvent::Unmap);

    assert_eq!(core.focused_view(), Some(below.id));
    assert!(below.client.state().activated);
}

// ── Test 5: workspaces ───────────────────────────────────────────

#[test]
fn go_to_desktop_left_right_round_trip() {
    let mut core = test_core();
    let window = map_window(&mut core, 1, 400, 300);

    core.run_actions(None, &actions(&[("GoToDesktop", Some("right"))]), Default::default());
    assert_eq!(core.current_workspace(), WorkspaceId(2));
    assert_eq!(core.focused_view(), None);
    let tree = core.view(window.id).unwrap().scene_tree;
    assert!(!core.scene.is_visible(tree));

    core.run_actions(None, &actions(&[("GoToDesktop", Some("left"))]), Default::default());
    assert_eq!(core.current_workspace(), WorkspaceId(1));
    assert_eq!(core.focused_view(), Some(window.id));
    assert!(core.scene.is_visible(tree));

    // No wrapping by default.
    core.run_actions(None, &actions(&[("GoToDesktop", Some("left"))]), Default::default());
    assert_eq!(core.current_workspace(), WorkspaceId(1));
}

#[test]
fn send_to_desktop_right_at_last_workspace_stays() {
    let mut core = test_core();
    core.run_actions(None, &actions(&[("GoToDesktop", Some("4"))]), Default::default());
    let window = map_window(&mut core, 1, 400, 300);
    assert_eq!(core.view(window.id).unwrap().workspace, WorkspaceId(4));

    core.run_actions(
        Some(window.id),
        &actions(&[("SendToDesktop", Some("right"))]),
        Default::default(),
    );

    assert_eq!(core.view(window.id).unwrap().workspace, WorkspaceId(4));
    assert_eq!(core.focused_view(), Some(window.id));
}

#[test]
fn send_to_desktop_hides_and_unfocuses() {
    let mut core = test_core();
    let window = map_window(&mut core, 1, 400, 300);

    core.run_actions(
        Some(window.id),
        &actions(&[("SendToDesktop", Some("2"))]),
        Default::default(),
    );

    let view = core.view(window.id).unwrap();
    assert_eq!(view.workspace, WorkspaceId(2));
    assert!(!core.scene.is_visible(view.scene_tree));
    assert_eq!(core.focused_view(), None);
}

#[test]
fn views_on_other_workspaces_never_take_focus() {
    let mut core = test_core();
    let home = map_window(&mut core, 1, 400, 300);
    let away = map_window(&mut core, 2, 400, 300);
    core.run_actions(
        Some(away.id),
        &actions(&[("SendToDesktop", Some("2"))]),
        Default::default(),
    );
    assert_eq!(core.focused_view(), Some(home.id));

    // The client remaps itself while its workspace is hidden.
    core.xwayland_notify(&away.handle, XwaylandEvent::Unmap);
    core.xwayland_notify(&away.handle, XwaylandEvent::Map);
    assert_eq!(core.focused_view(), Some(home.id));

    core.xwayland_notify(&away.handle, XwaylandEvent::RequestActivate);
    assert_eq!(core.focused_view(), Some(home.id));
    assert!(core.state.validate_invariants().is_ok());

    core.run_actions(None, &actions(&[("GoToDesktop", Some("2"))]), Default::default());
    assert_eq!(core.focused_view(), Some(away.id));
}

#[test]
fn unpinned_view_joins_the_current_workspace() {
    let mut core = test_core();
    let window = map_window(&mut core, 1, 400, 300);
    core.run_actions(None, &actions(&[("ToggleAlwaysOnTop", None)]), Default::default());
    core.run_actions(None, &actions(&[("GoToDesktop", Some("3"))]), Default::default());
    assert_eq!(core.focused_view(), Some(window.id));

    core.run_actions(None, &actions(&[("ToggleAlwaysOnTop", None)]), Default::default());

    assert_eq!(core.view(window.id).unwrap().workspace, WorkspaceId(3));
    assert_eq!(core.focused_view(), Some(window.id));
    assert!(core.state.validate_invariants().is_ok());
}

// ── Test 6: target re-resolution within a list ───────────────────

#[test]
fn focus_then_close_closes_the_newly_focused_view() {
    let mut core = test_core();
    let large = map_window(&mut core, 1, 800, 600);
    let small = map_window(&mut core, 2, 200, 100);
    assert_eq!(core.focused_view(), Some(small.id));

    // A point inside the large window, away from the small centered one.
    let geo = core.view(large.id).unwrap().geometry;
    core.handle_event(CoreEvent::PointerMotion {
        x: f64::from(geo.x + 5),
        y: f64::from(geo.y + 5),
    });

    core.run_actions(None, &actions(&[("Focus", None), ("Close", None)]), Default::default());

    assert_eq!(large.closes(), 1);
    assert_eq!(small.closes(), 0);
}

#[test]
fn focus_then_close_with_nothing_under_cursor_closes_focused_view() {
    let mut core = test_core();
    let below = map_window(&mut core, 1, 400, 300);
    let focused = map_window(&mut core, 2, 400, 300);

    // Windows are centered on the output; the top-left corner is empty.
    core.handle_event(CoreEvent::PointerMotion { x: 2.0, y: 2.0 });

    core.run_actions(None, &actions(&[("Focus", None), ("Close", None)]), Default::default());

    assert_eq!(core.focused_view(), Some(focused.id));
    assert_eq!(focused.closes(), 1);
    assert_eq!(below.closes(), 0);
}

// ── Test 7: menus ────────────────────────────────────────────────

#[test]
fn client_menu_without_view_does_not_open() {
    let mut core = test_core();

    core.run_actions(None, &actions(&[("ShowMenu", Some(CLIENT_MENU))]), Default::default());
    assert!(core.state.menus.open_menu().is_none());

    core.run_actions(None, &actions(&[("ShowMenu", Some("root-menu"))]), Default::default());
    assert_eq!(core.state.menus.open_menu().map(|m| m.id.as_str()), Some("root-menu"));

    core.run_actions(None, &actions(&[("ShowMenu", Some("no-such-menu"))]), Default::default());
    assert_eq!(core.state.menus.open_menu().map(|m| m.id.as_str()), Some("root-menu"));
}

#[test]
fn menu_trigger_is_forgotten_when_view_is_destroyed() {
    let mut core = test_core();
    let window = map_window(&mut core, 1, 400, 300);

    core.run_actions(
        Some(window.id),
        &actions(&[("ShowMenu", Some(CLIENT_MENU))]),
        Default::default(),
    );
    assert_eq!(
        core.state.menus.get(CLIENT_MENU).unwrap().triggered_by_view,
        Some(window.id)
    );

    core.xwayland_notify(&window.handle, XwaylandEvent::Destroy);

    assert_eq!(core.state.menus.get(CLIENT_MENU).unwrap().triggered_by_view, None);
    assert!(core.state.validate_invariants().is_ok());
}

#[test]
fn menu_item_runs_against_triggering_view() {
    let mut core = test_core();
    let target = map_window(&mut core, 1, 400, 300);
    let other = map_window(&mut core, 2, 400, 300);

    core.run_actions(
        Some(target.id),
        &actions(&[("ShowMenu", Some(CLIENT_MENU))]),
        Default::default(),
    );
    let close_index = core
        .state
        .menus
        .get(CLIENT_MENU)
        .unwrap()
        .items
        .iter()
        .position(|item| item.label == "Close")
        .unwrap();

    core.handle_event(CoreEvent::MenuItemSelected { index: close_index });

    assert!(core.state.menus.open_menu().is_none());
    assert_eq!(target.closes(), 1);
    assert_eq!(other.closes(), 0);
}

#[test]
fn root_menu_exit_item_reaches_the_host() {
    let mut core = test_core();
    core.run_actions(None, &actions(&[("ShowMenu", Some("root-menu"))]), Default::default());

    let result = core.handle_event(CoreEvent::MenuItemSelected { index: 2 });

    assert_eq!(result, vec![CoreAction::Exit]);
    assert!(core.should_exit);
}

// ── Test 8: override-redirect reclassification ───────────────────

#[test]
fn override_redirect_toggle_keeps_window_visible() {
    let mut core = test_core();
    let window = map_window(&mut core, 9, 400, 300);
    let layer = core.state.layers.unmanaged;

    window.client.update(|state| state.override_redirect = true);
    core.xwayland_notify(&window.handle, XwaylandEvent::SetOverrideRedirect);

    assert!(core.view(window.id).is_none());
    assert_eq!(core.focused_view(), None);
    assert_eq!(core.state.unmanaged.len(), 1);
    assert!(core.state.unmanaged.values().all(|u| u.is_mapped()));
    assert_eq!(surface_nodes(&core, layer, SurfaceId(9)), 1);

    window.client.update(|state| state.override_redirect = false);
    core.xwayland_notify(&window.handle, XwaylandEvent::SetOverrideRedirect);

    assert!(core.state.unmanaged.is_empty());
    assert_eq!(surface_nodes(&core, layer, SurfaceId(9)), 0);
    let (&id, toplevel) = core.state.views.first().unwrap();
    assert!(toplevel.view.is_mapped());
    assert_eq!(core.focused_view(), Some(id));
    assert!(core.state.validate_invariants().is_ok());
}

#[test]
fn override_redirect_surface_is_never_a_view() {
    let mut core = test_core();
    let client = Rc::new(
        HeadlessXSurface::new(SurfaceId(3), Geometry::new(40, 50, 120, 80))
            .with_override_redirect(true),
    );
    let handle: Rc<dyn XwaylandSurface> = client.clone();

    let owner = core.xwayland_new_surface(Rc::clone(&handle));
    core.xwayland_notify(&handle, XwaylandEvent::Map);

    assert!(matches!(owner, SurfaceOwner::Unmanaged(_)));
    assert!(core.state.views.is_empty());
    assert_eq!(core.focused_view(), None);
    assert_eq!(client.state().pings, 1);

    core.xwayland_notify(&handle, XwaylandEvent::Destroy);
    assert!(core.state.unmanaged.is_empty());
    assert_eq!(handle.events().subscriptions_of(owner), 0);
}

// ── Test 9: host actions ─────────────────────────────────────────

#[test]
fn execute_returns_spawn_with_argv() {
    let mut core = test_core();

    let result = core.run_actions(
        None,
        &actions(&[("Execute", Some("foot -e 'htop -d 5'"))]),
        Default::default(),
    );

    assert_eq!(
        result,
        vec![CoreAction::SpawnProcess {
            command: "foot -e 'htop -d 5'".into(),
            argv: vec!["foot".into(), "-e".into(), "htop -d 5".into()],
        }]
    );
}

#[test]
fn reconfigure_and_exit_are_host_actions() {
    let mut core = test_core();

    let result = core.run_actions(
        None,
        &actions(&[("Reconfigure", None), ("Exit", None)]),
        Default::default(),
    );

    assert_eq!(result, vec![CoreAction::ReloadConfig, CoreAction::Exit]);
    assert!(core.should_exit);
}

#[test]
fn reload_rebuilds_bindings_and_keeps_views() {
    let mut core = test_core();
    let window = map_window(&mut core, 1, 400, 300);
    assert!(!core.bindings().keybinds.is_empty());

    let mut config = Config::default();
    config.keybinds.truncate(1);
    config.mousebinds.clear();
    core.reload_config(config);

    assert_eq!(core.bindings().keybinds.len(), 1);
    assert!(core.bindings().mousebinds.is_empty());
    assert_eq!(core.focused_view(), Some(window.id));
}

// ── Test 10: window cycling ──────────────────────────────────────

#[test]
fn alt_tab_cycles_and_focuses_on_release() {
    let mut core = test_core();
    let below = map_window(&mut core, 1, 400, 300);
    let top = map_window(&mut core, 2, 400, 300);

    core.handle_event(CoreEvent::Modifiers {
        modifiers: Modifiers::ALT,
    });
    core.handle_event(CoreEvent::Key {
        key: "Tab".into(),
        pressed: true,
    });

    assert_eq!(core.state.cycle_view, Some(below.id));
    assert!(core.state.osd.visible);
    assert_eq!(core.state.osd.selected_entry().map(|e| e.view), Some(below.id));
    // Focus does not move until the modifier is released.
    assert_eq!(core.focused_view(), Some(top.id));

    core.handle_event(CoreEvent::Modifiers {
        modifiers: Modifiers::empty(),
    });

    assert_eq!(core.state.cycle_view, None);
    assert!(!core.state.osd.visible);
    assert_eq!(core.focused_view(), Some(below.id));
}

// ── Test 11: client requests ─────────────────────────────────────

#[test]
fn minimize_request_unmaps_and_map_restores() {
    let mut core = test_core();
    let window = map_window(&mut core, 1, 400, 300);

    core.xwayland_notify(&window.handle, XwaylandEvent::RequestMinimize { minimize: true });
    let view = core.view(window.id).unwrap();
    assert!(view.is_minimized());
    assert!(!view.is_mapped());
    assert_eq!(core.focused_view(), None);

    core.xwayland_notify(&window.handle, XwaylandEvent::Map);
    let view = core.view(window.id).unwrap();
    assert!(!view.is_minimized());
    assert!(view.is_mapped());
}

#[test]
fn fullscreen_request_covers_output() {
    let mut core = test_core();
    let window = map_window(&mut core, 1, 400, 300);

    window.client.update(|state| state.fullscreen = true);
    core.xwayland_notify(&window.handle, XwaylandEvent::RequestFullscreen);

    assert!(core.view(window.id).unwrap().is_fullscreen());
    assert_eq!(
        window.client.last_configure(),
        Some(Geometry::new(0, 0, 1920, 1080))
    );
}
