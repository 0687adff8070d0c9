//! Benchmarks for action parsing and dispatch
//!
//! Bindings resolve names once at load time, but every key press runs a
//! full action list, re-resolving the target view before each action.

use std::rc::Rc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use stackway_core::config::{ActionConfig, Config};
use stackway_core::headless::{HeadlessScene, HeadlessXSurface};
use stackway_core::surface::{SurfaceId, XwaylandEvent, XwaylandSurface};
use stackway_core::{ActionList, ActionType, Core, CoreEvent, Geometry, OutputId};

fn core_with_windows(count: u64) -> Core {
    let mut core = Core::new(Config::default(), Box::new(HeadlessScene::default()));
    core.handle_event(CoreEvent::OutputAdded {
        id: OutputId(1),
        name: "bench".into(),
        geometry: Geometry::new(0, 0, 1920, 1080),
        usable_area: None,
    });
    for i in 1..=count {
        let window: Rc<dyn XwaylandSurface> = Rc::new(HeadlessXSurface::new(
            SurfaceId(i),
            Geometry::new(0, 0, 400 + i as i32, 300),
        ));
        core.xwayland_new_surface(Rc::clone(&window));
        core.xwayland_notify(&window, XwaylandEvent::Map);
    }
    core
}

fn action_name_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("action_names");

    for name in ["Close", "togglealwaysontop", "SendToDesktop", "Frobnicate"] {
        group.bench_with_input(BenchmarkId::new("from_name", name), name, |b, name| {
            b.iter(|| ActionType::from_name(black_box(name)));
        });
    }

    group.finish();
}

fn dispatch_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");

    let configs = vec![
        ActionConfig::new("Raise"),
        ActionConfig::new("ToggleAlwaysOnTop"),
        ActionConfig::new("ToggleAlwaysOnTop"),
        ActionConfig::with_arg("MoveToEdge", "left"),
    ];
    let list = ActionList::from_config(&configs);

    for windows in [1, 10, 50] {
        let mut core = core_with_windows(windows);
        group.bench_with_input(BenchmarkId::new("run_actions", windows), &list, |b, list| {
            b.iter(|| core.run_actions(None, black_box(list), Default::default()));
        });
    }

    let mut core = core_with_windows(20);
    let cycle = ActionList::from_config(&[ActionConfig::new("NextWindow")]);
    group.bench_function("next_window", |b| {
        b.iter(|| core.run_actions(None, black_box(&cycle), Default::default()));
    });

    group.finish();
}

criterion_group!(benches, action_name_benchmark, dispatch_benchmark);
criterion_main!(benches);
