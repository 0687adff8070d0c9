//! Benchmarks for pending move/resize reconciliation
//!
//! Every commit of a legacy-X window runs through reconciliation, so it
//! sits on the hot path of interactive resizing.

use std::rc::Rc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use stackway_core::config::Config;
use stackway_core::headless::{HeadlessScene, HeadlessXSurface};
use stackway_core::pending::PendingMoveResize;
use stackway_core::surface::{SurfaceId, XwaylandEvent, XwaylandSurface};
use stackway_core::{Core, CoreEvent, Geometry, OutputId};

fn reconcile_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile");

    group.bench_function("left_edge_resize", |b| {
        b.iter(|| {
            let mut view = Geometry::new(500, 300, 640, 480);
            let mut pending = PendingMoveResize::default();
            pending.request(view, Geometry::new(400, 300, 740, 480));
            // Client settles in two steps.
            pending.reconcile(&mut view, black_box(720), 480);
            pending.reconcile(&mut view, black_box(740), 480);
            view
        });
    });

    group.bench_function("commit_without_request", |b| {
        let mut pending = PendingMoveResize::default();
        let mut view = Geometry::new(0, 0, 640, 480);
        b.iter(|| pending.reconcile(&mut view, black_box(640), black_box(480)));
    });

    group.finish();
}

fn commit_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("commit");

    let mut core = Core::new(Config::default(), Box::new(HeadlessScene::default()));
    core.handle_event(CoreEvent::OutputAdded {
        id: OutputId(1),
        name: "bench".into(),
        geometry: Geometry::new(0, 0, 1920, 1080),
        usable_area: None,
    });
    let client = Rc::new(HeadlessXSurface::new(SurfaceId(1), Geometry::new(0, 0, 640, 480)));
    let window: Rc<dyn XwaylandSurface> = client.clone();
    core.xwayland_new_surface(Rc::clone(&window));
    core.xwayland_notify(&window, XwaylandEvent::Map);
    client.ack_configure();
    let Some(id) = core.focused_view() else {
        return;
    };

    group.bench_function("interactive_resize_step", |b| {
        let mut width = 640;
        b.iter(|| {
            width = if width >= 900 { 640 } else { width + 3 };
            let geo = core.view(id).map_or_else(Geometry::default, |view| view.geometry);
            core.view_move_resize(id, Geometry::new(geo.x - 3, geo.y, width, geo.height));
            client.ack_configure();
            if let Some(surface) = client.wl_surface() {
                core.surface_commit(surface.as_ref());
            }
        });
    });

    group.finish();
}

criterion_group!(benches, reconcile_benchmark, commit_benchmark);
criterion_main!(benches);
