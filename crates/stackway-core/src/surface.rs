//! Handles to client surfaces owned by the protocol library.
//!
//! These traits describe what the core reads from and sends to a client;
//! the library (or the headless host) implements them. All methods take
//! `&self` because the library hands out shared handles.

use std::fmt;
use std::rc::Rc;

use crate::signal::EventSource;
use crate::state::Geometry;
use crate::view::ViewId;
use crate::xwayland::UnmanagedId;

/// Identifier of a `wl_surface`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceId(pub u64);

/// Receiver of a surface signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceOwner {
    View(ViewId),
    Unmanaged(UnmanagedId),
}

/// A `wl_surface`: the drawable buffer a client commits to.
pub trait WlSurface: fmt::Debug {
    fn id(&self) -> SurfaceId;

    /// Size of the most recently committed buffer.
    fn current_size(&self) -> (i32, i32);

    fn commit_source(&self) -> &EventSource<SurfaceOwner>;
}

/// Decoration hints advertised by a legacy-X client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum XDecorations {
    #[default]
    All,
    NoTitle,
    NoBorder,
}

/// Lifecycle and request signals of an XWayland surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum XwaylandEventKind {
    Map,
    Unmap,
    Destroy,
    RequestConfigure,
    RequestActivate,
    RequestMinimize,
    RequestMaximize,
    RequestFullscreen,
    RequestMove,
    RequestResize,
    SetTitle,
    SetClass,
    SetDecorations,
    SetOverrideRedirect,
}

impl XwaylandEventKind {
    pub const ALL: [Self; 14] = [
        Self::Map,
        Self::Unmap,
        Self::Destroy,
        Self::RequestConfigure,
        Self::RequestActivate,
        Self::RequestMinimize,
        Self::RequestMaximize,
        Self::RequestFullscreen,
        Self::RequestMove,
        Self::RequestResize,
        Self::SetTitle,
        Self::SetClass,
        Self::SetDecorations,
        Self::SetOverrideRedirect,
    ];

    const fn index(self) -> usize {
        self as usize
    }
}

/// An event raised by an XWayland surface, with its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XwaylandEvent {
    Map,
    Unmap,
    Destroy,
    RequestConfigure(Geometry),
    RequestActivate,
    RequestMinimize { minimize: bool },
    RequestMaximize,
    RequestFullscreen,
    RequestMove,
    /// Edges as a [`ResizeEdges`](crate::interactive::ResizeEdges) bit set.
    RequestResize { edges: u8 },
    SetTitle,
    SetClass,
    SetDecorations,
    SetOverrideRedirect,
}

impl XwaylandEvent {
    pub const fn kind(self) -> XwaylandEventKind {
        match self {
            Self::Map => XwaylandEventKind::Map,
            Self::Unmap => XwaylandEventKind::Unmap,
            Self::Destroy => XwaylandEventKind::Destroy,
            Self::RequestConfigure(_) => XwaylandEventKind::RequestConfigure,
            Self::RequestActivate => XwaylandEventKind::RequestActivate,
            Self::RequestMinimize { .. } => XwaylandEventKind::RequestMinimize,
            Self::RequestMaximize => XwaylandEventKind::RequestMaximize,
            Self::RequestFullscreen => XwaylandEventKind::RequestFullscreen,
            Self::RequestMove => XwaylandEventKind::RequestMove,
            Self::RequestResize { .. } => XwaylandEventKind::RequestResize,
            Self::SetTitle => XwaylandEventKind::SetTitle,
            Self::SetClass => XwaylandEventKind::SetClass,
            Self::SetDecorations => XwaylandEventKind::SetDecorations,
            Self::SetOverrideRedirect => XwaylandEventKind::SetOverrideRedirect,
        }
    }
}

/// One event source per [`XwaylandEventKind`].
pub struct XwaylandSignals {
    sources: [EventSource<SurfaceOwner>; XwaylandEventKind::ALL.len()],
}

impl Default for XwaylandSignals {
    fn default() -> Self {
        Self {
            sources: std::array::from_fn(|_| EventSource::default()),
        }
    }
}

impl XwaylandSignals {
    pub fn source(&self, kind: XwaylandEventKind) -> &EventSource<SurfaceOwner> {
        &self.sources[kind.index()]
    }

    /// Number of signals `owner` currently listens to.
    pub fn subscriptions_of(&self, owner: SurfaceOwner) -> usize {
        self.sources
            .iter()
            .filter(|source| source.listeners().contains(&owner))
            .count()
    }
}

impl fmt::Debug for XwaylandSignals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for kind in XwaylandEventKind::ALL {
            map.entry(&kind, &self.source(kind).listener_count());
        }
        map.finish()
    }
}

/// An X11 window bridged through XWayland.
pub trait XwaylandSurface: fmt::Debug {
    fn events(&self) -> &XwaylandSignals;

    /// The `wl_surface` associated with the window, once XWayland has
    /// paired them.
    fn surface(&self) -> Option<Rc<dyn WlSurface>>;

    /// Geometry as last set by the client.
    fn geometry(&self) -> Geometry;
    fn title(&self) -> Option<String>;
    fn class(&self) -> Option<String>;
    fn decorations(&self) -> XDecorations;

    fn is_mapped(&self) -> bool;
    fn is_override_redirect(&self) -> bool;
    fn is_fullscreen(&self) -> bool;
    fn is_minimized(&self) -> bool;

    fn configure(&self, x: i16, y: i16, width: u16, height: u16);
    fn close(&self);
    fn activate(&self, activated: bool);
    fn restack_above(&self);
    fn set_minimized(&self, minimized: bool);
    fn set_maximized(&self, maximized: bool);
    fn set_fullscreen(&self, fullscreen: bool);
    fn ping(&self);

    /// Report resource exhaustion to the client.
    fn post_no_memory(&self);
}
