//! Stackway Headless Backend — host adapter driving stackway-core.
//!
//! This crate:
//! - Owns the scripted client surfaces and the event loop.
//! - Maintains a mapping from host surface handles to X surfaces.
//! - Translates host events into core entry points.
//! - Applies returned `CoreAction`s (spawning, reloading, exiting).
//!
//! Host events come from a line-oriented script, one event per line:
//!
//! ```text
//! output 1 HDMI-A-1 0 0 1920 1080
//! new 1 0 0 640 480 foot Terminal
//! map 1
//! key A-Tab
//! modifiers none
//! ```

use std::collections::HashMap;
use std::os::unix::process::CommandExt;
use std::process::{Command as ProcessCommand, Stdio};
use std::rc::Rc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use calloop::channel::{self, Channel};
use calloop::EventLoop;
use thiserror::Error;
use tracing::{debug, error, info, trace, warn};

use stackway_core::config::Config;
use stackway_core::event::{CoreAction, CoreEvent};
use stackway_core::headless::{HeadlessScene, HeadlessXSurface};
use stackway_core::input::{InputError, KeyCombo, Modifiers, MouseButton};
use stackway_core::surface::{SurfaceId, XwaylandEvent, XwaylandSurface};
use stackway_core::{Action, ActionList, Core, Geometry, OutputId};

/// Host-side handle for a client window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceHandle(pub u64);

/// One scripted event from the host.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    /// A client created a window.
    NewSurface {
        handle: SurfaceHandle,
        geometry: Geometry,
        class: Option<String>,
        title: Option<String>,
        override_redirect: bool,
    },
    /// The client raised an event on one of its windows.
    Client {
        handle: SurfaceHandle,
        event: ClientEvent,
    },
    /// The client committed a buffer; `None` acks the last configure.
    Commit {
        handle: SurfaceHandle,
        size: Option<(i32, i32)>,
    },
    /// Press and release `key` with `modifiers` held.
    Key { modifiers: Modifiers, key: String },
    /// Run an action list with no activator.
    Action { name: String, arg: Option<String> },
    /// Output or input event passed straight to the core.
    Core(CoreEvent),
}

/// Client-side changes scripted for an existing window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    Map,
    Unmap,
    Destroy,
    RequestConfigure(Geometry),
    RequestActivate,
    RequestMinimize(bool),
    RequestMaximize,
    RequestFullscreen(bool),
    SetTitle(String),
    SetClass(String),
    SetOverrideRedirect(bool),
}

/// Script parse errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScriptError {
    #[error("Unknown command: {0}")]
    UnknownCommand(String),
    #[error("'{command}' expects {expected}")]
    MissingArgument {
        command: String,
        expected: &'static str,
    },
    #[error("Invalid number: {0}")]
    InvalidNumber(String),
    #[error("Expected on/off, got: {0}")]
    InvalidSwitch(String),
    #[error("{0}")]
    Input(String),
}

impl From<InputError> for ScriptError {
    fn from(e: InputError) -> Self {
        Self::Input(e.to_string())
    }
}

// ── Script parsing ───────────────────────────────────────────────────

struct Args<'a> {
    command: &'a str,
    words: std::str::SplitWhitespace<'a>,
}

impl<'a> Args<'a> {
    fn next(&mut self, expected: &'static str) -> Result<&'a str, ScriptError> {
        self.words.next().ok_or_else(|| ScriptError::MissingArgument {
            command: self.command.to_string(),
            expected,
        })
    }

    fn number<T: std::str::FromStr>(&mut self, expected: &'static str) -> Result<T, ScriptError> {
        let word = self.next(expected)?;
        word.parse()
            .map_err(|_| ScriptError::InvalidNumber(word.to_string()))
    }

    fn handle(&mut self) -> Result<SurfaceHandle, ScriptError> {
        self.number("a surface handle").map(SurfaceHandle)
    }

    fn geometry(&mut self) -> Result<Geometry, ScriptError> {
        Ok(Geometry::new(
            self.number("x y width height")?,
            self.number("x y width height")?,
            self.number("x y width height")?,
            self.number("x y width height")?,
        ))
    }

    fn switch(&mut self) -> Result<bool, ScriptError> {
        match self.next("on or off")? {
            "on" | "true" | "1" => Ok(true),
            "off" | "false" | "0" => Ok(false),
            other => Err(ScriptError::InvalidSwitch(other.to_string())),
        }
    }

    /// Everything left on the line, if anything.
    fn rest(&mut self) -> Option<String> {
        let rest: Vec<&str> = self.words.by_ref().collect();
        (!rest.is_empty()).then(|| rest.join(" "))
    }
}

/// Parse one script line. Blank lines and `#` comments yield `None`.
pub fn parse_host_event(line: &str) -> Result<Option<HostEvent>, ScriptError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let mut words = line.split_whitespace();
    let command = words.next().unwrap_or_default();
    let mut args = Args { command, words };

    let client = |args: &mut Args<'_>, event: ClientEvent| -> Result<HostEvent, ScriptError> {
        Ok(HostEvent::Client {
            handle: args.handle()?,
            event,
        })
    };

    let event = match command {
        "new" | "new-unmanaged" => {
            let handle = args.handle()?;
            let geometry = args.geometry()?;
            let class = args.words.next().map(str::to_string);
            HostEvent::NewSurface {
                handle,
                geometry,
                class,
                title: args.rest(),
                override_redirect: command == "new-unmanaged",
            }
        }
        "map" => client(&mut args, ClientEvent::Map)?,
        "unmap" => client(&mut args, ClientEvent::Unmap)?,
        "destroy" => client(&mut args, ClientEvent::Destroy)?,
        "activate" => client(&mut args, ClientEvent::RequestActivate)?,
        "minimize" => client(&mut args, ClientEvent::RequestMinimize(true))?,
        "restore" => client(&mut args, ClientEvent::RequestMinimize(false))?,
        "maximize" => client(&mut args, ClientEvent::RequestMaximize)?,
        "configure" => {
            let handle = args.handle()?;
            HostEvent::Client {
                handle,
                event: ClientEvent::RequestConfigure(args.geometry()?),
            }
        }
        "fullscreen" => {
            let handle = args.handle()?;
            HostEvent::Client {
                handle,
                event: ClientEvent::RequestFullscreen(args.switch()?),
            }
        }
        "override-redirect" => {
            let handle = args.handle()?;
            HostEvent::Client {
                handle,
                event: ClientEvent::SetOverrideRedirect(args.switch()?),
            }
        }
        "title" => {
            let handle = args.handle()?;
            HostEvent::Client {
                handle,
                event: ClientEvent::SetTitle(args.rest().unwrap_or_default()),
            }
        }
        "class" => {
            let handle = args.handle()?;
            HostEvent::Client {
                handle,
                event: ClientEvent::SetClass(args.next("a class name")?.to_string()),
            }
        }
        "commit" => {
            let handle = args.handle()?;
            let size = match args.words.next() {
                Some(width) => {
                    let width = width
                        .parse()
                        .map_err(|_| ScriptError::InvalidNumber(width.to_string()))?;
                    Some((width, args.number("a height")?))
                }
                None => None,
            };
            HostEvent::Commit { handle, size }
        }
        "output" => HostEvent::Core(CoreEvent::OutputAdded {
            id: OutputId(args.number("an output id")?),
            name: args.next("an output name")?.to_string(),
            geometry: args.geometry()?,
            usable_area: None,
        }),
        "output-remove" => HostEvent::Core(CoreEvent::OutputRemoved {
            id: OutputId(args.number("an output id")?),
        }),
        "motion" => HostEvent::Core(CoreEvent::PointerMotion {
            x: args.number("x y")?,
            y: args.number("x y")?,
        }),
        "button" => {
            let button = MouseButton::from_name(args.next("a button")?)?;
            let pressed = match args.next("press or release")? {
                "press" => true,
                "release" => false,
                other => return Err(ScriptError::InvalidSwitch(other.to_string())),
            };
            HostEvent::Core(CoreEvent::PointerButton {
                button: button.code(),
                pressed,
            })
        }
        "key" => {
            let combo = KeyCombo::parse(args.next("a key combination")?)?;
            HostEvent::Key {
                modifiers: combo.modifiers,
                key: combo.key,
            }
        }
        "modifiers" => {
            let mut modifiers = Modifiers::empty();
            for token in args.words.by_ref() {
                if token != "none" {
                    modifiers |= Modifiers::from_token(token)?;
                }
            }
            HostEvent::Core(CoreEvent::Modifiers { modifiers })
        }
        "menu-select" => HostEvent::Core(CoreEvent::MenuItemSelected {
            index: args.number("an item index")?,
        }),
        "menu-close" => HostEvent::Core(CoreEvent::MenuClosed),
        "action" => HostEvent::Action {
            name: args.next("an action name")?.to_string(),
            arg: args.rest(),
        },
        other => return Err(ScriptError::UnknownCommand(other.to_string())),
    };
    Ok(Some(event))
}

// ── Backend ──────────────────────────────────────────────────────────

/// The backend adapter.
///
/// Owns the event loop, the scripted clients, and the core engine.
pub struct HeadlessBackend {
    /// The protocol-agnostic core.
    pub core: Core,
    /// Host handle → scripted client window.
    surfaces: HashMap<SurfaceHandle, Rc<HeadlessXSurface>>,
    /// Commit every configured size right away, like a well-behaved client.
    auto_ack: bool,
    /// Where `ReloadConfig` reads the configuration from.
    config_path: Option<String>,
}

impl HeadlessBackend {
    pub fn new(config: Config, config_path: Option<String>) -> Self {
        Self {
            core: Core::new(config, Box::new(HeadlessScene::default())),
            surfaces: HashMap::new(),
            auto_ack: true,
            config_path,
        }
    }

    pub fn set_auto_ack(&mut self, auto_ack: bool) {
        self.auto_ack = auto_ack;
    }

    /// The scripted client behind `handle`.
    pub fn surface(&self, handle: SurfaceHandle) -> Option<&Rc<HeadlessXSurface>> {
        self.surfaces.get(&handle)
    }

    /// Feed a host event into the core. Returns actions the host must apply.
    pub fn handle_host_event(&mut self, event: HostEvent) -> Vec<CoreAction> {
        trace!("Host event {:?}", event);
        let actions = match event {
            HostEvent::NewSurface {
                handle,
                geometry,
                class,
                title,
                override_redirect,
            } => {
                self.new_surface(handle, geometry, class, title, override_redirect);
                Vec::new()
            }
            HostEvent::Client { handle, event } => {
                self.client_event(handle, event);
                Vec::new()
            }
            HostEvent::Commit { handle, size } => {
                self.commit(handle, size);
                Vec::new()
            }
            HostEvent::Key { modifiers, key } => {
                let mut actions = self.core.handle_event(CoreEvent::Modifiers { modifiers });
                actions.extend(self.core.handle_event(CoreEvent::Key {
                    key: key.clone(),
                    pressed: true,
                }));
                actions.extend(self.core.handle_event(CoreEvent::Key { key, pressed: false }));
                actions
            }
            HostEvent::Action { name, arg } => {
                let list: ActionList = std::iter::once(Action::new(&name, arg.as_deref())).collect();
                self.core.run_actions(None, &list, Default::default())
            }
            HostEvent::Core(event) => self.core.handle_event(event),
        };

        if self.auto_ack {
            self.ack_configures();
        }
        actions
    }

    fn new_surface(
        &mut self,
        handle: SurfaceHandle,
        geometry: Geometry,
        class: Option<String>,
        title: Option<String>,
        override_redirect: bool,
    ) {
        if self.surfaces.contains_key(&handle) {
            warn!("Surface {} already exists", handle.0);
            return;
        }
        let mut client = HeadlessXSurface::new(SurfaceId(handle.0), geometry)
            .with_override_redirect(override_redirect);
        if let Some(class) = &class {
            client = client.with_class(class);
        }
        if let Some(title) = &title {
            client = client.with_title(title);
        }
        let client = Rc::new(client);
        // The client draws at its requested size from the start.
        client.ack_configure();

        let owner = self.core.xwayland_new_surface(Rc::clone(&client) as Rc<dyn XwaylandSurface>);
        debug!("Surface {} is owned by {:?}", handle.0, owner);
        self.surfaces.insert(handle, client);
    }

    fn client_event(&mut self, handle: SurfaceHandle, event: ClientEvent) {
        let Some(client) = self.surfaces.get(&handle).cloned() else {
            warn!("No surface {}", handle.0);
            return;
        };
        let xwayland_event = match event {
            ClientEvent::Map => {
                client.update(|state| state.mapped = true);
                XwaylandEvent::Map
            }
            ClientEvent::Unmap => {
                client.update(|state| state.mapped = false);
                XwaylandEvent::Unmap
            }
            ClientEvent::Destroy => {
                self.surfaces.remove(&handle);
                XwaylandEvent::Destroy
            }
            ClientEvent::RequestConfigure(geometry) => XwaylandEvent::RequestConfigure(geometry),
            ClientEvent::RequestActivate => XwaylandEvent::RequestActivate,
            ClientEvent::RequestMinimize(minimize) => XwaylandEvent::RequestMinimize { minimize },
            ClientEvent::RequestMaximize => XwaylandEvent::RequestMaximize,
            ClientEvent::RequestFullscreen(fullscreen) => {
                client.update(|state| state.fullscreen = fullscreen);
                XwaylandEvent::RequestFullscreen
            }
            ClientEvent::SetTitle(title) => {
                client.update(|state| state.title = Some(title));
                XwaylandEvent::SetTitle
            }
            ClientEvent::SetClass(class) => {
                client.update(|state| state.class = Some(class));
                XwaylandEvent::SetClass
            }
            ClientEvent::SetOverrideRedirect(override_redirect) => {
                client.update(|state| state.override_redirect = override_redirect);
                XwaylandEvent::SetOverrideRedirect
            }
        };
        let handle: Rc<dyn XwaylandSurface> = client;
        self.core.xwayland_notify(&handle, xwayland_event);
    }

    fn commit(&mut self, handle: SurfaceHandle, size: Option<(i32, i32)>) {
        let Some(client) = self.surfaces.get(&handle) else {
            warn!("No surface {}", handle.0);
            return;
        };
        let Some(surface) = client.wl_surface() else {
            return;
        };
        match size {
            Some((width, height)) => surface.set_size(width, height),
            None => {
                client.ack_configure();
            }
        }
        self.core.surface_commit(surface.as_ref());
    }

    /// Commit the latest configured size of every client that has not
    /// drawn it yet.
    fn ack_configures(&mut self) {
        let clients: Vec<Rc<HeadlessXSurface>> = self.surfaces.values().cloned().collect();
        for client in clients {
            if client.ack_configure() {
                if let Some(surface) = client.wl_surface() {
                    self.core.surface_commit(surface.as_ref());
                }
            }
        }
    }

    /// Apply a list of core actions. Returns `false` once the host should
    /// stop.
    pub fn apply_actions(&mut self, actions: &[CoreAction]) -> bool {
        let mut keep_running = true;
        for action in actions {
            match action {
                CoreAction::SpawnProcess { command, argv } => spawn(command, argv),
                CoreAction::ReloadConfig => {
                    info!("Reloading configuration");
                    match Config::load(self.config_path.as_deref()) {
                        Ok(config) => self.core.reload_config(config),
                        Err(e) => error!("Failed to reload config: {:#}", e),
                    }
                }
                CoreAction::Exit => {
                    info!("Exit requested by core");
                    keep_running = false;
                }
            }
        }
        keep_running
    }

    /// Run the backend event loop until the host events run out or the
    /// core asks to exit.
    pub fn run(mut self, events: Channel<HostEvent>) -> Result<()> {
        info!("Starting Stackway (headless backend)");
        info!("  - Workspaces: {}", self.core.state.workspaces.len());

        let startup = self.core.startup();
        if !self.apply_actions(&startup) {
            return Ok(());
        }

        let mut event_loop: EventLoop<Self> =
            EventLoop::try_new().context("Failed to create event loop")?;
        let signal = event_loop.get_signal();
        event_loop
            .handle()
            .insert_source(events, move |event, _, backend| match event {
                channel::Event::Msg(event) => {
                    let actions = backend.handle_host_event(event);
                    if !backend.apply_actions(&actions) {
                        signal.stop();
                    }
                }
                channel::Event::Closed => {
                    info!("Host event stream closed");
                    signal.stop();
                }
            })
            .map_err(|e| anyhow!("Failed to register host events: {}", e.error))?;

        event_loop
            .run(None::<Duration>, &mut self, |_| {})
            .context("Event loop failed")?;

        info!("Stackway shutdown complete");
        Ok(())
    }
}

/// Start a detached child in its own process group.
fn spawn(command: &str, argv: &[String]) {
    let Some((program, args)) = argv.split_first() else {
        return;
    };
    let child = ProcessCommand::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .process_group(0)
        .spawn();
    match child {
        Ok(mut child) => {
            // Reap it so it does not linger as a zombie.
            std::thread::spawn(move || child.wait());
        }
        Err(e) => error!("Failed to spawn '{}': {}", command, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn backend() -> HeadlessBackend {
        let mut backend = HeadlessBackend::new(Config::default(), None);
        backend.handle_host_event(parse("output 1 test 0 0 1920 1080"));
        backend
    }

    fn parse(line: &str) -> HostEvent {
        parse_host_event(line).unwrap().unwrap()
    }

    fn run_script(backend: &mut HeadlessBackend, script: &str) -> Vec<CoreAction> {
        script
            .lines()
            .filter_map(|line| parse_host_event(line).unwrap())
            .flat_map(|event| backend.handle_host_event(event))
            .collect()
    }

    #[test]
    fn test_parse_new_surface() {
        assert_eq!(
            parse("new 3 10 20 640 480 foot Foot Terminal"),
            HostEvent::NewSurface {
                handle: SurfaceHandle(3),
                geometry: Geometry::new(10, 20, 640, 480),
                class: Some("foot".into()),
                title: Some("Foot Terminal".into()),
                override_redirect: false,
            }
        );
    }

    #[test]
    fn test_parse_key_and_modifiers() {
        assert_eq!(
            parse("key A-Tab"),
            HostEvent::Key {
                modifiers: Modifiers::ALT,
                key: "tab".into(),
            }
        );
        assert_eq!(
            parse("modifiers none"),
            HostEvent::Core(CoreEvent::Modifiers {
                modifiers: Modifiers::empty()
            })
        );
    }

    #[test]
    fn test_parse_skips_comments() {
        assert_eq!(parse_host_event("  # comment").unwrap(), None);
        assert_eq!(parse_host_event("").unwrap(), None);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            parse_host_event("teleport 1"),
            Err(ScriptError::UnknownCommand("teleport".into()))
        );
        assert_eq!(
            parse_host_event("map x"),
            Err(ScriptError::InvalidNumber("x".into()))
        );
        assert!(matches!(
            parse_host_event("configure 1 0 0"),
            Err(ScriptError::MissingArgument { .. })
        ));
        assert!(matches!(
            parse_host_event("fullscreen 1 maybe"),
            Err(ScriptError::InvalidSwitch(_))
        ));
    }

    #[test]
    fn test_map_focuses_window() {
        let mut backend = backend();
        run_script(&mut backend, "new 1 0 0 640 480 foot\nmap 1");

        let focused = backend.core.focused_view().unwrap();
        assert_eq!(backend.core.view(focused).unwrap().app_id, "foot");
        assert!(backend.surface(SurfaceHandle(1)).unwrap().state().activated);
    }

    #[test]
    fn test_auto_ack_settles_pending_resize() {
        let mut backend = backend();
        run_script(&mut backend, "new 1 0 0 640 480\nmap 1\nconfigure 1 5 5 300 200");

        let id = backend.core.focused_view().unwrap();
        let view = backend.core.view(id).unwrap();
        assert_eq!(view.geometry, Geometry::new(5, 5, 300, 200));
        assert!(!view.pending.is_moving());
    }

    #[test]
    fn test_manual_commit_without_auto_ack() {
        let mut backend = backend();
        backend.set_auto_ack(false);
        run_script(&mut backend, "new 1 0 0 640 480\nmap 1\ncommit 1");
        let id = backend.core.focused_view().unwrap();
        let start = backend.core.view(id).unwrap().geometry;

        run_script(&mut backend, "configure 1 0 0 300 200");
        assert_eq!(backend.core.view(id).unwrap().geometry, start);

        run_script(&mut backend, "commit 1");
        assert_eq!(
            backend.core.view(id).unwrap().geometry,
            Geometry::new(0, 0, 300, 200)
        );
    }

    #[test]
    fn test_destroy_forgets_surface() {
        let mut backend = backend();
        run_script(&mut backend, "new 1 0 0 640 480\nmap 1\ndestroy 1");

        assert!(backend.surface(SurfaceHandle(1)).is_none());
        assert!(backend.core.state.views.is_empty());
        assert_eq!(backend.core.focused_view(), None);
    }

    #[test]
    fn test_exit_stops_host() {
        let mut backend = backend();
        let actions = run_script(&mut backend, "action Exit");
        assert_eq!(actions, vec![CoreAction::Exit]);
        assert!(!backend.apply_actions(&actions));
    }

    #[test]
    fn test_run_drains_channel() {
        let backend = backend();
        let (sender, events) = channel::channel();
        for line in ["new 1 0 0 640 480", "map 1", "key A-F4"] {
            sender.send(parse(line)).unwrap();
        }
        drop(sender);

        backend.run(events).unwrap();
    }
}
