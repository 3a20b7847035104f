//! Wayland output discovery
//!
//! Binds every `wl_output` global the compositor advertises and records what
//! the compositor reports about it. The bookkeeping lives in
//! [`OutputState`], independent of the live connection; the `Dispatch`
//! impls only forward events into it.

use serde::Serialize;
use thiserror::Error;
use tracing::debug;
use wayland_client::protocol::{wl_output, wl_registry};
use wayland_client::{ConnectError, Connection, Dispatch, DispatchError, QueueHandle, WEnum};

/// Highest `wl_output` version we bind; version 4 adds `name` and `description`
pub const OUTPUT_VERSION: u32 = 4;

const OUTPUT_INTERFACE: &str = "wl_output";

/// Errors that can occur while querying the compositor
#[derive(Debug, Error)]
pub enum OutputError {
    /// No compositor could be reached through the environment
    #[error("Failed to connect to the Wayland compositor: {0}")]
    Connect(#[from] ConnectError),

    /// The connection failed while exchanging events
    #[error("Wayland protocol error: {0}")]
    Dispatch(#[from] DispatchError),
}

/// What the compositor reported about one output
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OutputInfo {
    /// Registry name of the `wl_output` global
    #[serde(skip)]
    pub global: u32,

    /// Compositor-assigned name such as `DP-1` (version 4 and later)
    pub name: Option<String>,
    /// Human-readable description (version 4 and later)
    pub description: Option<String>,
    pub make: Option<String>,
    pub model: Option<String>,

    /// Position in the global compositor space
    pub x: i32,
    pub y: i32,

    /// Physical size in millimetres
    pub physical_width: i32,
    pub physical_height: i32,

    /// Current mode in pixels; refresh in mHz
    pub width: i32,
    pub height: i32,
    pub refresh_mhz: i32,

    pub scale: i32,
}

impl OutputInfo {
    fn new(global: u32) -> Self {
        Self {
            global,
            scale: 1,
            ..Self::default()
        }
    }

    fn apply(&mut self, event: wl_output::Event) {
        match event {
            wl_output::Event::Geometry {
                x,
                y,
                physical_width,
                physical_height,
                make,
                model,
                ..
            } => {
                self.x = x;
                self.y = y;
                self.physical_width = physical_width;
                self.physical_height = physical_height;
                self.make = Some(make);
                self.model = Some(model);
            }
            wl_output::Event::Mode {
                flags,
                width,
                height,
                refresh,
            } => {
                // Only the current mode describes the output as it is now
                let current = matches!(flags, WEnum::Value(f) if f.contains(wl_output::Mode::Current));
                if current {
                    self.width = width;
                    self.height = height;
                    self.refresh_mhz = refresh;
                }
            }
            wl_output::Event::Scale { factor } => self.scale = factor,
            wl_output::Event::Name { name } => self.name = Some(name),
            wl_output::Event::Description { description } => {
                self.description = Some(description)
            }
            _ => {}
        }
    }
}

/// Outputs seen so far, in the order the compositor advertised them
#[derive(Debug, Default)]
pub struct OutputState {
    outputs: Vec<OutputInfo>,
}

impl OutputState {
    /// Handle a registry global
    ///
    /// Returns the version to bind at if the global is an output.
    pub fn add_global(&mut self, global: u32, interface: &str, version: u32) -> Option<u32> {
        if interface != OUTPUT_INTERFACE {
            return None;
        }

        self.outputs.push(OutputInfo::new(global));
        Some(version.min(OUTPUT_VERSION))
    }

    /// Forget an output whose global went away
    pub fn remove_global(&mut self, global: u32) {
        self.outputs.retain(|output| output.global != global);
    }

    /// Record an event for the output bound from `global`
    pub fn apply(&mut self, global: u32, event: wl_output::Event) {
        if let Some(output) = self.outputs.iter_mut().find(|o| o.global == global) {
            output.apply(event);
        }
    }

    pub fn into_outputs(self) -> Vec<OutputInfo> {
        self.outputs
    }
}

impl Dispatch<wl_registry::WlRegistry, ()> for OutputState {
    fn event(
        state: &mut Self,
        registry: &wl_registry::WlRegistry,
        event: wl_registry::Event,
        _data: &(),
        _conn: &Connection,
        qh: &QueueHandle<Self>,
    ) {
        match event {
            wl_registry::Event::Global {
                name,
                interface,
                version,
            } => {
                if let Some(bind_version) = state.add_global(name, &interface, version) {
                    debug!(global = name, version = bind_version, "Binding wl_output");
                    registry.bind::<wl_output::WlOutput, _, _>(name, bind_version, qh, name);
                }
            }
            wl_registry::Event::GlobalRemove { name } => state.remove_global(name),
            _ => {}
        }
    }
}

impl Dispatch<wl_output::WlOutput, u32> for OutputState {
    fn event(
        state: &mut Self,
        _output: &wl_output::WlOutput,
        event: wl_output::Event,
        global: &u32,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        state.apply(*global, event);
    }
}

/// Query the compositor named by the environment for its outputs
///
/// # Errors
///
/// Returns `OutputError::Connect` if no compositor can be reached and
/// `OutputError::Dispatch` if the connection fails during discovery.
pub fn discover() -> Result<Vec<OutputInfo>, OutputError> {
    let conn = Connection::connect_to_env()?;
    let mut queue = conn.new_event_queue();
    let qh = queue.handle();

    let _registry = conn.display().get_registry(&qh, ());

    let mut state = OutputState::default();
    // The first roundtrip delivers the globals, the second the events of
    // the outputs bound in response
    queue.roundtrip(&mut state)?;
    queue.roundtrip(&mut state)?;

    let outputs = state.into_outputs();
    debug!(count = outputs.len(), "Output discovery complete");
    Ok(outputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Tests that modify the Wayland environment variables must not run in parallel
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn state_with_output(global: u32) -> OutputState {
        let mut state = OutputState::default();
        state.add_global(global, OUTPUT_INTERFACE, 4);
        state
    }

    #[test]
    fn test_only_outputs_are_bound() {
        let mut state = OutputState::default();

        assert_eq!(state.add_global(1, "wl_compositor", 6), None);
        assert_eq!(state.add_global(2, "wl_seat", 9), None);
        assert_eq!(state.add_global(3, "wl_output", 4), Some(4));

        let outputs = state.into_outputs();
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].global, 3);
    }

    #[test]
    fn test_bind_version_capped() {
        let mut state = OutputState::default();
        assert_eq!(state.add_global(1, "wl_output", 2), Some(2));
        assert_eq!(state.add_global(2, "wl_output", 4), Some(4));
        assert_eq!(state.add_global(3, "wl_output", 9), Some(OUTPUT_VERSION));
    }

    #[test]
    fn test_events_land_on_their_output() {
        let mut state = OutputState::default();
        state.add_global(10, "wl_output", 4);
        state.add_global(11, "wl_output", 4);

        state.apply(11, wl_output::Event::Name { name: "HDMI-A-1".to_string() });
        state.apply(10, wl_output::Event::Name { name: "DP-1".to_string() });
        state.apply(
            10,
            wl_output::Event::Description {
                description: "Dell Inc. U2720Q".to_string(),
            },
        );
        state.apply(11, wl_output::Event::Scale { factor: 2 });

        let outputs = state.into_outputs();
        assert_eq!(outputs[0].name.as_deref(), Some("DP-1"));
        assert_eq!(outputs[0].description.as_deref(), Some("Dell Inc. U2720Q"));
        assert_eq!(outputs[0].scale, 1);
        assert_eq!(outputs[1].name.as_deref(), Some("HDMI-A-1"));
        assert_eq!(outputs[1].scale, 2);
    }

    #[test]
    fn test_event_for_unknown_global_ignored() {
        let mut state = state_with_output(1);
        state.apply(99, wl_output::Event::Name { name: "ghost".to_string() });

        let outputs = state.into_outputs();
        assert_eq!(outputs[0].name, None);
    }

    #[test]
    fn test_geometry_recorded() {
        let mut state = state_with_output(1);
        state.apply(
            1,
            wl_output::Event::Geometry {
                x: 1920,
                y: 0,
                physical_width: 600,
                physical_height: 340,
                subpixel: WEnum::Value(wl_output::Subpixel::Unknown),
                make: "Dell Inc.".to_string(),
                model: "U2720Q".to_string(),
                transform: WEnum::Value(wl_output::Transform::Normal),
            },
        );

        let output = &state.into_outputs()[0];
        assert_eq!((output.x, output.y), (1920, 0));
        assert_eq!((output.physical_width, output.physical_height), (600, 340));
        assert_eq!(output.make.as_deref(), Some("Dell Inc."));
        assert_eq!(output.model.as_deref(), Some("U2720Q"));
    }

    #[test]
    fn test_only_current_mode_recorded() {
        let mut state = state_with_output(1);
        state.apply(
            1,
            wl_output::Event::Mode {
                flags: WEnum::Value(wl_output::Mode::Current | wl_output::Mode::Preferred),
                width: 3840,
                height: 2160,
                refresh: 60000,
            },
        );
        state.apply(
            1,
            wl_output::Event::Mode {
                flags: WEnum::Value(wl_output::Mode::empty()),
                width: 1280,
                height: 720,
                refresh: 60000,
            },
        );

        let output = &state.into_outputs()[0];
        assert_eq!((output.width, output.height), (3840, 2160));
        assert_eq!(output.refresh_mhz, 60000);
    }

    #[test]
    fn test_removed_global_dropped() {
        let mut state = OutputState::default();
        state.add_global(1, "wl_output", 4);
        state.add_global(2, "wl_output", 4);

        state.remove_global(1);

        let outputs = state.into_outputs();
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].global, 2);
    }

    #[test]
    fn test_json_omits_global() {
        let mut state = state_with_output(7);
        state.apply(7, wl_output::Event::Name { name: "eDP-1".to_string() });

        let json = serde_json::to_string(&state.into_outputs()[0]).unwrap();
        assert!(json.contains(r#""name":"eDP-1""#), "{}", json);
        assert!(!json.contains("global"), "{}", json);
    }

    #[test]
    fn test_discover_without_compositor_fails() {
        let _guard = ENV_MUTEX.lock().unwrap();
        // Save original values to restore after test (test isolation)
        let original_socket = env::var_os("WAYLAND_SOCKET");
        let original_display = env::var_os("WAYLAND_DISPLAY");

        let temp_dir = tempfile::tempdir().unwrap();
        env::remove_var("WAYLAND_SOCKET");
        env::set_var("WAYLAND_DISPLAY", temp_dir.path().join("wayland-404"));

        let result = discover();

        if let Some(val) = original_socket {
            env::set_var("WAYLAND_SOCKET", val);
        }
        match original_display {
            Some(val) => env::set_var("WAYLAND_DISPLAY", val),
            None => env::remove_var("WAYLAND_DISPLAY"),
        }

        match result {
            Err(OutputError::Connect(_)) => {}
            other => panic!("Expected Connect error, got: {:?}", other),
        }
    }
}
