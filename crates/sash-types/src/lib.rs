//! Shared data records for the sash i3 IPC client.
//!
//! Everything here is a plain value type reconstructed from i3's JSON
//! replies. Records carry no connection state and are rebuilt on every
//! query; enum fields that i3 may extend in future releases carry an
//! `Unknown` fallback variant so newer servers never break parsing.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

use serde::Serialize;

/// Plain integer geometry of a workspace, output, or container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// One i3 workspace, as reported by the get-workspaces query.
///
/// Ephemeral: a fresh record is built on every query, no identity persists
/// across calls.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Workspace {
    /// Workspace number; `-1` for named workspaces without one.
    pub num: i32,
    pub name: String,
    pub visible: bool,
    pub focused: bool,
    pub urgent: bool,
    pub rect: Rect,
    /// Name of the output the workspace is on.
    pub output: String,
}

/// One physical or logical output.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Output {
    pub name: String,
    pub active: bool,
    /// Name of the workspace currently visible on this output, if any.
    pub current_workspace: Option<String>,
    pub rect: Rect,
}

/// i3's version, as reported by the get-version query.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Version {
    pub human_readable: String,
    pub loaded_config_file_name: String,
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

/// Border style of a container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BorderStyle {
    None,
    Normal,
    OnePixel,
    Pixel,
    /// The server sent a style this library does not know about; the
    /// verbatim string is kept in [`Container::border_raw`].
    #[default]
    Unknown,
}

/// Layout of a container's children.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    #[serde(rename = "splith")]
    SplitH,
    #[serde(rename = "splitv")]
    SplitV,
    Stacked,
    Tabbed,
    Dockarea,
    Output,
    /// Unrecognized layout string, kept verbatim in
    /// [`Container::layout_raw`].
    #[default]
    Unknown,
}

/// A node in i3's layout tree: a window, split, workspace, or output
/// container.
///
/// Each node exclusively owns its children; the tree built by a get-tree
/// query is immutable and owned by the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Container {
    /// Opaque stable handle for this node. Not a pointer.
    pub id: u64,
    /// X11 window ID; `0` for non-leaf containers.
    pub window_id: u64,
    pub name: String,
    /// Node kind string as i3 reports it ("root", "output", "con", ...).
    pub node_type: String,
    pub border: BorderStyle,
    /// Verbatim border string when [`Container::border`] is `Unknown`.
    pub border_raw: Option<String>,
    pub current_border_width: i32,
    pub layout: Layout,
    /// Verbatim layout string when [`Container::layout`] is `Unknown`.
    pub layout_raw: Option<String>,
    /// Share of the parent taken by this node; negative when not
    /// applicable.
    pub percent: f64,
    pub rect: Rect,
    pub window_rect: Rect,
    pub deco_rect: Rect,
    pub geometry: Rect,
    pub urgent: bool,
    pub focused: bool,
    /// Child nodes, in i3's order.
    pub nodes: Vec<Container>,
}

/// What happened to a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkspaceChange {
    Focus,
    Init,
    Empty,
    Urgent,
}

/// A workspace event. `current` and `old` may each be absent depending on
/// the subtype (an `init` event has no `old` workspace, for instance).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkspaceEvent {
    pub change: WorkspaceChange,
    pub current: Option<Workspace>,
    pub old: Option<Workspace>,
}

/// What happened to a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowChange {
    New,
    Close,
    Focus,
    Title,
    FullscreenMode,
    Move,
    Floating,
    Urgent,
}

/// A window event with the affected container, when i3 supplies one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowEvent {
    pub change: WindowChange,
    pub container: Option<Container>,
}

/// Input device kind that triggered a binding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputType {
    Keyboard,
    Mouse,
    #[default]
    Unknown,
}

/// A triggered binding, delivered with binding events.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Binding {
    /// The command the binding runs.
    pub command: String,
    /// Modifier names that were active ("shift", "ctrl", ...).
    pub event_state_mask: Vec<String>,
    pub input_code: i32,
    /// Key symbol; absent for mouse bindings.
    pub symbol: Option<String>,
    pub input_type: InputType,
}

/// Outcome of one command in a run-command reply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CommandResult {
    pub success: bool,
    /// Human-readable error text i3 attaches to failed commands.
    pub error: Option<String>,
}

/// Bit-set of event kinds a session wants delivered.
///
/// The mask accumulated before event handling starts is replayed as a
/// single subscribe request when the event channel opens.
///
/// ```
/// use sash_types::EventMask;
///
/// let mask = EventMask::WORKSPACE | EventMask::WINDOW;
/// assert!(mask.contains(EventMask::WORKSPACE));
/// assert!(!mask.contains(EventMask::OUTPUT));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EventMask(u32);

impl EventMask {
    pub const NONE: EventMask = EventMask(0);
    pub const WORKSPACE: EventMask = EventMask(1 << 0);
    pub const OUTPUT: EventMask = EventMask(1 << 1);
    pub const MODE: EventMask = EventMask(1 << 2);
    pub const WINDOW: EventMask = EventMask(1 << 3);
    pub const BARCONFIG_UPDATE: EventMask = EventMask(1 << 4);
    pub const BINDING: EventMask = EventMask(1 << 5);

    /// All event kinds this library knows how to decode.
    pub const ALL: EventMask = EventMask(0b11_1111);

    #[must_use]
    pub const fn from_bits(bits: u32) -> EventMask {
        EventMask(bits)
    }

    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn contains(self, other: EventMask) -> bool {
        self.0 & other.0 == other.0
    }

    /// Mask for an event frame's wire tag: the event kind is
    /// `1 << (tag & 0x7F)`. Kinds past the representable 32 bits map to
    /// [`EventMask::NONE`] so they classify as unknown instead of
    /// overflowing the shift.
    #[must_use]
    pub const fn from_wire_tag(tag: u32) -> EventMask {
        let kind = tag & 0x7F;
        if kind >= 32 {
            return EventMask::NONE;
        }
        EventMask(1 << kind)
    }
}

impl BitOr for EventMask {
    type Output = EventMask;

    fn bitor(self, rhs: EventMask) -> EventMask {
        EventMask(self.0 | rhs.0)
    }
}

impl BitOrAssign for EventMask {
    fn bitor_assign(&mut self, rhs: EventMask) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for EventMask {
    type Output = EventMask;

    fn bitand(self, rhs: EventMask) -> EventMask {
        EventMask(self.0 & rhs.0)
    }
}

impl fmt::Display for EventMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#08b}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_or_and_contains() {
        let mask = EventMask::WORKSPACE | EventMask::WINDOW;
        assert!(mask.contains(EventMask::WORKSPACE));
        assert!(mask.contains(EventMask::WINDOW));
        assert!(!mask.contains(EventMask::OUTPUT));
        assert_eq!(mask & EventMask::WINDOW, EventMask::WINDOW);
    }

    #[test]
    fn test_mask_or_assign_accumulates() {
        let mut mask = EventMask::NONE;
        assert!(mask.is_empty());
        mask |= EventMask::MODE;
        mask |= EventMask::BINDING;
        assert_eq!(mask.bits(), (1 << 2) | (1 << 5));
    }

    #[test]
    fn test_mask_from_wire_tag() {
        // Event frames carry the kind in the low bits with the high bit set.
        assert_eq!(EventMask::from_wire_tag(0x8000_0000), EventMask::WORKSPACE);
        assert_eq!(EventMask::from_wire_tag(0x8000_0003), EventMask::WINDOW);
        assert_eq!(
            EventMask::from_wire_tag(0x8000_0004),
            EventMask::BARCONFIG_UPDATE
        );
        assert_eq!(EventMask::from_wire_tag(0x8000_0005), EventMask::BINDING);
    }

    #[test]
    fn test_mask_from_wire_tag_high_kind_is_none() {
        // Kinds 32..=127 have no mask bit; they must classify as unknown,
        // not shift out of range or alias a known kind.
        assert_eq!(EventMask::from_wire_tag(0x8000_0020), EventMask::NONE);
        assert_eq!(EventMask::from_wire_tag(0x8000_0021), EventMask::NONE);
        assert_eq!(EventMask::from_wire_tag(0x8000_007F), EventMask::NONE);
        // Kind 31 is still representable.
        assert_eq!(
            EventMask::from_wire_tag(0x8000_001F),
            EventMask::from_bits(1 << 31)
        );
    }

    #[test]
    fn test_all_covers_every_kind() {
        for kind in [
            EventMask::WORKSPACE,
            EventMask::OUTPUT,
            EventMask::MODE,
            EventMask::WINDOW,
            EventMask::BARCONFIG_UPDATE,
            EventMask::BINDING,
        ] {
            assert!(EventMask::ALL.contains(kind));
        }
    }

    #[test]
    fn test_defaults_are_unknown_sentinels() {
        let container = Container::default();
        assert_eq!(container.border, BorderStyle::Unknown);
        assert_eq!(container.layout, Layout::Unknown);
        assert!(container.nodes.is_empty());
    }

    #[test]
    fn test_enum_serialization_is_snake_case() {
        let json = serde_json::to_string(&WindowChange::FullscreenMode).unwrap();
        assert_eq!(json, "\"fullscreen_mode\"");

        let json = serde_json::to_string(&Layout::SplitH).unwrap();
        assert_eq!(json, "\"splith\"");
    }
}
