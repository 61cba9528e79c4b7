//! Event classification and decoding.
//!
//! An inbound event frame is classified by its wire tag
//! (`1 << (tag & 0x7F)`), its JSON payload decoded, and the result
//! demultiplexed on the payload's `change` field. An unrecognized `change`
//! or event kind is non-fatal: the event is logged and dropped before any
//! observer runs.

use serde_json::Value;
use tracing::{debug, warn};

use sash_types::{
    Binding, EventMask, WindowChange, WindowEvent, WorkspaceChange, WorkspaceEvent,
};

use crate::codec::Frame;
use crate::error::{Error, Result};
use crate::reply;

/// One decoded i3 event.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Workspace(WorkspaceEvent),
    /// Output layout changed; i3 reports the change reason as a string.
    Output { change: String },
    /// Binding mode changed; `change` is the new mode's name.
    Mode { change: String },
    Window(WindowEvent),
    BarConfigUpdate,
    Binding(Binding),
}

impl Event {
    /// The subscription-mask kind this event belongs to.
    #[must_use]
    pub fn kind(&self) -> EventMask {
        match self {
            Event::Workspace(_) => EventMask::WORKSPACE,
            Event::Output { .. } => EventMask::OUTPUT,
            Event::Mode { .. } => EventMask::MODE,
            Event::Window(_) => EventMask::WINDOW,
            Event::BarConfigUpdate => EventMask::BARCONFIG_UPDATE,
            Event::Binding(_) => EventMask::BINDING,
        }
    }
}

fn change_of(doc: &Value) -> &str {
    doc.get("change").and_then(Value::as_str).unwrap_or("")
}

/// Decode one event frame. `Ok(None)` means the event was recognized as
/// droppable (unknown kind or unknown subtype) rather than an error.
///
/// # Errors
///
/// Returns [`Error::Json`] for an unparseable payload or
/// [`Error::MalformedReply`] for shape violations inside a known event.
pub fn decode(frame: &Frame) -> Result<Option<Event>> {
    let kind = EventMask::from_wire_tag(frame.message_type);
    let doc = reply::parse_document(&frame.payload)?;

    match kind {
        EventMask::WORKSPACE => decode_workspace(&doc),
        EventMask::OUTPUT => {
            debug!("OUTPUT event");
            Ok(Some(Event::Output {
                change: change_of(&doc).to_owned(),
            }))
        }
        EventMask::MODE => {
            debug!(mode = change_of(&doc), "MODE event");
            Ok(Some(Event::Mode {
                change: change_of(&doc).to_owned(),
            }))
        }
        EventMask::WINDOW => decode_window(&doc),
        EventMask::BARCONFIG_UPDATE => {
            debug!("BARCONFIG_UPDATE event");
            Ok(Some(Event::BarConfigUpdate))
        }
        EventMask::BINDING => decode_binding(&doc),
        _ => {
            warn!(tag = frame.message_type, "dropping event of unknown kind");
            Ok(None)
        }
    }
}

fn decode_workspace(doc: &Value) -> Result<Option<Event>> {
    let change = match change_of(doc) {
        "focus" => WorkspaceChange::Focus,
        "init" => WorkspaceChange::Init,
        "empty" => WorkspaceChange::Empty,
        "urgent" => WorkspaceChange::Urgent,
        other => {
            warn!(change = other, "dropping workspace event of unknown subtype");
            return Ok(None);
        }
    };
    debug!(?change, "WORKSPACE event");

    let current = reply::field(doc, "current")
        .map(|v| reply::parse_workspace(v, "root.current"))
        .transpose()?;
    let old = reply::field(doc, "old")
        .map(|v| reply::parse_workspace(v, "root.old"))
        .transpose()?;

    Ok(Some(Event::Workspace(WorkspaceEvent {
        change,
        current,
        old,
    })))
}

fn decode_window(doc: &Value) -> Result<Option<Event>> {
    let change = match change_of(doc) {
        "new" => WindowChange::New,
        "close" => WindowChange::Close,
        "focus" => WindowChange::Focus,
        "title" => WindowChange::Title,
        "fullscreen_mode" => WindowChange::FullscreenMode,
        "move" => WindowChange::Move,
        "floating" => WindowChange::Floating,
        "urgent" => WindowChange::Urgent,
        other => {
            warn!(change = other, "dropping window event of unknown subtype");
            return Ok(None);
        }
    };
    debug!(?change, "WINDOW event");

    let container = reply::field(doc, "container")
        .map(|v| reply::parse_container(v, "root.container"))
        .transpose()?;

    Ok(Some(Event::Window(WindowEvent { change, container })))
}

fn decode_binding(doc: &Value) -> Result<Option<Event>> {
    let Some(binding) = reply::field(doc, "binding") else {
        return Err(Error::malformed("root.binding", "an object"));
    };
    debug!("BINDING event");
    Ok(Some(Event::Binding(reply::parse_binding(
        binding,
        "root.binding",
    )?)))
}
