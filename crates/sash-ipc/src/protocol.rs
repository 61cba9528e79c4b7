//! Protocol-level constants: request type tags and the event-kind mapping.

use sash_types::EventMask;

/// Request message types the client may send.
///
/// The numeric values are fixed by the i3 IPC protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum MessageType {
    RunCommand = 0,
    GetWorkspaces = 1,
    Subscribe = 2,
    GetOutputs = 3,
    GetTree = 4,
    GetMarks = 5,
    GetBarConfig = 6,
    GetVersion = 7,
}

impl MessageType {
    #[must_use]
    pub const fn tag(self) -> u32 {
        self as u32
    }
}

/// High bit set on the type tag of every event frame.
pub const EVENT_FLAG: u32 = 1 << 31;

/// Whether a received frame is an unsolicited event rather than a reply.
#[must_use]
pub const fn is_event(tag: u32) -> bool {
    tag & EVENT_FLAG != 0
}

/// Protocol names of the event kinds set in `mask`, in bit order. These are
/// the strings the subscribe request carries.
#[must_use]
pub fn event_names(mask: EventMask) -> Vec<&'static str> {
    const NAMES: [(EventMask, &str); 6] = [
        (EventMask::WORKSPACE, "workspace"),
        (EventMask::OUTPUT, "output"),
        (EventMask::MODE, "mode"),
        (EventMask::WINDOW, "window"),
        (EventMask::BARCONFIG_UPDATE, "barconfig_update"),
        (EventMask::BINDING, "binding"),
    ];

    NAMES
        .iter()
        .filter(|(kind, _)| mask.contains(*kind))
        .map(|&(_, name)| name)
        .collect()
}

/// Build the subscribe request payload: a JSON array of event-name strings.
///
/// Returns `None` when the mask selects nothing, so callers can skip the
/// wire round trip entirely.
#[allow(clippy::missing_panics_doc)] // serializing &'static str names is infallible
#[must_use]
pub fn subscribe_payload(mask: EventMask) -> Option<String> {
    let names = event_names(mask);
    if names.is_empty() {
        return None;
    }
    let payload =
        serde_json::to_string(&names).expect("serializing static event names cannot fail");
    Some(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_type_tags_match_protocol() {
        assert_eq!(MessageType::RunCommand.tag(), 0);
        assert_eq!(MessageType::GetWorkspaces.tag(), 1);
        assert_eq!(MessageType::Subscribe.tag(), 2);
        assert_eq!(MessageType::GetOutputs.tag(), 3);
        assert_eq!(MessageType::GetTree.tag(), 4);
        assert_eq!(MessageType::GetMarks.tag(), 5);
        assert_eq!(MessageType::GetBarConfig.tag(), 6);
        assert_eq!(MessageType::GetVersion.tag(), 7);
    }

    #[test]
    fn test_is_event() {
        assert!(is_event(0x8000_0000));
        assert!(is_event(0x8000_0003));
        assert!(!is_event(0));
        assert!(!is_event(7));
    }

    #[test]
    fn test_event_names_in_bit_order() {
        let mask = EventMask::WINDOW | EventMask::WORKSPACE | EventMask::BINDING;
        assert_eq!(event_names(mask), vec!["workspace", "window", "binding"]);
    }

    #[test]
    fn test_subscribe_payload_json_array() {
        let payload = subscribe_payload(EventMask::WORKSPACE | EventMask::MODE).unwrap();
        assert_eq!(payload, r#"["workspace","mode"]"#);
    }

    #[test]
    fn test_subscribe_payload_empty_mask_short_circuits() {
        assert!(subscribe_payload(EventMask::NONE).is_none());
    }
}
