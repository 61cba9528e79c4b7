//! Synchronous client for the i3 window manager's IPC protocol.
//!
//! The protocol is a length-prefixed, magic-tagged binary framing over a
//! Unix domain socket carrying JSON payloads, plus an asynchronous
//! event-subscription channel. This crate is the protocol/session core:
//!
//! - [`codec`]: the `i3-ipc` wire framing.
//! - [`protocol`]: message-type tags and the event-kind mapping.
//! - [`transport`]: blocking frame I/O and request/reply correlation.
//! - [`reply`]: typed parsing of JSON reply documents.
//! - [`event`]: event classification and decoding.
//! - [`connection`]: the session facade.
//! - [`socket_path`]: default endpoint resolution.
//!
//! Everything is single-threaded and blocking by design: one outstanding
//! request per channel, no timeouts, no reconnect. A dropped connection is
//! a fatal error.
//!
//! # Example
//!
//! ```no_run
//! use sash_ipc::Connection;
//! use sash_types::EventMask;
//!
//! # fn main() -> sash_ipc::Result<()> {
//! let mut conn = Connection::connect()?;
//!
//! for workspace in conn.get_workspaces()? {
//!     println!("{} on {}", workspace.name, workspace.output);
//! }
//!
//! conn.subscribe(EventMask::WORKSPACE)?;
//! conn.on_workspace_event(|ev| println!("workspace {:?}", ev.change));
//! conn.start_event_handling()?;
//! loop {
//!     conn.handle_event()?;
//! }
//! # }
//! ```

pub mod codec;
pub mod connection;
pub mod error;
pub mod event;
pub mod protocol;
pub mod reply;
pub mod socket_path;
pub mod transport;

pub use codec::Frame;
pub use connection::Connection;
pub use error::{Error, Result};
pub use event::Event;
pub use protocol::MessageType;
pub use socket_path::{I3SocketPath, SocketPathResolver, socket_path};

// Re-export the data records so most users need only this crate.
pub use sash_types::{
    Binding, BorderStyle, CommandResult, Container, EventMask, InputType, Layout, Output, Rect,
    Version, WindowChange, WindowEvent, Workspace, WorkspaceChange, WorkspaceEvent,
};
