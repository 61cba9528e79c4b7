//! The session facade: connect, issue typed queries, subscribe, and drive
//! the event loop.
//!
//! A [`Connection`] owns two socket handles. The main channel opens at
//! construction and serves blocking request/reply queries. The event
//! channel opens lazily when [`Connection::start_event_handling`] is
//! called; until then, subscription requests only accumulate in a pending
//! mask, which is replayed as a single subscribe request once the channel
//! opens.
//!
//! Everything is single-threaded and blocking: one request outstanding at a
//! time, no timeouts, no cancellation. The caller drives the event loop by
//! calling [`Connection::handle_event`] repeatedly.

use std::os::fd::{AsFd, BorrowedFd, RawFd};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;

use nix::errno::Errno;
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use tracing::{debug, error, warn};

use sash_types::{
    Binding, CommandResult, Container, EventMask, Output, Version, WindowEvent, Workspace,
    WorkspaceEvent,
};

use crate::codec::Frame;
use crate::error::{Error, Result};
use crate::event::{self, Event};
use crate::protocol::{self, MessageType};
use crate::reply;
use crate::socket_path::{I3SocketPath, SocketPathResolver};
use crate::transport;

type Observer<T> = Box<dyn FnMut(&T)>;
type StrObserver = Box<dyn FnMut(&str)>;

#[derive(Default)]
struct Observers {
    workspace: Vec<Observer<WorkspaceEvent>>,
    output: Vec<StrObserver>,
    mode: Vec<StrObserver>,
    window: Vec<Observer<WindowEvent>>,
    barconfig_update: Vec<Box<dyn FnMut()>>,
    binding: Vec<Observer<Binding>>,
}

struct Watch {
    fd: RawFd,
    callback: Box<dyn FnMut()>,
}

/// A live session with the window manager.
pub struct Connection {
    main: UnixStream,
    event: Option<UnixStream>,
    socket_path: PathBuf,
    subscriptions: EventMask,
    observers: Observers,
    watches: Vec<Watch>,
}

impl Connection {
    /// Connect using the stock socket-path resolver (`I3SOCK`, then
    /// `i3 --get-socketpath`).
    ///
    /// # Errors
    ///
    /// Returns [`Error::SocketPathLookup`] when no endpoint can be
    /// resolved, or [`Error::Connect`] when dialing fails.
    pub fn connect() -> Result<Self> {
        Self::connect_with(&I3SocketPath)
    }

    /// Connect using a caller-supplied endpoint resolver.
    ///
    /// # Errors
    ///
    /// Same as [`Connection::connect`].
    pub fn connect_with(resolver: &dyn SocketPathResolver) -> Result<Self> {
        Self::connect_to(resolver.resolve()?)
    }

    /// Connect to an explicit socket path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connect`] when dialing fails.
    pub fn connect_to(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let main = transport::connect(&path)?;
        debug!(path = %path.display(), "connected to i3");
        Ok(Self::from_parts(main, path))
    }

    fn from_parts(main: UnixStream, socket_path: PathBuf) -> Self {
        Self {
            main,
            event: None,
            socket_path,
            subscriptions: EventMask::NONE,
            observers: Observers::default(),
            watches: Vec::new(),
        }
    }

    /// The socket path this session dialed.
    #[must_use]
    pub fn socket_path(&self) -> &std::path::Path {
        &self.socket_path
    }

    /// Event kinds subscribed (or pending subscription) so far.
    #[must_use]
    pub fn subscriptions(&self) -> EventMask {
        self.subscriptions
    }

    fn request(&mut self, message_type: MessageType, payload: &[u8]) -> Result<Frame> {
        transport::request(&mut self.main, message_type.tag(), payload)
    }

    fn request_document(
        &mut self,
        message_type: MessageType,
        payload: &[u8],
    ) -> Result<serde_json::Value> {
        let frame = self.request(message_type, payload)?;
        reply::parse_document(&frame.payload)
    }

    /// Run an i3 command. Returns the first result's success flag; when the
    /// command failed and i3 supplied an error message, it is logged.
    ///
    /// # Errors
    ///
    /// Returns a transport or [`Error::MalformedReply`] error; a command i3
    /// rejected is `Ok(false)`, not an error.
    pub fn send_command(&mut self, command: &str) -> Result<bool> {
        let doc = self.request_document(MessageType::RunCommand, command.as_bytes())?;
        let results = reply::parse_command_results(&doc)?;
        let Some(first) = results.first() else {
            return Err(Error::malformed("root[0]", "an object"));
        };

        if !first.success
            && let Some(text) = &first.error
        {
            error!(command, error = %text, "failed to execute command");
        }
        Ok(first.success)
    }

    /// Run an i3 command and return every per-command outcome.
    ///
    /// # Errors
    ///
    /// Returns a transport or [`Error::MalformedReply`] error.
    pub fn send_command_full(&mut self, command: &str) -> Result<Vec<CommandResult>> {
        let doc = self.request_document(MessageType::RunCommand, command.as_bytes())?;
        reply::parse_command_results(&doc)
    }

    /// Request the list of workspaces.
    ///
    /// # Errors
    ///
    /// Returns a transport or [`Error::MalformedReply`] error.
    pub fn get_workspaces(&mut self) -> Result<Vec<Workspace>> {
        let doc = self.request_document(MessageType::GetWorkspaces, b"")?;
        reply::parse_workspaces(&doc)
    }

    /// Request the list of outputs.
    ///
    /// # Errors
    ///
    /// Returns a transport or [`Error::MalformedReply`] error.
    pub fn get_outputs(&mut self) -> Result<Vec<Output>> {
        let doc = self.request_document(MessageType::GetOutputs, b"")?;
        reply::parse_outputs(&doc)
    }

    /// Request i3's version.
    ///
    /// # Errors
    ///
    /// Returns a transport or [`Error::MalformedReply`] error.
    pub fn get_version(&mut self) -> Result<Version> {
        let doc = self.request_document(MessageType::GetVersion, b"")?;
        reply::parse_version(&doc)
    }

    /// Request the layout tree. The returned root exclusively owns the
    /// whole tree.
    ///
    /// # Errors
    ///
    /// Returns a transport or [`Error::MalformedReply`] error.
    pub fn get_tree(&mut self) -> Result<Container> {
        let doc = self.request_document(MessageType::GetTree, b"")?;
        reply::parse_container(&doc, "root")
    }

    /// Request the currently set marks.
    ///
    /// # Errors
    ///
    /// Returns a transport or [`Error::MalformedReply`] error.
    pub fn get_marks(&mut self) -> Result<Vec<String>> {
        let doc = self.request_document(MessageType::GetMarks, b"")?;
        reply::parse_string_list(&doc)
    }

    /// Request the configured bar IDs.
    ///
    /// # Errors
    ///
    /// Returns a transport or [`Error::MalformedReply`] error.
    pub fn get_bar_config_ids(&mut self) -> Result<Vec<String>> {
        let doc = self.request_document(MessageType::GetBarConfig, b"")?;
        reply::parse_string_list(&doc)
    }

    /// Subscribe to the event kinds in `mask`.
    ///
    /// Before event handling starts this only accumulates the mask and
    /// always succeeds; the accumulated mask is sent as one subscribe
    /// request when [`Connection::start_event_handling`] opens the event
    /// channel. Afterwards the request goes out immediately and the reply's
    /// success flag is returned verbatim.
    ///
    /// # Errors
    ///
    /// Returns a transport or [`Error::MalformedReply`] error; a rejected
    /// subscription is `Ok(false)`.
    pub fn subscribe(&mut self, mask: EventMask) -> Result<bool> {
        if self.event.is_none() {
            self.subscriptions |= mask;
            return Ok(true);
        }
        self.send_subscription(mask)
    }

    fn send_subscription(&mut self, mask: EventMask) -> Result<bool> {
        let Some(payload) = protocol::subscribe_payload(mask) else {
            return Ok(true);
        };
        debug!(subscriptions = %payload, "subscribing");

        let stream = self.event.as_mut().ok_or(Error::EventsNotStarted)?;
        let frame = transport::request(stream, MessageType::Subscribe.tag(), payload.as_bytes())?;
        let doc = reply::parse_document(&frame.payload)?;
        let ok = reply::parse_success(&doc)?;

        self.subscriptions |= mask;
        Ok(ok)
    }

    /// Open the event channel and replay the accumulated subscription mask.
    ///
    /// Calling this more than once is a no-op; there is no way back to the
    /// un-started state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connect`] when the event channel cannot be opened,
    /// or any error from the replayed subscribe request.
    pub fn start_event_handling(&mut self) -> Result<()> {
        if self.event.is_some() {
            debug!("event handling already started");
            return Ok(());
        }

        self.event = Some(transport::connect(&self.socket_path)?);
        self.send_subscription(self.subscriptions)?;
        Ok(())
    }

    /// Register an observer for workspace events. Observers run
    /// synchronously in registration order.
    pub fn on_workspace_event(&mut self, callback: impl FnMut(&WorkspaceEvent) + 'static) {
        self.observers.workspace.push(Box::new(callback));
    }

    /// Register an observer for window events.
    pub fn on_window_event(&mut self, callback: impl FnMut(&WindowEvent) + 'static) {
        self.observers.window.push(Box::new(callback));
    }

    /// Register an observer for binding events.
    pub fn on_binding_event(&mut self, callback: impl FnMut(&Binding) + 'static) {
        self.observers.binding.push(Box::new(callback));
    }

    /// Register an observer for output events; the argument is i3's change
    /// string.
    pub fn on_output_event(&mut self, callback: impl FnMut(&str) + 'static) {
        self.observers.output.push(Box::new(callback));
    }

    /// Register an observer for mode events; the argument is the new mode
    /// name.
    pub fn on_mode_event(&mut self, callback: impl FnMut(&str) + 'static) {
        self.observers.mode.push(Box::new(callback));
    }

    /// Register an observer for barconfig-update events.
    pub fn on_barconfig_update(&mut self, callback: impl FnMut() + 'static) {
        self.observers.barconfig_update.push(Box::new(callback));
    }

    /// Watch an additional file descriptor alongside the event channel.
    /// Whenever [`Connection::handle_event`] finds it readable, `callback`
    /// runs; it is the callback's job to actually consume the readiness.
    ///
    /// The descriptor must stay open for as long as the watch is
    /// registered.
    pub fn add_watch(&mut self, fd: RawFd, callback: impl FnMut() + 'static) {
        self.watches.push(Watch {
            fd,
            callback: Box::new(callback),
        });
    }

    /// Block until the event channel or a watched descriptor is ready, then
    /// dispatch: ready watches get their callbacks invoked, and one event
    /// frame (if any) is read, decoded, and delivered to the registered
    /// observers. The caller loops.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EventsNotStarted`] before
    /// [`Connection::start_event_handling`], [`Error::Poll`] when the wait
    /// fails, or any transport/decode error for the event frame. Unknown
    /// event subtypes are not errors; those events are dropped.
    pub fn handle_event(&mut self) -> Result<()> {
        let readable = PollFlags::POLLIN | PollFlags::POLLHUP | PollFlags::POLLERR;

        let (event_ready, ready_watches) = {
            let stream = self.event.as_ref().ok_or(Error::EventsNotStarted)?;
            let mut fds = Vec::with_capacity(1 + self.watches.len());
            fds.push(PollFd::new(stream.as_fd(), PollFlags::POLLIN));
            for watch in &self.watches {
                // Safety: add_watch requires the fd to outlive the watch,
                // and the borrow ends when `fds` is dropped below.
                let fd = unsafe { BorrowedFd::borrow_raw(watch.fd) };
                fds.push(PollFd::new(fd, PollFlags::POLLIN));
            }

            loop {
                match poll(&mut fds, PollTimeout::NONE) {
                    Ok(_) => break,
                    Err(Errno::EINTR) => {}
                    Err(e) => return Err(Error::Poll(e)),
                }
            }

            let event_ready = fds[0].revents().is_some_and(|r| r.intersects(readable));
            let ready_watches: Vec<bool> = fds[1..]
                .iter()
                .map(|fd| fd.revents().is_some_and(|r| r.intersects(readable)))
                .collect();
            (event_ready, ready_watches)
        };

        for (watch, ready) in self.watches.iter_mut().zip(&ready_watches) {
            if *ready {
                (watch.callback)();
            }
        }

        if event_ready {
            self.receive_and_dispatch()?;
        }
        Ok(())
    }

    fn receive_and_dispatch(&mut self) -> Result<()> {
        let frame = {
            let stream = self.event.as_mut().ok_or(Error::EventsNotStarted)?;
            transport::read_frame(stream)?
        };

        if !protocol::is_event(frame.message_type) {
            warn!(
                tag = frame.message_type,
                "non-event frame on the event channel, dropping"
            );
            return Ok(());
        }

        let Some(event) = event::decode(&frame)? else {
            return Ok(());
        };
        self.deliver(&event);
        Ok(())
    }

    fn deliver(&mut self, event: &Event) {
        match event {
            Event::Workspace(ev) => {
                for cb in &mut self.observers.workspace {
                    cb(ev);
                }
            }
            Event::Output { change } => {
                for cb in &mut self.observers.output {
                    cb(change);
                }
            }
            Event::Mode { change } => {
                for cb in &mut self.observers.mode {
                    cb(change);
                }
            }
            Event::Window(ev) => {
                for cb in &mut self.observers.window {
                    cb(ev);
                }
            }
            Event::BarConfigUpdate => {
                for cb in &mut self.observers.barconfig_update {
                    cb();
                }
            }
            Event::Binding(binding) => {
                for cb in &mut self.observers.binding {
                    cb(binding);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::thread;

    fn test_connection() -> (Connection, UnixStream) {
        let (client, server) = UnixStream::pair().unwrap();
        (
            Connection::from_parts(client, PathBuf::from("/nonexistent/test.sock")),
            server,
        )
    }

    fn reply_with(server: &mut UnixStream, message_type: u32, payload: &[u8]) -> Frame {
        let request = transport::read_frame(server).unwrap();
        transport::write_frame(server, message_type, payload).unwrap();
        request
    }

    #[test]
    fn test_send_command_returns_first_success() {
        let (mut conn, mut server) = test_connection();

        let handle = thread::spawn(move || reply_with(&mut server, 0, br#"[{"success":true}]"#));

        assert!(conn.send_command("exit").unwrap());
        let request = handle.join().unwrap();
        assert_eq!(request.message_type, 0);
        assert_eq!(request.payload, b"exit");
    }

    #[test]
    fn test_send_command_failure_is_ok_false() {
        let (mut conn, mut server) = test_connection();

        let handle = thread::spawn(move || {
            reply_with(
                &mut server,
                0,
                br#"[{"success":false,"error":"Unknown command"}]"#,
            )
        });

        assert!(!conn.send_command("bogus").unwrap());
        handle.join().unwrap();
    }

    #[test]
    fn test_send_command_empty_reply_is_malformed() {
        let (mut conn, mut server) = test_connection();
        let handle = thread::spawn(move || reply_with(&mut server, 0, b"[]"));

        assert!(matches!(
            conn.send_command("exit"),
            Err(Error::MalformedReply { .. })
        ));
        handle.join().unwrap();
    }

    #[test]
    fn test_get_version_over_stream() {
        let (mut conn, mut server) = test_connection();

        let handle = thread::spawn(move || {
            reply_with(
                &mut server,
                7,
                br#"{"human_readable":"4.23","loaded_config_file_name":"/cfg","major":4,"minor":23,"patch":0}"#,
            )
        });

        let version = conn.get_version().unwrap();
        assert_eq!(version.major, 4);
        assert_eq!(version.loaded_config_file_name, "/cfg");
        let request = handle.join().unwrap();
        assert_eq!(request.message_type, 7);
    }

    #[test]
    fn test_get_tree_over_stream() {
        let (mut conn, mut server) = test_connection();

        let handle = thread::spawn(move || {
            reply_with(&mut server, 4, br#"{"id":1,"nodes":[{"id":2,"nodes":[]}]}"#)
        });

        let tree = conn.get_tree().unwrap();
        assert_eq!(tree.id, 1);
        assert_eq!(tree.nodes.len(), 1);
        assert_eq!(tree.nodes[0].id, 2);
        handle.join().unwrap();
    }

    #[test]
    fn test_query_reply_type_mismatch() {
        let (mut conn, mut server) = test_connection();

        // get-workspaces answered with a get-tree-tagged reply
        let handle = thread::spawn(move || reply_with(&mut server, 4, b"[]"));

        assert!(matches!(
            conn.get_workspaces(),
            Err(Error::ReplyTypeMismatch {
                expected: 1,
                got: 4
            })
        ));
        handle.join().unwrap();
    }

    #[test]
    fn test_subscribe_idle_accumulates_without_wire_traffic() {
        let (mut conn, server) = test_connection();

        assert!(conn.subscribe(EventMask::WORKSPACE).unwrap());
        assert!(conn.subscribe(EventMask::WINDOW).unwrap());
        assert_eq!(
            conn.subscriptions(),
            EventMask::WORKSPACE | EventMask::WINDOW
        );

        // Nothing may have been written to the socket.
        server.set_nonblocking(true).unwrap();
        let mut buf = [0u8; 1];
        let err = (&server).read(&mut buf).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::WouldBlock);
    }

    #[test]
    fn test_handle_event_before_start_is_an_error() {
        let (mut conn, _server) = test_connection();
        assert!(matches!(conn.handle_event(), Err(Error::EventsNotStarted)));
    }

    #[test]
    fn test_deliver_runs_observers_in_registration_order() {
        let (mut conn, _server) = test_connection();

        let order = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        for tag in ["first", "second", "third"] {
            let order = order.clone();
            conn.on_mode_event(move |_| order.borrow_mut().push(tag));
        }

        conn.deliver(&Event::Mode {
            change: "resize".to_owned(),
        });
        assert_eq!(*order.borrow(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_receive_and_dispatch_drops_unknown_subtype() {
        let (mut conn, _main_server) = test_connection();
        let (event_client, mut event_server) = UnixStream::pair().unwrap();
        conn.event = Some(event_client);

        let seen = std::rc::Rc::new(std::cell::RefCell::new(0));
        let seen2 = seen.clone();
        conn.on_workspace_event(move |_| *seen2.borrow_mut() += 1);

        transport::write_frame(&mut event_server, 0x8000_0000, br#"{"change":"rename"}"#)
            .unwrap();
        conn.receive_and_dispatch().unwrap();
        assert_eq!(*seen.borrow(), 0);

        transport::write_frame(&mut event_server, 0x8000_0000, br#"{"change":"focus"}"#)
            .unwrap();
        conn.receive_and_dispatch().unwrap();
        assert_eq!(*seen.borrow(), 1);
    }
}
