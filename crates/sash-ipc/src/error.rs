//! Error types for the sash-ipc crate.

use std::path::PathBuf;

use thiserror::Error;

/// Unified error type for IPC operations.
///
/// Every variant except the transient I/O interrupts handled inside the
/// transport loops is fatal for the failing call: nothing here is retried
/// internally, and a broken connection is never re-established.
#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to connect to i3 socket {path}: {source}")]
    Connect {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unexpected end of stream while reading {context}")]
    UnexpectedEof { context: &'static str },

    #[error("invalid frame header: {0}")]
    InvalidHeader(String),

    #[error("reply type mismatch: expected {expected:#x}, got {got:#x}")]
    ReplyTypeMismatch { expected: u32, got: u32 },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed reply: `{path}` expected to be {expected}")]
    MalformedReply {
        path: String,
        expected: &'static str,
    },

    #[error("event handling has not been started")]
    EventsNotStarted,

    #[error("poll failed: {0}")]
    Poll(#[from] nix::errno::Errno),

    #[error("failed to resolve i3 socket path: {0}")]
    SocketPathLookup(String),
}

impl Error {
    pub(crate) fn malformed(path: impl Into<String>, expected: &'static str) -> Self {
        Error::MalformedReply {
            path: path.into(),
            expected,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_connect() {
        let err = Error::Connect {
            path: PathBuf::from("/run/user/1000/i3/ipc-socket.42"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        };
        assert!(err.to_string().contains("ipc-socket.42"));
        assert!(err.to_string().contains("no such file"));
    }

    #[test]
    fn test_error_display_reply_type_mismatch() {
        let err = Error::ReplyTypeMismatch {
            expected: 0x1,
            got: 0x4,
        };
        assert!(err.to_string().contains("0x1"));
        assert!(err.to_string().contains("0x4"));
    }

    #[test]
    fn test_error_display_malformed_reply() {
        let err = Error::malformed("root[0].rect", "an object");
        assert_eq!(
            err.to_string(),
            "malformed reply: `root[0].rect` expected to be an object"
        );
    }

    #[test]
    fn test_error_display_unexpected_eof() {
        let err = Error::UnexpectedEof { context: "header" };
        assert!(err.to_string().contains("header"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broken");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("pipe broken"));
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
