//! Default IPC endpoint resolution.
//!
//! Callers that know the socket path connect to it directly; everyone else
//! goes through a [`SocketPathResolver`]. The stock resolver consults the
//! `I3SOCK` environment variable first and falls back to asking the window
//! manager itself.

use std::path::PathBuf;
use std::process::Command;

use crate::error::{Error, Result};

/// Strategy for resolving the default IPC endpoint.
pub trait SocketPathResolver {
    /// Resolve the socket path to dial.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SocketPathLookup`] when no endpoint can be
    /// determined.
    fn resolve(&self) -> Result<PathBuf>;
}

/// The stock resolver: `I3SOCK` if set, otherwise `i3 --get-socketpath`
/// with one trailing newline trimmed.
#[derive(Debug, Clone, Copy, Default)]
pub struct I3SocketPath;

impl SocketPathResolver for I3SocketPath {
    fn resolve(&self) -> Result<PathBuf> {
        if let Ok(path) = std::env::var("I3SOCK")
            && !path.is_empty()
        {
            return Ok(PathBuf::from(path));
        }

        let output = Command::new("i3")
            .arg("--get-socketpath")
            .output()
            .map_err(|e| {
                Error::SocketPathLookup(format!("failed to run `i3 --get-socketpath`: {e}"))
            })?;

        if !output.status.success() {
            return Err(Error::SocketPathLookup(format!(
                "`i3 --get-socketpath` exited with {}",
                output.status
            )));
        }

        parse_socketpath_output(&output.stdout)
    }
}

fn parse_socketpath_output(stdout: &[u8]) -> Result<PathBuf> {
    let mut path = String::from_utf8(stdout.to_vec())
        .map_err(|_| Error::SocketPathLookup("socket path is not valid UTF-8".to_owned()))?;

    if path.ends_with('\n') {
        path.pop();
    }

    if path.is_empty() {
        return Err(Error::SocketPathLookup(
            "`i3 --get-socketpath` printed nothing".to_owned(),
        ));
    }

    Ok(PathBuf::from(path))
}

/// Resolve the default socket path with the stock resolver.
///
/// # Errors
///
/// Returns [`Error::SocketPathLookup`] when no endpoint can be determined.
pub fn socket_path() -> Result<PathBuf> {
    I3SocketPath.resolve()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_newline_trimmed() {
        let path = parse_socketpath_output(b"/run/user/1000/i3/ipc-socket.1234\n").unwrap();
        assert_eq!(
            path,
            PathBuf::from("/run/user/1000/i3/ipc-socket.1234")
        );
    }

    #[test]
    fn test_only_one_newline_trimmed() {
        let path = parse_socketpath_output(b"/tmp/sock\n\n").unwrap();
        assert_eq!(path, PathBuf::from("/tmp/sock\n"));
    }

    #[test]
    fn test_no_newline_is_fine() {
        let path = parse_socketpath_output(b"/tmp/sock").unwrap();
        assert_eq!(path, PathBuf::from("/tmp/sock"));
    }

    #[test]
    fn test_empty_output_is_an_error() {
        assert!(matches!(
            parse_socketpath_output(b"\n"),
            Err(Error::SocketPathLookup(_))
        ));
    }
}
