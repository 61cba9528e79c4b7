//! Blocking frame transport.
//!
//! The functions here are generic over [`Read`]/[`Write`] so the byte-stream
//! seam stays testable; the live session feeds them `UnixStream`s. Partial
//! reads and writes loop to completion, and `Interrupted`/`WouldBlock` are
//! retried transparently. A zero-length read before a frame is complete is
//! a fatal [`Error::UnexpectedEof`]; every other I/O failure is fatal too.
//! There are no timeouts: a non-responding peer stalls the caller.

use std::io::{self, Read, Write};
use std::os::unix::net::UnixStream;
use std::path::Path;

use tracing::trace;

use crate::codec::{self, Frame, HEADER_LEN};
use crate::error::{Error, Result};

/// Open a blocking stream connection to the IPC socket at `path`.
///
/// # Errors
///
/// Returns [`Error::Connect`] wrapping the OS error on failure.
pub fn connect(path: &Path) -> Result<UnixStream> {
    UnixStream::connect(path).map_err(|source| Error::Connect {
        path: path.to_path_buf(),
        source,
    })
}

fn is_transient(kind: io::ErrorKind) -> bool {
    matches!(kind, io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock)
}

fn write_all_retrying<W: Write + ?Sized>(writer: &mut W, buf: &[u8]) -> Result<()> {
    let mut written = 0;
    while written < buf.len() {
        match writer.write(&buf[written..]) {
            Ok(0) => return Err(io::Error::from(io::ErrorKind::WriteZero).into()),
            Ok(n) => written += n,
            Err(e) if is_transient(e.kind()) => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

fn read_full<R: Read + ?Sized>(
    reader: &mut R,
    buf: &mut [u8],
    context: &'static str,
) -> Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => return Err(Error::UnexpectedEof { context }),
            Ok(n) => filled += n,
            Err(e) if is_transient(e.kind()) => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

/// Write one encoded frame.
///
/// # Errors
///
/// Returns [`Error::Io`] on a non-transient write failure.
pub fn write_frame<W: Write + ?Sized>(
    writer: &mut W,
    message_type: u32,
    payload: &[u8],
) -> Result<()> {
    let buf = codec::encode(message_type, payload);
    write_all_retrying(writer, &buf)
}

/// Block until one complete frame has been read.
///
/// # Errors
///
/// Returns [`Error::InvalidHeader`] on a magic/length violation,
/// [`Error::UnexpectedEof`] when the stream ends mid-frame, or
/// [`Error::Io`] on any other read failure.
pub fn read_frame<R: Read + ?Sized>(reader: &mut R) -> Result<Frame> {
    let mut header_buf = [0u8; HEADER_LEN];
    read_full(reader, &mut header_buf, "frame header")?;
    let header = codec::decode_header(&header_buf)?;

    let mut payload = vec![0u8; header.payload_len as usize];
    read_full(reader, &mut payload, "frame payload")?;

    Ok(Frame {
        message_type: header.message_type,
        payload,
    })
}

/// Perform one blocking request/reply exchange.
///
/// The session is single-outstanding-request per stream: the reply's type
/// tag must equal the request's.
///
/// # Errors
///
/// Returns [`Error::ReplyTypeMismatch`] on a desynchronized stream, or any
/// framing/I-O error from [`write_frame`]/[`read_frame`].
pub fn request<S: Read + Write>(stream: &mut S, message_type: u32, payload: &[u8]) -> Result<Frame> {
    write_frame(stream, message_type, payload)?;
    let reply = read_frame(stream)?;

    if reply.message_type != message_type {
        return Err(Error::ReplyTypeMismatch {
            expected: message_type,
            got: reply.message_type,
        });
    }

    trace!(
        message_type,
        reply_len = reply.payload.len(),
        "request completed"
    );
    Ok(reply)
}
