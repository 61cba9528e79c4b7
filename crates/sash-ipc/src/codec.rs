//! Wire codec for the i3 IPC framing.
//!
//! Every message on the socket is one frame:
//!
//! ```text
//! +----------+----------------+--------------+------------------+
//! | 6 bytes  | 4 bytes        | 4 bytes      | N bytes          |
//! | "i3-ipc" | payload len LE | type tag LE  | UTF-8 JSON       |
//! +----------+----------------+--------------+------------------+
//! ```
//!
//! Framing is all-or-nothing: once a header has been read, exactly
//! `payload_len` more bytes constitute the payload. Partial reads are the
//! transport's problem, not the codec's.

use bytes::{BufMut, BytesMut};

use crate::error::{Error, Result};

/// The six-byte magic every frame starts with.
pub const MAGIC: &[u8; 6] = b"i3-ipc";

/// Fixed size of a frame header: magic + length + type.
pub const HEADER_LEN: usize = 14;

/// Sanity bound on a declared payload length (16 MiB). A header claiming
/// more than this is treated as corrupt rather than allocated.
pub const MAX_PAYLOAD_LEN: usize = 16 * 1024 * 1024;

/// One complete framed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Message type tag for requests/replies; event tag (high bit set) for
    /// events.
    pub message_type: u32,
    pub payload: Vec<u8>,
}

/// Decoded frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub payload_len: u32,
    pub message_type: u32,
}

/// Encode one frame, filling the magic and the exact declared length.
#[allow(clippy::cast_possible_truncation)] // payload length is bounded by MAX_PAYLOAD_LEN
#[must_use]
pub fn encode(message_type: u32, payload: &[u8]) -> BytesMut {
    debug_assert!(payload.len() <= MAX_PAYLOAD_LEN);

    let mut buf = BytesMut::with_capacity(HEADER_LEN + payload.len());
    buf.put_slice(MAGIC);
    buf.put_u32_le(payload.len() as u32);
    buf.put_u32_le(message_type);
    buf.put_slice(payload);
    buf
}

/// Decode a frame header from exactly [`HEADER_LEN`] bytes.
///
/// # Errors
///
/// Returns [`Error::InvalidHeader`] when the magic does not match or the
/// declared payload length exceeds [`MAX_PAYLOAD_LEN`].
pub fn decode_header(buf: &[u8; HEADER_LEN]) -> Result<Header> {
    if &buf[..MAGIC.len()] != MAGIC {
        return Err(Error::InvalidHeader(format!(
            "bad magic {:02x?}",
            &buf[..MAGIC.len()]
        )));
    }

    let payload_len = u32::from_le_bytes([buf[6], buf[7], buf[8], buf[9]]);
    let message_type = u32::from_le_bytes([buf[10], buf[11], buf[12], buf[13]]);

    if payload_len as usize > MAX_PAYLOAD_LEN {
        return Err(Error::InvalidHeader(format!(
            "declared payload length {payload_len} exceeds {MAX_PAYLOAD_LEN}"
        )));
    }

    Ok(Header {
        payload_len,
        message_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(buf: &[u8]) -> (Header, &[u8]) {
        let header = decode_header(buf[..HEADER_LEN].try_into().unwrap()).unwrap();
        (header, &buf[HEADER_LEN..])
    }

    #[test]
    fn test_encode_run_command_exit_exact_bytes() {
        let buf = encode(0, b"exit");
        assert_eq!(
            &buf[..],
            [
                0x69, 0x33, 0x2d, 0x69, 0x70, 0x63, // "i3-ipc"
                0x04, 0x00, 0x00, 0x00, // length = 4
                0x00, 0x00, 0x00, 0x00, // type = 0 (run command)
                0x65, 0x78, 0x69, 0x74, // "exit"
            ]
        );
    }

    #[test]
    fn test_roundtrip() {
        for (message_type, payload) in [
            (0u32, &b""[..]),
            (1, b"[]"),
            (7, b"{\"major\":4}"),
            (0x8000_0000, b"{\"change\":\"focus\"}"),
        ] {
            let buf = encode(message_type, payload);
            let (header, body) = split(&buf);
            assert_eq!(header.message_type, message_type);
            assert_eq!(header.payload_len as usize, payload.len());
            assert_eq!(body, payload);
        }
    }

    #[test]
    fn test_roundtrip_large_payload() {
        let payload = vec![b'x'; 65535];
        let buf = encode(4, &payload);
        let (header, body) = split(&buf);
        assert_eq!(header.payload_len, 65535);
        assert_eq!(body.len(), 65535);
    }

    #[test]
    fn test_bad_magic_rejected() {
        let mut buf = encode(1, b"[]");
        buf[0] = b'x';
        let result = decode_header(buf[..HEADER_LEN].try_into().unwrap());
        assert!(matches!(result, Err(Error::InvalidHeader(_))));
    }

    #[test]
    fn test_truncated_magic_rejected() {
        // A buffer that starts with unrelated ASCII must not pass.
        let buf = *b"i3-ipX\x00\x00\x00\x00\x00\x00\x00\x00";
        assert!(matches!(
            decode_header(&buf),
            Err(Error::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_oversized_length_rejected() {
        let mut buf = [0u8; HEADER_LEN];
        buf[..6].copy_from_slice(MAGIC);
        #[allow(clippy::cast_possible_truncation)] // test constant fits u32
        let too_big = (MAX_PAYLOAD_LEN as u32) + 1;
        buf[6..10].copy_from_slice(&too_big.to_le_bytes());
        assert!(matches!(
            decode_header(&buf),
            Err(Error::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_empty_payload_header() {
        let buf = encode(7, b"");
        let (header, body) = split(&buf);
        assert_eq!(header.payload_len, 0);
        assert!(body.is_empty());
    }
}
