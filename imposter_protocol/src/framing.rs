// Length-delimited message framing over TCP.
//
// Wire format: a 4-byte big-endian length prefix followed by a JSON payload.
// `write_frame` / `read_frame` move raw bytes; `send_json` / `recv_json` add
// the serde_json step so channel code can work with typed messages directly.
//
// `MAX_FRAME_SIZE` (1 MiB) protects against unbounded allocation from a
// malformed length prefix. A START_GAME for twelve players with citations is
// a few kilobytes.

use std::io::{self, Read, Write};

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Maximum allowed frame payload (1 MiB).
pub const MAX_FRAME_SIZE: u32 = 1024 * 1024;

/// Failures while encoding, decoding, or moving frames.
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    #[error("malformed payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("frame too large: {0} bytes")]
    TooLarge(usize),
    #[error("invalid room code {0:?}")]
    InvalidRoomCode(String),
}

impl WireError {
    /// True when the peer closed the stream (cleanly or mid-frame).
    pub fn is_disconnect(&self) -> bool {
        matches!(self, WireError::Io(e) if matches!(
            e.kind(),
            io::ErrorKind::UnexpectedEof
                | io::ErrorKind::ConnectionReset
                | io::ErrorKind::ConnectionAborted
                | io::ErrorKind::BrokenPipe
        ))
    }
}

/// Write one frame: 4-byte big-endian length, then payload, then flush.
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> Result<(), WireError> {
    let len = u32::try_from(payload.len())
        .ok()
        .filter(|len| *len <= MAX_FRAME_SIZE)
        .ok_or(WireError::TooLarge(payload.len()))?;
    writer.write_all(&len.to_be_bytes())?;
    writer.write_all(payload)?;
    writer.flush()?;
    Ok(())
}

/// Read one frame. A stream that closes before or during a frame yields an
/// `UnexpectedEof` I/O error.
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Vec<u8>, WireError> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf)?;
    let len = u32::from_be_bytes(len_buf);
    if len > MAX_FRAME_SIZE {
        return Err(WireError::TooLarge(len as usize));
    }
    let mut buf = vec![0u8; len as usize];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

/// Serialize `msg` to JSON and write it as one frame.
pub fn send_json<W: Write, T: Serialize>(writer: &mut W, msg: &T) -> Result<(), WireError> {
    let json = serde_json::to_vec(msg)?;
    write_frame(writer, &json)
}

/// Read one frame and deserialize it from JSON.
pub fn recv_json<R: Read, T: DeserializeOwned>(reader: &mut R) -> Result<T, WireError> {
    let bytes = read_frame(reader)?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn empty_frame_roundtrips() {
        let mut buf = Vec::new();
        write_frame(&mut buf, b"").unwrap();
        assert_eq!(buf, vec![0, 0, 0, 0]);
        let recovered = read_frame(&mut Cursor::new(&buf)).unwrap();
        assert!(recovered.is_empty());
    }

    #[test]
    fn rejects_oversized_write() {
        let big = vec![0u8; MAX_FRAME_SIZE as usize + 1];
        let mut buf = Vec::new();
        let err = write_frame(&mut buf, &big).unwrap_err();
        assert!(matches!(err, WireError::TooLarge(_)));
        assert!(buf.is_empty(), "nothing written for a rejected frame");
    }

    #[test]
    fn rejects_oversized_read() {
        let fake_len = (MAX_FRAME_SIZE + 1).to_be_bytes();
        let err = read_frame(&mut Cursor::new(fake_len.to_vec())).unwrap_err();
        assert!(matches!(err, WireError::TooLarge(_)));
    }

    #[test]
    fn truncated_prefix_is_a_disconnect() {
        let err = read_frame(&mut Cursor::new(vec![0u8, 1])).unwrap_err();
        assert!(err.is_disconnect());
    }

    #[test]
    fn truncated_body_is_a_disconnect() {
        let mut buf = Vec::new();
        write_frame(&mut buf, b"hello").unwrap();
        buf.truncate(buf.len() - 2);
        let err = read_frame(&mut Cursor::new(buf)).unwrap_err();
        assert!(err.is_disconnect());
    }

    #[test]
    fn garbage_json_is_not_a_disconnect() {
        let mut buf = Vec::new();
        write_frame(&mut buf, b"{not json").unwrap();
        let err = recv_json::<_, serde_json::Value>(&mut Cursor::new(buf)).unwrap_err();
        assert!(matches!(err, WireError::Json(_)));
        assert!(!err.is_disconnect());
    }

    #[test]
    fn frames_stay_ordered() {
        let mut buf = Vec::new();
        for word in ["first", "second", "third"] {
            send_json(&mut buf, &word).unwrap();
        }
        let mut cursor = Cursor::new(buf);
        for expected in ["first", "second", "third"] {
            let got: String = recv_json(&mut cursor).unwrap();
            assert_eq!(got, expected);
        }
    }
}
