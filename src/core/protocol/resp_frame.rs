// src/core/protocol/resp_frame.rs

//! The RESP frame type and its `tokio_util::codec` implementation.
//!
//! Parsing is a pull state machine: `ExpectHeader` reads the type byte,
//! `ExpectLineOrBulkLen` reads the CRLF-terminated header line (and, for
//! bulk strings, the declared length), `ExpectBulkBody(N)` reads exactly N
//! body bytes plus the trailing CRLF. Each call to `decode` attempts a full
//! frame from the front of the buffer; if the buffer doesn't yet hold enough
//! bytes for the frame currently being parsed, it returns `Ok(None)` without
//! consuming anything, so the caller re-enters the same state once more
//! bytes arrive.

use crate::core::errors::EngineError;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// A single RESP frame, in either direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespFrame {
    Simple(String),
    Error(String),
    Integer(i64),
    Bulk(Bytes),
    NullBulk,
    Array(Vec<RespFrame>),
    NullArray,
}

impl RespFrame {
    /// Builds the multi-bulk array form of a command, e.g. for AOF
    /// persistence or outbound client requests.
    pub fn command(parts: &[&[u8]]) -> RespFrame {
        RespFrame::Array(
            parts
                .iter()
                .map(|p| RespFrame::Bulk(Bytes::copy_from_slice(p)))
                .collect(),
        )
    }

    /// Extracts the command's argument list if this frame is a well-formed
    /// multi-bulk array of bulk strings.
    pub fn as_command_args(&self) -> Option<Vec<Bytes>> {
        match self {
            RespFrame::Array(items) => items
                .iter()
                .map(|f| match f {
                    RespFrame::Bulk(b) => Some(b.clone()),
                    _ => None,
                })
                .collect(),
            _ => None,
        }
    }

    pub fn encode_to_vec(&self) -> EngineResultVec {
        let mut buf = BytesMut::new();
        let mut codec = RespFrameCodec;
        codec
            .encode(self.clone(), &mut buf)
            .map_err(|e| EngineError::Internal(e.to_string()))?;
        Ok(buf.to_vec())
    }
}

type EngineResultVec = Result<Vec<u8>, EngineError>;

#[derive(Debug, Default, Clone, Copy)]
pub struct RespFrameCodec;

/// Finds the offset of a CRLF-terminated line, returning the line body
/// (excluding CRLF) and the number of bytes consumed (including CRLF).
/// `Ok(None)` means "not enough bytes yet"; a lone `\r` not followed by
/// `\n` can never become valid no matter how much more data arrives, so
/// that case is a protocol error rather than "incomplete".
fn find_line(buf: &[u8]) -> Result<Option<(&[u8], usize)>, EngineError> {
    for i in 0..buf.len() {
        if buf[i] == b'\r' {
            if i + 1 >= buf.len() {
                return Ok(None);
            }
            if buf[i + 1] != b'\n' {
                return Err(EngineError::Protocol("lone CR without following LF".into()));
            }
            return Ok(Some((&buf[..i], i + 2)));
        }
    }
    Ok(None)
}

/// Attempts to parse exactly one frame from the start of `buf`. Returns
/// `Ok(None)` if `buf` doesn't yet contain a complete frame. Never consumes
/// from `buf` itself; the caller advances by the returned byte count.
fn try_parse(buf: &[u8]) -> Result<Option<(RespFrame, usize)>, EngineError> {
    if buf.is_empty() {
        return Ok(None);
    }
    let kind = buf[0];
    let rest = &buf[1..];
    match kind {
        b'+' => match find_line(rest)? {
            Some((line, used)) => {
                let s = std::str::from_utf8(line)
                    .map_err(|_| EngineError::Protocol("invalid utf-8 in simple string".into()))?;
                Ok(Some((RespFrame::Simple(s.to_string()), 1 + used)))
            }
            None => Ok(None),
        },
        b'-' => match find_line(rest)? {
            Some((line, used)) => {
                let s = std::str::from_utf8(line)
                    .map_err(|_| EngineError::Protocol("invalid utf-8 in error".into()))?;
                Ok(Some((RespFrame::Error(s.to_string()), 1 + used)))
            }
            None => Ok(None),
        },
        b':' => match find_line(rest)? {
            Some((line, used)) => {
                let n = parse_i64(line)?;
                Ok(Some((RespFrame::Integer(n), 1 + used)))
            }
            None => Ok(None),
        },
        b'$' => match find_line(rest)? {
            Some((line, header_used)) => {
                let n = parse_i64(line)?;
                if n < 0 {
                    // Only -1 is a defined null-bulk sentinel.
                    return Ok(Some((RespFrame::NullBulk, 1 + header_used)));
                }
                let n = n as usize;
                let body_start = 1 + header_used;
                let needed = body_start + n + 2;
                if buf.len() < needed {
                    return Ok(None);
                }
                if &buf[body_start + n..needed] != b"\r\n" {
                    return Err(EngineError::Protocol("missing CRLF after bulk body".into()));
                }
                let body = Bytes::copy_from_slice(&buf[body_start..body_start + n]);
                Ok(Some((RespFrame::Bulk(body), needed)))
            }
            None => Ok(None),
        },
        b'*' => match find_line(rest)? {
            Some((line, header_used)) => {
                let n = parse_i64(line)?;
                if n < 0 {
                    return Ok(Some((RespFrame::NullArray, 1 + header_used)));
                }
                let n = n as usize;
                let mut consumed = 1 + header_used;
                let mut items = Vec::with_capacity(n);
                for _ in 0..n {
                    match try_parse(&buf[consumed..])? {
                        Some((frame, used)) => {
                            consumed += used;
                            items.push(frame);
                        }
                        None => return Ok(None),
                    }
                }
                Ok(Some((RespFrame::Array(items), consumed)))
            }
            None => Ok(None),
        },
        other => Err(EngineError::Protocol(format!(
            "invalid frame type byte '{}'",
            other as char
        ))),
    }
}

fn parse_i64(line: &[u8]) -> Result<i64, EngineError> {
    std::str::from_utf8(line)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| EngineError::Protocol("invalid integer header".into()))
}

impl Decoder for RespFrameCodec {
    type Item = RespFrame;
    type Error = EngineError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<RespFrame>, EngineError> {
        match try_parse(src) {
            Ok(Some((frame, used))) => {
                src.advance(used);
                Ok(Some(frame))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl Encoder<RespFrame> for RespFrameCodec {
    type Error = EngineError;

    fn encode(&mut self, item: RespFrame, dst: &mut BytesMut) -> Result<(), EngineError> {
        write_frame(&item, dst);
        Ok(())
    }
}

fn write_frame(frame: &RespFrame, dst: &mut BytesMut) {
    match frame {
        RespFrame::Simple(s) => {
            dst.put_u8(b'+');
            dst.extend_from_slice(s.as_bytes());
            dst.extend_from_slice(b"\r\n");
        }
        RespFrame::Error(s) => {
            dst.put_u8(b'-');
            dst.extend_from_slice(s.as_bytes());
            dst.extend_from_slice(b"\r\n");
        }
        RespFrame::Integer(n) => {
            dst.put_u8(b':');
            dst.extend_from_slice(n.to_string().as_bytes());
            dst.extend_from_slice(b"\r\n");
        }
        RespFrame::Bulk(b) => {
            dst.put_u8(b'$');
            dst.extend_from_slice(b.len().to_string().as_bytes());
            dst.extend_from_slice(b"\r\n");
            dst.extend_from_slice(b);
            dst.extend_from_slice(b"\r\n");
        }
        RespFrame::NullBulk => {
            dst.extend_from_slice(b"$-1\r\n");
        }
        RespFrame::NullArray => {
            dst.extend_from_slice(b"*-1\r\n");
        }
        RespFrame::Array(items) => {
            dst.put_u8(b'*');
            dst.extend_from_slice(items.len().to_string().as_bytes());
            dst.extend_from_slice(b"\r\n");
            for item in items {
                write_frame(item, dst);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(frame: RespFrame) {
        let mut buf = BytesMut::new();
        RespFrameCodec.encode(frame.clone(), &mut buf).unwrap();
        let decoded = RespFrameCodec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(frame, decoded);
        assert!(buf.is_empty());
    }

    #[test]
    fn roundtrips_all_frame_kinds() {
        roundtrip(RespFrame::Simple("OK".into()));
        roundtrip(RespFrame::Error("ERR boom".into()));
        roundtrip(RespFrame::Integer(-42));
        roundtrip(RespFrame::Bulk(Bytes::from_static(b"hello")));
        roundtrip(RespFrame::NullBulk);
        roundtrip(RespFrame::NullArray);
        roundtrip(RespFrame::Array(vec![
            RespFrame::Bulk(Bytes::from_static(b"SET")),
            RespFrame::Bulk(Bytes::from_static(b"a")),
            RespFrame::Bulk(Bytes::from_static(b"1")),
        ]));
    }

    #[test]
    fn incomplete_frame_returns_none_without_consuming() {
        let mut buf = BytesMut::from(&b"*2\r\n$3\r\nSET\r\n$1\r\n"[..]);
        let before = buf.clone();
        assert_eq!(RespFrameCodec.decode(&mut buf).unwrap(), None);
        assert_eq!(buf, before);
    }

    #[test]
    fn pipelined_frames_decode_one_at_a_time() {
        let mut buf = BytesMut::from(&b"+OK\r\n+ALSO\r\n"[..]);
        assert_eq!(
            RespFrameCodec.decode(&mut buf).unwrap(),
            Some(RespFrame::Simple("OK".into()))
        );
        assert_eq!(
            RespFrameCodec.decode(&mut buf).unwrap(),
            Some(RespFrame::Simple("ALSO".into()))
        );
        assert_eq!(RespFrameCodec.decode(&mut buf).unwrap(), None);
    }

    #[test]
    fn rejects_bad_type_byte() {
        let mut buf = BytesMut::from(&b"!nope\r\n"[..]);
        assert!(RespFrameCodec.decode(&mut buf).is_err());
    }

    #[test]
    fn lone_cr_without_lf_is_a_protocol_error_not_incomplete() {
        let mut buf = BytesMut::from(&b"+OK\rNOPE\r\n"[..]);
        assert!(RespFrameCodec.decode(&mut buf).is_err());
    }
}
