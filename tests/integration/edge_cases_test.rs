// tests/integration/edge_cases_test.rs
//
//! Covers the edge cases that don't have a more natural home in a
//! per-command-kind file: pipelined requests arriving as one write (E1).

use super::test_helpers::TestContext;
use bytes::BytesMut;
use kvdaemon::core::protocol::{RespFrame, RespFrameCodec, RespValue};
use tokio_util::codec::Decoder;

/// Spec edge case E1: two commands arrive back-to-back in a single buffer
/// (as a pipelining client would write them). The codec must decode both
/// without needing a read in between, and each dispatches independently.
#[test]
fn pipelined_commands_in_one_buffer_decode_and_dispatch_in_order() {
    let mut buf = BytesMut::new();
    buf.extend_from_slice(b"*3\r\n$3\r\nSET\r\n$1\r\na\r\n$1\r\n1\r\n");
    buf.extend_from_slice(b"*2\r\n$3\r\nGET\r\n$1\r\na\r\n");

    let mut codec = RespFrameCodec;
    let first = codec.decode(&mut buf).unwrap().expect("first frame present");
    let second = codec.decode(&mut buf).unwrap().expect("second frame present");
    assert!(codec.decode(&mut buf).unwrap().is_none(), "buffer should be fully drained");

    let ctx = TestContext::new();

    let set_argv = first.as_command_args().unwrap();
    let set_argv: Vec<&str> = set_argv.iter().map(|b| std::str::from_utf8(b).unwrap()).collect();
    assert_eq!(ctx.exec(&set_argv).unwrap(), RespValue::ok());

    let get_argv = second.as_command_args().unwrap();
    let get_argv: Vec<&str> = get_argv.iter().map(|b| std::str::from_utf8(b).unwrap()).collect();
    assert_eq!(ctx.exec(&get_argv).unwrap(), RespValue::bulk("1"));
}

/// A command frame's own `RespFrame` encoding round-trips through the
/// decoder byte-for-byte, independent of whatever else is queued after it.
#[test]
fn encoded_command_frame_round_trips_through_decoder() {
    let frame = RespFrame::command(&[b"SET", b"k", b"v"]);
    let bytes = frame.encode_to_vec().unwrap();

    let mut buf = BytesMut::from(&bytes[..]);
    let mut codec = RespFrameCodec;
    let decoded = codec.decode(&mut buf).unwrap().expect("frame decodes");
    assert_eq!(decoded, frame);
}
