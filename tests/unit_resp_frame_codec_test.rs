// tests/unit_resp_frame_codec_test.rs
//
//! Exercises `RespFrameCodec` the way a connection actually sees it: through
//! a `Framed` transport over a simulated duplex stream, rather than feeding
//! bytes straight into `decode`. `tokio_test::io::Builder` lets a read come
//! back in several chunks, which is the case the pull-state parser in
//! `resp_frame.rs` exists to handle.

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use kvdaemon::core::protocol::{RespFrame, RespFrameCodec};
use tokio_test::io::Builder;
use tokio_util::codec::Framed;

#[tokio::test]
async fn decodes_a_command_split_across_several_reads() {
    let io = Builder::new()
        .read(b"*2\r\n$3\r\nGET")
        .read(b"\r\n$1\r\na\r\n")
        .build();
    let mut framed = Framed::new(io, RespFrameCodec);

    let frame = framed.next().await.expect("a frame").expect("decodes cleanly");
    assert_eq!(frame.as_command_args(), Some(vec![Bytes::from_static(b"GET"), Bytes::from_static(b"a")]));
}

#[tokio::test]
async fn encodes_a_reply_exactly_as_the_peer_expects_to_read_it() {
    let io = Builder::new().write(b"$3\r\nfoo\r\n").build();
    let mut framed = Framed::new(io, RespFrameCodec);

    framed.send(RespFrame::Bulk(Bytes::from_static(b"foo"))).await.expect("write succeeds");
}

/// The regression this guards: a lone `\r` with no following `\n` must
/// surface as a decode error instead of the codec waiting forever for bytes
/// that can never complete the line.
#[tokio::test]
async fn lone_cr_across_a_read_boundary_is_a_protocol_error() {
    let io = Builder::new().read(b"+OK\r").read(b"NOPE\r\n").build();
    let mut framed = Framed::new(io, RespFrameCodec);

    let result = framed.next().await.expect("stream yields a result");
    assert!(result.is_err());
}
