// tests/integration/pubsub_test.rs

use bytes::Bytes;
use kvdaemon::core::protocol::RespFrame;
use kvdaemon::core::pubsub::PubSubHub;
use tokio::sync::mpsc;

/// Spec edge case E4: a publish to a channel with one subscriber delivers
/// exactly one `message` push frame, and the publish call reports one
/// receiver.
#[tokio::test]
async fn publish_delivers_message_frame_to_subscriber() {
    let hub = PubSubHub::new();
    let (tx, mut rx) = mpsc::unbounded_channel::<RespFrame>();

    hub.subscribe("ch".into(), 1, tx);

    let delivered = hub.publish(b"ch", b"hello");
    assert_eq!(delivered, 1);

    let frame = rx.recv().await.expect("subscriber should receive the push");
    let args = frame.as_command_args().expect("push frame decodes as an array");
    let args: Vec<&[u8]> = args.iter().map(|b| b.as_ref()).collect();
    assert_eq!(args, vec![b"message".as_slice(), b"ch".as_slice(), b"hello".as_slice()]);
}

#[tokio::test]
async fn publish_to_channel_with_no_subscribers_reports_zero() {
    let hub = PubSubHub::new();
    assert_eq!(hub.publish(b"ch", b"hello"), 0);
}

#[tokio::test]
async fn unsubscribe_stops_further_delivery() {
    let hub = PubSubHub::new();
    let (tx, mut rx) = mpsc::unbounded_channel::<RespFrame>();
    hub.subscribe("ch".into(), 1, tx);
    hub.unsubscribe(b"ch", 1);

    assert_eq!(hub.publish(b"ch", b"hello"), 0);
    assert!(rx.try_recv().is_err());
}

#[test]
fn subscribe_reply_reports_channel_count() {
    let reply = PubSubHub::subscribe_reply(b"ch", 1);
    assert_eq!(
        reply,
        RespFrame::Array(vec![
            RespFrame::Bulk(Bytes::from_static(b"subscribe")),
            RespFrame::Bulk(Bytes::from_static(b"ch")),
            RespFrame::Integer(1),
        ])
    );
}
