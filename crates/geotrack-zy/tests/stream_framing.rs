//! ---
//! gt_section: "03-zy-protocol"
//! gt_subsection: "module"
//! gt_type: "source"
//! gt_scope: "code"
//! gt_description: "ZY telemetry frame parsing, routing and stream framing."
//! gt_version: "v0.1.0"
//! gt_owner: "tbd"
//! ---
use chrono::Utc;
use futures::StreamExt;
use geotrack_zy::{route, Command, ContentRecord, Frame, FrameError, ZyFrameCodec, TOKEN_LEN};
use tokio::io::{AsyncWriteExt, BufReader};
use tokio_util::codec::FramedRead;

const NORTH_EAST: &str = "11150C151515150254FA0006EBE740112F054E74";

fn wire(cmd: u8, device: &str) -> Vec<u8> {
    let content = hex::decode(NORTH_EAST).unwrap();
    Frame::new(cmd, [0x5A; TOKEN_LEN], device.as_bytes(), &content)
        .to_bytes()
        .unwrap()
        .to_vec()
}

#[tokio::test]
async fn back_to_back_frames_route_in_order() {
    let mut stream = wire(0x01, "alpha");
    stream.extend(wire(0x02, "beta"));
    stream.extend(wire(0x03, "gamma"));

    let mut frames = FramedRead::new(BufReader::with_capacity(9, &stream[..]), ZyFrameCodec);
    let mut seen = Vec::new();
    while let Some(bytes) = frames.next().await {
        let frame = Frame::parse(&bytes.unwrap()).unwrap();
        let report = route(&frame, Utc::now()).unwrap();
        seen.push((report.device_id, report.command));
    }
    assert_eq!(
        seen,
        vec![
            ("alpha".to_owned(), Command::Location),
            ("beta".to_owned(), Command::Status),
            ("gamma".to_owned(), Command::Alert),
        ]
    );
}

#[tokio::test]
async fn frames_split_over_a_pipe_are_reassembled() {
    let (mut writer, reader) = tokio::io::duplex(8);
    let payload = wire(0x01, "split-device");
    let sender = tokio::spawn(async move {
        for chunk in payload.chunks(5) {
            writer.write_all(chunk).await.unwrap();
        }
    });

    let mut frames = FramedRead::new(reader, ZyFrameCodec);
    let bytes = frames.next().await.unwrap().unwrap();
    sender.await.unwrap();
    let frame = Frame::parse(&bytes).unwrap();
    assert_eq!(frame.msg_id, b"split-device");
    assert_eq!(
        ContentRecord::decode(&frame.content).unwrap(),
        ContentRecord::decode_hex(NORTH_EAST).unwrap()
    );
    assert!(frames.next().await.is_none());
}

#[tokio::test]
async fn truncated_tail_surfaces_as_bounds_error() {
    let mut stream = wire(0x01, "alpha");
    let partial = wire(0x01, "beta");
    stream.extend_from_slice(&partial[..27]);

    let mut frames = FramedRead::new(&stream[..], ZyFrameCodec);
    let first = frames.next().await.unwrap().unwrap();
    assert!(Frame::parse(&first).is_ok());

    let tail = frames.next().await.unwrap().unwrap();
    assert_eq!(tail.len(), 27);
    assert!(matches!(
        Frame::parse(&tail),
        Err(FrameError::TooShort { len: 27 })
    ));
    assert!(frames.next().await.is_none());
}
