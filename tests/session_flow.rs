use std::collections::VecDeque;
use std::net::TcpListener;
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use l2server::catalog;
use l2server::protocol::metrics_snapshot;
use l2server::session::{CorrelationState, Reassembler, Segment, segment};
use l2server::{
    Client, ErrorClass, Message, Record, Sapi, ServerErrorCode, SessionConfig, SessionError,
    StreamTransport, Transport, TransportError, TypeCode, encode_record,
};

fn cell_config(l1_len: usize) -> Record {
    Record::new()
        .with("CellId", 1u32)
        .with("RaInfoValid", 0u8)
        .with("RachProbeReq", 0u8)
        .with("CellCfg", Record::new().with("ServCellIdx", 0u32))
        .with("L1Data", Bytes::from(vec![0x5A; l1_len]))
}

fn create_ue(ue_id: u32) -> Record {
    Record::new()
        .with("UeId", ue_id)
        .with("CellId", 1u32)
        .with("UeFlags", 0u32)
}

fn reply(sapi: Sapi, type_code: TypeCode, payload: Vec<u8>) -> Message {
    Message::new(sapi, type_code, payload).unwrap()
}

#[test]
fn login_nak_and_segmented_config_over_tcp() {
    // fixed part of CELL_CONFIG is 24 bytes; total payload is 30000
    let l1_len = 30_000 - 24;

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let server = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut peer = StreamTransport::new(stream);

        let login = peer.recv_frame().unwrap();
        assert_eq!(login.type_code(), catalog::LOGIN);
        assert_eq!(login.payload().len(), 40);
        assert_eq!(&login.payload()[..4], b"abc\0");
        peer.send_frame(&reply(Sapi::OM, catalog::LOGIN.ack(), Vec::new()))
            .unwrap();

        let create = peer.recv_frame().unwrap();
        assert_eq!(create.type_code(), catalog::CREATE_UE);
        let mut nak = 5u32.to_le_bytes().to_vec();
        nak.extend_from_slice(&(-8i16).to_le_bytes());
        peer.send_frame(&reply(Sapi::OM, catalog::CREATE_UE.nak(), nak))
            .unwrap();

        let header = segment::header_schema().unwrap();
        let counter_offset = catalog::cell_config()
            .unwrap()
            .fixed_offset("SegCnt")
            .unwrap();
        let mut reassembler = Reassembler::new();
        let mut types = Vec::new();
        let mut counters = Vec::new();
        let payload = loop {
            let frame = peer.recv_frame().unwrap();
            types.push(frame.type_code());
            let segment = if reassembler.in_progress() {
                let (id, segment) = Segment::decode_trailing(&header, frame.payload()).unwrap();
                assert_eq!(id, 1);
                segment
            } else {
                Segment::initial(frame.payload(), counter_offset).unwrap()
            };
            counters.push(segment.remaining);
            if let Some(payload) = reassembler.push(segment).unwrap() {
                break payload;
            }
        };
        peer.send_frame(&reply(
            Sapi::OM,
            catalog::CELL_CONFIG.ack(),
            1u32.to_le_bytes().to_vec(),
        ))
        .unwrap();

        (types, counters, payload)
    });

    let config = SessionConfig::default().with_client_name("abc");
    let transport = StreamTransport::connect(addr, &config).unwrap();
    let registry = Arc::new(catalog::default_registry().unwrap());
    let mut client = Client::new(transport, registry, config).unwrap();

    let ack = client.login().unwrap();
    assert!(ack.raw.is_empty());
    assert_eq!(client.state(), CorrelationState::Idle);

    let err = client
        .request(Sapi::OM, catalog::CREATE_UE, &create_ue(5))
        .unwrap_err();
    assert_eq!(err.class(), ErrorClass::RequestLocal);
    assert_eq!(err.server_code(), Some(ServerErrorCode::new(-8)));
    assert!(matches!(err, SessionError::Nak { info, .. } if info.id == 5));
    assert_eq!(client.state(), CorrelationState::Idle);

    let record = cell_config(l1_len);
    let ack = client
        .request(Sapi::OM, catalog::CELL_CONFIG, &record)
        .unwrap();
    assert_eq!(ack.body.get_u64("Id"), Some(1));

    let (types, counters, payload) = server.join().unwrap();
    assert_eq!(
        types,
        vec![catalog::CELL_CONFIG, l2server::session::CONTINUATION_TYPE]
    );
    assert_eq!(counters, vec![1, 0]);
    assert_eq!(payload.len(), 30_000);

    let schema = client
        .registry()
        .lookup(Sapi::OM, catalog::CELL_CONFIG)
        .unwrap()
        .request()
        .clone();
    let expected = encode_record(&schema, &record.with("SegCnt", 1u8)).unwrap();
    assert_eq!(payload, expected);
    assert!(metrics_snapshot().segments_sent >= 2);
}

#[test]
fn missing_reply_times_out_and_fails_session() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let (done_tx, done_rx) = mpsc::channel::<()>();
    let server = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut peer = StreamTransport::new(stream);
        peer.recv_frame().unwrap();
        // hold the connection open without answering
        done_rx.recv().ok();
    });

    let config = SessionConfig::default().with_response_timeout(Some(Duration::from_millis(100)));
    let transport = StreamTransport::connect(addr, &config).unwrap();
    let registry = Arc::new(catalog::default_registry().unwrap());
    let mut client = Client::new(transport, registry, config).unwrap();

    let err = client.login().unwrap_err();
    assert!(matches!(
        err,
        SessionError::Transport(TransportError::TimedOut)
    ));
    assert_eq!(err.class(), ErrorClass::TransportFatal);
    assert_eq!(client.state(), CorrelationState::Failed);

    done_tx.send(()).unwrap();
    server.join().unwrap();
}

/// Transport that records writes and plays back canned replies
#[derive(Default)]
struct Scripted {
    sent: Vec<Message>,
    replies: VecDeque<Message>,
}

impl Transport for Scripted {
    fn send_frame(&mut self, message: &Message) -> Result<(), TransportError> {
        self.sent.push(message.clone());
        Ok(())
    }

    fn recv_frame(&mut self) -> Result<Message, TransportError> {
        self.replies.pop_front().ok_or(TransportError::Closed)
    }
}

#[test]
fn mismatched_ack_is_fatal() {
    let mut transport = Scripted::default();
    transport.replies.push_back(reply(
        Sapi::OM,
        catalog::DELETE_UE.ack(),
        5u32.to_le_bytes().to_vec(),
    ));
    let registry = Arc::new(catalog::default_registry().unwrap());
    let mut client = Client::new(transport, registry, SessionConfig::default()).unwrap();

    client
        .send(Sapi::OM, catalog::CREATE_UE, &create_ue(5))
        .unwrap();
    let err = client.receive().unwrap_err();
    assert_eq!(err.class(), ErrorClass::ProtocolFatal);
    assert_eq!(client.state(), CorrelationState::Failed);

    let again = client
        .request(Sapi::OM, catalog::DELETE_UE, &Record::new().with("UeId", 5u32))
        .unwrap_err();
    assert!(again.class().is_fatal());
    assert_eq!(client.transport().sent.len(), 1);
}

#[test]
fn second_command_waits_for_ack_without_writing() {
    let registry = Arc::new(catalog::default_registry().unwrap());
    let mut client = Client::new(Scripted::default(), registry, SessionConfig::default()).unwrap();

    client
        .send(Sapi::OM, catalog::CREATE_UE, &create_ue(1))
        .unwrap();
    let err = client
        .send(Sapi::OM, catalog::CREATE_UE, &create_ue(2))
        .unwrap_err();
    assert_eq!(err.class(), ErrorClass::RequestLocal);
    assert_eq!(client.transport().sent.len(), 1);
    assert!(matches!(
        client.state(),
        CorrelationState::AwaitingResponse { command, .. } if command == catalog::CREATE_UE
    ));
}

#[test]
fn small_segmentable_command_is_sent_as_the_plain_struct() {
    let registry = Arc::new(catalog::default_registry().unwrap());
    let mut client = Client::new(Scripted::default(), registry, SessionConfig::default()).unwrap();

    client
        .send(Sapi::OM, catalog::CELL_CONFIG, &cell_config(10))
        .unwrap();
    let sent = &client.transport().sent;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].type_code(), catalog::CELL_CONFIG);
    // Spare = -1 then CellId = 1, with no header in front
    assert_eq!(
        &sent[0].payload()[..8],
        &[0xFF, 0xFF, 0xFF, 0xFF, 1, 0, 0, 0]
    );
    assert_eq!(sent[0].payload().len(), 24 + 10);
}
