//! Codec Tests
//!
//! Tests for command and response framing, and for mapping errors to wire
//! statuses and back.

use std::io::Cursor;

use nimbuskv::llist::ElementFilter;
use nimbuskv::protocol::{
    decode_command, decode_reply, decode_response, encode_command, encode_error, encode_reply,
    encode_response, read_command, read_response, write_command, write_response, Command,
    CommandType, Reply, Response, Status, HEADER_SIZE, MAX_PAYLOAD_SIZE,
};
use nimbuskv::{
    Key, NimbusError, Operations, Record, RemovePolicy, Value, ValueType, WritePolicy,
};

fn key() -> Key {
    Key::new("test", "codec", "k")
}

// =============================================================================
// Command Encoding/Decoding Tests
// =============================================================================

#[test]
fn test_encode_decode_ping() {
    let encoded = encode_command(&Command::Ping).unwrap();

    assert_eq!(encoded[0], CommandType::Ping as u8);
    assert_eq!(decode_command(&encoded).unwrap(), Command::Ping);
}

#[test]
fn test_encode_decode_put() {
    let cmd = Command::Put {
        key: key(),
        record: Record::new()
            .with_bin("a", 123)
            .with_bin("b", "abc")
            .with_bin("c", vec![0u8, 255])
            .with_ttl(60),
        policy: WritePolicy::new().generation_eq(3).send_key(),
    };

    let encoded = encode_command(&cmd).unwrap();
    let decoded = decode_command(&encoded).unwrap();

    assert_eq!(decoded, cmd);
}

#[test]
fn test_decoded_key_has_same_digest() {
    let key = Key::new("test", "codec", 77i64);
    let cmd = Command::Exists { key: key.clone() };

    let decoded = decode_command(&encode_command(&cmd).unwrap()).unwrap();

    match decoded {
        Command::Exists { key: decoded_key } => {
            assert_eq!(decoded_key.digest(), key.digest());
            assert_eq!(decoded_key.namespace(), "test");
        }
        other => panic!("Expected EXISTS command, got {:?}", other),
    }
}

#[test]
fn test_encode_decode_operate() {
    let ops = Operations::new()
        .incr("a", -5)
        .append("b", "x")
        .read("a")
        .touch();
    let cmd = Command::Operate {
        key: key(),
        operations: ops.to_vec(),
        policy: WritePolicy::new(),
    };

    let encoded = encode_command(&cmd).unwrap();

    assert_eq!(encoded[0], 0x06);
    assert_eq!(decode_command(&encoded).unwrap(), cmd);
}

#[test]
fn test_encode_decode_list_filter() {
    let cmd = Command::ListFilter {
        key: key(),
        bin: "items".to_string(),
        filter: Some(ElementFilter::Range {
            min: Some(Value::from(10)),
            max: None,
        }),
    };

    let encoded = encode_command(&cmd).unwrap();

    assert_eq!(encoded[0], 0x14);
    assert_eq!(decode_command(&encoded).unwrap(), cmd);
}

#[test]
fn test_command_type_bytes() {
    let cases = vec![
        (Command::Get { key: key(), bins: None }, 0x01),
        (
            Command::Remove {
                key: key(),
                policy: RemovePolicy::new(),
            },
            0x03,
        ),
        (
            Command::ListAddAll {
                key: key(),
                bin: "l".into(),
                values: vec![Value::from(1)],
            },
            0x11,
        ),
        (
            Command::ListDestroy {
                key: key(),
                bin: "l".into(),
            },
            0x17,
        ),
    ];

    for (cmd, byte) in cases {
        assert_eq!(cmd.command_type() as u8, byte);
        assert_eq!(CommandType::from_u8(byte), Some(cmd.command_type()));
        assert_eq!(encode_command(&cmd).unwrap()[0], byte);
    }
}

// =============================================================================
// Malformed Input Tests
// =============================================================================

#[test]
fn test_incomplete_header() {
    let bytes = [0x01, 0x00, 0x00]; // Only 3 bytes, need 5
    let result = decode_command(&bytes);
    assert!(result.unwrap_err().to_string().contains("Incomplete"));
}

#[test]
fn test_incomplete_payload() {
    // Header says 10 bytes payload, but only 5 provided
    let bytes = [0x04, 0x00, 0x00, 0x00, 0x0A, 0x03, 0x00, 0x00, 0x00, 0x00];
    let result = decode_command(&bytes);
    assert!(result.unwrap_err().to_string().contains("Incomplete"));
}

#[test]
fn test_unknown_command_type() {
    let bytes = [0xFF, 0x00, 0x00, 0x00, 0x00];
    let result = decode_command(&bytes);
    assert!(result
        .unwrap_err()
        .to_string()
        .contains("Unknown command type"));
}

#[test]
fn test_unknown_response_status() {
    let bytes = [0xFF, 0x00, 0x00, 0x00, 0x00];
    let result = decode_response(&bytes);
    assert!(result
        .unwrap_err()
        .to_string()
        .contains("Unknown response status"));
}

#[test]
fn test_header_disagrees_with_payload() {
    let mut encoded = encode_command(&Command::Ping).unwrap();
    encoded[0] = CommandType::Get as u8;

    let err = decode_command(&encoded).unwrap_err();

    assert!(matches!(err, NimbusError::Protocol(_)));
    assert!(err.to_string().contains("mismatch"));
}

#[test]
fn test_garbage_payload() {
    let bytes = [0x01, 0x00, 0x00, 0x00, 0x02, 0xFF, 0xFF];
    let err = decode_command(&bytes).unwrap_err();
    assert!(matches!(err, NimbusError::Serialization(_)));
}

#[test]
fn test_oversized_length_is_rejected_before_reading() {
    let len = (MAX_PAYLOAD_SIZE + 1).to_be_bytes();
    let bytes = [0x04, len[0], len[1], len[2], len[3]];

    let err = read_command(&mut Cursor::new(bytes.to_vec())).unwrap_err();

    assert!(matches!(err, NimbusError::Protocol(_)));
    assert!(err.to_string().contains("too large"));
}

#[test]
fn test_oversized_response_payload_is_not_encoded() {
    let resp = Response::ok(Some(vec![0u8; MAX_PAYLOAD_SIZE as usize + 1]));

    assert!(matches!(
        encode_response(&resp),
        Err(NimbusError::Protocol(_))
    ));
}

// =============================================================================
// Reply / Error Mapping Tests
// =============================================================================

#[test]
fn test_reply_round_trip() {
    let record = Record::new().with_bin("a", 1).with_bin("b", "two");
    let replies = vec![
        Reply::Pong,
        Reply::Done,
        Reply::Generation(7),
        Reply::Record(record.clone()),
        Reply::Operated(Some(record)),
        Reply::Operated(None),
        Reply::Size(3),
        Reply::Values(vec![Value::from(1), Value::from(2)]),
        Reply::Flag(true),
    ];

    for reply in replies {
        let response = encode_reply(&reply).unwrap();
        assert_eq!(response.status, Status::Ok);
        assert_eq!(decode_reply(response).unwrap(), reply);
    }
}

#[test]
fn test_record_not_found_has_no_payload() {
    let response = encode_error(&NimbusError::RecordNotFound);

    assert_eq!(response.status, Status::RecordNotFound);
    assert_eq!(response.payload, None);
    assert!(matches!(
        decode_reply(response),
        Err(NimbusError::RecordNotFound)
    ));
}

#[test]
fn test_generation_mismatch_keeps_fields() {
    let response = encode_error(&NimbusError::RecordGenerationMismatch {
        expected: 2,
        actual: 5,
    });

    assert_eq!(response.status, Status::GenerationMismatch);
    assert!(matches!(
        decode_reply(response),
        Err(NimbusError::RecordGenerationMismatch {
            expected: 2,
            actual: 5
        })
    ));
}

#[test]
fn test_bin_errors_keep_fields() {
    let response = encode_error(&NimbusError::BinTypeMismatch {
        bin: "items".into(),
        expected: ValueType::Integer,
        found: ValueType::String,
    });
    assert_eq!(response.status as u8, 0x0C);
    assert!(matches!(
        decode_reply(response),
        Err(NimbusError::BinTypeMismatch {
            ref bin,
            expected: ValueType::Integer,
            found: ValueType::String,
        }) if bin == "items"
    ));

    let response = encode_error(&NimbusError::BinNotFound { bin: "l".into() });
    assert_eq!(response.status as u8, 0x11);
    assert!(matches!(
        decode_reply(response),
        Err(NimbusError::BinNotFound { ref bin }) if bin == "l"
    ));

    let response = encode_error(&NimbusError::ElementNotFound { bin: "l".into() });
    assert_eq!(response.status as u8, 0x7D);
    assert!(matches!(
        decode_reply(response),
        Err(NimbusError::ElementNotFound { ref bin }) if bin == "l"
    ));
}

#[test]
fn test_request_errors_keep_message() {
    let response = encode_error(&NimbusError::NamespaceNotFound("bar".into()));
    assert_eq!(response.status, Status::NamespaceNotFound);
    assert!(matches!(
        decode_reply(response),
        Err(NimbusError::NamespaceNotFound(ref ns)) if ns == "bar"
    ));

    let response = encode_error(&NimbusError::Parameter("bad bin".into()));
    assert_eq!(response.status, Status::Parameter);
    assert!(matches!(
        decode_reply(response),
        Err(NimbusError::Parameter(ref msg)) if msg == "bad bin"
    ));
}

#[test]
fn test_other_errors_become_server_error() {
    let io = std::io::Error::new(std::io::ErrorKind::Other, "disk on fire");
    let response = encode_error(&NimbusError::Io(io));

    assert_eq!(response.status, Status::ServerError);
    match decode_reply(response) {
        Err(NimbusError::Server(msg)) => assert!(msg.contains("disk on fire")),
        other => panic!("Expected server error, got {:?}", other),
    }
}

// =============================================================================
// Stream I/O Tests
// =============================================================================

#[test]
fn test_stream_multiple_commands() {
    let commands = vec![
        Command::Ping,
        Command::Put {
            key: key(),
            record: Record::new().with_bin("v", 1),
            policy: WritePolicy::new(),
        },
        Command::Get {
            key: key(),
            bins: Some(vec!["v".into()]),
        },
        Command::ListSize {
            key: key(),
            bin: "l".into(),
        },
    ];

    let mut buffer = Vec::new();
    for cmd in &commands {
        write_command(&mut buffer, cmd).unwrap();
    }

    let mut cursor = Cursor::new(buffer);
    for expected in &commands {
        assert_eq!(&read_command(&mut cursor).unwrap(), expected);
    }
}

#[test]
fn test_stream_multiple_responses() {
    let responses = vec![
        encode_reply(&Reply::Size(4)).unwrap(),
        Response::not_found(),
        encode_error(&NimbusError::Parameter("oops".into())),
        Response::ok(None),
    ];

    let mut buffer = Vec::new();
    for resp in &responses {
        write_response(&mut buffer, resp).unwrap();
    }

    let mut cursor = Cursor::new(buffer);
    for expected in &responses {
        assert_eq!(&read_response(&mut cursor).unwrap(), expected);
    }
}

#[test]
fn test_stream_eof_is_io_error() {
    let mut cursor = Cursor::new(Vec::new());

    let err = read_command(&mut cursor).unwrap_err();

    assert!(matches!(err, NimbusError::Io(ref e) if e.kind() == std::io::ErrorKind::UnexpectedEof));
}

// =============================================================================
// Wire Format Verification Tests
// =============================================================================

#[test]
fn test_wire_format_response_header() {
    let resp = Response::ok(Some(b"hi".to_vec()));
    let encoded = encode_response(&resp).unwrap();

    // [status][payload_len BE][payload]
    assert_eq!(encoded.len(), HEADER_SIZE + 2);
    assert_eq!(encoded[0], 0x00);
    assert_eq!(&encoded[1..5], &[0x00, 0x00, 0x00, 0x02]);
    assert_eq!(&encoded[5..7], b"hi");
}

#[test]
fn test_wire_format_length_matches_payload() {
    let cmd = Command::ListAdd {
        key: key(),
        bin: "items".into(),
        value: Value::from("element"),
    };
    let encoded = encode_command(&cmd).unwrap();

    let len = u32::from_be_bytes([encoded[1], encoded[2], encoded[3], encoded[4]]) as usize;
    assert_eq!(encoded.len(), HEADER_SIZE + len);
    assert_eq!(encoded[0], 0x10);
}
