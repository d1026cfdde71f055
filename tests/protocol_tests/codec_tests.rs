//! Codec Tests
//!
//! Tests for request and response encoding/decoding.

use std::io::Cursor;

use proglog::protocol::{
    decode_request, decode_response, encode_request, encode_response, read_request,
    read_response, write_request, write_response, Request, Response, Status, HEADER_SIZE,
    MAX_PAYLOAD_SIZE,
};
use proglog::LogError;

// =============================================================================
// Request Encoding/Decoding Tests
// =============================================================================

#[test]
fn test_encode_decode_produce() {
    let request = Request::Produce {
        record: b"hello".to_vec(),
    };
    let encoded = encode_request(&request).unwrap();

    assert_eq!(encoded[0], 0x01);
    assert_eq!(&encoded[1..5], &5u32.to_be_bytes());
    assert_eq!(decode_request(&encoded).unwrap(), request);
}

#[test]
fn test_encode_decode_consume() {
    let request = Request::Consume { offset: 42 };
    let encoded = encode_request(&request).unwrap();

    assert_eq!(encoded.len(), HEADER_SIZE + 8);
    assert_eq!(&encoded[HEADER_SIZE..], &42u64.to_be_bytes());
    assert_eq!(decode_request(&encoded).unwrap(), request);
}

#[test]
fn test_encode_decode_offsets_and_ping() {
    for request in [Request::Offsets, Request::Ping] {
        let encoded = encode_request(&request).unwrap();
        assert_eq!(encoded.len(), HEADER_SIZE);
        assert_eq!(decode_request(&encoded).unwrap(), request);
    }
}

#[test]
fn test_encode_decode_empty_record() {
    let request = Request::Produce { record: vec![] };
    let decoded = decode_request(&encode_request(&request).unwrap()).unwrap();

    match decoded {
        Request::Produce { record } => assert!(record.is_empty()),
        _ => panic!("Expected PRODUCE request"),
    }
}

#[test]
fn test_decode_unknown_request_type() {
    let bytes = [0xFF, 0, 0, 0, 0];
    assert!(matches!(decode_request(&bytes), Err(LogError::Protocol(_))));
}

#[test]
fn test_decode_incomplete_header() {
    assert!(matches!(decode_request(&[0x01, 0, 0]), Err(LogError::Protocol(_))));
}

#[test]
fn test_decode_incomplete_payload() {
    let mut bytes = encode_request(&Request::Produce {
        record: b"hello".to_vec(),
    })
    .unwrap();
    bytes.truncate(bytes.len() - 2);
    assert!(matches!(decode_request(&bytes), Err(LogError::Protocol(_))));
}

#[test]
fn test_decode_consume_with_wrong_offset_width() {
    let bytes = [0x02, 0, 0, 0, 4, 0, 0, 0, 1];
    assert!(matches!(decode_request(&bytes), Err(LogError::Protocol(_))));
}

#[test]
fn test_decode_ping_with_payload() {
    let bytes = [0x04, 0, 0, 0, 1, 0xAA];
    assert!(matches!(decode_request(&bytes), Err(LogError::Protocol(_))));
}

#[test]
fn test_decode_payload_too_large() {
    let mut bytes = vec![0x01];
    bytes.extend_from_slice(&(MAX_PAYLOAD_SIZE + 1).to_be_bytes());
    assert!(matches!(decode_request(&bytes), Err(LogError::Protocol(_))));
}

#[test]
fn test_encode_payload_too_large() {
    let request = Request::Produce {
        record: vec![0u8; MAX_PAYLOAD_SIZE as usize + 1],
    };
    assert!(matches!(encode_request(&request), Err(LogError::Protocol(_))));

    let mut sink = Vec::new();
    assert!(write_request(&mut sink, &request).is_err());
    assert!(sink.is_empty());
}

#[test]
fn test_encode_payload_at_limit() {
    let request = Request::Produce {
        record: vec![0u8; MAX_PAYLOAD_SIZE as usize],
    };
    let encoded = encode_request(&request).unwrap();
    assert_eq!(encoded.len(), HEADER_SIZE + MAX_PAYLOAD_SIZE as usize);
}

// =============================================================================
// Response Encoding/Decoding Tests
// =============================================================================

#[test]
fn test_encode_decode_offset_response() {
    let response = Response::offset(7);
    let decoded = decode_response(&encode_response(&response).unwrap()).unwrap();

    assert_eq!(decoded.status, Status::Ok);
    assert_eq!(decoded.as_offset().unwrap(), 7);
}

#[test]
fn test_encode_decode_offsets_response() {
    let encoded = encode_response(&Response::offsets(3, 10)).unwrap();
    let decoded = decode_response(&encoded).unwrap();
    assert_eq!(decoded.as_offsets().unwrap(), (3, 10));
}

#[test]
fn test_encode_decode_error_statuses() {
    let cases = [
        (Response::not_found("gone"), Status::NotFound),
        (Response::error("disk"), Status::Error),
        (Response::fatal("corrupt"), Status::Fatal),
    ];
    for (response, status) in cases {
        let decoded = decode_response(&encode_response(&response).unwrap()).unwrap();
        assert_eq!(decoded.status, status);
        assert_eq!(decoded.payload, response.payload);
    }
}

#[test]
fn test_empty_payload_decodes_as_none() {
    let encoded = encode_response(&Response::record(vec![])).unwrap();
    let decoded = decode_response(&encoded).unwrap();
    assert_eq!(decoded.status, Status::Ok);
    assert_eq!(decoded.payload, None);
}

#[test]
fn test_decode_unknown_status() {
    let bytes = [0x09, 0, 0, 0, 0];
    assert!(matches!(decode_response(&bytes), Err(LogError::Protocol(_))));
}

#[test]
fn test_as_offset_rejects_wrong_width() {
    let response = Response::record(b"abc".to_vec());
    assert!(matches!(response.as_offset(), Err(LogError::Protocol(_))));
}

// =============================================================================
// Error Mapping Tests
// =============================================================================

#[test]
fn test_from_error_maps_statuses() {
    let out_of_range = LogError::OffsetOutOfRange {
        offset: 9,
        lowest: 0,
        next: 3,
    };
    assert_eq!(Response::from_error(&out_of_range).status, Status::NotFound);

    let missing = LogError::NotFound("no entry".to_string());
    assert_eq!(Response::from_error(&missing).status, Status::NotFound);

    let io = LogError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
    let response = Response::from_error(&io);
    assert_eq!(response.status, Status::Error);
    assert!(response.is_retryable());

    let corrupt = LogError::Corruption("bad frame".to_string());
    let response = Response::from_error(&corrupt);
    assert_eq!(response.status, Status::Fatal);
    assert!(!response.is_retryable());

    assert_eq!(Response::from_error(&LogError::Closed).status, Status::Fatal);
}

#[test]
fn test_into_result_restores_error_kind() {
    let err = Response::not_found("offset 9").into_result().unwrap_err();
    assert!(err.is_not_found());

    let err = Response::error("disk").into_result().unwrap_err();
    assert!(err.is_retryable());

    let err = Response::fatal("corrupt").into_result().unwrap_err();
    assert!(!err.is_retryable());
    assert!(!err.is_not_found());

    let ok = Response::record(b"data".to_vec()).into_result().unwrap();
    assert_eq!(ok, Some(b"data".to_vec()));
}

// =============================================================================
// Stream I/O Tests
// =============================================================================

#[test]
fn test_stream_request_sequence() {
    let requests = vec![
        Request::Produce {
            record: b"one".to_vec(),
        },
        Request::Consume { offset: 0 },
        Request::Offsets,
        Request::Ping,
    ];

    let mut buffer = Vec::new();
    for request in &requests {
        write_request(&mut buffer, request).unwrap();
    }

    let mut cursor = Cursor::new(buffer);
    for request in requests {
        assert_eq!(read_request(&mut cursor).unwrap(), request);
    }

    // Nothing left: EOF surfaces as an I/O error
    assert!(matches!(read_request(&mut cursor), Err(LogError::Io(_))));
}

#[test]
fn test_stream_response() {
    let mut buffer = Vec::new();
    write_response(&mut buffer, &Response::record(b"payload".to_vec())).unwrap();

    let response = read_response(&mut Cursor::new(buffer)).unwrap();
    assert_eq!(response.status, Status::Ok);
    assert_eq!(response.payload, Some(b"payload".to_vec()));
}

#[test]
fn test_stream_rejects_oversized_header() {
    let mut bytes = vec![0x01];
    bytes.extend_from_slice(&u32::MAX.to_be_bytes());

    let result = read_request(&mut Cursor::new(bytes));
    assert!(matches!(result, Err(LogError::Protocol(_))));
}
