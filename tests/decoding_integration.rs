//! ---
//! gt_section: "06-testing"
//! gt_subsection: "integration-tests"
//! gt_type: "source"
//! gt_scope: "code"
//! gt_description: "Integration and validation tests for the Geotrack stack."
//! gt_version: "v0.1.0"
//! gt_owner: "tbd"
//! ---
use chrono::Utc;
use geotrack_codec::{
    decode_message, geo_location_schema, geo_sample_payloads, FieldValue, GeoSample,
};
use geotrack_zy::{process_json, route, Command, ContentRecord, Frame, TOKEN_LEN};
use serde_json::{json, Value};

#[test]
fn persisted_preset_decodes_generated_track() {
    // stored the way the configuration service keeps it: a JSON string of JSON
    let stored = Value::String(geo_location_schema().to_json().unwrap()).to_string();
    let payloads = geo_sample_payloads(10, 1_700_000_000);

    for (index, payload) in payloads.iter().enumerate() {
        let result = decode_message(&stored, payload).unwrap();
        assert!(result.success, "{:?}", result.error);
        let expected = GeoSample::nth(index, 1_700_000_000);
        assert_eq!(
            result.field("device_id").and_then(FieldValue::as_str),
            Some(expected.device_id.as_str())
        );
        assert_eq!(result.field("speed"), Some(&FieldValue::F32(expected.speed)));
        assert_eq!(result.field("altitude"), Some(&FieldValue::F32(expected.altitude)));
    }
}

#[test]
fn little_endian_uint16_checksum_over_header_and_body() {
    let schema = json!({
        "header": [{"name": "kind", "type": "uint8", "offset": 0, "length": 1}],
        "body": [
            {"name": "reading", "type": "uint16", "offset": 1, "length": 2},
            {"name": "scale", "type": "float32", "offset": 3, "length": 4, "decimals": 2}
        ],
        "checksum": {"name": "sum", "type": "uint16", "offset": 7, "length": 2},
        "encoding": "hex"
    })
    .to_string();

    let mut bytes = vec![0xFF];
    bytes.extend_from_slice(&0x1234u16.to_le_bytes());
    bytes.extend_from_slice(&1.239f32.to_le_bytes());
    let sum: u16 = bytes.iter().map(|b| u16::from(*b)).sum();
    bytes.extend_from_slice(&sum.to_le_bytes());

    let result = decode_message(&schema, &hex::encode(&bytes)).unwrap();
    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.field("reading"), Some(&FieldValue::U16(0x1234)));
    let scale = result.field("scale").and_then(FieldValue::as_f64).unwrap();
    assert!((scale - 1.23).abs() < 1e-6);
    assert_eq!(result.field("sum"), Some(&FieldValue::U16(sum)));

    let last = bytes.len() - 1;
    bytes[last] ^= 0x01;
    let tampered = decode_message(&schema, &hex::encode(&bytes)).unwrap();
    assert!(!tampered.success);
    assert_eq!(tampered.fields.len(), 4);
}

#[test]
fn frame_and_forward_paths_agree_on_content() {
    let hex_content = "11150C151515150254FA0006EBE740112F054E74";
    let content = hex::decode(hex_content).unwrap();
    let bytes = Frame::new(0x01, [0; TOKEN_LEN], b"unit-3", &content)
        .to_bytes()
        .unwrap();

    let frame = Frame::parse(&bytes).unwrap();
    let report = route(&frame, Utc::now()).unwrap();
    assert_eq!(report.command, Command::Location);

    let outcome = process_json(
        &json!({
            "supplier": "zy",
            "totalLen": bytes.len(),
            "cmdCode": "01",
            "dataCount": 1,
            "content": hex_content
        })
        .to_string(),
    );
    assert_eq!(outcome.response.result, "success");
    assert_eq!(outcome.records, vec![report.record.clone()]);
    assert_eq!(report.record, ContentRecord::decode_hex(hex_content).unwrap());
}
