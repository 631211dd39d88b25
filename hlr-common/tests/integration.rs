//! Integration tests for hlr-common library.

use hlr_common::{
    Format, InterlockPayload, Payload, Reading, SensorKind, TongdyPayload, decode, decode_auto,
    encode,
};

#[test]
fn test_full_reading_workflow() {
    // Create an interlock reading
    let reading = Reading::new(
        "interlock_4c",
        Payload::Interlock(InterlockPayload {
            temp_before_filter: Some(30.0),
            fan_speed: Some(50.0),
            temperature: Some(25.0),
            humid: Some(45.0),
            co2: Some(800),
            voc: Some(12.0),
            operation_mode: Some(2),
        }),
    );

    // Encode as JSON
    let json_bytes = encode(&reading, Format::Json).expect("JSON encode failed");
    assert!(!json_bytes.is_empty());

    // Decode from JSON
    let decoded: Reading = decode(&json_bytes, Format::Json).expect("JSON decode failed");
    assert_eq!(decoded.sensor_id, "interlock_4c");
    assert_eq!(decoded.kind(), SensorKind::Interlock);
    assert_eq!(decoded, reading);

    // Encode as CBOR
    let cbor_bytes = encode(&reading, Format::Cbor).expect("CBOR encode failed");
    assert!(!cbor_bytes.is_empty());
    assert!(
        cbor_bytes.len() < json_bytes.len(),
        "CBOR should be smaller than JSON"
    );

    // Auto-decode CBOR
    let auto_decoded: Reading = decode_auto(&cbor_bytes).expect("Auto decode failed");
    assert_eq!(auto_decoded, reading);
}

#[test]
fn test_degraded_readings_for_all_kinds() {
    let cases = [
        (SensorKind::Interlock, 7),
        (SensorKind::Tongdy, 3),
    ];

    for (kind, field_count) in cases {
        let reading = Reading::degraded("sensor01", kind);
        assert!(reading.is_degraded());
        assert_eq!(reading.kind(), kind);

        // Roundtrip must preserve the all-null payload
        let encoded = encode(&reading, Format::Json).unwrap();
        let decoded: Reading = decode(&encoded, Format::Json).unwrap();
        assert!(decoded.is_degraded());

        // Every payload key present and null
        let value = serde_json::to_value(&decoded).unwrap();
        let payload = value["payload"].as_object().unwrap();
        assert_eq!(payload.len(), field_count);
        assert!(payload.values().all(|v| v.is_null()));
    }
}

#[test]
fn test_sensor_type_tags_on_the_wire() {
    let interlock = Reading::degraded("a", SensorKind::Interlock);
    let tongdy = Reading::new(
        "b",
        Payload::Tongdy(TongdyPayload {
            temperature: Some(24.5),
            humid: Some(55.0),
            co2: Some(600),
        }),
    );

    let interlock_json = serde_json::to_value(&interlock).unwrap();
    let tongdy_json = serde_json::to_value(&tongdy).unwrap();

    assert_eq!(interlock_json["sensor_type"], "interlock");
    assert_eq!(tongdy_json["sensor_type"], "tongdy");
}

#[test]
fn test_mixed_format_auto_decode() {
    let interlock = Reading::degraded("interlock_4c", SensorKind::Interlock);
    let tongdy = Reading::new(
        "before_exhaust",
        Payload::Tongdy(TongdyPayload {
            temperature: Some(21.3),
            humid: Some(48.2),
            co2: Some(715),
        }),
    );

    let json = encode(&interlock, Format::Json).unwrap();
    let cbor = encode(&tongdy, Format::Cbor).unwrap();

    let from_json: Reading = decode_auto(&json).expect("JSON auto decode failed");
    let from_cbor: Reading = decode_auto(&cbor).expect("CBOR auto decode failed");

    assert_eq!(from_json.kind(), SensorKind::Interlock);
    assert_eq!(from_cbor.kind(), SensorKind::Tongdy);
    assert_eq!(from_cbor, tongdy);
}

#[test]
fn test_decode_rejects_unknown_sensor_type() {
    let json = br#"{ "sensor_id": "x", "sensor_type": "acme", "payload": {} }"#;
    let result: hlr_common::Result<Reading> = decode(json, Format::Json);
    assert!(result.is_err());
}
