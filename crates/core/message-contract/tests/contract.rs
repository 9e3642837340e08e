use domain::SensorReading;
use message_contract::{DecodeError, EncodeError, MeasurementMessage};
use serde_json::Value;

const T1: &str = "2021-03-17T10:00:00.123456Z";
const T2: &str = "2021-03-17T10:00:00.654321Z";

fn sample_message() -> MeasurementMessage {
    MeasurementMessage::new(
        SensorReading::climate("564ac640bedb", T1, 21.7, 1013.0, 45.0),
        SensorReading::temperature_only("0316a2795fff", T2, 19.3),
    )
}

#[test]
fn encoded_message_keeps_fixed_key_order() {
    let payload = sample_message().encode().expect("encode");
    let text = String::from_utf8(payload.clone()).expect("utf8");

    let keys = vec![
        "\"bme280id\"".to_string(),
        format!("\"{}\"", T1),
        "\"ds18b2id\"".to_string(),
        format!("\"{}\"", T2),
    ];
    let positions: Vec<usize> = keys
        .iter()
        .map(|key| text.find(key.as_str()).expect("key present"))
        .collect();
    assert!(positions.windows(2).all(|pair| pair[0] < pair[1]));

    let value: Value = serde_json::from_slice(&payload).expect("json");
    assert_eq!(value.as_object().expect("object").len(), 4);
}

#[test]
fn end_to_end_sample_decodes_by_position() {
    let payload = sample_message().encode().expect("encode");
    let decoded = MeasurementMessage::decode(&payload).expect("decode");

    assert_eq!(decoded.climate.source_id, "564ac640bedb");
    assert_eq!(decoded.climate.timestamp, T1);
    assert_eq!(decoded.climate.temperature_c, 21.7);
    assert_eq!(decoded.climate.pressure_hpa, Some(1013.0));
    assert_eq!(decoded.climate.humidity_rh, Some(45.0));
    assert_eq!(decoded.probe.source_id, "0316a2795fff");
    assert_eq!(decoded.probe.timestamp, T2);
    assert_eq!(decoded.probe.temperature_c, 19.3);
    assert!(decoded.probe.pressure_hpa.is_none());
    assert!(decoded.probe.humidity_rh.is_none());
}

#[test]
fn round_trip_preserves_awkward_doubles() {
    let message = MeasurementMessage::new(
        SensorReading::climate("a", T1, 0.1 + 0.2, 1013.2500000000001, 1e-300),
        SensorReading::temperature_only("b", T2, -17.777777777777779),
    );
    let decoded = MeasurementMessage::decode(&message.encode().expect("encode")).expect("decode");
    assert_eq!(decoded, message);
}

#[test]
fn absent_quantities_are_omitted_not_null() {
    let payload = sample_message().encode().expect("encode");
    let value: Value = serde_json::from_slice(&payload).expect("json");
    let probe = value.get(T2).expect("probe record");

    assert!(probe.get("temperature").is_some());
    assert!(probe.get("pressure").is_none());
    assert!(probe.get("humidity").is_none());
    assert_eq!(probe["temperature"]["unit"], "C");
    assert_eq!(value[T1]["pressure"]["unit"], "hPa");
    assert_eq!(value[T1]["humidity"]["unit"], "rH");
}

#[test]
fn non_finite_values_are_rejected() {
    let message = MeasurementMessage::new(
        SensorReading::climate("a", T1, f64::NAN, 1013.0, 45.0),
        SensorReading::temperature_only("b", T2, 19.3),
    );
    let err = message.encode().expect_err("nan");
    assert!(matches!(err, EncodeError::NonFinite { field: "temperature", .. }));
}

#[test]
fn decode_ignores_key_names() {
    let payload = format!(
        r#"{{"first":"s1","{T1}":{{"temperature":{{"value":1.5,"unit":"C"}}}},"second":"s2","{T2}":{{"temperature":{{"value":2.5,"unit":"C"}}}}}}"#
    );
    let decoded = MeasurementMessage::decode(payload.as_bytes()).expect("decode");
    assert_eq!(decoded.climate.source_id, "s1");
    assert_eq!(decoded.probe.source_id, "s2");
    assert_eq!(decoded.probe.temperature_c, 2.5);
}

#[test]
fn decode_reports_missing_fourth_entry() {
    let payload = format!(
        r#"{{"bme280id":"s1","{T1}":{{"temperature":{{"value":1.5,"unit":"C"}}}},"ds18b2id":"s2"}}"#
    );
    let err = MeasurementMessage::decode(payload.as_bytes()).expect_err("missing");
    assert!(matches!(err, DecodeError::MissingEntry(3)));
}

#[test]
fn decode_reports_missing_second_entry() {
    let err = MeasurementMessage::decode(br#"{"bme280id":"s1"}"#).expect_err("missing");
    assert!(matches!(err, DecodeError::MissingEntry(1)));
}

#[test]
fn decode_rejects_reading_without_temperature() {
    let payload = format!(
        r#"{{"bme280id":"s1","{T1}":{{"pressure":{{"value":1000.0,"unit":"hPa"}}}},"ds18b2id":"s2","{T2}":{{"temperature":{{"value":2.5,"unit":"C"}}}}}}"#
    );
    let err = MeasurementMessage::decode(payload.as_bytes()).expect_err("invalid");
    assert!(matches!(err, DecodeError::InvalidEntry { index: 1, .. }));
}

#[test]
fn decode_rejects_non_json_payload() {
    let err = MeasurementMessage::decode(b"not json").expect_err("invalid");
    assert!(matches!(err, DecodeError::Json(_)));
}
