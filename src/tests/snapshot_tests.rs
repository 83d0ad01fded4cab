use crate::snapshot::blake3::{state_digest, to_hex};
use crate::snapshot::{Snapshot, SnapshotFormat};
use crate::error::KernelError;
use alloc::collections::BTreeMap;
use alloc::string::String;

fn sample_state() -> BTreeMap<String, u64> {
    let mut state = BTreeMap::new();
    state.insert(String::from("count"), 7);
    state.insert(String::from("visits"), 3);
    state
}

#[test]
fn test_state_restores_in_both_formats() {
    let state = sample_state();

    for format in [SnapshotFormat::Json, SnapshotFormat::Binary] {
        let snapshot = Snapshot {
            sequence: 5,
            timestamp_ms: 0,
            format,
            state: format.encode(&state).unwrap(),
        };
        let restored: BTreeMap<String, u64> = snapshot.decode_state().unwrap();
        assert_eq!(restored, state, "format {} must restore state", format);
    }
}

#[test]
fn test_json_snapshot_is_readable() {
    let bytes = SnapshotFormat::Json.encode(&sample_state()).unwrap();
    assert_eq!(bytes, br#"{"count":7,"visits":3}"#.to_vec());
}

#[test]
fn test_binary_rejects_trailing_bytes() {
    let mut bytes = SnapshotFormat::Binary.encode(&sample_state()).unwrap();
    bytes.push(0);
    let result = SnapshotFormat::Binary.decode::<BTreeMap<String, u64>>(&bytes);
    assert!(matches!(result, Err(KernelError::Decode(_))));
}

#[test]
fn test_format_tags_and_names() {
    for format in [SnapshotFormat::Json, SnapshotFormat::Binary] {
        assert_eq!(SnapshotFormat::from_tag(format.tag()), Some(format));
        assert_eq!(format.name().parse::<SnapshotFormat>().unwrap(), format);
    }
    assert_eq!(SnapshotFormat::from_tag(0), None);
    assert!("yaml".parse::<SnapshotFormat>().is_err());
}

#[test]
fn test_digest_ignores_format_and_tracks_content() {
    let state = sample_state();
    let d1 = state_digest(&state).unwrap();
    let d2 = state_digest(&state.clone()).unwrap();
    assert_eq!(d1, d2);

    let mut changed = state.clone();
    changed.insert(String::from("count"), 8);
    assert_ne!(d1, state_digest(&changed).unwrap());

    assert_eq!(to_hex(&[0x00, 0xab, 0x10]), "00ab10");
}
