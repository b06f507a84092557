
use exhume_mft::DecodedEntry;
use exhume_mft::header::FixupStatus;
use exhume_mft::projection::{CSV_HEADER, body_lines, csv_summary_row};
use fixtures::*;
use md5::{Digest, Md5};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

fn sample() -> DecodedEntry {
    let attrs = vec![
        resident(0x10, 0, &standard_information_value(KNOWN_FILETIME)),
        resident(0x30, 1, &file_name_value("notes.txt", 5, KNOWN_FILETIME)),
        resident(0x80, 2, b"payload"),
    ];
    DecodedEntry::from_bytes(&entry(&attrs)).unwrap()
}

#[test]
fn json_lists_every_known_type() {
    let json = sample().to_json(64);
    let attributes = json["attributes"].as_object().unwrap();
    for key in [
        "standard_information",
        "attribute_list",
        "file_name",
        "object_id",
        "security_descriptor",
        "volume_name",
        "volume_information",
        "data",
        "index_root",
        "index_allocation",
    ] {
        assert!(attributes.contains_key(key), "missing {}", key);
    }
    assert_eq!(attributes["object_id"], Value::Null);
    assert_eq!(attributes["standard_information"].as_array().unwrap().len(), 1);
    assert_eq!(attributes["data"][0]["body"], Value::Null);
    assert_eq!(json["failures"], json!([]));
    assert_eq!(json["fixups"], json!("not_present"));
}

#[test]
fn json_carries_header_and_timestamps() {
    let json = sample().to_json(64);
    assert_eq!(json["record_index"], json!(64));
    assert_eq!(json["header"]["magic"], json!("FILE"));
    assert_eq!(json["header"]["signature"], json!("FILE"));
    assert_eq!(json["header"]["usa_offset"], json!(48));
    assert_eq!(json["header"]["usa_count"], json!(0));
    assert_eq!(json["header"]["record_number"], json!(64));
    assert_eq!(json["header"]["flags"]["active"], json!(true));

    let si = &json["attributes"]["standard_information"][0]["body"];
    assert_eq!(si["created"], json!(KNOWN_TEXT));
    assert_eq!(si["file_attributes"], json!(0x20));
    assert_eq!(si["max_versions"], json!(0));
    assert_eq!(si["version_number"], json!(0));
    assert_eq!(si["class_id"], json!(0));

    let fname = &json["attributes"]["file_name"][0]["body"];
    assert_eq!(fname["name"], json!("notes.txt"));
    assert_eq!(fname["namespace"], json!("WIN32"));
    assert_eq!(fname["reparse_value"], json!(0));
    assert_eq!(fname["parent"]["segment_number"], json!(5));
}

#[test]
fn json_marks_invalid_timestamps_and_unknown_types() {
    let mut si = standard_information_value(KNOWN_FILETIME);
    si[0..8].copy_from_slice(&u64::MAX.to_le_bytes());
    let attrs = vec![resident(0x10, 0, &si), resident(0xC0, 1, &[1, 2, 3, 4])];
    let json = DecodedEntry::from_bytes(&entry(&attrs)).unwrap().to_json(0);

    let created = &json["attributes"]["standard_information"][0]["body"]["created"];
    assert_eq!(created, &json!({ "invalid": true, "raw": u64::MAX }));
    assert_eq!(json["attributes"]["unknown_0xC0"].as_array().unwrap().len(), 1);
}

#[test]
fn json_reports_failures() {
    let mut fname = resident(0x30, 1, &file_name_value("x", 5, KNOWN_FILETIME));
    fname[16..20].copy_from_slice(&8u32.to_le_bytes());
    let json = DecodedEntry::from_bytes(&entry(&[fname])).unwrap().to_json(0);
    assert_eq!(json["attributes"]["file_name"], Value::Null);
    assert_eq!(json["failures"][0]["type"], json!("file_name"));
    assert_eq!(json["failures"][0]["offset"], json!(FIRST_ATTRIBUTE_OFFSET));
}

#[test]
fn csv_row_matches_header() {
    let row = csv_summary_row(&sample(), 7, ",");
    let cols: Vec<&str> = row.split(',').collect();
    assert_eq!(cols.len(), CSV_HEADER.len());
    assert_eq!(CSV_HEADER[0], "RecordIndex");
    assert_eq!(cols[0], "7");
    assert_eq!(cols[1], "64");
    assert_eq!(cols[2], "FILE");
    assert_eq!(cols[13], "notes.txt");
    assert_eq!(cols[14], KNOWN_TEXT);
    // SI, AL, FN, OID, SD, VN, VI, DATA, IR, IA
    assert_eq!(&cols[22..], &["1", "0", "1", "0", "0", "0", "0", "1", "0", "0"]);
}

#[test]
fn body_file_has_one_line_per_timestamp_attribute() {
    let entry = sample();
    let lines = body_lines(&entry, 64);
    assert_eq!(lines.len(), 2);
    let expected = "1247546452.540076";
    assert_eq!(
        lines[0],
        format!(
            "{md5}|notes.txt|64|0|0|0|1234|{e}|{e}|{e}|{e}",
            md5 = entry.md5,
            e = expected
        )
    );
    assert!(lines[1].starts_with(&format!("{}|notes.txt ($FILE_NAME)|64|", entry.md5)));
}

#[test]
fn table_view_names_attributes() {
    let text = sample().to_string();
    assert!(text.contains("$STANDARD_INFORMATION"));
    assert!(text.contains("$FILE_NAME"));
    assert!(text.contains("notes.txt"));
    assert!(text.contains(KNOWN_TEXT));
}

#[test]
fn md5_covers_the_raw_record() {
    let attrs = vec![resident(0x30, 0, &file_name_value("a.txt", 5, KNOWN_FILETIME))];
    let raw = entry(&attrs);
    let decoded = DecodedEntry::from_bytes(&raw).unwrap();
    assert_eq!(decoded.md5, hex::encode(Md5::digest(&raw)));
    assert_eq!(decoded.md5.len(), 32);
    assert!(body_lines(&decoded, 0)[0].starts_with(&decoded.md5));

    let zeroed = DecodedEntry::from_bytes(&[0u8; 1024]).unwrap();
    assert_eq!(zeroed.md5, "0f343b0931126a20f133d67c2b018a3b");
}

#[test]
fn md5_is_taken_before_fixups() {
    let mut raw = entry(&[resident(0x10, 0, &standard_information_value(KNOWN_FILETIME))]);
    raw[6..8].copy_from_slice(&3u16.to_le_bytes());
    raw[48..50].copy_from_slice(&[0x05, 0x00]);
    raw[510..512].copy_from_slice(&[0x05, 0x00]);
    raw[1022..1024].copy_from_slice(&[0x05, 0x00]);
    let decoded = DecodedEntry::from_bytes(&raw).unwrap();
    assert_eq!(decoded.fixups, FixupStatus::Applied);
    assert_eq!(decoded.md5, hex::encode(Md5::digest(&raw)));
}

#[test]
fn zeroed_header_is_identified_by_its_position() {
    let mut raw = entry_with_magic(
        b"\0\0\0\0",
        &[
            resident(0x10, 0, &standard_information_value(KNOWN_FILETIME)),
            resident(0x30, 1, &file_name_value("lost.bin", 5, KNOWN_FILETIME)),
        ],
    );
    raw[44..48].copy_from_slice(&0u32.to_le_bytes());
    let decoded = DecodedEntry::from_bytes(&raw).unwrap();
    assert_eq!(decoded.header.record_number, 0);

    let json = decoded.to_json(1337);
    assert_eq!(json["record_index"], json!(1337));
    assert_eq!(json["header"]["signature"], json!("CORRUPT"));
    assert_eq!(json["header"]["record_number"], json!(0));

    let row = csv_summary_row(&decoded, 1337, "|");
    assert!(row.starts_with("1337|0|CORRUPT|"));

    for line in body_lines(&decoded, 1337) {
        assert_eq!(line.split('|').nth(2), Some("1337"));
    }
}
