use std::fs;

use id3::TagLike;
use tempfile::tempdir;

use super::codec::load_tag;
use super::*;
use crate::test_support::{audio_bytes, raw_frame, syncsafe, tagged, txxx, write_file};

fn count_frames(path: &std::path::Path, name: &str) -> usize {
    load_tag(path)
        .unwrap()
        .map(|(_, tag)| tag.extended_texts().filter(|t| t.description == name).count())
        .unwrap_or(0)
}

fn occurrences(haystack: &[u8], needle: &[u8]) -> usize {
    haystack.windows(needle.len()).filter(|w| *w == needle).count()
}

#[test]
fn syncsafe_decodes_reference_values() {
    assert_eq!(decode_syncsafe([0x00, 0x00, 0x0F, 0x76]), 2038);
    assert_eq!(decode_syncsafe([0x00, 0x00, 0x00, 0x00]), 0);
    assert_eq!(decode_syncsafe([0x7f, 0x7f, 0x7f, 0x7f]), 0x0FFF_FFFF);
    assert_eq!(decode_syncsafe(syncsafe(2038)), 2038);
}

#[test]
fn syncsafe_ignores_reserved_high_bit() {
    assert_eq!(decode_syncsafe([0x80, 0x80, 0x8F, 0xF6]), 2038);
}

#[test]
fn checksum_ignores_tag_region() {
    let dir = tempdir().unwrap();
    let audio = audio_bytes(7, 20_000);

    let a = write_file(
        dir.path(),
        "a.mp3",
        &tagged(4, &[txxx(4, "GUID", "one")], 100, &audio),
    );
    let b = write_file(
        dir.path(),
        "b.mp3",
        &tagged(
            3,
            &[txxx(3, "Content", "something else"), txxx(3, "GUID", "two")],
            3000,
            &audio,
        ),
    );
    let bare = write_file(dir.path(), "c.mp3", &audio);

    let sum_a = compute_audio_checksum(&a).unwrap();
    assert_eq!(sum_a.len(), 32);
    assert!(sum_a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    assert_eq!(Some(sum_a.clone()), compute_audio_checksum(&b));
    assert_eq!(Some(sum_a.clone()), compute_audio_checksum(&bare));
    assert_eq!(sum_a, format!("{:x}", md5::compute(&audio)));
}

#[test]
fn checksum_changes_when_one_payload_byte_changes() {
    let dir = tempdir().unwrap();
    let audio = audio_bytes(3, 9000);
    let mut altered = audio.clone();
    altered[8500] ^= 0x01;

    let a = write_file(dir.path(), "a.mp3", &tagged(4, &[], 64, &audio));
    let b = write_file(dir.path(), "b.mp3", &tagged(4, &[], 64, &altered));
    assert_ne!(compute_audio_checksum(&a), compute_audio_checksum(&b));
}

#[test]
fn checksum_of_short_or_untagged_file_covers_all_bytes() {
    let dir = tempdir().unwrap();
    let short = write_file(dir.path(), "short.mp3", b"abc");
    assert_eq!(
        compute_audio_checksum(&short).as_deref(),
        Some("900150983cd24fb0d6963f7d28e17f72")
    );
    let empty = write_file(dir.path(), "empty.mp3", b"");
    assert_eq!(
        compute_audio_checksum(&empty).as_deref(),
        Some("d41d8cd98f00b204e9800998ecf8427e")
    );
    assert_eq!(compute_audio_checksum(&dir.path().join("missing.mp3")), None);
}

#[test]
fn checksum_skips_v24_footer() {
    let dir = tempdir().unwrap();
    let audio = audio_bytes(9, 500);
    let mut bytes = tagged(4, &[txxx(4, "GUID", "x")], 10, &[]);
    bytes[5] = 0x10;
    let mut footer = bytes[..10].to_vec();
    footer[..3].copy_from_slice(b"3DI");
    bytes.extend_from_slice(&footer);
    bytes.extend_from_slice(&audio);

    let with_footer = write_file(dir.path(), "f.mp3", &bytes);
    let bare = write_file(dir.path(), "bare.mp3", &audio);
    assert_eq!(
        compute_audio_checksum(&with_footer),
        compute_audio_checksum(&bare)
    );
}

#[test]
fn checksum_survives_frame_rewrites() {
    let dir = tempdir().unwrap();
    let path = write_file(
        dir.path(),
        "a.mp3",
        &tagged(3, &[txxx(3, "GUID", "x")], 16, &audio_bytes(1, 5000)),
    );
    let before = compute_audio_checksum(&path);
    write_frame(&path, "Content", &"long text ".repeat(50)).unwrap();
    assert_eq!(compute_audio_checksum(&path), before);
}

#[test]
fn frame_round_trip_keeps_printable_text() {
    let dir = tempdir().unwrap();
    let path = write_file(dir.path(), "a.mp3", &tagged(4, &[], 512, &audio_bytes(0, 100)));

    write_frame(&path, "Content", "Hello, world - ok?").unwrap();
    assert_eq!(
        read_frame(&path, "Content").as_deref(),
        Some("Hello, world - ok?")
    );
}

#[test]
fn write_strips_control_characters_and_trims() {
    let dir = tempdir().unwrap();
    let path = write_file(dir.path(), "a.mp3", &tagged(4, &[], 512, &audio_bytes(0, 100)));

    write_frame(&path, "Content", "\t Hello,\u{7} world - ok?\r\n ").unwrap();
    assert_eq!(
        read_frame(&path, "Content").as_deref(),
        Some("Hello, world - ok?")
    );
    assert_eq!(sanitize_value("a\u{0}b\u{1f}c"), "abc");
    assert_eq!(sanitize_value("  ünï  "), "ünï");
}

#[test]
fn write_collapses_duplicate_frames() {
    let dir = tempdir().unwrap();
    let path = write_file(
        dir.path(),
        "dup.mp3",
        &tagged(
            3,
            &[
                txxx(3, "GUID", "first"),
                txxx(3, "Content", "keep me"),
                txxx(3, "GUID", "second"),
            ],
            64,
            &audio_bytes(2, 300),
        ),
    );
    assert_eq!(occurrences(&fs::read(&path).unwrap(), b"GUID\x00"), 2);

    write_frame(&path, "GUID", "third").unwrap();

    assert_eq!(count_frames(&path, "GUID"), 1);
    assert_eq!(read_frame(&path, "GUID").as_deref(), Some("third"));
    assert_eq!(read_frame(&path, "Content").as_deref(), Some("keep me"));
}

#[test]
fn write_preserves_other_frames_and_audio() {
    let dir = tempdir().unwrap();
    let audio = audio_bytes(5, 3000);
    let title = raw_frame(3, b"TIT2", b"\x00A title");
    let path = write_file(
        dir.path(),
        "a.mp3",
        &tagged(3, &[title.clone()], 32, &audio),
    );

    write_frame(&path, "GUID", "abc").unwrap();

    let (version, tag) = load_tag(&path).unwrap().unwrap();
    assert_eq!(version, TagVersion::V23);
    assert_eq!(tag.title(), Some("A title"));
    assert_eq!(&fs::read(&path).unwrap()[..4], b"ID3\x03");
    let bytes = fs::read(&path).unwrap();
    assert!(bytes.ends_with(&audio));
}

#[test]
fn write_creates_tag_on_untagged_file() {
    let dir = tempdir().unwrap();
    let audio = audio_bytes(4, 700);
    let path = write_file(dir.path(), "plain.mp3", &audio);

    write_frames(&path, &[("GUID", "g"), ("CREATED_ON_DATE", "2024-01-02")]).unwrap();

    let bytes = fs::read(&path).unwrap();
    assert_eq!(&bytes[..4], b"ID3\x04");
    assert!(bytes.ends_with(&audio));
    let values = read_frames(&path).unwrap();
    assert_eq!(values.guid.as_deref(), Some("g"));
    assert_eq!(values.created_on_date.as_deref(), Some("2024-01-02"));
}

#[test]
fn write_grows_tag_when_padding_is_too_small() {
    let dir = tempdir().unwrap();
    let audio = audio_bytes(6, 1000);
    let path = write_file(dir.path(), "a.mp3", &tagged(4, &[], 4, &audio));
    let long = "x".repeat(5000);

    write_frame(&path, "GENERATION_PARAMS", &long).unwrap();

    assert_eq!(read_frame(&path, "GENERATION_PARAMS"), Some(long));
    assert!(fs::read(&path).unwrap().ends_with(&audio));
}

#[test]
fn writing_empty_value_removes_frame() {
    let dir = tempdir().unwrap();
    let path = write_file(
        dir.path(),
        "a.mp3",
        &tagged(4, &[txxx(4, "Content", "old")], 16, &audio_bytes(0, 10)),
    );
    write_frame(&path, "Content", " \n").unwrap();
    assert_eq!(read_frame(&path, "Content"), None);
}

#[test]
fn v24_write_round_trips_non_latin_text() {
    let dir = tempdir().unwrap();
    let path = write_file(dir.path(), "a.mp3", &tagged(4, &[], 64, &audio_bytes(0, 10)));
    write_frame(&path, "Content", "日本語のテキスト").unwrap();
    assert_eq!(
        read_frame(&path, "Content").as_deref(),
        Some("日本語のテキスト")
    );
}

#[test]
fn v23_tag_stays_v23_and_keeps_non_latin_text() {
    let dir = tempdir().unwrap();
    let path = write_file(
        dir.path(),
        "a.mp3",
        &tagged(3, &[txxx(3, "GUID", "g")], 32, &audio_bytes(0, 10)),
    );
    write_frame(&path, "Content", "Grüße, мир").unwrap();

    assert_eq!(&fs::read(&path).unwrap()[..4], b"ID3\x03");
    assert_eq!(read_frame(&path, "Content").as_deref(), Some("Grüße, мир"));
    assert_eq!(read_frame(&path, "GUID").as_deref(), Some("g"));
}

#[test]
fn unsupported_versions_read_as_absent_and_refuse_writes() {
    let dir = tempdir().unwrap();
    let mut bytes = tagged(3, &[txxx(3, "GUID", "x")], 0, &audio_bytes(0, 10));
    bytes[3] = 2;
    let path = write_file(dir.path(), "old.mp3", &bytes);

    assert_eq!(read_frame(&path, "GUID"), None);
    assert_eq!(read_frames(&path).unwrap(), FrameValues::default());
    assert!(matches!(
        write_frame(&path, "GUID", "y"),
        Err(TagError::UnsupportedVersion(2))
    ));
    assert_eq!(fs::read(&path).unwrap(), bytes);
}

#[test]
fn missing_file_reports_io_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nope.mp3");
    assert_eq!(read_frame(&path, "GUID"), None);
    assert!(matches!(read_frames(&path), Err(TagError::Io(_))));
    assert!(matches!(write_frame(&path, "GUID", "x"), Err(TagError::Io(_))));
}

#[test]
fn truncated_tag_refuses_writes() {
    let dir = tempdir().unwrap();
    let mut bytes = tagged(4, &[txxx(4, "GUID", "x")], 0, &[]);
    bytes[9] = 0x7f;
    let path = write_file(dir.path(), "t.mp3", &bytes);
    assert!(matches!(
        write_frame(&path, "GUID", "y"),
        Err(TagError::Malformed(_))
    ));
}

#[test]
fn filename_timestamp_parses_valid_stamp_as_utc() {
    assert_eq!(
        parse_timestamp_from_filename("tts_2024-12-08T16_48_07.mp3", "tts_"),
        Some(1_733_676_487)
    );
    assert_eq!(
        parse_timestamp_from_filename("/music/tts_2024-12-08T16_48_07_v2.mp3", "tts_"),
        Some(1_733_676_487)
    );
    assert_eq!(
        parse_timestamp_from_filename("tts_2024-02-29T00_00_00", "tts_"),
        Some(1_709_164_800)
    );
}

#[test]
fn filename_timestamp_rejects_out_of_range_fields() {
    let p = DEFAULT_TIMESTAMP_PREFIX;
    assert_eq!(parse_timestamp_from_filename("tts_2024-13-01T10_00_00.mp3", p), None);
    assert_eq!(parse_timestamp_from_filename("tts_2024-02-30T10_00_00.mp3", p), None);
    assert_eq!(parse_timestamp_from_filename("tts_2023-02-29T10_00_00.mp3", p), None);
    assert_eq!(parse_timestamp_from_filename("tts_2024-00-10T10_00_00.mp3", p), None);
    assert_eq!(parse_timestamp_from_filename("tts_2024-01-10T24_00_00.mp3", p), None);
    assert_eq!(parse_timestamp_from_filename("tts_2024-01-10T10_60_00.mp3", p), None);
    assert_eq!(parse_timestamp_from_filename("tts_2024-01-10T10_00_60.mp3", p), None);
}

#[test]
fn filename_timestamp_rejects_malformed_names() {
    let p = DEFAULT_TIMESTAMP_PREFIX;
    assert_eq!(parse_timestamp_from_filename("rec_2024-12-08T16_48_07.mp3", p), None);
    assert_eq!(parse_timestamp_from_filename("tts_2024-12-08T16_48.mp3", p), None);
    assert_eq!(parse_timestamp_from_filename("tts_2024-12-08T16_48_071.mp3", p), None);
    assert_eq!(parse_timestamp_from_filename("tts_2024-12-08 16_48_07.mp3", p), None);
    assert_eq!(parse_timestamp_from_filename("tts_2024-12-08T16:48:07.mp3", p), None);
    assert_eq!(parse_timestamp_from_filename("tts_+024-12-08T16_48_07.mp3", p), None);
    assert_eq!(parse_timestamp_from_filename("song.mp3", p), None);
    assert_eq!(parse_timestamp_from_filename("", p), None);
}

#[test]
fn created_on_values_format_and_parse() {
    let (date, ts) = format_created_on(1_733_676_487).unwrap();
    assert_eq!(date, "2024-12-08");
    assert_eq!(ts, "2024-12-08T16:48:07+00:00");
    assert_eq!(parse_created_on_ts(&ts), Some(1_733_676_487));
    assert_eq!(
        parse_created_on_ts("2024-12-08T18:48:07+02:00"),
        Some(1_733_676_487)
    );
    assert_eq!(parse_created_on_ts("yesterday"), None);
    assert_eq!(parse_created_on_date("2024-12-08"), Some(1_733_616_000));
}

#[test]
fn duration_values_have_one_fractional_digit() {
    assert_eq!(format_duration_secs(3500), "3.5");
    assert_eq!(format_duration_secs(3549), "3.5");
    assert_eq!(format_duration_secs(3550), "3.6");
    assert_eq!(format_duration_secs(0), "0.0");
    assert_eq!(format_duration_secs(61_000), "61.0");
    assert_eq!(parse_duration_secs("3.5"), Some(3500));
    assert_eq!(parse_duration_secs("-1"), None);
    assert_eq!(parse_duration_secs("abc"), None);
}

#[test]
fn frame_names_are_verbatim() {
    let names: Vec<&str> = FrameName::ALL.iter().map(|n| n.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "Content",
            "GUID",
            "CREATED_ON_DATE",
            "CREATED_ON_TS",
            "DURATION_SEC",
            "CHECKSUM_MD5_AUDIO",
            "GENERATION_PARAMS"
        ]
    );
    assert_eq!(FrameName::from_name("GUID"), Some(FrameName::Guid));
    assert_eq!(FrameName::from_name("guid"), None);
}

#[test]
fn generation_params_must_be_a_json_object() {
    let mut values = FrameValues::default();
    values.set(
        FrameName::GenerationParams,
        Some(r#"{"voice":"alto","speed":1.25}"#.to_string()),
    );
    let params = values.generation_params().unwrap();
    assert_eq!(params["voice"], "alto");

    values.set(FrameName::GenerationParams, Some("[1,2]".to_string()));
    assert!(values.generation_params().is_none());
}
