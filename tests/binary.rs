use chrono::{TimeZone, Utc};

use plistdoc::{Array, Dictionary, Node, NodeType, PropertyListFormat};

fn sample() -> Dictionary {
    let root = Dictionary::new();
    root.set("CFBundleIdentifier", Node::string("com.example.app")).unwrap();
    root.set("CFBundleDisplayName", Node::string("Caf\u{E9} \u{2615}")).unwrap();
    root.set("Build", Node::number(40000)).unwrap();
    root.set("Offset", Node::number(-1)).unwrap();
    root.set("Scale", Node::real(0.1)).unwrap();
    root.set("Enabled", Node::boolean(true)).unwrap();
    root.set("Disabled", Node::boolean(false)).unwrap();
    root.set("Created", Node::date(Utc.with_ymd_and_hms(2001, 1, 1, 0, 0, 0).unwrap())).unwrap();
    root.set("Icon", Node::data(vec![0x89, 0x50, 0x4E, 0x47])).unwrap();
    root.set("Empty", Node::data(Vec::new())).unwrap();
    root.set("Blank", Node::string("")).unwrap();

    let modes = Array::new();
    for mode in &["audio", "location", "audio"] {
        modes.add(Node::string(*mode)).unwrap();
    }
    root.set("UIBackgroundModes", modes.into()).unwrap();

    let nested = Dictionary::new();
    nested.set("Enabled", Node::boolean(true)).unwrap();
    nested.set("Nothing", Dictionary::new().into()).unwrap();
    root.set("Nested", nested.into()).unwrap();
    root
}

#[test]
fn test_round_trip() {
    let _ = pretty_env_logger::try_init();
    let root = sample();
    let bytes = root.to_bytes(PropertyListFormat::Binary).unwrap();
    assert!(bytes.starts_with(b"bplist00"));

    let (decoded, format) = Node::from_slice_with_format(&bytes).unwrap();
    assert_eq!(format, PropertyListFormat::Binary);
    assert_eq!(decoded, *root.node());

    let decoded = decoded.as_dictionary().unwrap();
    assert_eq!(decoded.keys(), root.keys());
    assert_eq!(decoded.get("Empty").unwrap().as_data(), Some(Vec::new()));
    assert_eq!(decoded.get("Blank").unwrap().as_string(), Some(String::new()));
    assert_eq!(decoded.get("Created").unwrap().node_type(), NodeType::Date);
}

#[test]
fn test_writing_is_deterministic() {
    let first = sample().to_bytes(PropertyListFormat::Binary).unwrap();
    let second = sample().to_bytes(PropertyListFormat::Binary).unwrap();
    assert_eq!(first, second);

    // Decoding and encoding again reproduces the document.
    let decoded = Node::from_slice(&first).unwrap();
    assert_eq!(decoded.to_bytes(PropertyListFormat::Binary).unwrap(), first);
}

#[test]
fn test_large_container_uses_wide_references() {
    let array = Array::new();
    for value in 0 .. 300 {
        array.add(Node::number(value)).unwrap();
    }
    let bytes = array.to_bytes(PropertyListFormat::Binary).unwrap();

    // The trailer records two-byte references for 301 objects.
    let trailer = &bytes[bytes.len() - 26 ..];
    assert_eq!(trailer[1], 2);
    assert_eq!(&trailer[2 .. 10], &301u64.to_be_bytes());

    let decoded = Node::from_slice(&bytes).unwrap().as_array().unwrap();
    assert_eq!(decoded.len(), 300);
    assert_eq!(decoded.get(299).unwrap().as_i32(), Some(299));
}

#[test]
fn test_long_strings_and_data() {
    let root = Array::new();
    root.add(Node::string("x".repeat(1000))).unwrap();
    root.add(Node::string("\u{00FC}".repeat(20))).unwrap();
    root.add(Node::data(vec![7u8; 70000])).unwrap();
    let bytes = root.to_bytes(PropertyListFormat::Binary).unwrap();
    assert_eq!(Node::from_slice(&bytes).unwrap(), *root.node());
}

#[test]
fn test_typed_decoding_keeps_wide_integers() {
    let bytes = Node::number(-5).to_bytes(PropertyListFormat::Binary).unwrap();
    assert_eq!(plistdoc::from_slice::<i64>(&bytes).unwrap(), -5);
}

#[test]
fn test_dates_hold_whole_seconds() {
    let precise = Utc.timestamp_opt(1_600_000_000, 888_195_868).unwrap();
    let root = Array::new();
    root.add(Node::date(precise)).unwrap();
    root.add(Node::new(NodeType::Date)).unwrap();
    let assigned = Node::date(Utc.timestamp_opt(0, 0).unwrap());
    assigned.set_date(precise).unwrap();
    root.add(assigned).unwrap();
    let parsed = Node::new(NodeType::Date);
    assert!(parsed.try_set_from_str("2020-09-13T12:26:40.5Z"));
    root.add(parsed).unwrap();

    assert_eq!(root.get(0).unwrap().as_date(), Some(Utc.timestamp_opt(1_600_000_000, 0).unwrap()));

    let bytes = root.to_bytes(PropertyListFormat::Binary).unwrap();
    assert_eq!(Node::from_slice(&bytes).unwrap(), *root.node());
}
