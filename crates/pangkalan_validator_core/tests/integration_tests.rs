use std::fs;
use std::path::{Path, PathBuf};

use pangkalan_core::{
    default_runner, generate_sample, load_document, sanitize, set_region_bounds, validate_document,
    validate_text, DocumentInput, NoticeSeverity,
};
use serde_json::{json, Value};

fn project_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent() // crates/
        .unwrap()
        .parent() // root
        .unwrap()
        .to_path_buf()
}

fn test_data_root() -> PathBuf {
    project_root().join("test-data")
}

fn geojson_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<_> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "geojson"))
        .collect();
    files.sort();
    files
}

fn location(name: &str) -> Value {
    json!({
        "type": "Feature",
        "properties": {
            "nama_lokasi": name,
            "jenis_lokasi": "Terminal",
            "jam_ramainya": "06:00 - 10:00",
            "tingkat_kepadatan": 3,
            "tingkat_keamanan": 3,
            "akses_internet": 3,
            "kenyamanan": 3,
            "fasilitas": "Halte",
            "alamat": "Jl. Contoh"
        },
        "geometry": {"type": "Point", "coordinates": [106.8, -6.2]}
    })
}

fn collection(features: Vec<Value>) -> Value {
    json!({"type": "FeatureCollection", "features": features})
}

#[test]
fn test_valid_files() {
    let files = geojson_files(&test_data_root().join("valid"));
    assert!(!files.is_empty(), "no valid fixtures found");

    for path in files {
        let text = fs::read_to_string(&path).unwrap();
        let outcome = validate_text(&text, &default_runner());
        let errors = outcome.notices.messages(NoticeSeverity::Error);
        assert!(errors.is_empty(), "{:?} rejected: {:#?}", path, errors);
        assert!(load_document(&text).is_ok(), "{:?} failed to load", path);
    }
}

#[test]
fn test_invalid_files() {
    let files = geojson_files(&test_data_root().join("invalid"));
    assert!(!files.is_empty(), "no invalid fixtures found");

    for path in files {
        let text = fs::read_to_string(&path).unwrap();
        let outcome = validate_text(&text, &default_runner());
        assert!(
            outcome.notices.has_errors(),
            "{:?} was expected to be rejected",
            path
        );
        assert!(load_document(&text).is_err());
    }
}

#[test]
fn test_broken_properties_report_every_error() {
    let path = test_data_root().join("invalid/broken_properties.geojson");
    let value: Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
    let result = validate_document(&value);

    assert_eq!(
        result.errors,
        vec![
            "Feature 1: fasilitas must not be empty",
            "Feature 1: alamat must not be empty",
            "Feature 1: jenis_lokasi 'Restoran' is not valid. Allowed categories: Terminal, Minimarket, Perumahan, Mall, Stasiun, Pinggir jalan, Universitas, Mesjid, SPBU, Sekolah, Bank, Warkop, Cafe",
            "Feature 1: tingkat_kepadatan must be between 1 and 5",
            "Feature 1: tingkat_keamanan must be a number",
            "Feature 1: akses_internet must be a whole number",
            "Feature 1: jam_ramainya has an invalid format. Example: \"06:00 - 10:00\" or \"06:00 - 10:00 & 16:00 - 20:00\"",
        ]
    );
}

#[test]
fn test_missing_collection_type_is_single_error() {
    let result = validate_document(&json!({"features": [location("A")]}));
    assert!(!result.is_valid);
    assert_eq!(result.errors.len(), 1);
    assert!(result.warnings.is_empty());
}

#[test]
fn test_errors_are_ordered_by_feature() {
    let mut second = location("B");
    second["geometry"]["coordinates"] = json!([150.0, -6.2]);
    let mut third = location("C");
    third["properties"]["kenyamanan"] = json!(0);

    let result = validate_document(&collection(vec![location("A"), second, third]));
    assert_eq!(
        result.errors,
        vec![
            "Feature 2: coordinates are outside the Indonesia region",
            "Feature 3: kenyamanan must be between 1 and 5",
        ]
    );
}

#[test]
fn test_validation_is_deterministic() {
    let mut broken = location("A");
    broken["properties"]["tingkat_kepadatan"] = json!(9);
    let document = collection(vec![broken, location("A"), json!("not a feature")]);

    let first = validate_document(&document);
    for _ in 0..10 {
        assert_eq!(validate_document(&document), first);
    }
}

#[test]
fn test_duplicate_names_are_a_warning_only() {
    let result = validate_document(&collection(vec![
        location("A"),
        location("B"),
        location("A"),
    ]));
    assert!(result.is_valid);
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].contains('A'));
    assert!(!result.warnings[0].contains('B'));
}

#[test]
fn test_sanitize_is_idempotent_on_fixtures() {
    for path in geojson_files(&test_data_root().join("valid")) {
        let value: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        let document = DocumentInput::from_value(&value).unwrap();
        let once = sanitize(&document);
        assert_eq!(sanitize(&once), once, "{:?}", path);
    }
}

#[test]
fn test_sanitize_clamps_comfort_level() {
    let mut high = location("A");
    high["properties"]["kenyamanan"] = json!(9.6);
    let mut low = location("B");
    low["properties"]["kenyamanan"] = json!(-3);

    let document = DocumentInput::from_value(&collection(vec![high, low])).unwrap();
    let sanitized = sanitize(&document).to_value();
    assert_eq!(sanitized["features"][0]["properties"]["kenyamanan"], 5);
    assert_eq!(sanitized["features"][1]["properties"]["kenyamanan"], 1);
}

#[test]
fn test_sanitize_keeps_unknown_members() {
    let path = test_data_root().join("valid/jakarta.geojson");
    let loaded = load_document(&fs::read_to_string(path).unwrap()).unwrap();
    let value = loaded.to_value();
    assert_eq!(value["name"], "Pangkalan Jakarta");
    assert_eq!(value["features"][2]["id"], "wb-01");
}

#[test]
fn test_makassar_fixture_is_normalized() {
    let path = test_data_root().join("valid/makassar.geojson");
    let loaded = load_document(&fs::read_to_string(path).unwrap()).unwrap();
    let record = &loaded.document.features[0];
    assert_eq!(record.name(), "Pangkalan Unhas");
    assert_eq!(record.properties.comfort_level.value(), 4);
}

#[test]
fn test_sample_round_trip() {
    let value: Value = serde_json::from_str(&generate_sample()).unwrap();
    let result = validate_document(&value);
    assert!(result.is_valid);
    assert!(result.errors.is_empty());
}

#[test]
fn test_region_check_can_be_disabled() {
    let path = test_data_root().join("invalid/outside_region.geojson");
    let text = fs::read_to_string(path).unwrap();
    assert!(load_document(&text).is_err());

    let _guard = set_region_bounds(None);
    assert!(load_document(&text).is_ok());
}
