#![no_main]
use libfuzzer_sys::fuzz_target;
use pangkalan_core::{sanitize, DocumentInput};

fuzz_target!(|data: &[u8]| {
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };
    let Ok(document) = DocumentInput::from_value(&value) else {
        return;
    };
    let once = sanitize(&document);
    let twice = sanitize(&once);
    assert_eq!(once.to_value(), twice.to_value());
});
