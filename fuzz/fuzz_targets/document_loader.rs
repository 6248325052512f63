#![no_main]
use libfuzzer_sys::fuzz_target;
use pangkalan_core::{default_runner, load_document, validate_text};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let outcome = validate_text(text, &default_runner());
    let loaded = load_document(text);
    // Anything without errors must survive sanitizing and conversion.
    assert_eq!(outcome.is_valid() && outcome.document.is_some(), loaded.is_ok());
});
