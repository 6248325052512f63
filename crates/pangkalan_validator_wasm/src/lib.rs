use wasm_bindgen::prelude::*;

use pangkalan_core::{
    default_runner, load_document, set_region_bounds, validate_text, NoticeContainer,
    NoticeSeverity, RegionBoundsGuard,
};
use pangkalan_report::ValidationReport;

#[cfg(feature = "console_error_panic_hook")]
pub use console_error_panic_hook::set_once as set_panic_hook;

/// Initialize the WASM module (call once on page load)
#[wasm_bindgen]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Get the validator version
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Validation result returned to JavaScript
#[wasm_bindgen]
pub struct ValidationResult {
    json: String,
    errors: Vec<String>,
    warnings: Vec<String>,
}

#[wasm_bindgen]
impl ValidationResult {
    /// Full validation report as JSON
    #[wasm_bindgen(getter)]
    pub fn json(&self) -> String {
        self.json.clone()
    }

    /// Error messages, in report order
    #[wasm_bindgen(getter)]
    pub fn errors(&self) -> js_sys::Array {
        self.errors.iter().map(|message| JsValue::from_str(message)).collect()
    }

    /// Warning messages, in report order
    #[wasm_bindgen(getter)]
    pub fn warnings(&self) -> js_sys::Array {
        self.warnings.iter().map(|message| JsValue::from_str(message)).collect()
    }

    #[wasm_bindgen(getter)]
    pub fn error_count(&self) -> u32 {
        self.errors.len() as u32
    }

    #[wasm_bindgen(getter)]
    pub fn warning_count(&self) -> u32 {
        self.warnings.len() as u32
    }

    /// Check if validation passed (no errors)
    #[wasm_bindgen(getter)]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Validate the text of a GeoJSON file.
///
/// # Arguments
/// * `text` - File contents as read in the browser
/// * `region_check` - Pass `false` to accept coordinates outside Indonesia
#[wasm_bindgen]
pub fn validate_geojson(text: &str, region_check: Option<bool>) -> ValidationResult {
    let _region_guard = region_guard(region_check);
    let outcome = validate_text(text, &default_runner());
    build_result(&outcome.notices)
}

/// Validate and sanitize a GeoJSON file. Returns the sanitized document as
/// pretty-printed JSON, or throws the error messages joined by newlines.
#[wasm_bindgen]
pub fn sanitize_geojson(text: &str, region_check: Option<bool>) -> Result<String, JsValue> {
    sanitize_text(text, region_check).map_err(|message| JsValue::from_str(&message))
}

/// Sample document for the "download template" button
#[wasm_bindgen]
pub fn generate_sample() -> String {
    pangkalan_core::generate_sample()
}

fn build_result(notices: &NoticeContainer) -> ValidationResult {
    let report = ValidationReport::from_container(notices);
    let json = serde_json::to_string(&report).unwrap_or_else(|_| "{}".to_string());
    ValidationResult {
        json,
        errors: notices.messages(NoticeSeverity::Error),
        warnings: notices.messages(NoticeSeverity::Warning),
    }
}

/// Passing `false` turns the Indonesia region check off until the guard drops.
fn region_guard(region_check: Option<bool>) -> Option<RegionBoundsGuard> {
    (region_check == Some(false)).then(|| set_region_bounds(None))
}

fn sanitize_text(text: &str, region_check: Option<bool>) -> Result<String, String> {
    let _region_guard = region_guard(region_check);
    let loaded = load_document(text).map_err(|err| err.messages().join("\n"))?;
    serde_json::to_string_pretty(&loaded.to_value()).map_err(|err| err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        let v = version();
        assert!(!v.is_empty());
    }

    #[test]
    fn test_sample_is_valid() {
        let result = validate_geojson(&generate_sample(), None);
        assert!(result.is_valid());
        assert_eq!(result.warning_count(), 0);
        let report: serde_json::Value = serde_json::from_str(&result.json()).unwrap();
        assert_eq!(report["isValid"], true);
    }

    #[test]
    fn test_region_check_toggle() {
        let text = generate_sample().replace("106.8456", "2.35");
        assert!(!validate_geojson(&text, None).is_valid());
        assert!(validate_geojson(&text, Some(false)).is_valid());

        assert!(sanitize_text(&text, None).is_err());
        let sanitized = sanitize_text(&text, Some(false)).unwrap();
        assert!(sanitized.contains("2.35"));
    }

    #[test]
    fn test_sanitize_text() {
        let text = generate_sample().replace("\"kenyamanan\": 4", "\"kenyamanan\": 4.0");
        let sanitized = sanitize_text(&text, None).unwrap();
        assert!(sanitized.contains("\"kenyamanan\": 4"));
        assert!(!sanitized.contains("4.0"));
        assert_eq!(
            sanitize_text("{}", None).unwrap_err(),
            "GeoJSON must be of type 'FeatureCollection'"
        );
    }
}
