use serde_json::Value;
use tracing::{debug, info, warn};

use pangkalan_model::LocationDocument;

use crate::{
    default_runner, sanitize, ConversionError, DocumentInput, NoticeContainer, NoticeSeverity,
    StructuralError, ValidationNotice, ValidationResult, ValidatorRunner,
};

pub struct ValidationOutcome {
    /// `None` when the document was rejected before per-feature checks ran.
    pub document: Option<DocumentInput>,
    pub notices: NoticeContainer,
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        !self.notices.has_errors()
    }

    pub fn result(&self) -> ValidationResult {
        ValidationResult::from(&self.notices)
    }
}

/// Parses `text` as JSON and validates it. Unparseable text is reported as
/// a single error rather than returned as a failure.
pub fn validate_text(text: &str, runner: &ValidatorRunner) -> ValidationOutcome {
    if text.trim().is_empty() {
        let mut notices = NoticeContainer::new();
        notices.push_structural_error(&StructuralError::Empty);
        return ValidationOutcome {
            document: None,
            notices,
        };
    }

    match serde_json::from_str::<Value>(text) {
        Ok(value) => validate_value(&value, runner),
        Err(err) => {
            debug!(error = %err, "document is not valid JSON");
            let mut notices = NoticeContainer::new();
            notices.push(ValidationNotice::malformed_json(&err));
            ValidationOutcome {
                document: None,
                notices,
            }
        }
    }
}

pub fn validate_value(value: &Value, runner: &ValidatorRunner) -> ValidationOutcome {
    let mut notices = NoticeContainer::new();

    match DocumentInput::from_value(value) {
        Ok(document) => {
            runner.run_with(&document, &mut notices);
            ValidationOutcome {
                document: Some(document),
                notices,
            }
        }
        Err(err) => {
            debug!(error = %err, "document failed structural checks");
            notices.push_structural_error(&err);
            ValidationOutcome {
                document: None,
                notices,
            }
        }
    }
}

/// Validates a parsed document with the default rule set.
pub fn validate_document(value: &Value) -> ValidationResult {
    validate_value(value, &default_runner()).result()
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("document rejected with {} error(s)", .notices.count(NoticeSeverity::Error))]
    Rejected { notices: NoticeContainer },
    #[error(transparent)]
    Conversion(#[from] ConversionError),
}

impl PipelineError {
    /// Error messages suitable for showing to whoever uploaded the file.
    pub fn messages(&self) -> Vec<String> {
        match self {
            PipelineError::Rejected { notices } => notices.messages(NoticeSeverity::Error),
            PipelineError::Conversion(err) => vec![err.to_string()],
        }
    }
}

/// A document that passed validation, both in typed form and as the
/// sanitized JSON tree that keeps unknown members.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub document: LocationDocument,
    pub sanitized: DocumentInput,
    pub notices: NoticeContainer,
}

impl LoadedDocument {
    pub fn warnings(&self) -> Vec<String> {
        self.notices.messages(NoticeSeverity::Warning)
    }

    pub fn to_value(&self) -> Value {
        self.sanitized.to_value()
    }
}

/// Full upload path: parse, validate, then sanitize and convert only when
/// there are no errors.
pub fn load_document(text: &str) -> Result<LoadedDocument, PipelineError> {
    load_document_with(text, &default_runner())
}

pub fn load_document_with(
    text: &str,
    runner: &ValidatorRunner,
) -> Result<LoadedDocument, PipelineError> {
    let outcome = validate_text(text, runner);
    let document = match outcome.document {
        Some(document) if !outcome.notices.has_errors() => document,
        _ => {
            warn!(
                errors = outcome.notices.count(NoticeSeverity::Error),
                "document rejected"
            );
            return Err(PipelineError::Rejected {
                notices: outcome.notices,
            });
        }
    };

    let sanitized = sanitize(&document);
    let typed = LocationDocument::try_from(&sanitized)?;
    info!(
        locations = typed.len(),
        warnings = outcome.notices.count(NoticeSeverity::Warning),
        "document loaded"
    );
    Ok(LoadedDocument {
        document: typed,
        sanitized,
        notices: outcome.notices,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate_sample;
    use serde_json::json;

    #[test]
    fn blank_text_is_an_empty_document() {
        let outcome = validate_text("  \n", &default_runner());
        assert!(outcome.document.is_none());
        assert_eq!(
            outcome.result().errors,
            vec!["file is empty or unreadable"]
        );
    }

    #[test]
    fn malformed_json_is_reported_not_raised() {
        let outcome = validate_text("{\"type\": ", &default_runner());
        assert!(!outcome.is_valid());
        assert_eq!(outcome.notices.len(), 1);
        assert_eq!(
            outcome.notices.iter().next().unwrap().code,
            crate::NOTICE_CODE_MALFORMED_JSON
        );
    }

    #[test]
    fn structural_failure_is_a_single_error() {
        let result = validate_document(&json!({"type": "Feature", "features": []}));
        assert!(!result.is_valid);
        assert_eq!(
            result.errors,
            vec!["GeoJSON must be of type 'FeatureCollection'"]
        );
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn load_document_sanitizes_and_converts() {
        let text = json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "id": 7,
                "properties": {
                    "nama_lokasi": "  Pangkalan Blok M  ",
                    "jenis_lokasi": "Mall",
                    "jam_ramainya": "10:00 - 12:00",
                    "tingkat_kepadatan": 3,
                    "tingkat_keamanan": 4,
                    "akses_internet": 5,
                    "kenyamanan": 4,
                    "fasilitas": "Warung",
                    "alamat": "Jl. Melawai, Jakarta Selatan"
                },
                "geometry": {"type": "Point", "coordinates": [106.8, -6.24]}
            }]
        })
        .to_string();

        let loaded = load_document(&text).unwrap();
        assert_eq!(loaded.document.len(), 1);
        assert_eq!(loaded.document.features[0].name(), "Pangkalan Blok M");
        assert_eq!(loaded.to_value()["features"][0]["id"], 7);
        assert!(loaded.warnings().is_empty());
    }

    #[test]
    fn load_document_rejects_invalid_input() {
        let err = load_document("[]").unwrap_err();
        assert!(matches!(err, PipelineError::Rejected { .. }));
        assert_eq!(err.messages(), vec!["file must be a valid JSON object"]);
    }

    #[test]
    fn sample_loads() {
        let loaded = load_document(&generate_sample()).unwrap();
        assert_eq!(loaded.document.len(), 2);
    }
}
