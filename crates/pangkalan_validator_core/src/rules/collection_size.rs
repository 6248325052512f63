use crate::{
    feature_count_warning_threshold, DocumentInput, NoticeContainer, ValidationNotice, Validator,
};

const CODE_TOO_MANY_FEATURES: &str = "too_many_features";

/// Large uploads are accepted but flagged.
#[derive(Debug, Default)]
pub struct CollectionSizeValidator;

impl Validator for CollectionSizeValidator {
    fn name(&self) -> &'static str {
        "collection_size"
    }

    fn validate(&self, document: &DocumentInput, notices: &mut NoticeContainer) {
        let threshold = feature_count_warning_threshold();
        let count = document.len();
        if count > threshold {
            notices.push(
                ValidationNotice::warning(
                    CODE_TOO_MANY_FEATURES,
                    format!(
                        "file contains {} locations; performance may be affected for very large data",
                        count
                    ),
                )
                .with_context_field("featureCount", count)
                .with_context_field("threshold", threshold),
            );
        }
    }
}
