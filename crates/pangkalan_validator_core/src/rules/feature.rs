use crate::document::{FeatureInput, Field, FEATURE_TYPE};
use crate::rules::{validate_geometry, validate_properties, FeatureLabel};
use crate::{DocumentInput, NoticeContainer, Validator};

const CODE_INVALID_FEATURE_TYPE: &str = "invalid_feature_type";

#[derive(Debug, Default)]
pub struct FeatureValidator;

impl Validator for FeatureValidator {
    fn name(&self) -> &'static str {
        "feature"
    }

    fn validate(&self, document: &DocumentInput, notices: &mut NoticeContainer) {
        for (index, feature) in document.features.iter().enumerate() {
            validate_feature(feature, index, notices);
        }
    }
}

/// A record that is not a `Feature` gets a single notice; its geometry and
/// properties are not inspected.
pub fn validate_feature(
    feature: &Field<FeatureInput>,
    index: usize,
    notices: &mut NoticeContainer,
) {
    let label = FeatureLabel::new(index);
    let Some(feature) = feature.present().filter(|feature| feature.is_feature()) else {
        notices.push(label.error(
            CODE_INVALID_FEATURE_TYPE,
            Some("type"),
            format!("type must be '{}'", FEATURE_TYPE),
        ));
        return;
    };

    validate_geometry(&feature.geometry, label, notices);
    validate_properties(&feature.properties, label, notices);
}
