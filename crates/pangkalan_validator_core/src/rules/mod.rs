use std::fmt;

use crate::{NoticeSeverity, ValidationNotice, ValidatorRunner};

pub mod collection_size;
pub mod duplicate_name;
pub mod feature;
pub mod geometry;
pub mod properties;

pub use collection_size::CollectionSizeValidator;
pub use duplicate_name::DuplicateNameValidator;
pub use feature::{validate_feature, FeatureValidator};
pub use geometry::validate_geometry;
pub use properties::validate_properties;

/// Validators in the order their notices are reported: collection-level
/// warnings, then per-feature errors, then duplicate names.
pub fn default_runner() -> ValidatorRunner {
    let mut runner = ValidatorRunner::new();
    runner.register(CollectionSizeValidator);
    runner.register(FeatureValidator);
    runner.register(DuplicateNameValidator);
    runner
}

/// Position of a feature inside the collection, shown to users one-based
/// as `Feature 3`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureLabel {
    index: usize,
}

impl FeatureLabel {
    pub fn new(index: usize) -> Self {
        Self { index }
    }

    pub(crate) fn error(
        &self,
        code: &str,
        field: Option<&str>,
        message: impl fmt::Display,
    ) -> ValidationNotice {
        ValidationNotice::new(code, NoticeSeverity::Error, format!("{}: {}", self, message))
            .with_location(self.index, field)
    }
}

impl fmt::Display for FeatureLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Feature {}", self.index + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_is_one_based() {
        assert_eq!(FeatureLabel::new(0).to_string(), "Feature 1");
        assert_eq!(FeatureLabel::new(41).to_string(), "Feature 42");
    }

    #[test]
    fn default_runner_registers_every_rule() {
        assert_eq!(default_runner().len(), 3);
    }
}
