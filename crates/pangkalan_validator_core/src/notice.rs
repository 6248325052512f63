use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::document::StructuralError;

pub const NOTICE_CODE_MALFORMED_JSON: &str = "malformed_json";
pub const NOTICE_CODE_EMPTY_DOCUMENT: &str = "empty_document";
pub const NOTICE_CODE_DOCUMENT_NOT_OBJECT: &str = "document_not_object";
pub const NOTICE_CODE_INVALID_COLLECTION_TYPE: &str = "invalid_collection_type";
pub const NOTICE_CODE_FEATURES_NOT_ARRAY: &str = "features_not_array";
pub const NOTICE_CODE_EMPTY_FEATURE_COLLECTION: &str = "empty_feature_collection";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeSeverity {
    Error,
    Warning,
    Info,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationNotice {
    pub code: String,
    pub severity: NoticeSeverity,
    pub message: String,
    /// Zero-based position of the feature in the collection.
    pub feature_index: Option<usize>,
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub context: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub field_order: Vec<String>,
}

impl ValidationNotice {
    pub fn new(
        code: impl Into<String>,
        severity: NoticeSeverity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            severity,
            message: message.into(),
            feature_index: None,
            field: None,
            context: BTreeMap::new(),
            field_order: Vec::new(),
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(code, NoticeSeverity::Error, message)
    }

    pub fn warning(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(code, NoticeSeverity::Warning, message)
    }

    pub fn from_structural_error(error: &StructuralError) -> Self {
        let code = match error {
            StructuralError::Empty => NOTICE_CODE_EMPTY_DOCUMENT,
            StructuralError::NotAnObject => NOTICE_CODE_DOCUMENT_NOT_OBJECT,
            StructuralError::NotAFeatureCollection => NOTICE_CODE_INVALID_COLLECTION_TYPE,
            StructuralError::FeaturesNotAnArray => NOTICE_CODE_FEATURES_NOT_ARRAY,
            StructuralError::NoFeatures => NOTICE_CODE_EMPTY_FEATURE_COLLECTION,
        };
        ValidationNotice::error(code, error.to_string())
    }

    pub fn malformed_json(error: &serde_json::Error) -> Self {
        let mut notice = ValidationNotice::error(
            NOTICE_CODE_MALFORMED_JSON,
            format!("file is not valid JSON: {}", error),
        );
        notice.insert_context_field("line", error.line());
        notice.insert_context_field("column", error.column());
        notice
    }

    pub fn insert_context_field<V: Serialize>(&mut self, name: impl Into<String>, value: V) {
        let key = name.into();
        let serialized = serde_json::to_value(value).unwrap_or(Value::Null);
        if !self.field_order.iter().any(|item| item == &key) {
            self.field_order.push(key.clone());
        }
        self.context.insert(key, serialized);
    }

    pub fn with_context_field<V: Serialize>(mut self, name: impl Into<String>, value: V) -> Self {
        self.insert_context_field(name, value);
        self
    }

    pub fn set_location(&mut self, feature_index: usize, field: Option<&str>) {
        self.feature_index = Some(feature_index);
        self.field = field.map(str::to_string);
    }

    pub fn with_location(mut self, feature_index: usize, field: Option<&str>) -> Self {
        self.set_location(feature_index, field);
        self
    }
}

/// Ordered accumulator shared by every validation stage.
#[derive(Debug, Default, Clone)]
pub struct NoticeContainer {
    notices: Vec<ValidationNotice>,
}

impl NoticeContainer {
    pub fn new() -> Self {
        Self {
            notices: Vec::new(),
        }
    }

    pub fn push(&mut self, notice: ValidationNotice) {
        self.notices.push(notice);
    }

    pub fn push_structural_error(&mut self, error: &StructuralError) {
        self.notices
            .push(ValidationNotice::from_structural_error(error));
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationNotice> {
        self.notices.iter()
    }

    pub fn len(&self) -> usize {
        self.notices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notices.is_empty()
    }

    pub fn merge(&mut self, other: NoticeContainer) {
        self.notices.extend(other.notices);
    }

    pub fn count(&self, severity: NoticeSeverity) -> usize {
        self.notices
            .iter()
            .filter(|notice| notice.severity == severity)
            .count()
    }

    pub fn has_errors(&self) -> bool {
        self.notices
            .iter()
            .any(|notice| notice.severity == NoticeSeverity::Error)
    }

    pub fn messages(&self, severity: NoticeSeverity) -> Vec<String> {
        self.notices
            .iter()
            .filter(|notice| notice.severity == severity)
            .map(|notice| notice.message.clone())
            .collect()
    }
}

impl IntoIterator for NoticeContainer {
    type Item = ValidationNotice;
    type IntoIter = std::vec::IntoIter<ValidationNotice>;

    fn into_iter(self) -> Self::IntoIter {
        self.notices.into_iter()
    }
}

/// Flat accept/reject summary handed to callers that only need text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl From<&NoticeContainer> for ValidationResult {
    fn from(notices: &NoticeContainer) -> Self {
        let errors = notices.messages(NoticeSeverity::Error);
        Self {
            is_valid: errors.is_empty(),
            errors,
            warnings: notices.messages(NoticeSeverity::Warning),
        }
    }
}
