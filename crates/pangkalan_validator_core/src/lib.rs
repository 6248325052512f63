//! Validation, sanitization and querying of pangkalan ojek GeoJSON files.

pub mod document;
pub mod engine;
pub mod notice;
pub mod query;
pub mod rules;
pub mod sample;
pub mod sanitize;
pub mod validation_context;
pub mod validator;

pub use document::{
    ConversionError, DocumentInput, FeatureInput, Field, GeometryInput, PropertiesInput,
    StructuralError,
};
pub use engine::{
    load_document, load_document_with, validate_document, validate_text, validate_value,
    LoadedDocument, PipelineError, ValidationOutcome,
};
pub use notice::{
    NoticeContainer, NoticeSeverity, ValidationNotice, ValidationResult,
    NOTICE_CODE_DOCUMENT_NOT_OBJECT, NOTICE_CODE_EMPTY_DOCUMENT,
    NOTICE_CODE_EMPTY_FEATURE_COLLECTION, NOTICE_CODE_FEATURES_NOT_ARRAY,
    NOTICE_CODE_INVALID_COLLECTION_TYPE, NOTICE_CODE_MALFORMED_JSON,
};
pub use query::{
    map_center, nearest, rank_by_distance, unique_categories, LocationFilter, RankedLocation,
    DEFAULT_CENTER,
};
pub use rules::default_runner;
pub use sample::{generate_sample, sample_value};
pub use sanitize::sanitize;
pub use validation_context::{
    feature_count_warning_threshold, region_bounds, set_feature_count_warning_threshold,
    set_region_bounds, FeatureCountThresholdGuard, RegionBoundsGuard,
    DEFAULT_FEATURE_COUNT_WARNING_THRESHOLD,
};
pub use validator::{Validator, ValidatorRunner};
