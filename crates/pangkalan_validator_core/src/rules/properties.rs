use pangkalan_model::{
    keys, BusyHours, Category, MAX_ADDRESS_LENGTH, MAX_NAME_LENGTH, MAX_RATING, MIN_RATING,
};

use crate::document::{Field, PropertiesInput};
use crate::rules::FeatureLabel;
use crate::NoticeContainer;

const CODE_INVALID_PROPERTIES: &str = "invalid_properties";
const CODE_MISSING_REQUIRED_FIELD: &str = "missing_required_field";
const CODE_INVALID_FIELD_TYPE: &str = "invalid_field_type";
const CODE_UNKNOWN_CATEGORY: &str = "unknown_category";
const CODE_NON_INTEGER_RATING: &str = "non_integer_rating";
const CODE_RATING_OUT_OF_RANGE: &str = "rating_out_of_range";
const CODE_FIELD_TOO_LONG: &str = "field_too_long";
const CODE_INVALID_BUSY_HOURS: &str = "invalid_busy_hours";

/// Checks the attribute set of one location. Every check runs, so a
/// single pass reports all problems with the record.
pub fn validate_properties(
    properties: &Field<PropertiesInput>,
    label: FeatureLabel,
    notices: &mut NoticeContainer,
) {
    let Some(properties) = properties.present() else {
        notices.push(label.error(
            CODE_INVALID_PROPERTIES,
            Some("properties"),
            "properties must be an object",
        ));
        return;
    };

    for (key, field) in properties.text_fields() {
        check_required_text(key, field, label, notices);
    }

    if let Some(category) = non_empty(&properties.category) {
        if category.parse::<Category>().is_err() {
            notices.push(
                label
                    .error(
                        CODE_UNKNOWN_CATEGORY,
                        Some(keys::CATEGORY),
                        format!(
                            "{} '{}' is not valid. Allowed categories: {}",
                            keys::CATEGORY,
                            category,
                            Category::allowed_list()
                        ),
                    )
                    .with_context_field("value", category),
            );
        }
    }

    for (key, field) in properties.rating_fields() {
        check_rating(key, field, label, notices);
    }

    check_length(keys::NAME, &properties.name, MAX_NAME_LENGTH, label, notices);
    check_length(
        keys::ADDRESS,
        &properties.address,
        MAX_ADDRESS_LENGTH,
        label,
        notices,
    );

    if let Some(busy_hours) = non_empty(&properties.busy_hours) {
        if !BusyHours::is_well_formed(busy_hours) {
            notices.push(
                label
                    .error(
                        CODE_INVALID_BUSY_HOURS,
                        Some(keys::BUSY_HOURS),
                        format!(
                            "{} has an invalid format. Example: \"06:00 - 10:00\" or \"06:00 - 10:00 & 16:00 - 20:00\"",
                            keys::BUSY_HOURS
                        ),
                    )
                    .with_context_field("value", busy_hours),
            );
        }
    }
}

/// Follow-up checks only look at text that is actually there.
fn non_empty(field: &Field<String>) -> Option<&str> {
    field
        .present()
        .map(String::as_str)
        .filter(|text| !text.is_empty())
}

fn check_required_text(
    key: &'static str,
    field: &Field<String>,
    label: FeatureLabel,
    notices: &mut NoticeContainer,
) {
    match field {
        Field::Missing | Field::Null => notices.push(must_not_be_empty(key, label)),
        Field::Invalid(_) => notices.push(label.error(
            CODE_INVALID_FIELD_TYPE,
            Some(key),
            format!("{} must be text", key),
        )),
        Field::Present(text) if text.trim().is_empty() => {
            notices.push(must_not_be_empty(key, label))
        }
        Field::Present(_) => {}
    }
}

fn must_not_be_empty(key: &'static str, label: FeatureLabel) -> crate::ValidationNotice {
    label.error(
        CODE_MISSING_REQUIRED_FIELD,
        Some(key),
        format!("{} must not be empty", key),
    )
}

fn check_rating(
    key: &'static str,
    field: &Field<f64>,
    label: FeatureLabel,
    notices: &mut NoticeContainer,
) {
    let value = match field {
        Field::Missing | Field::Null => {
            notices.push(must_not_be_empty(key, label));
            return;
        }
        Field::Present(value) if value.is_finite() => *value,
        Field::Present(_) | Field::Invalid(_) => {
            notices.push(label.error(
                CODE_INVALID_FIELD_TYPE,
                Some(key),
                format!("{} must be a number", key),
            ));
            return;
        }
    };

    if value.fract() != 0.0 {
        notices.push(
            label
                .error(
                    CODE_NON_INTEGER_RATING,
                    Some(key),
                    format!("{} must be a whole number", key),
                )
                .with_context_field("value", value),
        );
    } else if value < MIN_RATING as f64 || value > MAX_RATING as f64 {
        notices.push(
            label
                .error(
                    CODE_RATING_OUT_OF_RANGE,
                    Some(key),
                    format!("{} must be between {} and {}", key, MIN_RATING, MAX_RATING),
                )
                .with_context_field("value", value),
        );
    }
}

fn check_length(
    key: &'static str,
    field: &Field<String>,
    max: usize,
    label: FeatureLabel,
    notices: &mut NoticeContainer,
) {
    let Some(text) = non_empty(field) else {
        return;
    };
    // UTF-16 code units, so astral characters count twice.
    let length = text.encode_utf16().count();
    if length > max {
        notices.push(
            label
                .error(
                    CODE_FIELD_TOO_LONG,
                    Some(key),
                    format!("{} is too long (maximum {} characters)", key, max),
                )
                .with_context_field("length", length),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};

    fn valid_properties() -> PropertiesInput {
        PropertiesInput {
            name: Field::Present("Pangkalan Stasiun Tugu".to_string()),
            category: Field::Present("Stasiun".to_string()),
            busy_hours: Field::Present("06:00 - 10:00 & 16:00 - 20:00".to_string()),
            density_level: Field::Present(4.0),
            security_level: Field::Present(3.0),
            internet_access: Field::Present(5.0),
            comfort_level: Field::Present(2.0),
            facilities: Field::Present("Warung, toilet".to_string()),
            address: Field::Present("Jl. Mangkubumi, Yogyakarta".to_string()),
            other: Map::new(),
        }
    }

    fn errors_for(properties: PropertiesInput) -> Vec<String> {
        let mut notices = NoticeContainer::new();
        validate_properties(
            &Field::Present(properties),
            FeatureLabel::new(2),
            &mut notices,
        );
        notices.iter().map(|notice| notice.message.clone()).collect()
    }

    #[test]
    fn accepts_complete_record() {
        assert!(errors_for(valid_properties()).is_empty());
    }

    #[test]
    fn properties_must_be_an_object() {
        let mut notices = NoticeContainer::new();
        validate_properties(
            &Field::Invalid(json!([1])),
            FeatureLabel::new(0),
            &mut notices,
        );
        assert_eq!(
            notices.messages(crate::NoticeSeverity::Error),
            vec!["Feature 1: properties must be an object"]
        );
    }

    #[test]
    fn density_out_of_range_is_reported_independently() {
        let mut properties = valid_properties();
        properties.density_level = Field::Present(7.0);
        properties.facilities = Field::Missing;
        assert_eq!(
            errors_for(properties),
            vec![
                "Feature 3: fasilitas must not be empty",
                "Feature 3: tingkat_kepadatan must be between 1 and 5",
            ]
        );
    }

    #[test]
    fn every_rating_problem_is_reported_in_one_pass() {
        let mut properties = valid_properties();
        properties.density_level = Field::Null;
        properties.security_level = Field::Invalid(json!("tinggi"));
        properties.internet_access = Field::Present(2.5);
        properties.comfort_level = Field::Present(0.0);
        assert_eq!(
            errors_for(properties),
            vec![
                "Feature 3: tingkat_kepadatan must not be empty",
                "Feature 3: tingkat_keamanan must be a number",
                "Feature 3: akses_internet must be a whole number",
                "Feature 3: kenyamanan must be between 1 and 5",
            ]
        );
    }

    #[test]
    fn text_fields_reject_blank_and_wrong_type() {
        let mut properties = valid_properties();
        properties.name = Field::Present("   ".to_string());
        properties.address = Field::Invalid(json!(12));
        assert_eq!(
            errors_for(properties),
            vec![
                "Feature 3: nama_lokasi must not be empty",
                "Feature 3: alamat must be text",
            ]
        );
    }

    #[test]
    fn unknown_category_lists_allowed_values() {
        let mut properties = valid_properties();
        properties.category = Field::Present("Restoran".to_string());
        let errors = errors_for(properties);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("'Restoran'"));
        assert!(errors[0].contains("Terminal, Minimarket, Perumahan, Mall"));

        let mut properties = valid_properties();
        properties.category = Field::Present("Mall".to_string());
        assert!(errors_for(properties).is_empty());
    }

    #[test]
    fn long_name_and_address_are_rejected() {
        let mut properties = valid_properties();
        properties.name = Field::Present("n".repeat(101));
        properties.address = Field::Present("a".repeat(201));
        assert_eq!(
            errors_for(properties),
            vec![
                "Feature 3: nama_lokasi is too long (maximum 100 characters)",
                "Feature 3: alamat is too long (maximum 200 characters)",
            ]
        );

        let mut properties = valid_properties();
        properties.name = Field::Present("n".repeat(100));
        properties.address = Field::Present("a".repeat(200));
        assert!(errors_for(properties).is_empty());
    }

    #[test]
    fn length_counts_utf16_units() {
        let mut properties = valid_properties();
        properties.name = Field::Present("\u{1F6F5}".repeat(60));
        assert_eq!(
            errors_for(properties),
            vec!["Feature 3: nama_lokasi is too long (maximum 100 characters)"]
        );

        let mut properties = valid_properties();
        properties.name = Field::Present("\u{1F6F5}".repeat(50));
        properties.address = Field::Present("é".repeat(200));
        assert!(errors_for(properties).is_empty());
    }

    #[test]
    fn busy_hours_format() {
        let mut properties = valid_properties();
        properties.busy_hours = Field::Present("6:00-10:00".to_string());
        let errors = errors_for(properties);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("Feature 3: jam_ramainya has an invalid format"));

        let mut properties = valid_properties();
        properties.busy_hours = Field::Present("06:00 - 10:00".to_string());
        assert!(errors_for(properties).is_empty());
    }
}
