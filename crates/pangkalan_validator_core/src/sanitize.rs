use pangkalan_model::{MAX_RATING, MIN_RATING};

use crate::document::{DocumentInput, Field, PropertiesInput};

/// Returns a normalized copy of `document`: text members trimmed, ratings
/// rounded and clamped to 1-5. Members that are missing or of the wrong
/// type are copied as they are. Meant for documents that already passed
/// validation.
pub fn sanitize(document: &DocumentInput) -> DocumentInput {
    let mut sanitized = document.clone();
    for feature in &mut sanitized.features {
        let Field::Present(feature) = feature else {
            continue;
        };
        if let Field::Present(properties) = &mut feature.properties {
            sanitize_properties(properties);
        }
    }
    sanitized
}

fn sanitize_properties(properties: &mut PropertiesInput) {
    for (_, field) in properties.text_fields_mut() {
        if let Field::Present(text) = field {
            let trimmed = text.trim();
            if trimmed.len() != text.len() {
                *text = trimmed.to_string();
            }
        }
    }
    for (_, field) in properties.rating_fields_mut() {
        if let Field::Present(value) = field {
            *value = value.round().clamp(MIN_RATING as f64, MAX_RATING as f64);
        }
    }
}
