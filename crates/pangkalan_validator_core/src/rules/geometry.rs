use pangkalan_model::{BoundingBox, MAX_LATITUDE, MAX_LONGITUDE};

use crate::document::{Field, GeometryInput, POINT_TYPE};
use crate::rules::FeatureLabel;
use crate::{region_bounds, NoticeContainer};

const CODE_MISSING_GEOMETRY: &str = "missing_geometry";
const CODE_INVALID_GEOMETRY_TYPE: &str = "invalid_geometry_type";
const CODE_INVALID_COORDINATES: &str = "invalid_coordinates";
const CODE_COORDINATE_COUNT_MISMATCH: &str = "coordinate_count_mismatch";
const CODE_INVALID_LONGITUDE: &str = "invalid_longitude";
const CODE_LONGITUDE_OUT_OF_RANGE: &str = "longitude_out_of_range";
const CODE_INVALID_LATITUDE: &str = "invalid_latitude";
const CODE_LATITUDE_OUT_OF_RANGE: &str = "latitude_out_of_range";
const CODE_OUTSIDE_REGION: &str = "coordinates_outside_region";

const GEOMETRY_FIELD: &str = "geometry";
const COORDINATES_FIELD: &str = "coordinates";

/// Checks a single point geometry. Shape problems stop at the first
/// failure; once there are two coordinates, both axes are always checked.
pub fn validate_geometry(
    geometry: &Field<GeometryInput>,
    label: FeatureLabel,
    notices: &mut NoticeContainer,
) {
    let geometry = match geometry {
        Field::Missing | Field::Null => {
            notices.push(label.error(
                CODE_MISSING_GEOMETRY,
                Some(GEOMETRY_FIELD),
                "geometry must not be empty",
            ));
            return;
        }
        Field::Invalid(_) => {
            notices.push(invalid_type(label));
            return;
        }
        Field::Present(geometry) => geometry,
    };

    if geometry.kind.present().map(String::as_str) != Some(POINT_TYPE) {
        notices.push(invalid_type(label));
        return;
    }

    let Some(coordinates) = geometry.coordinates.present() else {
        notices.push(label.error(
            CODE_INVALID_COORDINATES,
            Some(COORDINATES_FIELD),
            "coordinates must be an array",
        ));
        return;
    };

    let [lng, lat] = coordinates.as_slice() else {
        notices.push(
            label
                .error(
                    CODE_COORDINATE_COUNT_MISMATCH,
                    Some(COORDINATES_FIELD),
                    "coordinates must contain 2 elements [longitude, latitude]",
                )
                .with_context_field("count", coordinates.len()),
        );
        return;
    };

    let lng = check_axis(lng, Axis::Longitude, label, notices);
    let lat = check_axis(lat, Axis::Latitude, label, notices);

    if let (Some(lng), Some(lat), Some(bounds)) = (lng, lat, region_bounds()) {
        if !bounds.contains(lng, lat) {
            notices.push(
                label
                    .error(
                        CODE_OUTSIDE_REGION,
                        Some(COORDINATES_FIELD),
                        format!("coordinates are outside {}", region_name(&bounds)),
                    )
                    .with_context_field("longitude", lng)
                    .with_context_field("latitude", lat),
            );
        }
    }
}

fn invalid_type(label: FeatureLabel) -> crate::ValidationNotice {
    label.error(
        CODE_INVALID_GEOMETRY_TYPE,
        Some(GEOMETRY_FIELD),
        format!("geometry type must be '{}'", POINT_TYPE),
    )
}

fn region_name(bounds: &BoundingBox) -> String {
    if *bounds == BoundingBox::INDONESIA {
        "the Indonesia region".to_string()
    } else {
        format!(
            "the allowed region (longitude {} to {}, latitude {} to {})",
            bounds.min_lng, bounds.max_lng, bounds.min_lat, bounds.max_lat
        )
    }
}

#[derive(Clone, Copy)]
enum Axis {
    Longitude,
    Latitude,
}

impl Axis {
    fn name(self) -> &'static str {
        match self {
            Axis::Longitude => "longitude",
            Axis::Latitude => "latitude",
        }
    }

    fn limit(self) -> f64 {
        match self {
            Axis::Longitude => MAX_LONGITUDE,
            Axis::Latitude => MAX_LATITUDE,
        }
    }
}

/// Returns the value when it is a usable number, even if out of range, so
/// the region check still runs.
fn check_axis(
    value: &Field<f64>,
    axis: Axis,
    label: FeatureLabel,
    notices: &mut NoticeContainer,
) -> Option<f64> {
    let number = value.present().copied().filter(|number| number.is_finite());
    let Some(number) = number else {
        let code = match axis {
            Axis::Longitude => CODE_INVALID_LONGITUDE,
            Axis::Latitude => CODE_INVALID_LATITUDE,
        };
        notices.push(label.error(
            code,
            Some(COORDINATES_FIELD),
            format!("{} must be a number", axis.name()),
        ));
        return None;
    };

    let limit = axis.limit();
    if number < -limit || number > limit {
        let code = match axis {
            Axis::Longitude => CODE_LONGITUDE_OUT_OF_RANGE,
            Axis::Latitude => CODE_LATITUDE_OUT_OF_RANGE,
        };
        notices.push(
            label
                .error(
                    code,
                    Some(COORDINATES_FIELD),
                    format!("{} must be between -{} and {}", axis.name(), limit, limit),
                )
                .with_context_field(axis.name(), number),
        );
    }
    Some(number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::set_region_bounds;
    use serde_json::{json, Map};

    fn point(coordinates: Vec<Field<f64>>) -> Field<GeometryInput> {
        Field::Present(GeometryInput {
            kind: Field::Present("Point".to_string()),
            coordinates: Field::Present(coordinates),
            other: Map::new(),
        })
    }

    fn errors_for(geometry: &Field<GeometryInput>) -> Vec<String> {
        let mut notices = NoticeContainer::new();
        validate_geometry(geometry, FeatureLabel::new(0), &mut notices);
        notices.iter().map(|notice| notice.message.clone()).collect()
    }

    #[test]
    fn accepts_point_on_region_boundary() {
        let geometry = point(vec![Field::Present(141.0), Field::Present(6.0)]);
        assert!(errors_for(&geometry).is_empty());
    }

    #[test]
    fn rejects_point_just_outside_region() {
        let geometry = point(vec![Field::Present(141.1), Field::Present(0.0)]);
        assert_eq!(
            errors_for(&geometry),
            vec!["Feature 1: coordinates are outside the Indonesia region"]
        );
    }

    #[test]
    fn missing_geometry_is_an_error() {
        assert_eq!(
            errors_for(&Field::Missing),
            vec!["Feature 1: geometry must not be empty"]
        );
        assert_eq!(
            errors_for(&Field::Null),
            vec!["Feature 1: geometry must not be empty"]
        );
    }

    #[test]
    fn non_point_geometry_is_rejected() {
        let geometry = Field::Present(GeometryInput {
            kind: Field::Present("LineString".to_string()),
            coordinates: Field::Missing,
            other: Map::new(),
        });
        assert_eq!(
            errors_for(&geometry),
            vec!["Feature 1: geometry type must be 'Point'"]
        );
        assert_eq!(
            errors_for(&Field::Invalid(json!("point"))),
            vec!["Feature 1: geometry type must be 'Point'"]
        );
    }

    #[test]
    fn coordinates_must_be_a_pair() {
        let geometry = Field::Present(GeometryInput {
            kind: Field::Present("Point".to_string()),
            coordinates: Field::Invalid(json!("106,-6")),
            other: Map::new(),
        });
        assert_eq!(
            errors_for(&geometry),
            vec!["Feature 1: coordinates must be an array"]
        );

        let triple = point(vec![
            Field::Present(106.0),
            Field::Present(-6.0),
            Field::Present(10.0),
        ]);
        assert_eq!(
            errors_for(&triple),
            vec!["Feature 1: coordinates must contain 2 elements [longitude, latitude]"]
        );
    }

    #[test]
    fn non_numeric_axis_skips_region_check() {
        let geometry = point(vec![Field::Invalid(json!("106")), Field::Present(50.0)]);
        assert_eq!(
            errors_for(&geometry),
            vec!["Feature 1: longitude must be a number"]
        );
    }

    #[test]
    fn out_of_range_axis_also_fails_region_check() {
        let geometry = point(vec![Field::Present(200.0), Field::Present(-95.0)]);
        assert_eq!(
            errors_for(&geometry),
            vec![
                "Feature 1: longitude must be between -180 and 180",
                "Feature 1: latitude must be between -90 and 90",
                "Feature 1: coordinates are outside the Indonesia region",
            ]
        );
    }

    #[test]
    fn region_check_can_be_disabled() {
        let _guard = set_region_bounds(None);
        let geometry = point(vec![Field::Present(2.35), Field::Present(48.85)]);
        assert!(errors_for(&geometry).is_empty());
    }
}
