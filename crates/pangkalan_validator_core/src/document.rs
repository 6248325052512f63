//! Boundary between untyped JSON and the validators.
//!
//! Every shape question ("is this an object", "is this member a string")
//! is answered here once. Validators and the sanitizer only ever look at
//! [`Field`] values.

use std::collections::BTreeMap;

use serde_json::{Map, Number, Value};

use pangkalan_model::{
    keys, BusyHours, Category, LocationAttributes, LocationDocument, LocationRecord,
    ModelParseError, PointGeometry, Rating,
};

pub const COLLECTION_TYPE: &str = "FeatureCollection";
pub const FEATURE_TYPE: &str = "Feature";
pub const POINT_TYPE: &str = "Point";

const TYPE_KEY: &str = "type";
const FEATURES_KEY: &str = "features";
const GEOMETRY_KEY: &str = "geometry";
const PROPERTIES_KEY: &str = "properties";
const COORDINATES_KEY: &str = "coordinates";

/// Failures that stop validation of the whole document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StructuralError {
    #[error("file is empty or unreadable")]
    Empty,
    #[error("file must be a valid JSON object")]
    NotAnObject,
    #[error("GeoJSON must be of type 'FeatureCollection'")]
    NotAFeatureCollection,
    #[error("property 'features' must be an array")]
    FeaturesNotAnArray,
    #[error("GeoJSON must contain at least one feature")]
    NoFeatures,
}

/// One JSON member as seen by the validators.
#[derive(Debug, Clone, PartialEq)]
pub enum Field<T> {
    Missing,
    Null,
    /// Present but of the wrong JSON type; the raw value is kept so it can
    /// be written back untouched.
    Invalid(Value),
    Present(T),
}

impl<T> Field<T> {
    pub fn present(&self) -> Option<&T> {
        match self {
            Field::Present(value) => Some(value),
            _ => None,
        }
    }

    fn write_into(&self, map: &mut Map<String, Value>, key: &str, to_value: impl Fn(&T) -> Value) {
        if let Some(value) = self.to_value(to_value) {
            map.insert(key.to_string(), value);
        }
    }

    fn to_value(&self, to_value: impl Fn(&T) -> Value) -> Option<Value> {
        match self {
            Field::Missing => None,
            Field::Null => Some(Value::Null),
            Field::Invalid(raw) => Some(raw.clone()),
            Field::Present(value) => Some(to_value(value)),
        }
    }
}

fn read_member<T>(
    map: &Map<String, Value>,
    key: &str,
    read: impl Fn(&Value) -> Option<T>,
) -> Field<T> {
    match map.get(key) {
        None => Field::Missing,
        Some(value) => read_value(value, read),
    }
}

fn read_value<T>(value: &Value, read: impl Fn(&Value) -> Option<T>) -> Field<T> {
    if value.is_null() {
        return Field::Null;
    }
    match read(value) {
        Some(parsed) => Field::Present(parsed),
        None => Field::Invalid(value.clone()),
    }
}

fn as_text(value: &Value) -> Option<String> {
    value.as_str().map(str::to_string)
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        _ => None,
    }
}

fn text_value(text: &String) -> Value {
    Value::String(text.clone())
}

/// Whole numbers are written as JSON integers.
pub(crate) fn number_value(number: &f64) -> Value {
    if number.is_finite() && number.fract() == 0.0 && number.abs() < 9.0e15 {
        Value::from(*number as i64)
    } else {
        Number::from_f64(*number)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

fn remaining_members(map: &Map<String, Value>, known: &[&str]) -> Map<String, Value> {
    map.iter()
        .filter(|(key, _)| !known.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentInput {
    pub features: Vec<Field<FeatureInput>>,
    pub other: Map<String, Value>,
}

impl DocumentInput {
    pub fn from_value(value: &Value) -> Result<Self, StructuralError> {
        let map = match value {
            Value::Null => return Err(StructuralError::Empty),
            Value::Object(map) => map,
            _ => return Err(StructuralError::NotAnObject),
        };
        if map.get(TYPE_KEY).and_then(Value::as_str) != Some(COLLECTION_TYPE) {
            return Err(StructuralError::NotAFeatureCollection);
        }
        let Some(features) = map.get(FEATURES_KEY).and_then(Value::as_array) else {
            return Err(StructuralError::FeaturesNotAnArray);
        };
        if features.is_empty() {
            return Err(StructuralError::NoFeatures);
        }

        Ok(Self {
            features: features
                .iter()
                .map(|feature| read_value(feature, FeatureInput::from_value))
                .collect(),
            other: remaining_members(map, &[TYPE_KEY, FEATURES_KEY]),
        })
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Location names of every feature that carries a string name, in
    /// collection order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.features.iter().filter_map(|feature| {
            feature
                .present()
                .and_then(|feature| feature.properties.present())
                .and_then(|properties| properties.name.present())
                .map(String::as_str)
        })
    }

    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert(TYPE_KEY.to_string(), Value::from(COLLECTION_TYPE));
        map.insert(
            FEATURES_KEY.to_string(),
            Value::Array(
                self.features
                    .iter()
                    .filter_map(|feature| feature.to_value(FeatureInput::to_value))
                    .collect(),
            ),
        );
        map.extend(self.other.clone());
        Value::Object(map)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureInput {
    pub kind: Field<String>,
    pub geometry: Field<GeometryInput>,
    pub properties: Field<PropertiesInput>,
    pub other: Map<String, Value>,
}

impl FeatureInput {
    fn from_value(value: &Value) -> Option<Self> {
        let map = value.as_object()?;
        Some(Self {
            kind: read_member(map, TYPE_KEY, as_text),
            geometry: read_member(map, GEOMETRY_KEY, GeometryInput::from_value),
            properties: read_member(map, PROPERTIES_KEY, PropertiesInput::from_value),
            other: remaining_members(map, &[TYPE_KEY, GEOMETRY_KEY, PROPERTIES_KEY]),
        })
    }

    pub fn is_feature(&self) -> bool {
        self.kind.present().map(String::as_str) == Some(FEATURE_TYPE)
    }

    fn to_value(&self) -> Value {
        let mut map = Map::new();
        self.kind.write_into(&mut map, TYPE_KEY, text_value);
        self.properties
            .write_into(&mut map, PROPERTIES_KEY, PropertiesInput::to_value);
        self.geometry
            .write_into(&mut map, GEOMETRY_KEY, GeometryInput::to_value);
        map.extend(self.other.clone());
        Value::Object(map)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeometryInput {
    pub kind: Field<String>,
    pub coordinates: Field<Vec<Field<f64>>>,
    pub other: Map<String, Value>,
}

impl GeometryInput {
    fn from_value(value: &Value) -> Option<Self> {
        let map = value.as_object()?;
        Some(Self {
            kind: read_member(map, TYPE_KEY, as_text),
            coordinates: read_member(map, COORDINATES_KEY, |value| {
                value.as_array().map(|items| {
                    items
                        .iter()
                        .map(|item| read_value(item, as_number))
                        .collect()
                })
            }),
            other: remaining_members(map, &[TYPE_KEY, COORDINATES_KEY]),
        })
    }

    fn to_value(&self) -> Value {
        let mut map = Map::new();
        self.kind.write_into(&mut map, TYPE_KEY, text_value);
        self.coordinates
            .write_into(&mut map, COORDINATES_KEY, |items| {
                Value::Array(
                    items
                        .iter()
                        .map(|item| item.to_value(number_value).unwrap_or(Value::Null))
                        .collect(),
                )
            });
        map.extend(self.other.clone());
        Value::Object(map)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertiesInput {
    pub name: Field<String>,
    pub category: Field<String>,
    pub busy_hours: Field<String>,
    pub density_level: Field<f64>,
    pub security_level: Field<f64>,
    pub internet_access: Field<f64>,
    pub comfort_level: Field<f64>,
    pub facilities: Field<String>,
    pub address: Field<String>,
    pub other: Map<String, Value>,
}

const PROPERTY_KEYS: [&str; 9] = [
    keys::NAME,
    keys::CATEGORY,
    keys::BUSY_HOURS,
    keys::DENSITY_LEVEL,
    keys::SECURITY_LEVEL,
    keys::INTERNET_ACCESS,
    keys::COMFORT_LEVEL,
    keys::FACILITIES,
    keys::ADDRESS,
];

impl PropertiesInput {
    fn from_value(value: &Value) -> Option<Self> {
        let map = value.as_object()?;
        Some(Self {
            name: read_member(map, keys::NAME, as_text),
            category: read_member(map, keys::CATEGORY, as_text),
            busy_hours: read_member(map, keys::BUSY_HOURS, as_text),
            density_level: read_member(map, keys::DENSITY_LEVEL, as_number),
            security_level: read_member(map, keys::SECURITY_LEVEL, as_number),
            internet_access: read_member(map, keys::INTERNET_ACCESS, as_number),
            comfort_level: read_member(map, keys::COMFORT_LEVEL, as_number),
            facilities: read_member(map, keys::FACILITIES, as_text),
            address: read_member(map, keys::ADDRESS, as_text),
            other: remaining_members(map, &PROPERTY_KEYS),
        })
    }

    /// Required text members in report order.
    pub fn text_fields(&self) -> [(&'static str, &Field<String>); 5] {
        [
            (keys::NAME, &self.name),
            (keys::CATEGORY, &self.category),
            (keys::BUSY_HOURS, &self.busy_hours),
            (keys::FACILITIES, &self.facilities),
            (keys::ADDRESS, &self.address),
        ]
    }

    pub fn text_fields_mut(&mut self) -> [(&'static str, &mut Field<String>); 5] {
        [
            (keys::NAME, &mut self.name),
            (keys::CATEGORY, &mut self.category),
            (keys::BUSY_HOURS, &mut self.busy_hours),
            (keys::FACILITIES, &mut self.facilities),
            (keys::ADDRESS, &mut self.address),
        ]
    }

    /// 1-5 rating members in report order.
    pub fn rating_fields(&self) -> [(&'static str, &Field<f64>); 4] {
        [
            (keys::DENSITY_LEVEL, &self.density_level),
            (keys::SECURITY_LEVEL, &self.security_level),
            (keys::INTERNET_ACCESS, &self.internet_access),
            (keys::COMFORT_LEVEL, &self.comfort_level),
        ]
    }

    pub fn rating_fields_mut(&mut self) -> [(&'static str, &mut Field<f64>); 4] {
        [
            (keys::DENSITY_LEVEL, &mut self.density_level),
            (keys::SECURITY_LEVEL, &mut self.security_level),
            (keys::INTERNET_ACCESS, &mut self.internet_access),
            (keys::COMFORT_LEVEL, &mut self.comfort_level),
        ]
    }

    fn to_value(&self) -> Value {
        let mut map = Map::new();
        self.name.write_into(&mut map, keys::NAME, text_value);
        self.category.write_into(&mut map, keys::CATEGORY, text_value);
        self.busy_hours
            .write_into(&mut map, keys::BUSY_HOURS, text_value);
        self.density_level
            .write_into(&mut map, keys::DENSITY_LEVEL, number_value);
        self.security_level
            .write_into(&mut map, keys::SECURITY_LEVEL, number_value);
        self.internet_access
            .write_into(&mut map, keys::INTERNET_ACCESS, number_value);
        self.comfort_level
            .write_into(&mut map, keys::COMFORT_LEVEL, number_value);
        self.facilities
            .write_into(&mut map, keys::FACILITIES, text_value);
        self.address.write_into(&mut map, keys::ADDRESS, text_value);
        map.extend(self.other.clone());
        Value::Object(map)
    }
}

/// Raised when a document that did not pass validation is converted into
/// the typed model.
#[derive(Debug, thiserror::Error)]
#[error("feature {position}: {field}: {reason}")]
pub struct ConversionError {
    /// One-based, matching the diagnostic labels.
    pub position: usize,
    pub field: &'static str,
    pub reason: String,
}

impl ConversionError {
    fn new(index: usize, field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            position: index + 1,
            field,
            reason: reason.into(),
        }
    }

    fn from_model(index: usize, field: &'static str, error: ModelParseError) -> Self {
        Self::new(index, field, error.to_string())
    }
}

impl TryFrom<&DocumentInput> for LocationDocument {
    type Error = ConversionError;

    fn try_from(input: &DocumentInput) -> Result<Self, Self::Error> {
        let mut features = Vec::with_capacity(input.features.len());
        for (index, feature) in input.features.iter().enumerate() {
            features.push(convert_feature(index, feature)?);
        }
        let mut document = LocationDocument::new(features);
        document.extra = to_btree(&input.other);
        Ok(document)
    }
}

fn to_btree(map: &Map<String, Value>) -> BTreeMap<String, Value> {
    map.iter()
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

fn convert_feature(
    index: usize,
    feature: &Field<FeatureInput>,
) -> Result<LocationRecord, ConversionError> {
    let feature = feature
        .present()
        .filter(|feature| feature.is_feature())
        .ok_or_else(|| ConversionError::new(index, TYPE_KEY, "not a Feature object"))?;

    let geometry = feature
        .geometry
        .present()
        .filter(|geometry| geometry.kind.present().map(String::as_str) == Some(POINT_TYPE))
        .ok_or_else(|| ConversionError::new(index, GEOMETRY_KEY, "not a Point geometry"))?;
    let coordinates = match geometry.coordinates.present().map(Vec::as_slice) {
        Some([Field::Present(lng), Field::Present(lat)]) => PointGeometry::new(*lng, *lat),
        _ => {
            return Err(ConversionError::new(
                index,
                COORDINATES_KEY,
                "expected [longitude, latitude]",
            ))
        }
    };

    let properties = feature
        .properties
        .present()
        .ok_or_else(|| ConversionError::new(index, PROPERTIES_KEY, "missing properties"))?;
    let text = |field: &Field<String>, key: &'static str| {
        field
            .present()
            .cloned()
            .ok_or_else(|| ConversionError::new(index, key, "missing text"))
    };
    let rating = |field: &Field<f64>, key: &'static str| {
        let value = field
            .present()
            .copied()
            .filter(|value| value.fract() == 0.0)
            .ok_or_else(|| ConversionError::new(index, key, "missing whole number"))?;
        Rating::new(value as i64).map_err(|err| ConversionError::from_model(index, key, err))
    };

    let category_text = text(&properties.category, keys::CATEGORY)?;
    let busy_hours_text = text(&properties.busy_hours, keys::BUSY_HOURS)?;
    let attributes = LocationAttributes {
        name: text(&properties.name, keys::NAME)?,
        category: category_text
            .parse::<Category>()
            .map_err(|err| ConversionError::from_model(index, keys::CATEGORY, err))?,
        busy_hours: BusyHours::parse(&busy_hours_text)
            .map_err(|err| ConversionError::from_model(index, keys::BUSY_HOURS, err))?,
        density_level: rating(&properties.density_level, keys::DENSITY_LEVEL)?,
        security_level: rating(&properties.security_level, keys::SECURITY_LEVEL)?,
        internet_access: rating(&properties.internet_access, keys::INTERNET_ACCESS)?,
        comfort_level: rating(&properties.comfort_level, keys::COMFORT_LEVEL)?,
        facilities: text(&properties.facilities, keys::FACILITIES)?,
        address: text(&properties.address, keys::ADDRESS)?,
        extra: to_btree(&properties.other),
    };

    let mut record = LocationRecord::new(attributes, coordinates);
    record.extra = to_btree(&feature.other);
    Ok(record)
}
