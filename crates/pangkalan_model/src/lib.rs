use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;
pub const MAX_NAME_LENGTH: usize = 100;
pub const MAX_ADDRESS_LENGTH: usize = 200;
pub const EARTH_RADIUS_KM: f64 = 6371.0;
pub const MAX_LATITUDE: f64 = 90.0;
pub const MAX_LONGITUDE: f64 = 180.0;

/// Property keys as they appear in uploaded GeoJSON files.
pub mod keys {
    pub const NAME: &str = "nama_lokasi";
    pub const CATEGORY: &str = "jenis_lokasi";
    pub const BUSY_HOURS: &str = "jam_ramainya";
    pub const DENSITY_LEVEL: &str = "tingkat_kepadatan";
    pub const SECURITY_LEVEL: &str = "tingkat_keamanan";
    pub const INTERNET_ACCESS: &str = "akses_internet";
    pub const COMFORT_LEVEL: &str = "kenyamanan";
    pub const FACILITIES: &str = "fasilitas";
    pub const ADDRESS: &str = "alamat";
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ModelParseError {
    #[error("invalid time format: {0}")]
    InvalidTimeFormat(String),
    #[error("invalid busy hours format: {0}")]
    InvalidBusyHours(String),
    #[error("unknown location category: {0}")]
    UnknownCategory(String),
    #[error("rating {0} is outside 1-5")]
    RatingOutOfRange(i64),
    #[error("{0}")]
    PositionOutOfRange(String),
}

/// Wall-clock time written as `HH:MM`.
///
/// Only the digit count is enforced, so `99:99` is accepted as written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

impl TimeOfDay {
    pub fn new(hour: u8, minute: u8) -> Self {
        Self { hour, minute }
    }

    pub fn parse(value: &str) -> Result<Self, ModelParseError> {
        let trimmed = value.trim();
        let bytes = trimmed.as_bytes();
        if bytes.len() != 5 || bytes[2] != b':' {
            return Err(ModelParseError::InvalidTimeFormat(value.to_string()));
        }
        let hour = two_digits(&bytes[0..2])
            .ok_or_else(|| ModelParseError::InvalidTimeFormat(value.to_string()))?;
        let minute = two_digits(&bytes[3..5])
            .ok_or_else(|| ModelParseError::InvalidTimeFormat(value.to_string()))?;
        Ok(Self { hour, minute })
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }

    pub fn minutes_since_midnight(&self) -> u32 {
        self.hour as u32 * 60 + self.minute as u32
    }
}

fn two_digits(bytes: &[u8]) -> Option<u8> {
    match bytes {
        [a, b] if a.is_ascii_digit() && b.is_ascii_digit() => Some((a - b'0') * 10 + (b - b'0')),
        _ => None,
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TimeOfDayVisitor;

        impl<'de> Visitor<'de> for TimeOfDayVisitor {
            type Value = TimeOfDay;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("a time of day in HH:MM format")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<TimeOfDay, E> {
                TimeOfDay::parse(value).map_err(E::custom)
            }
        }

        deserializer.deserialize_str(TimeOfDayVisitor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeRange {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

impl TimeRange {
    /// Start is inclusive, end exclusive. A range whose end precedes its
    /// start runs past midnight.
    pub fn contains(&self, time: TimeOfDay) -> bool {
        let start = self.start.minutes_since_midnight();
        let end = self.end.minutes_since_midnight();
        let at = time.minutes_since_midnight();
        if start <= end {
            at >= start && at < end
        } else {
            at >= start || at < end
        }
    }
}

const BUSY_HOURS_PATTERN: &str =
    r"^([0-9]{2}:[0-9]{2}\s*-\s*[0-9]{2}:[0-9]{2})(\s*&\s*[0-9]{2}:[0-9]{2}\s*-\s*[0-9]{2}:[0-9]{2})*$";
const BUSY_CLAUSE_PATTERN: &str = r"([0-9]{2}:[0-9]{2})\s*-\s*([0-9]{2}:[0-9]{2})";

/// `None` only if the pattern fails to compile; every busy-hours value is
/// then treated as malformed.
fn busy_hours_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(BUSY_HOURS_PATTERN).ok())
        .as_ref()
}

fn busy_clause_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(BUSY_CLAUSE_PATTERN).ok())
        .as_ref()
}

/// Busy-hours text such as `06:00 - 10:00 & 16:00 - 20:00`.
///
/// The original text is kept so that re-serialization writes back exactly
/// what was uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusyHours {
    text: String,
    ranges: Vec<TimeRange>,
}

impl BusyHours {
    pub fn is_well_formed(value: &str) -> bool {
        busy_hours_pattern().is_some_and(|pattern| pattern.is_match(value))
    }

    pub fn parse(value: &str) -> Result<Self, ModelParseError> {
        let clause = busy_clause_pattern()
            .filter(|_| Self::is_well_formed(value))
            .ok_or_else(|| ModelParseError::InvalidBusyHours(value.to_string()))?;
        let mut ranges = Vec::new();
        for captures in clause.captures_iter(value) {
            let start = TimeOfDay::parse(&captures[1])?;
            let end = TimeOfDay::parse(&captures[2])?;
            ranges.push(TimeRange { start, end });
        }
        Ok(Self {
            text: value.to_string(),
            ranges,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn ranges(&self) -> &[TimeRange] {
        &self.ranges
    }

    pub fn is_busy_at(&self, time: TimeOfDay) -> bool {
        self.ranges.iter().any(|range| range.contains(time))
    }
}

impl fmt::Display for BusyHours {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl Serialize for BusyHours {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.text)
    }
}

impl<'de> Deserialize<'de> for BusyHours {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct BusyHoursVisitor;

        impl<'de> Visitor<'de> for BusyHoursVisitor {
            type Value = BusyHours;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("busy hours like \"06:00 - 10:00 & 16:00 - 20:00\"")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<BusyHours, E> {
                BusyHours::parse(value).map_err(E::custom)
            }
        }

        deserializer.deserialize_str(BusyHoursVisitor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Terminal,
    Minimarket,
    Perumahan,
    Mall,
    Stasiun,
    PinggirJalan,
    Universitas,
    Mesjid,
    Spbu,
    Sekolah,
    Bank,
    Warkop,
    Cafe,
}

impl Category {
    pub const ALL: [Category; 13] = [
        Category::Terminal,
        Category::Minimarket,
        Category::Perumahan,
        Category::Mall,
        Category::Stasiun,
        Category::PinggirJalan,
        Category::Universitas,
        Category::Mesjid,
        Category::Spbu,
        Category::Sekolah,
        Category::Bank,
        Category::Warkop,
        Category::Cafe,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Terminal => "Terminal",
            Category::Minimarket => "Minimarket",
            Category::Perumahan => "Perumahan",
            Category::Mall => "Mall",
            Category::Stasiun => "Stasiun",
            Category::PinggirJalan => "Pinggir jalan",
            Category::Universitas => "Universitas",
            Category::Mesjid => "Mesjid",
            Category::Spbu => "SPBU",
            Category::Sekolah => "Sekolah",
            Category::Bank => "Bank",
            Category::Warkop => "Warkop",
            Category::Cafe => "Cafe",
        }
    }

    /// Allowed values joined with `, ` for diagnostics.
    pub fn allowed_list() -> String {
        Self::ALL
            .iter()
            .map(Category::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Colour name used for the map marker border and icon.
    pub fn icon_color(&self) -> &'static str {
        match self {
            Category::Terminal => "red",
            Category::Minimarket => "blue",
            Category::Perumahan => "green",
            Category::Mall => "purple",
            Category::Stasiun => "yellow",
            Category::PinggirJalan => "orange",
            Category::Universitas => "indigo",
            Category::Mesjid => "emerald",
            Category::Spbu => "rose",
            Category::Sekolah => "cyan",
            Category::Bank => "amber",
            Category::Warkop | Category::Cafe => "brown",
        }
    }
}

impl FromStr for Category {
    type Err = ModelParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .iter()
            .copied()
            .find(|category| category.as_str() == value)
            .ok_or_else(|| ModelParseError::UnknownCategory(value.to_string()))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CategoryVisitor;

        impl<'de> Visitor<'de> for CategoryVisitor {
            type Value = Category;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("one of the allowed location categories")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Category, E> {
                value.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_str(CategoryVisitor)
    }
}

/// Whole-number score from 1 to 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub fn new(value: i64) -> Result<Self, ModelParseError> {
        if (MIN_RATING as i64..=MAX_RATING as i64).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(ModelParseError::RatingOutOfRange(value))
        }
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Rating {
    type Error = ModelParseError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Rating::new(value)
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Text colour class for a density marker. Anything outside 1-5 is gray.
pub fn density_marker_class(density: i64) -> &'static str {
    match density {
        5 => "text-red-500",
        4 => "text-orange-500",
        3 => "text-yellow-500",
        2 => "text-green-500",
        1 => "text-blue-500",
        _ => "text-gray-500",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Rejects positions off the globe, including non-finite values.
    pub fn checked(lat: f64, lng: f64) -> Result<Self, ModelParseError> {
        if !(-MAX_LATITUDE..=MAX_LATITUDE).contains(&lat) {
            return Err(ModelParseError::PositionOutOfRange(format!(
                "latitude must be between -{} and {}",
                MAX_LATITUDE, MAX_LATITUDE
            )));
        }
        if !(-MAX_LONGITUDE..=MAX_LONGITUDE).contains(&lng) {
            return Err(ModelParseError::PositionOutOfRange(format!(
                "longitude must be between -{} and {}",
                MAX_LONGITUDE, MAX_LONGITUDE
            )));
        }
        Ok(Self { lat, lng })
    }

    /// Great-circle distance in kilometres.
    pub fn distance_km(&self, other: &LatLng) -> f64 {
        let lat1_rad = self.lat.to_radians();
        let lat2_rad = other.lat.to_radians();
        let delta_lat = (other.lat - self.lat).to_radians();
        let delta_lng = (other.lng - self.lng).to_radians();

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        EARTH_RADIUS_KM * c
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lng: f64,
    pub max_lng: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// Rough bounds of Indonesia.
    pub const INDONESIA: BoundingBox = BoundingBox {
        min_lng: 95.0,
        max_lng: 141.0,
        min_lat: -11.0,
        max_lat: 6.0,
    };

    pub fn contains(&self, lng: f64, lat: f64) -> bool {
        lng >= self.min_lng && lng <= self.max_lng && lat >= self.min_lat && lat <= self.max_lat
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CollectionKind {
    #[default]
    FeatureCollection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FeatureKind {
    #[default]
    Feature,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GeometryKind {
    #[default]
    Point,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointGeometry {
    #[serde(rename = "type")]
    pub kind: GeometryKind,
    /// `[longitude, latitude]`
    pub coordinates: [f64; 2],
}

impl PointGeometry {
    pub fn new(lng: f64, lat: f64) -> Self {
        Self {
            kind: GeometryKind::Point,
            coordinates: [lng, lat],
        }
    }

    pub fn lng(&self) -> f64 {
        self.coordinates[0]
    }

    pub fn lat(&self) -> f64 {
        self.coordinates[1]
    }

    pub fn position(&self) -> LatLng {
        LatLng::new(self.lat(), self.lng())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationAttributes {
    #[serde(rename = "nama_lokasi")]
    pub name: String,
    #[serde(rename = "jenis_lokasi")]
    pub category: Category,
    #[serde(rename = "jam_ramainya")]
    pub busy_hours: BusyHours,
    #[serde(rename = "tingkat_kepadatan")]
    pub density_level: Rating,
    #[serde(rename = "tingkat_keamanan")]
    pub security_level: Rating,
    #[serde(rename = "akses_internet")]
    pub internet_access: Rating,
    #[serde(rename = "kenyamanan")]
    pub comfort_level: Rating,
    #[serde(rename = "fasilitas")]
    pub facilities: String,
    #[serde(rename = "alamat")]
    pub address: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
    #[serde(rename = "type")]
    pub kind: FeatureKind,
    pub properties: LocationAttributes,
    pub geometry: PointGeometry,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl LocationRecord {
    pub fn new(properties: LocationAttributes, geometry: PointGeometry) -> Self {
        Self {
            kind: FeatureKind::Feature,
            properties,
            geometry,
            extra: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.properties.name
    }

    pub fn position(&self) -> LatLng {
        self.geometry.position()
    }
}

/// A collection of locations in display order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationDocument {
    #[serde(rename = "type")]
    pub kind: CollectionKind,
    pub features: Vec<LocationRecord>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl LocationDocument {
    pub fn new(features: Vec<LocationRecord>) -> Self {
        Self {
            kind: CollectionKind::FeatureCollection,
            features,
            extra: BTreeMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LocationRecord> {
        self.features.iter()
    }
}
