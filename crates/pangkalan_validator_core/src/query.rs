//! Read-only views over an accepted document: search, filtering, map
//! centring and distance ranking.

use serde::{Deserialize, Serialize};

use pangkalan_model::{Category, LatLng, LocationDocument, LocationRecord, TimeOfDay};

/// Map centre used when there is nothing to average (Monas, Jakarta).
pub const DEFAULT_CENTER: LatLng = LatLng {
    lat: -6.2088,
    lng: 106.8456,
};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LocationFilter {
    /// Case-insensitive substring of the name or address.
    pub search: Option<String>,
    /// Empty means every category.
    pub categories: Vec<Category>,
    pub min_density: Option<u8>,
    pub max_density: Option<u8>,
    pub busy_at: Option<TimeOfDay>,
}

impl LocationFilter {
    pub fn matches(&self, record: &LocationRecord) -> bool {
        let properties = &record.properties;

        if let Some(needle) = self
            .search
            .as_deref()
            .map(str::trim)
            .filter(|needle| !needle.is_empty())
        {
            let needle = needle.to_lowercase();
            if !properties.name.to_lowercase().contains(&needle)
                && !properties.address.to_lowercase().contains(&needle)
            {
                return false;
            }
        }

        if !self.categories.is_empty() && !self.categories.contains(&properties.category) {
            return false;
        }

        let density = properties.density_level.value();
        if self.min_density.is_some_and(|min| density < min) {
            return false;
        }
        if self.max_density.is_some_and(|max| density > max) {
            return false;
        }

        match self.busy_at {
            Some(time) => properties.busy_hours.is_busy_at(time),
            None => true,
        }
    }

    /// Matching records in document order.
    pub fn apply<'a>(&self, document: &'a LocationDocument) -> Vec<&'a LocationRecord> {
        document.iter().filter(|record| self.matches(record)).collect()
    }
}

/// Categories present in the document, each once, in first-seen order.
pub fn unique_categories(document: &LocationDocument) -> Vec<Category> {
    let mut categories = Vec::new();
    for record in document.iter() {
        let category = record.properties.category;
        if !categories.contains(&category) {
            categories.push(category);
        }
    }
    categories
}

/// Arithmetic mean of all positions, or [`DEFAULT_CENTER`] for an empty
/// document.
pub fn map_center(document: &LocationDocument) -> LatLng {
    if document.is_empty() {
        return DEFAULT_CENTER;
    }
    let count = document.len() as f64;
    let (lat_sum, lng_sum) = document.iter().fold((0.0, 0.0), |(lat, lng), record| {
        (lat + record.geometry.lat(), lng + record.geometry.lng())
    });
    LatLng::new(lat_sum / count, lng_sum / count)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedLocation<'a> {
    /// Position of the record in the document.
    pub index: usize,
    pub record: &'a LocationRecord,
    pub distance_km: f64,
}

/// Every record ordered by distance from `origin`, nearest first. Ties keep
/// document order.
pub fn rank_by_distance(document: &LocationDocument, origin: LatLng) -> Vec<RankedLocation<'_>> {
    let mut ranked: Vec<_> = document
        .iter()
        .enumerate()
        .map(|(index, record)| RankedLocation {
            index,
            record,
            distance_km: origin.distance_km(&record.position()),
        })
        .collect();
    ranked.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    ranked
}

pub fn nearest(document: &LocationDocument, origin: LatLng) -> Option<RankedLocation<'_>> {
    rank_by_distance(document, origin).into_iter().next()
}
