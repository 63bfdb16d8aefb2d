//! Geocoding quality statistics
//!
//! Companies whose geocoding failed were stored either without
//! coordinates or at the center of their city. Both show up here as
//! candidates for re-geocoding.

use crate::models::Parent;
use serde::Serialize;

/// Both axes must be within this distance to count as the same point
pub const COORDINATE_TOLERANCE: f64 = 0.0001;

/// Fallback location assigned when a Tbilisi address could not be resolved
pub const DEFAULT_CITY_CENTER: CityCenter = CityCenter::new("Tbilisi", 41.7151, 44.8271);

/// Fallback locations for other cities
pub const OTHER_CITY_CENTERS: [CityCenter; 5] = [
    CityCenter::new("Kutaisi", 42.2488, 42.6966),
    CityCenter::new("Telavi", 41.9186, 45.4778),
    CityCenter::new("Ozurgeti", 41.8442, 41.8552),
    CityCenter::new("Mtskheta", 42.0868, 44.6002),
    CityCenter::new("Rustavi", 41.5502, 45.0011),
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CityCenter {
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
}

impl CityCenter {
    pub const fn new(name: &'static str, lat: f64, lng: f64) -> Self {
        Self { name, lat, lng }
    }

    fn matches(&self, lat: f64, lng: f64) -> bool {
        (lat - self.lat).abs() < COORDINATE_TOLERANCE && (lng - self.lng).abs() < COORDINATE_TOLERANCE
    }
}

/// Quality class of one company's coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GeoClass {
    /// Latitude or longitude missing
    Missing,
    /// At the Tbilisi fallback point
    DefaultCityCenter,
    /// At another city's fallback point
    OtherCityCenter,
    Exact,
}

pub fn classify(lat: Option<f64>, lng: Option<f64>) -> GeoClass {
    match (lat, lng) {
        (Some(lat), Some(lng)) => {
            if DEFAULT_CITY_CENTER.matches(lat, lng) {
                GeoClass::DefaultCityCenter
            } else if OTHER_CITY_CENTERS.iter().any(|c| c.matches(lat, lng)) {
                GeoClass::OtherCityCenter
            } else {
                GeoClass::Exact
            }
        }
        _ => GeoClass::Missing,
    }
}

/// Counts per [`GeoClass`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GeocodingStats {
    pub total: usize,
    pub exact: usize,
    pub default_city_center: usize,
    pub other_city_center: usize,
    pub missing: usize,
}

impl GeocodingStats {
    pub fn compute(parents: &[Parent]) -> Self {
        let mut stats = Self {
            total: parents.len(),
            ..Default::default()
        };

        for parent in parents {
            match classify(parent.lat, parent.lng) {
                GeoClass::Missing => stats.missing += 1,
                GeoClass::DefaultCityCenter => stats.default_city_center += 1,
                GeoClass::OtherCityCenter => stats.other_city_center += 1,
                GeoClass::Exact => stats.exact += 1,
            }
        }

        stats
    }

    pub fn with_coordinates(&self) -> usize {
        self.total - self.missing
    }

    pub fn city_centers(&self) -> usize {
        self.default_city_center + self.other_city_center
    }

    /// Companies that would benefit from re-geocoding
    pub fn improvable(&self) -> usize {
        self.city_centers() + self.missing
    }

    /// `count` as a percentage of the total, 0 for an empty set
    pub fn percent(&self, count: usize) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            count as f64 * 100.0 / self.total as f64
        }
    }
}
