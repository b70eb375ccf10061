use serde::{Deserialize, Serialize};

use crate::geo::LatLng;

pub const DEFAULT_POI_IMAGE: &str = "https://cdn-icons-png.freepik.com/512/5088/5088218.png";

/// A named, pictured place on campus the user can navigate to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointOfInterest {
    pub title: String,
    pub image: String,
    pub coordinates: LatLng,
}

impl PointOfInterest {
    pub fn new(title: impl Into<String>, image: impl Into<String>, coordinates: LatLng) -> Self {
        Self {
            title: title.into(),
            image: image.into(),
            coordinates,
        }
    }
}

/// Built-in campus locations.
pub fn campus_points() -> Vec<PointOfInterest> {
    vec![
        PointOfInterest::new(
            "Architecture block",
            DEFAULT_POI_IMAGE,
            LatLng::new(12.860478, 77.438711),
        ),
        PointOfInterest::new(
            "Devadhan hALL",
            DEFAULT_POI_IMAGE,
            LatLng::new(12.860448, 77.439469),
        ),
    ]
}
