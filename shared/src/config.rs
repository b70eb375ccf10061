use serde::{Deserialize, Serialize};

use crate::geo::{LatLng, MAX_TILE_ZOOM};
use crate::poi::{PointOfInterest, campus_points};
use crate::reconciler::CommitPolicy;
use crate::routing::{DEFAULT_ROUTING_URL, RouteProfile};

pub const OSM_TILE_URL: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";
pub const OSM_ATTRIBUTION: &str =
    r#"&copy; <a href="http://osm.org/copyright">OpenStreetMap</a> contributors"#;

/// Page-level settings for the map widget. Every field has a default, so a
/// partial JSON document only overrides what it names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub tile_url: String,
    pub tile_subdomains: String,
    /// HTML shown in the attribution corner.
    pub attribution: String,
    pub min_zoom: u8,
    pub max_zoom: u8,
    pub initial_center: LatLng,
    pub initial_zoom: f64,
    pub commit_interval_ms: u32,
    pub commit_policy: CommitPolicy,
    pub routing_url: String,
    pub route_profile: RouteProfile,
    /// Follow the device with a watch subscription instead of a single fix.
    pub track_position: bool,
    pub points: Vec<PointOfInterest>,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            tile_url: OSM_TILE_URL.to_string(),
            tile_subdomains: "abc".to_string(),
            attribution: OSM_ATTRIBUTION.to_string(),
            min_zoom: 2,
            max_zoom: 19,
            initial_center: LatLng::new(12.860448, 77.439469),
            initial_zoom: 17.0,
            commit_interval_ms: 1_000,
            commit_policy: CommitPolicy::InteractionAndTick,
            routing_url: DEFAULT_ROUTING_URL.to_string(),
            route_profile: RouteProfile::Driving,
            track_position: false,
            points: campus_points(),
        }
    }
}

impl MapConfig {
    pub fn from_json(json: &str) -> Result<Self, String> {
        let config: Self = serde_json::from_str(json).map_err(|e| format!("parse error: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        if self.min_zoom > self.max_zoom {
            return Err(format!(
                "min_zoom {} exceeds max_zoom {}",
                self.min_zoom, self.max_zoom
            ));
        }
        if self.max_zoom > MAX_TILE_ZOOM {
            return Err(format!(
                "max_zoom {} exceeds the tile limit {MAX_TILE_ZOOM}",
                self.max_zoom
            ));
        }
        if self.commit_interval_ms == 0 {
            return Err("commit_interval_ms must be positive".into());
        }
        if !self.tile_url.contains("{z}")
            || !self.tile_url.contains("{x}")
            || !self.tile_url.contains("{y}")
        {
            return Err(format!("tile_url lacks {{z}}/{{x}}/{{y}}: {}", self.tile_url));
        }
        Ok(())
    }
}
