use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geo::LatLng;
use crate::selection::Waypoints;

pub const DEFAULT_ROUTING_URL: &str = "https://router.project-osrm.org/route/v1";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteProfile {
    #[default]
    Driving,
    Walking,
}

impl RouteProfile {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Driving => "driving",
            Self::Walking => "walking",
        }
    }
}

/// Build an OSRM `route` request URL. OSRM takes `lng,lat` pairs.
pub fn route_url(base: &str, profile: RouteProfile, waypoints: &Waypoints) -> String {
    format!(
        "{}/{}/{:.6},{:.6};{:.6},{:.6}?overview=full&geometries=geojson&steps=true",
        base.trim_end_matches('/'),
        profile.as_str(),
        waypoints.from.lng,
        waypoints.from.lat,
        waypoints.to.lng,
        waypoints.to.lat,
    )
}

/// A drawable route between two waypoints.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub path: Vec<LatLng>,
    pub distance_m: f64,
    pub duration_s: f64,
    /// Turn-by-turn itinerary, first step to arrival.
    pub steps: Vec<RouteStep>,
}

/// What the traveller does at the start of a step, as OSRM reports it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Maneuver {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub modifier: Option<String>,
    #[serde(default)]
    pub bearing_after: Option<f64>,
    /// Exit number for roundabouts and rotaries.
    #[serde(default)]
    pub exit: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteStep {
    pub maneuver: Maneuver,
    /// Road the step travels along; empty for unnamed ways.
    pub name: String,
    pub distance_m: f64,
    pub duration_s: f64,
}

impl RouteStep {
    /// Human-readable instruction, e.g. "Turn left onto Ring Road".
    pub fn instruction(&self) -> String {
        let m = &self.maneuver;
        let modifier = m.modifier.as_deref().unwrap_or("straight");
        let base = match m.kind.as_str() {
            "depart" => match m.bearing_after {
                Some(bearing) => format!("Head {}", compass_direction(bearing)),
                None => "Head out".to_string(),
            },
            "arrive" => return "You have arrived at your destination".to_string(),
            "roundabout" | "rotary" => match m.exit {
                Some(exit) => format!("Take the {} exit at the roundabout", ordinal(exit)),
                None => "Enter the roundabout".to_string(),
            },
            "turn" | "end of road" if modifier == "uturn" => "Make a U-turn".to_string(),
            "turn" | "end of road" => format!("Turn {modifier}"),
            "continue" | "new name" => {
                if modifier == "straight" {
                    "Continue".to_string()
                } else {
                    format!("Continue {modifier}")
                }
            }
            "fork" => format!("Keep {modifier} at the fork"),
            "merge" => format!("Merge {modifier}"),
            "on ramp" => format!("Take the ramp {modifier}"),
            "off ramp" => format!("Take the exit {modifier}"),
            other => format!("{} {modifier}", capitalize(other)),
        };
        if self.name.is_empty() {
            base
        } else if m.kind == "depart" {
            format!("{base} on {}", self.name)
        } else {
            format!("{base} onto {}", self.name)
        }
    }
}

fn compass_direction(bearing: f64) -> &'static str {
    const NAMES: [&str; 8] = [
        "north",
        "northeast",
        "east",
        "southeast",
        "south",
        "southwest",
        "west",
        "northwest",
    ];
    let idx = ((bearing.rem_euclid(360.0) + 22.5) / 45.0) as usize % NAMES.len();
    NAMES[idx]
}

fn ordinal(n: u32) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    Transport(String),
    Http(u16),
    Decode(String),
    /// The service answered but found nothing (`NoRoute`, `NoSegment`, ...).
    Service(String),
}

impl fmt::Display for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "fetch error: {e}"),
            Self::Http(status) => write!(f, "HTTP {status}"),
            Self::Decode(e) => write!(f, "parse error: {e}"),
            Self::Service(code) => write!(f, "routing service returned {code}"),
        }
    }
}

impl std::error::Error for RouteError {}

#[derive(Debug, Deserialize)]
struct OsrmResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    geometry: OsrmGeometry,
    distance: f64,
    duration: f64,
    #[serde(default)]
    legs: Vec<OsrmLeg>,
}

#[derive(Debug, Deserialize)]
struct OsrmLeg {
    #[serde(default)]
    steps: Vec<OsrmStep>,
}

#[derive(Debug, Deserialize)]
struct OsrmStep {
    maneuver: Maneuver,
    #[serde(default)]
    name: String,
    distance: f64,
    duration: f64,
}

#[derive(Debug, Deserialize)]
struct OsrmGeometry {
    coordinates: Vec<[f64; 2]>,
}

/// Decode the first route of an OSRM response body.
pub fn parse_route(body: &str) -> Result<Route, RouteError> {
    let resp: OsrmResponse =
        serde_json::from_str(body).map_err(|e| RouteError::Decode(e.to_string()))?;
    if resp.code != "Ok" {
        let detail = match resp.message {
            Some(msg) => format!("{} ({msg})", resp.code),
            None => resp.code,
        };
        return Err(RouteError::Service(detail));
    }
    let route = resp
        .routes
        .into_iter()
        .next()
        .ok_or_else(|| RouteError::Service("no routes".into()))?;
    let path = route
        .geometry
        .coordinates
        .into_iter()
        .map(|[lng, lat]| LatLng { lat, lng })
        .collect();
    let steps = route
        .legs
        .into_iter()
        .flat_map(|leg| leg.steps)
        .map(|step| RouteStep {
            maneuver: step.maneuver,
            name: step.name,
            distance_m: step.distance,
            duration_s: step.duration,
        })
        .collect();
    Ok(Route {
        path,
        distance_m: route.distance,
        duration_s: route.duration,
        steps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn waypoints() -> Waypoints {
        Waypoints {
            from: LatLng::new(12.86, 77.44),
            to: LatLng::new(12.860478, 77.438711),
        }
    }

    #[test]
    fn url_uses_lng_lat_order() {
        let url = route_url(DEFAULT_ROUTING_URL, RouteProfile::Driving, &waypoints());
        assert_eq!(
            url,
            "https://router.project-osrm.org/route/v1/driving/77.440000,12.860000;77.438711,12.860478?overview=full&geometries=geojson&steps=true"
        );
    }

    #[test]
    fn url_tolerates_trailing_slash() {
        let url = route_url("http://localhost:5000/route/v1/", RouteProfile::Walking, &waypoints());
        assert!(url.starts_with("http://localhost:5000/route/v1/walking/77.440000,"));
    }

    #[test]
    fn parses_first_route() {
        let body = r#"{
            "code": "Ok",
            "routes": [
                {
                    "geometry": {"type": "LineString", "coordinates": [[77.44, 12.86], [77.4395, 12.8603], [77.438711, 12.860478]]},
                    "distance": 212.4,
                    "duration": 41.7,
                    "legs": []
                },
                {
                    "geometry": {"type": "LineString", "coordinates": []},
                    "distance": 999.0,
                    "duration": 999.0
                }
            ],
            "waypoints": []
        }"#;
        let route = parse_route(body).unwrap();
        assert_eq!(route.path.len(), 3);
        assert_eq!(route.path[0], LatLng::new(12.86, 77.44));
        assert_eq!(route.path[2], LatLng::new(12.860478, 77.438711));
        assert_eq!(route.distance_m, 212.4);
        assert_eq!(route.duration_s, 41.7);
        assert!(route.steps.is_empty());
    }

    #[test]
    fn parses_itinerary_steps_across_legs() {
        let body = r#"{
            "code": "Ok",
            "routes": [{
                "geometry": {"type": "LineString", "coordinates": [[77.44, 12.86], [77.438711, 12.860478]]},
                "distance": 212.4,
                "duration": 41.7,
                "legs": [{
                    "steps": [
                        {
                            "maneuver": {"type": "depart", "bearing_after": 268, "location": [77.44, 12.86]},
                            "name": "Campus Road",
                            "distance": 120.0,
                            "duration": 20.0
                        },
                        {
                            "maneuver": {"type": "turn", "modifier": "left", "location": [77.439, 12.86]},
                            "name": "",
                            "distance": 92.4,
                            "duration": 21.7
                        }
                    ]
                }, {
                    "steps": [
                        {
                            "maneuver": {"type": "arrive", "location": [77.438711, 12.860478]},
                            "name": "",
                            "distance": 0,
                            "duration": 0
                        }
                    ]
                }]
            }]
        }"#;
        let route = parse_route(body).unwrap();
        assert_eq!(route.steps.len(), 3);
        assert_eq!(route.steps[0].name, "Campus Road");
        assert_eq!(route.steps[0].distance_m, 120.0);
        assert_eq!(route.steps[1].maneuver.modifier.as_deref(), Some("left"));
        assert_eq!(route.steps[0].instruction(), "Head west on Campus Road");
        assert_eq!(route.steps[1].instruction(), "Turn left");
        assert_eq!(
            route.steps[2].instruction(),
            "You have arrived at your destination"
        );
    }

    fn step(kind: &str, modifier: Option<&str>, name: &str) -> RouteStep {
        RouteStep {
            maneuver: Maneuver {
                kind: kind.to_string(),
                modifier: modifier.map(str::to_string),
                bearing_after: None,
                exit: None,
            },
            name: name.to_string(),
            distance_m: 10.0,
            duration_s: 2.0,
        }
    }

    #[test]
    fn instructions_name_the_road() {
        assert_eq!(
            step("turn", Some("slight right"), "Ring Road").instruction(),
            "Turn slight right onto Ring Road"
        );
        assert_eq!(
            step("new name", None, "Main Street").instruction(),
            "Continue onto Main Street"
        );
        assert_eq!(step("turn", Some("uturn"), "").instruction(), "Make a U-turn");
        assert_eq!(step("fork", Some("left"), "").instruction(), "Keep left at the fork");
        assert_eq!(step("depart", None, "").instruction(), "Head out");
    }

    #[test]
    fn roundabout_names_the_exit() {
        let mut s = step("roundabout", Some("right"), "");
        s.maneuver.exit = Some(2);
        assert_eq!(s.instruction(), "Take the 2nd exit at the roundabout");
        s.maneuver.exit = Some(11);
        assert_eq!(s.instruction(), "Take the 11th exit at the roundabout");
    }

    #[test]
    fn compass_rounds_to_nearest_octant() {
        assert_eq!(compass_direction(0.0), "north");
        assert_eq!(compass_direction(350.0), "north");
        assert_eq!(compass_direction(95.0), "east");
        assert_eq!(compass_direction(200.0), "south");
    }

    #[test]
    fn service_error_code_is_reported() {
        let body = r#"{"code": "NoRoute", "message": "Impossible route between points", "routes": []}"#;
        assert_eq!(
            parse_route(body),
            Err(RouteError::Service(
                "NoRoute (Impossible route between points)".into()
            ))
        );
    }

    #[test]
    fn ok_without_routes_is_an_error() {
        let body = r#"{"code": "Ok", "routes": []}"#;
        assert!(matches!(parse_route(body), Err(RouteError::Service(_))));
    }

    #[test]
    fn garbage_is_a_decode_error() {
        assert!(matches!(parse_route("<html>"), Err(RouteError::Decode(_))));
    }

    #[test]
    fn error_display() {
        assert_eq!(RouteError::Http(429).to_string(), "HTTP 429");
    }
}
