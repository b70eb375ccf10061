pub mod config;
pub mod geo;
pub mod overlay;
pub mod poi;
pub mod reconciler;
pub mod routing;
pub mod selection;
pub mod waypoint_edit;

pub use config::MapConfig;
pub use geo::{GeoFix, LatLng, LatLngBounds, TileCoord, WorldPoint};
pub use overlay::{OverlaySlot, OverlaySurface, SyncOutcome};
pub use poi::PointOfInterest;
pub use reconciler::{CommitPolicy, PositionReconciler};
pub use routing::{Maneuver, Route, RouteError, RouteProfile, RouteStep};
pub use selection::{GeolocationError, GeolocationErrorCode, SelectionPhase, SelectionState, Waypoints};
pub use waypoint_edit::{WaypointEdits, WaypointEnd};
