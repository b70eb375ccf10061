use std::fmt;

use crate::geo::LatLng;
use crate::poi::PointOfInterest;

/// Coarse view of [`SelectionState`] used to reason about transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionPhase {
    NoSelection,
    SelectedHidden,
    SelectedVisible,
}

/// Reason a geolocation request did not produce a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeolocationErrorCode {
    PermissionDenied,
    PositionUnavailable,
    Timeout,
    Unsupported,
}

impl GeolocationErrorCode {
    /// Map a `GeolocationPositionError.code` value.
    pub fn from_dom_code(code: u16) -> Self {
        match code {
            1 => Self::PermissionDenied,
            2 => Self::PositionUnavailable,
            3 => Self::Timeout,
            _ => Self::Unsupported,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeolocationError {
    pub code: GeolocationErrorCode,
    pub message: String,
}

impl fmt::Display for GeolocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.code {
            GeolocationErrorCode::PermissionDenied => "permission denied",
            GeolocationErrorCode::PositionUnavailable => "position unavailable",
            GeolocationErrorCode::Timeout => "timed out",
            GeolocationErrorCode::Unsupported => "geolocation unsupported",
        };
        if self.message.is_empty() {
            f.write_str(kind)
        } else {
            write!(f, "{kind}: {}", self.message)
        }
    }
}

impl std::error::Error for GeolocationError {}

/// Ordered routing input: from the user to the destination.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waypoints {
    pub from: LatLng,
    pub to: LatLng,
}

/// Which point the user picked, whether the map is open, and where the
/// user is. Every transition is total.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionState {
    user_position: Option<LatLng>,
    selected: Option<PointOfInterest>,
    map_visible: bool,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_point_selected(&mut self, point: PointOfInterest) {
        self.selected = Some(point);
        self.map_visible = true;
    }

    /// Hide the map. The selection is kept so reopening shows the same place.
    pub fn on_close_requested(&mut self) {
        self.map_visible = false;
    }

    pub fn on_geolocation_resolved(&mut self, position: LatLng) {
        self.user_position = Some(position);
    }

    /// A failed fix never clears a position obtained earlier.
    pub fn on_geolocation_failed(&mut self, _error: &GeolocationError) {}

    pub fn user_position(&self) -> Option<LatLng> {
        self.user_position
    }

    pub fn selected(&self) -> Option<&PointOfInterest> {
        self.selected.as_ref()
    }

    pub fn map_visible(&self) -> bool {
        self.map_visible
    }

    pub fn phase(&self) -> SelectionPhase {
        match (&self.selected, self.map_visible) {
            (None, _) => SelectionPhase::NoSelection,
            (Some(_), false) => SelectionPhase::SelectedHidden,
            (Some(_), true) => SelectionPhase::SelectedVisible,
        }
    }

    /// Route endpoints, present only while the map shows a selection and
    /// the user's position is known.
    pub fn route_waypoints(&self) -> Option<Waypoints> {
        if !self.map_visible {
            return None;
        }
        let from = self.user_position?;
        let to = self.selected.as_ref()?.coordinates;
        Some(Waypoints { from, to })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poi::campus_points;

    fn point_a() -> PointOfInterest {
        campus_points().remove(0)
    }

    fn point_b() -> PointOfInterest {
        campus_points().remove(1)
    }

    fn denied() -> GeolocationError {
        GeolocationError {
            code: GeolocationErrorCode::PermissionDenied,
            message: "User denied Geolocation".into(),
        }
    }

    #[test]
    fn starts_with_nothing_selected() {
        let state = SelectionState::new();
        assert_eq!(state.phase(), SelectionPhase::NoSelection);
        assert!(!state.map_visible());
        assert!(state.user_position().is_none());
        assert!(state.route_waypoints().is_none());
    }

    #[test]
    fn selecting_always_shows_map_with_that_point() {
        let mut state = SelectionState::new();
        for point in [point_a(), point_b(), point_a()] {
            state.on_point_selected(point.clone());
            assert_eq!(state.selected(), Some(&point));
            assert!(state.map_visible());
            assert_eq!(state.phase(), SelectionPhase::SelectedVisible);

            state.on_close_requested();
            state.on_point_selected(point.clone());
            assert_eq!(state.selected(), Some(&point));
            assert!(state.map_visible());
        }
    }

    #[test]
    fn close_keeps_selection() {
        let mut state = SelectionState::new();
        state.on_point_selected(point_a());
        state.on_close_requested();
        assert_eq!(state.selected(), Some(&point_a()));
        assert!(!state.map_visible());
        assert_eq!(state.phase(), SelectionPhase::SelectedHidden);

        state.on_close_requested();
        assert_eq!(state.phase(), SelectionPhase::SelectedHidden);
    }

    #[test]
    fn close_without_selection_is_a_no_op() {
        let mut state = SelectionState::new();
        state.on_close_requested();
        assert_eq!(state, SelectionState::new());
    }

    #[test]
    fn geolocation_failure_leaves_position_unset() {
        let mut state = SelectionState::new();
        state.on_point_selected(point_a());
        state.on_geolocation_failed(&denied());
        assert!(state.user_position().is_none());
        assert!(state.route_waypoints().is_none());
        assert!(state.map_visible());
    }

    #[test]
    fn geolocation_failure_after_fix_keeps_fix() {
        let mut state = SelectionState::new();
        state.on_geolocation_resolved(LatLng::new(12.86, 77.44));
        state.on_geolocation_failed(&denied());
        assert_eq!(state.user_position(), Some(LatLng::new(12.86, 77.44)));
    }

    #[test]
    fn route_needs_position_selection_and_visible_map() {
        let mut state = SelectionState::new();
        state.on_point_selected(point_a());
        assert!(state.route_waypoints().is_none());

        state.on_geolocation_resolved(LatLng::new(12.86, 77.44));
        assert_eq!(
            state.route_waypoints(),
            Some(Waypoints {
                from: LatLng::new(12.86, 77.44),
                to: LatLng::new(12.860478, 77.438711),
            })
        );

        state.on_close_requested();
        assert!(state.route_waypoints().is_none());

        state.on_point_selected(point_b());
        assert_eq!(
            state.route_waypoints().map(|w| w.to),
            Some(LatLng::new(12.860448, 77.439469))
        );
    }

    #[test]
    fn position_before_selection_routes_once_selected() {
        let mut state = SelectionState::new();
        state.on_geolocation_resolved(LatLng::new(12.86, 77.44));
        assert!(state.route_waypoints().is_none());
        state.on_point_selected(point_b());
        assert!(state.route_waypoints().is_some());
    }

    #[test]
    fn error_display_includes_reason() {
        assert_eq!(
            denied().to_string(),
            "permission denied: User denied Geolocation"
        );
        let bare = GeolocationError {
            code: GeolocationErrorCode::from_dom_code(3),
            message: String::new(),
        };
        assert_eq!(bare.to_string(), "timed out");
        assert_eq!(
            GeolocationErrorCode::from_dom_code(42),
            GeolocationErrorCode::Unsupported
        );
    }
}
