use campus_shared::WaypointEnd;

use crate::icons::{ICON_ANCHOR, ICON_SIZE, POPUP_ANCHOR};

/// Clickable markers on the map.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MarkerId {
    User,
    Point(usize),
    /// A draggable route end; has no popup.
    Waypoint(WaypointEnd),
}

/// A marker placed at a screen position (the pin's tip).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlacedMarker {
    pub id: MarkerId,
    pub tip: (f64, f64),
}

/// Screen rectangle `(x, y, w, h)` covered by a pin whose tip is at `tip`.
pub fn pin_rect(tip: (f64, f64)) -> (f64, f64, f64, f64) {
    (
        tip.0 - ICON_ANCHOR.0,
        tip.1 - ICON_ANCHOR.1,
        ICON_SIZE.0,
        ICON_SIZE.1,
    )
}

/// Where a popup opened on this marker points to.
pub fn popup_tip(tip: (f64, f64)) -> (f64, f64) {
    (tip.0 + POPUP_ANCHOR.0, tip.1 + POPUP_ANCHOR.1)
}

fn covers(m: &PlacedMarker, sx: f64, sy: f64) -> bool {
    let (x, y, w, h) = pin_rect(m.tip);
    sx >= x && sx <= x + w && sy >= y && sy <= y + h
}

/// Topmost popup-bearing marker under a screen point. Markers later in the
/// slice are drawn on top, so they win.
pub fn hit_test(markers: &[PlacedMarker], sx: f64, sy: f64) -> Option<MarkerId> {
    markers
        .iter()
        .rev()
        .filter(|m| !matches!(m.id, MarkerId::Waypoint(_)))
        .find(|m| covers(m, sx, sy))
        .map(|m| m.id)
}

/// Route end whose pin is under a screen point, with that pin's tip.
pub fn hit_waypoint(
    markers: &[PlacedMarker],
    sx: f64,
    sy: f64,
) -> Option<(WaypointEnd, (f64, f64))> {
    markers.iter().rev().find_map(|m| match m.id {
        MarkerId::Waypoint(end) if covers(m, sx, sy) => Some((end, m.tip)),
        _ => None,
    })
}
