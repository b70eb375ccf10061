use std::fmt::Write;

use campus_shared::LatLng;

/// Format a route length: meters below one kilometer, otherwise one decimal km.
pub fn format_distance(meters: f64) -> String {
    let mut out = String::with_capacity(8);
    write_distance(&mut out, meters);
    out
}

pub fn write_distance(buf: &mut String, meters: f64) {
    buf.clear();
    let meters = meters.max(0.0);
    if meters < 1_000.0 {
        let _ = write!(buf, "{} m", meters.round() as i64);
    } else {
        let _ = write!(buf, "{:.1} km", meters / 1_000.0);
    }
}

/// Format a travel time, rounded up to whole minutes past the first minute.
pub fn format_duration(total_secs: f64) -> String {
    let secs = total_secs.max(0.0).ceil() as i64;
    if secs < 60 {
        return format!("{secs} s");
    }
    let minutes = (secs + 59) / 60;
    let hours = minutes / 60;
    let minutes = minutes % 60;
    if hours == 0 {
        format!("{minutes} min")
    } else {
        format!("{hours} h {minutes:02} min")
    }
}

/// Straight-line distance from the user to a destination, e.g. "82 m away".
/// Only offered while no route is drawn; the route summary supersedes it.
pub fn straight_line_note(user: Option<LatLng>, destination: LatLng, routed: bool) -> Option<String> {
    if routed {
        return None;
    }
    let user = user?;
    Some(format!("{} away", format_distance(user.distance_to(destination))))
}
