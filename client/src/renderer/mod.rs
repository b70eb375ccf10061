use std::f64::consts::TAU;

use campus_shared::{LatLng, PointOfInterest, WaypointEnd, Waypoints};
use web_sys::CanvasRenderingContext2d;

use crate::icons::{MarkerIcons, PinKind};
use crate::markers::{MarkerId, PlacedMarker, pin_rect};
use crate::routing::RouteDrawing;
use crate::tiles::TileCache;
use crate::viewport::{TILE_SIZE, Viewport};

const BACKGROUND: &str = "#dddddd";

/// Route casing, outermost first: (color, line width).
const ROUTE_STYLES: [(&str, f64); 3] = [
    ("rgba(0, 0, 0, 0.15)", 9.0),
    ("rgba(255, 255, 255, 0.8)", 6.0),
    ("rgba(255, 0, 0, 1.0)", 2.0),
];

/// Immutable, frame-local input for one paint.
#[derive(Clone, Copy)]
pub struct MapScene<'a> {
    pub vp: &'a Viewport,
    pub tiles: &'a TileCache,
    pub icons: &'a MarkerIcons,
    pub points: &'a [PointOfInterest],
    /// Position the user marker is drawn at (the reconciler's committed value).
    pub user: Option<LatLng>,
    pub route: Option<&'a RouteDrawing>,
    /// Route ends as currently dragged; drawn even before a route arrives.
    pub waypoints: Option<Waypoints>,
}

/// Paint one frame in CSS pixels and return the markers that were placed,
/// bottom to top, for hit-testing.
pub fn paint(ctx: &CanvasRenderingContext2d, scene: MapScene<'_>) -> Vec<PlacedMarker> {
    let vp = scene.vp;
    ctx.set_fill_style_str(BACKGROUND);
    ctx.fill_rect(0.0, 0.0, vp.width, vp.height);

    paint_tiles(ctx, vp, scene.tiles);

    if let Some(route) = scene.route {
        paint_route(ctx, vp, &route.route.path);
    }

    let mut placed = Vec::with_capacity(scene.points.len() + 3);
    for (idx, point) in scene.points.iter().enumerate() {
        let tip = vp.lat_lng_to_screen(point.coordinates);
        paint_pin(ctx, scene.icons, PinKind::Destination, tip);
        placed.push(PlacedMarker {
            id: MarkerId::Point(idx),
            tip,
        });
    }

    if let Some(waypoints) = scene.waypoints {
        paint_waypoint_pins(ctx, vp, scene.icons, &waypoints, &mut placed);
    }

    if let Some(user) = scene.user {
        let tip = vp.lat_lng_to_screen(user);
        paint_pin(ctx, scene.icons, PinKind::User, tip);
        placed.push(PlacedMarker {
            id: MarkerId::User,
            tip,
        });
    }

    placed
}

fn paint_tiles(ctx: &CanvasRenderingContext2d, vp: &Viewport, tiles: &TileCache) {
    ctx.set_image_smoothing_enabled(true);
    for tile in vp.visible_tiles() {
        let (x, y, size) = vp.tile_rect(&tile);
        // Snap to whole pixels and overlap by one so seams never show
        let (x, y) = (x.floor(), y.floor());
        let size = size.ceil() + 1.0;

        if let Some(img) = tiles.image(&tile) {
            ctx.draw_image_with_html_image_element_and_dw_and_dh(img, x, y, size, size)
                .ok();
        } else if let Some((img, ancestor)) = tiles.loaded_ancestor(&tile) {
            let factor = 1u32 << (tile.z - ancestor.z);
            let sub = TILE_SIZE / factor as f64;
            let sx = (tile.x - ancestor.x * factor) as f64 * sub;
            let sy = (tile.y - ancestor.y * factor) as f64 * sub;
            ctx.draw_image_with_html_image_element_and_sw_and_sh_and_dx_and_dy_and_dw_and_dh(
                img, sx, sy, sub, sub, x, y, size, size,
            )
            .ok();
        }
    }
}

fn paint_route(ctx: &CanvasRenderingContext2d, vp: &Viewport, path: &[LatLng]) {
    if path.len() < 2 {
        return;
    }
    ctx.set_line_join("round");
    ctx.set_line_cap("round");
    for (color, width) in ROUTE_STYLES {
        ctx.begin_path();
        for (i, p) in path.iter().enumerate() {
            let (sx, sy) = vp.lat_lng_to_screen(*p);
            if i == 0 {
                ctx.move_to(sx, sy);
            } else {
                ctx.line_to(sx, sy);
            }
        }
        ctx.set_stroke_style_str(color);
        ctx.set_line_width(width);
        ctx.stroke();
    }
}

fn paint_waypoint_pins(
    ctx: &CanvasRenderingContext2d,
    vp: &Viewport,
    icons: &MarkerIcons,
    waypoints: &Waypoints,
    placed: &mut Vec<PlacedMarker>,
) {
    for (end, p) in [
        (WaypointEnd::Start, waypoints.from),
        (WaypointEnd::End, waypoints.to),
    ] {
        let tip = vp.lat_lng_to_screen(p);
        paint_pin(ctx, icons, PinKind::User, tip);
        placed.push(PlacedMarker {
            id: MarkerId::Waypoint(end),
            tip,
        });
    }
}

fn paint_pin(
    ctx: &CanvasRenderingContext2d,
    icons: &MarkerIcons,
    kind: PinKind,
    tip: (f64, f64),
) {
    let (x, y, w, h) = pin_rect(tip);
    if let Some(img) = icons.get(kind) {
        ctx.draw_image_with_html_image_element_and_dw_and_dh(img, x, y, w, h)
            .ok();
        return;
    }

    // Vector fallback: round head over a pointed tail
    let r = w / 2.0;
    let (cx, cy) = (x + r, y + r);
    ctx.set_fill_style_str(kind.fallback_color());
    ctx.begin_path();
    ctx.move_to(tip.0, tip.1);
    ctx.line_to(cx - r * 0.8, cy + r * 0.6);
    ctx.line_to(cx + r * 0.8, cy + r * 0.6);
    ctx.close_path();
    ctx.fill();
    ctx.begin_path();
    ctx.arc(cx, cy, r, 0.0, TAU).ok();
    ctx.fill();

    ctx.set_fill_style_str("#ffffff");
    ctx.begin_path();
    ctx.arc(cx, cy, r * 0.38, 0.0, TAU).ok();
    ctx.fill();
}
