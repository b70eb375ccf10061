use campus_shared::{LatLng, LatLngBounds, TileCoord, WorldPoint};

/// Pixel edge of one raster tile.
pub const TILE_SIZE: f64 = 256.0;

const ZOOM_SENSITIVITY: f64 = 0.002;

/// Viewport manages the pan/zoom transformation from the Web Mercator unit
/// square to CSS pixels on the map canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    pub center: WorldPoint,
    pub zoom: f64,
    pub width: f64,
    pub height: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            center: WorldPoint { x: 0.5, y: 0.5 },
            zoom: 2.0,
            width: 800.0,
            height: 600.0,
            min_zoom: 2.0,
            max_zoom: 19.0,
        }
    }
}

impl Viewport {
    pub fn centered_on(center: LatLng, zoom: f64, min_zoom: u8, max_zoom: u8) -> Self {
        let min_zoom = min_zoom as f64;
        let max_zoom = max_zoom as f64;
        Self {
            center: center.to_world(),
            zoom: zoom.clamp(min_zoom, max_zoom),
            min_zoom,
            max_zoom,
            ..Self::default()
        }
    }

    /// Side of the whole world in CSS pixels at the current zoom.
    pub fn world_size(&self) -> f64 {
        TILE_SIZE * self.zoom.exp2()
    }

    pub fn world_to_screen(&self, p: WorldPoint) -> (f64, f64) {
        let size = self.world_size();
        (
            (p.x - self.center.x) * size + self.width / 2.0,
            (p.y - self.center.y) * size + self.height / 2.0,
        )
    }

    pub fn screen_to_world(&self, sx: f64, sy: f64) -> WorldPoint {
        let size = self.world_size();
        WorldPoint {
            x: self.center.x + (sx - self.width / 2.0) / size,
            y: self.center.y + (sy - self.height / 2.0) / size,
        }
    }

    pub fn lat_lng_to_screen(&self, p: LatLng) -> (f64, f64) {
        self.world_to_screen(p.to_world())
    }

    pub fn screen_to_lat_lng(&self, sx: f64, sy: f64) -> LatLng {
        self.screen_to_world(sx, sy).to_lat_lng()
    }

    /// Pan by screen-space delta (content follows the pointer).
    pub fn pan(&mut self, dx: f64, dy: f64) {
        let size = self.world_size();
        self.center.x = (self.center.x - dx / size).clamp(0.0, 1.0);
        self.center.y = (self.center.y - dy / size).clamp(0.0, 1.0);
    }

    /// Zoom toward a focus point (screen coordinates). Positive delta zooms out.
    pub fn zoom_at(&mut self, delta: f64, screen_x: f64, screen_y: f64) {
        let new_zoom = (self.zoom - delta * ZOOM_SENSITIVITY).clamp(self.min_zoom, self.max_zoom);
        self.set_zoom_around(new_zoom, screen_x, screen_y);
    }

    /// Step one integer zoom level toward a focus point.
    pub fn zoom_step(&mut self, steps: f64, screen_x: f64, screen_y: f64) {
        let new_zoom = (self.zoom + steps).clamp(self.min_zoom, self.max_zoom);
        self.set_zoom_around(new_zoom, screen_x, screen_y);
    }

    fn set_zoom_around(&mut self, new_zoom: f64, screen_x: f64, screen_y: f64) {
        // Keep the point under the cursor fixed
        let focus = self.screen_to_world(screen_x, screen_y);
        self.zoom = new_zoom;
        let size = self.world_size();
        self.center.x = focus.x - (screen_x - self.width / 2.0) / size;
        self.center.y = focus.y - (screen_y - self.height / 2.0) / size;
    }

    /// Fit the viewport to show the given bounds with padding, never zooming
    /// past `max_zoom`.
    pub fn fit_bounds(&mut self, bounds: &LatLngBounds, padding_px: f64) {
        let nw = LatLng::new(bounds.north_east.lat, bounds.south_west.lng).to_world();
        let se = LatLng::new(bounds.south_west.lat, bounds.north_east.lng).to_world();
        let world_w = (se.x - nw.x).abs();
        let world_h = (se.y - nw.y).abs();
        let avail_w = (self.width - padding_px * 2.0).max(1.0);
        let avail_h = (self.height - padding_px * 2.0).max(1.0);

        self.center = WorldPoint {
            x: (nw.x + se.x) / 2.0,
            y: (nw.y + se.y) / 2.0,
        };
        if world_w <= 0.0 && world_h <= 0.0 {
            return;
        }
        let zoom_w = if world_w > 0.0 {
            (avail_w / (world_w * TILE_SIZE)).log2()
        } else {
            self.max_zoom
        };
        let zoom_h = if world_h > 0.0 {
            (avail_h / (world_h * TILE_SIZE)).log2()
        } else {
            self.max_zoom
        };
        self.zoom = zoom_w.min(zoom_h).floor().clamp(self.min_zoom, self.max_zoom);
    }

    /// Integer zoom level tiles are fetched at.
    pub fn tile_zoom(&self) -> u8 {
        self.zoom.round().clamp(self.min_zoom, self.max_zoom) as u8
    }

    /// Tiles that intersect the viewport, nearest to the center first.
    pub fn visible_tiles(&self) -> Vec<TileCoord> {
        let z = self.tile_zoom();
        let top_left = TileCoord::containing(self.screen_to_world(0.0, 0.0), z);
        let bottom_right = TileCoord::containing(self.screen_to_world(self.width, self.height), z);
        let center = TileCoord::containing(self.center, z);

        let mut tiles = Vec::new();
        for y in top_left.y..=bottom_right.y {
            for x in top_left.x..=bottom_right.x {
                tiles.push(TileCoord { x, y, z });
            }
        }
        tiles.sort_by_key(|t| {
            let dx = t.x as i64 - center.x as i64;
            let dy = t.y as i64 - center.y as i64;
            dx * dx + dy * dy
        });
        tiles
    }

    /// Screen rectangle `(x, y, size)` a tile covers at the current zoom.
    pub fn tile_rect(&self, tile: &TileCoord) -> (f64, f64, f64) {
        let (x, y) = self.world_to_screen(tile.origin());
        let size = self.world_size() / (tile.z as f64).exp2();
        (x, y, size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        let diff = (actual - expected).abs();
        assert!(diff < 1e-6, "expected {expected}, got {actual} (diff: {diff})");
    }

    fn campus_viewport() -> Viewport {
        let mut vp = Viewport::centered_on(LatLng::new(12.860448, 77.439469), 17.0, 2, 19);
        vp.width = 800.0;
        vp.height = 600.0;
        vp
    }

    #[test]
    fn center_maps_to_canvas_middle() {
        let vp = campus_viewport();
        let (sx, sy) = vp.lat_lng_to_screen(LatLng::new(12.860448, 77.439469));
        assert_close(sx, 400.0);
        assert_close(sy, 300.0);
    }

    #[test]
    fn screen_world_round_trip() {
        let vp = campus_viewport();
        let w = vp.screen_to_world(123.0, 456.0);
        let (sx, sy) = vp.world_to_screen(w);
        assert_close(sx, 123.0);
        assert_close(sy, 456.0);
    }

    #[test]
    fn dropped_pin_lands_where_it_was_released() {
        let vp = campus_viewport();
        let p = vp.screen_to_lat_lng(250.0, 410.0);
        let (sx, sy) = vp.lat_lng_to_screen(p);
        assert_close(sx, 250.0);
        assert_close(sy, 410.0);
        let middle = vp.screen_to_lat_lng(400.0, 300.0);
        assert_close(middle.lat, 12.860448);
        assert_close(middle.lng, 77.439469);
    }

    #[test]
    fn pan_moves_content_with_pointer() {
        let mut vp = campus_viewport();
        let target = LatLng::new(12.860478, 77.438711);
        let (before_x, before_y) = vp.lat_lng_to_screen(target);
        vp.pan(30.0, -20.0);
        let (after_x, after_y) = vp.lat_lng_to_screen(target);
        assert_close(after_x - before_x, 30.0);
        assert_close(after_y - before_y, -20.0);
    }

    #[test]
    fn zoom_keeps_focus_fixed() {
        let mut vp = campus_viewport();
        let focus = vp.screen_to_world(200.0, 150.0);
        vp.zoom_at(-250.0, 200.0, 150.0);
        assert_close(vp.zoom, 17.5);
        let (sx, sy) = vp.world_to_screen(focus);
        assert_close(sx, 200.0);
        assert_close(sy, 150.0);
    }

    #[test]
    fn zoom_is_clamped() {
        let mut vp = campus_viewport();
        vp.zoom_step(10.0, 400.0, 300.0);
        assert_close(vp.zoom, 19.0);
        vp.zoom_at(1_000_000.0, 400.0, 300.0);
        assert_close(vp.zoom, 2.0);
    }

    #[test]
    fn visible_tiles_cover_canvas() {
        let vp = campus_viewport();
        let tiles = vp.visible_tiles();
        // 800x600 at integer zoom needs at least 4x3 tiles
        assert!(tiles.len() >= 12, "got {} tiles", tiles.len());
        assert!(tiles.iter().all(|t| t.z == 17));
        let center = TileCoord::containing(vp.center, 17);
        assert_eq!(tiles[0], center);
    }

    #[test]
    fn tile_rect_matches_world_scale() {
        let vp = campus_viewport();
        let tile = TileCoord::containing(vp.center, 17);
        let (_, _, size) = vp.tile_rect(&tile);
        assert_close(size, TILE_SIZE);
    }

    #[test]
    fn fit_bounds_contains_both_ends() {
        let mut vp = campus_viewport();
        let bounds = LatLngBounds::from_points(&[
            LatLng::new(12.86, 77.44),
            LatLng::new(12.860478, 77.438711),
        ])
        .unwrap();
        vp.fit_bounds(&bounds, 40.0);
        for p in [bounds.south_west, bounds.north_east] {
            let (sx, sy) = vp.lat_lng_to_screen(p);
            assert!((40.0..=760.0).contains(&sx), "x {sx} outside padded canvas");
            assert!((40.0..=560.0).contains(&sy), "y {sy} outside padded canvas");
        }
        assert!(vp.zoom <= 19.0);
    }

    #[test]
    fn fit_single_point_centers_on_it() {
        let mut vp = campus_viewport();
        let p = LatLng::new(12.86, 77.44);
        let bounds = LatLngBounds::from_points(&[p]).unwrap();
        vp.fit_bounds(&bounds, 40.0);
        let (sx, sy) = vp.lat_lng_to_screen(p);
        assert_close(sx, 400.0);
        assert_close(sy, 300.0);
    }
}
