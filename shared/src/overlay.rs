/// Something that can put an overlay on the map and take it off again.
pub trait OverlaySurface<K> {
    type Handle;

    fn draw(&mut self, key: &K) -> Self::Handle;
    fn remove(&mut self, handle: Self::Handle);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Unchanged,
    Drawn,
    Removed,
    Replaced,
}

/// Holds at most one overlay. The old overlay is always removed before a
/// replacement is drawn, so overlays never accumulate on the surface.
#[derive(Debug)]
pub struct OverlaySlot<K, H> {
    active: Option<(K, H)>,
}

impl<K, H> Default for OverlaySlot<K, H> {
    fn default() -> Self {
        Self { active: None }
    }
}

impl<K: PartialEq + Clone, H> OverlaySlot<K, H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_key(&self) -> Option<&K> {
        self.active.as_ref().map(|(k, _)| k)
    }

    pub fn active_handle(&self) -> Option<&H> {
        self.active.as_ref().map(|(_, h)| h)
    }

    /// Bring the surface in line with `desired`.
    pub fn sync<S>(&mut self, desired: Option<&K>, surface: &mut S) -> SyncOutcome
    where
        S: OverlaySurface<K, Handle = H>,
    {
        if self.active_key() == desired {
            return SyncOutcome::Unchanged;
        }
        let removed = self.clear(surface);
        match desired {
            Some(key) => {
                let handle = surface.draw(key);
                self.active = Some((key.clone(), handle));
                if removed {
                    SyncOutcome::Replaced
                } else {
                    SyncOutcome::Drawn
                }
            }
            None => SyncOutcome::Removed,
        }
    }

    /// Remove the active overlay, if any. Returns whether one was removed.
    pub fn clear<S>(&mut self, surface: &mut S) -> bool
    where
        S: OverlaySurface<K, Handle = H>,
    {
        match self.active.take() {
            Some((_, handle)) => {
                surface.remove(handle);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::LatLng;
    use crate::poi::campus_points;
    use crate::selection::{SelectionState, Waypoints};

    #[derive(Default)]
    struct FakeMap {
        next_id: u32,
        live: Vec<(u32, Waypoints)>,
        draws: usize,
    }

    impl OverlaySurface<Waypoints> for FakeMap {
        type Handle = u32;

        fn draw(&mut self, key: &Waypoints) -> u32 {
            self.next_id += 1;
            self.draws += 1;
            self.live.push((self.next_id, *key));
            self.next_id
        }

        fn remove(&mut self, handle: u32) {
            let before = self.live.len();
            self.live.retain(|(id, _)| *id != handle);
            assert_eq!(before, self.live.len() + 1, "removed unknown overlay");
        }
    }

    #[test]
    fn same_key_does_not_redraw() {
        let mut map = FakeMap::default();
        let mut slot = OverlaySlot::new();
        let key = Waypoints {
            from: LatLng::new(0.0, 0.0),
            to: LatLng::new(1.0, 1.0),
        };
        assert_eq!(slot.sync(Some(&key), &mut map), SyncOutcome::Drawn);
        assert_eq!(slot.sync(Some(&key), &mut map), SyncOutcome::Unchanged);
        assert_eq!(map.draws, 1);
        assert_eq!(slot.active_handle(), Some(&1));
    }

    #[test]
    fn clearing_empty_slot_is_harmless() {
        let mut map = FakeMap::default();
        let mut slot: OverlaySlot<Waypoints, u32> = OverlaySlot::new();
        assert!(!slot.clear(&mut map));
        assert_eq!(slot.sync(None, &mut map), SyncOutcome::Unchanged);
    }

    #[test]
    fn select_locate_close_reselect_keeps_one_route() {
        let points = campus_points();
        let mut map = FakeMap::default();
        let mut slot = OverlaySlot::new();
        let mut state = SelectionState::new();

        state.on_point_selected(points[0].clone());
        assert!(state.map_visible());
        slot.sync(state.route_waypoints().as_ref(), &mut map);
        assert!(map.live.is_empty());

        let user = LatLng::new(12.86, 77.44);
        state.on_geolocation_resolved(user);
        assert_eq!(
            slot.sync(state.route_waypoints().as_ref(), &mut map),
            SyncOutcome::Drawn
        );
        assert_eq!(map.live.len(), 1);
        assert_eq!(map.live[0].1.from, user);
        assert_eq!(map.live[0].1.to, points[0].coordinates);

        state.on_close_requested();
        assert_eq!(
            slot.sync(state.route_waypoints().as_ref(), &mut map),
            SyncOutcome::Removed
        );
        assert!(map.live.is_empty());

        state.on_point_selected(points[1].clone());
        assert!(state.map_visible());
        assert_eq!(state.selected(), Some(&points[1]));
        slot.sync(state.route_waypoints().as_ref(), &mut map);
        assert_eq!(map.live.len(), 1);
        assert_eq!(map.live[0].1.to, points[1].coordinates);
    }

    #[test]
    fn changing_destination_while_visible_replaces_route() {
        let points = campus_points();
        let mut map = FakeMap::default();
        let mut slot = OverlaySlot::new();
        let mut state = SelectionState::new();
        state.on_geolocation_resolved(LatLng::new(12.86, 77.44));

        state.on_point_selected(points[0].clone());
        slot.sync(state.route_waypoints().as_ref(), &mut map);
        state.on_point_selected(points[1].clone());
        assert_eq!(
            slot.sync(state.route_waypoints().as_ref(), &mut map),
            SyncOutcome::Replaced
        );
        assert_eq!(map.live.len(), 1);
        assert_eq!(map.draws, 2);

        state.on_geolocation_resolved(LatLng::new(12.861, 77.441));
        slot.sync(state.route_waypoints().as_ref(), &mut map);
        assert_eq!(map.live.len(), 1);
        assert_eq!(map.live[0].1.from, LatLng::new(12.861, 77.441));
    }
}
