use crate::geo::LatLng;
use crate::selection::Waypoints;

/// Which end of the route a dragged pin stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaypointEnd {
    Start,
    End,
}

/// Route waypoints as the user has dragged them, layered over the pair the
/// selection derives. An override lasts until its end of the derived pair moves.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WaypointEdits {
    base: Option<Waypoints>,
    from: Option<LatLng>,
    to: Option<LatLng>,
}

impl WaypointEdits {
    /// Follow a new derived pair. Returns whether anything changed.
    pub fn rebase(&mut self, base: Option<Waypoints>) -> bool {
        if self.base == base {
            return false;
        }
        match (self.base, base) {
            (Some(old), Some(new)) => {
                if old.from != new.from {
                    self.from = None;
                }
                if old.to != new.to {
                    self.to = None;
                }
            }
            _ => {
                self.from = None;
                self.to = None;
            }
        }
        self.base = base;
        true
    }

    /// Move one end. Ignored while there is no route to edit.
    pub fn move_end(&mut self, end: WaypointEnd, position: LatLng) -> bool {
        if self.base.is_none() {
            return false;
        }
        let slot = match end {
            WaypointEnd::Start => &mut self.from,
            WaypointEnd::End => &mut self.to,
        };
        if *slot == Some(position) {
            return false;
        }
        *slot = Some(position);
        true
    }

    pub fn is_edited(&self) -> bool {
        self.from.is_some() || self.to.is_some()
    }

    /// The waypoints the route should follow.
    pub fn effective(&self) -> Option<Waypoints> {
        let base = self.base?;
        Some(Waypoints {
            from: self.from.unwrap_or(base.from),
            to: self.to.unwrap_or(base.to),
        })
    }
}
