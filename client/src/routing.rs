use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, Ordering};

use campus_shared::routing::{parse_route, route_url};
use campus_shared::{
    LatLng, OverlaySlot, OverlaySurface, Route, RouteError, RouteProfile, Waypoints,
};
use leptos::prelude::*;
use wasm_bindgen_futures::spawn_local;

// Unique across sessions, so a late reply from a torn-down map never matches.
static NEXT_ROUTE_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies one drawn (or in-flight) route overlay.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RouteHandle(u64);

/// A route that made it onto the map.
#[derive(Clone, Debug, PartialEq)]
pub struct RouteDrawing {
    pub handle: RouteHandle,
    pub waypoints: Waypoints,
    pub route: Route,
}

/// The map-side half of the route overlay: fetches a path for new waypoints
/// and clears the drawn path on removal.
struct RouteLayer {
    drawn: RwSignal<Option<RouteDrawing>>,
    base_url: String,
    profile: RouteProfile,
}

impl OverlaySurface<Waypoints> for RouteLayer {
    type Handle = RouteHandle;

    fn draw(&mut self, waypoints: &Waypoints) -> RouteHandle {
        let handle = RouteHandle(NEXT_ROUTE_ID.fetch_add(1, Ordering::Relaxed));
        let url = route_url(&self.base_url, self.profile, waypoints);
        let waypoints = *waypoints;
        let drawn = self.drawn;
        spawn_local(async move {
            let result = fetch_route(&url).await;
            // The overlay may have been replaced or torn down while in flight.
            if !is_active(handle) {
                return;
            }
            match result {
                Ok(route) => {
                    drawn.try_set(Some(RouteDrawing {
                        handle,
                        waypoints,
                        route,
                    }));
                }
                Err(e) => {
                    web_sys::console::warn_1(&format!("Route request failed: {e}").into());
                }
            }
        });
        handle
    }

    fn remove(&mut self, handle: RouteHandle) {
        self.drawn.try_update(|drawn| {
            if drawn.as_ref().is_some_and(|d| d.handle == handle) {
                *drawn = None;
            }
        });
    }
}

/// Decides when an arriving route should reframe the map: once per
/// destination, so later reroutes (a new fix, a dragged pin) leave the view alone.
#[derive(Debug, Default)]
pub struct RouteFraming {
    framed_to: Option<LatLng>,
}

impl RouteFraming {
    pub fn should_frame(&mut self, destination: LatLng) -> bool {
        if self.framed_to == Some(destination) {
            return false;
        }
        self.framed_to = Some(destination);
        true
    }
}

struct RouteSession {
    layer: RouteLayer,
    slot: OverlaySlot<Waypoints, RouteHandle>,
}

thread_local! {
    static ROUTE_SESSION: RefCell<Option<RouteSession>> = const { RefCell::new(None) };
}

fn is_active(handle: RouteHandle) -> bool {
    ROUTE_SESSION.with(|slot| {
        slot.borrow()
            .as_ref()
            .is_some_and(|s| s.slot.active_handle() == Some(&handle))
    })
}

/// Bind the route overlay to a mounted map. Any previous session is torn down first.
pub fn attach(drawn: RwSignal<Option<RouteDrawing>>, base_url: String, profile: RouteProfile) {
    detach();
    ROUTE_SESSION.with(|slot| {
        *slot.borrow_mut() = Some(RouteSession {
            layer: RouteLayer {
                drawn,
                base_url,
                profile,
            },
            slot: OverlaySlot::new(),
        });
    });
}

/// Make the drawn route match `desired`, removing the old one first.
pub fn sync(desired: Option<Waypoints>) {
    ROUTE_SESSION.with(|slot| {
        let mut slot = slot.borrow_mut();
        if let Some(session) = slot.as_mut() {
            session.slot.sync(desired.as_ref(), &mut session.layer);
        }
    });
}

/// Remove the route from the map and drop the session.
pub fn detach() {
    ROUTE_SESSION.with(|slot| {
        if let Some(mut session) = slot.borrow_mut().take() {
            session.slot.clear(&mut session.layer);
        }
    });
}

async fn fetch_route(url: &str) -> Result<Route, RouteError> {
    let resp = gloo_net::http::Request::get(url)
        .send()
        .await
        .map_err(|e| RouteError::Transport(e.to_string()))?;

    if !resp.ok() {
        return Err(RouteError::Http(resp.status()));
    }

    let body = resp
        .text()
        .await
        .map_err(|e| RouteError::Transport(e.to_string()))?;
    parse_route(&body)
}
