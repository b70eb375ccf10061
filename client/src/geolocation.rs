use std::cell::RefCell;

use campus_shared::{GeoFix, GeolocationError, GeolocationErrorCode, SelectionState};
use leptos::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen::JsValue;
use wasm_bindgen::closure::Closure;
use web_sys::{Position as GeolocationPosition, PositionError as GeolocationPositionError};

struct WatchBinding {
    geolocation: web_sys::Geolocation,
    watch_id: i32,
    _on_success: Closure<dyn FnMut(JsValue)>,
    _on_error: Closure<dyn FnMut(JsValue)>,
}

/// Callbacks of a single `getCurrentPosition` call, kept alive until the
/// browser answers through one of them.
struct FixRequestBinding {
    _on_success: Closure<dyn FnMut(JsValue)>,
    _on_error: Closure<dyn FnMut(JsValue)>,
}

/// Values held per outstanding request, released by the first answer.
struct PendingRequests<T> {
    next_id: u64,
    held: Vec<(u64, T)>,
}

impl<T> PendingRequests<T> {
    const fn new() -> Self {
        Self {
            next_id: 0,
            held: Vec::new(),
        }
    }

    fn reserve(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn hold(&mut self, id: u64, value: T) {
        self.held.push((id, value));
    }

    /// Take the value for `id`; later answers for the same request get `None`.
    fn settle(&mut self, id: u64) -> Option<T> {
        let idx = self.held.iter().position(|(held_id, _)| *held_id == id)?;
        Some(self.held.swap_remove(idx).1)
    }
}

thread_local! {
    static WATCH_BINDING: RefCell<Option<WatchBinding>> = const { RefCell::new(None) };
    static FIX_REQUESTS: RefCell<PendingRequests<FixRequestBinding>> =
        const { RefCell::new(PendingRequests::new()) };
}

/// Release a one-shot request's callbacks. Called from inside one of them,
/// so the drop is deferred until that callback has returned.
fn release_fix_request(id: u64) {
    if let Some(binding) = FIX_REQUESTS.with(|pending| pending.borrow_mut().settle(id)) {
        wasm_bindgen_futures::spawn_local(async move { drop(binding) });
    }
}

/// Ask the browser for the user's position and feed the answer into `selection`.
///
/// With `track` set the position keeps updating until [`stop_tracking`];
/// otherwise a single fix is requested.
pub fn request_position(selection: RwSignal<SelectionState>, track: bool) {
    let Some(geolocation) = web_sys::window().and_then(|w| w.navigator().geolocation().ok())
    else {
        report_failure(
            selection,
            GeolocationError {
                code: GeolocationErrorCode::Unsupported,
                message: String::new(),
            },
        );
        return;
    };

    if track {
        start_watch(geolocation, selection);
        return;
    }

    let id = FIX_REQUESTS.with(|pending| pending.borrow_mut().reserve());
    let on_success = Closure::<dyn FnMut(JsValue)>::new(move |value: JsValue| {
        release_fix_request(id);
        report_fix(selection, value.unchecked_into());
    });
    let on_error = Closure::<dyn FnMut(JsValue)>::new(move |value: JsValue| {
        release_fix_request(id);
        report_failure(selection, to_error(value.unchecked_into()));
    });
    let requested = geolocation.get_current_position_with_error_callback(
        on_success.as_ref().unchecked_ref(),
        Some(on_error.as_ref().unchecked_ref()),
    );
    match requested {
        Ok(()) => FIX_REQUESTS.with(|pending| {
            pending.borrow_mut().hold(
                id,
                FixRequestBinding {
                    _on_success: on_success,
                    _on_error: on_error,
                },
            );
        }),
        Err(e) => report_failure(
            selection,
            GeolocationError {
                code: GeolocationErrorCode::Unsupported,
                message: format!("{e:?}"),
            },
        ),
    }
}

fn start_watch(geolocation: web_sys::Geolocation, selection: RwSignal<SelectionState>) {
    stop_tracking();

    let on_success = Closure::<dyn FnMut(JsValue)>::new(move |value: JsValue| {
        report_fix(selection, value.unchecked_into());
    });
    let on_error = Closure::<dyn FnMut(JsValue)>::new(move |value: JsValue| {
        report_failure(selection, to_error(value.unchecked_into()));
    });

    match geolocation.watch_position_with_error_callback(
        on_success.as_ref().unchecked_ref(),
        Some(on_error.as_ref().unchecked_ref()),
    ) {
        Ok(watch_id) => WATCH_BINDING.with(|slot| {
            *slot.borrow_mut() = Some(WatchBinding {
                geolocation,
                watch_id,
                _on_success: on_success,
                _on_error: on_error,
            });
        }),
        Err(e) => report_failure(
            selection,
            GeolocationError {
                code: GeolocationErrorCode::Unsupported,
                message: format!("{e:?}"),
            },
        ),
    }
}

/// Cancel a position watch started by [`request_position`], if any.
pub fn stop_tracking() {
    WATCH_BINDING.with(|slot| {
        if let Some(binding) = slot.borrow_mut().take() {
            binding.geolocation.clear_watch(binding.watch_id);
        }
    });
}

fn report_fix(selection: RwSignal<SelectionState>, position: GeolocationPosition) {
    let coords = position.coords();
    let fix = GeoFix::from_reading(
        coords.latitude(),
        coords.longitude(),
        coords.accuracy(),
        position.timestamp(),
    );
    let age_ms = (chrono::Utc::now() - fix.acquired_at).num_milliseconds().max(0);
    web_sys::console::log_1(
        &format!(
            "User location: {:.6}, {:.6} (±{:.0} m, {age_ms} ms old)",
            fix.position.lat, fix.position.lng, fix.accuracy_m
        )
        .into(),
    );
    selection.try_update(|s| s.on_geolocation_resolved(fix.position));
}

fn report_failure(selection: RwSignal<SelectionState>, error: GeolocationError) {
    web_sys::console::error_1(&format!("Error getting user location: {error}").into());
    selection.try_update(|s| s.on_geolocation_failed(&error));
}

fn to_error(err: GeolocationPositionError) -> GeolocationError {
    GeolocationError {
        code: GeolocationErrorCode::from_dom_code(err.code()),
        message: err.message(),
    }
}
