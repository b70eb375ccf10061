use std::cell::{Cell, RefCell};
use std::rc::Rc;

use campus_shared::{LatLngBounds, MapConfig, PositionReconciler, WaypointEdits, WaypointEnd};
use gloo_timers::callback::Interval;
use leptos::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, PointerEvent, WheelEvent};

use crate::app::Selection;
use crate::format::{format_distance, format_duration, straight_line_note};
use crate::icons::{MarkerIcons, load_marker_icons};
use crate::markers::{MarkerId, PlacedMarker, hit_test, hit_waypoint, popup_tip};
use crate::render_loop::FrameScheduler;
use crate::renderer::{MapScene, paint};
use crate::routing::{self, RouteDrawing, RouteFraming};
use crate::tiles::{TileCache, request_tiles};
use crate::viewport::Viewport;

/// Picture shown in a destination's popup.
const POPUP_IMAGE: &str = "https://cdn-icons-png.freepik.com/512/12727/12727781.png";
const FIT_PADDING_PX: f64 = 40.0;
/// Pointer travel below which a press-release counts as a click.
const CLICK_SLOP_PX: f64 = 5.0;
/// Minimum gap between route requests while a waypoint pin is being dragged.
const DRAG_REROUTE_MS: f64 = 300.0;

thread_local! {
    static COMMIT_TICK: RefCell<Option<Interval>> = const { RefCell::new(None) };
}

fn local_point(
    canvas_ref: NodeRef<leptos::html::Canvas>,
    client_x: f64,
    client_y: f64,
) -> Option<(f64, f64)> {
    let el = canvas_ref.get_untracked()?;
    let rect = el.get_bounding_client_rect();
    Some((client_x - rect.left(), client_y - rect.top()))
}

/// Commit the buffered user position in response to the map moving.
fn commit_on_interaction(displayed: RwSignal<Option<PositionReconciler>>) {
    displayed.maybe_update(|d| d.as_mut().is_some_and(|r| r.on_map_interaction()));
}

/// The interactive map: tiles, markers, the route to the selected point and
/// the user's (throttled) position. Mounted only while the map is open.
#[component]
pub fn MapView() -> impl IntoView {
    let config: MapConfig = expect_context();
    let Selection(selection) = expect_context();

    let viewport = RwSignal::new(Viewport::centered_on(
        config.initial_center,
        config.initial_zoom,
        config.min_zoom,
        config.max_zoom,
    ));
    let displayed: RwSignal<Option<PositionReconciler>> = RwSignal::new(None);
    let drawn_route: RwSignal<Option<RouteDrawing>> = RwSignal::new(None);
    let popup: RwSignal<Option<MarkerId>> = RwSignal::new(None);
    let edits: RwSignal<WaypointEdits> = RwSignal::new(WaypointEdits::default());
    let effective = Memo::new(move |_| edits.with(|e| e.effective()));

    let canvas_ref = NodeRef::<leptos::html::Canvas>::new();

    let tile_cache = Rc::new(RefCell::new(TileCache::new(
        config.tile_url.clone(),
        config.tile_subdomains.clone(),
    )));
    let icons = Rc::new(RefCell::new(MarkerIcons::default()));
    let placed: Rc<RefCell<Vec<PlacedMarker>>> = Rc::new(RefCell::new(Vec::new()));

    // Cached Canvas 2D context (invalidated on canvas resize)
    let cached_ctx: Rc<RefCell<Option<CanvasRenderingContext2d>>> = Rc::new(RefCell::new(None));

    let scheduler = {
        let tile_cache = tile_cache.clone();
        let icons = icons.clone();
        let placed = placed.clone();
        let points = config.points.clone();
        Rc::new(FrameScheduler::new(move || {
            let Some(canvas) = canvas_ref.get_untracked() else {
                return false;
            };
            let canvas: &HtmlCanvasElement = &canvas;
            let Some(parent) = canvas.parent_element() else {
                return false;
            };
            let w = parent.client_width() as f64;
            let h = parent.client_height() as f64;
            if w <= 0.0 || h <= 0.0 {
                return false;
            }
            let dpr = web_sys::window()
                .map(|win| win.device_pixel_ratio())
                .unwrap_or(1.0)
                .max(1.0);
            let pw = (w * dpr).round() as u32;
            let ph = (h * dpr).round() as u32;
            if canvas.width() != pw || canvas.height() != ph {
                canvas.set_width(pw);
                canvas.set_height(ph);
                *cached_ctx.borrow_mut() = None;
            }

            if viewport.with_untracked(|vp| vp.width != w || vp.height != h) {
                viewport.update(|vp| {
                    vp.width = w;
                    vp.height = h;
                });
            }

            let ctx = {
                let mut ctx_cache = cached_ctx.borrow_mut();
                if ctx_cache.is_none() {
                    let Some(ctx) = canvas
                        .get_context("2d")
                        .ok()
                        .flatten()
                        .and_then(|ctx| ctx.dyn_into::<CanvasRenderingContext2d>().ok())
                    else {
                        return false;
                    };
                    *ctx_cache = Some(ctx);
                }
                let Some(ctx) = ctx_cache.clone() else {
                    return false;
                };
                ctx
            };
            // All drawing stays in CSS pixel coords
            ctx.set_transform(dpr, 0.0, 0.0, dpr, 0.0, 0.0).ok();

            let vp = viewport.get_untracked();
            let user = displayed.with_untracked(|d| d.as_ref().map(|r| r.current()));
            let route = drawn_route.get_untracked();
            let waypoints = effective.get_untracked();
            let tiles = tile_cache.borrow();
            let icons = icons.borrow();
            *placed.borrow_mut() = paint(
                &ctx,
                MapScene {
                    vp: &vp,
                    tiles: &tiles,
                    icons: &icons,
                    points: &points,
                    user,
                    route: route.as_ref(),
                    waypoints,
                },
            );
            false
        }))
    };

    {
        let sched = scheduler.clone();
        load_marker_icons(icons.clone(), Rc::new(move || sched.mark_dirty()));
    }

    // Repaint on anything the canvas shows
    let sched_paint = scheduler.clone();
    Effect::new(move || {
        viewport.track();
        displayed.track();
        drawn_route.track();
        effective.track();
        let _ = canvas_ref.get();
        sched_paint.mark_dirty();
    });

    // Fetch the tiles the viewport now covers
    let sched_tiles = scheduler.clone();
    let tile_cache_fx = tile_cache.clone();
    Effect::new(move || {
        let wanted = viewport.with(|vp| vp.visible_tiles());
        let sched = sched_tiles.clone();
        request_tiles(&tile_cache_fx, &wanted, Rc::new(move || sched.mark_dirty()));
    });

    // Buffer fresh fixes; the first one is shown immediately
    let user_position = Memo::new(move |_| selection.with(|s| s.user_position()));
    let policy = config.commit_policy;
    Effect::new(move || {
        let Some(position) = user_position.get() else {
            return;
        };
        displayed.update(|d| match d {
            Some(reconciler) => reconciler.on_position_update(position),
            None => *d = Some(PositionReconciler::new(position, policy)),
        });
    });

    // Any viewport movement counts as map interaction
    Effect::new(move || {
        viewport.track();
        commit_on_interaction(displayed);
    });

    COMMIT_TICK.with(|slot| {
        *slot.borrow_mut() = Some(Interval::new(config.commit_interval_ms, move || {
            displayed.maybe_update(|d| d.as_mut().is_some_and(|r| r.on_tick()));
        }));
    });

    routing::attach(
        drawn_route,
        config.routing_url.clone(),
        config.route_profile,
    );
    let waypoints = Memo::new(move |_| selection.with(|s| s.route_waypoints()));
    Effect::new(move || {
        let base = waypoints.get();
        edits.maybe_update(|e| e.rebase(base));
    });

    // Pin being dragged, and where the pointer holds it relative to the tip
    let dragged_end: Rc<Cell<Option<WaypointEnd>>> = Rc::new(Cell::new(None));
    let grab_offset = Rc::new(Cell::new((0.0f64, 0.0f64)));
    let last_reroute = Rc::new(Cell::new(f64::NEG_INFINITY));
    {
        let dragged_end = dragged_end.clone();
        let last_reroute = last_reroute.clone();
        Effect::new(move || {
            let desired = effective.get();
            let now = js_sys::Date::now();
            if dragged_end.get().is_some() && now - last_reroute.get() < DRAG_REROUTE_MS {
                return;
            }
            last_reroute.set(now);
            routing::sync(desired);
        });
    }

    // Frame the route once per destination
    let route_handle = Memo::new(move |_| drawn_route.with(|r| r.as_ref().map(|d| d.handle)));
    let framing = Rc::new(RefCell::new(RouteFraming::default()));
    Effect::new(move || {
        if route_handle.get().is_none() {
            return;
        }
        let Some(destination) = waypoints.get_untracked().map(|w| w.to) else {
            return;
        };
        if !framing.borrow_mut().should_frame(destination) {
            return;
        }
        let bounds = drawn_route.with_untracked(|r| {
            r.as_ref().and_then(|d| {
                let ends = [d.waypoints.from, d.waypoints.to];
                LatLngBounds::from_points(d.route.path.iter().chain(ends.iter()))
            })
        });
        if let Some(bounds) = bounds {
            viewport.update(|vp| vp.fit_bounds(&bounds, FIT_PADDING_PX));
        }
    });

    on_cleanup(|| {
        COMMIT_TICK.with(|slot| slot.borrow_mut().take());
        routing::detach();
    });

    // --- Input handlers ---

    let is_dragging = Rc::new(Cell::new(false));
    let drag_start = Rc::new(Cell::new((0.0f64, 0.0f64)));
    let last_pos = Rc::new(Cell::new((0.0f64, 0.0f64)));
    let pinch_dist = Rc::new(Cell::new(0.0f64));

    let on_wheel = move |e: WheelEvent| {
        e.prevent_default();
        let delta = e.delta_y();
        let (x, y) = local_point(canvas_ref, e.client_x() as f64, e.client_y() as f64)
            .unwrap_or((e.offset_x() as f64, e.offset_y() as f64));
        viewport.update(|vp| vp.zoom_at(delta, x, y));
    };

    let on_pointer_down = {
        let is_dragging = is_dragging.clone();
        let drag_start = drag_start.clone();
        let last_pos = last_pos.clone();
        let placed = placed.clone();
        let dragged_end = dragged_end.clone();
        let grab_offset = grab_offset.clone();
        move |e: PointerEvent| {
            let pos = (e.client_x() as f64, e.client_y() as f64);
            drag_start.set(pos);
            last_pos.set(pos);

            let grabbed = local_point(canvas_ref, pos.0, pos.1).and_then(|(x, y)| {
                hit_waypoint(&placed.borrow(), x, y)
                    .map(|(end, tip)| (end, (tip.0 - x, tip.1 - y)))
            });
            match grabbed {
                Some((end, offset)) => {
                    dragged_end.set(Some(end));
                    grab_offset.set(offset);
                }
                None => is_dragging.set(true),
            }

            if let Some(target) = e.target()
                && let Ok(el) = target.dyn_into::<web_sys::HtmlElement>()
            {
                el.set_pointer_capture(e.pointer_id()).ok();
                el.style().set_property("cursor", "grabbing").ok();
            }
        }
    };

    let on_pointer_move = {
        let is_dragging = is_dragging.clone();
        let last_pos = last_pos.clone();
        let dragged_end = dragged_end.clone();
        let grab_offset = grab_offset.clone();
        move |e: PointerEvent| {
            if let Some(end) = dragged_end.get() {
                let Some((x, y)) =
                    local_point(canvas_ref, e.client_x() as f64, e.client_y() as f64)
                else {
                    return;
                };
                let (ox, oy) = grab_offset.get();
                let position = viewport.with_untracked(|vp| vp.screen_to_lat_lng(x + ox, y + oy));
                edits.maybe_update(|e| e.move_end(end, position));
                return;
            }
            if !is_dragging.get() {
                return;
            }
            let (lx, ly) = last_pos.get();
            let pos = (e.client_x() as f64, e.client_y() as f64);
            last_pos.set(pos);
            viewport.update(|vp| vp.pan(pos.0 - lx, pos.1 - ly));
        }
    };

    let on_pointer_up = {
        let is_dragging = is_dragging.clone();
        move |e: PointerEvent| {
            is_dragging.set(false);
            // Route to where the pin was dropped, even inside the throttle window
            if dragged_end.take().is_some() {
                last_reroute.set(js_sys::Date::now());
                routing::sync(effective.get_untracked());
            }
            if let Some(target) = e.target()
                && let Ok(el) = target.dyn_into::<web_sys::HtmlElement>()
            {
                el.style().set_property("cursor", "grab").ok();
            }
        }
    };

    let on_click = {
        let drag_start = drag_start.clone();
        let placed = placed.clone();
        move |e: MouseEvent| {
            let (sx, sy) = drag_start.get();
            let dx = (e.client_x() as f64 - sx).abs();
            let dy = (e.client_y() as f64 - sy).abs();
            if dx >= CLICK_SLOP_PX || dy >= CLICK_SLOP_PX {
                return;
            }
            let Some((x, y)) = local_point(canvas_ref, e.client_x() as f64, e.client_y() as f64)
            else {
                return;
            };
            let hit = hit_test(&placed.borrow(), x, y);
            popup.set(hit);
        }
    };

    let on_touch_start = {
        let pinch_dist = pinch_dist.clone();
        move |e: web_sys::TouchEvent| {
            let touches = e.touches();
            if touches.length() == 2 {
                e.prevent_default();
                let (Some(t0), Some(t1)) = (touches.get(0), touches.get(1)) else {
                    return;
                };
                let dx = (t1.client_x() - t0.client_x()) as f64;
                let dy = (t1.client_y() - t0.client_y()) as f64;
                pinch_dist.set((dx * dx + dy * dy).sqrt());
            }
        }
    };

    let on_touch_move = {
        let pinch_dist = pinch_dist.clone();
        move |e: web_sys::TouchEvent| {
            let touches = e.touches();
            if touches.length() != 2 {
                return;
            }
            e.prevent_default();
            let (Some(t0), Some(t1)) = (touches.get(0), touches.get(1)) else {
                return;
            };
            let dx = (t1.client_x() - t0.client_x()) as f64;
            let dy = (t1.client_y() - t0.client_y()) as f64;
            let new_dist = (dx * dx + dy * dy).sqrt();
            let old_dist = pinch_dist.get();

            if old_dist > 0.0 {
                let mid_x = (t0.client_x() + t1.client_x()) as f64 / 2.0;
                let mid_y = (t0.client_y() + t1.client_y()) as f64 / 2.0;
                let (x, y) = local_point(canvas_ref, mid_x, mid_y).unwrap_or((mid_x, mid_y));
                let delta = -(new_dist - old_dist) * 2.0;
                viewport.update(|vp| vp.zoom_at(delta, x, y));
            }

            pinch_dist.set(new_dist);
        }
    };

    let zoom_by = move |steps: f64| {
        viewport.update(|vp| {
            let (cx, cy) = (vp.width / 2.0, vp.height / 2.0);
            vp.zoom_step(steps, cx, cy);
        });
    };

    let points = config.points.clone();
    let popup_view = move || {
        let id = popup.get()?;
        let (anchor, body) = match id {
            MarkerId::Waypoint(_) => return None,
            MarkerId::User => {
                let anchor = displayed.with(|d| d.as_ref().map(|r| r.current()))?;
                (anchor, view! { <span>"Your Location"</span> }.into_any())
            }
            MarkerId::Point(idx) => {
                let point = points.get(idx)?.clone();
                let user = displayed.with(|d| d.as_ref().map(|r| r.current()));
                let routed = drawn_route.with(|r| r.is_some());
                let note = straight_line_note(user, point.coordinates, routed)
                    .map(|text| view! { <br /><small class="popup-distance">{text}</small> });
                let body = view! {
                    <img
                        src=POPUP_IMAGE
                        alt=point.title.clone()
                        style="width: 100px; height: 100px;"
                    />
                    <br />
                    {point.title}
                    {note}
                };
                (point.coordinates, body.into_any())
            }
        };
        let (x, y) = popup_tip(viewport.with(|vp| vp.lat_lng_to_screen(anchor)));
        let style = format!(
            "position: absolute; left: {x}px; top: {y}px; transform: translate(-50%, -100%); \
             background: #fff; border-radius: 8px; padding: 8px 24px 8px 12px; \
             box-shadow: 0 3px 14px rgba(0, 0, 0, 0.4); font: 13px sans-serif; text-align: center;"
        );
        Some(view! {
            <div class="map-popup" style=style>
                <button
                    class="map-popup-close"
                    style="position: absolute; top: 2px; right: 4px; border: none; background: none; cursor: pointer;"
                    on:click=move |_| popup.set(None)
                >
                    "×"
                </button>
                {body}
            </div>
        })
    };

    let route_summary = move || {
        drawn_route.with(|r| {
            r.as_ref().map(|d| {
                let summary = format!(
                    "{}, {}",
                    format_distance(d.route.distance_m),
                    format_duration(d.route.duration_s)
                );
                let steps: Vec<(String, String)> = d
                    .route
                    .steps
                    .iter()
                    .map(|step| {
                        let distance = if step.distance_m > 0.0 {
                            format_distance(step.distance_m)
                        } else {
                            String::new()
                        };
                        (step.instruction(), distance)
                    })
                    .collect();
                (summary, steps)
            })
        })
    };

    view! {
        <div class="map-container" style="position: relative;">
            <button
                class="close-button"
                on:click=move |_| selection.update(|s| s.on_close_requested())
            >
                "Close"
            </button>
            <div style="position: relative; width: 100%; height: 80vh; overflow: hidden;">
                <canvas
                    node_ref=canvas_ref
                    style="position: absolute; inset: 0; width: 100%; height: 100%; touch-action: none; cursor: grab;"
                    on:wheel=on_wheel
                    on:pointerdown=on_pointer_down
                    on:pointermove=on_pointer_move
                    on:pointerup=on_pointer_up
                    on:click=on_click
                    on:touchstart=on_touch_start
                    on:touchmove=on_touch_move
                />
                {popup_view}
                <div style="position: absolute; top: 10px; left: 10px; display: flex; flex-direction: column; gap: 2px;">
                    <button class="zoom-in" on:click=move |_| zoom_by(1.0)>"+"</button>
                    <button class="zoom-out" on:click=move |_| zoom_by(-1.0)>"−"</button>
                </div>
                {move || {
                    route_summary()
                        .map(|(summary, steps)| {
                            view! {
                                <div
                                    class="route-summary"
                                    style="position: absolute; top: 10px; right: 10px; max-width: 280px; max-height: 60%; overflow-y: auto; background: #fff; padding: 6px 10px; border-radius: 4px; font: 13px sans-serif;"
                                >
                                    <strong>{summary}</strong>
                                    <ol class="route-itinerary" style="margin: 6px 0 0; padding-left: 18px;">
                                        {steps
                                            .into_iter()
                                            .map(|(instruction, distance)| {
                                                view! {
                                                    <li>
                                                        {instruction}
                                                        <span style="float: right; padding-left: 8px; color: #666;">
                                                            {distance}
                                                        </span>
                                                    </li>
                                                }
                                            })
                                            .collect_view()}
                                    </ol>
                                </div>
                            }
                        })
                }}
                <div
                    class="attribution"
                    style="position: absolute; right: 0; bottom: 0; background: rgba(255, 255, 255, 0.8); padding: 0 5px; font: 11px sans-serif;"
                    inner_html=config.attribution.clone()
                />
            </div>
        </div>
    }
}
