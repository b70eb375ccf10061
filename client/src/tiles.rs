use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};

use campus_shared::TileCoord;
use js_sys::Reflect;
use wasm_bindgen::JsCast;
use wasm_bindgen::JsValue;
use wasm_bindgen::prelude::*;
use web_sys::HtmlImageElement;

const MAX_CONCURRENCY: usize = 6;
const MAX_CACHED_TILES: usize = 384;
const ONLOAD_HANDLE_KEY: &str = "__campusTileOnload";
const ONERROR_HANDLE_KEY: &str = "__campusTileOnerror";

static TILE_WARNED: AtomicBool = AtomicBool::new(false);

type LoadedCallback = Rc<dyn Fn()>;

enum TileEntry {
    Loading,
    Ready(HtmlImageElement),
    Failed,
}

/// Raster tiles fetched from a `{s}/{z}/{x}/{y}` template, loaded a few at a
/// time and kept until the cache grows past its limit.
pub struct TileCache {
    template: String,
    subdomains: String,
    entries: HashMap<TileCoord, TileEntry>,
    queue: VecDeque<TileCoord>,
    in_flight: usize,
}

impl TileCache {
    pub fn new(template: impl Into<String>, subdomains: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            subdomains: subdomains.into(),
            entries: HashMap::new(),
            queue: VecDeque::new(),
            in_flight: 0,
        }
    }

    pub fn image(&self, tile: &TileCoord) -> Option<&HtmlImageElement> {
        match self.entries.get(tile) {
            Some(TileEntry::Ready(img)) => Some(img),
            _ => None,
        }
    }

    /// The nearest loaded ancestor of `tile` (up to a few levels), with the
    /// zoom difference, for drawing a scaled placeholder.
    pub fn loaded_ancestor(&self, tile: &TileCoord) -> Option<(&HtmlImageElement, TileCoord)> {
        let mut current = *tile;
        for _ in 0..3 {
            if current.z == 0 {
                return None;
            }
            current = TileCoord {
                x: current.x / 2,
                y: current.y / 2,
                z: current.z - 1,
            };
            if let Some(img) = self.image(&current) {
                return Some((img, current));
            }
        }
        None
    }

    fn prune(&mut self, keep: &HashSet<TileCoord>) {
        if self.entries.len() <= MAX_CACHED_TILES {
            return;
        }
        self.entries
            .retain(|coord, entry| keep.contains(coord) || matches!(entry, TileEntry::Loading));
    }
}

/// Queue every tile in `wanted` that is not cached yet. Tiles queued for an
/// earlier view and not started are dropped.
pub fn request_tiles(cache: &Rc<RefCell<TileCache>>, wanted: &[TileCoord], on_loaded: LoadedCallback) {
    {
        let mut c = cache.borrow_mut();
        let keep: HashSet<TileCoord> = wanted.iter().copied().collect();
        c.prune(&keep);
        c.queue.clear();
        for tile in wanted {
            if !c.entries.contains_key(tile) {
                c.queue.push_back(*tile);
            }
        }
    }
    pump_queue(cache, on_loaded);
}

fn pump_queue(cache: &Rc<RefCell<TileCache>>, on_loaded: LoadedCallback) {
    loop {
        let (tile, src) = {
            let mut c = cache.borrow_mut();
            if c.in_flight >= MAX_CONCURRENCY {
                return;
            }
            let Some(tile) = c.queue.pop_front() else {
                return;
            };
            c.in_flight += 1;
            c.entries.insert(tile, TileEntry::Loading);
            let src = tile.url(&c.template, &c.subdomains);
            (tile, src)
        };
        load_tile(cache.clone(), tile, src, on_loaded.clone());
    }
}

fn finish(cache: &Rc<RefCell<TileCache>>, tile: TileCoord, entry: TileEntry) {
    let mut c = cache.borrow_mut();
    c.in_flight = c.in_flight.saturating_sub(1);
    c.entries.insert(tile, entry);
}

fn load_tile(cache: Rc<RefCell<TileCache>>, tile: TileCoord, src: String, on_loaded: LoadedCallback) {
    let img = match HtmlImageElement::new() {
        Ok(img) => img,
        Err(_) => {
            finish(&cache, tile, TileEntry::Failed);
            return;
        }
    };

    let img_for_load = img.clone();
    let cache_load = cache.clone();
    let on_loaded_load = on_loaded.clone();
    let onload = Closure::<dyn FnMut()>::new(move || {
        clear_image_handlers(&img_for_load);
        finish(&cache_load, tile, TileEntry::Ready(img_for_load.clone()));
        on_loaded_load();
        pump_queue(&cache_load, on_loaded_load.clone());
    });

    let img_for_error = img.clone();
    let cache_error = cache.clone();
    let src_for_error = src.clone();
    let onerror = Closure::<dyn FnMut()>::new(move || {
        clear_image_handlers(&img_for_error);
        finish(&cache_error, tile, TileEntry::Failed);
        warn_tile_once(&src_for_error);
        pump_queue(&cache_error, on_loaded.clone());
    });

    let onload_js = onload.into_js_value();
    let onerror_js = onerror.into_js_value();
    img.set_onload(Some(onload_js.unchecked_ref()));
    img.set_onerror(Some(onerror_js.unchecked_ref()));
    // Keep the closures reachable from the element until one of them fires.
    let _ = Reflect::set(img.as_ref(), &JsValue::from_str(ONLOAD_HANDLE_KEY), &onload_js);
    let _ = Reflect::set(img.as_ref(), &JsValue::from_str(ONERROR_HANDLE_KEY), &onerror_js);
    img.set_src(&src);
}

fn clear_image_handlers(img: &HtmlImageElement) {
    img.set_onload(None);
    img.set_onerror(None);
    let _ = Reflect::delete_property(img.as_ref(), &JsValue::from_str(ONLOAD_HANDLE_KEY));
    let _ = Reflect::delete_property(img.as_ref(), &JsValue::from_str(ONERROR_HANDLE_KEY));
}

fn warn_tile_once(src: &str) {
    if TILE_WARNED
        .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
        .is_ok()
    {
        web_sys::console::warn_1(&format!("Failed to load map tile {src}; leaving it blank.").into());
    }
}
