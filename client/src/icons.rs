use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};

use web_sys::HtmlImageElement;

pub const USER_MARKER_SRC: &str =
    "https://cdnjs.cloudflare.com/ajax/libs/leaflet/1.7.1/images/marker-icon-red.png";
pub const DESTINATION_MARKER_SRC: &str =
    "https://cdnjs.cloudflare.com/ajax/libs/leaflet/1.7.1/images/marker-icon.png";

/// Pin size in CSS pixels.
pub const ICON_SIZE: (f64, f64) = (25.0, 41.0);
/// Offset from the pin's top-left corner to the point it marks.
pub const ICON_ANCHOR: (f64, f64) = (12.0, 41.0);
/// Offset from the marked point to where a popup's tip sits.
pub const POPUP_ANCHOR: (f64, f64) = (1.0, -34.0);

static ICON_WARNED: AtomicBool = AtomicBool::new(false);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PinKind {
    User,
    Destination,
}

impl PinKind {
    /// Fill used when the icon image is unavailable.
    pub fn fallback_color(self) -> &'static str {
        match self {
            Self::User => "#cb2b3e",
            Self::Destination => "#2a81cb",
        }
    }
}

#[derive(Clone, Default)]
pub struct MarkerIcons {
    pub user: Option<HtmlImageElement>,
    pub destination: Option<HtmlImageElement>,
}

impl MarkerIcons {
    pub fn get(&self, kind: PinKind) -> Option<&HtmlImageElement> {
        match kind {
            PinKind::User => self.user.as_ref(),
            PinKind::Destination => self.destination.as_ref(),
        }
    }
}

fn warn_icon_once(message: &str) {
    if ICON_WARNED
        .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
        .is_ok()
    {
        web_sys::console::warn_1(&message.into());
    }
}

/// Decode both pin images in the background; `on_ready` fires after each one lands.
pub fn load_marker_icons(icons: Rc<RefCell<MarkerIcons>>, on_ready: Rc<dyn Fn()>) {
    for kind in [PinKind::User, PinKind::Destination] {
        let icons = icons.clone();
        let on_ready = on_ready.clone();
        wasm_bindgen_futures::spawn_local(async move {
            let Ok(image) = HtmlImageElement::new() else {
                warn_icon_once("Failed to create marker icon element; drawing plain pins.");
                return;
            };
            image.set_src(match kind {
                PinKind::User => USER_MARKER_SRC,
                PinKind::Destination => DESTINATION_MARKER_SRC,
            });
            match wasm_bindgen_futures::JsFuture::from(image.decode()).await {
                Ok(_) => {
                    let mut icons = icons.borrow_mut();
                    match kind {
                        PinKind::User => icons.user = Some(image),
                        PinKind::Destination => icons.destination = Some(image),
                    }
                    drop(icons);
                    on_ready();
                }
                Err(err) => {
                    warn_icon_once(&format!(
                        "Failed to decode marker icon: {:?}; drawing plain pins.",
                        err
                    ));
                }
            }
        });
    }
}
