use campus_shared::SelectionState;
use leptos::prelude::*;

use crate::config::load_page_config;
use crate::geolocation::{request_position, stop_tracking};
use crate::map_view::MapView;
use crate::poi_list::PoiList;

/// Shared selection/visibility state, wrapped so it has its own context slot.
#[derive(Clone, Copy)]
pub(crate) struct Selection(pub RwSignal<SelectionState>);

fn remove_loading_shell() {
    let Some(window) = web_sys::window() else {
        return;
    };
    let Some(document) = window.document() else {
        return;
    };
    if let Some(shell) = document.get_element_by_id("app-loading-shell") {
        shell.remove();
    }
}

#[component]
pub fn App() -> impl IntoView {
    let config = load_page_config();
    let selection = RwSignal::new(SelectionState::new());

    provide_context(config.clone());
    provide_context(Selection(selection));

    request_position(selection, config.track_position);
    on_cleanup(stop_tracking);

    // Only a visibility flip may mount or unmount the map; selection and
    // position changes update the mounted map in place.
    let map_visible = Memo::new(move |_| selection.with(|s| s.map_visible()));

    remove_loading_shell();

    view! {
        <div class="app">
            <Show when=move || map_visible.get()>
                <MapView />
            </Show>
            <PoiList />
        </div>
    }
}
