use campus_shared::MapConfig;
use leptos::prelude::*;

use crate::app::Selection;

/// Always-visible list of campus places. Picking one opens the map on it.
#[component]
pub fn PoiList() -> impl IntoView {
    let config: MapConfig = expect_context();
    let Selection(selection) = expect_context();

    let items = config
        .points
        .into_iter()
        .map(|point| {
            let title = point.title.clone();
            let image = point.image.clone();
            let alt = title.clone();
            view! {
                <div
                    class="location-item"
                    style="display: flex; align-items: center; gap: 10px; padding: 6px 10px; cursor: pointer;"
                    on:click=move |_| selection.update(|s| s.on_point_selected(point.clone()))
                >
                    <img src=image alt=alt style="width: 50px; height: 50px;" />
                    <span>{title}</span>
                </div>
            }
        })
        .collect_view();

    view! { <div class="location-list">{items}</div> }
}
