use campus_shared::MapConfig;

/// Id of the `<script type="application/json">` element that may carry overrides.
const CONFIG_ELEMENT_ID: &str = "campus-map-config";

/// Read the page's map settings. A missing element yields the defaults; an
/// invalid one is reported and also falls back to the defaults.
pub fn load_page_config() -> MapConfig {
    let Some(text) = web_sys::window()
        .and_then(|w| w.document())
        .and_then(|d| d.get_element_by_id(CONFIG_ELEMENT_ID))
        .and_then(|el| el.text_content())
    else {
        return MapConfig::default();
    };
    if text.trim().is_empty() {
        return MapConfig::default();
    }
    match MapConfig::from_json(&text) {
        Ok(config) => config,
        Err(e) => {
            web_sys::console::warn_1(
                &format!("Ignoring #{CONFIG_ELEMENT_ID}: {e}; using defaults.").into(),
            );
            MapConfig::default()
        }
    }
}
