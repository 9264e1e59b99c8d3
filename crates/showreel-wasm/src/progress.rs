use gloo_timers::callback::Timeout;
use showreel_core::{Delay, ProgressConfig, ProgressSink, ProgressTracker};
use wasm_bindgen::JsCast;
use web_sys::HtmlElement;

use crate::dom;

/// The progress bar element, driven through its `--progress` custom property.
pub struct ProgressBar {
    element: HtmlElement,
    done_class: String,
}

impl ProgressSink for ProgressBar {
    fn render(&self, value: f64) {
        if let Err(e) = self
            .element
            .style()
            .set_property("--progress", &value.to_string())
        {
            tracing::debug!("progress render failed: {}", dom::js_error(e));
        }
    }

    fn complete(&self, removal_delay: Delay) {
        let _ = self.element.class_list().add_1(&self.done_class);
        tracing::debug!(after = %removal_delay, "progress bar done; scheduling removal");
        let element = self.element.clone();
        Timeout::new(removal_delay.as_millis(), move || element.remove()).forget();
    }
}

pub type PageProgress = ProgressTracker<ProgressBar>;

/// A tracker bound to `selector`; every update is a no-op when the page has no bar.
pub fn init(selector: &str, done_class: &str, config: ProgressConfig) -> PageProgress {
    let bar = dom::query(selector)
        .and_then(|el| el.dyn_into::<HtmlElement>().ok())
        .map(|element| ProgressBar {
            element,
            done_class: done_class.to_string(),
        });
    if bar.is_none() {
        tracing::debug!(selector, "no progress bar on this page");
    }
    ProgressTracker::new(bar, config)
}
