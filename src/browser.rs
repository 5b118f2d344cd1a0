/// Small browser helpers shared by the content script and the popup
use crate::page::PageProbe;
use std::time::Duration;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::Document;

pub fn document() -> Result<Document, JsValue> {
    web_sys::window()
        .and_then(|window| window.document())
        .ok_or_else(|| JsValue::from_str("no document available"))
}

/// Resolve after `duration` using the page's `setTimeout`.
pub async fn sleep(duration: Duration) {
    let millis = i32::try_from(duration.as_millis()).unwrap_or(i32::MAX);
    let promise = js_sys::Promise::new(&mut |resolve, _reject| {
        let scheduled = web_sys::window().map(|window| {
            window.set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, millis)
        });
        if !matches!(scheduled, Some(Ok(_))) {
            let _ = resolve.call0(&JsValue::NULL);
        }
    });
    let _ = JsFuture::from(promise).await;
}

/// Current time as an ISO-8601 string, the `addedAt` format.
pub fn now_iso() -> String {
    js_sys::Date::new_0().to_iso_string().into()
}

/// Live view of the current document for page classification.
pub struct DocumentProbe {
    document: Document,
}

impl DocumentProbe {
    pub fn new(document: Document) -> Self {
        DocumentProbe { document }
    }

    pub fn text_of(&self, selector: &str) -> Option<String> {
        self.document
            .query_selector(selector)
            .ok()
            .flatten()
            .and_then(|element| element.text_content())
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
    }

    pub fn attribute_of(&self, selector: &str, attribute: &str) -> Option<String> {
        self.document
            .query_selector(selector)
            .ok()
            .flatten()
            .and_then(|element| element.get_attribute(attribute))
            .filter(|value| !value.is_empty())
    }

    pub fn title(&self) -> String {
        self.document.title()
    }
}

impl PageProbe for DocumentProbe {
    fn url(&self) -> String {
        self.document
            .location()
            .and_then(|location| location.href().ok())
            .unwrap_or_default()
    }

    fn has_element(&self, selector: &str) -> bool {
        matches!(self.document.query_selector(selector), Ok(Some(_)))
    }

    fn body_has_class(&self, class: &str) -> bool {
        self.document
            .body()
            .is_some_and(|body| body.class_list().contains(class))
    }
}
