//! Browser tests for the DOM-backed page probe.
#![cfg(target_arch = "wasm32")]

use qeseh_mjeed::browser::{self, DocumentProbe};
use qeseh_mjeed::page::{self, PageProbe, PageRole, RetrySchedule};
use std::time::Duration;
use wasm_bindgen_test::*;
use web_sys::Element;

wasm_bindgen_test_configure!(run_in_browser);

fn add_element(class: &str, html: &str) -> Element {
    let document = browser::document().unwrap();
    let element = document.create_element("div").unwrap();
    element.set_class_name(class);
    element.set_inner_html(html);
    document.body().unwrap().append_child(&element).unwrap();
    element
}

fn probe() -> DocumentProbe {
    DocumentProbe::new(browser::document().unwrap())
}

#[wasm_bindgen_test]
fn test_bare_page_is_unclassified() {
    assert_eq!(page::classify(&probe()), None);
}

#[wasm_bindgen_test]
fn test_listing_detected_from_item_cards() {
    let card = add_element("block-post", "<a href='/series/x/'>x</a>");

    assert_eq!(page::classify(&probe()), Some(PageRole::Listing));

    card.remove();
}

#[wasm_bindgen_test]
fn test_series_detected_from_body_class() {
    let body = browser::document().unwrap().body().unwrap();
    body.class_list().add_1("single-post").unwrap();

    assert!(probe().body_has_class("single-post"));
    assert_eq!(page::classify(&probe()), Some(PageRole::Series));

    body.class_list().remove_1("single-post").unwrap();
}

#[wasm_bindgen_test]
fn test_reads_title_and_poster() {
    let info = add_element(
        "singleSeries",
        "<div class='singleInfo'><h1>  مسلسل الاختبار  </h1></div><img src='https://img.test/p.jpg'>",
    );
    let probe = probe();

    assert_eq!(probe.text_of(".singleInfo h1").as_deref(), Some("مسلسل الاختبار"));
    assert_eq!(
        probe.attribute_of(".singleSeries img", "src").as_deref(),
        Some("https://img.test/p.jpg")
    );
    assert_eq!(probe.text_of(".missing"), None);

    info.remove();
}

#[wasm_bindgen_test]
async fn test_reconcile_waits_for_late_content() {
    let document = browser::document().unwrap();
    let schedule = RetrySchedule {
        initial_delay: Duration::from_millis(0),
        max_attempts: 10,
        backoff: Duration::from_millis(20),
    };

    let card = document.create_element("div").unwrap();
    card.set_class_name("block-post");
    let pending = card.clone();
    let mut inserted = false;
    let role = page::reconcile(&probe(), &schedule, move |delay: Duration| {
        if !inserted {
            browser::document().unwrap().body().unwrap().append_child(&pending).unwrap();
            inserted = true;
        }
        browser::sleep(delay)
    })
    .await;

    assert_eq!(role, Some(PageRole::Listing));
    card.remove();
}
