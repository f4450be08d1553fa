use leptos::prelude::{document, window};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Element, HtmlElement, Storage};

use crate::config::{heading_selector, TocConfig};
use crate::error::{TocError, TocResult};
use crate::host::{HeadingCandidate, PageHost, PreferenceStore};

/// The live document, located through the configured selectors on every query
/// so that a host re-render never leaves stale handles behind.
pub struct DomHost {
    body_selector: String,
    content_selector: String,
}

impl DomHost {
    pub fn new(config: &TocConfig) -> Self {
        Self {
            body_selector: config.body_selector.clone(),
            content_selector: config.content_selector.clone(),
        }
    }

    pub fn body(&self) -> Option<HtmlElement> {
        query(&self.body_selector).and_then(|element| element.dyn_into::<HtmlElement>().ok())
    }

    fn content_root(&self) -> Option<Element> {
        query(&self.content_selector)
    }
}

fn query(selector: &str) -> Option<Element> {
    document().query_selector(selector).ok().flatten()
}

fn heading_level(element: &Element) -> Option<u8> {
    let tag = element.tag_name();
    let digits = tag.strip_prefix('H').or_else(|| tag.strip_prefix('h'))?;
    digits.parse().ok()
}

impl PageHost for DomHost {
    type Node = Element;

    fn heading_candidates(&self, max_level: u8) -> Option<Vec<HeadingCandidate<Element>>> {
        self.body()?;
        let root = self.content_root()?;
        let nodes = root.query_selector_all(&heading_selector(max_level)).ok()?;

        let mut candidates = Vec::with_capacity(nodes.length() as usize);
        for index in 0..nodes.length() {
            let Some(element) = nodes.item(index).and_then(|node| node.dyn_into::<Element>().ok())
            else {
                continue;
            };
            let Some(level) = heading_level(&element) else {
                continue;
            };
            let id = element.id();
            candidates.push(HeadingCandidate {
                text: element.text_content().unwrap_or_default(),
                id: (!id.is_empty()).then_some(id),
                level,
                node: element,
            });
        }
        Some(candidates)
    }

    fn id_in_use(&self, id: &str) -> bool {
        document().get_element_by_id(id).is_some()
    }

    fn assign_id(&mut self, node: &Element, id: &str) {
        node.set_id(id);
    }

    fn heading_top(&self, node: &Element) -> f64 {
        node.get_bounding_client_rect().top()
    }

    fn location_hash(&self) -> String {
        window().location().hash().unwrap_or_default()
    }

    fn viewport_width(&self) -> f64 {
        window()
            .inner_width()
            .ok()
            .and_then(|width| width.as_f64())
            .unwrap_or(f64::INFINITY)
    }
}

/// `window.localStorage`. Private browsing modes throw on access, which maps
/// to [`TocError::StorageUnavailable`] or [`TocError::Storage`].
#[derive(Default)]
pub struct LocalStore;

impl LocalStore {
    fn storage(&self) -> TocResult<Storage> {
        window()
            .local_storage()
            .map_err(js_error)?
            .ok_or(TocError::StorageUnavailable)
    }
}

impl PreferenceStore for LocalStore {
    fn read(&self, key: &str) -> TocResult<Option<String>> {
        self.storage()?.get_item(key).map_err(js_error)
    }

    fn write(&mut self, key: &str, value: &str) -> TocResult<()> {
        self.storage()?.set_item(key, value).map_err(js_error)
    }
}

fn js_error(value: JsValue) -> TocError {
    TocError::Storage(value.as_string().unwrap_or_else(|| format!("{value:?}")))
}
