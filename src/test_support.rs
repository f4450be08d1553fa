//! In-memory page and storage used by the unit tests.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};

use crate::error::{TocError, TocResult};
use crate::host::{HeadingCandidate, PageHost, PreferenceStore};

const HEADING_SPACING: f64 = 400.0;

#[derive(Clone, Debug)]
struct FakeElement {
    level: u8,
    text: String,
    id: Option<String>,
    offset: f64,
}

/// A rendered page: headings at fixed document offsets, a scroll position,
/// a location hash and a viewport width.
#[derive(Clone, Debug)]
pub struct FakePage {
    elements: Vec<FakeElement>,
    foreign_ids: HashSet<String>,
    content_root: bool,
    scroll_y: f64,
    hash: String,
    width: f64,
}

impl FakePage {
    /// Lays out every heading of `markdown` `HEADING_SPACING` apart, starting
    /// at offset 0. `{#id}` attributes become pre-existing element ids.
    pub fn from_markdown(markdown: &str) -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_HEADING_ATTRIBUTES);

        let mut elements = Vec::new();
        let mut current: Option<FakeElement> = None;
        for event in Parser::new_ext(markdown, options) {
            match event {
                Event::Start(Tag::Heading { level, id, .. }) => {
                    current = Some(FakeElement {
                        level: level as u8,
                        text: String::new(),
                        id: id.map(|id| id.to_string()),
                        offset: elements.len() as f64 * HEADING_SPACING,
                    });
                }
                Event::Text(text) | Event::Code(text) => {
                    if let Some(element) = current.as_mut() {
                        element.text.push_str(&text);
                    }
                }
                Event::End(TagEnd::Heading(_)) => {
                    if let Some(element) = current.take() {
                        elements.push(element);
                    }
                }
                _ => {}
            }
        }

        Self {
            elements,
            foreign_ids: HashSet::new(),
            content_root: true,
            scroll_y: 0.0,
            hash: String::new(),
            width: 1440.0,
        }
    }

    pub fn add_foreign_id(&mut self, id: &str) {
        self.foreign_ids.insert(id.to_string());
    }

    pub fn remove_content_root(&mut self) {
        self.content_root = false;
    }

    pub fn element_id(&self, index: usize) -> Option<String> {
        self.elements.get(index).and_then(|element| element.id.clone())
    }

    pub fn scroll_to(&mut self, y: f64) {
        self.scroll_y = y;
    }

    /// Pins the viewport-relative tops of the headings, in document order.
    pub fn set_tops(&mut self, tops: &[f64]) {
        self.scroll_y = 0.0;
        for (element, top) in self.elements.iter_mut().zip(tops) {
            element.offset = *top;
        }
    }

    pub fn set_hash(&mut self, hash: &str) {
        self.hash = hash.to_string();
    }

    pub fn set_width(&mut self, width: f64) {
        self.width = width;
    }
}

impl PageHost for FakePage {
    type Node = usize;

    fn heading_candidates(&self, max_level: u8) -> Option<Vec<HeadingCandidate<usize>>> {
        if !self.content_root {
            return None;
        }
        Some(
            self.elements
                .iter()
                .enumerate()
                .filter(|(_, element)| element.level <= max_level)
                .map(|(index, element)| HeadingCandidate {
                    node: index,
                    level: element.level,
                    text: element.text.clone(),
                    id: element.id.clone().filter(|id| !id.is_empty()),
                })
                .collect(),
        )
    }

    fn id_in_use(&self, id: &str) -> bool {
        self.foreign_ids.contains(id)
            || self
                .elements
                .iter()
                .any(|element| element.id.as_deref() == Some(id))
    }

    fn assign_id(&mut self, node: &usize, id: &str) {
        if let Some(element) = self.elements.get_mut(*node) {
            element.id = Some(id.to_string());
        }
    }

    fn heading_top(&self, node: &usize) -> f64 {
        self.elements
            .get(*node)
            .map(|element| element.offset - self.scroll_y)
            .unwrap_or(f64::INFINITY)
    }

    fn location_hash(&self) -> String {
        self.hash.clone()
    }

    fn viewport_width(&self) -> f64 {
        self.width
    }
}

/// Storage shared between clones, so a second controller sees what the first
/// one persisted.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    values: Rc<RefCell<HashMap<String, String>>>,
    failing: Rc<RefCell<bool>>,
    writes: Rc<RefCell<usize>>,
}

impl MemoryStore {
    pub fn failing() -> Self {
        let store = Self::default();
        *store.failing.borrow_mut() = true;
        store
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.values.borrow().get(key).cloned()
    }

    pub fn set(&self, key: &str, value: &str) {
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
    }

    pub fn write_count(&self) -> usize {
        *self.writes.borrow()
    }
}

impl PreferenceStore for MemoryStore {
    fn read(&self, key: &str) -> TocResult<Option<String>> {
        if *self.failing.borrow() {
            return Err(TocError::StorageUnavailable);
        }
        Ok(self.get(key))
    }

    fn write(&mut self, key: &str, value: &str) -> TocResult<()> {
        if *self.failing.borrow() {
            return Err(TocError::Storage("quota exceeded".into()));
        }
        *self.writes.borrow_mut() += 1;
        self.set(key, value);
        Ok(())
    }
}
