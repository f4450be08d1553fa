use log::{debug, warn};

use crate::host::PreferenceStore;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewportClass {
    Mobile,
    Desktop,
}

impl ViewportClass {
    pub fn from_width(width: f64, breakpoint: f64) -> Self {
        if width <= breakpoint {
            Self::Mobile
        } else {
            Self::Desktop
        }
    }

    /// Panel state when the reader never chose one.
    pub fn default_open(self) -> bool {
        self == Self::Desktop
    }
}

pub fn parse_preference(value: &str) -> Option<bool> {
    match value {
        "1" => Some(true),
        "0" => Some(false),
        _ => None,
    }
}

pub fn encode_preference(open: bool) -> &'static str {
    if open {
        "1"
    } else {
        "0"
    }
}

pub fn read_preference<S: PreferenceStore>(store: &S, key: &str) -> Option<bool> {
    match store.read(key) {
        Ok(value) => value.as_deref().and_then(parse_preference),
        Err(err) => {
            debug!("ignoring stored TOC preference: {err}");
            None
        }
    }
}

pub fn write_preference<S: PreferenceStore>(store: &mut S, key: &str, open: bool) {
    if let Err(err) = store.write(key, encode_preference(open)) {
        warn!("TOC preference not saved: {err}");
    }
}

/// The open/closed flag. Resolved once per document load and kept across
/// rebuilds, scrolling and resizing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Visibility {
    open: Option<bool>,
}

impl Visibility {
    pub fn resolve(&mut self, stored: impl FnOnce() -> Option<bool>, viewport: ViewportClass) -> bool {
        *self
            .open
            .get_or_insert_with(|| stored().unwrap_or_else(|| viewport.default_open()))
    }

    pub fn set(&mut self, open: bool) {
        self.open = Some(open);
    }

    pub fn is_resolved(self) -> bool {
        self.open.is_some()
    }

    pub fn is_open(self) -> bool {
        self.open.unwrap_or(false)
    }
}
