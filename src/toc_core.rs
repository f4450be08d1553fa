use std::collections::HashMap;

use log::debug;

use crate::anchor;
use crate::config::TocConfig;
use crate::host::{PageHost, PreferenceStore};
use crate::outline::{self, Heading};
use crate::scroll::{self, FrameThrottle};
use crate::visibility::{self, ViewportClass, Visibility};

/// Pages with fewer qualifying headings get no panel at all.
pub const MIN_HEADINGS: usize = 2;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TocEntry {
    pub id: String,
    pub text: String,
    pub level: u8,
    pub href: String,
}

/// Everything the display layer needs to build a fresh panel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PanelModel {
    pub title: String,
    pub toggle_aria_label: String,
    pub entries: Vec<TocEntry>,
}

/// Controller state as seen by the display layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TocView {
    pub enabled: bool,
    pub open: bool,
    pub mobile: bool,
    pub active: Option<String>,
    pub toggle_label: String,
}

impl TocView {
    pub fn toggle_expanded(&self) -> bool {
        self.open
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.active.as_deref() == Some(id)
    }
}

/// Heading id to rendered link position, rebuilt together with the outline.
#[derive(Clone, Debug, Default)]
pub struct LinkRegistry {
    ids: Vec<String>,
    positions: HashMap<String, usize>,
}

impl LinkRegistry {
    fn register(&mut self, id: &str) {
        self.positions.insert(id.to_string(), self.ids.len());
        self.ids.push(id.to_string());
    }

    fn clear(&mut self) {
        self.ids.clear();
        self.positions.clear();
    }

    pub fn contains(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.positions.get(id).copied()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

pub struct TocController<H: PageHost, S: PreferenceStore> {
    config: TocConfig,
    host: H,
    store: S,
    outline: Vec<Heading<H::Node>>,
    links: LinkRegistry,
    visibility: Visibility,
    viewport: ViewportClass,
    throttle: FrameThrottle,
    active: Option<String>,
    enabled: bool,
    revision: u64,
}

impl<H: PageHost, S: PreferenceStore> TocController<H, S> {
    pub fn new(config: TocConfig, host: H, store: S) -> Self {
        let viewport = ViewportClass::from_width(host.viewport_width(), config.mobile_breakpoint);
        Self {
            config,
            host,
            store,
            outline: Vec::new(),
            links: LinkRegistry::default(),
            visibility: Visibility::default(),
            viewport,
            throttle: FrameThrottle::default(),
            active: None,
            enabled: false,
            revision: 0,
        }
    }

    pub fn config(&self) -> &TocConfig {
        &self.config
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn links(&self) -> &LinkRegistry {
        &self.links
    }

    pub fn outline(&self) -> &[Heading<H::Node>] {
        &self.outline
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Number of active-heading recomputations so far.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Drops the current outline and links. Safe to call repeatedly.
    pub fn teardown(&mut self) {
        self.outline.clear();
        self.links.clear();
        self.active = None;
        self.enabled = false;
    }

    /// Tears down and re-derives the table of contents from the page.
    /// `None` leaves the page without a panel.
    pub fn rebuild(&mut self) -> Option<PanelModel> {
        self.teardown();

        let Some(outline) = outline::extract_outline(&mut self.host, self.config.max_heading_level)
        else {
            debug!("TOC disabled: content root not found");
            return None;
        };
        if outline.len() < MIN_HEADINGS {
            debug!("TOC disabled: {} usable heading(s)", outline.len());
            return None;
        }

        let viewport = ViewportClass::from_width(self.host.viewport_width(), self.config.mobile_breakpoint);
        let store = &self.store;
        let key = self.config.storage_key.as_str();
        let open = self
            .visibility
            .resolve(|| visibility::read_preference(store, key), viewport);

        let entries = outline
            .iter()
            .map(|heading| TocEntry {
                id: heading.id.clone(),
                text: heading.text.clone(),
                level: heading.level,
                href: anchor::fragment_href(&heading.id),
            })
            .collect::<Vec<_>>();
        for entry in &entries {
            self.links.register(&entry.id);
        }
        self.outline = outline;
        self.enabled = true;

        self.sync_viewport_mode();
        self.apply_open_state(open, false);
        self.refresh_active();
        debug!("TOC rebuilt with {} entries", entries.len());

        Some(PanelModel {
            title: self.config.title.clone(),
            toggle_aria_label: self.config.toggle_aria_label.clone(),
            entries,
        })
    }

    /// Recomputes the active heading from the location hash and heading
    /// positions, replacing the previous marker.
    pub fn refresh_active(&mut self) {
        self.revision += 1;
        let fragment = anchor::decode_fragment(&self.host.location_hash())
            .filter(|fragment| self.links.contains(fragment));
        let host = &self.host;
        self.active = scroll::find_active_heading(
            &self.outline,
            fragment.as_deref(),
            |node| host.heading_top(node),
            self.config.active_offset,
        );
    }

    /// Scroll event. `true` means the caller must schedule
    /// [`run_scheduled_update`](Self::run_scheduled_update) for the next frame.
    pub fn request_scroll_update(&mut self) -> bool {
        self.throttle.request()
    }

    /// Animation frame callback. Returns whether a recomputation ran.
    pub fn run_scheduled_update(&mut self) -> bool {
        if !self.throttle.complete() {
            return false;
        }
        self.refresh_active();
        true
    }

    pub fn on_hash_change(&mut self) {
        self.refresh_active();
    }

    /// Resize handler: only the viewport class follows the new width.
    pub fn sync_viewport_mode(&mut self) -> bool {
        if !self.enabled {
            return false;
        }
        self.viewport = ViewportClass::from_width(self.host.viewport_width(), self.config.mobile_breakpoint);
        true
    }

    pub fn apply_open_state(&mut self, open: bool, persist: bool) {
        self.visibility.set(open);
        if persist {
            visibility::write_preference(&mut self.store, &self.config.storage_key, open);
        }
    }

    pub fn toggle(&mut self) {
        let open = self.current_open_state();
        self.apply_open_state(!open, true);
    }

    /// Backdrop click.
    pub fn close(&mut self) {
        self.apply_open_state(false, true);
    }

    /// Another tab wrote the preference. Values other than `"1"`/`"0"` are
    /// ignored; the new value is not written back.
    pub fn on_stored_preference_changed(&mut self, value: Option<&str>) -> bool {
        match value.and_then(visibility::parse_preference) {
            Some(open) => {
                self.apply_open_state(open, false);
                true
            }
            None => false,
        }
    }

    pub fn is_open(&self) -> bool {
        self.visibility.is_open()
    }

    pub fn view(&self) -> TocView {
        let open = self.enabled && self.visibility.is_open();
        let toggle_label = if open {
            self.config.hide_label.clone()
        } else {
            self.config.show_label.clone()
        };
        TocView {
            enabled: self.enabled,
            open,
            mobile: self.enabled && self.viewport == ViewportClass::Mobile,
            active: self.active.clone(),
            toggle_label,
        }
    }

    fn current_open_state(&mut self) -> bool {
        let viewport = ViewportClass::from_width(self.host.viewport_width(), self.config.mobile_breakpoint);
        let store = &self.store;
        let key = self.config.storage_key.as_str();
        self.visibility
            .resolve(|| visibility::read_preference(store, key), viewport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakePage, MemoryStore};

    const GUIDE: &str = "# Guide\n\n## Install\n\n## Usage\n\n### Options\n\nbody text\n";

    fn controller(markdown: &str, store: MemoryStore) -> TocController<FakePage, MemoryStore> {
        TocController::new(TocConfig::default(), FakePage::from_markdown(markdown), store)
    }

    fn key() -> String {
        TocConfig::default().storage_key
    }

    #[test]
    fn registry_has_one_link_per_heading_in_order() {
        let mut toc = controller(GUIDE, MemoryStore::default());
        let panel = toc.rebuild().unwrap();

        let ids: Vec<_> = toc.links().ids().collect();
        assert_eq!(ids, ["guide", "install", "usage", "options"]);
        assert_eq!(panel.entries.len(), 4);
        assert_eq!(panel.entries[3].level, 3);
        assert_eq!(panel.entries[1].href, "#install");
        assert_eq!(panel.title, "On This Page");
        assert_eq!(toc.links().position("usage"), Some(2));
        assert!(toc.view().enabled);
    }

    #[test]
    fn single_heading_gets_no_panel() {
        let mut toc = controller("# Lonely\n\ntext\n", MemoryStore::default());
        assert!(toc.rebuild().is_none());
        assert!(!toc.view().enabled);
        assert!(toc.links().is_empty());
    }

    #[test]
    fn rebuild_removes_previous_panel() {
        let mut toc = controller(GUIDE, MemoryStore::default());
        assert!(toc.rebuild().is_some());

        *toc.host_mut() = FakePage::from_markdown("# Only one\n");
        assert!(toc.rebuild().is_none());
        assert!(toc.links().is_empty());
        assert!(toc.outline().is_empty());
        assert_eq!(toc.view().active, None);
        assert!(!toc.view().open);
    }

    #[test]
    fn missing_content_root_tears_down() {
        let mut toc = controller(GUIDE, MemoryStore::default());
        toc.rebuild().unwrap();
        toc.host_mut().remove_content_root();
        assert!(toc.rebuild().is_none());
        assert!(!toc.is_enabled());
    }

    #[test]
    fn registry_follows_page_changes() {
        let mut toc = controller(GUIDE, MemoryStore::default());
        toc.rebuild().unwrap();

        *toc.host_mut() = FakePage::from_markdown("# API\n\n## Types\n");
        toc.rebuild().unwrap();
        let ids: Vec<_> = toc.links().ids().collect();
        assert_eq!(ids, ["api", "types"]);
        assert!(!toc.links().contains("install"));
    }

    #[test]
    fn active_heading_is_computed_on_rebuild() {
        let mut toc = controller(GUIDE, MemoryStore::default());
        toc.host_mut().scroll_to(850.0);
        toc.rebuild().unwrap();
        assert_eq!(toc.active(), Some("usage"));
        assert!(toc.view().is_active("usage"));
        assert!(!toc.view().is_active("guide"));
    }

    #[test]
    fn threshold_example_selects_second_heading() {
        let mut toc = controller("# A\n\n## B\n\n## C\n", MemoryStore::default());
        toc.host_mut().set_tops(&[-50.0, 40.0, 300.0]);
        toc.rebuild().unwrap();
        assert_eq!(toc.active(), Some("b"));
    }

    #[test]
    fn fragment_wins_regardless_of_scroll() {
        let mut toc = controller(GUIDE, MemoryStore::default());
        toc.rebuild().unwrap();
        toc.host_mut().scroll_to(5000.0);
        toc.host_mut().set_hash("#install");
        toc.on_hash_change();
        assert_eq!(toc.active(), Some("install"));
    }

    #[test]
    fn encoded_fragment_matches_heading() {
        let mut toc = controller("# Getting Started\n\n## 安装 指南\n", MemoryStore::default());
        let panel = toc.rebuild().unwrap();
        assert_eq!(toc.active(), Some("getting-started"));
        toc.host_mut().set_hash(&panel.entries[1].href);
        toc.on_hash_change();
        assert_eq!(toc.active(), Some("安装-指南"));
    }

    #[test]
    fn scroll_burst_recomputes_once_per_frame() {
        let mut toc = controller(GUIDE, MemoryStore::default());
        toc.rebuild().unwrap();
        let before = toc.revision();

        let scheduled = (0..25).filter(|_| toc.request_scroll_update()).count();
        assert_eq!(scheduled, 1);
        toc.host_mut().scroll_to(400.0);
        assert!(toc.run_scheduled_update());
        assert!(!toc.run_scheduled_update());
        assert_eq!(toc.revision(), before + 1);
        assert_eq!(toc.active(), Some("install"));

        assert!(toc.request_scroll_update());
    }

    #[test]
    fn desktop_defaults_open_and_mobile_defaults_closed() {
        let mut desktop = controller(GUIDE, MemoryStore::default());
        desktop.rebuild().unwrap();
        assert!(desktop.view().open);
        assert_eq!(desktop.view().toggle_label, "Hide TOC");
        assert!(!desktop.view().mobile);

        let mut page = FakePage::from_markdown(GUIDE);
        page.set_width(800.0);
        let mut mobile = TocController::new(TocConfig::default(), page, MemoryStore::default());
        mobile.rebuild().unwrap();
        assert!(!mobile.view().open);
        assert!(!mobile.view().toggle_expanded());
        assert_eq!(mobile.view().toggle_label, "Show TOC");
        assert!(mobile.view().mobile);
    }

    #[test]
    fn toggle_persists_into_next_session() {
        let store = MemoryStore::default();
        let mut first = controller(GUIDE, store.clone());
        first.rebuild().unwrap();
        assert!(first.view().open);
        first.toggle();
        assert!(!first.view().open);
        assert_eq!(store.get(&key()).as_deref(), Some("0"));

        let mut second = controller(GUIDE, store.clone());
        second.rebuild().unwrap();
        assert!(!second.view().open);
    }

    #[test]
    fn rebuild_does_not_persist_defaults() {
        let store = MemoryStore::default();
        let mut toc = controller(GUIDE, store.clone());
        toc.rebuild().unwrap();
        toc.rebuild().unwrap();
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn resize_changes_only_viewport_marker() {
        let mut toc = controller(GUIDE, MemoryStore::default());
        toc.rebuild().unwrap();
        assert!(toc.view().open);

        toc.host_mut().set_width(600.0);
        assert!(toc.sync_viewport_mode());
        let view = toc.view();
        assert!(view.mobile);
        assert!(view.open);

        toc.rebuild().unwrap();
        assert!(toc.view().open);
    }

    #[test]
    fn resize_before_panel_exists_is_ignored() {
        let mut toc = controller("# One\n", MemoryStore::default());
        toc.rebuild();
        toc.host_mut().set_width(600.0);
        assert!(!toc.sync_viewport_mode());
        assert!(!toc.view().mobile);
    }

    #[test]
    fn backdrop_close_is_persisted() {
        let store = MemoryStore::default();
        let mut toc = controller(GUIDE, store.clone());
        toc.rebuild().unwrap();
        toc.close();
        assert!(!toc.view().open);
        assert_eq!(store.get(&key()).as_deref(), Some("0"));
    }

    #[test]
    fn storage_failures_never_break_the_panel() {
        let mut toc = controller(GUIDE, MemoryStore::failing());
        assert!(toc.rebuild().is_some());
        assert!(toc.view().open);
        toc.toggle();
        assert!(!toc.view().open);
        toc.toggle();
        assert!(toc.view().open);
    }

    #[test]
    fn ignores_unrecognised_stored_values() {
        let store = MemoryStore::default();
        store.set(&key(), "yes");
        let mut toc = controller(GUIDE, store);
        toc.rebuild().unwrap();
        assert!(toc.view().open);
    }

    #[test]
    fn out_of_band_preference_updates_without_writing() {
        let store = MemoryStore::default();
        let mut toc = controller(GUIDE, store.clone());
        toc.rebuild().unwrap();

        assert!(toc.on_stored_preference_changed(Some("0")));
        assert!(!toc.view().open);
        assert!(!toc.on_stored_preference_changed(None));
        assert!(!toc.view().open);
        assert_eq!(store.write_count(), 0);
    }
}
