use log::LevelFilter;
use serde::{Deserialize, Serialize};

use crate::error::{TocError, TocResult};

/// Settings accepted by `initialize`. Every field is optional on the wire and
/// falls back to the documentation theme's defaults.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct TocConfig {
    pub storage_key: String,
    pub body_selector: String,
    pub content_selector: String,
    pub max_heading_level: u8,
    pub mobile_breakpoint: f64,
    pub active_offset: f64,
    pub title: String,
    pub show_label: String,
    pub hide_label: String,
    pub toggle_aria_label: String,
    pub log_level: String,
}

impl Default for TocConfig {
    fn default() -> Self {
        Self {
            storage_key: "honkit_right_toc_open".to_string(),
            body_selector: ".book-body".to_string(),
            content_selector: ".page-inner .markdown-section".to_string(),
            max_heading_level: 3,
            mobile_breakpoint: 1180.0,
            active_offset: 120.0,
            title: "On This Page".to_string(),
            show_label: "Show TOC".to_string(),
            hide_label: "Hide TOC".to_string(),
            toggle_aria_label: "Toggle right table of contents".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

impl TocConfig {
    pub fn from_json(text: &str) -> TocResult<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validated()
    }

    pub fn validated(self) -> TocResult<Self> {
        if !(1..=6).contains(&self.max_heading_level) {
            return Err(TocError::InvalidConfig(format!(
                "maxHeadingLevel must be between 1 and 6, got {}",
                self.max_heading_level
            )));
        }
        if !self.mobile_breakpoint.is_finite() || self.mobile_breakpoint <= 0.0 {
            return Err(TocError::InvalidConfig(format!(
                "mobileBreakpoint must be a positive number, got {}",
                self.mobile_breakpoint
            )));
        }
        if !self.active_offset.is_finite() || self.active_offset < 0.0 {
            return Err(TocError::InvalidConfig(format!(
                "activeOffset must be zero or positive, got {}",
                self.active_offset
            )));
        }
        if self.storage_key.trim().is_empty() {
            return Err(TocError::InvalidConfig("storageKey must not be empty".into()));
        }
        for (name, selector) in [
            ("bodySelector", &self.body_selector),
            ("contentSelector", &self.content_selector),
        ] {
            if selector.trim().is_empty() {
                return Err(TocError::InvalidConfig(format!("{name} must not be empty")));
            }
        }
        self.log_level
            .parse::<LevelFilter>()
            .map_err(|_| TocError::InvalidConfig(format!("unknown logLevel `{}`", self.log_level)))?;
        Ok(self)
    }

    pub fn heading_selector(&self) -> String {
        heading_selector(self.max_heading_level)
    }

    pub fn log_level_filter(&self) -> LevelFilter {
        self.log_level.parse().unwrap_or(LevelFilter::Warn)
    }
}

/// `h1, h2, h3` for a depth of 3.
pub fn heading_selector(max_level: u8) -> String {
    (1..=max_level)
        .map(|level| format!("h{level}"))
        .collect::<Vec<_>>()
        .join(", ")
}
