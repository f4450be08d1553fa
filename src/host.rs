use crate::error::TocResult;

/// A heading element as reported by the page, before filtering.
#[derive(Clone, Debug, PartialEq)]
pub struct HeadingCandidate<N> {
    pub node: N,
    pub level: u8,
    /// Raw text content, untrimmed.
    pub text: String,
    /// Existing `id` attribute; `None` when absent or empty.
    pub id: Option<String>,
}

/// The rendered page the table of contents is attached to.
pub trait PageHost {
    type Node: Clone;

    /// Headings of levels `1..=max_level` inside the content root, in document
    /// order. `None` when the content root or the page body is missing.
    fn heading_candidates(&self, max_level: u8) -> Option<Vec<HeadingCandidate<Self::Node>>>;

    /// Whether any element in the whole document already uses `id`.
    fn id_in_use(&self, id: &str) -> bool;

    fn assign_id(&mut self, node: &Self::Node, id: &str);

    /// Distance from the viewport top to the element's top edge.
    fn heading_top(&self, node: &Self::Node) -> f64;

    /// Current location fragment including the leading `#`, or empty.
    fn location_hash(&self) -> String;

    fn viewport_width(&self) -> f64;
}

/// Key-value storage for the open/closed preference.
pub trait PreferenceStore {
    fn read(&self, key: &str) -> TocResult<Option<String>>;
    fn write(&mut self, key: &str, value: &str) -> TocResult<()>;
}
