use regex::Regex;
use std::sync::OnceLock;

use crate::host::PageHost;

const FALLBACK_SLUG: &str = "section";

/// A heading that made it into the table of contents.
#[derive(Clone, Debug, PartialEq)]
pub struct Heading<N> {
    pub node: N,
    pub id: String,
    pub text: String,
    pub level: u8,
}

pub fn slugify(text: &str) -> String {
    static RE_STRIP: OnceLock<Regex> = OnceLock::new();
    static RE_SPACE: OnceLock<Regex> = OnceLock::new();
    static RE_DASHES: OnceLock<Regex> = OnceLock::new();

    let re_strip =
        RE_STRIP.get_or_init(|| Regex::new(r"[^A-Za-z0-9_\x{4e00}-\x{9fa5}\s-]").unwrap());
    let re_space = RE_SPACE.get_or_init(|| Regex::new(r"\s+").unwrap());
    let re_dashes = RE_DASHES.get_or_init(|| Regex::new(r"-+").unwrap());

    let lowered = text.to_lowercase();
    let stripped = re_strip.replace_all(lowered.trim(), "");
    let dashed = re_space.replace_all(&stripped, "-");
    let collapsed = re_dashes.replace_all(&dashed, "-");

    let mut slug = collapsed.as_ref();
    slug = slug.strip_prefix('-').unwrap_or(slug);
    slug = slug.strip_suffix('-').unwrap_or(slug);
    slug.to_string()
}

/// Returns the heading's id, minting and writing back a unique slug when the
/// element has none.
fn ensure_id<H: PageHost>(host: &mut H, node: &H::Node, existing: Option<String>, text: &str) -> String {
    if let Some(id) = existing.filter(|id| !id.is_empty()) {
        return id;
    }

    let base = match slugify(text) {
        slug if slug.is_empty() => FALLBACK_SLUG.to_string(),
        slug => slug,
    };
    let mut candidate = base.clone();
    let mut index = 2;
    while host.id_in_use(&candidate) {
        candidate = format!("{base}-{index}");
        index += 1;
    }

    host.assign_id(node, &candidate);
    candidate
}

/// Collects the page's headings in document order, dropping the ones without
/// visible text. `None` when the page has no content root.
pub fn extract_outline<H: PageHost>(host: &mut H, max_level: u8) -> Option<Vec<Heading<H::Node>>> {
    let candidates = host.heading_candidates(max_level)?;

    let mut outline = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let text = candidate.text.trim();
        if text.is_empty() {
            continue;
        }
        let id = ensure_id(host, &candidate.node, candidate.id, text);
        outline.push(Heading {
            node: candidate.node,
            id,
            text: text.to_string(),
            level: candidate.level,
        });
    }
    Some(outline)
}
