use std::borrow::Cow;

/// In-page link target for a heading id.
pub fn fragment_href(id: &str) -> String {
    format!("#{}", urlencoding::encode(id))
}

/// Turns a raw `location.hash` back into a heading id. Malformed escapes are
/// kept verbatim.
pub fn decode_fragment(hash: &str) -> Option<String> {
    let raw = hash.strip_prefix('#').unwrap_or(hash);
    if raw.is_empty() {
        return None;
    }
    let decoded = urlencoding::decode(raw).unwrap_or(Cow::Borrowed(raw));
    Some(decoded.into_owned())
}
