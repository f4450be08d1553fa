use crate::outline::Heading;

/// Coalesces scroll events so at most one active-heading recomputation is
/// queued per animation frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameThrottle {
    pending: bool,
}

impl FrameThrottle {
    /// Returns `true` when the caller has to schedule a frame.
    pub fn request(&mut self) -> bool {
        if self.pending {
            return false;
        }
        self.pending = true;
        true
    }

    /// Clears the pending flag; `false` means no frame was queued.
    pub fn complete(&mut self) -> bool {
        std::mem::take(&mut self.pending)
    }

    pub fn is_pending(self) -> bool {
        self.pending
    }
}

/// Picks the heading the reader is looking at.
///
/// A fragment naming a known heading wins. Otherwise the last heading whose
/// top is within `threshold` of the viewport top is active, scanning stops at
/// the first heading below it, and the first heading is the fallback.
pub fn find_active_heading<N>(
    outline: &[Heading<N>],
    fragment: Option<&str>,
    top_of: impl Fn(&N) -> f64,
    threshold: f64,
) -> Option<String> {
    let first = outline.first()?;

    if let Some(fragment) = fragment {
        if outline.iter().any(|heading| heading.id == fragment) {
            return Some(fragment.to_string());
        }
    }

    let mut current = first;
    for heading in outline {
        if top_of(&heading.node) - threshold <= 0.0 {
            current = heading;
        } else {
            break;
        }
    }
    Some(current.id.clone())
}
