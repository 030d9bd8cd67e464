//! Highlight commands
//!
//! The session does not touch the rendering surface itself; it emits these
//! commands on a channel and the host applies them (wrap a word, toggle
//! focus classes, scroll the element into view).

use pagevox_dom::NodeId;

/// Class applied to the currently spoken word
pub const HIGHLIGHT_CLASS: &str = "sr-highlight";
/// Class applied to a focused element
pub const FOCUS_CLASS: &str = "sr-focus";
/// Transient outline class applied alongside focus
pub const OUTLINE_CLASS: &str = "sr-outline";

/// One highlight effect for the host to apply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlightCommand {
    /// Wrap `start..end` (byte range within the node's text) in the
    /// word-highlight style, replacing any previous word wrap
    Word {
        node: NodeId,
        start: usize,
        end: usize,
    },
    /// Apply focus and outline classes and scroll the element into view
    Focus { node: NodeId },
    /// Remove focus classes from the element
    Unfocus { node: NodeId },
    /// Remove any word wrap
    ClearWord,
}
