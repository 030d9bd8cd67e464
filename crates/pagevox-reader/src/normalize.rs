//! Content normalization
//!
//! Presentation-side preparation of a freshly loaded document: inject the
//! reader stylesheet (heading scale, table styling, highlight classes) and
//! wrap tables in a scroll container. Both operations are idempotent so a
//! document can be re-prepared without stacking wrappers.

use pagevox_dom::{Document, NodeId};
use tracing::debug;

const THEME_STYLE_ID: &str = "sr-theme";
const TABLE_SCROLL_CLASS: &str = "sr-table-scroll";

const CONTENT_THEME_CSS: &str = r#"
html{font-size:16px}
body{font-family:ui-sans-serif,system-ui,-apple-system,"Segoe UI",Roboto,"Noto Sans",
     "Helvetica Neue",Arial;color:#111827;line-height:1.55}
h1,h2,h3,h4,h5,h6{font-weight:800;line-height:1.25;margin:1.25rem 0 .5rem}
h1{font-size:1.85rem} h2{font-size:1.6rem;border-top:3px solid #e5e7eb;padding-top:1rem}
h3{font-size:1.35rem} h4{font-size:1.15rem} h5{font-size:1rem} h6{font-size:.9rem}
.sr-table-scroll{overflow:auto;-webkit-overflow-scrolling:touch}
table{width:100%;border-collapse:collapse;margin:1rem 0;background:#fff;font-size:.95rem}
thead th{padding:.75rem 1rem;border-bottom:3px solid #111827;font-weight:700;vertical-align:bottom}
tbody th, tbody td{padding:.65rem 1rem;vertical-align:top;border-top:1px solid #e5e7eb}
tbody tr:nth-child(even){background:#fafafa}
.sr-highlight{background:#bfdbfe;border-radius:.2rem}
.sr-focus{background:#fde68a}
.sr-outline{outline:2px dashed #3b82f6;outline-offset:2px}
"#;

/// Prepare a loaded document for reading
pub fn prepare_document(doc: &mut Document) {
    inject_content_theme(doc);
    wrap_tables_for_scroll(doc);
}

/// Add the reader stylesheet to the document head (created when missing)
pub fn inject_content_theme(doc: &mut Document) {
    let already = doc.iter().any(|id| {
        doc.tag_name(id) == Some("style") && doc.attribute(id, "id") == Some(THEME_STYLE_ID)
    });
    if already {
        return;
    }
    let Some(root) = doc.root() else {
        return;
    };

    let head = match doc.first_element_by_tag("head") {
        Some(head) => head,
        None => {
            let head = doc.create_element("head");
            doc.insert_child(root, 0, head);
            head
        }
    };

    let style = doc.create_element("style");
    doc.set_attribute(style, "id", THEME_STYLE_ID);
    let css = doc.create_text(CONTENT_THEME_CSS);
    doc.append_child(style, css);
    doc.append_child(head, style);
    debug!("content theme injected");
}

/// Wrap each table not already inside a scroll container
pub fn wrap_tables_for_scroll(doc: &mut Document) {
    let tables: Vec<NodeId> = doc.elements_by_tag("table");
    for table in tables {
        if in_scroll_container(doc, table) {
            continue;
        }
        if let Some(wrapper) = doc.wrap_node(table, "div") {
            doc.set_attribute(wrapper, "class", TABLE_SCROLL_CLASS);
        }
    }
}

fn in_scroll_container(doc: &Document, id: NodeId) -> bool {
    doc.ancestors(id).any(|ancestor| {
        doc.attribute(ancestor, "class")
            .map(|classes| classes.split_whitespace().any(|c| c == TABLE_SCROLL_CLASS))
            .unwrap_or(false)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn theme_is_injected_once() {
        let mut doc = Document::parse("<html><head></head><body><p>x</p></body></html>");
        prepare_document(&mut doc);
        prepare_document(&mut doc);

        let styles = doc.elements_by_tag("style");
        assert_eq!(styles.len(), 1);
        assert!(doc.text_content(styles[0]).contains(".sr-highlight"));
    }

    #[test]
    fn head_is_created_when_missing() {
        let mut doc = Document::parse("<p>bare fragment</p>");
        prepare_document(&mut doc);
        let head = doc.first_element_by_tag("head").unwrap();
        assert_eq!(doc.children(head).len(), 1);
    }

    #[test]
    fn tables_are_wrapped_once() {
        let mut doc =
            Document::parse("<body><table><tr><td>1</td></tr></table><table></table></body>");
        prepare_document(&mut doc);
        prepare_document(&mut doc);

        for table in doc.elements_by_tag("table") {
            let parent = doc.parent(table).unwrap();
            assert_eq!(doc.tag_name(parent), Some("div"));
            assert_eq!(doc.attribute(parent, "class"), Some("sr-table-scroll"));
            // not double wrapped
            let grand = doc.parent(parent).unwrap();
            assert_ne!(doc.attribute(grand, "class"), Some("sr-table-scroll"));
        }
    }
}
