//! Maps raw event targets to the element that actually scrolls.
//!
//! Input events and scroll events must go through the same normalization,
//! otherwise a hint recorded for one identity is looked up under another.

use crate::host::{Dom, EventTarget, NodeId, NodeKind};

/// Slack for fractional layout sizes that round up by a pixel.
const OVERFLOW_TOLERANCE_PX: f64 = 1.0;

/// The single element standing for whole-document scrolling.
pub fn root_scroller<D: Dom + ?Sized>(dom: &D) -> NodeId {
    dom.scrolling_element()
        .unwrap_or_else(|| dom.document_element())
}

fn is_root_like<D: Dom + ?Sized>(dom: &D, node: NodeId) -> bool {
    node == dom.document_element() || dom.body() == Some(node) || dom.scrolling_element() == Some(node)
}

/// Window, document, the document element and body all collapse to the root
/// scroller. Text nodes resolve through their parent element.
pub fn normalize<D: Dom + ?Sized>(dom: &D, raw: Option<EventTarget>) -> NodeId {
    let node = match raw {
        None | Some(EventTarget::Window) => return root_scroller(dom),
        Some(EventTarget::Node(node)) => node,
    };

    match dom.node_kind(node) {
        Some(NodeKind::Text) => normalize(dom, dom.parent_element(node).map(EventTarget::Node)),
        Some(NodeKind::Element) if is_root_like(dom, node) => root_scroller(dom),
        Some(NodeKind::Element) => node,
        _ => root_scroller(dom),
    }
}

/// True if the element is the document root, or if some axis both allows
/// scrolling and has content overflowing its box.
pub fn can_scroll<D: Dom + ?Sized>(dom: &D, node: NodeId) -> bool {
    if dom.node_kind(node) != Some(NodeKind::Element) {
        return false;
    }
    if is_root_like(dom, node) {
        return true;
    }

    let style = dom.computed_overflow(node);
    let geometry = dom.scroll_geometry(node);

    let can_scroll_y = style.y.allows_scrolling()
        && geometry.scroll_height > geometry.client_height + OVERFLOW_TOLERANCE_PX;
    let can_scroll_x = style.x.allows_scrolling()
        && geometry.scroll_width > geometry.client_width + OVERFLOW_TOLERANCE_PX;

    can_scroll_y || can_scroll_x
}

/// Innermost scrollable element an input event would move.
///
/// Prefers the composed path, which crosses shadow boundaries. Without one,
/// walks light-tree parents from the target.
pub fn find_scrollable_ancestor<D: Dom + ?Sized>(
    dom: &D,
    target: Option<EventTarget>,
    composed_path: Option<&[EventTarget]>,
) -> NodeId {
    if let Some(path) = composed_path {
        for entry in path {
            if let EventTarget::Node(node) = *entry {
                if can_scroll(dom, node) {
                    return normalize(dom, Some(*entry));
                }
            }
        }
    }

    let mut element = match target {
        Some(EventTarget::Node(node)) => match dom.node_kind(node) {
            Some(NodeKind::Element) => Some(node),
            _ => dom.parent_element(node),
        },
        _ => None,
    };

    while let Some(node) = element {
        if can_scroll(dom, node) {
            return normalize(dom, Some(EventTarget::Node(node)));
        }
        element = dom.parent_element(node);
    }

    root_scroller(dom)
}
