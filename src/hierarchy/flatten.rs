//! Flattening a hierarchy snapshot into the addressable element list

use super::node::{Bounds, ScreenPoint, UiNode};

/// A bounded node surfaced to the operator.
///
/// Elements are snapshots: a new hierarchy fetch produces an entirely new set and no
/// identity is carried across fetches.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub node: UiNode,
    pub bounds: Bounds,
    tapped_point: bool,
}

impl Element {
    /// Returns `None` for nodes that carry no bounds
    pub fn from_node(node: &UiNode) -> Option<Self> {
        node.bounds.map(|bounds| Self {
            node: node.clone(),
            bounds,
            tapped_point: false,
        })
    }

    /// Pseudo-element for a tap that landed on no UI node
    pub fn tapped_point(point: ScreenPoint) -> Self {
        let x = point.x.round() as i32;
        let y = point.y.round() as i32;
        Self {
            node: UiNode::default(),
            bounds: Bounds::new(x, y, x, y),
            tapped_point: true,
        }
    }

    pub fn is_tapped_point(&self) -> bool {
        self.tapped_point
    }

    pub fn text(&self) -> Option<&str> {
        self.node.text()
    }

    pub fn class_name(&self) -> Option<&str> {
        self.node.class_name()
    }
}

/// Depth-first pre-order flattening; a node is emitted iff it has bounds.
///
/// Unbounded containers are still descended into. No visibility or size filtering.
pub fn flatten(root: &UiNode) -> Vec<Element> {
    let mut elements = Vec::new();
    let mut stack = vec![root];

    while let Some(node) = stack.pop() {
        if let Some(element) = Element::from_node(node) {
            elements.push(element);
        }
        // Reverse so the first child is visited next
        stack.extend(node.children.iter().rev());
    }

    elements
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(text: &str, bounds: Option<Bounds>, children: Vec<UiNode>) -> UiNode {
        UiNode {
            text: Some(text.to_string()),
            bounds,
            children,
            ..Default::default()
        }
    }

    fn b(l: i32, t: i32, r: i32, bo: i32) -> Option<Bounds> {
        Some(Bounds::new(l, t, r, bo))
    }

    #[test]
    fn test_flatten_preorder_skips_unbounded() {
        let tree = node(
            "root",
            None,
            vec![
                node(
                    "a",
                    b(0, 0, 100, 100),
                    vec![node("a1", b(0, 0, 50, 50), vec![]), node("a2", None, vec![node("a2x", b(1, 1, 2, 2), vec![])])],
                ),
                node("b", b(0, 100, 100, 200), vec![]),
            ],
        );

        let texts: Vec<_> = flatten(&tree)
            .iter()
            .map(|e| e.text().unwrap().to_string())
            .collect();
        assert_eq!(texts, vec!["a", "a1", "a2x", "b"]);
    }

    #[test]
    fn test_flatten_keeps_zero_area_nodes() {
        let tree = node("root", b(0, 0, 0, 0), vec![node("dot", b(5, 5, 5, 5), vec![])]);
        assert_eq!(flatten(&tree).len(), 2);
    }

    #[test]
    fn test_flatten_count_matches_bounded_nodes() {
        let mut tree = node("leaf", b(0, 0, 1, 1), vec![]);
        let mut bounded = 1;
        for depth in 0..500 {
            let bounds = if depth % 3 == 0 { None } else { b(0, 0, 10, 10) };
            if bounds.is_some() {
                bounded += 1;
            }
            tree = node("wrap", bounds, vec![tree]);
        }
        assert_eq!(flatten(&tree).len(), bounded);
    }

    #[test]
    fn test_element_keeps_subtree() {
        let tree = node("parent", b(0, 0, 10, 10), vec![node("child", None, vec![])]);
        let elements = flatten(&tree);
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].node.children.len(), 1);
    }

    #[test]
    fn test_tapped_point_element() {
        let el = Element::tapped_point(ScreenPoint::new(10.4, 20.6));
        assert!(el.is_tapped_point());
        assert_eq!(el.bounds, Bounds::new(10, 21, 10, 21));
        assert!(el.text().is_none());
    }
}
