//! Locator resolution
//!
//! Derives every locator an element can be addressed by and ranks them.
//! The ranking is a policy, not a score:
//!
//! - editable inputs: ID > Accessibility > Text (an input's text is its transient value)
//! - everything else: Text > ID > Accessibility
//! - the coordinate point always comes last, as the universal fallback
//!
//! Callers take index 0 as "best" unless the operator picks another.

use super::candidate::{LocatorCandidate, Reliability};
use crate::hierarchy::{DeviceFrame, Element, UiNode};

/// Ranks locators for elements of one hierarchy snapshot
pub struct LocatorResolver<'a> {
    frame: &'a DeviceFrame,
    all_elements: &'a [Element],
    include_class: bool,
}

impl<'a> LocatorResolver<'a> {
    pub fn new(frame: &'a DeviceFrame, all_elements: &'a [Element]) -> Self {
        Self {
            frame,
            all_elements,
            include_class: false,
        }
    }

    /// Also offer the class name (low reliability, just before the point fallback)
    pub fn with_class_locator(mut self, enabled: bool) -> Self {
        self.include_class = enabled;
        self
    }

    pub fn resolve(&self, element: &Element) -> Vec<LocatorCandidate> {
        if element.is_tapped_point() {
            return vec![self.point_candidate(element)];
        }

        let node = &element.node;
        let is_input = node.is_editable_input();

        let text_locs: Vec<LocatorCandidate> = match node.text() {
            Some(text) => {
                let reliability = if is_input {
                    Reliability::Low
                } else {
                    Reliability::High
                };
                vec![LocatorCandidate::text("Visible Text", text, reliability)]
            }
            None => child_text(element, self.all_elements)
                .map(|text| LocatorCandidate::text("Child Text", &text, Reliability::Medium))
                .into_iter()
                .collect(),
        };
        let id_locs: Vec<LocatorCandidate> = node.resource_id().map(LocatorCandidate::id).into_iter().collect();
        let acc_locs: Vec<LocatorCandidate> = node
            .accessibility_label()
            .map(LocatorCandidate::accessibility)
            .into_iter()
            .collect();

        let mut locators = if is_input {
            [id_locs, acc_locs, text_locs].concat()
        } else {
            [text_locs, id_locs, acc_locs].concat()
        };

        if self.include_class {
            if let Some(class_name) = node.class_name() {
                locators.push(LocatorCandidate::class(class_name));
            }
        }

        locators.push(self.point_candidate(element));
        locators
    }

    fn point_candidate(&self, element: &Element) -> LocatorCandidate {
        let (cx, cy) = element.bounds.center();
        let (x_pct, y_pct) = self.frame.to_percent(cx, cy);
        LocatorCandidate::point(x_pct, y_pct)
    }
}

/// Rank the locators of `element` against the snapshot it came from
pub fn resolve_locators(
    element: &Element,
    all_elements: &[Element],
    frame: &DeviceFrame,
) -> Vec<LocatorCandidate> {
    LocatorResolver::new(frame, all_elements).resolve(element)
}

/// Text of the most specific descendant, for elements that have none of their own.
///
/// With an explicit children collection this is a depth-first search of the subtree.
/// Without one, the flat list is searched for elements whose bounds lie inside the
/// target's, smallest area first.
pub fn child_text(element: &Element, all_elements: &[Element]) -> Option<String> {
    if !element.node.children.is_empty() {
        return first_descendant_text(&element.node).map(str::to_string);
    }

    let mut contained: Vec<&Element> = all_elements
        .iter()
        .filter(|el| !is_same_element(el, element) && element.bounds.contains(&el.bounds))
        .collect();
    // Stable: equal areas keep traversal order
    contained.sort_by_key(|el| el.bounds.area());

    contained
        .into_iter()
        .find_map(|el| el.text())
        .map(str::to_string)
}

fn first_descendant_text(node: &UiNode) -> Option<&str> {
    node.children
        .iter()
        .find_map(|child| child.text().or_else(|| first_descendant_text(child)))
}

fn is_same_element(a: &Element, b: &Element) -> bool {
    std::ptr::eq(a, b) || (a.bounds == b.bounds && a.node == b.node)
}
