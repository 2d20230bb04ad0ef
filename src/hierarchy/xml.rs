//! uiautomator XML dumps
//!
//! Converts the `<hierarchy><node .../></hierarchy>` document produced by
//! `uiautomator dump` into a nested `UiNode` tree, so raw dumps can be inspected
//! the same way as backend JSON snapshots.

use super::node::{Bounds, UiNode};
use crate::error::{InspectorError, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;
use std::sync::LazyLock;

static DECIMAL_ENTITY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"&#(\d+);").unwrap());
static HEX_ENTITY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"&#x([0-9A-Fa-f]+);").unwrap());

/// Decode common HTML entities in a string
/// Handles: &amp; &lt; &gt; &quot; &apos; &#NNN; (decimal) &#xHHH; (hex)
fn decode_html_entities(s: &str) -> String {
    let mut result = s
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ");

    result = DECIMAL_ENTITY
        .replace_all(&result, |caps: &regex::Captures| {
            caps[1]
                .parse::<u32>()
                .ok()
                .and_then(char::from_u32)
                .map(|c| c.to_string())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .to_string();

    result = HEX_ENTITY
        .replace_all(&result, |caps: &regex::Captures| {
            u32::from_str_radix(&caps[1], 16)
                .ok()
                .and_then(char::from_u32)
                .map(|c| c.to_string())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .to_string();

    // Last, so "&amp;lt;" stays "&lt;"
    result.replace("&amp;", "&")
}

/// Parse a uiautomator dump into a tree rooted at an unbounded `hierarchy` node
pub fn parse_dump(xml: &str) -> Result<UiNode> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut root = UiNode {
        class: Some("hierarchy".to_string()),
        ..Default::default()
    };
    // Open <node> elements, innermost last
    let mut open: Vec<UiNode> = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"node" => {
                open.push(node_from_attributes(e));
            }
            Ok(Event::Empty(ref e)) if e.name().as_ref() == b"node" => {
                let node = node_from_attributes(e);
                match open.last_mut() {
                    Some(parent) => parent.children.push(node),
                    None => root.children.push(node),
                }
            }
            Ok(Event::End(ref e)) if e.name().as_ref() == b"node" => {
                let node = open
                    .pop()
                    .ok_or_else(|| InspectorError::InvalidDump("unbalanced </node>".to_string()))?;
                match open.last_mut() {
                    Some(parent) => parent.children.push(node),
                    None => root.children.push(node),
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(InspectorError::InvalidDump(format!(
                    "XML parse error at {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
        buf.clear();
    }

    if !open.is_empty() {
        return Err(InspectorError::InvalidDump(format!(
            "{} unclosed <node> element(s)",
            open.len()
        )));
    }

    Ok(root)
}

fn node_from_attributes(e: &BytesStart) -> UiNode {
    let mut node = UiNode::default();

    for attr in e.attributes().filter_map(|a| a.ok()) {
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let value = decode_html_entities(&String::from_utf8_lossy(&attr.value));

        match key.as_str() {
            "class" => node.class = Some(value),
            "text" => node.text = Some(value),
            "resource-id" => node.resource_id = Some(value),
            "content-desc" => node.content_desc = Some(value),
            "hint" => node.hint = Some(value),
            "bounds" => node.bounds = Bounds::from_dump_string(&value),
            _ => {
                node.attributes.insert(key, serde_json::Value::String(value));
            }
        }
    }

    node
}
