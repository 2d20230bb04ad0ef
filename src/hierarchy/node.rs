//! Raw UI hierarchy model
//!
//! A `UiNode` tree is what the device backend hands over on every hierarchy fetch.
//! Every field is optional: structural containers routinely come without bounds or text.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A node in the raw hierarchy snapshot. Parent owns its children.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UiNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(
        default,
        rename = "resource-id",
        alias = "resourceId",
        skip_serializing_if = "Option::is_none"
    )]
    pub resource_id: Option<String>,

    #[serde(
        default,
        rename = "content-desc",
        alias = "contentDescription",
        skip_serializing_if = "Option::is_none"
    )]
    pub content_desc: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,

    #[serde(
        default,
        rename = "class",
        alias = "className",
        skip_serializing_if = "Option::is_none"
    )]
    pub class: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<Bounds>,

    /// Raw attribute map some producers attach next to the normalized fields
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, serde_json::Value>,

    #[serde(default)]
    pub children: Vec<UiNode>,
}

impl UiNode {
    /// Trimmed, non-empty visible text
    pub fn text(&self) -> Option<&str> {
        self.field(self.text.as_deref(), "text")
    }

    pub fn resource_id(&self) -> Option<&str> {
        self.field(self.resource_id.as_deref(), "resource-id")
    }

    pub fn content_desc(&self) -> Option<&str> {
        self.field(self.content_desc.as_deref(), "content-desc")
    }

    pub fn hint(&self) -> Option<&str> {
        self.field(self.hint.as_deref(), "hint")
    }

    pub fn class_name(&self) -> Option<&str> {
        self.field(self.class.as_deref(), "class")
    }

    /// Content description, or the input hint when there is none
    pub fn accessibility_label(&self) -> Option<&str> {
        self.content_desc().or_else(|| self.hint())
    }

    /// Editable text fields: their text is a transient value, not an identity
    pub fn is_editable_input(&self) -> bool {
        self.class_name()
            .map(|c| c.contains("EditText"))
            .unwrap_or(false)
    }

    /// Whether the node carries anything a human (or a locator) can address it by
    pub fn has_semantic_content(&self) -> bool {
        self.text().is_some() || self.resource_id().is_some() || self.accessibility_label().is_some()
    }

    fn field<'a>(&'a self, direct: Option<&'a str>, attr: &str) -> Option<&'a str> {
        direct
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .or_else(|| {
                self.attributes
                    .get(attr)
                    .and_then(|v| v.as_str())
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
            })
    }
}

/// Rectangle in device pixel space
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawBounds")]
pub struct Bounds {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Bounds {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> i64 {
        self.right as i64 - self.left as i64
    }

    pub fn height(&self) -> i64 {
        self.bottom as i64 - self.top as i64
    }

    pub fn area(&self) -> i64 {
        self.width() * self.height()
    }

    /// Center point, in fractional pixels
    pub fn center(&self) -> (f64, f64) {
        (
            (self.left as f64 + self.right as f64) / 2.0,
            (self.top as f64 + self.bottom as f64) / 2.0,
        )
    }

    /// Edge-inclusive point containment
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.left as f64 && x <= self.right as f64 && y >= self.top as f64 && y <= self.bottom as f64
    }

    /// Check if this bounds contains another bounds entirely (edges may touch)
    pub fn contains(&self, other: &Bounds) -> bool {
        self.left <= other.left
            && self.top <= other.top
            && self.right >= other.right
            && self.bottom >= other.bottom
    }

    /// Parse bounds from string like "[0,0][1080,1920]"
    pub fn from_dump_string(s: &str) -> Option<Self> {
        let parts: Vec<&str> = s.trim().split("][").collect();
        if parts.len() != 2 {
            return None;
        }

        let left_top = parts[0].trim_start_matches('[');
        let right_bottom = parts[1].trim_end_matches(']');

        let lt: Vec<i32> = left_top
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        let rb: Vec<i32> = right_bottom
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();

        match (lt.as_slice(), rb.as_slice()) {
            ([left, top], [right, bottom]) => Some(Bounds::new(*left, *top, *right, *bottom)),
            _ => None,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawBounds {
    Rect {
        left: i32,
        top: i32,
        right: i32,
        bottom: i32,
    },
    Dump(String),
}

impl TryFrom<RawBounds> for Bounds {
    type Error = String;

    fn try_from(raw: RawBounds) -> Result<Self, Self::Error> {
        match raw {
            RawBounds::Rect {
                left,
                top,
                right,
                bottom,
            } => Ok(Bounds::new(left, top, right, bottom)),
            RawBounds::Dump(s) => {
                Bounds::from_dump_string(&s).ok_or_else(|| format!("invalid bounds string: {}", s))
            }
        }
    }
}

/// Coordinate system every bound and percentage is expressed against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceFrame {
    pub width: u32,
    pub height: u32,
    #[serde(default = "unknown_model")]
    pub model: String,
}

fn unknown_model() -> String {
    "Unknown Device".to_string()
}

impl DeviceFrame {
    pub fn new(width: u32, height: u32, model: impl Into<String>) -> Self {
        Self {
            width,
            height,
            model: model.into(),
        }
    }

    /// Parse the `wm size` style "1080x2400" string
    pub fn from_size_string(size: &str, model: Option<&str>) -> Option<Self> {
        let (w, h) = size.trim().split_once('x')?;
        let width = w.trim().parse().ok()?;
        let height = h.trim().parse().ok()?;
        let model = model
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .unwrap_or_else(unknown_model);
        Some(Self {
            width,
            height,
            model,
        })
    }

    /// Percentage of the rendered screen image to device pixels
    pub fn to_pixels(&self, x_pct: f64, y_pct: f64) -> ScreenPoint {
        ScreenPoint {
            x: x_pct / 100.0 * self.width as f64,
            y: y_pct / 100.0 * self.height as f64,
        }
    }

    /// Device pixels to nearest integer percent of the frame
    pub fn to_percent(&self, x: f64, y: f64) -> (i64, i64) {
        (
            percent(x, self.width),
            percent(y, self.height),
        )
    }
}

fn percent(value: f64, extent: u32) -> i64 {
    if extent == 0 {
        return 0;
    }
    (value / extent as f64 * 100.0).round() as i64
}

/// A point in device pixel space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}
