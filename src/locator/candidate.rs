//! Locator candidates and their selector payloads

use crate::script::emitter::{ParamValue, Params};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

/// Which signal a locator addresses the element by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LocatorKind {
    Text,
    #[serde(rename = "ID")]
    Id,
    Accessibility,
    Point,
    Class,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Reliability {
    High,
    Medium,
    Low,
}

impl std::fmt::Display for Reliability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Reliability::High => "high",
            Reliability::Medium => "medium",
            Reliability::Low => "low",
        };
        f.write_str(s)
    }
}

/// Selector payload handed to the script emitter and the step executor.
/// Each variant maps to exactly one flow-script key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Text(String),
    Id(String),
    AccessibilityId(String),
    /// Center of the element as whole percents of the device frame
    Point { x_pct: i64, y_pct: i64 },
    Class(String),
}

impl Selector {
    /// The flow-script key this selector is written under
    pub fn key(&self) -> &'static str {
        match self {
            Selector::Text(_) => "text",
            Selector::Id(_) => "id",
            Selector::AccessibilityId(_) => "accessibilityId",
            Selector::Point { .. } => "point",
            Selector::Class(_) => "class",
        }
    }

    pub fn value(&self) -> String {
        match self {
            Selector::Text(v) | Selector::Id(v) | Selector::AccessibilityId(v) | Selector::Class(v) => {
                v.clone()
            }
            Selector::Point { x_pct, y_pct } => format!("{}%,{}%", x_pct, y_pct),
        }
    }

    /// Single-entry parameter map for the emitter
    pub fn to_params(&self) -> Params {
        Params::new().with(self.key(), ParamValue::Str(self.value()))
    }

    /// Step object body, e.g. `{"text": "Login"}`
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        map.insert(self.key().to_string(), serde_json::Value::String(self.value()));
        serde_json::Value::Object(map)
    }

    /// Inline selector syntax as shown next to a candidate
    pub fn syntax(&self) -> String {
        match self {
            Selector::Text(v) => format!("\"{}\"", v),
            other => format!("{}: \"{}\"", other.key(), other.value()),
        }
    }
}

impl Serialize for Selector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.key(), &self.value())?;
        map.end()
    }
}

/// One way of addressing an element, as offered to the operator
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocatorCandidate {
    #[serde(rename = "type")]
    pub kind: LocatorKind,
    pub label: &'static str,
    pub value: String,
    pub reliability: Reliability,
    pub selector: Selector,
    pub syntax: String,
}

impl LocatorCandidate {
    pub fn new(
        kind: LocatorKind,
        label: &'static str,
        value: impl Into<String>,
        reliability: Reliability,
        selector: Selector,
    ) -> Self {
        let syntax = selector.syntax();
        Self {
            kind,
            label,
            value: value.into(),
            reliability,
            selector,
            syntax,
        }
    }

    pub fn text(label: &'static str, text: &str, reliability: Reliability) -> Self {
        Self::new(
            LocatorKind::Text,
            label,
            text,
            reliability,
            Selector::Text(text.to_string()),
        )
    }

    pub fn id(id: &str) -> Self {
        Self::new(
            LocatorKind::Id,
            "Resource ID",
            id,
            Reliability::High,
            Selector::Id(id.to_string()),
        )
    }

    pub fn accessibility(label: &str) -> Self {
        Self::new(
            LocatorKind::Accessibility,
            "Accessibility ID",
            label,
            Reliability::High,
            Selector::AccessibilityId(label.to_string()),
        )
    }

    pub fn point(x_pct: i64, y_pct: i64) -> Self {
        Self::new(
            LocatorKind::Point,
            "Coordinates",
            format!("{}%, {}%", x_pct, y_pct),
            Reliability::Low,
            Selector::Point { x_pct, y_pct },
        )
    }

    pub fn class(class_name: &str) -> Self {
        Self::new(
            LocatorKind::Class,
            "Class Name",
            class_name,
            Reliability::Low,
            Selector::Class(class_name.to_string()),
        )
    }
}
