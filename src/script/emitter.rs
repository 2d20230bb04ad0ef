//! Flow-script statement emitter
//!
//! The flow grammar is indentation-significant, so every nesting level uses the same
//! fixed indent unit. The emitter knows nothing about the surrounding script; callers
//! append its output as a new block.

/// One nesting level
pub const INDENT: &str = "    ";
/// Prefix of every step statement
pub const STEP_PREFIX: &str = "- ";

const TEXT_KEY: &str = "text";
const ID_KEY: &str = "id";

/// A parameter value; maps nest one indent level deeper
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Map(Params),
}

impl ParamValue {
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            ParamValue::Str(s) => serde_json::Value::String(s.clone()),
            ParamValue::Int(i) => serde_json::Value::from(*i),
            ParamValue::Float(f) => serde_json::Value::from(*f),
            ParamValue::Bool(b) => serde_json::Value::Bool(*b),
            ParamValue::Map(p) => p.to_json(),
        }
    }

    fn render_scalar(&self) -> String {
        match self {
            ParamValue::Str(s) => quote_if_needed(s),
            ParamValue::Int(i) => i.to_string(),
            ParamValue::Float(f) => f.to_string(),
            ParamValue::Bool(b) => b.to_string(),
            ParamValue::Map(_) => String::new(),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Str(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::Str(s)
    }
}

impl From<i64> for ParamValue {
    fn from(i: i64) -> Self {
        ParamValue::Int(i)
    }
}

impl From<f64> for ParamValue {
    fn from(f: f64) -> Self {
        ParamValue::Float(f)
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        ParamValue::Bool(b)
    }
}

impl From<Params> for ParamValue {
    fn from(p: Params) -> Self {
        ParamValue::Map(p)
    }
}

/// Ordered parameter map; insertion order is emission order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    entries: Vec<(String, ParamValue)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: &str, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace; a replaced key keeps its position
    pub fn insert(&mut self, key: &str, value: impl Into<ParamValue>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key.to_string(), value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn to_json(&self) -> serde_json::Value {
        let map = self
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(map)
    }

    /// The single entry, if there is exactly one
    fn sole_entry(&self) -> Option<(&str, &ParamValue)> {
        match self.entries.as_slice() {
            [(k, v)] => Some((k.as_str(), v)),
            _ => None,
        }
    }
}

/// Serialize one `{action, parameters}` pair as a flow-script statement.
///
/// - `{text: v}` alone: `- action: "v"`
/// - `{id: v}` alone: `- action:` with `id: "v"` nested one level
/// - anything else: the action header, then one indented line per parameter
///
/// The result has no trailing newline.
pub fn emit(action: &str, params: &Params) -> String {
    match params.sole_entry() {
        Some((TEXT_KEY, ParamValue::Str(v))) => {
            format!("{}{}: \"{}\"", STEP_PREFIX, action, escape_double_quoted(v))
        }
        Some((ID_KEY, ParamValue::Str(v))) => format!(
            "{}{}:\n{}{}: \"{}\"",
            STEP_PREFIX,
            action,
            INDENT,
            ID_KEY,
            escape_double_quoted(v)
        ),
        _ => {
            let mut lines = vec![format!("{}{}:", STEP_PREFIX, action)];
            for (key, value) in params.iter() {
                push_entry(&mut lines, key, value, 1);
            }
            lines.join("\n")
        }
    }
}

/// The `{action: parameters}` object handed to a single-step executor
pub fn step_object(action: &str, params: &Params) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    map.insert(action.to_string(), params.to_json());
    serde_json::Value::Object(map)
}

fn push_entry(lines: &mut Vec<String>, key: &str, value: &ParamValue, level: usize) {
    let indent = INDENT.repeat(level);
    match value {
        ParamValue::Map(nested) => {
            lines.push(format!("{}{}:", indent, key));
            for (k, v) in nested.iter() {
                push_entry(lines, k, v, level + 1);
            }
        }
        scalar => lines.push(format!("{}{}: {}", indent, key, scalar.render_scalar())),
    }
}

/// Escape for a double-quoted scalar. Line breaks never reach the output raw, so one
/// statement stays one block of lines.
fn escape_double_quoted(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{:04X}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

/// Plain scalars are left bare unless they would change meaning when read back
fn quote_if_needed(s: &str) -> String {
    const LEADING_INDICATORS: &[char] = &[
        '-', '?', '[', ']', '{', '}', ',', '&', '*', '!', '|', '>', '\'', '%', '@', '`', '#',
    ];
    let needs_quotes = s.is_empty()
        || s.contains(':')
        || s.contains('"')
        || s.contains(" #")
        || s.starts_with(LEADING_INDICATORS)
        || s.trim() != s
        || s.chars().any(char::is_control);

    if needs_quotes {
        format!("\"{}\"", escape_double_quoted(s))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::step_lines::map_step_lines;

    #[test]
    fn test_text_shorthand() {
        let params = Params::new().with("text", "Login");
        assert_eq!(emit("tapOn", &params), "- tapOn: \"Login\"");
    }

    #[test]
    fn test_text_shorthand_escapes_quotes() {
        let params = Params::new().with("text", "Say \"hi\": now");
        assert_eq!(emit("assertVisible", &params), r#"- assertVisible: "Say \"hi\": now""#);
    }

    #[test]
    fn test_id_form() {
        let params = Params::new().with("id", "btn_1");
        assert_eq!(emit("tapOn", &params), "- tapOn:\n    id: \"btn_1\"");
    }

    #[test]
    fn test_general_form_with_scalars() {
        let params = Params::new()
            .with("accessibilityId", "Close dialog")
            .with("index", 2i64)
            .with("optional", true)
            .with("label", "Time: 10:30");
        assert_eq!(
            emit("tapOn", &params),
            "- tapOn:\n    accessibilityId: Close dialog\n    index: 2\n    optional: true\n    label: \"Time: 10:30\""
        );
    }

    #[test]
    fn test_nested_params_indent_consistently() {
        let params = Params::new()
            .with("start", Params::new().with("point", "10%,50%"))
            .with("direction", "UP");
        assert_eq!(
            emit("swipe", &params),
            "- swipe:\n    start:\n        point: 10%,50%\n    direction: UP"
        );
    }

    #[test]
    fn test_ambiguous_params_fall_through_to_general_form() {
        let params = Params::new().with("text", "Login").with("id", "btn");
        assert_eq!(emit("tapOn", &params), "- tapOn:\n    text: Login\n    id: btn");
    }

    #[test]
    fn test_non_string_text_uses_general_form() {
        let params = Params::new().with("text", 42i64);
        assert_eq!(emit("inputText", &params), "- inputText:\n    text: 42");
    }

    #[test]
    fn test_empty_params() {
        assert_eq!(emit("back", &Params::new()), "- back:");
    }

    #[test]
    fn test_quote_if_needed() {
        assert_eq!(quote_if_needed("plain words"), "plain words");
        assert_eq!(quote_if_needed("#hashtag"), "\"#hashtag\"");
        assert_eq!(quote_if_needed(""), "\"\"");
        assert_eq!(quote_if_needed(" padded"), "\" padded\"");
    }

    #[test]
    fn test_escape_double_quoted() {
        assert_eq!(escape_double_quoted(r"C:\new"), r"C:\\new");
        assert_eq!(escape_double_quoted("a\nb\tc\r"), r"a\nb\tc\r");
        assert_eq!(escape_double_quoted("say \"hi\""), r#"say \"hi\""#);
        assert_eq!(escape_double_quoted("bell\u{7}"), r"bell\u0007");
    }

    #[test]
    fn test_control_characters_force_quoting() {
        assert_eq!(quote_if_needed("Line1\nLine2"), r#""Line1\nLine2""#);
        assert_eq!(quote_if_needed("tab\there"), r#""tab\there""#);
        // A lone backslash is literal in a plain scalar
        assert_eq!(quote_if_needed(r"a\b"), r"a\b");
    }

    #[test]
    fn test_multiline_text_stays_one_statement() {
        let text = "Terms\n- Privacy";
        let step = emit("tapOn", &Params::new().with("text", text));
        assert_eq!(step.lines().count(), 1);

        let script = format!("appId: x\n---\n- launchApp\n{}\n", step);
        assert_eq!(map_step_lines(&script), vec![3, 4]);

        let value: serde_yaml::Value = serde_yaml::from_str(&step).unwrap();
        assert_eq!(value[0]["tapOn"].as_str(), Some(text));
    }

    #[test]
    fn test_multiline_values_in_general_form_parse_back() {
        let params = Params::new()
            .with("accessibilityId", "Line1\nLine2")
            .with("index", 1i64)
            .with("path", r"C:\new\table");
        let step = emit("tapOn", &params);
        assert_eq!(step.lines().count(), 4);

        let script = format!("---\n{}\n- back\n", step);
        assert_eq!(map_step_lines(&script), vec![2, 6]);

        let value: serde_yaml::Value = serde_yaml::from_str(&step).unwrap();
        let tap = &value[0]["tapOn"];
        assert_eq!(tap["accessibilityId"].as_str(), Some("Line1\nLine2"));
        assert_eq!(tap["index"].as_i64(), Some(1));
        assert_eq!(tap["path"].as_str(), Some(r"C:\new\table"));
    }

    #[test]
    fn test_id_shorthand_escapes_backslashes() {
        let step = emit("tapOn", &Params::new().with("id", r"pkg:id\btn"));
        let value: serde_yaml::Value = serde_yaml::from_str(&step).unwrap();
        assert_eq!(value[0]["tapOn"]["id"].as_str(), Some(r"pkg:id\btn"));
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut params = Params::new().with("a", 1i64).with("b", 2i64);
        params.insert("a", 3i64);
        assert_eq!(params.get("a"), Some(&ParamValue::Int(3)));
        assert_eq!(params.iter().next().map(|(k, _)| k), Some("a"));
    }

    #[test]
    fn test_step_object() {
        let params = Params::new().with("point", "50%,50%");
        assert_eq!(
            step_object("tapOn", &params),
            serde_json::json!({"tapOn": {"point": "50%,50%"}})
        );
    }

    #[test]
    fn test_emitted_yaml_parses_back() {
        let params = Params::new()
            .with("text", "Price: $5 \"deal\"")
            .with("nested", Params::new().with("deep", Params::new().with("flag", false)));
        let yaml = emit("assertVisible", &params);
        let value: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();
        let step = &value[0]["assertVisible"];
        assert_eq!(step["text"].as_str(), Some("Price: $5 \"deal\""));
        assert_eq!(step["nested"]["deep"]["flag"].as_bool(), Some(false));
    }
}
