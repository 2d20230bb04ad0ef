//! Static checks on a flow script before it is sent for execution

use super::step_lines::map_top_level_step_lines;
use serde::{Deserialize, Serialize};

/// Commands the flow runner understands
pub const KNOWN_COMMANDS: &[&str] = &[
    "tapOn",
    "doubleTapOn",
    "longPressOn",
    "inputText",
    "eraseText",
    "inputRandomText",
    "inputRandomNumber",
    "inputRandomEmail",
    "inputRandomPersonName",
    "assertVisible",
    "assertNotVisible",
    "assertTrue",
    "scroll",
    "swipe",
    "pressKey",
    "back",
    "hideKeyboard",
    "volumeUp",
    "volumeDown",
    "openLink",
    "stopApp",
    "clearState",
    "clearKeychain",
    "launchApp",
    "killApp",
    "runFlow",
    "extendedWaitUntil",
    "waitForAnimationToEnd",
    "waitForAnimation",
    "repeat",
    "webhook",
    "takeScreenshot",
    "copyTextFrom",
    "pasteText",
    "evalScript",
    "runScript",
    "startRecording",
    "stopRecording",
    "setLocation",
    "travel",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub valid: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
    pub step_count: usize,
}

impl ValidationReport {
    fn ok(step_count: usize) -> Self {
        Self {
            valid: true,
            message: format!("Valid flow ({} steps)", step_count),
            line: None,
            column: None,
            step_count,
        }
    }

    fn invalid(message: impl Into<String>, line: Option<usize>, column: Option<usize>) -> Self {
        Self {
            valid: false,
            message: message.into(),
            line,
            column,
            step_count: 0,
        }
    }
}

/// Parse the script (header document plus flow document) and check every
/// top-level step against the known command vocabulary.
pub fn validate_script(text: &str) -> ValidationReport {
    if text.trim().is_empty() {
        return ValidationReport::invalid("Script is empty", None, None);
    }

    let mut docs = Vec::new();
    for document in serde_yaml::Deserializer::from_str(text) {
        match serde_yaml::Value::deserialize(document) {
            Ok(value) => docs.push(value),
            Err(e) => {
                let location = e.location();
                let line = location.as_ref().map(|l| l.line());
                let column = location.as_ref().map(|l| l.column());
                let message = match (line, column) {
                    (Some(l), Some(c)) => format!("Syntax error at line {}, column {}: {}", l, c, e),
                    _ => format!("Syntax error: {}", e),
                };
                return ValidationReport::invalid(message, line, column);
            }
        }
    }

    let flow = match docs.as_slice() {
        [] => return ValidationReport::invalid("Script is empty", None, None),
        [only] if only.is_sequence() => only,
        [_] => return ValidationReport::ok(0),
        [_, flow, ..] => flow,
    };

    let Some(steps) = flow.as_sequence() else {
        return ValidationReport::invalid(
            "Flow must be a list of steps (each starting with '- ')",
            None,
            None,
        );
    };

    let step_lines = map_top_level_step_lines(text);
    for (index, step) in steps.iter().enumerate() {
        // Bare strings such as `- back` are commands without parameters
        let keys: Vec<&str> = match step {
            serde_yaml::Value::Mapping(map) => map.keys().filter_map(|k| k.as_str()).collect(),
            serde_yaml::Value::String(s) => vec![s.as_str()],
            _ => continue,
        };

        if let Some(unknown) = keys.iter().find(|k| !KNOWN_COMMANDS.contains(k)) {
            let mut message = format!("Unknown command at step {}: '{}'", index + 1, unknown);
            if let Some(suggestion) = closest_command(unknown) {
                message.push_str(&format!(". Did you mean '{}'?", suggestion));
            }
            return ValidationReport::invalid(message, step_lines.get(index).copied(), None);
        }
    }

    ValidationReport::ok(steps.len())
}

/// Nearest known command by edit distance, if it is close enough to be a typo
fn closest_command(name: &str) -> Option<&'static str> {
    let name = name.to_lowercase();
    KNOWN_COMMANDS
        .iter()
        .map(|cmd| (*cmd, edit_distance(&name, &cmd.to_lowercase())))
        .filter(|(_, d)| *d <= 3)
        .min_by_key(|(_, d)| *d)
        .map(|(cmd, _)| cmd)
}

fn edit_distance(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();

    for (i, ca) in a.chars().enumerate() {
        let mut row = vec![i + 1; b.len() + 1];
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            row[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(row[j] + 1);
        }
        prev = row;
    }

    prev[b.len()]
}
