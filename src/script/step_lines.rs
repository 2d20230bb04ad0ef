//! Step ordinal → script line mapping
//!
//! A script is an optional header, a `---` separator line, then the step list.
//! Step N of an execution run is the N-th `- ` line after the separator.

use super::emitter::STEP_PREFIX;
use regex::Regex;
use std::sync::LazyLock;

/// Header/steps separator line
pub const SECTION_SEPARATOR: &str = "---";

static STEP_MARKER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^\s*-\s+").unwrap());

/// 1-based line numbers of step statements, in order.
///
/// Without a separator line the result is empty. Only the first separator counts;
/// later `---` lines are ordinary lines. Nested `- ` lines are counted too, matching
/// how the runner numbers its progress.
pub fn map_step_lines(script: &str) -> Vec<usize> {
    let mut in_steps = false;
    let mut lines = Vec::new();

    for (index, line) in script.lines().enumerate() {
        let trimmed = line.trim();
        if !in_steps {
            in_steps = trimmed == SECTION_SEPARATOR;
            continue;
        }
        if trimmed.starts_with(STEP_PREFIX) {
            lines.push(index + 1);
        }
    }

    lines
}

/// Like `map_step_lines`, but only statements at the indentation of the first step.
/// List items nested inside a step (`repeat.commands`, for instance) are left out.
pub fn map_top_level_step_lines(script: &str) -> Vec<usize> {
    let lines: Vec<&str> = script.lines().collect();
    let indent_at = |line: usize| lines.get(line - 1).map(|l| indent_width(l));

    let steps = map_step_lines(script);
    let Some(top) = steps.first().and_then(|&line| indent_at(line)) else {
        return steps;
    };
    steps
        .into_iter()
        .filter(|&line| indent_at(line) == Some(top))
        .collect()
}

fn indent_width(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// Number of list markers anywhere in the script; used to number appended steps
pub fn count_step_markers(script: &str) -> usize {
    STEP_MARKER.find_iter(script).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::emitter::{emit, Params};

    #[test]
    fn test_maps_steps_after_separator() {
        let script = "appId: x\n---\n- launchApp\n- tapOn: \"A\"\n  # note\n- tapOn:\n    id: \"b\"\n";
        assert_eq!(map_step_lines(script), vec![3, 4, 6]);
    }

    #[test]
    fn test_no_separator_means_no_steps() {
        assert!(map_step_lines("- tapOn: \"A\"\n- back").is_empty());
        assert!(map_step_lines("").is_empty());
    }

    #[test]
    fn test_header_list_items_are_ignored() {
        let script = "tags:\n  - smoke\n---\n- back";
        assert_eq!(map_step_lines(script), vec![4]);
    }

    #[test]
    fn test_separator_may_be_indented_and_only_first_counts() {
        let script = "  ---  \n- a: 1\n---\n- b: 2";
        assert_eq!(map_step_lines(script), vec![2, 4]);
    }

    #[test]
    fn test_bare_dash_is_not_a_step() {
        let script = "---\n-\n- back\n-no-space";
        assert_eq!(map_step_lines(script), vec![3]);
    }

    #[test]
    fn test_crlf_line_endings() {
        let script = "appId: x\r\n---\r\n- back\r\n- launchApp\r\n";
        assert_eq!(map_step_lines(script), vec![3, 4]);
    }

    #[test]
    fn test_appended_emitter_output_is_a_new_step() {
        let mut script = String::from("appId: x\n---\n- launchApp:\n    clearState: true\n");
        let before = map_step_lines(&script).len();

        script.push_str(&emit("tapOn", &Params::new().with("id", "submit")));
        script.push('\n');

        let after = map_step_lines(&script);
        assert_eq!(after.len(), before + 1);
        assert_eq!(after.last(), Some(&5));
    }

    #[test]
    fn test_top_level_steps_skip_nested_lists() {
        let script = "appId: x\n---\n- repeat:\n    times: 2\n    commands:\n      - tapOn: \"A\"\n- tapOn: \"B\"\n";
        assert_eq!(map_step_lines(script), vec![3, 6, 7]);
        assert_eq!(map_top_level_step_lines(script), vec![3, 7]);
    }

    #[test]
    fn test_top_level_steps_follow_first_step_indent() {
        let script = "---\n  - back\n      - nested: 1\n  - launchApp\n";
        assert_eq!(map_top_level_step_lines(script), vec![2, 4]);
        assert!(map_top_level_step_lines("appId: x\n").is_empty());
    }

    #[test]
    fn test_count_step_markers() {
        assert_eq!(count_step_markers("appId: x\n---\n- launchApp\n  - nested\n"), 2);
        assert_eq!(count_step_markers("---\n"), 0);
        assert_eq!(count_step_markers(""), 0);
    }
}
