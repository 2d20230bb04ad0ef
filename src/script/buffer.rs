//! Editable script text with append-only step authoring

use super::step_lines::{count_step_markers, map_step_lines};

/// Script buffer. Every change bumps the revision so observers can tell
/// stale line mappings apart.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptBuffer {
    text: String,
    revision: u64,
}

impl ScriptBuffer {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            revision: 0,
        }
    }

    /// Skeleton for a new flow: header, separator and a clean launch
    pub fn new_flow(app_id: &str) -> Self {
        Self::new(format!(
            "appId: {}\n---\n- launchApp:\n    clearState: true\n",
            app_id
        ))
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Replace the whole text (an operator edit)
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.revision += 1;
    }

    /// Number the next appended step would get
    pub fn next_step_number(&self) -> usize {
        count_step_markers(&self.text) + 1
    }

    /// Append an emitted block under a `# n. label` comment.
    /// Returns the step number used in the comment.
    pub fn append_step(&mut self, label: &str, block: &str) -> usize {
        let number = self.next_step_number();
        if !self.text.is_empty() && !self.text.ends_with('\n') {
            self.text.push('\n');
        }
        self.text.push_str(&format!("# {}. {}\n{}\n", number, label, block));
        self.revision += 1;
        number
    }

    pub fn step_lines(&self) -> Vec<usize> {
        map_step_lines(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::emitter::{emit, Params};

    #[test]
    fn test_new_flow_template() {
        let buffer = ScriptBuffer::new_flow("com.example.app");
        assert_eq!(
            buffer.text(),
            "appId: com.example.app\n---\n- launchApp:\n    clearState: true\n"
        );
        assert_eq!(buffer.step_lines(), vec![3]);
        assert_eq!(buffer.next_step_number(), 2);
    }

    #[test]
    fn test_append_step_numbers_and_maps() {
        let mut buffer = ScriptBuffer::new_flow("com.example.app");
        let block = emit("tapOn", &Params::new().with("text", "Login"));
        let n = buffer.append_step("Tap Login", &block);

        assert_eq!(n, 2);
        assert!(buffer.text().ends_with("# 2. Tap Login\n- tapOn: \"Login\"\n"));
        assert_eq!(buffer.step_lines(), vec![3, 6]);
        assert_eq!(buffer.revision(), 1);
    }

    #[test]
    fn test_append_adds_missing_newline() {
        let mut buffer = ScriptBuffer::new("appId: x\n---\n- back");
        buffer.append_step("Tap OK", "- tapOn: \"OK\"");
        assert_eq!(buffer.text(), "appId: x\n---\n- back\n# 2. Tap OK\n- tapOn: \"OK\"\n");
    }

    #[test]
    fn test_append_to_empty_buffer() {
        let mut buffer = ScriptBuffer::default();
        buffer.append_step("Tap at 50%, 50%", "- tapOn:\n    point: 50%,50%");
        assert_eq!(buffer.text(), "# 1. Tap at 50%, 50%\n- tapOn:\n    point: 50%,50%\n");
    }

    #[test]
    fn test_set_text_bumps_revision() {
        let mut buffer = ScriptBuffer::new("a");
        buffer.set_text("b");
        buffer.set_text("c");
        assert_eq!(buffer.revision(), 2);
        assert_eq!(buffer.text(), "c");
    }
}
