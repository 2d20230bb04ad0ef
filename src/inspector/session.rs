//! Inspector session: tap → element → locators → script

use super::backend::DeviceBackend;
use super::refresh::HierarchySnapshot;
use crate::error::Result;
use crate::hierarchy::{flatten, hit_test_or_point, DeviceFrame, Element, ScreenPoint, UiNode};
use crate::locator::{LocatorCandidate, LocatorKind, LocatorResolver, Selector};
use crate::script::{emit, step_object, Params, ScriptBuffer};
use crate::utils::Config;
use serde_json::json;

/// Longest text shown verbatim in a quick-action label
const LABEL_MAX_CHARS: usize = 20;
const LABEL_TRUNCATED_CHARS: usize = 18;

const SWIPE_DIRECTIONS: [&str; 4] = ["UP", "DOWN", "RIGHT", "LEFT"];
const SCROLL_DIRECTIONS: [&str; 4] = ["DOWN", "UP", "RIGHT", "LEFT"];

/// The element under a tap and the ways it can be addressed
#[derive(Debug, Clone)]
pub struct Selection {
    pub point: ScreenPoint,
    pub element: Element,
    /// Best first; never empty
    pub locators: Vec<LocatorCandidate>,
}

impl Selection {
    pub fn best(&self) -> &LocatorCandidate {
        &self.locators[0]
    }

    /// Locator at `index`, falling back to the best one
    pub fn locator(&self, index: usize) -> &LocatorCandidate {
        self.locators.get(index).unwrap_or_else(|| self.best())
    }
}

/// A ready-to-insert action for a selection
#[derive(Debug, Clone, PartialEq)]
pub struct QuickAction {
    pub group: &'static str,
    pub label: String,
    pub action: &'static str,
    pub yaml: String,
    /// Step object for the single-step executor
    pub step: serde_json::Value,
}

/// Result of an auto-insert tap
#[derive(Debug, Clone, PartialEq)]
pub struct InsertedStep {
    pub number: usize,
    pub label: String,
    pub yaml: String,
    pub step: serde_json::Value,
}

pub struct InspectorSession {
    frame: DeviceFrame,
    elements: Vec<Element>,
    script: ScriptBuffer,
    include_class_locator: bool,
    default_action: String,
}

impl InspectorSession {
    pub fn new(frame: DeviceFrame, script: ScriptBuffer) -> Self {
        let defaults = Config::default();
        Self {
            frame,
            elements: Vec::new(),
            script,
            include_class_locator: defaults.include_class_locator,
            default_action: defaults.default_action,
        }
    }

    pub fn with_config(mut self, config: &Config) -> Self {
        self.include_class_locator = config.include_class_locator;
        self.default_action = config.default_action.clone();
        self
    }

    pub fn frame(&self) -> &DeviceFrame {
        &self.frame
    }

    pub fn set_frame(&mut self, frame: DeviceFrame) {
        self.frame = frame;
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn script(&self) -> &ScriptBuffer {
        &self.script
    }

    pub fn script_mut(&mut self) -> &mut ScriptBuffer {
        &mut self.script
    }

    /// Replace the element set with a freshly fetched tree
    pub fn apply_hierarchy(&mut self, root: &UiNode) -> usize {
        self.elements = flatten(root);
        self.elements.len()
    }

    pub fn apply_snapshot(&mut self, snapshot: &HierarchySnapshot) -> usize {
        self.elements = snapshot.elements.clone();
        self.elements.len()
    }

    /// Select at a percentage of the rendered screen image
    pub fn select_at(&self, x_pct: f64, y_pct: f64) -> Selection {
        let point = self.frame.to_pixels(x_pct, y_pct);
        let element = hit_test_or_point(point, &self.elements);
        let locators = LocatorResolver::new(&self.frame, &self.elements)
            .with_class_locator(self.include_class_locator)
            .resolve(&element);

        Selection {
            point,
            element,
            locators,
        }
    }

    /// The action menu for `selection`, using the locator at `locator_index`
    pub fn quick_actions(&self, selection: &Selection, locator_index: usize) -> Vec<QuickAction> {
        let locator = selection.locator(locator_index);
        let selector = &locator.selector;
        let display = match locator.kind {
            LocatorKind::Text => Some(display_label(&locator.value)),
            _ => None,
        };

        let mut actions = vec![
            targeted(
                "Tap & Click",
                display.as_ref().map_or("Tap Element".to_string(), |d| format!("Tap \"{}\"", d)),
                "tapOn",
                selector,
            ),
            targeted(
                "Assertions",
                display
                    .as_ref()
                    .map_or("Assert Visible".to_string(), |d| format!("Assert \"{}\"", d)),
                "assertVisible",
                selector,
            ),
            targeted(
                "Assertions",
                "Assert Not Visible".to_string(),
                "assertNotVisible",
                selector,
            ),
        ];

        for direction in SWIPE_DIRECTIONS {
            actions.push(directional("Swipe & Gestures", "Swipe", "swipe", direction));
        }
        for direction in SCROLL_DIRECTIONS {
            actions.push(directional("Scroll", "Scroll", "scroll", direction));
        }

        let input = "your text here";
        actions.push(QuickAction {
            group: "Input & Text",
            label: "Input Text".to_string(),
            action: "inputText",
            yaml: emit("inputText", &Params::new().with("text", input)),
            step: json!({ "inputText": input }),
        });
        actions.push(QuickAction {
            group: "Input & Text",
            label: "Press Enter".to_string(),
            action: "pressKey",
            yaml: "- pressKey: Enter".to_string(),
            step: json!({ "pressKey": "Enter" }),
        });

        actions
    }

    /// Interact mode: append the default action on the best locator under the tap
    pub fn auto_insert(&mut self, x_pct: f64, y_pct: f64) -> InsertedStep {
        let selection = self.select_at(x_pct, y_pct);
        let locator = selection.best();

        let label = if selection.element.is_tapped_point() {
            format!("Tap at {}", locator.value)
        } else {
            format!("Tap {}", locator.value)
        };
        let params = locator.selector.to_params();
        let yaml = emit(&self.default_action, &params);
        let step = step_object(&self.default_action, &params);
        let number = self.script.append_step(&label, &yaml);

        log::info!("Inserted step {}: {}", number, label);
        InsertedStep {
            number,
            label,
            yaml,
            step,
        }
    }

    /// Auto-insert, then execute the inserted step on the device.
    /// Returns the step and the executor's log line.
    pub async fn tap_and_run(
        &mut self,
        backend: &dyn DeviceBackend,
        x_pct: f64,
        y_pct: f64,
    ) -> Result<(InsertedStep, String)> {
        let inserted = self.auto_insert(x_pct, y_pct);
        let log_line = backend.run_step(&inserted.step).await?;
        Ok((inserted, log_line))
    }
}

fn targeted(group: &'static str, label: String, action: &'static str, selector: &Selector) -> QuickAction {
    let params = selector.to_params();
    QuickAction {
        group,
        label,
        action,
        yaml: emit(action, &params),
        step: step_object(action, &params),
    }
}

fn directional(group: &'static str, verb: &str, action: &'static str, direction: &str) -> QuickAction {
    let params = Params::new().with("direction", direction);
    QuickAction {
        group,
        label: format!("{} {}{}", verb, &direction[..1], direction[1..].to_lowercase()),
        action,
        yaml: emit(action, &params),
        step: step_object(action, &params),
    }
}

fn display_label(text: &str) -> String {
    if text.chars().count() > LABEL_MAX_CHARS {
        let head: String = text.chars().take(LABEL_TRUNCATED_CHARS).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hierarchy::Bounds;
    use crate::inspector::backend::testing::FakeBackend;

    fn frame() -> DeviceFrame {
        DeviceFrame::new(1000, 2000, "Fake")
    }

    fn screen() -> UiNode {
        let login = UiNode {
            text: Some("Login".into()),
            class: Some("android.widget.Button".into()),
            resource_id: Some("com.app:id/login".into()),
            bounds: Some(Bounds::new(100, 1000, 900, 1100)),
            ..Default::default()
        };
        let icon = UiNode {
            class: Some("android.widget.ImageView".into()),
            bounds: Some(Bounds::new(0, 0, 100, 120)),
            ..Default::default()
        };
        UiNode {
            class: Some("android.widget.FrameLayout".into()),
            bounds: Some(Bounds::new(0, 0, 1000, 2000)),
            children: vec![login, icon],
            ..Default::default()
        }
    }

    fn session() -> InspectorSession {
        let mut session = InspectorSession::new(frame(), ScriptBuffer::new_flow("com.app"));
        session.apply_hierarchy(&screen());
        session
    }

    #[test]
    fn test_select_at_picks_element_and_ranks_locators() {
        let selection = session().select_at(50.0, 52.5);
        assert_eq!(selection.element.text(), Some("Login"));
        assert_eq!(selection.best().kind, LocatorKind::Text);
        assert_eq!(selection.locators.last().map(|l| l.kind), Some(LocatorKind::Point));
    }

    #[test]
    fn test_select_outside_every_element_gives_point() {
        let mut session = session();
        session.apply_hierarchy(&UiNode::default());
        let selection = session.select_at(25.0, 75.0);
        assert!(selection.element.is_tapped_point());
        assert_eq!(selection.locators.len(), 1);
        assert_eq!(selection.best().value, "25%, 75%");
    }

    #[test]
    fn test_quick_actions_use_chosen_locator() {
        let session = session();
        let selection = session.select_at(50.0, 52.5);

        let actions = session.quick_actions(&selection, 0);
        assert_eq!(actions.len(), 13);
        assert_eq!(actions[0].label, "Tap \"Login\"");
        assert_eq!(actions[0].yaml, "- tapOn: \"Login\"");
        assert_eq!(actions[0].step, json!({"tapOn": {"text": "Login"}}));

        let by_id = session.quick_actions(&selection, 1);
        assert_eq!(by_id[0].label, "Tap Element");
        assert_eq!(by_id[1].yaml, "- assertVisible:\n    id: \"com.app:id/login\"");

        let swipe_up = actions.iter().find(|a| a.label == "Swipe Up").unwrap();
        assert_eq!(swipe_up.yaml, "- swipe:\n    direction: UP");
        assert_eq!(swipe_up.step, json!({"swipe": {"direction": "UP"}}));

        let enter = actions.last().unwrap();
        assert_eq!(enter.step, json!({"pressKey": "Enter"}));
    }

    #[test]
    fn test_display_label_truncates() {
        assert_eq!(display_label("Short"), "Short");
        assert_eq!(
            display_label("A very long button caption"),
            "A very long button..."
        );
    }

    #[test]
    fn test_auto_insert_appends_numbered_step() {
        let mut session = session();
        let inserted = session.auto_insert(50.0, 52.5);

        assert_eq!(inserted.number, 2);
        assert_eq!(inserted.label, "Tap Login");
        assert_eq!(inserted.step, json!({"tapOn": {"text": "Login"}}));
        assert!(session
            .script()
            .text()
            .ends_with("# 2. Tap Login\n- tapOn: \"Login\"\n"));
        assert_eq!(session.script().step_lines(), vec![3, 6]);
    }

    #[test]
    fn test_auto_insert_on_empty_space_uses_point() {
        let mut session = session();
        session.apply_hierarchy(&UiNode::default());
        let inserted = session.auto_insert(10.0, 90.0);

        assert_eq!(inserted.label, "Tap at 10%, 90%");
        assert_eq!(inserted.yaml, "- tapOn:\n    point: 10%,90%");
        assert_eq!(inserted.step, json!({"tapOn": {"point": "10%,90%"}}));
    }

    #[test]
    fn test_auto_insert_respects_default_action() {
        let config = Config {
            default_action: "doubleTapOn".into(),
            ..Config::default()
        };
        let mut session = session().with_config(&config);
        let inserted = session.auto_insert(50.0, 52.5);
        assert_eq!(inserted.yaml, "- doubleTapOn: \"Login\"");
    }

    #[tokio::test]
    async fn test_tap_and_run_executes_step() {
        let backend = FakeBackend::new(frame(), screen());
        let mut session = session();

        let (inserted, log_line) = session.tap_and_run(&backend, 5.0, 2.5).await.unwrap();
        assert_eq!(inserted.step, json!({"tapOn": {"point": "5%,3%"}}));
        assert_eq!(backend.executed_steps(), vec![inserted.step.clone()]);
        assert!(log_line.starts_with("executed"));
    }

    #[tokio::test]
    async fn test_tap_and_run_step_failure_keeps_inserted_text() {
        let mut backend = FakeBackend::new(frame(), screen());
        backend.step_error = Some("element not found".into());
        let mut session = session();

        let result = session.tap_and_run(&backend, 50.0, 52.5).await;
        assert!(result.is_err());
        assert!(session.script().text().contains("# 2. Tap Login"));
    }
}
