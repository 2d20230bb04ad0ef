use super::tracker::{LogEntry, RunStatus};
use regex::Regex;
use std::sync::LazyLock;
use tokio::sync::broadcast;

/// Description the runner sends with its "about to start step N" notice
pub const PLACEHOLDER_DESCRIPTION: &str = "step";

static STEP_PROGRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[(\d+)/(\d+)\]\s+(.*)\s+\((running|completed|failed)\)$").unwrap()
});
static EXIT_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[DONE\]\s*EXIT_CODE:\s*(-?\d+)").unwrap());

const ERROR_MARKER: &str = "[ERROR]";
const DONE_MARKER: &str = "[DONE]";

/// Step status as reported by the runner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    Running,
    Completed,
    Failed,
}

impl StepState {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "running" => Some(StepState::Running),
            "completed" => Some(StepState::Completed),
            "failed" => Some(StepState::Failed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StepState::Running => "running",
            StepState::Completed => "completed",
            StepState::Failed => "failed",
        }
    }

    /// Line status this step state paints
    pub fn run_status(&self) -> RunStatus {
        match self {
            StepState::Running => RunStatus::Running,
            StepState::Completed => RunStatus::Pass,
            StepState::Failed => RunStatus::Fail,
        }
    }
}

/// One decoded record of an execution stream
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionEvent {
    /// `[i/n] description (state)`; `ordinal` is 1-based
    StepProgress {
        ordinal: usize,
        total: usize,
        description: String,
        state: StepState,
    },
    /// `[DONE] EXIT_CODE:<code>`
    Done { exit_code: i32 },
    /// `[ERROR] message`
    Error { message: String },
    /// Anything else, verbatim
    Log { message: String },
}

impl ExecutionEvent {
    /// Decode one record payload (the `data: ` prefix already removed).
    ///
    /// Never fails: anything unrecognised becomes a `Log` event.
    pub fn decode(payload: &str) -> Self {
        let text = payload.trim();

        if text.starts_with(DONE_MARKER) {
            if let Some(code) = EXIT_CODE
                .captures(text)
                .and_then(|caps| caps[1].parse::<i32>().ok())
            {
                return ExecutionEvent::Done { exit_code: code };
            }
        }

        if let Some(message) = text.strip_prefix(ERROR_MARKER) {
            return ExecutionEvent::Error {
                message: message.trim().to_string(),
            };
        }

        if let Some(caps) = STEP_PROGRESS.captures(text) {
            let ordinal = caps[1].parse::<usize>().ok();
            let total = caps[2].parse::<usize>().ok();
            let state = StepState::parse(&caps[4]);
            if let (Some(ordinal), Some(total), Some(state)) = (ordinal, total, state) {
                return ExecutionEvent::StepProgress {
                    ordinal,
                    total,
                    description: caps[3].to_string(),
                    state,
                };
            }
        }

        ExecutionEvent::Log {
            message: text.to_string(),
        }
    }

    /// The runner's generic "step N starting" notice, which carries no information
    pub fn is_placeholder(&self) -> bool {
        matches!(
            self,
            ExecutionEvent::StepProgress { description, state: StepState::Running, .. }
                if description == PLACEHOLDER_DESCRIPTION
        )
    }
}

impl std::fmt::Display for ExecutionEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionEvent::StepProgress {
                ordinal,
                total,
                description,
                state,
            } => write!(f, "[{}/{}] {} ({})", ordinal, total, description, state.as_str()),
            ExecutionEvent::Done { exit_code } => write!(f, "[DONE] EXIT_CODE: {}", exit_code),
            ExecutionEvent::Error { message } => write!(f, "[ERROR] {}", message),
            ExecutionEvent::Log { message } => f.write_str(message),
        }
    }
}

/// Run-state changes published to the presentation layer
#[derive(Debug, Clone, PartialEq)]
pub enum TrackerEvent {
    RunStarted { name: String },
    Log(LogEntry),
    LineStatus { line: usize, status: RunStatus },
    LineStatusesCleared,
    RunEnded { exit_code: Option<i32>, cancelled: bool },
}

/// Updates a slow subscriber may fall behind by before it sees `Lagged`
const EVENT_CAPACITY: usize = 256;

/// Event emitter for broadcasting tracker updates
pub struct EventEmitter {
    sender: broadcast::Sender<TrackerEvent>,
}

impl EventEmitter {
    pub fn emit(&self, event: TrackerEvent) {
        // No subscribers is fine
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TrackerEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_step_progress() {
        let event = ExecutionEvent::decode("[2/3] Tap Login (failed)");
        assert_eq!(
            event,
            ExecutionEvent::StepProgress {
                ordinal: 2,
                total: 3,
                description: "Tap Login".into(),
                state: StepState::Failed,
            }
        );
        assert_eq!(event.to_string(), "[2/3] Tap Login (failed)");
    }

    #[test]
    fn test_description_may_contain_parentheses() {
        let event = ExecutionEvent::decode("[1/4] Launch (cleared state) (completed)");
        match event {
            ExecutionEvent::StepProgress {
                description, state, ..
            } => {
                assert_eq!(description, "Launch (cleared state)");
                assert_eq!(state, StepState::Completed);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_placeholder() {
        assert!(ExecutionEvent::decode("[1/3] step (running)").is_placeholder());
        assert!(!ExecutionEvent::decode("[1/3] step (completed)").is_placeholder());
        assert!(!ExecutionEvent::decode("[1/3] Tap (running)").is_placeholder());
    }

    #[test]
    fn test_decode_done() {
        assert_eq!(
            ExecutionEvent::decode("[DONE] EXIT_CODE: 0"),
            ExecutionEvent::Done { exit_code: 0 }
        );
        assert_eq!(
            ExecutionEvent::decode("[DONE] EXIT_CODE:1"),
            ExecutionEvent::Done { exit_code: 1 }
        );
        // Malformed terminal record degrades to a log line
        assert_eq!(
            ExecutionEvent::decode("[DONE] EXIT_CODE: ?"),
            ExecutionEvent::Log {
                message: "[DONE] EXIT_CODE: ?".into()
            }
        );
    }

    #[test]
    fn test_decode_error_and_log() {
        assert_eq!(
            ExecutionEvent::decode("[ERROR] device offline"),
            ExecutionEvent::Error {
                message: "device offline".into()
            }
        );
        assert_eq!(
            ExecutionEvent::decode("[INFO] Launching app"),
            ExecutionEvent::Log {
                message: "[INFO] Launching app".into()
            }
        );
        // Unknown status word is not a progress event
        assert!(matches!(
            ExecutionEvent::decode("[1/2] Tap (skipped)"),
            ExecutionEvent::Log { .. }
        ));
    }

    #[test]
    fn test_emitter_without_subscribers() {
        let emitter = EventEmitter::default();
        emitter.emit(TrackerEvent::LineStatusesCleared);
        let mut rx = emitter.subscribe();
        emitter.emit(TrackerEvent::LineStatusesCleared);
        assert_eq!(rx.try_recv().ok(), Some(TrackerEvent::LineStatusesCleared));
    }
}
