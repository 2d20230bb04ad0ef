pub mod console;
pub mod events;
pub mod stream;
pub mod tracker;

pub use console::{print_entry, print_line_statuses, ConsoleEventListener};
pub use events::{EventEmitter, ExecutionEvent, StepState, TrackerEvent};
pub use stream::records;
pub use tracker::{ExecutionStreamTracker, LogEntry, LogLevel, RunOutcome, RunPhase, RunStatus};
