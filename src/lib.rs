pub mod error;
pub mod hierarchy;
pub mod inspector;
pub mod locator;
pub mod runner;
pub mod script;
pub mod utils;

// Re-export common items
pub use error::{InspectorError, Result};
pub use hierarchy::{flatten, hit_test, Element, UiNode};
pub use locator::resolve_locators;
pub use runner::ExecutionStreamTracker;
pub use script::{emit, map_step_lines};
