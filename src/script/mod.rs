//! Flow-script authoring
//!
//! - `emitter`: `{action, params}` → step statement text
//! - `step_lines`: step ordinal → editor line
//! - `buffer`: editable script with numbered step appends
//! - `validate`: syntax and command-vocabulary checks

pub mod buffer;
pub mod emitter;
pub mod step_lines;
pub mod validate;

pub use buffer::ScriptBuffer;
pub use emitter::{emit, step_object, ParamValue, Params};
pub use step_lines::{count_step_markers, map_step_lines, map_top_level_step_lines, SECTION_SEPARATOR};
pub use validate::{validate_script, ValidationReport};
